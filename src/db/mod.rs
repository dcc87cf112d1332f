pub mod ledger;
pub mod models;
pub mod players;
pub mod rounds;
pub mod squad;
pub mod teams;

pub use ledger::Ledger;

use crate::error::AppError;

/// True when a statement failed on a UNIQUE constraint or unique index.
pub fn is_unique_violation(err: &AppError) -> bool {
    matches!(err, AppError::Storage(sqlx::Error::Database(db)) if db.is_unique_violation())
}

#[cfg(test)]
pub mod testing;
