//! Admin CRUD for teams and players.
//!
//! Registry writes go through the ledger like auction writes do. Any edit that
//! can move money (purse_start, deletes) keeps purse arithmetic and squad
//! membership consistent inside the same transaction.

pub mod players;
pub mod teams;

pub use players::{NewPlayer, PlayerPatch};
pub use teams::{NewTeam, TeamPatch};

use crate::config::Config;
use crate::db::Ledger;

/// Squad limits a new team gets when the request leaves them out.
#[derive(Debug, Clone, Copy)]
pub struct SquadDefaults {
    pub max_squad_size: i64,
    pub min_squad_size: i64,
    pub max_overseas: i64,
}

#[derive(Clone)]
pub struct Registry {
    ledger: Ledger,
    home_country: String,
    defaults: SquadDefaults,
}

impl Registry {
    pub fn new(ledger: Ledger, cfg: &Config) -> Self {
        Self {
            ledger,
            home_country: cfg.home_country.clone(),
            defaults: SquadDefaults {
                max_squad_size: cfg.default_max_squad,
                min_squad_size: cfg.default_min_squad,
                max_overseas: cfg.default_max_overseas,
            },
        }
    }

    fn is_overseas(&self, country: &str) -> bool {
        !country.trim().eq_ignore_ascii_case(&self.home_country)
    }
}

/// Trimmed, non-empty text or a validation error naming the field.
fn required(field: &str, value: &str) -> crate::error::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::error::AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Empty strings clear optional text fields.
fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
