pub mod engine;
pub mod reset;
pub mod retention;
pub mod stats;

pub use engine::{AuctionEngine, Sale};
pub use reset::{PurgeSummary, ResetController, ResetSummary};
pub use retention::{Release, Retention, RetentionManager};
pub use stats::AuctionStats;
