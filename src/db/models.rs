//! Row types for the ledger tables, decoded with `sqlx::FromRow` and served as JSON.
//! Money columns are integer lakhs (see `Money`); timestamps are nanosecond epochs.

use serde::{Deserialize, Serialize};

use crate::types::{Category, Money, PlayerStatus, RoundStatus};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub short_code: String,
    pub purse_start: Money,
    pub purse_remaining: Money,
    pub max_squad_size: i64,
    pub min_squad_size: i64,
    pub max_overseas: i64,
    pub logo_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Career numbers filled in by the enrichment service. Inert for the auction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerStats {
    pub matches_played: Option<i64>,
    pub total_runs: Option<i64>,
    pub batting_average: Option<f64>,
    pub batting_strike_rate: Option<f64>,
    pub highest_score: Option<i64>,
    pub total_wickets: Option<i64>,
    pub bowling_average: Option<f64>,
    pub economy_rate: Option<f64>,
    pub best_bowling: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub country: String,
    pub is_overseas: bool,
    pub base_price: Money,
    pub set_no: Option<i64>,
    pub role: Option<String>,
    pub photo_url: Option<String>,
    pub status: PlayerStatus,
    pub sold_to_team_id: Option<i64>,
    pub sold_price: Option<Money>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stats: PlayerStats,
    pub stats_fetched: bool,
    pub stats_last_updated: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A `team_players` row: one player's membership of one squad.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SquadEntry {
    pub id: i64,
    pub team_id: i64,
    pub player_id: i64,
    pub price: Money,
    pub is_retained: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuctionRound {
    pub id: i64,
    pub player_id: i64,
    pub current_bid: Money,
    pub current_bid_team_id: Option<i64>,
    pub status: RoundStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

// ---------------------------------------------------------------------------
// Composite read models
// ---------------------------------------------------------------------------

/// A round together with the player on the block and the leading team.
#[derive(Debug, Clone, Serialize)]
pub struct RoundView {
    #[serde(flatten)]
    pub round: AuctionRound,
    pub player: Player,
    pub leading_team: Option<Team>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SquadMember {
    #[serde(flatten)]
    pub entry: SquadEntry,
    pub player: Player,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SquadSummary {
    pub squad_size: i64,
    pub overseas: i64,
    pub spent: Money,
    pub slots_left: i64,
    pub overseas_slots_left: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamOverview {
    #[serde(flatten)]
    pub team: Team,
    pub summary: SquadSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub summary: SquadSummary,
    pub squad: Vec<SquadMember>,
}

/// A player with the team that owns it, for the recently-sold feed.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerWithTeam {
    #[serde(flatten)]
    pub player: Player,
    pub team: Option<Team>,
}
