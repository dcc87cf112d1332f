//! Fixtures and invariant checks shared by the ledger tests.

use crate::db::models::{Player, PlayerStats, Team};
use crate::db::players::{self, PlayerRecord};
use crate::db::teams::{self, TeamRecord};
use crate::db::Ledger;
use crate::types::{now_ns, Category, Money};

pub fn crores(v: f64) -> Money {
    Money::from_crores(v).unwrap()
}

pub async fn seed_team(ledger: &Ledger, code: &str, purse_crores: f64) -> Team {
    let purse = crores(purse_crores);
    let record = TeamRecord {
        name: format!("{code} Franchise"),
        short_code: code.to_string(),
        purse_start: purse,
        purse_remaining: purse,
        max_squad_size: 25,
        min_squad_size: 11,
        max_overseas: 8,
        logo_url: None,
    };
    teams::insert(ledger.pool(), &record, now_ns()).await.unwrap()
}

pub async fn seed_player(ledger: &Ledger, name: &str, base_crores: f64) -> Player {
    let record = PlayerRecord {
        name: name.to_string(),
        category: Category::Batsman,
        country: "India".to_string(),
        is_overseas: false,
        base_price: crores(base_crores),
        set_no: Some(1),
        role: None,
        photo_url: None,
        stats: PlayerStats::default(),
    };
    players::insert(ledger.pool(), &record, now_ns()).await.unwrap()
}

pub async fn team(ledger: &Ledger, id: i64) -> Team {
    teams::require(ledger.pool(), id).await.unwrap()
}

pub async fn player(ledger: &Ledger, id: i64) -> Player {
    players::require(ledger.pool(), id).await.unwrap()
}

async fn count(ledger: &Ledger, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(ledger.pool()).await.unwrap()
}

pub async fn live_round_count(ledger: &Ledger) -> i64 {
    count(ledger, "SELECT COUNT(*) FROM auction_rounds WHERE status = 'live'").await
}

pub async fn squad_entry_count(ledger: &Ledger) -> i64 {
    count(ledger, "SELECT COUNT(*) FROM team_players").await
}

/// Checks the ledger invariants that must hold after every committed operation:
/// at most one live round, purse arithmetic per team, and ownership status
/// matching squad membership per player.
pub async fn assert_consistent(ledger: &Ledger) {
    assert!(live_round_count(ledger).await <= 1, "more than one live round");

    let bad_purses = count(
        ledger,
        r#"
        SELECT COUNT(*) FROM teams t
        WHERE t.purse_remaining != t.purse_start - COALESCE(
            (SELECT SUM(price) FROM team_players tp WHERE tp.team_id = t.id), 0)
        "#,
    )
    .await;
    assert_eq!(bad_purses, 0, "purse_remaining out of step with squad prices");

    let bad_owners = count(
        ledger,
        r#"
        SELECT COUNT(*) FROM players p
        WHERE (p.status IN ('sold', 'retained')) != EXISTS (
                SELECT 1 FROM team_players tp
                WHERE tp.player_id = p.id AND tp.team_id = p.sold_to_team_id)
           OR (p.status IN ('sold', 'retained')) != (p.sold_to_team_id IS NOT NULL)
        "#,
    )
    .await;
    assert_eq!(bad_owners, 0, "player status out of step with squad entries");
}
