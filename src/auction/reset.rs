use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::db::{players, rounds, squad, teams, Ledger};
use crate::error::Result;
use crate::types::now_ns;

/// Rows touched by a reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    pub rounds_deleted: u64,
    pub squad_entries_deleted: u64,
    pub players_reset: u64,
    pub teams_recomputed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeSummary {
    pub players_deleted: u64,
    pub squad_entries_deleted: u64,
    pub rounds_deleted: u64,
    pub teams_restored: u64,
}

/// Bulk recovery back to a consistent baseline.
#[derive(Clone)]
pub struct ResetController {
    ledger: Ledger,
}

impl ResetController {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Clears every round and every purchase; retentions survive. Idempotent.
    pub async fn reset(&self) -> Result<ResetSummary> {
        let summary = self
            .ledger
            .with_transaction("reset", |conn| Box::pin(reset_auction(conn)))
            .await?;
        warn!(
            event = "AUCTION_RESET",
            rounds_deleted = summary.rounds_deleted,
            squad_entries_deleted = summary.squad_entries_deleted,
            players_reset = summary.players_reset,
            "AUCTION RESET | rounds: {} | purchases undone: {} | players reset: {}",
            summary.rounds_deleted, summary.squad_entries_deleted, summary.players_reset,
        );
        Ok(summary)
    }

    /// Deletes every player with their squad entries and rounds, and refills
    /// every purse. Teams are kept.
    pub async fn delete_all_players(&self) -> Result<PurgeSummary> {
        let summary = self
            .ledger
            .with_transaction("delete_all_players", |conn| Box::pin(purge_players(conn)))
            .await?;
        warn!(
            event = "PLAYERS_PURGED",
            players_deleted = summary.players_deleted,
            teams_restored = summary.teams_restored,
            "ALL PLAYERS DELETED | players: {} | purses restored: {}",
            summary.players_deleted, summary.teams_restored,
        );
        Ok(summary)
    }
}

async fn reset_auction(conn: &mut SqliteConnection) -> Result<ResetSummary> {
    let now = now_ns();
    let rounds_deleted = rounds::delete_all(&mut *conn).await?;
    let squad_entries_deleted = squad::delete_unretained(&mut *conn).await?;
    let players_reset = players::reset_unretained(&mut *conn, now).await?;
    let teams_recomputed = teams::recompute_purses(&mut *conn, now).await?;
    info!(teams_recomputed, "purses recomputed from retained prices");
    Ok(ResetSummary {
        rounds_deleted,
        squad_entries_deleted,
        players_reset,
        teams_recomputed,
    })
}

async fn purge_players(conn: &mut SqliteConnection) -> Result<PurgeSummary> {
    let now = now_ns();
    let squad_entries_deleted = squad::delete_all(&mut *conn).await?;
    let rounds_deleted = rounds::delete_all(&mut *conn).await?;
    let players_deleted = players::delete_all(&mut *conn).await?;
    let teams_restored = teams::restore_full_purses(&mut *conn, now).await?;
    Ok(PurgeSummary {
        players_deleted,
        squad_entries_deleted,
        rounds_deleted,
        teams_restored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::{AuctionEngine, RetentionManager};
    use crate::db::testing::{self, crores, seed_player, seed_team};
    use crate::types::PlayerStatus;

    #[tokio::test]
    async fn reset_keeps_retentions_and_undoes_everything_else() {
        let ledger = Ledger::in_memory().await;
        let engine = AuctionEngine::new(ledger.clone());
        let retention = RetentionManager::new(ledger.clone());
        let reset = ResetController::new(ledger.clone());

        let team = seed_team(&ledger, "CSK", 90.0).await;
        let kept = seed_player(&ledger, "Dhoni", 2.0).await;
        let bought = seed_player(&ledger, "Conway", 1.0).await;
        let unsold = seed_player(&ledger, "Rahane", 0.5).await;
        let on_block = seed_player(&ledger, "Dube", 1.0).await;

        retention.retain(team.id, kept.id, crores(15.0)).await.unwrap();
        let r = engine.start(bought.id).await.unwrap();
        engine.bid(r.id, team.id, crores(6.0)).await.unwrap();
        engine.sell(r.id).await.unwrap();
        let r = engine.start(unsold.id).await.unwrap();
        engine.mark_unsold(r.id).await.unwrap();
        engine.start(on_block.id).await.unwrap();

        let summary = reset.reset().await.unwrap();
        assert_eq!(summary.rounds_deleted, 3);
        assert_eq!(summary.squad_entries_deleted, 1);
        assert_eq!(summary.players_reset, 3);

        assert_eq!(testing::team(&ledger, team.id).await.purse_remaining, crores(75.0));
        assert_eq!(testing::live_round_count(&ledger).await, 0);
        assert_eq!(testing::player(&ledger, kept.id).await.status, PlayerStatus::Retained);
        for id in [bought.id, unsold.id, on_block.id] {
            let p = testing::player(&ledger, id).await;
            assert_eq!(p.status, PlayerStatus::NotStarted);
            assert_eq!(p.sold_to_team_id, None);
        }
        testing::assert_consistent(&ledger).await;

        // a second reset finds nothing left to undo
        let again = reset.reset().await.unwrap();
        assert_eq!(again.rounds_deleted, 0);
        assert_eq!(again.players_reset, 0);
        assert_eq!(testing::team(&ledger, team.id).await.purse_remaining, crores(75.0));
    }

    #[tokio::test]
    async fn delete_all_players_refills_purses() {
        let ledger = Ledger::in_memory().await;
        let retention = RetentionManager::new(ledger.clone());
        let reset = ResetController::new(ledger.clone());
        let team = seed_team(&ledger, "KKR", 90.0).await;
        let p = seed_player(&ledger, "Narine", 2.0).await;
        seed_player(&ledger, "Russell", 2.0).await;
        retention.retain(team.id, p.id, crores(12.0)).await.unwrap();

        let summary = reset.delete_all_players().await.unwrap();
        assert_eq!(summary.players_deleted, 2);
        assert_eq!(summary.squad_entries_deleted, 1);
        assert_eq!(testing::team(&ledger, team.id).await.purse_remaining, crores(90.0));
        testing::assert_consistent(&ledger).await;
    }
}
