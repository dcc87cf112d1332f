use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::info;

use crate::db::models::{Player, SquadEntry, Team};
use crate::db::{players, squad, teams, Ledger};
use crate::error::{AppError, Result};
use crate::types::{now_ns, Money, PlayerStatus};

#[derive(Debug, Clone, Serialize)]
pub struct Retention {
    pub team: Team,
    pub player: Player,
    pub entry: SquadEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct Release {
    pub team: Team,
    pub player: Player,
    pub refunded: Money,
}

/// Pre-auction assignment of players to teams at a negotiated price.
#[derive(Clone)]
pub struct RetentionManager {
    ledger: Ledger,
}

impl RetentionManager {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    pub async fn retain(&self, team_id: i64, player_id: i64, price: Money) -> Result<Retention> {
        let retention = self
            .ledger
            .with_transaction("retain", move |conn| {
                Box::pin(retain_player(conn, team_id, player_id, price))
            })
            .await?;
        info!(
            event = "PLAYER_RETAINED",
            team_id,
            player_id,
            price = %price,
            purse_remaining = %retention.team.purse_remaining,
            "RETAINED | {} by {} for {}",
            retention.player.name, retention.team.short_code, price,
        );
        Ok(retention)
    }

    /// Undoes a retention (or a sale) and refunds the squad price.
    pub async fn release(&self, team_id: i64, player_id: i64) -> Result<Release> {
        let release = self
            .ledger
            .with_transaction("release", move |conn| {
                Box::pin(release_player(conn, team_id, player_id))
            })
            .await?;
        info!(
            event = "PLAYER_RELEASED",
            team_id,
            player_id,
            refunded = %release.refunded,
            "RELEASED | {} from {} | refunded: {}",
            release.player.name, release.team.short_code, release.refunded,
        );
        Ok(release)
    }
}

async fn retain_player(
    conn: &mut SqliteConnection,
    team_id: i64,
    player_id: i64,
    price: Money,
) -> Result<Retention> {
    let now = now_ns();
    if price < Money::ZERO {
        return Err(AppError::validation("Retention price must not be negative"));
    }

    let team = teams::require(&mut *conn, team_id).await?;
    let player = players::require(&mut *conn, player_id).await?;

    if squad::for_player(&mut *conn, player_id).await?.is_some() {
        return Err(AppError::conflict(format!("{} already belongs to a squad", player.name)));
    }
    if !matches!(player.status, PlayerStatus::NotStarted | PlayerStatus::Unsold) {
        return Err(AppError::conflict(format!(
            "{} cannot be retained while {}",
            player.name, player.status
        )));
    }
    if team.purse_remaining < price {
        return Err(teams::insufficient(&team));
    }

    let entry = squad::insert(&mut *conn, team_id, player_id, price, true, now).await?;
    let player = players::assign(&mut *conn, player_id, PlayerStatus::Retained, team_id, price, now).await?;
    let team = teams::debit(&mut *conn, team_id, price, now).await?;

    Ok(Retention { team, player, entry })
}

async fn release_player(conn: &mut SqliteConnection, team_id: i64, player_id: i64) -> Result<Release> {
    let now = now_ns();
    let entry = squad::find(&mut *conn, team_id, player_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Player {player_id} in team {team_id}'s squad")))?;

    squad::delete(&mut *conn, entry.id).await?;
    let team = teams::credit(&mut *conn, team_id, entry.price, now).await?;
    let player = players::clear_ownership(&mut *conn, player_id, now).await?;

    Ok(Release {
        team,
        player,
        refunded: entry.price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::AuctionEngine;
    use crate::db::testing::{self, crores, seed_player, seed_team};

    #[tokio::test]
    async fn retain_then_release_restores_everything() {
        let ledger = Ledger::in_memory().await;
        let manager = RetentionManager::new(ledger.clone());
        let team = seed_team(&ledger, "MI", 90.0).await;
        let player = seed_player(&ledger, "Bumrah", 2.0).await;

        let retained = manager.retain(team.id, player.id, crores(18.0)).await.unwrap();
        assert_eq!(retained.team.purse_remaining, crores(72.0));
        assert_eq!(retained.player.status, PlayerStatus::Retained);
        assert_eq!(retained.player.sold_price, Some(crores(18.0)));
        assert!(retained.entry.is_retained);
        testing::assert_consistent(&ledger).await;

        let released = manager.release(team.id, player.id).await.unwrap();
        assert_eq!(released.refunded, crores(18.0));
        assert_eq!(released.team.purse_remaining, crores(90.0));
        assert_eq!(released.player.status, PlayerStatus::NotStarted);
        assert_eq!(released.player.sold_to_team_id, None);
        assert_eq!(released.player.sold_price, None);
        assert_eq!(testing::squad_entry_count(&ledger).await, 0);
        testing::assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn retaining_twice_conflicts() {
        let ledger = Ledger::in_memory().await;
        let manager = RetentionManager::new(ledger.clone());
        let mi = seed_team(&ledger, "MI", 90.0).await;
        let csk = seed_team(&ledger, "CSK", 90.0).await;
        let player = seed_player(&ledger, "Jadeja", 2.0).await;

        manager.retain(mi.id, player.id, crores(10.0)).await.unwrap();
        let err = manager.retain(csk.id, player.id, crores(10.0)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
        assert_eq!(testing::team(&ledger, csk.id).await.purse_remaining, crores(90.0));
    }

    #[tokio::test]
    async fn player_on_the_block_cannot_be_retained() {
        let ledger = Ledger::in_memory().await;
        let manager = RetentionManager::new(ledger.clone());
        let engine = AuctionEngine::new(ledger.clone());
        let team = seed_team(&ledger, "DC", 90.0).await;
        let player = seed_player(&ledger, "Pant", 2.0).await;
        engine.start(player.id).await.unwrap();

        let err = manager.retain(team.id, player.id, crores(5.0)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unsold_player_can_be_retained() {
        let ledger = Ledger::in_memory().await;
        let manager = RetentionManager::new(ledger.clone());
        let engine = AuctionEngine::new(ledger.clone());
        let team = seed_team(&ledger, "PBKS", 90.0).await;
        let player = seed_player(&ledger, "Arshdeep", 1.0).await;
        let round = engine.start(player.id).await.unwrap();
        engine.mark_unsold(round.id).await.unwrap();

        let retained = manager.retain(team.id, player.id, crores(1.0)).await.unwrap();
        assert_eq!(retained.player.status, PlayerStatus::Retained);
        testing::assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn retention_beyond_purse_is_rejected() {
        let ledger = Ledger::in_memory().await;
        let manager = RetentionManager::new(ledger.clone());
        let team = seed_team(&ledger, "LSG", 10.0).await;
        let player = seed_player(&ledger, "Rahul", 2.0).await;

        let err = manager.retain(team.id, player.id, crores(12.0)).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds { .. }));
        assert_eq!(testing::player(&ledger, player.id).await.status, PlayerStatus::NotStarted);
        assert_eq!(testing::squad_entry_count(&ledger).await, 0);
    }

    #[tokio::test]
    async fn missing_team_player_or_entry_is_not_found() {
        let ledger = Ledger::in_memory().await;
        let manager = RetentionManager::new(ledger.clone());
        let team = seed_team(&ledger, "RR", 90.0).await;
        let player = seed_player(&ledger, "Samson", 2.0).await;

        assert!(matches!(
            manager.retain(999, player.id, crores(1.0)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            manager.retain(team.id, 999, crores(1.0)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            manager.release(team.id, player.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
