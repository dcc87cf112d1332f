use sqlx::SqliteExecutor;

use crate::db::models::AuctionRound;
use crate::error::{AppError, Result};
use crate::types::Money;

/// Opens a live round for `player_id` at its base price, but only if the
/// player is `not_started`. Returns None when the player is missing or not
/// startable. A second live round fails on the `one_live_round` index.
pub async fn open_for<'e, E: SqliteExecutor<'e>>(ex: E, player_id: i64, now: i64) -> Result<Option<AuctionRound>> {
    let round = sqlx::query_as::<_, AuctionRound>(
        r#"
        INSERT INTO auction_rounds (player_id, current_bid, current_bid_team_id, status, created_at, updated_at)
        SELECT id, base_price, NULL, 'live', ?, ?
        FROM players
        WHERE id = ? AND status = 'not_started'
        RETURNING *
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(player_id)
    .fetch_optional(ex)
    .await?;
    Ok(round)
}

pub async fn fetch<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<Option<AuctionRound>> {
    let round = sqlx::query_as::<_, AuctionRound>("SELECT * FROM auction_rounds WHERE id = ?")
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(round)
}

pub async fn require<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<AuctionRound> {
    fetch(ex, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Auction round {id}")))
}

pub async fn live<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Option<AuctionRound>> {
    let round = sqlx::query_as::<_, AuctionRound>("SELECT * FROM auction_rounds WHERE status = 'live'")
        .fetch_optional(ex)
        .await?;
    Ok(round)
}

/// Completed rounds, most recently closed first.
pub async fn completed<'e, E: SqliteExecutor<'e>>(ex: E, limit: i64) -> Result<Vec<AuctionRound>> {
    let rounds = sqlx::query_as::<_, AuctionRound>(
        "SELECT * FROM auction_rounds WHERE status = 'completed' ORDER BY updated_at DESC, id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(ex)
    .await?;
    Ok(rounds)
}

/// Replaces the current bid and leading team of a live round.
pub async fn set_bid<'e, E: SqliteExecutor<'e>>(
    ex: E,
    id: i64,
    amount: Money,
    leader: Option<i64>,
    now: i64,
) -> Result<AuctionRound> {
    let round = sqlx::query_as::<_, AuctionRound>(
        r#"
        UPDATE auction_rounds SET current_bid = ?, current_bid_team_id = ?, updated_at = ?
        WHERE id = ? AND status = 'live'
        RETURNING *
        "#,
    )
    .bind(amount)
    .bind(leader)
    .bind(now)
    .bind(id)
    .fetch_optional(ex)
    .await?;
    round.ok_or_else(|| AppError::conflict(format!("Auction round {id} is no longer live")))
}

/// live -> completed. Fails with `Conflict` if the round already closed.
pub async fn complete<'e, E: SqliteExecutor<'e>>(ex: E, id: i64, now: i64) -> Result<AuctionRound> {
    let round = sqlx::query_as::<_, AuctionRound>(
        r#"
        UPDATE auction_rounds SET status = 'completed', updated_at = ?
        WHERE id = ? AND status = 'live'
        RETURNING *
        "#,
    )
    .bind(now)
    .bind(id)
    .fetch_optional(ex)
    .await?;
    round.ok_or_else(|| AppError::conflict(format!("Auction round {id} is no longer live")))
}

pub async fn delete_all<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<u64> {
    let done = sqlx::query("DELETE FROM auction_rounds").execute(ex).await?;
    Ok(done.rows_affected())
}
