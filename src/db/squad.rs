use std::collections::HashMap;

use sqlx::{SqliteConnection, SqliteExecutor};

use crate::db::models::{SquadEntry, SquadMember, SquadSummary, Team};
use crate::db::players;
use crate::error::{AppError, Result};
use crate::types::Money;

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    ex: E,
    team_id: i64,
    player_id: i64,
    price: Money,
    is_retained: bool,
    now: i64,
) -> Result<SquadEntry> {
    let entry = sqlx::query_as::<_, SquadEntry>(
        r#"
        INSERT INTO team_players (team_id, player_id, price, is_retained, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(team_id)
    .bind(player_id)
    .bind(price)
    .bind(is_retained)
    .bind(now)
    .fetch_one(ex)
    .await?;
    Ok(entry)
}

pub async fn find<'e, E: SqliteExecutor<'e>>(ex: E, team_id: i64, player_id: i64) -> Result<Option<SquadEntry>> {
    let entry = sqlx::query_as::<_, SquadEntry>(
        "SELECT * FROM team_players WHERE team_id = ? AND player_id = ?",
    )
    .bind(team_id)
    .bind(player_id)
    .fetch_optional(ex)
    .await?;
    Ok(entry)
}

pub async fn for_player<'e, E: SqliteExecutor<'e>>(ex: E, player_id: i64) -> Result<Option<SquadEntry>> {
    let entry = sqlx::query_as::<_, SquadEntry>("SELECT * FROM team_players WHERE player_id = ?")
        .bind(player_id)
        .fetch_optional(ex)
        .await?;
    Ok(entry)
}

pub async fn delete<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<()> {
    let done = sqlx::query("DELETE FROM team_players WHERE id = ?")
        .bind(id)
        .execute(ex)
        .await?;
    if done.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Squad entry {id}")));
    }
    Ok(())
}

pub async fn delete_unretained<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<u64> {
    let done = sqlx::query("DELETE FROM team_players WHERE is_retained = 0")
        .execute(ex)
        .await?;
    Ok(done.rows_affected())
}

pub async fn delete_all<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<u64> {
    let done = sqlx::query("DELETE FROM team_players").execute(ex).await?;
    Ok(done.rows_affected())
}

/// Sum of the prices of every entry in the team's squad.
pub async fn spent<'e, E: SqliteExecutor<'e>>(ex: E, team_id: i64) -> Result<Money> {
    let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(price), 0) FROM team_players WHERE team_id = ?")
        .bind(team_id)
        .fetch_one(ex)
        .await?;
    Ok(Money(total))
}

/// Squad entries with their players, newest first.
pub async fn members(conn: &mut SqliteConnection, team_id: i64) -> Result<Vec<SquadMember>> {
    let entries = sqlx::query_as::<_, SquadEntry>(
        "SELECT * FROM team_players WHERE team_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(team_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut members = Vec::with_capacity(entries.len());
    for entry in entries {
        let player = players::require(&mut *conn, entry.player_id).await?;
        members.push(SquadMember { entry, player });
    }
    Ok(members)
}

/// `(squad_size, overseas, spent)` per team, for teams with at least one entry.
pub async fn totals<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<HashMap<i64, (i64, i64, Money)>> {
    let rows: Vec<(i64, i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT tp.team_id,
               COUNT(*),
               COALESCE(SUM(CASE WHEN p.is_overseas THEN 1 ELSE 0 END), 0),
               COALESCE(SUM(tp.price), 0)
        FROM team_players tp
        JOIN players p ON p.id = tp.player_id
        GROUP BY tp.team_id
        "#,
    )
    .fetch_all(ex)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(team_id, size, overseas, spent)| (team_id, (size, overseas, Money(spent))))
        .collect())
}

pub fn summarize(team: &Team, totals: Option<&(i64, i64, Money)>) -> SquadSummary {
    let (squad_size, overseas, spent) = totals.copied().unwrap_or((0, 0, Money::ZERO));
    SquadSummary {
        squad_size,
        overseas,
        spent,
        slots_left: (team.max_squad_size - squad_size).max(0),
        overseas_slots_left: (team.max_overseas - overseas).max(0),
    }
}
