use sqlx::SqliteExecutor;

use crate::db::models::Team;
use crate::error::{AppError, Result};
use crate::types::Money;

/// Column values for a new team, already validated by the registry.
#[derive(Debug, Clone)]
pub struct TeamRecord {
    pub name: String,
    pub short_code: String,
    pub purse_start: Money,
    pub purse_remaining: Money,
    pub max_squad_size: i64,
    pub min_squad_size: i64,
    pub max_overseas: i64,
    pub logo_url: Option<String>,
}

pub async fn fetch<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<Option<Team>> {
    let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ?")
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(team)
}

pub async fn require<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<Team> {
    fetch(ex, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Team {id}")))
}

pub async fn list<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<Team>> {
    let teams = sqlx::query_as::<_, Team>("SELECT * FROM teams ORDER BY name, id")
        .fetch_all(ex)
        .await?;
    Ok(teams)
}

pub async fn insert<'e, E: SqliteExecutor<'e>>(ex: E, t: &TeamRecord, now: i64) -> Result<Team> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        INSERT INTO teams (
            name, short_code, purse_start, purse_remaining,
            max_squad_size, min_squad_size, max_overseas, logo_url,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&t.name)
    .bind(&t.short_code)
    .bind(t.purse_start)
    .bind(t.purse_remaining)
    .bind(t.max_squad_size)
    .bind(t.min_squad_size)
    .bind(t.max_overseas)
    .bind(&t.logo_url)
    .bind(now)
    .bind(now)
    .fetch_one(ex)
    .await?;
    Ok(team)
}

pub async fn update<'e, E: SqliteExecutor<'e>>(ex: E, id: i64, t: &TeamRecord, now: i64) -> Result<Team> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        UPDATE teams SET
            name = ?, short_code = ?, purse_start = ?, purse_remaining = ?,
            max_squad_size = ?, min_squad_size = ?, max_overseas = ?, logo_url = ?,
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&t.name)
    .bind(&t.short_code)
    .bind(t.purse_start)
    .bind(t.purse_remaining)
    .bind(t.max_squad_size)
    .bind(t.min_squad_size)
    .bind(t.max_overseas)
    .bind(&t.logo_url)
    .bind(now)
    .bind(id)
    .fetch_one(ex)
    .await?;
    Ok(team)
}

pub async fn delete<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<u64> {
    let done = sqlx::query("DELETE FROM teams WHERE id = ?")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(done.rows_affected())
}

/// Deducts `amount` from the purse. The caller has already checked the balance.
pub async fn debit<'e, E: SqliteExecutor<'e>>(ex: E, id: i64, amount: Money, now: i64) -> Result<Team> {
    let team = sqlx::query_as::<_, Team>(
        "UPDATE teams SET purse_remaining = purse_remaining - ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(amount)
    .bind(now)
    .bind(id)
    .fetch_optional(ex)
    .await?;
    team.ok_or_else(|| AppError::not_found(format!("Team {id}")))
}

pub async fn credit<'e, E: SqliteExecutor<'e>>(ex: E, id: i64, amount: Money, now: i64) -> Result<Team> {
    let team = sqlx::query_as::<_, Team>(
        "UPDATE teams SET purse_remaining = purse_remaining + ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(amount)
    .bind(now)
    .bind(id)
    .fetch_optional(ex)
    .await?;
    team.ok_or_else(|| AppError::not_found(format!("Team {id}")))
}

/// purse_remaining = purse_start for every team.
pub async fn restore_full_purses<'e, E: SqliteExecutor<'e>>(ex: E, now: i64) -> Result<u64> {
    let done = sqlx::query("UPDATE teams SET purse_remaining = purse_start, updated_at = ?")
        .bind(now)
        .execute(ex)
        .await?;
    Ok(done.rows_affected())
}

/// purse_remaining = purse_start - (sum of the team's remaining squad prices).
pub async fn recompute_purses<'e, E: SqliteExecutor<'e>>(ex: E, now: i64) -> Result<u64> {
    let done = sqlx::query(
        r#"
        UPDATE teams SET
            purse_remaining = purse_start - COALESCE(
                (SELECT SUM(tp.price) FROM team_players tp WHERE tp.team_id = teams.id), 0),
            updated_at = ?
        "#,
    )
    .bind(now)
    .execute(ex)
    .await?;
    Ok(done.rows_affected())
}

pub fn insufficient(team: &Team) -> AppError {
    AppError::InsufficientFunds {
        team: team.name.clone(),
        available: team.purse_remaining,
    }
}
