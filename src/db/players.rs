use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use crate::db::models::{Player, PlayerStats};
use crate::error::{AppError, Result};
use crate::types::{Category, Money, PlayerStatus};

/// Attribute columns of a player, already validated by the registry.
/// Status and ownership columns are never written through this record.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub name: String,
    pub category: Category,
    pub country: String,
    pub is_overseas: bool,
    pub base_price: Money,
    pub set_no: Option<i64>,
    pub role: Option<String>,
    pub photo_url: Option<String>,
    pub stats: PlayerStats,
}

/// Query-string filters for the player list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerFilter {
    pub category: Option<Category>,
    pub status: Option<PlayerStatus>,
    pub is_overseas: Option<bool>,
    pub set_no: Option<i64>,
    /// Case-insensitive substring of the player name.
    pub search: Option<String>,
}

const ORDER_BY_SET: &str = " ORDER BY set_no IS NULL, set_no, name, id";

pub async fn fetch<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<Option<Player>> {
    let player = sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id = ?")
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(player)
}

pub async fn require<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<Player> {
    fetch(ex, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Player {id}")))
}

pub async fn list<'e, E: SqliteExecutor<'e>>(ex: E, filter: &PlayerFilter) -> Result<Vec<Player>> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM players WHERE 1 = 1");
    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(is_overseas) = filter.is_overseas {
        qb.push(" AND is_overseas = ").push_bind(is_overseas);
    }
    if let Some(set_no) = filter.set_no {
        qb.push(" AND set_no = ").push_bind(set_no);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND name LIKE ").push_bind(format!("%{search}%"));
    }
    qb.push(ORDER_BY_SET);

    let players = qb.build_query_as::<Player>().fetch_all(ex).await?;
    Ok(players)
}

/// Players that can still be put on the block, in draft order.
pub async fn available<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<Player>> {
    let filter = PlayerFilter {
        status: Some(PlayerStatus::NotStarted),
        ..PlayerFilter::default()
    };
    list(ex, &filter).await
}

/// Sold and retained players.
pub async fn owned<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<Player>> {
    let players = sqlx::query_as::<_, Player>(
        "SELECT * FROM players WHERE status IN ('sold', 'retained') ORDER BY id",
    )
    .fetch_all(ex)
    .await?;
    Ok(players)
}

/// Players whose round closed (sold or unsold), most recently closed first.
/// Ordered by the round's close time so later attribute edits do not reorder
/// the feed.
pub async fn recently_closed<'e, E: SqliteExecutor<'e>>(ex: E, limit: i64) -> Result<Vec<Player>> {
    let players = sqlx::query_as::<_, Player>(
        r#"
        SELECT p.* FROM players p
        JOIN (
            SELECT player_id, MAX(updated_at) AS closed_at
            FROM auction_rounds
            WHERE status = 'completed'
            GROUP BY player_id
        ) c ON c.player_id = p.id
        WHERE p.status IN ('sold', 'unsold')
        ORDER BY c.closed_at DESC, p.id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(ex)
    .await?;
    Ok(players)
}

pub async fn insert<'e, E: SqliteExecutor<'e>>(ex: E, p: &PlayerRecord, now: i64) -> Result<Player> {
    let player = sqlx::query_as::<_, Player>(
        r#"
        INSERT INTO players (
            name, category, country, is_overseas, base_price, set_no, role, photo_url,
            matches_played, total_runs, batting_average, batting_strike_rate, highest_score,
            total_wickets, bowling_average, economy_rate, best_bowling,
            status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'not_started', ?, ?)
        RETURNING *
        "#,
    )
    .bind(&p.name)
    .bind(p.category)
    .bind(&p.country)
    .bind(p.is_overseas)
    .bind(p.base_price)
    .bind(p.set_no)
    .bind(&p.role)
    .bind(&p.photo_url)
    .bind(p.stats.matches_played)
    .bind(p.stats.total_runs)
    .bind(p.stats.batting_average)
    .bind(p.stats.batting_strike_rate)
    .bind(p.stats.highest_score)
    .bind(p.stats.total_wickets)
    .bind(p.stats.bowling_average)
    .bind(p.stats.economy_rate)
    .bind(&p.stats.best_bowling)
    .bind(now)
    .bind(now)
    .fetch_one(ex)
    .await?;
    Ok(player)
}

/// Rewrites name, category, country, base price, set and profile fields.
pub async fn update_attributes<'e, E: SqliteExecutor<'e>>(
    ex: E,
    id: i64,
    p: &PlayerRecord,
    now: i64,
) -> Result<Player> {
    let player = sqlx::query_as::<_, Player>(
        r#"
        UPDATE players SET
            name = ?, category = ?, country = ?, is_overseas = ?, base_price = ?,
            set_no = ?, role = ?, photo_url = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&p.name)
    .bind(p.category)
    .bind(&p.country)
    .bind(p.is_overseas)
    .bind(p.base_price)
    .bind(p.set_no)
    .bind(&p.role)
    .bind(&p.photo_url)
    .bind(now)
    .bind(id)
    .fetch_optional(ex)
    .await?;
    player.ok_or_else(|| AppError::not_found(format!("Player {id}")))
}

pub async fn record_stats<'e, E: SqliteExecutor<'e>>(
    ex: E,
    id: i64,
    stats: &PlayerStats,
    now: i64,
) -> Result<Player> {
    let player = sqlx::query_as::<_, Player>(
        r#"
        UPDATE players SET
            matches_played = ?, total_runs = ?, batting_average = ?, batting_strike_rate = ?,
            highest_score = ?, total_wickets = ?, bowling_average = ?, economy_rate = ?,
            best_bowling = ?, stats_fetched = 1, stats_last_updated = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(stats.matches_played)
    .bind(stats.total_runs)
    .bind(stats.batting_average)
    .bind(stats.batting_strike_rate)
    .bind(stats.highest_score)
    .bind(stats.total_wickets)
    .bind(stats.bowling_average)
    .bind(stats.economy_rate)
    .bind(&stats.best_bowling)
    .bind(now)
    .bind(now)
    .bind(id)
    .fetch_optional(ex)
    .await?;
    player.ok_or_else(|| AppError::not_found(format!("Player {id}")))
}

pub async fn set_status<'e, E: SqliteExecutor<'e>>(
    ex: E,
    id: i64,
    status: PlayerStatus,
    now: i64,
) -> Result<Player> {
    let player = sqlx::query_as::<_, Player>(
        "UPDATE players SET status = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_optional(ex)
    .await?;
    player.ok_or_else(|| AppError::not_found(format!("Player {id}")))
}

/// Marks the player as owned (`sold` or `retained`) by `team_id` at `price`.
pub async fn assign<'e, E: SqliteExecutor<'e>>(
    ex: E,
    id: i64,
    status: PlayerStatus,
    team_id: i64,
    price: Money,
    now: i64,
) -> Result<Player> {
    debug_assert!(status.is_owned());
    let player = sqlx::query_as::<_, Player>(
        r#"
        UPDATE players SET status = ?, sold_to_team_id = ?, sold_price = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(team_id)
    .bind(price)
    .bind(now)
    .bind(id)
    .fetch_optional(ex)
    .await?;
    player.ok_or_else(|| AppError::not_found(format!("Player {id}")))
}

/// Back to `not_started` with no owner and no price.
pub async fn clear_ownership<'e, E: SqliteExecutor<'e>>(ex: E, id: i64, now: i64) -> Result<Player> {
    let player = sqlx::query_as::<_, Player>(
        r#"
        UPDATE players SET status = 'not_started', sold_to_team_id = NULL, sold_price = NULL, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(now)
    .bind(id)
    .fetch_optional(ex)
    .await?;
    player.ok_or_else(|| AppError::not_found(format!("Player {id}")))
}

/// Every player owned by `team_id` goes back to `not_started`.
pub async fn release_team<'e, E: SqliteExecutor<'e>>(ex: E, team_id: i64, now: i64) -> Result<u64> {
    let done = sqlx::query(
        r#"
        UPDATE players SET status = 'not_started', sold_to_team_id = NULL, sold_price = NULL, updated_at = ?
        WHERE sold_to_team_id = ?
        "#,
    )
    .bind(now)
    .bind(team_id)
    .execute(ex)
    .await?;
    Ok(done.rows_affected())
}

/// Every player that is not retained goes back to `not_started`, sold ones included.
pub async fn reset_unretained<'e, E: SqliteExecutor<'e>>(ex: E, now: i64) -> Result<u64> {
    let done = sqlx::query(
        r#"
        UPDATE players SET status = 'not_started', sold_to_team_id = NULL, sold_price = NULL, updated_at = ?
        WHERE status NOT IN ('retained', 'not_started')
        "#,
    )
    .bind(now)
    .execute(ex)
    .await?;
    Ok(done.rows_affected())
}

pub async fn delete<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<u64> {
    let done = sqlx::query("DELETE FROM players WHERE id = ?")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(done.rows_affected())
}

pub async fn delete_all<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<u64> {
    let done = sqlx::query("DELETE FROM players").execute(ex).await?;
    Ok(done.rows_affected())
}
