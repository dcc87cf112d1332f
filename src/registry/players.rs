use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use sqlx::SqliteConnection;
use tracing::info;

use super::{optional, required, Registry};
use crate::db::models::{Player, PlayerStats, PlayerWithTeam};
use crate::db::players::{self, PlayerFilter, PlayerRecord};
use crate::db::{squad, teams};
use crate::error::{AppError, Result};
use crate::types::{now_ns, Category, Money, PlayerStatus};

/// Attributes of a new player. Statistics may be supplied inline, flat, the
/// way an import sheet carries them.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlayer {
    pub name: String,
    pub category: Category,
    pub country: Option<String>,
    pub base_price: Money,
    pub set_no: Option<i64>,
    pub role: Option<String>,
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub stats: PlayerStats,
}

/// Attribute edits. Status and ownership are never edited directly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerPatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub country: Option<String>,
    pub base_price: Option<Money>,
    /// Absent keeps the set, `null` moves the player out of every set.
    #[serde(default, deserialize_with = "present")]
    pub set_no: Option<Option<i64>>,
    pub role: Option<String>,
    pub photo_url: Option<String>,
}

fn present<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl Registry {
    fn player_record(&self, req: NewPlayer, fallback_country: Option<&str>) -> Result<PlayerRecord> {
        let country = match (optional(req.country), fallback_country) {
            (Some(country), _) => country,
            (None, Some(fallback)) => fallback.to_string(),
            (None, None) => return Err(AppError::validation("country is required")),
        };
        Ok(PlayerRecord {
            name: required("name", &req.name)?,
            category: req.category,
            is_overseas: self.is_overseas(&country),
            country,
            base_price: req.base_price,
            set_no: req.set_no,
            role: optional(req.role),
            photo_url: optional(req.photo_url),
            stats: req.stats,
        })
    }

    pub async fn list_players(&self, filter: &PlayerFilter) -> Result<Vec<Player>> {
        players::list(self.ledger.pool(), filter).await
    }

    /// Startable players keyed by set number; players without a set land in set 0.
    pub async fn available_players(&self) -> Result<BTreeMap<i64, Vec<Player>>> {
        let mut grouped: BTreeMap<i64, Vec<Player>> = BTreeMap::new();
        for player in players::available(self.ledger.pool()).await? {
            grouped.entry(player.set_no.unwrap_or(0)).or_default().push(player);
        }
        Ok(grouped)
    }

    pub async fn player_detail(&self, id: i64) -> Result<PlayerWithTeam> {
        let mut conn = self.ledger.pool().acquire().await?;
        let player = players::require(&mut *conn, id).await?;
        let team = match player.sold_to_team_id {
            Some(team_id) => teams::fetch(&mut *conn, team_id).await?,
            None => None,
        };
        Ok(PlayerWithTeam { player, team })
    }

    pub async fn create_player(&self, req: NewPlayer) -> Result<Player> {
        let record = self.player_record(req, None)?;
        let player = self
            .ledger
            .with_transaction("create_player", move |conn| {
                Box::pin(async move { players::insert(&mut *conn, &record, now_ns()).await })
            })
            .await?;
        info!(event = "PLAYER_CREATED", player_id = player.id, base_price = %player.base_price, "PLAYER CREATED | {}", player.name);
        Ok(player)
    }

    /// All or nothing: one invalid row rejects the whole batch.
    pub async fn bulk_create_players(&self, reqs: Vec<NewPlayer>) -> Result<Vec<Player>> {
        if reqs.is_empty() {
            return Err(AppError::validation("players must not be empty"));
        }
        let records = reqs
            .into_iter()
            .enumerate()
            .map(|(i, req)| {
                self.player_record(req, Some(self.home_country.as_str())).map_err(|e| match e {
                    AppError::Validation(msg) => AppError::validation(format!("row {}: {msg}", i + 1)),
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let created = self
            .ledger
            .with_transaction("bulk_create_players", move |conn| {
                Box::pin(async move {
                    let now = now_ns();
                    let mut created = Vec::with_capacity(records.len());
                    for record in &records {
                        created.push(players::insert(&mut *conn, record, now).await?);
                    }
                    Ok::<_, AppError>(created)
                })
            })
            .await?;
        info!(event = "PLAYERS_IMPORTED", count = created.len(), "IMPORTED | {} players", created.len());
        Ok(created)
    }

    pub async fn update_player(&self, id: i64, patch: PlayerPatch) -> Result<Player> {
        let home = self.home_country.clone();
        let player = self
            .ledger
            .with_transaction("update_player", move |conn| {
                Box::pin(apply_player_patch(conn, id, patch, home))
            })
            .await?;
        info!(event = "PLAYER_UPDATED", player_id = id, base_price = %player.base_price);
        Ok(player)
    }

    /// Refunds the owning team before the player and its squad entry go.
    pub async fn delete_player(&self, id: i64) -> Result<Player> {
        let (player, refunded) = self
            .ledger
            .with_transaction("delete_player", move |conn| Box::pin(remove_player(conn, id)))
            .await?;
        info!(
            event = "PLAYER_DELETED",
            player_id = id,
            refunded = ?refunded.map(|m| m.to_string()),
            "PLAYER DELETED | {}",
            player.name,
        );
        Ok(player)
    }

    pub async fn record_stats(&self, id: i64, stats: PlayerStats) -> Result<Player> {
        let player = self
            .ledger
            .with_transaction("record_stats", move |conn| {
                Box::pin(async move { players::record_stats(&mut *conn, id, &stats, now_ns()).await })
            })
            .await?;
        info!(event = "PLAYER_STATS_RECORDED", player_id = id);
        Ok(player)
    }
}

async fn apply_player_patch(
    conn: &mut SqliteConnection,
    id: i64,
    patch: PlayerPatch,
    home_country: String,
) -> Result<Player> {
    let current = players::require(&mut *conn, id).await?;

    if let Some(base_price) = patch.base_price {
        if base_price != current.base_price && current.status == PlayerStatus::InAuction {
            return Err(AppError::conflict(format!(
                "{}'s base price cannot change while on the block",
                current.name
            )));
        }
    }

    let country = match patch.country {
        Some(country) => required("country", &country)?,
        None => current.country,
    };
    let record = PlayerRecord {
        name: match patch.name {
            Some(name) => required("name", &name)?,
            None => current.name,
        },
        category: patch.category.unwrap_or(current.category),
        is_overseas: !country.eq_ignore_ascii_case(&home_country),
        country,
        base_price: patch.base_price.unwrap_or(current.base_price),
        set_no: patch.set_no.unwrap_or(current.set_no),
        role: match patch.role {
            Some(role) => optional(Some(role)),
            None => current.role,
        },
        photo_url: match patch.photo_url {
            Some(url) => optional(Some(url)),
            None => current.photo_url,
        },
        stats: current.stats,
    };

    players::update_attributes(&mut *conn, id, &record, now_ns()).await
}

async fn remove_player(conn: &mut SqliteConnection, id: i64) -> Result<(Player, Option<Money>)> {
    let player = players::require(&mut *conn, id).await?;
    if player.status == PlayerStatus::InAuction {
        return Err(AppError::conflict(format!(
            "{} is on the block; close the round first",
            player.name
        )));
    }

    let refunded = match squad::for_player(&mut *conn, id).await? {
        Some(entry) => {
            teams::credit(&mut *conn, entry.team_id, entry.price, now_ns()).await?;
            Some(entry.price)
        }
        None => None,
    };
    players::delete(&mut *conn, id).await?;
    Ok((player, refunded))
}
