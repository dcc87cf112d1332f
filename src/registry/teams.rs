use serde::Deserialize;
use sqlx::SqliteConnection;
use tracing::info;

use super::{optional, required, Registry};
use crate::config::SHORT_CODE_MAX_LEN;
use crate::db::models::{SquadMember, Team, TeamDetail, TeamOverview};
use crate::db::teams::TeamRecord;
use crate::db::{self, players, squad, teams};
use crate::error::{AppError, Result};
use crate::types::{now_ns, Money};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTeam {
    pub name: String,
    pub short_code: String,
    pub purse_start: Money,
    pub max_squad_size: Option<i64>,
    pub min_squad_size: Option<i64>,
    pub max_overseas: Option<i64>,
    pub logo_url: Option<String>,
}

/// Fields left out are unchanged. An empty `logo_url` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub short_code: Option<String>,
    pub purse_start: Option<Money>,
    pub max_squad_size: Option<i64>,
    pub min_squad_size: Option<i64>,
    pub max_overseas: Option<i64>,
    pub logo_url: Option<String>,
}

fn short_code(raw: &str) -> Result<String> {
    let code = required("short_code", raw)?.to_uppercase();
    if code.chars().count() > SHORT_CODE_MAX_LEN {
        return Err(AppError::validation(format!(
            "short_code must be at most {SHORT_CODE_MAX_LEN} characters"
        )));
    }
    Ok(code)
}

fn check_limits(t: &TeamRecord) -> Result<()> {
    if t.max_squad_size < 1 || t.min_squad_size < 0 || t.max_overseas < 0 {
        return Err(AppError::validation("Squad limits must not be negative"));
    }
    if t.min_squad_size > t.max_squad_size {
        return Err(AppError::validation("min_squad_size must not exceed max_squad_size"));
    }
    if t.max_overseas > t.max_squad_size {
        return Err(AppError::validation("max_overseas must not exceed max_squad_size"));
    }
    Ok(())
}

fn duplicate_code(e: AppError, code: &str) -> AppError {
    if db::is_unique_violation(&e) {
        AppError::conflict(format!("Short code {code} is already taken"))
    } else {
        e
    }
}

impl Registry {
    pub async fn list_teams(&self) -> Result<Vec<TeamOverview>> {
        let mut conn = self.ledger.pool().acquire().await?;
        let all = teams::list(&mut *conn).await?;
        let totals = squad::totals(&mut *conn).await?;
        Ok(all
            .into_iter()
            .map(|team| {
                let summary = squad::summarize(&team, totals.get(&team.id));
                TeamOverview { team, summary }
            })
            .collect())
    }

    pub async fn team_detail(&self, id: i64) -> Result<TeamDetail> {
        let mut conn = self.ledger.pool().acquire().await?;
        let team = teams::require(&mut *conn, id).await?;
        let members = squad::members(&mut conn, id).await?;
        let size = members.len() as i64;
        let overseas = members.iter().filter(|m| m.player.is_overseas).count() as i64;
        let spent: Money = members.iter().map(|m| m.entry.price).sum();
        let summary = squad::summarize(&team, Some(&(size, overseas, spent)));
        Ok(TeamDetail {
            team,
            summary,
            squad: members,
        })
    }

    pub async fn team_squad(&self, id: i64) -> Result<Vec<SquadMember>> {
        let mut conn = self.ledger.pool().acquire().await?;
        teams::require(&mut *conn, id).await?;
        squad::members(&mut conn, id).await
    }

    pub async fn create_team(&self, req: NewTeam) -> Result<Team> {
        let record = TeamRecord {
            name: required("name", &req.name)?,
            short_code: short_code(&req.short_code)?,
            purse_start: req.purse_start,
            purse_remaining: req.purse_start,
            max_squad_size: req.max_squad_size.unwrap_or(self.defaults.max_squad_size),
            min_squad_size: req.min_squad_size.unwrap_or(self.defaults.min_squad_size),
            max_overseas: req.max_overseas.unwrap_or(self.defaults.max_overseas),
            logo_url: optional(req.logo_url),
        };
        check_limits(&record)?;

        let team = self
            .ledger
            .with_transaction("create_team", move |conn| {
                Box::pin(async move {
                    teams::insert(&mut *conn, &record, now_ns())
                        .await
                        .map_err(|e| duplicate_code(e, &record.short_code))
                })
            })
            .await?;
        info!(event = "TEAM_CREATED", team_id = team.id, short_code = %team.short_code, purse = %team.purse_start);
        Ok(team)
    }

    pub async fn update_team(&self, id: i64, patch: TeamPatch) -> Result<Team> {
        let team = self
            .ledger
            .with_transaction("update_team", move |conn| Box::pin(apply_team_patch(conn, id, patch)))
            .await?;
        info!(
            event = "TEAM_UPDATED",
            team_id = id,
            purse_start = %team.purse_start,
            purse_remaining = %team.purse_remaining,
        );
        Ok(team)
    }

    /// Players owned by the team go back to `not_started`; its squad cascades
    /// and a live round it leads loses its leader.
    pub async fn delete_team(&self, id: i64) -> Result<Team> {
        let (team, released) = self
            .ledger
            .with_transaction("delete_team", move |conn| {
                Box::pin(async move {
                    let team = teams::require(&mut *conn, id).await?;
                    let released = players::release_team(&mut *conn, id, now_ns()).await?;
                    teams::delete(&mut *conn, id).await?;
                    Ok::<_, AppError>((team, released))
                })
            })
            .await?;
        info!(event = "TEAM_DELETED", team_id = id, players_released = released, "TEAM DELETED | {}", team.name);
        Ok(team)
    }
}

async fn apply_team_patch(conn: &mut SqliteConnection, id: i64, patch: TeamPatch) -> Result<Team> {
    let current = teams::require(&mut *conn, id).await?;

    let mut record = TeamRecord {
        name: match patch.name {
            Some(name) => required("name", &name)?,
            None => current.name,
        },
        short_code: match patch.short_code {
            Some(code) => short_code(&code)?,
            None => current.short_code,
        },
        purse_start: current.purse_start,
        purse_remaining: current.purse_remaining,
        max_squad_size: patch.max_squad_size.unwrap_or(current.max_squad_size),
        min_squad_size: patch.min_squad_size.unwrap_or(current.min_squad_size),
        max_overseas: patch.max_overseas.unwrap_or(current.max_overseas),
        logo_url: match patch.logo_url {
            Some(url) => optional(Some(url)),
            None => current.logo_url,
        },
    };
    check_limits(&record)?;

    if let Some(purse_start) = patch.purse_start {
        let spent = squad::spent(&mut *conn, id).await?;
        let Some(remaining) = purse_start.checked_sub(spent).filter(|r| *r >= Money::ZERO) else {
            return Err(AppError::validation(format!(
                "purse_start {purse_start} is below the {spent} already spent"
            )));
        };
        record.purse_start = purse_start;
        record.purse_remaining = remaining;
    }

    teams::update(&mut *conn, id, &record, now_ns())
        .await
        .map_err(|e| duplicate_code(e, &record.short_code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::{AuctionEngine, RetentionManager};
    use crate::config::Config;
    use crate::db::testing::{self, crores, seed_player};
    use crate::db::Ledger;
    use crate::types::PlayerStatus;

    async fn setup() -> (Ledger, Registry) {
        let ledger = Ledger::in_memory().await;
        let registry = Registry::new(ledger.clone(), &Config::default());
        (ledger, registry)
    }

    fn new_team(code: &str, purse: f64) -> NewTeam {
        NewTeam {
            name: format!("{code} Franchise"),
            short_code: code.to_string(),
            purse_start: crores(purse),
            max_squad_size: None,
            min_squad_size: None,
            max_overseas: None,
            logo_url: None,
        }
    }

    #[tokio::test]
    async fn create_team_applies_defaults_and_uppercases_code() {
        let (_ledger, registry) = setup().await;
        let team = registry.create_team(new_team("rcb", 90.0)).await.unwrap();
        assert_eq!(team.short_code, "RCB");
        assert_eq!(team.purse_remaining, crores(90.0));
        assert_eq!(team.max_squad_size, 25);
        assert_eq!(team.min_squad_size, 11);
        assert_eq!(team.max_overseas, 8);
    }

    #[tokio::test]
    async fn duplicate_short_code_conflicts() {
        let (_ledger, registry) = setup().await;
        registry.create_team(new_team("MI", 90.0)).await.unwrap();
        let err = registry.create_team(new_team("mi", 80.0)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn invalid_team_fields_are_rejected() {
        let (_ledger, registry) = setup().await;
        assert!(matches!(
            registry.create_team(new_team("TOOLONG", 90.0)).await,
            Err(AppError::Validation(_))
        ));
        let mut blank = new_team("XI", 90.0);
        blank.name = "   ".into();
        assert!(matches!(registry.create_team(blank).await, Err(AppError::Validation(_))));
        let mut limits = new_team("XI", 90.0);
        limits.min_squad_size = Some(30);
        assert!(matches!(registry.create_team(limits).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn purse_start_edit_recomputes_remaining() {
        let (ledger, registry) = setup().await;
        let retention = RetentionManager::new(ledger.clone());
        let team = registry.create_team(new_team("SRH", 90.0)).await.unwrap();
        let player = seed_player(&ledger, "Cummins", 2.0).await;
        retention.retain(team.id, player.id, crores(20.0)).await.unwrap();

        let patch = TeamPatch {
            purse_start: Some(crores(100.0)),
            ..TeamPatch::default()
        };
        let updated = registry.update_team(team.id, patch).await.unwrap();
        assert_eq!(updated.purse_remaining, crores(80.0));
        testing::assert_consistent(&ledger).await;

        let patch = TeamPatch {
            purse_start: Some(crores(10.0)),
            ..TeamPatch::default()
        };
        let err = registry.update_team(team.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
        assert_eq!(testing::team(&ledger, team.id).await.purse_start, crores(100.0));
    }

    #[tokio::test]
    async fn delete_team_returns_its_players_to_the_pool() {
        let (ledger, registry) = setup().await;
        let engine = AuctionEngine::new(ledger.clone());
        let retention = RetentionManager::new(ledger.clone());
        let team = registry.create_team(new_team("PBKS", 90.0)).await.unwrap();
        let kept = seed_player(&ledger, "Arshdeep", 2.0).await;
        let bidding = seed_player(&ledger, "Livingstone", 2.0).await;
        retention.retain(team.id, kept.id, crores(4.0)).await.unwrap();
        let round = engine.start(bidding.id).await.unwrap();
        engine.bid(round.id, team.id, crores(3.0)).await.unwrap();

        registry.delete_team(team.id).await.unwrap();

        assert_eq!(testing::player(&ledger, kept.id).await.status, PlayerStatus::NotStarted);
        assert_eq!(testing::squad_entry_count(&ledger).await, 0);
        let live = engine.current().await.unwrap().unwrap();
        assert_eq!(live.round.current_bid_team_id, None);
        assert!(matches!(registry.team_detail(team.id).await, Err(AppError::NotFound(_))));
        testing::assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn overview_reports_squad_summary() {
        let (ledger, registry) = setup().await;
        let retention = RetentionManager::new(ledger.clone());
        let team = registry.create_team(new_team("GT", 90.0)).await.unwrap();
        let player = seed_player(&ledger, "Rashid", 2.0).await;
        retention.retain(team.id, player.id, crores(18.0)).await.unwrap();

        let overview = registry.list_teams().await.unwrap();
        assert_eq!(overview[0].summary.squad_size, 1);
        assert_eq!(overview[0].summary.spent, crores(18.0));
        assert_eq!(overview[0].summary.slots_left, 24);

        let detail = registry.team_detail(team.id).await.unwrap();
        assert_eq!(detail.summary, overview[0].summary);
        assert_eq!(detail.squad[0].player.id, player.id);
    }
}
