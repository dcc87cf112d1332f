//! Read-only auction aggregates over owned (sold or retained) players.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::db::models::{Player, Team};
use crate::db::{players, teams, Ledger};
use crate::error::Result;
use crate::types::{Category, Money};

const TOP_PLAYERS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct TeamSpending {
    pub team_id: i64,
    pub name: String,
    pub short_code: String,
    pub players: i64,
    pub total: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpensivePlayer {
    pub player_id: i64,
    pub name: String,
    pub category: Category,
    pub team: Option<String>,
    pub price: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuctionStats {
    pub team_spending: Vec<TeamSpending>,
    pub expensive_players: Vec<ExpensivePlayer>,
    pub category_distribution: BTreeMap<String, i64>,
    pub total_spent: Money,
}

pub async fn auction_stats(ledger: &Ledger) -> Result<AuctionStats> {
    let mut conn = ledger.pool().acquire().await?;
    let teams = teams::list(&mut *conn).await?;
    let owned = players::owned(&mut *conn).await?;
    Ok(compute(&teams, &owned))
}

pub fn compute(teams: &[Team], owned: &[Player]) -> AuctionStats {
    let names: HashMap<i64, &Team> = teams.iter().map(|t| (t.id, t)).collect();

    let mut by_team: HashMap<i64, (i64, Money)> = HashMap::new();
    let mut category_distribution = BTreeMap::new();
    for p in owned {
        if let Some(team_id) = p.sold_to_team_id {
            let slot = by_team.entry(team_id).or_insert((0, Money::ZERO));
            slot.0 += 1;
            slot.1 = slot.1.saturating_add(p.sold_price.unwrap_or_default());
        }
        *category_distribution.entry(p.category.to_string()).or_insert(0) += 1;
    }

    let mut team_spending: Vec<TeamSpending> = teams
        .iter()
        .map(|t| {
            let (players, total) = by_team.get(&t.id).copied().unwrap_or((0, Money::ZERO));
            TeamSpending {
                team_id: t.id,
                name: t.name.clone(),
                short_code: t.short_code.clone(),
                players,
                total,
            }
        })
        .collect();
    team_spending.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

    let mut ranked: Vec<&Player> = owned.iter().collect();
    ranked.sort_by(|a, b| b.sold_price.cmp(&a.sold_price).then_with(|| a.id.cmp(&b.id)));
    let expensive_players = ranked
        .into_iter()
        .take(TOP_PLAYERS)
        .map(|p| ExpensivePlayer {
            player_id: p.id,
            name: p.name.clone(),
            category: p.category,
            team: p
                .sold_to_team_id
                .and_then(|id| names.get(&id))
                .map(|t| t.name.clone()),
            price: p.sold_price.unwrap_or_default(),
        })
        .collect();

    let total_spent = owned
        .iter()
        .filter_map(|p| p.sold_price)
        .fold(Money::ZERO, Money::saturating_add);

    AuctionStats {
        team_spending,
        expensive_players,
        category_distribution,
        total_spent,
    }
}
