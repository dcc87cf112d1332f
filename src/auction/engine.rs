use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::info;

use crate::db::models::{AuctionRound, Player, PlayerWithTeam, RoundView, SquadEntry, Team};
use crate::db::{self, players, rounds, squad, teams, Ledger};
use crate::error::{AppError, Result};
use crate::types::{now_ns, Money, PlayerStatus, RoundStatus};

/// Everything a sale touched, as committed.
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    pub round: AuctionRound,
    pub player: Player,
    pub team: Team,
    pub entry: SquadEntry,
}

/// Round lifecycle: start -> bid / update-bid -> sell | unsold.
///
/// Every operation is one ledger transaction. Preconditions are read after the
/// transaction holds the write lock, so two admins clicking "sell" at once
/// serialize and the second sees a completed round.
#[derive(Clone)]
pub struct AuctionEngine {
    ledger: Ledger,
}

impl AuctionEngine {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    pub async fn start(&self, player_id: i64) -> Result<AuctionRound> {
        let round = self
            .ledger
            .with_transaction("start", move |conn| Box::pin(start_round(conn, player_id)))
            .await?;
        info!(
            event = "ROUND_STARTED",
            round_id = round.id,
            player_id,
            base_price = %round.current_bid,
            "ROUND STARTED | round: {} | player: {} | opening bid: {}",
            round.id, player_id, round.current_bid,
        );
        Ok(round)
    }

    /// Sets the bid to `amount` (absolute, not an increment) with `team_id` leading.
    pub async fn bid(&self, round_id: i64, team_id: i64, amount: Money) -> Result<AuctionRound> {
        let round = self
            .ledger
            .with_transaction("bid", move |conn| {
                Box::pin(set_bid(conn, round_id, Some(team_id), amount))
            })
            .await?;
        info!(
            event = "BID_PLACED",
            round_id,
            team_id,
            amount = %amount,
            "BID | round: {} | team: {} | amount: {}",
            round_id, team_id, amount,
        );
        Ok(round)
    }

    /// Corrects the bid amount without changing the leading team.
    pub async fn update_bid(&self, round_id: i64, amount: Money) -> Result<AuctionRound> {
        let round = self
            .ledger
            .with_transaction("update_bid", move |conn| {
                Box::pin(set_bid(conn, round_id, None, amount))
            })
            .await?;
        info!(
            event = "BID_CORRECTED",
            round_id,
            amount = %amount,
            leader = ?round.current_bid_team_id,
            "BID CORRECTED | round: {} | amount: {}",
            round_id, amount,
        );
        Ok(round)
    }

    pub async fn sell(&self, round_id: i64) -> Result<Sale> {
        let sale = self
            .ledger
            .with_transaction("sell", move |conn| Box::pin(sell_round(conn, round_id)))
            .await?;
        info!(
            event = "ROUND_SOLD",
            round_id,
            player_id = sale.player.id,
            team_id = sale.team.id,
            price = %sale.entry.price,
            purse_remaining = %sale.team.purse_remaining,
            "SOLD | {} -> {} for {} | purse left: {}",
            sale.player.name, sale.team.short_code, sale.entry.price, sale.team.purse_remaining,
        );
        Ok(sale)
    }

    pub async fn mark_unsold(&self, round_id: i64) -> Result<AuctionRound> {
        let round = self
            .ledger
            .with_transaction("unsold", move |conn| Box::pin(close_unsold(conn, round_id)))
            .await?;
        info!(
            event = "ROUND_UNSOLD",
            round_id,
            player_id = round.player_id,
            "UNSOLD | round: {} | player: {}",
            round_id, round.player_id,
        );
        Ok(round)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn current(&self) -> Result<Option<RoundView>> {
        let mut conn = self.ledger.pool().acquire().await?;
        match rounds::live(&mut *conn).await? {
            Some(round) => Ok(Some(round_view(&mut conn, round).await?)),
            None => Ok(None),
        }
    }

    pub async fn history(&self, limit: i64) -> Result<Vec<RoundView>> {
        let mut conn = self.ledger.pool().acquire().await?;
        let completed = rounds::completed(&mut *conn, limit).await?;
        let mut views = Vec::with_capacity(completed.len());
        for round in completed {
            views.push(round_view(&mut conn, round).await?);
        }
        Ok(views)
    }

    /// Players whose round closed most recently, with the buying team if sold.
    pub async fn recently_sold(&self, limit: i64) -> Result<Vec<PlayerWithTeam>> {
        let mut conn = self.ledger.pool().acquire().await?;
        let closed = players::recently_closed(&mut *conn, limit).await?;
        let mut feed = Vec::with_capacity(closed.len());
        for player in closed {
            let team = match player.sold_to_team_id {
                Some(id) => teams::fetch(&mut *conn, id).await?,
                None => None,
            };
            feed.push(PlayerWithTeam { player, team });
        }
        Ok(feed)
    }
}

async fn round_view(conn: &mut SqliteConnection, round: AuctionRound) -> Result<RoundView> {
    let player = players::require(&mut *conn, round.player_id).await?;
    let leading_team = match round.current_bid_team_id {
        Some(id) => teams::fetch(&mut *conn, id).await?,
        None => None,
    };
    Ok(RoundView {
        round,
        player,
        leading_team,
    })
}

/// The round, if it exists and is still live.
async fn live_round(conn: &mut SqliteConnection, round_id: i64) -> Result<AuctionRound> {
    let round = rounds::require(&mut *conn, round_id).await?;
    if round.status != RoundStatus::Live {
        return Err(AppError::conflict(format!("Auction round {round_id} is no longer live")));
    }
    Ok(round)
}

async fn start_round(conn: &mut SqliteConnection, player_id: i64) -> Result<AuctionRound> {
    let now = now_ns();
    let opened = match rounds::open_for(&mut *conn, player_id, now).await {
        Ok(opened) => opened,
        Err(e) if db::is_unique_violation(&e) => {
            return Err(AppError::conflict("An auction is already in progress"));
        }
        Err(e) => return Err(e),
    };

    let Some(round) = opened else {
        let player = players::require(&mut *conn, player_id).await?;
        return Err(AppError::conflict(format!(
            "{} cannot be auctioned while {}",
            player.name, player.status
        )));
    };

    players::set_status(&mut *conn, player_id, PlayerStatus::InAuction, now).await?;
    Ok(round)
}

/// `team_id = None` keeps the current leader (bid correction).
async fn set_bid(
    conn: &mut SqliteConnection,
    round_id: i64,
    team_id: Option<i64>,
    amount: Money,
) -> Result<AuctionRound> {
    if amount < Money::ZERO {
        return Err(AppError::validation("Bid amount must not be negative"));
    }
    let round = live_round(conn, round_id).await?;
    let player = players::require(&mut *conn, round.player_id).await?;
    if amount < player.base_price {
        return Err(AppError::validation(format!(
            "Bid of {amount} is below {}'s base price of {}",
            player.name, player.base_price
        )));
    }

    let leader = team_id.or(round.current_bid_team_id);
    if let Some(leader) = leader {
        let team = teams::require(&mut *conn, leader).await?;
        if team.purse_remaining < amount {
            return Err(teams::insufficient(&team));
        }
    }

    rounds::set_bid(&mut *conn, round_id, amount, leader, now_ns()).await
}

async fn sell_round(conn: &mut SqliteConnection, round_id: i64) -> Result<Sale> {
    let now = now_ns();
    let round = live_round(conn, round_id).await?;
    let Some(team_id) = round.current_bid_team_id else {
        return Err(AppError::NoBidder);
    };
    let price = round.current_bid;

    let team = teams::require(&mut *conn, team_id).await?;
    if team.purse_remaining < price {
        return Err(teams::insufficient(&team));
    }

    let round = rounds::complete(&mut *conn, round_id, now).await?;
    let player = players::assign(&mut *conn, round.player_id, PlayerStatus::Sold, team_id, price, now).await?;
    let entry = match squad::insert(&mut *conn, team_id, player.id, price, false, now).await {
        Ok(entry) => entry,
        Err(e) if db::is_unique_violation(&e) => {
            return Err(AppError::conflict(format!("{} already belongs to a squad", player.name)));
        }
        Err(e) => return Err(e),
    };
    let team = teams::debit(&mut *conn, team_id, price, now).await?;

    Ok(Sale {
        round,
        player,
        team,
        entry,
    })
}

async fn close_unsold(conn: &mut SqliteConnection, round_id: i64) -> Result<AuctionRound> {
    let now = now_ns();
    let round = live_round(conn, round_id).await?;
    let round = rounds::complete(&mut *conn, round.id, now).await?;
    players::set_status(&mut *conn, round.player_id, PlayerStatus::Unsold, now).await?;
    Ok(round)
}
