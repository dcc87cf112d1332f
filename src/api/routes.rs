use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::auth::Admin;
use super::latency::LatencySnapshot;
use super::{players, teams, ApiJson, ApiQuery, LimitQuery};
use crate::auction::{stats, AuctionEngine, ResetController, RetentionManager};
use crate::config::{Config, HISTORY_LIMIT, RECENTLY_SOLD_LIMIT};
use crate::db::Ledger;
use crate::error::AppError;
use crate::registry::Registry;
use crate::types::Money;

#[derive(Clone)]
pub struct ApiState {
    pub ledger: Ledger,
    pub engine: AuctionEngine,
    pub retention: RetentionManager,
    pub reset: ResetController,
    pub registry: Registry,
}

impl ApiState {
    pub fn new(ledger: Ledger, cfg: &Config) -> Self {
        Self {
            engine: AuctionEngine::new(ledger.clone()),
            retention: RetentionManager::new(ledger.clone()),
            reset: ResetController::new(ledger.clone()),
            registry: Registry::new(ledger.clone(), cfg),
            ledger,
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/auction/current", get(get_current))
        .route("/auction/history", get(get_history))
        .route("/auction/recently-sold", get(get_recently_sold))
        .route("/auction/stats", get(get_auction_stats))
        .route("/auction/version", get(get_version))
        .route("/auction/start", post(start_round))
        .route("/auction/bid", post(place_bid))
        .route("/auction/update-bid", post(update_bid))
        .route("/auction/sell", post(sell_round))
        .route("/auction/unsold", post(mark_unsold))
        .route("/auction/reset", post(reset_auction))
        .merge(teams::routes())
        .merge(players::routes())
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartRequest {
    pub player_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BidRequest {
    pub round_id: i64,
    pub team_id: i64,
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBidRequest {
    pub round_id: i64,
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoundRequest {
    pub round_id: i64,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ledger_version: i64,
    pub committed: u64,
    pub rolled_back: u64,
    pub last_commit_at_ns: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_current(State(state): State<ApiState>) -> Result<Json<Value>, AppError> {
    let round = state.engine.current().await?;
    Ok(Json(json!({ "round": round })))
}

async fn get_history(
    State(state): State<ApiState>,
    ApiQuery(params): ApiQuery<LimitQuery>,
) -> Result<Json<Value>, AppError> {
    let rounds = state.engine.history(params.or(HISTORY_LIMIT)).await?;
    Ok(Json(json!({ "rounds": rounds })))
}

async fn get_recently_sold(
    State(state): State<ApiState>,
    ApiQuery(params): ApiQuery<LimitQuery>,
) -> Result<Json<Value>, AppError> {
    let players = state.engine.recently_sold(params.or(RECENTLY_SOLD_LIMIT)).await?;
    Ok(Json(json!({ "players": players })))
}

async fn get_auction_stats(State(state): State<ApiState>) -> Result<Json<stats::AuctionStats>, AppError> {
    Ok(Json(stats::auction_stats(&state.ledger).await?))
}

async fn get_version(State(state): State<ApiState>) -> Result<Json<Value>, AppError> {
    let version = state.ledger.version().await?;
    Ok(Json(json!({ "version": version })))
}

async fn start_round(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiJson(req): ApiJson<StartRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let round = state.engine.start(req.player_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Auction started", "round": round })),
    ))
}

async fn place_bid(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiJson(req): ApiJson<BidRequest>,
) -> Result<Json<Value>, AppError> {
    let round = state.engine.bid(req.round_id, req.team_id, req.amount).await?;
    Ok(Json(json!({ "message": "Bid placed successfully", "round": round })))
}

async fn update_bid(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiJson(req): ApiJson<UpdateBidRequest>,
) -> Result<Json<Value>, AppError> {
    let round = state.engine.update_bid(req.round_id, req.amount).await?;
    Ok(Json(json!({ "message": "Bid updated successfully", "round": round })))
}

async fn sell_round(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiJson(req): ApiJson<RoundRequest>,
) -> Result<Json<Value>, AppError> {
    let sale = state.engine.sell(req.round_id).await?;
    Ok(Json(json!({ "message": "Player sold successfully", "sale": sale })))
}

async fn mark_unsold(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiJson(req): ApiJson<RoundRequest>,
) -> Result<Json<Value>, AppError> {
    let round = state.engine.mark_unsold(req.round_id).await?;
    Ok(Json(json!({ "message": "Player marked as unsold", "round": round })))
}

async fn reset_auction(State(state): State<ApiState>, _admin: Admin) -> Result<Json<Value>, AppError> {
    let summary = state.reset.reset().await?;
    Ok(Json(json!({ "message": "Auction reset successfully", "summary": summary })))
}

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, AppError> {
    let health = state.ledger.health();
    Ok(Json(HealthResponse {
        status: "ok",
        ledger_version: state.ledger.version().await?,
        committed: health.committed(),
        rolled_back: health.rolled_back(),
        last_commit_at_ns: health.last_commit_at_ns(),
    }))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.ledger.latency().snapshot())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::auth::{ROLE_HEADER, TEAM_ID_HEADER, USER_ID_HEADER};
    use crate::db::testing::{self, crores, seed_player, seed_team};
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    pub async fn app() -> (Ledger, Router) {
        let ledger = Ledger::in_memory().await;
        let state = ApiState::new(ledger.clone(), &Config::default());
        (ledger, router(state))
    }

    pub fn admin_post(uri: &str, body: Value) -> Request<Body> {
        admin_request("POST", uri, body)
    }

    pub fn admin_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, "admin-1")
            .header(ROLE_HEADER, "admin")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn team_get(uri: &str, team_id: i64) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(USER_ID_HEADER, "owner-1")
            .header(ROLE_HEADER, "team")
            .header(TEAM_ID_HEADER, team_id.to_string())
            .body(Body::empty())
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn full_round_over_http() {
        let (ledger, app) = app().await;
        let team = seed_team(&ledger, "MI", 90.0).await;
        let player = seed_player(&ledger, "Rohit", 2.0).await;

        let (status, body) = send(&app, admin_post("/auction/start", json!({ "player_id": player.id }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let round_id = body["round"]["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            admin_post("/auction/bid", json!({ "round_id": round_id, "team_id": team.id, "amount": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["round"]["current_bid"], json!(5.0));

        let (_, body) = send(&app, get("/auction/current")).await;
        assert_eq!(body["round"]["player"]["name"], "Rohit");
        assert_eq!(body["round"]["leading_team"]["short_code"], "MI");

        let (status, body) = send(&app, admin_post("/auction/sell", json!({ "round_id": round_id }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sale"]["team"]["purse_remaining"], json!(85.0));

        let (_, body) = send(&app, get("/auction/current")).await;
        assert!(body["round"].is_null());

        let (_, body) = send(&app, get("/auction/recently-sold?limit=5")).await;
        assert_eq!(body["players"][0]["team"]["short_code"], "MI");
        testing::assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn insufficient_funds_body_carries_available_purse() {
        let (ledger, app) = app().await;
        let team = seed_team(&ledger, "CSK", 90.0).await;
        let player = seed_player(&ledger, "Dhoni", 2.0).await;
        let (_, body) = send(&app, admin_post("/auction/start", json!({ "player_id": player.id }))).await;
        let round_id = body["round"]["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            admin_post("/auction/bid", json!({ "round_id": round_id, "team_id": team.id, "amount": "200" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "insufficient_funds");
        assert_eq!(body["available"], json!(90.0));
    }

    #[tokio::test]
    async fn malformed_amount_is_a_validation_error() {
        let (_ledger, app) = app().await;
        for amount in [json!("abc"), json!(-1), json!(null), json!(6e16), json!("1e10")] {
            let (status, body) = send(
                &app,
                admin_post("/auction/bid", json!({ "round_id": 1, "team_id": 1, "amount": amount })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}");
            assert_eq!(body["code"], "validation_error");
        }
    }

    #[tokio::test]
    async fn second_start_is_409_and_sell_without_bidder_is_400() {
        let (ledger, app) = app().await;
        let p1 = seed_player(&ledger, "Kohli", 2.0).await;
        let p2 = seed_player(&ledger, "Bumrah", 2.0).await;

        let (_, body) = send(&app, admin_post("/auction/start", json!({ "player_id": p1.id }))).await;
        let round_id = body["round"]["id"].as_i64().unwrap();
        let (status, body) = send(&app, admin_post("/auction/start", json!({ "player_id": p2.id }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");

        let (status, body) = send(&app, admin_post("/auction/sell", json!({ "round_id": round_id }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "no_bidder");
    }

    #[tokio::test]
    async fn mutations_require_an_admin() {
        let (ledger, app) = app().await;
        let team = seed_team(&ledger, "RR", 90.0).await;

        let anonymous = Request::builder()
            .method("POST")
            .uri("/auction/reset")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, anonymous).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut as_team = team_get("/auction/reset", team.id);
        *as_team.method_mut() = axum::http::Method::POST;
        let (status, body) = send(&app, as_team).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "forbidden");
    }

    #[tokio::test]
    async fn health_version_and_latency_reflect_commits() {
        let (ledger, app) = app().await;
        let player = seed_player(&ledger, "Jaiswal", 1.0).await;
        send(&app, admin_post("/auction/start", json!({ "player_id": player.id }))).await;

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["committed"], 1);

        let (_, body) = send(&app, get("/auction/version")).await;
        assert_eq!(body["version"], 1);

        let (_, body) = send(&app, get("/stats/latency")).await;
        assert_eq!(body["by_operation"]["start"]["sample_count"], 1);
    }

    #[tokio::test]
    async fn reset_endpoint_restores_baseline() {
        let (ledger, app) = app().await;
        let team = seed_team(&ledger, "KKR", 90.0).await;
        let kept = seed_player(&ledger, "Narine", 2.0).await;
        let other = seed_player(&ledger, "Rinku", 1.0).await;

        let (status, _) = send(
            &app,
            admin_post(&format!("/teams/{}/retain", team.id), json!({ "player_id": kept.id, "price": 15 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        send(&app, admin_post("/auction/start", json!({ "player_id": other.id }))).await;

        let (status, body) = send(&app, admin_post("/auction/reset", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["rounds_deleted"], 1);
        assert_eq!(testing::team(&ledger, team.id).await.purse_remaining, crores(75.0));
        assert_eq!(testing::live_round_count(&ledger).await, 0);
    }
}
