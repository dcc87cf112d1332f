use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::Admin;
use super::routes::ApiState;
use super::{ApiJson, ApiPath, ApiQuery};
use crate::db::models::PlayerStats;
use crate::db::players::PlayerFilter;
use crate::error::AppError;
use crate::registry::{NewPlayer, PlayerPatch};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/players", get(list_players).post(create_player))
        .route("/players/bulk", post(bulk_import))
        .route("/players/available", get(available_players))
        .route("/players/all", delete(delete_all_players))
        .route("/players/:id", get(get_player).put(update_player).delete(delete_player))
        .route("/players/:id/stats", put(record_stats))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkImportRequest {
    pub players: Vec<NewPlayer>,
}

async fn list_players(
    State(state): State<ApiState>,
    ApiQuery(filter): ApiQuery<PlayerFilter>,
) -> Result<Json<Value>, AppError> {
    let players = state.registry.list_players(&filter).await?;
    Ok(Json(json!({ "players": players })))
}

async fn available_players(State(state): State<ApiState>) -> Result<Json<Value>, AppError> {
    let grouped = state.registry.available_players().await?;
    Ok(Json(json!({ "players": grouped })))
}

async fn get_player(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let player = state.registry.player_detail(id).await?;
    Ok(Json(json!({ "player": player })))
}

async fn create_player(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiJson(req): ApiJson<NewPlayer>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let player = state.registry.create_player(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Player created successfully", "player": player })),
    ))
}

async fn bulk_import(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiJson(req): ApiJson<BulkImportRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let players = state.registry.bulk_create_players(req.players).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("{} players imported successfully", players.len()),
            "players": players,
        })),
    ))
}

async fn update_player(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<PlayerPatch>,
) -> Result<Json<Value>, AppError> {
    let player = state.registry.update_player(id, patch).await?;
    Ok(Json(json!({ "message": "Player updated successfully", "player": player })))
}

async fn delete_player(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let player = state.registry.delete_player(id).await?;
    Ok(Json(json!({ "message": "Player deleted successfully", "player": player })))
}

async fn delete_all_players(State(state): State<ApiState>, _admin: Admin) -> Result<Json<Value>, AppError> {
    let summary = state.reset.delete_all_players().await?;
    Ok(Json(json!({
        "message": "All players deleted and team purses reset successfully",
        "summary": summary,
    })))
}

async fn record_stats(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiPath(id): ApiPath<i64>,
    ApiJson(stats): ApiJson<PlayerStats>,
) -> Result<Json<Value>, AppError> {
    let player = state.registry.record_stats(id, stats).await?;
    Ok(Json(json!({ "message": "Player stats updated", "player": player })))
}
