use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::{Admin, Principal};
use super::routes::ApiState;
use super::{ApiJson, ApiPath};
use crate::error::AppError;
use crate::registry::{NewTeam, TeamPatch};
use crate::types::Money;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/teams", get(list_teams).post(create_team))
        .route("/teams/me", get(my_team))
        .route("/teams/release", post(release_player))
        .route("/teams/:id", get(get_team).put(update_team).delete(delete_team))
        .route("/teams/:id/players", get(team_players))
        .route("/teams/:id/retain", post(retain_player))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetainRequest {
    pub player_id: i64,
    pub price: Money,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseRequest {
    pub team_id: i64,
    pub player_id: i64,
}

async fn list_teams(State(state): State<ApiState>) -> Result<Json<Value>, AppError> {
    let teams = state.registry.list_teams().await?;
    Ok(Json(json!({ "teams": teams })))
}

async fn my_team(State(state): State<ApiState>, principal: Principal) -> Result<Json<Value>, AppError> {
    let team_id = principal
        .team_id
        .ok_or_else(|| AppError::Forbidden("no team is linked to this user".into()))?;
    let team = state.registry.team_detail(team_id).await?;
    Ok(Json(json!({ "team": team })))
}

async fn get_team(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let team = state.registry.team_detail(id).await?;
    Ok(Json(json!({ "team": team })))
}

async fn team_players(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let players = state.registry.team_squad(id).await?;
    Ok(Json(json!({ "players": players })))
}

async fn create_team(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiJson(req): ApiJson<NewTeam>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let team = state.registry.create_team(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Team created successfully", "team": team })),
    ))
}

async fn update_team(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<TeamPatch>,
) -> Result<Json<Value>, AppError> {
    let team = state.registry.update_team(id, patch).await?;
    Ok(Json(json!({ "message": "Team updated successfully", "team": team })))
}

async fn delete_team(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let team = state.registry.delete_team(id).await?;
    Ok(Json(json!({ "message": "Team deleted successfully", "team": team })))
}

async fn retain_player(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiPath(team_id): ApiPath<i64>,
    ApiJson(req): ApiJson<RetainRequest>,
) -> Result<Json<Value>, AppError> {
    let retention = state.retention.retain(team_id, req.player_id, req.price).await?;
    Ok(Json(json!({ "message": "Player retained successfully", "retention": retention })))
}

async fn release_player(
    State(state): State<ApiState>,
    _admin: Admin,
    ApiJson(req): ApiJson<ReleaseRequest>,
) -> Result<Json<Value>, AppError> {
    let release = state.retention.release(req.team_id, req.player_id).await?;
    Ok(Json(json!({ "message": "Player released successfully", "release": release })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::routes::tests::{admin_post, admin_request, app, get, send, team_get};
    use crate::db::testing::{self, seed_player};

    #[tokio::test]
    async fn create_then_read_team_with_squad() {
        let (ledger, app) = app().await;
        let (status, body) = send(
            &app,
            admin_post("/teams", json!({ "name": "Royal Challengers", "short_code": "rcb", "purse_start": 90 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["team"]["short_code"], "RCB");
        let team_id = body["team"]["id"].as_i64().unwrap();

        let player = seed_player(&ledger, "Kohli", 2.0).await;
        let (status, _) = send(
            &app,
            admin_post(&format!("/teams/{team_id}/retain"), json!({ "player_id": player.id, "price": "21" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get(&format!("/teams/{team_id}"))).await;
        assert_eq!(body["team"]["purse_remaining"], json!(69.0));
        assert_eq!(body["team"]["summary"]["squad_size"], 1);
        assert_eq!(body["team"]["squad"][0]["player"]["name"], "Kohli");

        let (_, body) = send(&app, team_get("/teams/me", team_id)).await;
        assert_eq!(body["team"]["id"], team_id);

        let (status, body) = send(
            &app,
            admin_post("/teams/release", json!({ "team_id": team_id, "player_id": player.id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["release"]["refunded"], json!(21.0));
        testing::assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn unknown_fields_and_missing_teams_are_rejected() {
        let (_ledger, app) = app().await;
        let (status, _) = send(
            &app,
            admin_post("/teams", json!({ "name": "X", "short_code": "X", "purse_start": 1, "purse_remaining": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            admin_post("/teams", json!({ "name": "Whale", "short_code": "WHL", "purse_start": 6e16 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");

        let (status, body) = send(&app, get("/teams/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Team 42 not found");

        let (status, _) = send(&app, admin_request("DELETE", "/teams/42", json!(null))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/teams/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn purse_edit_below_spent_is_400() {
        let (ledger, app) = app().await;
        let team = testing::seed_team(&ledger, "SRH", 90.0).await;
        let player = seed_player(&ledger, "Head", 2.0).await;
        send(
            &app,
            admin_post(&format!("/teams/{}/retain", team.id), json!({ "player_id": player.id, "price": 14 })),
        )
        .await;

        let (status, body) = send(
            &app,
            admin_request("PUT", &format!("/teams/{}", team.id), json!({ "purse_start": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
    }
}
