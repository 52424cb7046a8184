use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;

use api::response::CountdownDisplay;
use api::session::{LiveSession, NewSession};

use crate::result::Result;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::UPCOMING, get(list_upcoming))
        .route(&api::path::countdown("{id}"), get(countdown))
}

/// Routes that change session records
pub fn admin_route() -> Router<AppState> {
    Router::new()
        .route(api::path::SESSIONS, post(create_session))
        .route(&api::path::promote("{id}"), post(promote_to_live))
        .route(&api::path::stop("{id}"), post(stop_session))
}

async fn list_upcoming(State(state): State<AppState>) -> Result<Json<Vec<LiveSession>>> {
    Ok(Json(state.scheduler.list_upcoming().await?))
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<NewSession>,
) -> Result<(StatusCode, Json<LiveSession>)> {
    let session = state.scheduler.create_session(req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn countdown(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CountdownDisplay>> {
    Ok(Json(state.scheduler.countdown(id).await?))
}

async fn promote_to_live(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LiveSession>> {
    Ok(Json(state.scheduler.promote_to_live(id).await?))
}

async fn stop_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LiveSession>> {
    Ok(Json(state.scheduler.stop_session(id).await?))
}
