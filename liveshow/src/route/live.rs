use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use http::HeaderMap;

use api::request::Chat;
use api::response::{BroadcastState, ChatMessage, Recording, Track};
use api::session::LiveSession;

use crate::auth::is_admin;
use crate::media::TrackKind;
use crate::result::Result;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::LIVE, get(state))
        .route(api::path::LIVE_CHAT, post(chat))
}

/// Controls of the local broadcast
pub fn admin_route() -> Router<AppState> {
    Router::new()
        .route(api::path::LIVE, delete(stop_current))
        .route(api::path::LIVE_RETRY, post(retry_capture))
        .route(api::path::LIVE_AUDIO, post(toggle_audio))
        .route(api::path::LIVE_VIDEO, post(toggle_video))
        .route(api::path::LIVE_RECORD, post(toggle_recording))
}

async fn state(State(state): State<AppState>) -> Result<Json<BroadcastState>> {
    Ok(Json(state.scheduler.state().await?))
}

async fn stop_current(State(state): State<AppState>) -> Result<Json<LiveSession>> {
    Ok(Json(state.scheduler.stop_current().await?))
}

async fn retry_capture(State(state): State<AppState>) -> Result<Json<BroadcastState>> {
    Ok(Json(state.scheduler.retry_capture().await?))
}

/// `null` without a local track of that kind
async fn toggle_audio(State(state): State<AppState>) -> Result<Json<Option<Track>>> {
    toggle(state, TrackKind::Audio).await
}

async fn toggle_video(State(state): State<AppState>) -> Result<Json<Option<Track>>> {
    toggle(state, TrackKind::Video).await
}

async fn toggle(state: AppState, kind: TrackKind) -> Result<Json<Option<Track>>> {
    let enabled = state.scheduler.toggle(kind).await?;
    Ok(Json(enabled.map(|enabled| Track { enabled })))
}

async fn toggle_recording(State(state): State<AppState>) -> Result<Json<Recording>> {
    Ok(Json(state.scheduler.toggle_recording().await?))
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<Chat>,
) -> Result<Json<ChatMessage>> {
    let is_admin = is_admin(&headers, &state.config.auth.tokens);
    Ok(Json(
        state
            .scheduler
            .send_chat(req.username, req.message, is_admin)
            .await?,
    ))
}
