use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use api::response::{
    Announcement, BroadcastState, ChatMessage, CountdownDisplay, Recording, Track,
};
use api::session::{LiveSession, SessionStatus};
use chrono::{TimeDelta, Utc};
use http::StatusCode;
use serde_json::json;
use tokio::net::TcpListener;

use liveshow::config::{Config, Device};

async fn shutdown_signal() {
    std::future::pending::<()>().await
}

async fn serve(cfg: Config) -> SocketAddr {
    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(liveshow::serve(cfg, listener, shutdown_signal()));
    addr
}

fn config() -> Config {
    let mut cfg = Config::default();
    cfg.simulate.enabled = false;
    cfg
}

#[tokio::test]
async fn test_schedule_and_countdown() {
    let addr = serve(config()).await;
    let client = reqwest::Client::new();

    let start_time = Utc::now() + TimeDelta::hours(2);
    let res = client
        .post(format!("http://{addr}{}", api::path::SESSIONS))
        .json(&json!({
            "title": "Monthly Review",
            "host_name": "Asha",
            "participants": "Ravi\nMeena\n",
            "start_time": start_time,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());
    let session = res.json::<LiveSession>().await.unwrap();
    assert_eq!(session.status, SessionStatus::Scheduled);
    assert_eq!(session.participants, vec!["Ravi", "Meena"]);

    let upcoming = reqwest::get(format!("http://{addr}{}", api::path::UPCOMING))
        .await
        .unwrap()
        .json::<Vec<LiveSession>>()
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].id, session.id);

    let countdown = reqwest::get(format!(
        "http://{addr}{}",
        api::path::countdown(&session.id)
    ))
    .await
    .unwrap()
    .json::<CountdownDisplay>()
    .await
    .unwrap();
    assert_eq!(
        countdown.status,
        api::response::CountdownStatus::Scheduled
    );
    assert!(countdown.display.starts_with("1h 59m") || countdown.display.starts_with("2h 0m"));

    let res = reqwest::get(format!("http://{addr}{}", api::path::countdown("missing")))
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn test_past_start_time_rejected() {
    let addr = serve(config()).await;
    let res = reqwest::Client::new()
        .post(format!("http://{addr}{}", api::path::SESSIONS))
        .json(&json!({
            "title": "Too Late",
            "host_name": "Asha",
            "start_time": Utc::now() - TimeDelta::minutes(1),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert_eq!(
        res.text().await.unwrap(),
        "scheduled time must be in the future"
    );
}

#[tokio::test]
async fn test_go_live_now_and_stop() {
    let addr = serve(config()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("http://{addr}{}", api::path::SESSIONS))
        .json(&json!({ "title": "Flood Relief Update", "host_name": "Asha" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());
    let session = res.json::<LiveSession>().await.unwrap();
    assert_eq!(session.status, SessionStatus::Live);

    let res = client
        .post(format!("http://{addr}{}", api::path::SESSIONS))
        .json(&json!({ "title": "Second", "host_name": "Asha" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    let state = reqwest::get(format!("http://{addr}{}", api::path::LIVE))
        .await
        .unwrap()
        .json::<BroadcastState>()
        .await
        .unwrap();
    assert!(state.streaming);
    assert_eq!(state.session.unwrap().id, session.id);

    let track = client
        .post(format!("http://{addr}{}", api::path::LIVE_AUDIO))
        .send()
        .await
        .unwrap()
        .json::<Option<Track>>()
        .await
        .unwrap();
    assert!(!track.unwrap().enabled);

    let recording = client
        .post(format!("http://{addr}{}", api::path::LIVE_RECORD))
        .send()
        .await
        .unwrap()
        .json::<Recording>()
        .await
        .unwrap();
    assert!(recording.recording);
    assert!(recording.file.ends_with(".webm"));
    let state = reqwest::get(format!("http://{addr}{}", api::path::LIVE))
        .await
        .unwrap()
        .json::<BroadcastState>()
        .await
        .unwrap();
    assert!(state.recording);

    let msg = client
        .post(format!("http://{addr}{}", api::path::LIVE_CHAT))
        .json(&json!({ "username": "Ravi", "message": "Stay safe everyone" }))
        .send()
        .await
        .unwrap()
        .json::<ChatMessage>()
        .await
        .unwrap();
    assert_eq!(msg.username, "Ravi");
    assert!(!msg.is_host);

    let res = client
        .delete(format!("http://{addr}{}", api::path::LIVE))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let ended = res.json::<LiveSession>().await.unwrap();
    assert_eq!(ended.status, SessionStatus::Ended);
    assert!(ended.end_time.is_some());

    let again = client
        .post(format!("http://{addr}{}", api::path::stop(&session.id)))
        .send()
        .await
        .unwrap()
        .json::<LiveSession>()
        .await
        .unwrap();
    assert_eq!(again.end_time, ended.end_time);

    let posts = reqwest::get(format!("http://{addr}{}", api::path::ANNOUNCEMENTS))
        .await
        .unwrap()
        .json::<Vec<Announcement>>()
        .await
        .unwrap();
    assert_eq!(posts.len(), 2);
    assert!(posts[1].content.starts_with("LIVE NOW: Flood Relief Update"));
    assert!(posts[0].content.ends_with("#Live #LiveEnded"));
}

#[tokio::test]
async fn test_capture_denied() {
    let mut cfg = config();
    cfg.media.device = Device::Deny;
    let addr = serve(cfg).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("http://{addr}{}", api::path::SESSIONS))
        .json(&json!({ "title": "No Camera", "host_name": "Asha" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());

    let state = reqwest::get(format!("http://{addr}{}", api::path::LIVE))
        .await
        .unwrap()
        .json::<BroadcastState>()
        .await
        .unwrap();
    assert!(!state.streaming);
    assert!(state.error.is_some());

    let res = client
        .post(format!("http://{addr}{}", api::path::LIVE_RETRY))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, res.status());
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let mut cfg = config();
    cfg.auth.tokens = vec!["secret".to_string()];
    let addr = serve(cfg).await;
    let client = reqwest::Client::new();
    let body = json!({ "title": "Guarded", "host_name": "Asha" });

    let res = client
        .post(format!("http://{addr}{}", api::path::SESSIONS))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = reqwest::get(format!("http://{addr}{}", api::path::UPCOMING))
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let res = client
        .post(format!("http://{addr}{}", api::path::SESSIONS))
        .bearer_auth("secret")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());

    let msg = client
        .post(format!("http://{addr}{}", api::path::LIVE_CHAT))
        .bearer_auth("secret")
        .json(&json!({ "message": "Thanks for joining" }))
        .send()
        .await
        .unwrap()
        .json::<ChatMessage>()
        .await
        .unwrap();
    assert_eq!(msg.username, "Anonymous");
    assert!(msg.is_host);
}
