use axum::extract::Request;
use axum::Router;

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use tracing::{error, info, info_span, Level};

use crate::announce::MemFeed;
use crate::auth::ManyValidate;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::manager::LiveManager;
use crate::media::{Constraints, VirtualCapture};
use crate::route::{event, live, session, AppState};
use crate::scheduler::Scheduler;
use crate::simulate::{ActivitySimulator, QuietActivity, RandomActivity};
use crate::store::{MemStore, RestStore, SessionStore};

pub mod announce;
pub mod auth;
pub mod chat;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod error;
pub mod hook;
pub mod manager;
pub mod media;
pub mod recorder;
pub mod result;
pub mod route;
pub mod scheduler;
pub mod simulate;
pub mod store;

pub use countdown::compute_countdown;
pub use error::AppError;

pub async fn serve<F>(cfg: Config, listener: TcpListener, signal: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store: Arc<dyn SessionStore> = match &cfg.store {
        config::Store::Memory => Arc::new(MemStore::new()),
        config::Store::Rest(rest) => Arc::new(RestStore::new(rest)?),
    };
    let simulator: Box<dyn ActivitySimulator> = if cfg.simulate.enabled {
        Box::new(RandomActivity::new(&cfg.simulate))
    } else {
        Box::new(QuietActivity::default())
    };
    let feed = MemFeed::new();
    let (events, _) = broadcast::channel(256);
    hook::spawn_webhooks(&cfg.webhook.webhooks, &events)?;

    let mut manager = LiveManager::new(
        store,
        Arc::new(VirtualCapture::new(cfg.media.device)),
        events,
    )
    .with_constraints(Constraints::from(&cfg.media))
    .with_simulator(simulator);
    if cfg.announce.enabled {
        manager = manager.with_announcer(Arc::new(feed.clone()), cfg.announce.tags.clone());
    }
    let (scheduler, task) =
        Scheduler::new(manager, Arc::new(SystemClock), &cfg.schedule, &cfg.simulate).spawn();

    let (closing_tx, closing) = watch::channel(false);
    let app_state = AppState {
        config: cfg.clone(),
        scheduler: scheduler.clone(),
        feed,
        closing,
    };
    let auth_layer = ValidateRequestHeaderLayer::custom(ManyValidate::new(cfg.auth.tokens.clone()));
    let app = Router::new()
        .merge(
            session::admin_route()
                .merge(live::admin_route())
                .layer(auth_layer),
        )
        .merge(session::route())
        .merge(live::route())
        .merge(event::route())
        .with_state(app_state)
        .layer(if cfg.http.cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let span = info_span!(
                        "http_request",
                        uri = ?request.uri(),
                        method = ?request.method(),
                        span_id = tracing::field::Empty,
                    );
                    span.record(
                        "span_id",
                        span.id().unwrap_or(tracing::Id::from_u64(42)).into_u64(),
                    );
                    span
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO))
                .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
        );

    info!(addr = ?listener.local_addr(), "onair server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            let _ = closing_tx.send(true);
        })
        .await
        .unwrap_or_else(|e| error!("Application error: {e}"));

    scheduler.shutdown().await;
    if let Err(e) = task.await {
        error!(?e, "scheduler task failed");
    }
    Ok(())
}
