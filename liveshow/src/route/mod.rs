use tokio::sync::watch;

use crate::announce::MemFeed;
use crate::config::Config;
use crate::scheduler::SchedulerHandle;

pub mod event;
pub mod live;
pub mod session;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub scheduler: SchedulerHandle,
    pub feed: MemFeed,
    /// Flips to true once the server starts shutting down
    pub closing: watch::Receiver<bool>,
}
