//! The single task owning the [`LiveManager`].
//!
//! Commands from the HTTP surface and timer ticks are handled one at a time;
//! a branch runs to completion before the loop polls again, so tick `N`
//! finishes (promotion included) before tick `N + 1` starts.

use std::sync::Arc;
use std::time::Duration;

use api::event::Event;
use api::response::{BroadcastState, ChatMessage, CountdownDisplay, Recording};
use api::session::{LiveSession, NewSession};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config;
use crate::countdown::{compute_countdown, time_until_live};
use crate::error::AppError;
use crate::manager::LiveManager;
use crate::media::TrackKind;
use crate::result::Result;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    Upcoming(Reply<Vec<LiveSession>>),
    Create(NewSession, Reply<LiveSession>),
    Countdown(String, Reply<CountdownDisplay>),
    Promote(String, Reply<LiveSession>),
    Stop(String, Reply<LiveSession>),
    StopCurrent(Reply<LiveSession>),
    Retry(Reply<BroadcastState>),
    Toggle(TrackKind, Reply<Option<bool>>),
    Record(Reply<Recording>),
    Chat {
        username: Option<String>,
        message: String,
        is_admin: bool,
        reply: Reply<ChatMessage>,
    },
    State(Reply<BroadcastState>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
}

impl SchedulerHandle {
    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| AppError::SchedulerClosed)?;
        rx.await.map_err(|_| AppError::SchedulerClosed)?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn list_upcoming(&self) -> Result<Vec<LiveSession>> {
        self.call(Command::Upcoming).await
    }

    pub async fn create_session(&self, new: NewSession) -> Result<LiveSession> {
        self.call(|reply| Command::Create(new, reply)).await
    }

    pub async fn countdown(&self, id: String) -> Result<CountdownDisplay> {
        self.call(|reply| Command::Countdown(id, reply)).await
    }

    pub async fn promote_to_live(&self, id: String) -> Result<LiveSession> {
        self.call(|reply| Command::Promote(id, reply)).await
    }

    pub async fn stop_session(&self, id: String) -> Result<LiveSession> {
        self.call(|reply| Command::Stop(id, reply)).await
    }

    pub async fn stop_current(&self) -> Result<LiveSession> {
        self.call(Command::StopCurrent).await
    }

    pub async fn retry_capture(&self) -> Result<BroadcastState> {
        self.call(Command::Retry).await
    }

    pub async fn toggle(&self, kind: TrackKind) -> Result<Option<bool>> {
        self.call(|reply| Command::Toggle(kind, reply)).await
    }

    pub async fn toggle_recording(&self) -> Result<Recording> {
        self.call(Command::Record).await
    }

    pub async fn send_chat(
        &self,
        username: Option<String>,
        message: String,
        is_admin: bool,
    ) -> Result<ChatMessage> {
        self.call(|reply| Command::Chat {
            username,
            message,
            is_admin,
            reply,
        })
        .await
    }

    pub async fn state(&self) -> Result<BroadcastState> {
        self.call(Command::State).await
    }

    /// Stop the loop and release the local stream, waits for the loop to finish
    pub async fn shutdown(&self) {
        let (done, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(done)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

pub struct Scheduler {
    manager: LiveManager,
    clock: Arc<dyn Clock>,
    tick_period: Duration,
    refresh_ticks: u32,
    simulate_period: Option<Duration>,
    upcoming: Vec<LiveSession>,
    ticks: u32,
}

impl Scheduler {
    pub fn new(
        manager: LiveManager,
        clock: Arc<dyn Clock>,
        schedule: &config::Schedule,
        simulate: &config::Simulate,
    ) -> Self {
        Self {
            manager,
            clock,
            tick_period: schedule.tick_period(),
            refresh_ticks: schedule.upcoming_refresh_ticks.0.max(1),
            simulate_period: simulate.enabled.then(|| simulate.period()),
            upcoming: vec![],
            ticks: 0,
        }
    }

    pub fn spawn(self) -> (SchedulerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);
        let handle = SchedulerHandle {
            tx,
            events: self.manager.events(),
        };
        (handle, tokio::spawn(self.run(rx)))
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let mut tick = tokio::time::interval(self.tick_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let simulating = self.simulate_period.is_some();
        let mut simulate = tokio::time::interval(self.simulate_period.unwrap_or(self.tick_period));
        simulate.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period = ?self.tick_period, simulating, "scheduler started");
        self.refresh().await;
        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Shutdown(done)) => {
                        self.manager.shutdown(self.clock.now());
                        let _ = done.send(());
                        break;
                    }
                    Some(command) => self.handle(command).await,
                    None => {
                        self.manager.shutdown(self.clock.now());
                        break;
                    }
                },
                _ = tick.tick() => self.on_tick().await,
                _ = simulate.tick(), if simulating => {
                    let now = self.clock.now();
                    self.manager.simulate(now).await;
                }
            }
        }
        info!("scheduler stopped");
    }

    async fn refresh(&mut self) {
        match self.manager.list_upcoming(self.clock.now()).await {
            Ok(upcoming) => {
                debug!(count = upcoming.len(), "upcoming sessions refreshed");
                self.upcoming = upcoming;
            }
            Err(e) => warn!(?e, "upcoming sessions refresh failed"),
        }
    }

    async fn on_tick(&mut self) {
        let now = self.clock.now();
        self.ticks = self.ticks.wrapping_add(1);

        // rendered from the local clock whatever the store does
        if let Some(next) = self.upcoming.first() {
            let _ = self.manager.events().send(Event::Countdown {
                session_id: next.id.clone(),
                countdown: compute_countdown(next, now),
                next: time_until_live(next.start_time.unwrap_or(now), now),
            });
        }

        match self.manager.tick(now).await {
            Ok(Some(session)) => {
                debug!(id = session.id, "tick promoted session");
                self.refresh().await;
            }
            Ok(None) => {
                if self.ticks % self.refresh_ticks == 0 {
                    self.refresh().await;
                }
            }
            Err(e) => warn!(?e, "tick failed, retrying on next tick"),
        }
    }

    async fn handle(&mut self, command: Command) {
        let now = self.clock.now();
        match command {
            Command::Upcoming(reply) => {
                let _ = reply.send(self.manager.list_upcoming(now).await);
            }
            Command::Create(new, reply) => {
                let result = self.manager.create_session(new, now).await;
                if result.is_ok() {
                    self.refresh().await;
                }
                let _ = reply.send(result);
            }
            Command::Countdown(id, reply) => {
                let result = self
                    .manager
                    .session(&id)
                    .await
                    .map(|session| compute_countdown(&session, now));
                let _ = reply.send(result);
            }
            Command::Promote(id, reply) => {
                let result = self.manager.promote_to_live(&id, now).await;
                if result.is_ok() {
                    self.refresh().await;
                }
                let _ = reply.send(result);
            }
            Command::Stop(id, reply) => {
                let _ = reply.send(self.manager.stop_session(&id, now).await);
            }
            Command::StopCurrent(reply) => {
                let _ = reply.send(self.manager.stop_current(now).await);
            }
            Command::Retry(reply) => {
                let _ = reply.send(self.manager.retry_capture(now).await);
            }
            Command::Toggle(kind, reply) => {
                let _ = reply.send(Ok(self.manager.toggle(kind)));
            }
            Command::Record(reply) => {
                let _ = reply.send(self.manager.toggle_recording(now));
            }
            Command::Chat {
                username,
                message,
                is_admin,
                reply,
            } => {
                let _ = reply.send(self.manager.send_chat(username, &message, is_admin, now));
            }
            Command::State(reply) => {
                let _ = reply.send(Ok(self.manager.state(now)));
            }
            Command::Shutdown(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Device;
    use crate::media::VirtualCapture;
    use crate::store::{MemStore, SessionStore};
    use api::session::SessionStatus;
    use chrono::{TimeDelta, Utc};

    fn scheduler(clock: Arc<ManualClock>) -> (SchedulerHandle, JoinHandle<()>) {
        scheduler_with_store(clock, MemStore::new())
    }

    fn scheduler_with_store(
        clock: Arc<ManualClock>,
        store: MemStore,
    ) -> (SchedulerHandle, JoinHandle<()>) {
        let (tx, _) = broadcast::channel(256);
        let manager = LiveManager::new(
            Arc::new(store),
            Arc::new(VirtualCapture::new(Device::Virtual)),
            tx,
        );
        let schedule = config::Schedule {
            tick_period: config::TickPeriod(20),
            ..Default::default()
        };
        let simulate = config::Simulate {
            enabled: false,
            ..Default::default()
        };
        Scheduler::new(manager, clock, &schedule, &simulate).spawn()
    }

    #[tokio::test]
    async fn test_promotes_when_clock_reaches_start() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let (handle, task) = scheduler(clock.clone());
        let mut events = handle.subscribe();

        let session = handle
            .create_session(NewSession {
                title: "Evening Q&A".to_string(),
                host_name: "Asha".to_string(),
                start_time: Some(start + TimeDelta::seconds(30)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(handle.list_upcoming().await.unwrap().len(), 1);

        clock.advance(TimeDelta::seconds(31));
        let promoted = loop {
            match events.recv().await.unwrap() {
                Event::SessionPromoted { session } => break session,
                _ => continue,
            }
        };
        assert_eq!(promoted.id, session.id);
        assert_eq!(promoted.status, SessionStatus::Live);
        assert!(handle.state().await.unwrap().streaming);
        assert!(handle.list_upcoming().await.unwrap().is_empty());

        handle.shutdown().await;
        task.await.unwrap();
        assert!(matches!(
            handle.state().await,
            Err(AppError::SchedulerClosed)
        ));
    }

    #[tokio::test]
    async fn test_publishes_countdown_for_next_session() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let (handle, _task) = scheduler(clock);
        let mut events = handle.subscribe();
        let session = handle
            .create_session(NewSession {
                title: "Budget".to_string(),
                host_name: "Asha".to_string(),
                start_time: Some(start + TimeDelta::seconds(45)),
                ..Default::default()
            })
            .await
            .unwrap();

        let (session_id, countdown, next) = loop {
            if let Event::Countdown {
                session_id,
                countdown,
                next,
            } = events.recv().await.unwrap()
            {
                break (session_id, countdown, next);
            }
        };
        assert_eq!(session_id, session.id);
        assert_eq!(countdown.display, "45s");
        assert_eq!(next, "45s remaining");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_loop_survives_store_outage() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let store = MemStore::new();
        let (handle, task) = scheduler_with_store(clock.clone(), store.clone());
        let mut events = handle.subscribe();

        let session = handle
            .create_session(NewSession {
                title: "Ward Meeting".to_string(),
                host_name: "Asha".to_string(),
                start_time: Some(start + TimeDelta::seconds(10)),
                ..Default::default()
            })
            .await
            .unwrap();

        store.set_available(false);
        clock.advance(TimeDelta::seconds(11));
        // several ticks fail against the offline store
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            store.get(&session.id).await.unwrap_err().to_string(),
            "record store unavailable: memory store offline"
        );
        assert!(matches!(
            handle.list_upcoming().await,
            Err(AppError::Unavailable(_))
        ));

        store.set_available(true);
        let promoted = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Event::SessionPromoted { session } = events.recv().await.unwrap() {
                    break session;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(promoted.id, session.id);
        assert_eq!(
            store.get(&session.id).await.unwrap().unwrap().status,
            SessionStatus::Live
        );

        handle.shutdown().await;
        task.await.unwrap();
    }
}
