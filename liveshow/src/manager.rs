//! Session lifecycle: promotion of due sessions, the local broadcast and its
//! teardown.
//!
//! A [`LiveManager`] holds at most one current broadcast. While one is held,
//! including one whose capture failed, ticks do not promote anything else.

use std::sync::Arc;

use api::event::Event;
use api::response::{BroadcastState, ChatMessage, Recording};
use api::session::{participants_from_lines, LiveSession, NewSession, SessionStatus};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::announce::{self, Announcer, Silent};
use crate::chat::{ChatLog, ANONYMOUS};
use crate::countdown::format_elapsed;
use crate::error::AppError;
use crate::media::{Constraints, MediaCapture, MediaError, MediaStream, TrackKind};
use crate::recorder::Recorder;
use crate::result::Result;
use crate::simulate::{ActivitySimulator, QuietActivity};
use crate::store::{SessionFilter, SessionPatch, SessionStore, StoreError};

struct Broadcast {
    session: LiveSession,
    stream: Option<MediaStream>,
    recorder: Recorder,
    started_at: DateTime<Utc>,
    viewer_count: u32,
    error: Option<String>,
}

pub struct LiveManager {
    store: Arc<dyn SessionStore>,
    capture: Arc<dyn MediaCapture>,
    announcer: Arc<dyn Announcer>,
    tags: Vec<String>,
    simulator: Box<dyn ActivitySimulator>,
    constraints: Constraints,
    events: broadcast::Sender<Event>,
    current: Option<Broadcast>,
    chat: ChatLog,
}

impl LiveManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        capture: Arc<dyn MediaCapture>,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            store,
            capture,
            announcer: Arc::new(Silent),
            tags: vec![],
            simulator: Box::new(QuietActivity::default()),
            constraints: Constraints {
                audio: true,
                video: true,
            },
            events,
            current: None,
            chat: ChatLog::default(),
        }
    }

    pub fn with_announcer(mut self, announcer: Arc<dyn Announcer>, tags: Vec<String>) -> Self {
        self.announcer = announcer;
        self.tags = tags;
        self
    }

    pub fn with_simulator(mut self, simulator: Box<dyn ActivitySimulator>) -> Self {
        self.simulator = simulator;
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn events(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    pub fn current_session(&self) -> Option<&LiveSession> {
        self.current.as_ref().map(|b| &b.session)
    }

    fn emit(&self, event: Event) {
        // no subscriber is fine
        let _ = self.events.send(event);
    }

    /// Scheduled sessions that have not reached their start time, soonest first
    pub async fn list_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<LiveSession>> {
        Ok(self
            .store
            .query(SessionFilter::status(SessionStatus::Scheduled).after(now))
            .await?)
    }

    pub async fn session(&self, id: &str) -> Result<LiveSession> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }

    pub async fn create_session(
        &mut self,
        new: NewSession,
        now: DateTime<Utc>,
    ) -> Result<LiveSession> {
        let title = new.title.trim();
        let host_name = new.host_name.trim();
        if title.is_empty() || host_name.is_empty() {
            return Err(AppError::validation("title and host name are required"));
        }
        if let Some(start_time) = new.start_time {
            if start_time <= now {
                return Err(AppError::validation("scheduled time must be in the future"));
            }
        } else if let Some(current) = &self.current {
            return Err(AppError::BroadcastActive(current.session.id.clone()));
        }

        let status = if new.start_time.is_some() {
            SessionStatus::Scheduled
        } else {
            SessionStatus::Live
        };
        let session = LiveSession {
            id: String::new(),
            title: title.to_string(),
            description: non_blank(new.description),
            host_name: host_name.to_string(),
            participants: new
                .participants
                .iter()
                .flat_map(|p| participants_from_lines(p))
                .collect(),
            start_time: Some(new.start_time.unwrap_or(now)),
            end_time: None,
            status,
            viewer_count: 0,
            meeting_link: non_blank(new.meeting_link),
        };
        let session = self.store.insert(session).await?;
        info!(id = session.id, %status, start_time = ?session.start_time, "session created");

        match status {
            SessionStatus::Scheduled => {
                self.emit(Event::SessionScheduled {
                    session: session.clone(),
                });
            }
            _ => self.begin(session.clone(), now).await,
        }
        Ok(session)
    }

    /// Promote the earliest due session, at most one per call
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<Option<LiveSession>> {
        if let Some(current) = &self.current {
            debug!(id = current.session.id, "broadcast held, skip promotion");
            return Ok(None);
        }
        let due = self
            .store
            .query(
                SessionFilter::status(SessionStatus::Scheduled)
                    .until(now)
                    .limit(1),
            )
            .await?;
        let Some(session) = due.into_iter().next() else {
            return Ok(None);
        };
        match self.promote_to_live(&session.id, now).await {
            Ok(session) => Ok(Some(session)),
            Err(AppError::Conflict(reason)) => {
                info!(id = session.id, reason, "session promoted elsewhere");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Mark a scheduled session live and start the local broadcast.
    ///
    /// A capture failure leaves the record live; it is kept as the current
    /// broadcast with the error until `retry_capture` or a stop.
    pub async fn promote_to_live(&mut self, id: &str, now: DateTime<Utc>) -> Result<LiveSession> {
        if let Some(current) = &self.current {
            return Err(AppError::BroadcastActive(current.session.id.clone()));
        }
        let session = self
            .store
            .update_if(id, SessionStatus::Scheduled, SessionPatch::status(SessionStatus::Live))
            .await?;
        info!(id = session.id, title = session.title, "session promoted to live");
        self.emit(Event::SessionPromoted {
            session: session.clone(),
        });
        self.begin(session.clone(), now).await;
        Ok(session)
    }

    async fn begin(&mut self, session: LiveSession, now: DateTime<Utc>) {
        self.chat.clear();
        let mut broadcast = Broadcast {
            recorder: Recorder::new(&session.id),
            session,
            stream: None,
            started_at: now,
            viewer_count: 0,
            error: None,
        };
        match self.capture.acquire(self.constraints).await {
            Ok(stream) => self.on_air(&mut broadcast, stream, now).await,
            Err(e) => self.capture_failed(&mut broadcast, e.to_string()),
        }
        self.current = Some(broadcast);
    }

    async fn on_air(&mut self, broadcast: &mut Broadcast, stream: MediaStream, now: DateTime<Utc>) {
        broadcast.stream = Some(stream);
        broadcast.error = None;

        let viewers = self.simulator.seed_viewers();
        broadcast.viewer_count = viewers;
        broadcast.session.viewer_count = viewers;
        if let Err(e) = self
            .store
            .update(&broadcast.session.id, SessionPatch::viewer_count(viewers))
            .await
        {
            warn!(id = broadcast.session.id, ?e, "viewer count not persisted");
        }

        let welcome = self.chat.welcome(&broadcast.session.title, now);
        info!(id = broadcast.session.id, viewers, "broadcast started");
        self.emit(Event::BroadcastStarted {
            session: broadcast.session.clone(),
            viewer_count: viewers,
        });
        self.emit(Event::Chat { message: welcome });

        let content = announce::live_started(&broadcast.session, &self.tags);
        if let Err(e) = self.announcer.announce(content, now).await {
            warn!(id = broadcast.session.id, ?e, "live announcement failed");
        }
    }

    fn capture_failed(&self, broadcast: &mut Broadcast, reason: String) {
        warn!(id = broadcast.session.id, reason, "media capture failed");
        broadcast.error = Some(reason.clone());
        self.emit(Event::CaptureFailed {
            session: broadcast.session.clone(),
            reason,
        });
    }

    /// Try again to acquire the camera/microphone for the current broadcast
    pub async fn retry_capture(&mut self, now: DateTime<Utc>) -> Result<BroadcastState> {
        let mut broadcast = self.current.take().ok_or(AppError::NoActiveBroadcast)?;
        if broadcast.stream.is_none() {
            match self.capture.acquire(self.constraints).await {
                Ok(stream) => self.on_air(&mut broadcast, stream, now).await,
                Err(e) => {
                    self.capture_failed(&mut broadcast, e.to_string());
                    self.current = Some(broadcast);
                    return Err(e.into());
                }
            }
        }
        self.current = Some(broadcast);
        Ok(self.state(now))
    }

    /// End a live session. Stopping an ended session returns it unchanged.
    pub async fn stop_session(&mut self, id: &str, now: DateTime<Utc>) -> Result<LiveSession> {
        let ended = match self
            .store
            .update_if(id, SessionStatus::Live, SessionPatch::ended(now))
            .await
        {
            Ok(ended) => ended,
            Err(StoreError::Conflict {
                actual: SessionStatus::Ended,
                ..
            }) => {
                debug!(id, "session already ended");
                let ended = self.session(id).await?;
                self.release(id, now);
                return Ok(ended);
            }
            Err(e) => return Err(e.into()),
        };

        let (viewers, since) = match &self.current {
            Some(b) if b.session.id == id => (b.viewer_count, Some(b.started_at)),
            _ => (ended.viewer_count, ended.start_time),
        };
        let elapsed = since.map_or(0, |t| (now - t).num_seconds().max(0) as u64);
        self.release(id, now);
        info!(id, viewers, elapsed, end_time = %now, "session ended");
        self.emit(Event::SessionEnded {
            session: ended.clone(),
        });

        let content = announce::live_ended(&ended, viewers, elapsed, &self.tags);
        if let Err(e) = self.announcer.announce(content, now).await {
            warn!(id, ?e, "end announcement failed");
        }
        Ok(ended)
    }

    pub async fn stop_current(&mut self, now: DateTime<Utc>) -> Result<LiveSession> {
        let id = self
            .current
            .as_ref()
            .map(|b| b.session.id.clone())
            .ok_or(AppError::NoActiveBroadcast)?;
        self.stop_session(&id, now).await
    }

    fn release(&mut self, id: &str, now: DateTime<Utc>) {
        if !self.current.as_ref().is_some_and(|b| b.session.id == id) {
            return;
        }
        if let Some(mut broadcast) = self.current.take() {
            broadcast.recorder.stop(now);
            // dropping the stream stops its tracks
        }
        self.chat.clear();
        debug!(id, "local media released");
    }

    pub fn toggle_audio(&mut self) -> Option<bool> {
        self.toggle(TrackKind::Audio)
    }

    pub fn toggle_video(&mut self) -> Option<bool> {
        self.toggle(TrackKind::Video)
    }

    pub fn toggle(&mut self, kind: TrackKind) -> Option<bool> {
        let Some(stream) = self.current.as_ref().and_then(|b| b.stream.as_ref()) else {
            warn!(%kind, "toggle without an active media stream");
            return None;
        };
        let enabled = stream.toggle(kind)?;
        debug!(%kind, enabled, "track toggled");
        self.emit(Event::Track { kind, enabled });
        Some(enabled)
    }

    /// Start recording the current stream, or stop the recording in progress
    pub fn toggle_recording(&mut self, now: DateTime<Utc>) -> Result<Recording> {
        let broadcast = self.current.as_mut().ok_or(AppError::NoActiveBroadcast)?;
        let Some(stream) = broadcast.stream.as_ref() else {
            return Err(MediaError::Device("no media stream to record".to_string()).into());
        };
        let recording = match broadcast.recorder.stop(now) {
            Some(file) => Recording {
                recording: false,
                file,
            },
            None => Recording {
                recording: true,
                file: broadcast.recorder.start(stream, now)?,
            },
        };
        let session_id = broadcast.session.id.clone();
        self.emit(Event::Recording {
            session_id,
            recording: recording.recording,
            file: recording.file.clone(),
        });
        Ok(recording)
    }

    pub fn send_chat(
        &mut self,
        username: Option<String>,
        message: &str,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage> {
        let host_name = match &self.current {
            Some(b) => b.session.host_name.clone(),
            None => return Err(AppError::NoActiveBroadcast),
        };
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::validation("message is empty"));
        }
        let username = username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(ANONYMOUS);
        let is_host = is_admin || username == host_name;
        let msg = self.chat.push(username, message, is_host, now);
        self.emit(Event::Chat {
            message: msg.clone(),
        });
        Ok(msg)
    }

    /// One step of simulated audience activity, only while streaming
    pub async fn simulate(&mut self, now: DateTime<Utc>) {
        let Some(broadcast) = self.current.as_mut() else {
            return;
        };
        if broadcast.stream.is_none() {
            return;
        }
        let viewers = self.simulator.next_viewers(broadcast.viewer_count);
        broadcast.viewer_count = viewers;
        broadcast.session.viewer_count = viewers;
        let id = broadcast.session.id.clone();

        if let Err(e) = self
            .store
            .update(&id, SessionPatch::viewer_count(viewers))
            .await
        {
            warn!(id, ?e, "viewer count not persisted");
        }
        self.emit(Event::ViewerCount {
            session_id: id,
            viewer_count: viewers,
        });

        if let Some((username, message)) = self.simulator.next_chat() {
            let msg = self.chat.push(&username, &message, false, now);
            self.emit(Event::Chat { message: msg });
        }
    }

    pub fn state(&self, now: DateTime<Utc>) -> BroadcastState {
        let Some(broadcast) = &self.current else {
            return BroadcastState {
                elapsed: format_elapsed(0),
                ..Default::default()
            };
        };
        let stream = broadcast.stream.as_ref();
        let elapsed = (now - broadcast.started_at).num_seconds().max(0) as u64;
        BroadcastState {
            session: Some(broadcast.session.clone()),
            streaming: stream.is_some(),
            audio_enabled: stream.is_some_and(|s| s.enabled(TrackKind::Audio)),
            video_enabled: stream.is_some_and(|s| s.enabled(TrackKind::Video)),
            viewer_count: broadcast.viewer_count,
            recording: broadcast.recorder.is_recording(),
            elapsed: format_elapsed(elapsed),
            error: broadcast.error.clone(),
            chat: self.chat.messages(),
        }
    }

    /// Release the local stream, the record keeps its status
    pub fn shutdown(&mut self, now: DateTime<Utc>) {
        if let Some(mut broadcast) = self.current.take() {
            broadcast.recorder.stop(now);
            info!(id = broadcast.session.id, "broadcast view closed");
        }
        self.chat.clear();
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
