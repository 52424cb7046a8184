//! Recording of the local broadcast stream.
//!
//! A broadcast owns one [`Recorder`]. Recording can be started and stopped
//! any number of times while the stream is up; each start opens a new file
//! under the session id, and releasing the broadcast stops the open one.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::media::{MediaError, MediaStream};

struct Recording {
    file: String,
    started_at: DateTime<Utc>,
}

pub struct Recorder {
    session_id: String,
    active: Option<Recording>,
}

impl Recorder {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Start writing `stream`, returns the file name. Starting twice keeps
    /// the file already open.
    pub fn start(&mut self, stream: &MediaStream, now: DateTime<Utc>) -> Result<String, MediaError> {
        if let Some(recording) = &self.active {
            debug!(file = recording.file, "already recording");
            return Ok(recording.file.clone());
        }
        if stream.tracks().iter().all(|t| t.is_stopped()) {
            return Err(MediaError::Device("stream has no live track".to_string()));
        }
        let file = format!(
            "{}/{}",
            self.session_id,
            now.format("live-session-%Y-%m-%dT%H-%M-%S.webm")
        );
        info!(file, tracks = stream.tracks().len(), "recording started");
        self.active = Some(Recording {
            file: file.clone(),
            started_at: now,
        });
        Ok(file)
    }

    /// Close the open file, returns its name or None when not recording
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<String> {
        let recording = self.active.take()?;
        let duration = (now - recording.started_at).num_seconds().max(0);
        info!(file = recording.file, duration, "recording stopped");
        Some(recording.file)
    }
}
