//! Local camera/microphone acquisition.
//!
//! A [`MediaStream`] owns its tracks for the lifetime of one broadcast and
//! stops every track when dropped, so the devices are released on all exit
//! paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use api::event::TrackKind;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{self, Device};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("camera/microphone permission denied: {0}")]
    Permission(String),
    #[error("capture device unavailable: {0}")]
    Device(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    pub audio: bool,
    pub video: bool,
}

impl From<&config::Media> for Constraints {
    fn from(cfg: &config::Media) -> Self {
        Self {
            audio: cfg.audio,
            video: cfg.video,
        }
    }
}

#[derive(Debug)]
struct TrackState {
    enabled: AtomicBool,
    stopped: AtomicBool,
}

/// Handle to one captured track, clones share the same state
#[derive(Debug, Clone)]
pub struct Track {
    id: String,
    kind: TrackKind,
    state: Arc<TrackState>,
}

impl Track {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            state: Arc::new(TrackState {
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        if !self.state.stopped.swap(true, Ordering::SeqCst) {
            debug!(id = self.id, kind = %self.kind, "track stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct MediaStream {
    tracks: Vec<Track>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Whether every track of `kind` is enabled, false when there is none
    pub fn enabled(&self, kind: TrackKind) -> bool {
        let mut tracks = self.tracks.iter().filter(|t| t.kind == kind).peekable();
        tracks.peek().is_some() && tracks.all(|t| t.enabled())
    }

    /// Flip the tracks of `kind`, returns the new state or None without such track
    pub fn toggle(&self, kind: TrackKind) -> Option<bool> {
        let tracks: Vec<&Track> = self.tracks.iter().filter(|t| t.kind == kind).collect();
        if tracks.is_empty() {
            return None;
        }
        let enabled = !tracks.iter().all(|t| t.enabled());
        for track in tracks {
            track.set_enabled(enabled);
        }
        Some(enabled)
    }

    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn acquire(&self, constraints: Constraints) -> Result<MediaStream, MediaError>;
}

/// Capture backend producing synthetic tracks, or refusing as configured
#[derive(Debug, Clone)]
pub struct VirtualCapture {
    device: Device,
    issued: Arc<std::sync::Mutex<Vec<Track>>>,
}

impl VirtualCapture {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            issued: Default::default(),
        }
    }

    /// Every track handed out so far, for observing release
    pub fn issued(&self) -> Vec<Track> {
        self.issued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl MediaCapture for VirtualCapture {
    async fn acquire(&self, constraints: Constraints) -> Result<MediaStream, MediaError> {
        match self.device {
            Device::Deny => return Err(MediaError::Permission("request dismissed".to_string())),
            Device::Missing => {
                return Err(MediaError::Device("no capture device found".to_string()))
            }
            Device::Virtual => {}
        }
        if !constraints.audio && !constraints.video {
            return Err(MediaError::Device("no track requested".to_string()));
        }

        let mut tracks = vec![];
        if constraints.video {
            tracks.push(Track::new(TrackKind::Video));
        }
        if constraints.audio {
            tracks.push(Track::new(TrackKind::Audio));
        }
        info!(tracks = tracks.len(), "virtual capture acquired");
        self.issued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(tracks.iter().cloned());
        Ok(MediaStream::new(tracks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH: Constraints = Constraints {
        audio: true,
        video: true,
    };

    #[tokio::test]
    async fn test_toggle_and_drop_release() {
        let capture = VirtualCapture::new(Device::Virtual);
        let stream = capture.acquire(BOTH).await.unwrap();
        assert_eq!(stream.tracks().len(), 2);
        assert!(stream.enabled(TrackKind::Audio));

        assert_eq!(stream.toggle(TrackKind::Audio), Some(false));
        assert!(!stream.enabled(TrackKind::Audio));
        assert!(stream.enabled(TrackKind::Video));
        assert_eq!(stream.toggle(TrackKind::Audio), Some(true));

        drop(stream);
        assert!(capture.issued().iter().all(Track::is_stopped));
    }

    #[tokio::test]
    async fn test_audio_only_has_no_video_toggle() {
        let capture = VirtualCapture::new(Device::Virtual);
        let stream = capture
            .acquire(Constraints {
                audio: true,
                video: false,
            })
            .await
            .unwrap();
        assert_eq!(stream.toggle(TrackKind::Video), None);
        assert!(!stream.enabled(TrackKind::Video));
    }

    #[tokio::test]
    async fn test_refusals() {
        let denied = VirtualCapture::new(Device::Deny).acquire(BOTH).await;
        assert!(matches!(denied, Err(MediaError::Permission(_))));

        let missing = VirtualCapture::new(Device::Missing).acquire(BOTH).await;
        assert!(matches!(missing, Err(MediaError::Device(_))));
    }
}
