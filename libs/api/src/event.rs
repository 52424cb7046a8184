use serde::{Deserialize, Serialize};

use crate::response::{ChatMessage, CountdownDisplay};
use crate::session::LiveSession;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventBody {
    pub event: Event,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionScheduled {
        session: LiveSession,
    },
    SessionPromoted {
        session: LiveSession,
    },
    BroadcastStarted {
        session: LiveSession,
        viewer_count: u32,
    },
    CaptureFailed {
        session: LiveSession,
        reason: String,
    },
    SessionEnded {
        session: LiveSession,
    },
    Countdown {
        session_id: String,
        countdown: CountdownDisplay,
        /// Long form for the "next session" banner
        next: String,
    },
    ViewerCount {
        session_id: String,
        viewer_count: u32,
    },
    Chat {
        message: ChatMessage,
    },
    Track {
        kind: TrackKind,
        enabled: bool,
    },
    Recording {
        session_id: String,
        recording: bool,
        file: String,
    },
}

impl Event {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionScheduled { .. } => "session_scheduled",
            Event::SessionPromoted { .. } => "session_promoted",
            Event::BroadcastStarted { .. } => "broadcast_started",
            Event::CaptureFailed { .. } => "capture_failed",
            Event::SessionEnded { .. } => "session_ended",
            Event::Countdown { .. } => "countdown",
            Event::ViewerCount { .. } => "viewer_count",
            Event::Chat { .. } => "chat",
            Event::Track { .. } => "track",
            Event::Recording { .. } => "recording",
        }
    }

    /// Lifecycle transitions, as opposed to display updates
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            Event::SessionScheduled { .. }
                | Event::SessionPromoted { .. }
                | Event::BroadcastStarted { .. }
                | Event::CaptureFailed { .. }
                | Event::SessionEnded { .. }
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}
