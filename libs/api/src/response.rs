use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::LiveSession;

/// Urgency of an upcoming session, ordered from most to least urgent
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CountdownStatus {
    Starting,
    StartingNow,
    StartingSoon,
    Imminent,
    Scheduled,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeBreakdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CountdownDisplay {
    pub status: CountdownStatus,
    pub display: String,
    pub breakdown: Option<TimeBreakdown>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub username: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_host: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BroadcastState {
    pub session: Option<LiveSession>,
    pub streaming: bool,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub viewer_count: u32,
    pub recording: bool,
    /// "MM:SS" since the broadcast started
    pub elapsed: String,
    pub error: Option<String>,
    pub chat: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct Track {
    pub enabled: bool,
}

/// Recording state after a toggle, `file` names the capture being written
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Recording {
    pub recording: bool,
    pub file: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
    pub content: String,
    pub created_at: DateTime<Utc>,
}
