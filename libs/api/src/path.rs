pub const SESSIONS: &str = "/api/sessions";
pub const UPCOMING: &str = "/api/sessions/upcoming";
pub const LIVE: &str = "/api/live";
pub const LIVE_RETRY: &str = "/api/live/retry";
pub const LIVE_AUDIO: &str = "/api/live/audio";
pub const LIVE_VIDEO: &str = "/api/live/video";
pub const LIVE_CHAT: &str = "/api/live/chat";
pub const LIVE_RECORD: &str = "/api/live/record";
pub const ANNOUNCEMENTS: &str = "/api/announcements";
pub const EVENTS: &str = "/api/events";

pub fn countdown(session: &str) -> String {
    format!("/api/sessions/{}/countdown", session)
}

pub fn promote(session: &str) -> String {
    format!("/api/sessions/{}/live", session)
}

pub fn stop(session: &str) -> String {
    format!("/api/sessions/{}/stop", session)
}
