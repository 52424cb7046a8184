//! Countdown display for upcoming sessions.
//!
//! Thresholds are inclusive upper bounds on the remaining time: exactly 10s
//! left is still `starting-now`, exactly 60s is `starting-soon` and exactly
//! 300s is `imminent`.

use api::response::{CountdownDisplay, CountdownStatus, TimeBreakdown};
use api::session::LiveSession;
use chrono::{DateTime, Utc};

pub const STARTING_NOW_MS: i64 = 10_000;
pub const STARTING_SOON_MS: i64 = 60_000;
pub const IMMINENT_MS: i64 = 300_000;

const STARTING_DISPLAY: &str = "Starting Now!";

fn breakdown(delta_ms: i64) -> TimeBreakdown {
    let total = (delta_ms.max(0) / 1000) as u64;
    TimeBreakdown {
        days: total / 86_400,
        hours: total % 86_400 / 3_600,
        minutes: total % 3_600 / 60,
        seconds: total % 60,
    }
}

/// Largest non-zero unit first, seconds always shown
fn render(t: &TimeBreakdown) -> String {
    if t.days > 0 {
        format!("{}d {}h {}m {}s", t.days, t.hours, t.minutes, t.seconds)
    } else if t.hours > 0 {
        format!("{}h {}m {}s", t.hours, t.minutes, t.seconds)
    } else if t.minutes > 0 {
        format!("{}m {}s", t.minutes, t.seconds)
    } else {
        format!("{}s", t.seconds)
    }
}

fn classify(delta_ms: i64) -> CountdownStatus {
    if delta_ms <= 0 {
        CountdownStatus::Starting
    } else if delta_ms <= STARTING_NOW_MS {
        CountdownStatus::StartingNow
    } else if delta_ms <= STARTING_SOON_MS {
        CountdownStatus::StartingSoon
    } else if delta_ms <= IMMINENT_MS {
        CountdownStatus::Imminent
    } else {
        CountdownStatus::Scheduled
    }
}

pub fn countdown_until(start_time: DateTime<Utc>, now: DateTime<Utc>) -> CountdownDisplay {
    let delta_ms = (start_time - now).num_milliseconds();
    match classify(delta_ms) {
        CountdownStatus::Starting => CountdownDisplay {
            status: CountdownStatus::Starting,
            display: STARTING_DISPLAY.to_string(),
            breakdown: None,
        },
        status => {
            let t = breakdown(delta_ms);
            CountdownDisplay {
                status,
                display: render(&t),
                breakdown: Some(t),
            }
        }
    }
}

/// Countdown for a session, one without start time is due immediately
pub fn compute_countdown(session: &LiveSession, now: DateTime<Utc>) -> CountdownDisplay {
    match session.start_time {
        Some(start_time) => countdown_until(start_time, now),
        None => countdown_until(now, now),
    }
}

/// Long form used by the "next session" banner
pub fn time_until_live(start_time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta_ms = (start_time - now).num_milliseconds();
    if delta_ms <= 0 {
        return "Starting now".to_string();
    }
    let t = breakdown(delta_ms);
    if t.days > 0 {
        format!(
            "{} day{}, {}h {}m {}s remaining",
            t.days,
            if t.days > 1 { "s" } else { "" },
            t.hours,
            t.minutes,
            t.seconds
        )
    } else {
        format!("{} remaining", render(&t))
    }
}

/// "MM:SS" elapsed time, minutes keep growing past the hour
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
