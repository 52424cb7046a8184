use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A scheduled or in-progress live broadcast record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSession {
    /// Assigned by the record store, empty until inserted
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub host_name: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub viewer_count: u32,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

/// Session status, transitions only move forward: scheduled -> live -> ended
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    Live,
    Ended,
}

impl SessionStatus {
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Scheduled, SessionStatus::Live)
                | (SessionStatus::Live, SessionStatus::Ended)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Scheduled => write!(f, "scheduled"),
            SessionStatus::Live => write!(f, "live"),
            SessionStatus::Ended => write!(f, "ended"),
        }
    }
}

/// Request to schedule a session, or to go live now when `start_time` is absent
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub host_name: String,
    /// A list, or one name per line as typed in a form
    #[serde(default, deserialize_with = "participant_list")]
    pub participants: Vec<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

/// Split a newline separated participant list, dropping blank lines
pub fn participants_from_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn participant_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Participants {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Participants::deserialize(deserializer)? {
        Participants::List(list) => list,
        Participants::Text(text) => participants_from_lines(&text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(SessionStatus::Scheduled.can_transition_to(SessionStatus::Live));
        assert!(SessionStatus::Live.can_transition_to(SessionStatus::Ended));
        assert!(!SessionStatus::Scheduled.can_transition_to(SessionStatus::Ended));
        assert!(!SessionStatus::Ended.can_transition_to(SessionStatus::Live));
        assert!(!SessionStatus::Live.can_transition_to(SessionStatus::Scheduled));
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Scheduled).unwrap(),
            "\"scheduled\""
        );
        assert_eq!(
            serde_json::from_str::<SessionStatus>("\"live\"").unwrap(),
            SessionStatus::Live
        );
        assert!(serde_json::from_str::<SessionStatus>("\"LIVE\"").is_err());
    }

    #[test]
    fn test_participants_from_lines() {
        let participants = participants_from_lines("  Asha \n\n Ravi\n   \nMeena");
        assert_eq!(participants, vec!["Asha", "Ravi", "Meena"]);
        assert!(participants_from_lines("").is_empty());
    }

    #[test]
    fn test_new_session_participants_as_text() {
        let new: NewSession = serde_json::from_str(
            r#"{"title":"Town hall","host_name":"Asha","participants":"Ravi\n\n Meena "}"#,
        )
        .unwrap();
        assert_eq!(new.host_name, "Asha");
        assert_eq!(new.participants, vec!["Ravi", "Meena"]);
        assert_eq!(new.start_time, None);

        let new: NewSession = serde_json::from_str(
            r#"{"title":"Town hall","host_name":"Asha","participants":["Ravi"],"start_time":"2024-05-01T18:30:00Z"}"#,
        )
        .unwrap();
        assert_eq!(new.participants, vec!["Ravi"]);
        assert!(new.start_time.is_some());
    }

    #[test]
    fn test_row_without_id_omits_it() {
        let session = LiveSession {
            id: String::new(),
            title: "Town hall".to_string(),
            description: None,
            host_name: "Asha".to_string(),
            participants: vec![],
            start_time: None,
            end_time: None,
            status: SessionStatus::Live,
            viewer_count: 0,
            meeting_link: None,
        };
        let value = serde_json::to_value(&session).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["status"], "live");
        assert_eq!(value["host_name"], "Asha");
    }
}
