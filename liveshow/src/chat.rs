use std::collections::VecDeque;

use api::response::ChatMessage;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const SYSTEM_USER: &str = "System";
pub const ANONYMOUS: &str = "Anonymous";

const CAPACITY: usize = 200;

/// Chat of the current broadcast, oldest messages are dropped past capacity
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
}

impl ChatLog {
    pub fn push(
        &mut self,
        username: &str,
        message: &str,
        is_host: bool,
        now: DateTime<Utc>,
    ) -> ChatMessage {
        let msg = ChatMessage {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            message: message.to_string(),
            timestamp: now,
            is_host,
        };
        if self.messages.len() == CAPACITY {
            self.messages.pop_front();
        }
        self.messages.push_back(msg.clone());
        msg
    }

    pub fn welcome(&mut self, title: &str, now: DateTime<Utc>) -> ChatMessage {
        self.push(
            SYSTEM_USER,
            &format!("Welcome to {}! Chat is now active.", title),
            true,
            now,
        )
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_drops_oldest() {
        let mut chat = ChatLog::default();
        let now = Utc::now();
        chat.welcome("Town Hall", now);
        for i in 0..CAPACITY {
            chat.push("viewer", &i.to_string(), false, now);
        }
        assert_eq!(chat.len(), CAPACITY);
        let messages = chat.messages();
        assert_eq!(messages[0].message, "0");
        assert_eq!(messages[CAPACITY - 1].message, (CAPACITY - 1).to_string());
    }

    #[test]
    fn test_welcome_is_host_message() {
        let mut chat = ChatLog::default();
        let msg = chat.welcome("Town Hall", Utc::now());
        assert_eq!(msg.username, SYSTEM_USER);
        assert!(msg.is_host);
        assert_eq!(msg.message, "Welcome to Town Hall! Chat is now active.");
        chat.clear();
        assert!(chat.is_empty());
    }
}
