use std::sync::{Arc, RwLock};

use api::response::Announcement;
use api::session::LiveSession;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::countdown::format_elapsed;

/// Publishes posts to the public feed
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, content: String, at: DateTime<Utc>) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct MemFeed {
    posts: Arc<RwLock<Vec<Announcement>>>,
}

impl MemFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first
    pub fn posts(&self) -> Vec<Announcement> {
        let mut posts = self.posts.read().unwrap_or_else(|e| e.into_inner()).clone();
        posts.reverse();
        posts
    }
}

#[async_trait]
impl Announcer for MemFeed {
    async fn announce(&self, content: String, at: DateTime<Utc>) -> anyhow::Result<()> {
        info!(len = content.len(), "announcement posted");
        self.posts
            .write()
            .map_err(|e| anyhow::anyhow!("{:?}", e))?
            .push(Announcement {
                content,
                created_at: at,
            });
        Ok(())
    }
}

/// Disabled feed
pub struct Silent;

#[async_trait]
impl Announcer for Silent {
    async fn announce(&self, _content: String, _at: DateTime<Utc>) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn live_started(session: &LiveSession, tags: &[String]) -> String {
    let mut content = format!("LIVE NOW: {}\n\nHost: {}", session.title, session.host_name);
    if let Some(description) = &session.description {
        content.push_str(&format!("\n\n{}", description));
    }
    if !session.participants.is_empty() {
        content.push_str(&format!(
            "\n\nParticipants: {}",
            session.participants.join(", ")
        ));
    }
    if let Some(link) = &session.meeting_link {
        content.push_str(&format!("\n\nJoin: {}", link));
    }

    let mut hashtags: Vec<String> = tags.iter().map(|t| format!("#{}", t)).collect();
    let title_tag: String = session
        .title
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !title_tag.is_empty() {
        hashtags.push(format!("#{}", title_tag));
    }
    if !hashtags.is_empty() {
        content.push_str(&format!("\n\n{}", hashtags.join(" ")));
    }
    content
}

/// End post, `elapsed` is how long the local broadcast ran
pub fn live_ended(session: &LiveSession, viewers: u32, elapsed: u64, tags: &[String]) -> String {
    let mut hashtags: Vec<String> = tags.iter().map(|t| format!("#{}", t)).collect();
    hashtags.push("#LiveEnded".to_string());
    format!(
        "Live session ended: \"{}\"\n\nThank you to everyone who joined!\nTotal viewers: {}\n\nHost: {}\nDuration: {}\n\n{}",
        session.title,
        viewers,
        session.host_name,
        format_elapsed(elapsed),
        hashtags.join(" ")
    )
}
