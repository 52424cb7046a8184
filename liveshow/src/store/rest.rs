use std::time::Duration;

use api::session::{LiveSession, SessionStatus};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, trace};

use super::{SessionFilter, SessionPatch, SessionStore, StoreError, StoreResult};
use crate::config;

/// Record store backed by a PostgREST style table endpoint
#[derive(Clone, Debug)]
pub struct RestStore {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl RestStore {
    pub fn new(cfg: &config::RestStore) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(cfg.timeout.min(1000)))
            .timeout(Duration::from_millis(cfg.timeout))
            .build()?;
        Ok(Self {
            endpoint: format!("{}/rest/v1/{}", cfg.url.trim_end_matches('/'), cfg.table),
            api_key: cfg.api_key.clone(),
            client,
        })
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("Prefer", "return=representation");
        if self.api_key.is_empty() {
            builder
        } else {
            builder
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
        }
    }

    async fn send(&self, builder: RequestBuilder) -> StoreResult<Vec<LiveSession>> {
        let response = self
            .request(builder)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        rows(response).await
    }

    async fn first(&self, id: &str, builder: RequestBuilder) -> StoreResult<Option<LiveSession>> {
        let mut rows = self.send(builder).await?;
        trace!(id, rows = rows.len(), "rest store response");
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }
}

async fn rows(response: Response) -> StoreResult<Vec<LiveSession>> {
    let status = response.status();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(StoreError::Unavailable(format!("status {}", status)));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Rejected(format!("status {}: {}", status, body)));
    }
    if status == StatusCode::NO_CONTENT {
        return Ok(vec![]);
    }
    response
        .json::<Vec<LiveSession>>()
        .await
        .map_err(|e| StoreError::Rejected(e.to_string()))
}

fn timestamp(t: chrono::DateTime<chrono::Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// PostgREST query parameters for a filter, ascending by start time
pub(crate) fn filter_params(filter: &SessionFilter) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", "*".to_string())];
    if let Some(status) = filter.status {
        params.push(("status", format!("eq.{}", status)));
    }
    if let Some(after) = filter.after {
        params.push(("start_time", format!("gt.{}", timestamp(after))));
    }
    if let Some(until) = filter.until {
        params.push(("start_time", format!("lte.{}", timestamp(until))));
    }
    params.push(("order", "start_time.asc,id.asc".to_string()));
    if let Some(limit) = filter.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

#[async_trait]
impl SessionStore for RestStore {
    async fn query(&self, filter: SessionFilter) -> StoreResult<Vec<LiveSession>> {
        let params = filter_params(&filter);
        debug!(?params, "rest store query");
        self.send(self.client.get(&self.endpoint).query(&params)).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<LiveSession>> {
        let builder = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]);
        self.first(id, builder).await
    }

    async fn insert(&self, session: LiveSession) -> StoreResult<LiveSession> {
        let builder = self.client.post(&self.endpoint).json(&vec![session]);
        self.first("", builder)
            .await?
            .ok_or_else(|| StoreError::Rejected("insert returned no row".to_string()))
    }

    async fn update(&self, id: &str, patch: SessionPatch) -> StoreResult<LiveSession> {
        let builder = self
            .client
            .patch(&self.endpoint)
            .query(&[("id", format!("eq.{}", id))])
            .json(&patch);
        self.first(id, builder)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_if(
        &self,
        id: &str,
        expected: SessionStatus,
        patch: SessionPatch,
    ) -> StoreResult<LiveSession> {
        let builder = self
            .client
            .patch(&self.endpoint)
            .query(&[
                ("id", format!("eq.{}", id)),
                ("status", format!("eq.{}", expected)),
            ])
            .json(&patch);
        if let Some(updated) = self.first(id, builder).await? {
            return Ok(updated);
        }
        match self.get(id).await? {
            Some(current) => Err(StoreError::Conflict {
                id: id.to_string(),
                expected,
                actual: current.status,
            }),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let builder = self
            .client
            .delete(&self.endpoint)
            .query(&[("id", format!("eq.{}", id))]);
        match self.first(id, builder).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_due_query_params() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap();
        let filter = SessionFilter::status(SessionStatus::Scheduled)
            .until(now)
            .limit(1);
        let params = filter_params(&filter);
        assert_eq!(
            params,
            vec![
                ("select", "*".to_string()),
                ("status", "eq.scheduled".to_string()),
                ("start_time", "lte.2024-05-01T18:30:00.000Z".to_string()),
                ("order", "start_time.asc,id.asc".to_string()),
                ("limit", "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_endpoint_from_config() {
        let store = RestStore::new(&config::RestStore {
            url: "https://db.example.org/".to_string(),
            api_key: String::new(),
            table: "live_sessions".to_string(),
            timeout: 2000,
        })
        .unwrap();
        assert_eq!(store.endpoint, "https://db.example.org/rest/v1/live_sessions");
    }
}
