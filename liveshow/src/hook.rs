use std::time::Duration;

use api::event::{Event, EventBody};
use reqwest::Client;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Posts lifecycle transitions to an external URL
#[derive(Clone, Debug)]
pub struct WebHook {
    url: String,
    client: Client,
}

impl WebHook {
    pub fn new(url: String) -> anyhow::Result<Self> {
        Ok(WebHook {
            url,
            client: Client::builder()
                .connect_timeout(Duration::from_millis(300))
                .timeout(Duration::from_millis(500))
                .build()?,
        })
    }

    async fn event_handler(&self, event: Event) -> anyhow::Result<()> {
        let req_body = serde_json::to_string(&EventBody { event })?;
        match self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(req_body.clone())
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                let res_body = response.text().await?;
                if status.is_success() {
                    debug!(url = self.url, ?status, req_body, res_body, "event webhook success");
                    Ok(())
                } else {
                    warn!(url = self.url, ?status, req_body, res_body, "event webhook error");
                    Err(anyhow::anyhow!("webhook responded {}", status))
                }
            }
            Err(err) => {
                warn!(url = self.url, req_body, ?err, "event webhook error");
                Err(err.into())
            }
        }
    }

    pub async fn hook(&self, mut event_receiver: broadcast::Receiver<Event>) {
        loop {
            match event_receiver.recv().await {
                Ok(event) if event.is_transition() => {
                    let _ = self.event_handler(event).await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(url = self.url, skipped, "event webhook lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// One forwarding task per configured URL
pub fn spawn_webhooks(urls: &[String], events: &broadcast::Sender<Event>) -> anyhow::Result<()> {
    for url in urls {
        let webhook = WebHook::new(url.clone())?;
        let recv = events.subscribe();
        tokio::spawn(async move {
            webhook.hook(recv).await;
        });
    }
    Ok(())
}
