//! SessionStore over a realtime-database REST API.
//!
//! Records live at `{base}/sessions/{id}.json`; field writes target
//! `{base}/sessions/{id}/{field}.json`. The REST surface has no push channel
//! here, so subscriptions poll and publish only when the record changes.

use crate::store::{FieldWrite, SessionStore};
use crate::types::{SessionId, SessionRecord};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Clone)]
pub struct RestSessionStore {
    client: Client,
    base: String,
    auth: Option<String>,
    poll_interval: Duration,
}

impl RestSessionStore {
    pub fn new(base: impl Into<String>, auth: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            auth,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn endpoint(&self, id: &SessionId, field: Option<&str>) -> Result<Url> {
        let path = match field {
            Some(field) => format!("{}/sessions/{}/{}.json", self.base, id, field),
            None => format!("{}/sessions/{}.json", self.base, id),
        };
        let mut url = Url::parse(&path).with_context(|| format!("Invalid store URL {}", path))?;
        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        Ok(url)
    }

    async fn put(&self, url: Url, body: &Value) -> Result<()> {
        self.client
            .put(url)
            .json(body)
            .send()
            .await
            .context("Failed to write session")?
            .error_for_status()
            .context("Session store rejected write")?;
        Ok(())
    }

    async fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let value: Value = self
            .client
            .get(self.endpoint(id, None)?)
            .send()
            .await
            .context("Failed to fetch session")?
            .error_for_status()
            .context("Session store rejected read")?
            .json()
            .await
            .context("Failed to parse session response")?;
        Ok(SessionRecord::from_value(value))
    }
}

#[async_trait]
impl SessionStore for RestSessionStore {
    async fn create(&self, id: &SessionId, record: &SessionRecord) -> Result<()> {
        tracing::debug!("PUT session {}", id);
        self.put(self.endpoint(id, None)?, &record.to_value()).await
    }

    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        self.fetch(id).await
    }

    async fn write_field(&self, id: &SessionId, write: &FieldWrite) -> Result<()> {
        tracing::debug!("PUT session {} field {}", id, write.field());
        self.put(self.endpoint(id, Some(write.field()))?, &write.value())
            .await
    }

    async fn subscribe(&self, id: &SessionId) -> Result<watch::Receiver<SessionRecord>> {
        let initial = self
            .fetch(id)
            .await?
            .ok_or_else(|| anyhow!("Session {} not found", id))?;
        let (tx, rx) = watch::channel(initial);

        let store = self.clone();
        let id = id.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    tracing::debug!("Subscription to session {} dropped", id);
                    break;
                }
                match store.fetch(&id).await {
                    Ok(Some(record)) => {
                        tx.send_if_modified(|current| {
                            if *current == record {
                                false
                            } else {
                                *current = record;
                                true
                            }
                        });
                    }
                    Ok(None) => tracing::warn!("Session {} vanished from store", id),
                    Err(e) => tracing::warn!("Polling session {} failed: {:#}", id, e),
                }
            }
        });

        Ok(rx)
    }
}
