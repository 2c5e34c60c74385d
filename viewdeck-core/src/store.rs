use crate::types::{PanelConfig, SessionId, SessionRecord};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

/// A single-field mutation of a persisted record. Writes never span fields;
/// concurrent writers to the same field settle by last-write-wins.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldWrite {
    SharedUrl(String),
    Panels(Vec<PanelConfig>),
    Background(String),
    Theme(String),
}

impl FieldWrite {
    /// Key of the field inside the record.
    pub fn field(&self) -> &'static str {
        match self {
            FieldWrite::SharedUrl(_) => "sharedUrl",
            FieldWrite::Panels(_) => "panels",
            FieldWrite::Background(_) => "background",
            FieldWrite::Theme(_) => "theme",
        }
    }

    pub fn value(&self) -> Value {
        match self {
            FieldWrite::SharedUrl(s) | FieldWrite::Background(s) | FieldWrite::Theme(s) => {
                Value::String(s.clone())
            }
            FieldWrite::Panels(panels) => {
                serde_json::to_value(panels).unwrap_or_else(|_| Value::Array(Vec::new()))
            }
        }
    }
}

/// Persistence port for shared sessions.
///
/// Records are read through `SessionRecord::from_value`, so every backend
/// gets the same default-filling. Sessions are never deleted.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, id: &SessionId, record: &SessionRecord) -> Result<()>;
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>>;
    async fn write_field(&self, id: &SessionId, write: &FieldWrite) -> Result<()>;

    /// Long-lived push channel. The receiver starts at the current record and
    /// sees every later change; it errors if the session does not exist.
    async fn subscribe(&self, id: &SessionId) -> Result<watch::Receiver<SessionRecord>>;
}
