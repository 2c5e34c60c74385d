use crate::store::{FieldWrite, SessionStore};
use crate::types::{SessionId, SessionRecord};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::watch;

struct Slot {
    /// Raw stored tree, written field by field like a key-path store.
    tree: Map<String, Value>,
    tx: watch::Sender<SessionRecord>,
}

impl Slot {
    fn new(tree: Map<String, Value>) -> Self {
        let record = read_tree(&tree);
        let (tx, _) = watch::channel(record);
        Self { tree, tx }
    }

    fn publish(&self) {
        self.tx.send_replace(read_tree(&self.tree));
    }
}

fn read_tree(tree: &Map<String, Value>) -> SessionRecord {
    SessionRecord::from_value(Value::Object(tree.clone())).unwrap_or_else(|| SessionRecord {
        shared_url: String::new(),
        panels: Vec::new(),
        background: crate::types::DEFAULT_BACKGROUND.to_string(),
        theme: crate::types::DEFAULT_THEME.to_string(),
    })
}

/// In-process SessionStore shared by every client in the process.
pub struct MemorySessionStore {
    inner: RwLock<HashMap<String, Slot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Replace a session's raw tree. Lets callers seed records in shapes the
    /// writers never produce (legacy keys, partial panels).
    pub fn put_raw(&self, id: &SessionId, tree: Value) -> Result<()> {
        let Value::Object(tree) = tree else {
            return Err(anyhow!("Session tree for {} must be an object", id));
        };
        let mut store = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        match store.get_mut(id.as_str()) {
            Some(slot) => {
                slot.tree = tree;
                slot.publish();
            }
            None => {
                store.insert(id.as_str().to_string(), Slot::new(tree));
            }
        }
        Ok(())
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, id: &SessionId, record: &SessionRecord) -> Result<()> {
        self.put_raw(id, record.to_value())
    }

    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let store = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(store.get(id.as_str()).map(|slot| read_tree(&slot.tree)))
    }

    async fn write_field(&self, id: &SessionId, write: &FieldWrite) -> Result<()> {
        let mut store = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        // A field write on an absent key creates it, as key-path stores do.
        let slot = store
            .entry(id.as_str().to_string())
            .or_insert_with(|| Slot::new(Map::new()));
        slot.tree.insert(write.field().to_string(), write.value());
        slot.publish();
        Ok(())
    }

    async fn subscribe(&self, id: &SessionId) -> Result<watch::Receiver<SessionRecord>> {
        let store = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        store
            .get(id.as_str())
            .map(|slot| slot.tx.subscribe())
            .ok_or_else(|| anyhow!("Session {} not found", id))
    }
}
