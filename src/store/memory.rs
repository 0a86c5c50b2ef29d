use std::{collections::BTreeMap, sync::Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::watch;

use super::{Collection, Snapshot, Store};

struct CollectionState {
    records: BTreeMap<String, serde_json::Value>,
    publisher: watch::Sender<Snapshot>,
}

impl CollectionState {
    fn new() -> Self {
        let (publisher, _) = watch::channel(Vec::new());
        Self {
            records: BTreeMap::new(),
            publisher,
        }
    }

    fn publish(&self) {
        self.publisher
            .send_replace(self.records.values().cloned().collect());
    }
}

/// Process-local store. Nothing survives a restart.
pub struct MemoryStore {
    collections: [Mutex<CollectionState>; 2],
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: [Mutex::new(CollectionState::new()), Mutex::new(CollectionState::new())],
        }
    }

    fn with_collection<T>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut CollectionState) -> T,
    ) -> Result<T> {
        let mut guard = self.collections[collection.index()]
            .lock()
            .map_err(|_| anyhow!("{collection} collection lock poisoned"))?;
        Ok(f(&mut guard))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn subscribe(&self, collection: Collection) -> watch::Receiver<Snapshot> {
        let guard = match self.collections[collection.index()].lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.publisher.subscribe()
    }

    async fn put(&self, collection: Collection, id: &str, record: serde_json::Value) -> Result<()> {
        self.with_collection(collection, |state| {
            state.records.insert(id.to_string(), record);
            state.publish();
        })
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.with_collection(collection, |state| {
            if state.records.remove(id).is_some() {
                state.publish();
            }
        })
    }

    fn new_id(&self, _collection: Collection) -> Option<String> {
        None
    }
}
