use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use super::{Collection, Snapshot, Store};
use crate::db::Database;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Store persisted through the SQLite worker. Every write re-reads the affected
/// collection and publishes it whole.
pub struct SqliteStore {
    db: Database,
    publishers: [watch::Sender<Snapshot>; 2],
    /// Held across write and re-publish so snapshots go out in write order.
    write_locks: [Mutex<()>; 2],
}

impl SqliteStore {
    pub async fn open(db: Database) -> Result<Self> {
        let store = Self {
            db,
            publishers: [watch::channel(Vec::new()).0, watch::channel(Vec::new()).0],
            write_locks: [Mutex::new(()), Mutex::new(())],
        };

        for collection in Collection::ALL {
            store.refresh(collection).await?;
        }

        log_info!(
            "Document store ready at {} ({} sessions, {} blocks)",
            store.db.path().display(),
            store.publishers[Collection::Sessions.index()].borrow().len(),
            store.publishers[Collection::Blocks.index()].borrow().len(),
        );

        Ok(store)
    }

    async fn refresh(&self, collection: Collection) -> Result<()> {
        let documents = self.db.list_documents(collection.as_str()).await?;
        let snapshot: Snapshot = documents.into_iter().map(|doc| doc.body).collect();
        log_debug!("Publishing {} {} records", snapshot.len(), collection);
        self.publishers[collection.index()].send_replace(snapshot);
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn subscribe(&self, collection: Collection) -> watch::Receiver<Snapshot> {
        self.publishers[collection.index()].subscribe()
    }

    async fn put(&self, collection: Collection, id: &str, record: serde_json::Value) -> Result<()> {
        let _write = self.write_locks[collection.index()].lock().await;
        self.db
            .upsert_document(collection.as_str(), id, &record)
            .await?;
        self.refresh(collection).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let _write = self.write_locks[collection.index()].lock().await;
        self.db.delete_document(collection.as_str(), id).await?;
        self.refresh(collection).await
    }

    fn new_id(&self, _collection: Collection) -> Option<String> {
        Some(Uuid::new_v4().to_string())
    }
}
