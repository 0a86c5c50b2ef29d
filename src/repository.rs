//! In-memory mirror of the `sessions` and `blocks` collections.
//!
//! The repository holds one subscription per collection. Each published snapshot
//! replaces the previous one wholesale, so readers always see a complete collection.
//! All writes go through here and land back in the mirror via the subscription.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::{
    models::{FocusBlock, FocusSession},
    store::{fallback_id, Collection, Snapshot, Store},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
    sessions_rx: watch::Receiver<Snapshot>,
    blocks_rx: watch::Receiver<Snapshot>,
}

impl Repository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let sessions_rx = store.subscribe(Collection::Sessions);
        let blocks_rx = store.subscribe(Collection::Blocks);
        Self {
            store,
            sessions_rx,
            blocks_rx,
        }
    }

    pub fn sessions(&self) -> Vec<FocusSession> {
        decode_snapshot(Collection::Sessions, &self.sessions_rx.borrow())
    }

    pub fn blocks(&self) -> Vec<FocusBlock> {
        decode_snapshot(Collection::Blocks, &self.blocks_rx.borrow())
    }

    /// Resolves once either collection has published a snapshot this handle has not
    /// seen. Returns an error when the store has gone away.
    pub async fn changed(&mut self) -> Result<()> {
        tokio::select! {
            res = self.sessions_rx.changed() => res.context("sessions subscription closed")?,
            res = self.blocks_rx.changed() => res.context("blocks subscription closed")?,
        }
        let _ = self.sessions_rx.borrow_and_update();
        let _ = self.blocks_rx.borrow_and_update();
        Ok(())
    }

    fn allocate_id(&self, collection: Collection) -> String {
        self.store.new_id(collection).unwrap_or_else(fallback_id)
    }

    /// Append a finished session to history.
    pub async fn record_session(
        &self,
        start_time: i64,
        end_time: i64,
        duration_minutes: u32,
        label: &str,
    ) -> Result<FocusSession> {
        let session = FocusSession::new(
            self.allocate_id(Collection::Sessions),
            start_time,
            end_time,
            duration_minutes,
            label.to_string(),
        );
        let record = serde_json::to_value(&session).context("failed to encode session")?;
        self.store
            .put(Collection::Sessions, &session.id, record)
            .await
            .with_context(|| format!("failed to persist session {}", session.id))?;

        log_info!(
            "Recorded session {} ({} min, \"{}\")",
            session.id,
            session.duration_minutes,
            session.label
        );
        Ok(session)
    }

    /// Create a block at `start_time`, or relabel `existing_id` keeping its one-hour
    /// span anchored at `start_time`.
    pub async fn upsert_block(
        &self,
        existing_id: Option<&str>,
        start_time: i64,
        label: &str,
    ) -> Result<FocusBlock> {
        let id = match existing_id {
            Some(id) => id.to_string(),
            None => self.allocate_id(Collection::Blocks),
        };
        let block = FocusBlock::planned(id, start_time, label.to_string());
        let record = serde_json::to_value(&block).context("failed to encode block")?;
        self.store
            .put(Collection::Blocks, &block.id, record)
            .await
            .with_context(|| format!("failed to persist block {}", block.id))?;

        log_info!(
            "{} block {} at {} (\"{}\")",
            if existing_id.is_some() { "Updated" } else { "Planned" },
            block.id,
            block.start_time,
            block.label
        );
        Ok(block)
    }

    pub async fn delete_block(&self, id: &str) -> Result<()> {
        self.store
            .delete(Collection::Blocks, id)
            .await
            .with_context(|| format!("failed to delete block {id}"))?;
        log_info!("Deleted block {id}");
        Ok(())
    }
}

fn decode_snapshot<T: DeserializeOwned>(collection: Collection, snapshot: &Snapshot) -> Vec<T> {
    snapshot
        .iter()
        .filter_map(|value| match serde_json::from_value::<T>(value.clone()) {
            Ok(record) => Some(record),
            Err(err) => {
                log_warn!("Skipping malformed {collection} record: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn repository() -> (Arc<MemoryStore>, Repository) {
        let store = Arc::new(MemoryStore::new());
        let repository = Repository::new(store.clone());
        (store, repository)
    }

    #[tokio::test]
    async fn empty_store_yields_empty_collections() {
        let (_, repository) = repository();
        assert!(repository.sessions().is_empty());
        assert!(repository.blocks().is_empty());
    }

    #[tokio::test]
    async fn records_sessions_with_fallback_ids() {
        let (_, repository) = repository();
        let session = repository
            .record_session(0, 120_000, 2, "Writing")
            .await
            .expect("record");

        assert_eq!(session.id.len(), 9);
        assert_eq!(repository.sessions(), vec![session]);
    }

    #[tokio::test]
    async fn saving_at_new_start_creates_one_hour_block() {
        let (_, repository) = repository();
        let start = 1_700_000_000_000;
        let block = repository
            .upsert_block(None, start, "Study")
            .await
            .expect("create");

        assert_eq!(block.end_time, start + 3_600_000);
        assert_eq!(repository.blocks().len(), 1);
    }

    #[tokio::test]
    async fn saving_with_existing_id_relabels_in_place() {
        let (_, repository) = repository();
        let start = 1_700_000_000_000;
        let created = repository.upsert_block(None, start, "Study").await.expect("create");
        let updated = repository
            .upsert_block(Some(&created.id), start, "Review")
            .await
            .expect("update");

        let blocks = repository.blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].id, created.id);
        assert_eq!(blocks[0].label, "Review");
        assert_eq!(blocks[0].start_time, created.start_time);
        assert_eq!(blocks[0].end_time, created.end_time);
        assert_eq!(updated, blocks[0]);
    }

    #[tokio::test]
    async fn deleted_blocks_never_reappear() {
        let (store, repository) = repository();
        let keep = repository.upsert_block(None, 0, "Keep").await.expect("keep");
        let dropped = repository
            .upsert_block(None, 3_600_000, "Drop")
            .await
            .expect("drop");

        repository.delete_block(&dropped.id).await.expect("delete");
        let other = FocusBlock::planned("other".into(), 7_200_000, "Other".into());
        store
            .put(
                Collection::Blocks,
                "other",
                serde_json::to_value(other).expect("encode"),
            )
            .await
            .expect("unrelated write");

        let ids: Vec<String> = repository.blocks().into_iter().map(|b| b.id).collect();
        assert!(ids.contains(&keep.id));
        assert!(!ids.contains(&dropped.id));
    }

    #[tokio::test]
    async fn malformed_records_are_skipped() {
        let (store, repository) = repository();
        store
            .put(Collection::Sessions, "bad", json!({"id": "bad", "label": 3}))
            .await
            .expect("put");
        repository.record_session(0, 60_000, 1, "Ok").await.expect("record");

        assert_eq!(repository.sessions().len(), 1);
    }

    #[tokio::test]
    async fn changed_resolves_on_new_snapshot() {
        let (_, mut repository) = repository();
        let writer = repository.clone();
        let handle = tokio::spawn(async move {
            writer.upsert_block(None, 0, "Later").await.expect("write");
        });

        repository.changed().await.expect("changed");
        handle.await.expect("join");
        assert_eq!(repository.blocks().len(), 1);
    }
}
