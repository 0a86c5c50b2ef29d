//! Abstract document store the repository mirrors.
//!
//! A store keeps named collections of JSON records keyed by id. Subscribers receive the
//! whole collection on every change, never a delta, and the current value is available
//! immediately after subscribing.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use rand::{distributions::Uniform, Rng};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Full contents of one collection at a point in time.
pub type Snapshot = Vec<serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Sessions,
    Blocks,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Sessions, Collection::Blocks];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Sessions => "sessions",
            Collection::Blocks => "blocks",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Collection::Sessions => 0,
            Collection::Blocks => 1,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Subscribe to full-collection snapshots. Dropping the receiver unsubscribes.
    fn subscribe(&self, collection: Collection) -> watch::Receiver<Snapshot>;

    /// Idempotent upsert; last write wins.
    async fn put(&self, collection: Collection, id: &str, record: serde_json::Value) -> Result<()>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    /// Pre-allocate an id, or `None` when the backend cannot.
    fn new_id(&self, collection: Collection) -> Option<String>;
}

const FALLBACK_ID_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random base-36 id for stores that cannot hand one out.
pub fn fallback_id() -> String {
    let mut rng = rand::thread_rng();
    let digits = Uniform::from(0..BASE36.len());
    (0..FALLBACK_ID_LEN)
        .map(|_| BASE36[rng.sample(digits)] as char)
        .collect()
}
