//! In-memory snapshot storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use evehist_types::HistorySnapshot;

use crate::SnapshotStorage;
use crate::error::Result;

/// Process-local snapshot storage.
///
/// Keeps cloned snapshots in a map and counts saves, which makes it handy
/// for asserting persistence behavior in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<String, HistorySnapshot>>,
    saves: AtomicU32,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a snapshot for `id`.
    pub fn with_snapshot(id: &str, snapshot: HistorySnapshot) -> Self {
        let mut snapshots = HashMap::new();
        snapshots.insert(id.to_string(), snapshot);
        Self {
            snapshots: Mutex::new(snapshots),
            saves: AtomicU32::new(0),
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current snapshot for `id`, if any.
    pub async fn get(&self, id: &str) -> Option<HistorySnapshot> {
        self.snapshots.lock().await.get(id).cloned()
    }
}

#[async_trait]
impl SnapshotStorage for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<HistorySnapshot>> {
        Ok(self.get(id).await)
    }

    async fn save(&self, id: &str, snapshot: &HistorySnapshot) -> Result<()> {
        self.snapshots
            .lock()
            .await
            .insert(id.to_string(), snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
