//! Snapshot persistence for Eve history stores.
//!
//! Each accessory owns one snapshot: the full ring-buffer state plus its
//! reference time, stored as a single JSON document. This crate provides
//! the [`SnapshotStorage`] seam and two implementations:
//!
//! - [`FileStore`]: one `<id>_persist.json` file per accessory in a directory
//! - [`MemoryStore`]: a process-local map, useful for tests
//!
//! # Example
//!
//! ```no_run
//! use evehist_store::{FileStore, SnapshotStorage};
//!
//! # async fn example() -> evehist_store::Result<()> {
//! let store = FileStore::open_default()?;
//! if let Some(snapshot) = store.load("front-door").await? {
//!     println!("{} entries in use", snapshot.used_memory);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod file;
mod memory;

use async_trait::async_trait;

use evehist_types::HistorySnapshot;

pub use error::{Error, Result};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Durable storage for history snapshots, keyed by accessory id.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Load the snapshot for `id`. Returns `Ok(None)` when none was saved yet.
    async fn load(&self, id: &str) -> Result<Option<HistorySnapshot>>;

    /// Persist `snapshot` for `id`, replacing any previous one.
    async fn save(&self, id: &str, snapshot: &HistorySnapshot) -> Result<()>;
}

/// Default snapshot directory following platform conventions.
///
/// - Linux: `~/.local/share/evehist`
/// - macOS: `~/Library/Application Support/evehist`
/// - Windows: `C:\Users\<user>\AppData\Local\evehist`
pub fn default_storage_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("evehist")
}
