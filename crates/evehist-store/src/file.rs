//! JSON file snapshot storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use evehist_types::HistorySnapshot;

use crate::SnapshotStorage;
use crate::error::{Error, Result};

/// Stores one JSON snapshot file per accessory in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open or create a snapshot directory at the given path.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();

        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| Error::CreateDirectory {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        info!("Using snapshot directory {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Open the default snapshot directory.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_storage_dir())
    }

    /// Directory holding the snapshot files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot file for `id`.
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced so any accessory id
    /// maps to a single file inside the directory.
    pub fn path_for(&self, id: &str) -> PathBuf {
        let name: String = id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}_persist.json", name))
    }
}

#[async_trait]
impl SnapshotStorage for FileStore {
    async fn load(&self, id: &str) -> Result<Option<HistorySnapshot>> {
        let path = self.path_for(id);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot for {} at {}", id, path.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::Read { path, source: e }),
        };

        let snapshot = serde_json::from_str(&content)?;
        debug!("Loaded snapshot for {} from {}", id, path.display());
        Ok(Some(snapshot))
    }

    async fn save(&self, id: &str, snapshot: &HistorySnapshot) -> Result<()> {
        let path = self.path_for(id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec(snapshot)?;

        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| Error::Write {
                path: tmp.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::Write {
                path: path.clone(),
                source: e,
            })?;

        debug!(
            "Saved snapshot for {} ({} entries) to {}",
            id,
            snapshot.used_memory,
            path.display()
        );
        Ok(())
    }
}
