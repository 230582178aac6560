//! Async runtime for one history-bearing accessory.
//!
//! An [`Accessory`] owns a [`SensorAdapter`] behind a FIFO
//! [`tokio::sync::Mutex`] and drives it from background tasks:
//!
//! - a **load** task restoring the persisted snapshot; it holds the lock
//!   from before the accessory is returned, so every later call waits for
//!   it and keeps its order
//! - a **timer** task running the sampling beat, the history tick, the
//!   periodic save and the adapter's change subscription
//!
//! Saves take the snapshot under the lock and write it outside, so a slow
//! disk never stalls appends. [`Accessory::shutdown`] stops the tasks and
//! performs a final save.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use evehist_store::SnapshotStorage;
use evehist_types::{HISTORY_INTERVAL_SECS, SAMPLE_INTERVAL_SECS, SensorKind};

use crate::adapter::{Change, SensorAdapter};
use crate::error::Result;

/// Adapter shared between the runtime tasks and callers.
pub type SharedAdapter = Arc<Mutex<Box<dyn SensorAdapter>>>;

/// Timer periods for an accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessoryOptions {
    /// Sampling beat between history ticks.
    pub sample_interval: Duration,
    /// History tick.
    pub tick_interval: Duration,
    /// Snapshot save period.
    pub save_interval: Duration,
}

impl Default for AccessoryOptions {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(SAMPLE_INTERVAL_SECS),
            tick_interval: Duration::from_secs(HISTORY_INTERVAL_SECS),
            save_interval: Duration::from_secs(HISTORY_INTERVAL_SECS),
        }
    }
}

/// A running accessory.
pub struct Accessory {
    id: String,
    kind: SensorKind,
    adapter: SharedAdapter,
    storage: Arc<dyn SnapshotStorage>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Accessory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessory")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Accessory {
    /// Start `adapter` under `id`, restoring its history from `storage`.
    pub async fn spawn(
        id: impl Into<String>,
        adapter: Box<dyn SensorAdapter>,
        storage: Arc<dyn SnapshotStorage>,
        options: AccessoryOptions,
    ) -> Self {
        let id = id.into();
        let kind = adapter.kind();
        let adapter: SharedAdapter = Arc::new(Mutex::new(adapter));
        let cancel = CancellationToken::new();

        let guard = Arc::clone(&adapter).lock_owned().await;
        let changes = guard.changes();

        let load = tokio::spawn(load_snapshot(id.clone(), guard, Arc::clone(&storage)));
        let timers = tokio::spawn(run_timers(
            id.clone(),
            Arc::clone(&adapter),
            Arc::clone(&storage),
            options,
            changes,
            cancel.clone(),
        ));

        info!(
            "Accessory {} ({}) started: tick {}s, save {}s",
            id,
            kind,
            options.tick_interval.as_secs(),
            options.save_interval.as_secs()
        );

        Self {
            id,
            kind,
            adapter,
            storage,
            cancel,
            tasks: Mutex::new(vec![load, timers]),
        }
    }

    /// Accessory id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sensor type.
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Run `f` with exclusive access to the adapter.
    pub async fn with<R>(&self, f: impl FnOnce(&mut dyn SensorAdapter) -> R) -> R {
        let mut adapter = self.adapter.lock().await;
        f(&mut **adapter)
    }

    /// Base64 status payload.
    pub async fn status(&self) -> String {
        self.with(|a| a.history().status().to_string()).await
    }

    /// Start a transfer from a base64 request payload.
    pub async fn write_request(&self, payload: &str) -> Result<u32> {
        self.with(|a| a.history_mut().write_request(payload)).await
    }

    /// Next base64 chunk of the current transfer.
    pub async fn read_entries(&self) -> String {
        self.with(|a| a.history_mut().read_entries()).await
    }

    /// Decode and log a host clock update, resyncing the next transfer.
    pub async fn write_time(&self, payload: &str) -> Result<u32> {
        self.with(|a| a.history_mut().write_time(payload)).await
    }

    /// Zero the energy totals.
    pub async fn reset_total(&self) -> Result<()> {
        self.with(|a| a.reset_total()).await
    }

    /// Persist the current history.
    pub async fn save(&self) -> Result<()> {
        save_snapshot(&self.id, &self.adapter, self.storage.as_ref()).await
    }

    /// Stop the background tasks and save one last time.
    pub async fn shutdown(&self) -> Result<()> {
        self.cancel.cancel();
        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Accessory {} task ended abnormally: {}", self.id, e);
            }
        }
        self.save().await?;
        info!("Accessory {} stopped", self.id);
        Ok(())
    }
}

async fn load_snapshot(
    id: String,
    mut adapter: OwnedMutexGuard<Box<dyn SensorAdapter>>,
    storage: Arc<dyn SnapshotStorage>,
) {
    match storage.load(&id).await {
        Ok(Some(snapshot)) => {
            if let Err(e) = adapter.history_mut().restore(snapshot) {
                warn!("Discarding history of {}: {}", id, e);
            }
        }
        Ok(None) => info!("No saved history for {}, starting empty", id),
        Err(e) => warn!("Failed to load history of {}: {}", id, e),
    }
}

async fn save_snapshot(
    id: &str,
    adapter: &SharedAdapter,
    storage: &dyn SnapshotStorage,
) -> Result<()> {
    let snapshot = adapter.lock().await.history().snapshot();
    storage.save(id, &snapshot).await?;
    debug!("Saved history of {} ({} entries)", id, snapshot.used_memory);
    Ok(())
}

async fn run_timers(
    id: String,
    adapter: SharedAdapter,
    storage: Arc<dyn SnapshotStorage>,
    options: AccessoryOptions,
    mut changes: futures::stream::BoxStream<'static, Change>,
    cancel: CancellationToken,
) {
    let now = Instant::now();
    let mut sample = interval_at(now + options.sample_interval, options.sample_interval);
    let mut tick = interval_at(now + options.tick_interval, options.tick_interval);
    let mut save = interval_at(now + options.save_interval, options.save_interval);
    for timer in [&mut sample, &mut tick, &mut save] {
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }
    let mut watching = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sample.tick() => adapter.lock().await.on_sample(),
            _ = tick.tick() => adapter.lock().await.on_tick(),
            _ = save.tick() => {
                if let Err(e) = save_snapshot(&id, &adapter, storage.as_ref()).await {
                    warn!("Failed to save history of {}: {}", id, e);
                }
            }
            change = changes.next(), if watching => match change {
                Some(change) => adapter.lock().await.on_change(change),
                None => watching = false,
            },
        }
    }
    debug!("Timers of {} stopped", id);
}
