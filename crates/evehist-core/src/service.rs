//! The history fields exposed to the host.
//!
//! [`HistoryService`] owns a [`HistoryStore`] and the single transfer
//! session reading it, and speaks the text-wrapped binary payloads the host
//! exchanges:
//!
//! | Field | Direction | Payload |
//! |-------|-----------|---------|
//! | status | read | store layout, refreshed on every append |
//! | request | write | first logical index to transfer |
//! | entries | read | next chunk of records, `AA==` when done |
//! | set time | write | host clock, logged; forces a reference-time resync |

use tracing::{debug, info};

use evehist_types::codec::{bytes_to_hex, decode_base64, encode_base64};
use evehist_types::{DEVICE_EPOCH_OFFSET, DecodeError, Entry, HistorySnapshot, SensorKind};

use crate::encoding::{EntryCodec, codec_for};
use crate::error::Result;
use crate::history::HistoryStore;
use crate::transfer::{TransferSession, parse_request};

/// History store, transfer session and cached status for one sensor.
#[derive(Debug)]
pub struct HistoryService {
    kind: SensorKind,
    store: HistoryStore,
    session: TransferSession,
    status: String,
}

impl HistoryService {
    /// Create a service with an empty store.
    pub fn new(kind: SensorKind) -> Self {
        Self::with_store(kind, HistoryStore::new())
    }

    /// Create a service around an existing store.
    pub fn with_store(kind: SensorKind, store: HistoryStore) -> Self {
        let mut service = Self {
            kind,
            store,
            session: TransferSession::new(),
            status: String::new(),
        };
        service.refresh_status();
        service
    }

    /// Sensor type served.
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// The underlying store.
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// The current transfer session.
    pub fn session(&self) -> &TransferSession {
        &self.session
    }

    fn codec(&self) -> &'static dyn EntryCodec {
        codec_for(self.kind)
    }

    fn refresh_status(&mut self) {
        let payload = self.store.status_payload(self.codec().fingerprint());
        debug!("{} status: {}", self.kind, bytes_to_hex(&payload));
        self.status = encode_base64(&payload);
    }

    /// Append an entry and refresh the status payload.
    pub fn add_entry(&mut self, entry: Entry) -> u32 {
        let index = self.store.add_entry(entry);
        self.refresh_status();
        index
    }

    /// Base64 status payload.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Handle a write to the request field, starting a new transfer.
    ///
    /// Returns the requested index.
    pub fn write_request(&mut self, payload: &str) -> Result<u32> {
        let requested = parse_request(payload)?;
        self.session.start(requested, &self.store);
        Ok(requested)
    }

    /// Handle a read of the entries field.
    pub fn read_entries(&mut self) -> String {
        let chunk = self.session.next_chunk(&self.store, self.codec());
        debug!("{} entries: {}", self.kind, bytes_to_hex(&chunk));
        encode_base64(&chunk)
    }

    /// Handle a write to the set-time field.
    ///
    /// The host's clock is decoded and logged, and the next transferred
    /// sample is replaced by the reference time so the host can realign.
    /// The history itself is untouched. Returns the host time as Unix
    /// seconds.
    pub fn write_time(&mut self, payload: &str) -> Result<u32> {
        let bytes = decode_base64(payload)?;
        let Some(secs) = bytes.first_chunk::<4>() else {
            return Err(DecodeError::Truncated {
                expected: 8,
                actual: bytes.len() * 2,
            }
            .into());
        };
        let unix = u32::from_le_bytes(*secs).wrapping_add(DEVICE_EPOCH_OFFSET);
        info!("{} host clock reported as {}", self.kind, unix);
        self.session.request_resync();
        Ok(unix)
    }

    /// Persistable copy of the store.
    pub fn snapshot(&self) -> HistorySnapshot {
        self.store.snapshot()
    }

    /// Replace the store with a restored snapshot.
    ///
    /// On failure the current store is kept and the error returned for the
    /// caller to log.
    pub fn restore(&mut self, snapshot: HistorySnapshot) -> Result<()> {
        self.store = HistoryStore::restore(snapshot)?;
        self.session = TransferSession::new();
        self.refresh_status();
        info!(
            "{} history restored: {} entries, last index {}",
            self.kind,
            self.store.used_count(),
            self.store.last_index()
        );
        Ok(())
    }
}
