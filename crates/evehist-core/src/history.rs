//! History store: the ring buffer plus reference-time bookkeeping.
//!
//! # Index Convention
//!
//! **All history indices are 1-based logical indices**, matching the
//! companion app's addressing:
//! - `first_index() + 1` = oldest retained entry
//! - `last_index()` = newest entry
//!
//! # Reference Time
//!
//! Wire timestamps are deltas against a reference time that is fixed by the
//! very first entry ever appended (expressed in device-epoch seconds). A
//! synthetic marker entry precedes that first entry so a reader learns the
//! reference before any delta. After every process start one more marker is
//! written the first time the full buffer wraps, re-anchoring readers whose
//! earliest retained entry would otherwise be a bare delta.
//!
//! # Status Payload
//!
//! | Field | Width | Value |
//! |-------|-------|-------|
//! | delta | u32 | newest entry time - reference - device epoch |
//! | reserved | u32 | 0 |
//! | reference time | u32 | device-epoch seconds |
//! | fingerprint | variable | sensor field layout |
//! | used | u16 | retained entries |
//! | capacity | u16 | ring slots |
//! | first | u32 | logical index before the oldest entry |
//! | trailer | 6 bytes | `00 00 00 00 01 01` |
//!
//! All integers are little-endian.

use bytes::{BufMut, BytesMut};
use tracing::{debug, info};

use evehist_types::{DEVICE_EPOCH_OFFSET, Entry, HistorySnapshot};

use crate::error::{Error, Result};
use crate::ring::RingBuffer;

const STATUS_TRAILER: [u8; 6] = [0x00, 0x00, 0x00, 0x00, 0x01, 0x01];

/// Ring buffer of entries plus the state needed to timestamp them on the wire.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    ring: RingBuffer,
    ref_time: Option<u32>,
    initial_time: u32,
    last_time: u32,
    restarted: bool,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            ring: RingBuffer::new(),
            ref_time: None,
            initial_time: 0,
            last_time: 0,
            restarted: true,
        }
    }

    /// Append `entry`, inserting reference-time markers where required.
    ///
    /// Returns the logical index of `entry`.
    pub fn add_entry(&mut self, entry: Entry) -> u32 {
        if self.ref_time.is_none() {
            let ref_time = entry.time.wrapping_sub(DEVICE_EPOCH_OFFSET);
            self.ref_time = Some(ref_time);
            self.initial_time = entry.time;
            let marker = self.ring.append(Entry::ref_time(entry.time));
            info!(
                "Reference time set to {} (initial time {}), marker at entry {}",
                ref_time, entry.time, marker
            );
        } else if self.restarted && self.ring.is_full() {
            let marker = self.ring.append(Entry::ref_time(entry.time));
            self.restarted = false;
            debug!("Wrapped after restart, reference marker at entry {}", marker);
        }

        self.last_time = entry.time;
        let index = self.ring.append(entry);
        debug!(
            "Entry {} added (first {}, used {})",
            index,
            self.ring.first_index(),
            self.ring.used_count()
        );
        index
    }

    /// Entry at logical `index`.
    pub fn entry_at(&self, index: u32) -> Result<&Entry> {
        self.ring.get(index)
    }

    /// Wire delta for a wall-clock `time`.
    pub fn time_delta(&self, time: u32) -> u32 {
        match self.ref_time {
            Some(ref_time) => time.wrapping_sub(ref_time).wrapping_sub(DEVICE_EPOCH_OFFSET),
            None => 0,
        }
    }

    /// Reference time in device-epoch seconds, once established.
    pub fn ref_time(&self) -> Option<u32> {
        self.ref_time
    }

    /// Wall-clock time of the first entry ever appended (0 before that).
    pub fn initial_time(&self) -> u32 {
        self.initial_time
    }

    /// Whether the post-restart marker is still pending.
    pub fn is_restarted(&self) -> bool {
        self.restarted
    }

    /// Logical index preceding the oldest retained entry.
    pub fn first_index(&self) -> u32 {
        self.ring.first_index()
    }

    /// Logical index of the newest entry.
    pub fn last_index(&self) -> u32 {
        self.ring.last_index()
    }

    /// Number of retained entries, markers included.
    pub fn used_count(&self) -> u32 {
        self.ring.used_count()
    }

    /// Number of ring slots.
    pub fn capacity(&self) -> u32 {
        self.ring.capacity()
    }

    /// Binary status payload announcing the store layout to the reader.
    pub fn status_payload(&self, fingerprint: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(26 + fingerprint.len());
        buf.put_u32_le(self.time_delta(self.last_time));
        buf.put_u32_le(0);
        buf.put_u32_le(self.ref_time.unwrap_or(0));
        buf.put_slice(fingerprint);
        buf.put_u16_le(self.ring.used_count() as u16);
        buf.put_u16_le(self.ring.capacity() as u16);
        buf.put_u32_le(self.ring.first_index());
        buf.put_slice(&STATUS_TRAILER);
        buf.to_vec()
    }

    /// Serialize the full store state.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            first_entry: self.ring.first_index(),
            last_entry: self.ring.last_index(),
            used_memory: self.ring.used_count(),
            ref_time: self.ref_time.unwrap_or(0),
            initial_time: self.initial_time,
            history: self.ring.written_slots().to_vec(),
        }
    }

    /// Rebuild a store from a snapshot.
    ///
    /// The restored store counts as freshly restarted: the next wrap of the
    /// full buffer writes a reference marker.
    pub fn restore(snapshot: HistorySnapshot) -> Result<Self> {
        let ring = RingBuffer::from_parts(
            snapshot.first_entry,
            snapshot.last_entry,
            snapshot.used_memory,
            snapshot.history,
        )?;

        let ref_time = (snapshot.ref_time != 0).then_some(snapshot.ref_time);
        if ref_time.is_none() && ring.used_count() > 0 {
            return Err(Error::invalid_snapshot(
                "entries present without a reference time",
            ));
        }

        let last_time = match ring.used_count() {
            0 => 0,
            _ => ring.get(ring.last_index())?.time,
        };

        Ok(Self {
            ring,
            ref_time,
            initial_time: snapshot.initial_time,
            last_time,
            restarted: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evehist_types::{HISTORY_CAPACITY, Sample, SensorKind};

    const T0: u32 = 1_700_000_000;

    fn status(time: u32, status: u8) -> Entry {
        Entry::sample(time, Sample::Status { status })
    }

    #[test]
    fn test_first_entry_sets_reference_time() {
        let mut store = HistoryStore::new();
        let index = store.add_entry(status(T0, 1));

        assert_eq!(index, 2);
        assert_eq!(store.ref_time(), Some(T0 - DEVICE_EPOCH_OFFSET));
        assert_eq!(store.initial_time(), T0);
        assert!(store.entry_at(1).unwrap().is_ref_time());
        assert_eq!(store.entry_at(1).unwrap().time, T0);
        assert_eq!(store.entry_at(2).unwrap(), &status(T0, 1));
        assert_eq!(store.used_count(), 2);
        assert_eq!(store.first_index(), 0);
    }

    #[test]
    fn test_reference_time_set_once() {
        let mut store = HistoryStore::new();
        store.add_entry(status(T0, 1));
        store.add_entry(status(T0 + 600, 0));

        assert_eq!(store.ref_time(), Some(T0 - DEVICE_EPOCH_OFFSET));
        assert_eq!(store.initial_time(), T0);
        assert_eq!(store.used_count(), 3);
        assert!(!store.entry_at(3).unwrap().is_ref_time());
    }

    #[test]
    fn test_time_delta() {
        let mut store = HistoryStore::new();
        assert_eq!(store.time_delta(T0), 0);
        store.add_entry(status(T0, 1));
        assert_eq!(store.time_delta(T0), 0);
        assert_eq!(store.time_delta(T0 + 600), 600);
    }

    #[test]
    fn test_status_payload_layout() {
        let mut store = HistoryStore::new();
        store.add_entry(status(T0, 1));
        store.add_entry(status(T0 + 90, 0));

        let payload = store.status_payload(SensorKind::Contact.fingerprint());
        let ref_time = T0 - DEVICE_EPOCH_OFFSET;

        let mut expected = Vec::new();
        expected.extend_from_slice(&90u32.to_le_bytes());
        expected.extend_from_slice(&[0, 0, 0, 0]);
        expected.extend_from_slice(&ref_time.to_le_bytes());
        expected.extend_from_slice(&[0x01, 0x06, 0x01]);
        expected.extend_from_slice(&3u16.to_le_bytes());
        expected.extend_from_slice(&4032u16.to_le_bytes());
        expected.extend_from_slice(&0u32.to_le_bytes());
        expected.extend_from_slice(&[0, 0, 0, 0, 1, 1]);

        assert_eq!(payload, expected);
    }

    #[test]
    fn test_status_payload_before_first_entry() {
        let store = HistoryStore::new();
        let payload = store.status_payload(SensorKind::Weather.fingerprint());
        assert_eq!(&payload[..12], &[0u8; 12]);
        assert_eq!(payload.len(), 26 + 7);
    }

    #[test]
    fn test_restart_marker_inserted_once_on_wrap() {
        let mut store = HistoryStore::new();
        // marker + (capacity - 1) samples fills the ring exactly
        for n in 0..HISTORY_CAPACITY - 1 {
            store.add_entry(status(T0 + n, 1));
        }
        assert_eq!(store.used_count(), HISTORY_CAPACITY);
        assert_eq!(store.first_index(), 0);
        assert!(store.is_restarted());

        let index = store.add_entry(status(T0 + 5000, 0));

        // marker took first+1, the entry first+2
        assert_eq!(store.first_index(), 2);
        assert_eq!(index, HISTORY_CAPACITY + 2);
        assert!(store.entry_at(HISTORY_CAPACITY + 1).unwrap().is_ref_time());
        assert!(!store.is_restarted());
        assert_eq!(store.last_index() - store.first_index(), store.used_count());

        // subsequent wraps do not insert more markers
        let next = store.add_entry(status(T0 + 5600, 1));
        assert_eq!(next, HISTORY_CAPACITY + 3);
        assert_eq!(store.first_index(), 3);
        assert!(!store.entry_at(next).unwrap().is_ref_time());
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut store = HistoryStore::new();
        for n in 0..10 {
            store.add_entry(status(T0 + n * 60, (n % 2) as u8));
        }

        let restored = HistoryStore::restore(store.snapshot()).unwrap();

        assert_eq!(restored.first_index(), store.first_index());
        assert_eq!(restored.last_index(), store.last_index());
        assert_eq!(restored.used_count(), store.used_count());
        assert_eq!(restored.ref_time(), store.ref_time());
        assert_eq!(restored.initial_time(), store.initial_time());
        for i in store.first_index() + 1..=store.last_index() {
            assert_eq!(restored.entry_at(i).unwrap(), store.entry_at(i).unwrap());
        }
        assert_eq!(
            restored.status_payload(&[0x01]),
            store.status_payload(&[0x01])
        );
    }

    #[test]
    fn test_restored_store_is_restarted() {
        let mut store = HistoryStore::new();
        for n in 0..HISTORY_CAPACITY + 10 {
            store.add_entry(status(T0 + n, 1));
        }
        assert!(!store.is_restarted());

        let mut restored = HistoryStore::restore(store.snapshot()).unwrap();
        assert!(restored.is_restarted());

        let first_before = restored.first_index();
        restored.add_entry(status(T0 + 99_999, 0));
        assert_eq!(restored.first_index(), first_before + 2);
        assert!(!restored.is_restarted());
    }

    #[test]
    fn test_restore_empty_snapshot() {
        let restored = HistoryStore::restore(HistorySnapshot::default()).unwrap();
        assert_eq!(restored.used_count(), 0);
        assert_eq!(restored.ref_time(), None);
    }

    #[test]
    fn test_restore_rejects_entries_without_reference() {
        let snapshot = HistorySnapshot {
            first_entry: 0,
            last_entry: 1,
            used_memory: 1,
            ref_time: 0,
            initial_time: 0,
            history: vec![None, Some(status(T0, 1))],
        };
        assert!(matches!(
            HistoryStore::restore(snapshot),
            Err(Error::InvalidSnapshot(_))
        ));
    }
}
