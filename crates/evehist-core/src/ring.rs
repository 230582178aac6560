//! Fixed-capacity ring buffer of history entries.
//!
//! Entries are addressed by a logical index that only grows. Index 0 is
//! never handed out; the first append lands on logical index 1. Once the
//! buffer is full every append evicts the oldest logical entry, so the
//! retained window is always `first + 1 ..= last` with
//! `last - first == used`.

use evehist_types::{Entry, HISTORY_CAPACITY};

use crate::error::{Error, Result};

/// Wraparound storage for [`Entry`] values.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<Option<Entry>>,
    first: u32,
    last: u32,
    used: u32,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer {
    /// Create an empty buffer with [`HISTORY_CAPACITY`] slots.
    pub fn new() -> Self {
        Self {
            slots: vec![None; HISTORY_CAPACITY as usize],
            first: 0,
            last: 0,
            used: 0,
        }
    }

    /// Rebuild a buffer from persisted bookkeeping and physical slots.
    ///
    /// Fails if the bookkeeping violates the buffer invariants or a slot in
    /// the retained window is empty.
    pub fn from_parts(
        first: u32,
        last: u32,
        used: u32,
        mut slots: Vec<Option<Entry>>,
    ) -> Result<Self> {
        if used > HISTORY_CAPACITY {
            return Err(Error::invalid_snapshot(format!(
                "used memory {} exceeds capacity {}",
                used, HISTORY_CAPACITY
            )));
        }
        if last != first.wrapping_add(used) {
            return Err(Error::invalid_snapshot(format!(
                "last entry {} != first entry {} + used {}",
                last, first, used
            )));
        }
        if used < HISTORY_CAPACITY && first != 0 {
            return Err(Error::invalid_snapshot(format!(
                "first entry {} must be 0 while the buffer is filling",
                first
            )));
        }
        if slots.len() > HISTORY_CAPACITY as usize {
            return Err(Error::invalid_snapshot(format!(
                "{} slots exceed capacity {}",
                slots.len(),
                HISTORY_CAPACITY
            )));
        }
        slots.resize(HISTORY_CAPACITY as usize, None);

        let ring = Self {
            slots,
            first,
            last,
            used,
        };
        if let Some(missing) = ring.indices().find(|&i| ring.get(i).is_err()) {
            return Err(Error::invalid_snapshot(format!(
                "entry {} is missing from history",
                missing
            )));
        }
        Ok(ring)
    }

    /// Append `entry`, evicting the oldest entry when full.
    ///
    /// Returns the logical index written.
    pub fn append(&mut self, entry: Entry) -> u32 {
        if self.used < HISTORY_CAPACITY {
            self.used += 1;
            self.first = 0;
            self.last = self.used;
        } else {
            self.first = self.first.wrapping_add(1);
            self.last = self.first.wrapping_add(self.used);
        }
        let slot = Self::slot(self.last);
        self.slots[slot] = Some(entry);
        self.last
    }

    /// Entry at logical `index`.
    ///
    /// Valid indices are `first_index() + 1 ..= last_index()`.
    pub fn get(&self, index: u32) -> Result<&Entry> {
        let oldest = self.first.wrapping_add(1);
        if index < oldest || index > self.last {
            return Err(Error::OutOfRange {
                index,
                first: oldest,
                last: self.last,
            });
        }
        self.slots[Self::slot(index)]
            .as_ref()
            .ok_or(Error::OutOfRange {
                index,
                first: oldest,
                last: self.last,
            })
    }

    /// Logical index preceding the oldest retained entry.
    pub fn first_index(&self) -> u32 {
        self.first
    }

    /// Logical index of the newest entry (0 when empty).
    pub fn last_index(&self) -> u32 {
        self.last
    }

    /// Number of retained entries.
    pub fn used_count(&self) -> u32 {
        self.used
    }

    /// Number of slots.
    pub fn capacity(&self) -> u32 {
        HISTORY_CAPACITY
    }

    /// Whether the next append will evict the oldest entry.
    pub fn is_full(&self) -> bool {
        self.used >= HISTORY_CAPACITY
    }

    /// Retained logical indices, oldest first.
    pub fn indices(&self) -> impl Iterator<Item = u32> + use<> {
        self.first.wrapping_add(1)..=self.last
    }

    /// Physical slots up to the highest one ever written.
    pub fn written_slots(&self) -> &[Option<Entry>] {
        if self.is_full() {
            &self.slots
        } else {
            &self.slots[..=self.last as usize]
        }
    }

    fn slot(index: u32) -> usize {
        (index % HISTORY_CAPACITY) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evehist_types::Sample;

    fn entry(n: u32) -> Entry {
        Entry::sample(n, Sample::Status { status: (n % 2) as u8 })
    }

    #[test]
    fn test_empty_buffer() {
        let ring = RingBuffer::new();
        assert_eq!(ring.first_index(), 0);
        assert_eq!(ring.last_index(), 0);
        assert_eq!(ring.used_count(), 0);
        assert_eq!(ring.capacity(), 4032);
        assert!(ring.get(0).is_err());
        assert!(ring.get(1).is_err());
        assert_eq!(ring.indices().count(), 0);
    }

    #[test]
    fn test_first_append_is_index_one() {
        let mut ring = RingBuffer::new();
        assert_eq!(ring.append(entry(10)), 1);
        assert_eq!(ring.get(1).unwrap(), &entry(10));
        assert!(matches!(ring.get(0), Err(Error::OutOfRange { index: 0, .. })));
        assert!(ring.get(2).is_err());
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut ring = RingBuffer::new();
        for n in 1..=HISTORY_CAPACITY {
            assert_eq!(ring.append(entry(n)), n);
        }
        assert!(ring.is_full());
        assert_eq!(ring.first_index(), 0);
        assert_eq!(ring.last_index(), HISTORY_CAPACITY);
        assert_eq!(ring.get(1).unwrap(), &entry(1));
        assert_eq!(ring.get(HISTORY_CAPACITY).unwrap(), &entry(HISTORY_CAPACITY));
    }

    #[test]
    fn test_wraparound_evicts_oldest() {
        let mut ring = RingBuffer::new();
        for n in 1..=HISTORY_CAPACITY + 1 {
            ring.append(entry(n));
        }

        assert!(matches!(ring.get(1), Err(Error::OutOfRange { .. })));
        assert_eq!(ring.get(2).unwrap(), &entry(2));
        assert_eq!(
            ring.get(HISTORY_CAPACITY + 1).unwrap(),
            &entry(HISTORY_CAPACITY + 1)
        );
        assert_eq!(ring.first_index(), 1);
        assert_eq!(ring.used_count(), HISTORY_CAPACITY);
    }

    #[test]
    fn test_written_slots_tracks_highest_slot() {
        let mut ring = RingBuffer::new();
        assert_eq!(ring.written_slots().len(), 1);
        ring.append(entry(1));
        ring.append(entry(2));
        let slots = ring.written_slots();
        assert_eq!(slots.len(), 3);
        assert!(slots[0].is_none());
        assert_eq!(slots[2], Some(entry(2)));
    }

    #[test]
    fn test_from_parts_round_trip() {
        let mut ring = RingBuffer::new();
        for n in 1..=5 {
            ring.append(entry(n));
        }
        let rebuilt = RingBuffer::from_parts(
            ring.first_index(),
            ring.last_index(),
            ring.used_count(),
            ring.written_slots().to_vec(),
        )
        .unwrap();

        for i in ring.indices() {
            assert_eq!(rebuilt.get(i).unwrap(), ring.get(i).unwrap());
        }
    }

    #[test]
    fn test_from_parts_rejects_inconsistent_bookkeeping() {
        assert!(RingBuffer::from_parts(0, 3, 2, vec![]).is_err());
        assert!(RingBuffer::from_parts(0, 5000, 5000, vec![]).is_err());
        assert!(RingBuffer::from_parts(4, 6, 2, vec![None; 7]).is_err());
        assert!(RingBuffer::from_parts(0, 0, 0, vec![None; 5000]).is_err());
    }

    #[test]
    fn test_from_parts_rejects_hole_in_window() {
        let slots = vec![None, Some(entry(1)), None];
        let err = RingBuffer::from_parts(0, 2, 2, slots).unwrap_err();
        assert!(err.to_string().contains("entry 2 is missing"));
    }
}
