//! Pull-protocol state machine for history transfers.
//!
//! The host writes a request naming the first logical index it wants, then
//! reads the entries field repeatedly. Each read yields one chunk of up to
//! [`CHUNK_ENTRIES`] records; a single `00` byte signals the end.
//!
//! ```text
//! Idle --start(n)--> Active --next_chunk (cursor > last)--> Idle (sentinel)
//!                      ^  |
//!                      +--+ next_chunk (records)
//! ```
//!
//! A new request always replaces the session in progress. The reference
//! time is re-announced on the first record a session ever sends and after
//! a host clock write, besides the records that always carry it.

use tracing::debug;

use evehist_types::codec::{decode_base64, swap32};
use evehist_types::{CHUNK_ENTRIES, DecodeError, DecodeResult};

use crate::encoding::{EntryCodec, ref_time_record};
use crate::history::HistoryStore;

/// Chunk returned once the cursor has passed the newest entry.
pub const END_OF_TRANSFER: [u8; 1] = [0x00];

/// Hex digits a request must carry to reach the index field.
const REQUEST_MIN_HEX_DIGITS: usize = 12;

/// Where a transfer session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferState {
    /// No transfer in progress.
    #[default]
    Idle,
    /// Streaming entries; `cursor` is the next logical index to emit.
    Active { cursor: u32 },
}

/// Decode the starting index from a base64 request payload.
///
/// The index sits in bytes 2..6 of the payload, little-endian.
pub fn parse_request(payload: &str) -> DecodeResult<u32> {
    let bytes = decode_base64(payload)?;
    if bytes.len() * 2 < REQUEST_MIN_HEX_DIGITS {
        return Err(DecodeError::Truncated {
            expected: REQUEST_MIN_HEX_DIGITS,
            actual: bytes.len() * 2,
        });
    }
    Ok(swap32(u32::from_be_bytes([
        bytes[2], bytes[3], bytes[4], bytes[5],
    ])))
}

/// One reader's position in the history.
#[derive(Debug, Clone)]
pub struct TransferSession {
    state: TransferState,
    resync: bool,
}

impl Default for TransferSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferSession {
    /// Create an idle session that owes the host a reference time.
    pub fn new() -> Self {
        Self {
            state: TransferState::Idle,
            resync: true,
        }
    }

    /// Send the reference time in place of the next sample record.
    pub fn request_resync(&mut self) {
        self.resync = true;
    }

    /// Whether the next sample record will be replaced by the reference time.
    pub fn resync_pending(&self) -> bool {
        self.resync
    }

    /// Current state.
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Whether a transfer is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self.state, TransferState::Active { .. })
    }

    /// Start (or restart) a transfer at `requested`.
    ///
    /// Index 0 means "from the oldest retained entry".
    pub fn start(&mut self, requested: u32, store: &HistoryStore) {
        let cursor = match requested {
            0 => store.first_index() + 1,
            n => n,
        };
        debug!(
            "Transfer requested at {} (cursor {}, retained {}..={})",
            requested,
            cursor,
            store.first_index() + 1,
            store.last_index()
        );
        self.state = TransferState::Active { cursor };
    }

    /// Produce the next chunk of raw records.
    ///
    /// Returns [`END_OF_TRANSFER`] and goes idle once the cursor passes the
    /// newest entry. An idle session also answers with the sentinel.
    pub fn next_chunk(&mut self, store: &HistoryStore, codec: &dyn EntryCodec) -> Vec<u8> {
        let TransferState::Active { mut cursor } = self.state else {
            return END_OF_TRANSFER.to_vec();
        };

        let oldest = store.first_index() + 1;
        if cursor < oldest {
            debug!("Entries before {} evicted, skipping cursor from {}", oldest, cursor);
            cursor = oldest;
        }

        if cursor > store.last_index() {
            debug!("Transfer complete at {}", cursor);
            self.state = TransferState::Idle;
            return END_OF_TRANSFER.to_vec();
        }

        let ref_time = store.ref_time().unwrap_or(0);
        let mut chunk = Vec::new();
        let mut emitted = 0;
        while emitted < CHUNK_ENTRIES && cursor <= store.last_index() {
            let Ok(entry) = store.entry_at(cursor) else {
                break;
            };
            match entry.as_sample() {
                Some(sample) if !self.resync && cursor != oldest => {
                    let delta = store.time_delta(entry.time);
                    chunk.extend(codec.encode_entry(cursor, delta, sample));
                }
                _ => {
                    chunk.extend(ref_time_record(cursor, ref_time));
                    self.resync = false;
                }
            }
            cursor += 1;
            emitted += 1;
        }

        debug!("Sending {} entries, next cursor {}", emitted, cursor);
        self.state = TransferState::Active { cursor };
        chunk
    }
}
