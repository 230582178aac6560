//! Wire types for the Eve history exchange protocol.
//!
//! This crate provides the pieces shared by the history engine and its
//! persistence layer:
//!
//! - Byte-swap, hex and base64 helpers ([`codec`])
//! - History entries and the persisted snapshot layout
//! - Per-sensor fingerprints and protocol constants
//! - Characteristic UUIDs
//!
//! # Example
//!
//! ```
//! use evehist_types::{Entry, Sample, SensorKind};
//! use evehist_types::codec::hex_to_base64;
//!
//! let entry = Entry::sample(1_700_000_000, Sample::Status { status: 1 });
//! assert!(!entry.is_ref_time());
//! assert_eq!(hex_to_base64("01 0601").unwrap(), "AQYB");
//! assert_eq!(SensorKind::Contact.entry_tag(), 0x01);
//! ```

pub mod codec;
pub mod error;
pub mod types;
pub mod uuid;

pub use error::{DecodeError, DecodeResult};
pub use types::{
    CHUNK_ENTRIES, DEVICE_EPOCH_OFFSET, Entry, EntryKind, HISTORY_CAPACITY,
    HISTORY_INTERVAL_SECS, HistorySnapshot, SAMPLE_INTERVAL_SECS, Sample, SensorKind,
};
pub use uuid as uuids;
pub use ::uuid::Uuid;
