//! History engine for the Eve history exchange protocol.
//!
//! The Eve companion app pulls time-series history from an accessory
//! through three opaque fields: a *status* blob describing the stored
//! history, a *request* field naming the first entry wanted, and an
//! *entries* field read repeatedly for chunks of records. This crate
//! implements the accessory side of that exchange.
//!
//! # Features
//!
//! - **Ring buffer**: 4032 time-stamped entries with wraparound addressing
//! - **Reference time**: marker entries anchoring every wire timestamp
//! - **Transfers**: chunked pull sessions of up to 11 records
//! - **Sensor adapters**: contact, motion, consumption, power and weather
//! - **Persistence**: snapshot load/save through [`evehist_store`]
//! - **Async runtime**: timers and change subscriptions per accessory
//!
//! # Supported Sensors
//!
//! | Sensor | Entry fields | Appends on |
//! |--------|--------------|------------|
//! | Contact | status | change |
//! | Motion | status | change |
//! | Consumption | power | tick |
//! | Power | average power | tick |
//! | Weather | temperature, humidity, pressure | tick |
//!
//! # Quick Start
//!
//! ```
//! use evehist_core::{Entry, HistoryService, Sample, SensorKind};
//!
//! let mut service = HistoryService::new(SensorKind::Contact);
//! service.add_entry(Entry::sample(1_700_000_000, Sample::Status { status: 1 }));
//!
//! // the host asks for everything from the oldest entry
//! service.write_request("ARQAAAAAAAA=").unwrap();
//! let chunk = service.read_entries();
//! assert_ne!(chunk, "AA==");
//! assert_eq!(service.read_entries(), "AA==");
//! ```

pub mod accessory;
pub mod adapter;
pub mod characteristic;
pub mod clock;
pub mod encoding;
pub mod error;
pub mod history;
pub mod ring;
pub mod service;
pub mod transfer;

pub use accessory::{Accessory, AccessoryOptions, SharedAdapter};
pub use adapter::{
    Change, ConsumptionAdapter, ContactAdapter, MotionAdapter, PowerAdapter, SensorAdapter,
    WeatherAdapter,
};
pub use characteristic::Characteristic;
pub use clock::{Clock, ManualClock, SystemClock};
pub use encoding::{EntryCodec, codec_for};
pub use error::{Error, Result};
pub use history::HistoryStore;
pub use ring::RingBuffer;
pub use service::HistoryService;
pub use transfer::{END_OF_TRANSFER, TransferSession, TransferState, parse_request};

// Re-export the wire types for convenience
pub use evehist_types::{
    CHUNK_ENTRIES, DEVICE_EPOCH_OFFSET, Entry, EntryKind, HISTORY_CAPACITY, HistorySnapshot,
    Sample, SensorKind,
};
