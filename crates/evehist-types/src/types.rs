//! Core types for history entries.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Seconds between the Unix epoch and the device epoch (2001-01-01T00:00:00Z).
pub const DEVICE_EPOCH_OFFSET: u32 = 978_307_200;

/// Number of slots in the history ring buffer.
pub const HISTORY_CAPACITY: u32 = 4032;

/// Maximum number of records packed into one entries chunk.
pub const CHUNK_ENTRIES: usize = 11;

/// Seconds between history ticks.
pub const HISTORY_INTERVAL_SECS: u64 = 600;

/// Seconds between sampling beats.
pub const SAMPLE_INTERVAL_SECS: u64 = 10;

/// Kind of history-bearing sensor.
///
/// The kind fixes the fingerprint announced in the status payload and the
/// tag byte carried by every entry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SensorKind {
    /// Door/window contact sensor.
    Contact,
    /// Motion sensor.
    Motion,
    /// Energy meter reporting a lifetime total.
    Consumption,
    /// Power sensor reporting instantaneous watts.
    Power,
    /// Temperature, humidity and pressure sensor.
    Weather,
}

impl SensorKind {
    /// All kinds, in declaration order.
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Contact,
        SensorKind::Motion,
        SensorKind::Consumption,
        SensorKind::Power,
        SensorKind::Weather,
    ];

    /// Field-layout descriptor announced in the status payload.
    ///
    /// ```
    /// use evehist_types::SensorKind;
    ///
    /// assert_eq!(SensorKind::Contact.fingerprint(), &[0x01, 0x06, 0x01]);
    /// ```
    #[must_use]
    pub fn fingerprint(&self) -> &'static [u8] {
        match self {
            SensorKind::Contact => &[0x01, 0x06, 0x01],
            SensorKind::Motion => &[0x02, 0x13, 0x01, 0x1c, 0x01],
            SensorKind::Consumption | SensorKind::Power => {
                &[0x04, 0x01, 0x02, 0x02, 0x02, 0x07, 0x02, 0x0f, 0x03]
            }
            SensorKind::Weather => &[0x03, 0x01, 0x02, 0x02, 0x02, 0x03, 0x02],
        }
    }

    /// Bitmask byte that precedes the values of every entry record.
    #[must_use]
    pub fn entry_tag(&self) -> u8 {
        match self {
            SensorKind::Contact => 0x01,
            SensorKind::Motion => 0x02,
            SensorKind::Consumption | SensorKind::Power => 0x1f,
            SensorKind::Weather => 0x07,
        }
    }

    /// Whether the kind keeps running/lifetime energy totals.
    #[must_use]
    pub fn supports_reset_total(&self) -> bool {
        matches!(self, SensorKind::Consumption | SensorKind::Power)
    }

    /// Whether entries are appended on value changes rather than ticks.
    #[must_use]
    pub fn is_event_driven(&self) -> bool {
        matches!(self, SensorKind::Contact | SensorKind::Motion)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Contact => write!(f, "contact"),
            SensorKind::Motion => write!(f, "motion"),
            SensorKind::Consumption => write!(f, "consumption"),
            SensorKind::Power => write!(f, "power"),
            SensorKind::Weather => write!(f, "weather"),
        }
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorKind::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown sensor kind '{}'", s))
    }
}

/// Sensor values carried by a regular history entry.
///
/// Serialized untagged so persisted entries keep their flat shape, e.g.
/// `{"time": 1700000000, "status": 1}`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Sample {
    /// Temperature (°C), relative humidity (%) and pressure (hPa).
    Weather {
        temp: f64,
        humidity: f64,
        pressure: f64,
    },
    /// Power in watts.
    Energy { power: f64 },
    /// Binary state (open/closed, motion/no motion).
    Status { status: u8 },
}

impl Sample {
    /// Status bit, if this is a status sample.
    pub fn status(&self) -> Option<u8> {
        match self {
            Sample::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// Power in watts, if this is an energy sample.
    pub fn power(&self) -> Option<f64> {
        match self {
            Sample::Energy { power } => Some(*power),
            _ => None,
        }
    }
}

/// Payload of a ring-buffer slot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum EntryKind {
    /// Marker telling the reader to (re)learn the reference time.
    RefTime {
        #[cfg_attr(feature = "serde", serde(rename = "setRefTime"))]
        set_ref_time: u8,
    },
    /// Regular sensor sample.
    Sample(Sample),
}

/// One time-stamped history record.
///
/// `time` is wall-clock Unix seconds; it is converted to a device-epoch
/// delta only when encoded for the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entry {
    /// Unix seconds.
    pub time: u32,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: EntryKind,
}

impl Entry {
    /// A reference-time marker at `time`.
    #[must_use]
    pub fn ref_time(time: u32) -> Self {
        Self {
            time,
            kind: EntryKind::RefTime { set_ref_time: 1 },
        }
    }

    /// A regular sample at `time`.
    #[must_use]
    pub fn sample(time: u32, sample: Sample) -> Self {
        Self {
            time,
            kind: EntryKind::Sample(sample),
        }
    }

    /// Whether this slot is a reference-time marker.
    #[must_use]
    pub fn is_ref_time(&self) -> bool {
        matches!(self.kind, EntryKind::RefTime { .. })
    }

    /// The sample, unless this is a marker.
    #[must_use]
    pub fn as_sample(&self) -> Option<&Sample> {
        match &self.kind {
            EntryKind::Sample(sample) => Some(sample),
            EntryKind::RefTime { .. } => None,
        }
    }
}

/// Persisted form of a history store.
///
/// Field names follow the JSON layout used by existing snapshot files.
/// `history` holds the physical ring slots; unwritten slots are `null`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HistorySnapshot {
    pub first_entry: u32,
    pub last_entry: u32,
    pub used_memory: u32,
    pub ref_time: u32,
    pub initial_time: u32,
    pub history: Vec<Option<Entry>>,
}
