//! Characteristic and service UUIDs for the Eve history protocol.
//!
//! These are the identifiers the companion app looks for when it discovers
//! a history-bearing service. Type registration itself belongs to the host.

use uuid::{Uuid, uuid};

use crate::types::SensorKind;

// --- History service ---

/// Eve history service.
pub const HISTORY_SERVICE: Uuid = uuid!("e863f007-079e-48ff-8f27-9c2605a29f52");

/// History status (read/notify). Recomputed on every appended entry.
pub const HISTORY_STATUS: Uuid = uuid!("e863f116-079e-48ff-8f27-9c2605a29f52");

/// History entries (read). Each read yields the next chunk of a transfer.
pub const HISTORY_ENTRIES: Uuid = uuid!("e863f117-079e-48ff-8f27-9c2605a29f52");

/// History request (write). Starts a transfer at a given entry index.
pub const HISTORY_REQUEST: Uuid = uuid!("e863f11c-079e-48ff-8f27-9c2605a29f52");

/// Clock adjust (write).
pub const SET_TIME: Uuid = uuid!("e863f121-079e-48ff-8f27-9c2605a29f52");

// --- Sensor-specific characteristics ---

/// Reset accumulated totals (write).
pub const RESET_TOTAL: Uuid = uuid!("e863f112-079e-48ff-8f27-9c2605a29f52");

/// Number of times a contact sensor has been opened.
pub const TIMES_OPENED: Uuid = uuid!("e863f129-079e-48ff-8f27-9c2605a29f52");

/// Seconds between the first history entry and the last activation.
pub const LAST_ACTIVATION: Uuid = uuid!("e863f11a-079e-48ff-8f27-9c2605a29f52");

/// Instantaneous power consumption.
pub const CURRENT_CONSUMPTION: Uuid = uuid!("e863f10d-079e-48ff-8f27-9c2605a29f52");

/// Lifetime energy consumption.
pub const TOTAL_CONSUMPTION: Uuid = uuid!("e863f10c-079e-48ff-8f27-9c2605a29f52");

/// Air pressure.
pub const AIR_PRESSURE: Uuid = uuid!("e863f10f-079e-48ff-8f27-9c2605a29f52");

/// Characteristics a service of `kind` exposes: the four history fields
/// followed by the sensor-specific ones.
pub fn characteristics_for(kind: SensorKind) -> Vec<Uuid> {
    let mut ids = vec![HISTORY_STATUS, HISTORY_ENTRIES, HISTORY_REQUEST, SET_TIME];
    match kind {
        SensorKind::Contact => ids.extend([TIMES_OPENED, LAST_ACTIVATION]),
        SensorKind::Motion => ids.push(LAST_ACTIVATION),
        SensorKind::Consumption | SensorKind::Power => {
            ids.extend([CURRENT_CONSUMPTION, TOTAL_CONSUMPTION, RESET_TOTAL])
        }
        SensorKind::Weather => ids.push(AIR_PRESSURE),
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_characteristics_for_kind() {
        let contact = characteristics_for(SensorKind::Contact);
        assert_eq!(&contact[..4], &[HISTORY_STATUS, HISTORY_ENTRIES, HISTORY_REQUEST, SET_TIME]);
        assert!(contact.contains(&TIMES_OPENED));
        assert!(!contact.contains(&RESET_TOTAL));

        for kind in SensorKind::ALL {
            assert_eq!(
                characteristics_for(kind).contains(&RESET_TOTAL),
                kind.supports_reset_total()
            );
        }
    }

    #[test]
    fn test_history_uuids_share_base() {
        for id in [HISTORY_STATUS, HISTORY_ENTRIES, HISTORY_REQUEST, SET_TIME] {
            assert!(id.to_string().ends_with("-079e-48ff-8f27-9c2605a29f52"));
        }
    }

    #[test]
    fn test_history_uuids_are_distinct() {
        assert_ne!(HISTORY_STATUS, HISTORY_ENTRIES);
        assert_ne!(HISTORY_ENTRIES, HISTORY_REQUEST);
        assert_ne!(HISTORY_REQUEST, SET_TIME);
    }
}
