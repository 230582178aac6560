//! Per-sensor adapters feeding the history engine.
//!
//! An adapter observes a sensor's live [`Characteristic`]s, decides when a
//! history entry is due, builds it and appends it to its [`HistoryService`].
//!
//! | Adapter | Appends on | Derived values |
//! |---------|------------|----------------|
//! | [`ContactAdapter`] | state change | times opened, last activation |
//! | [`MotionAdapter`] | state change | last activation |
//! | [`ConsumptionAdapter`] | history tick | instantaneous power (optional) |
//! | [`PowerAdapter`] | history tick | lifetime energy total |
//! | [`WeatherAdapter`] | history tick | none |
//!
//! Adapters are plain synchronous state machines; the
//! [`Accessory`](crate::Accessory) runtime serializes every call onto one
//! lock and drives the timers.

mod consumption;
mod contact;
mod motion;
mod power;
mod weather;

use std::fmt::Debug;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{StreamExt, stream};

use evehist_types::SensorKind;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::service::HistoryService;

pub use consumption::{ConsumptionAdapter, ConsumptionAdapterBuilder};
pub use contact::{ContactAdapter, ContactAdapterBuilder};
pub use motion::{MotionAdapter, MotionAdapterBuilder};
pub use power::{PowerAdapter, PowerAdapterBuilder};
pub use weather::{WeatherAdapter, WeatherAdapterBuilder};

/// One observed characteristic update, as delivered to
/// [`SensorAdapter::on_change`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change {
    /// Contact state or motion flag as a history status byte.
    Status(u8),
    /// Instantaneous power in watts.
    Power(f64),
}

/// Behavior shared by every history-bearing sensor.
pub trait SensorAdapter: Debug + Send + Sync {
    /// Sensor type, which selects the entry encoding.
    fn kind(&self) -> SensorKind {
        self.history().kind()
    }

    /// History fields of this sensor.
    fn history(&self) -> &HistoryService;

    /// Mutable access to the history fields.
    fn history_mut(&mut self) -> &mut HistoryService;

    /// Short sampling beat between history ticks.
    fn on_sample(&mut self) {}

    /// Periodic history tick.
    fn on_tick(&mut self);

    /// A watched characteristic took the value carried by `change`.
    ///
    /// Called once per change, in order, even when the characteristic has
    /// moved on since.
    fn on_change(&mut self, _change: Change) {}

    /// Zero the energy accumulators and the lifetime total.
    fn reset_total(&mut self) -> Result<()> {
        Err(Error::Unsupported {
            operation: "reset-total",
            kind: self.kind(),
        })
    }

    /// Notifications that should trigger [`on_change`](Self::on_change).
    fn changes(&self) -> BoxStream<'static, Change> {
        stream::empty().boxed()
    }
}

/// Unwrap a required builder field.
fn require<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| Error::missing(name))
}

fn default_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
