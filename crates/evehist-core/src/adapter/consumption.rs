//! Outlets reporting a lifetime energy total.

use std::sync::Arc;

use tracing::{debug, info};

use evehist_types::{Entry, Sample, SensorKind};

use super::{SensorAdapter, default_clock, require};
use crate::characteristic::Characteristic;
use crate::clock::Clock;
use crate::error::Result;
use crate::service::HistoryService;

/// Samples power on every history tick.
///
/// With `derive_power` the power is computed from the change of the
/// lifetime total (Wh) since the previous tick and written back to the
/// power characteristic; otherwise the power characteristic is sampled.
#[derive(Debug)]
pub struct ConsumptionAdapter {
    history: HistoryService,
    power: Characteristic<f64>,
    total: Characteristic<f64>,
    derive_power: bool,
    previous: Option<(u32, f64)>,
    clock: Arc<dyn Clock>,
}

/// Builder for [`ConsumptionAdapter`].
#[derive(Debug, Default)]
pub struct ConsumptionAdapterBuilder {
    power: Option<Characteristic<f64>>,
    total: Option<Characteristic<f64>>,
    derive_power: bool,
    clock: Option<Arc<dyn Clock>>,
}

impl ConsumptionAdapterBuilder {
    /// Instantaneous power in W. Required.
    #[must_use]
    pub fn power(mut self, power: Characteristic<f64>) -> Self {
        self.power = Some(power);
        self
    }

    /// Lifetime energy in Wh. Required.
    #[must_use]
    pub fn total(mut self, total: Characteristic<f64>) -> Self {
        self.total = Some(total);
        self
    }

    /// Compute power from the total instead of sampling it.
    #[must_use]
    pub fn derive_power(mut self, derive: bool) -> Self {
        self.derive_power = derive;
        self
    }

    /// Time source. Defaults to the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<ConsumptionAdapter> {
        Ok(ConsumptionAdapter {
            history: HistoryService::new(SensorKind::Consumption),
            power: require(self.power, "power")?,
            total: require(self.total, "total consumption")?,
            derive_power: self.derive_power,
            previous: None,
            clock: self.clock.unwrap_or_else(default_clock),
        })
    }
}

impl ConsumptionAdapter {
    /// Create a builder.
    pub fn builder() -> ConsumptionAdapterBuilder {
        ConsumptionAdapterBuilder::default()
    }

    fn derived_power(&self, now: u32, total: f64) -> f64 {
        match self.previous {
            Some((then, previous)) if now > then => {
                (total - previous) * 3600.0 / f64::from(now - then)
            }
            _ => 0.0,
        }
    }
}

impl SensorAdapter for ConsumptionAdapter {
    fn history(&self) -> &HistoryService {
        &self.history
    }

    fn history_mut(&mut self) -> &mut HistoryService {
        &mut self.history
    }

    fn on_tick(&mut self) {
        let now = self.clock.now();
        let total = self.total.get();
        let power = if self.derive_power {
            let power = self.derived_power(now, total);
            self.power.set(power);
            power
        } else {
            self.power.get()
        };
        self.previous = Some((now, total));

        debug!("Consumption tick: {:.1} W, total {:.1} Wh", power, total);
        self.history
            .add_entry(Entry::sample(now, Sample::Energy { power }));
    }

    fn reset_total(&mut self) -> Result<()> {
        self.total.set(0.0);
        if let Some((then, _)) = self.previous {
            self.previous = Some((then, 0.0));
        }
        info!("Consumption total reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const T0: u32 = 1_700_000_000;

    struct Fixture {
        adapter: ConsumptionAdapter,
        power: Characteristic<f64>,
        total: Characteristic<f64>,
        clock: ManualClock,
    }

    fn fixture(derive_power: bool) -> Fixture {
        let power = Characteristic::new(0.0);
        let total = Characteristic::new(1000.0);
        let clock = ManualClock::new(T0);
        let adapter = ConsumptionAdapter::builder()
            .power(power.clone())
            .total(total.clone())
            .derive_power(derive_power)
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();
        Fixture {
            adapter,
            power,
            total,
            clock,
        }
    }

    fn newest_power(adapter: &ConsumptionAdapter) -> Option<f64> {
        let store = adapter.history().store();
        store
            .entry_at(store.last_index())
            .ok()
            .and_then(|e| e.as_sample().and_then(Sample::power))
    }

    #[test]
    fn test_derived_power_from_total() {
        let Fixture {
            mut adapter,
            power,
            total,
            clock,
        } = fixture(true);

        adapter.on_tick();
        assert_eq!(newest_power(&adapter), Some(0.0));

        clock.advance(600);
        total.set(1050.0);
        adapter.on_tick();

        // 50 Wh over 10 minutes
        assert_eq!(newest_power(&adapter), Some(300.0));
        assert_eq!(power.get(), 300.0);
    }

    #[test]
    fn test_sampled_power() {
        let Fixture {
            mut adapter,
            power,
            ..
        } = fixture(false);
        power.set(42.5);
        adapter.on_tick();
        assert_eq!(newest_power(&adapter), Some(42.5));
    }

    #[test]
    fn test_reset_total() {
        let Fixture {
            mut adapter,
            total,
            clock,
            ..
        } = fixture(true);
        adapter.on_tick();
        adapter.reset_total().unwrap();
        assert_eq!(total.get(), 0.0);

        clock.advance(3600);
        total.set(10.0);
        adapter.on_tick();
        assert_eq!(newest_power(&adapter), Some(10.0));
    }

    #[test]
    fn test_build_requires_total() {
        assert!(
            ConsumptionAdapter::builder()
                .power(Characteristic::new(0.0))
                .build()
                .is_err()
        );
    }
}
