//! Outlets reporting instantaneous power only.
//!
//! Power is integrated over time between changes and ticks. Each history
//! tick appends the average power of the elapsed interval and folds the
//! interval's energy, rounded to whole Wh, into the lifetime total.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, info};

use evehist_types::{Entry, Sample, SensorKind};

use super::{Change, SensorAdapter, default_clock, require};
use crate::characteristic::Characteristic;
use crate::clock::Clock;
use crate::error::Result;
use crate::service::HistoryService;

const SECS_PER_HOUR: f64 = 3600.0;

/// Integrates power into interval averages and a lifetime total.
#[derive(Debug)]
pub struct PowerAdapter {
    history: HistoryService,
    power: Characteristic<f64>,
    total: Characteristic<f64>,
    clock: Arc<dyn Clock>,
    /// Energy of the current interval in watt-seconds.
    interval_ws: f64,
    interval_start: u32,
    lifetime_wh: f64,
    last_power: f64,
    last_update: u32,
}

/// Builder for [`PowerAdapter`].
#[derive(Debug, Default)]
pub struct PowerAdapterBuilder {
    power: Option<Characteristic<f64>>,
    total: Option<Characteristic<f64>>,
    clock: Option<Arc<dyn Clock>>,
}

impl PowerAdapterBuilder {
    /// Instantaneous power in W. Required.
    #[must_use]
    pub fn power(mut self, power: Characteristic<f64>) -> Self {
        self.power = Some(power);
        self
    }

    /// Lifetime energy in Wh, also the starting value of the total. Required.
    #[must_use]
    pub fn total(mut self, total: Characteristic<f64>) -> Self {
        self.total = Some(total);
        self
    }

    /// Time source. Defaults to the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<PowerAdapter> {
        let power = require(self.power, "power")?;
        let total = require(self.total, "total consumption")?;
        let clock = self.clock.unwrap_or_else(default_clock);
        let now = clock.now();
        Ok(PowerAdapter {
            history: HistoryService::new(SensorKind::Power),
            last_power: power.get(),
            lifetime_wh: total.get(),
            power,
            total,
            clock,
            interval_ws: 0.0,
            interval_start: now,
            last_update: now,
        })
    }
}

impl PowerAdapter {
    /// Create a builder.
    pub fn builder() -> PowerAdapterBuilder {
        PowerAdapterBuilder::default()
    }

    /// Lifetime energy in Wh.
    pub fn lifetime_wh(&self) -> f64 {
        self.lifetime_wh
    }

    fn integrate(&mut self, now: u32) {
        let elapsed = now.saturating_sub(self.last_update);
        self.interval_ws += self.last_power * f64::from(elapsed);
        self.last_update = now;
    }
}

impl SensorAdapter for PowerAdapter {
    fn history(&self) -> &HistoryService {
        &self.history
    }

    fn history_mut(&mut self) -> &mut HistoryService {
        &mut self.history
    }

    fn on_tick(&mut self) {
        let now = self.clock.now();
        self.integrate(now);

        let elapsed = now.saturating_sub(self.interval_start);
        let average = match elapsed {
            0 => self.last_power,
            secs => self.interval_ws / f64::from(secs),
        };
        self.lifetime_wh += (self.interval_ws / SECS_PER_HOUR).round();
        self.total.set(self.lifetime_wh);
        debug!(
            "Power tick: {:.1} W over {}s, total {} Wh",
            average, elapsed, self.lifetime_wh
        );

        self.history
            .add_entry(Entry::sample(now, Sample::Energy { power: average }));
        self.interval_ws = 0.0;
        self.interval_start = now;
    }

    fn on_change(&mut self, change: Change) {
        let Change::Power(watts) = change else {
            return;
        };
        let now = self.clock.now();
        self.integrate(now);
        self.last_power = watts;
    }

    fn reset_total(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.interval_ws = 0.0;
        self.interval_start = now;
        self.last_update = now;
        self.lifetime_wh = 0.0;
        self.total.set(0.0);
        info!("Power total reset");
        Ok(())
    }

    fn changes(&self) -> BoxStream<'static, Change> {
        self.power.changes().map(Change::Power).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const T0: u32 = 1_700_000_000;

    struct Fixture {
        adapter: PowerAdapter,
        power: Characteristic<f64>,
        total: Characteristic<f64>,
        clock: ManualClock,
    }

    fn fixture(initial_power: f64, initial_total: f64) -> Fixture {
        let power = Characteristic::new(initial_power);
        let total = Characteristic::new(initial_total);
        let clock = ManualClock::new(T0);
        let adapter = PowerAdapter::builder()
            .power(power.clone())
            .total(total.clone())
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

    fn newest_power(adapter: &PowerAdapter) -> f64 {
        let store = adapter.history().store();
        store
            .entry_at(store.last_index())
            .ok()
            .and_then(|e| e.as_sample().and_then(Sample::power))
            .unwrap_or(f64::NAN)
    }

    #[test]
    fn test_interval_bucket_and_lifetime() {
        let mut f = fixture(100.0, 0.0);

        f.clock.advance(600);
        f.adapter.on_tick();
        assert_eq!(newest_power(&f.adapter), 100.0);
        assert_eq!(f.total.get(), 17.0);

        f.power.set(200.0);
        f.adapter.on_change(Change::Power(200.0));
        f.clock.advance(600);
        f.adapter.on_tick();
        assert_eq!(newest_power(&f.adapter), 200.0);
        assert_eq!(f.total.get(), 50.0);
    }

    #[test]
    fn test_change_mid_interval_averages() {
        let mut f = fixture(0.0, 0.0);
        f.clock.advance(300);
        f.power.set(120.0);
        f.adapter.on_change(Change::Power(120.0));
        f.clock.advance(300);
        f.adapter.on_tick();
        assert_eq!(newest_power(&f.adapter), 60.0);
        assert_eq!(f.adapter.lifetime_wh(), 10.0);
    }

    #[test]
    fn test_lifetime_starts_from_total() {
        let mut f = fixture(3600.0, 500.0);
        f.clock.advance(3600);
        f.adapter.on_tick();
        assert_eq!(f.total.get(), 4100.0);
    }

    #[test]
    fn test_reset_total_zeroes_accumulators() {
        let mut f = fixture(100.0, 250.0);
        f.clock.advance(300);
        f.adapter.reset_total().unwrap();
        assert_eq!(f.total.get(), 0.0);

        f.clock.advance(36);
        f.adapter.on_tick();
        // only the 36 s after the reset count: 100 W * 36 s = 1 Wh
        assert_eq!(f.total.get(), 1.0);
        assert_eq!(newest_power(&f.adapter), 100.0);
        // earlier entries are kept
        assert_eq!(f.adapter.history().store().used_count(), 2);
    }
}
