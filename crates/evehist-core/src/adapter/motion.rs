//! Motion sensors.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;

use evehist_types::{Entry, Sample, SensorKind};

use super::{Change, SensorAdapter, default_clock, require};
use crate::characteristic::Characteristic;
use crate::clock::Clock;
use crate::error::Result;
use crate::service::HistoryService;

/// Records every motion transition.
#[derive(Debug)]
pub struct MotionAdapter {
    history: HistoryService,
    detected: Characteristic<bool>,
    last_activation: Characteristic<u32>,
    repeat_on_tick: bool,
    clock: Arc<dyn Clock>,
}

/// Builder for [`MotionAdapter`].
#[derive(Debug, Default)]
pub struct MotionAdapterBuilder {
    detected: Option<Characteristic<bool>>,
    last_activation: Option<Characteristic<u32>>,
    repeat_on_tick: bool,
    clock: Option<Arc<dyn Clock>>,
}

impl MotionAdapterBuilder {
    /// Motion detected flag. Required.
    #[must_use]
    pub fn detected(mut self, detected: Characteristic<bool>) -> Self {
        self.detected = Some(detected);
        self
    }

    /// Seconds since the first history entry at the last detection. Required.
    #[must_use]
    pub fn last_activation(mut self, last_activation: Characteristic<u32>) -> Self {
        self.last_activation = Some(last_activation);
        self
    }

    /// Re-append the current state on every history tick.
    #[must_use]
    pub fn repeat_on_tick(mut self, repeat: bool) -> Self {
        self.repeat_on_tick = repeat;
        self
    }

    /// Time source. Defaults to the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<MotionAdapter> {
        Ok(MotionAdapter {
            history: HistoryService::new(SensorKind::Motion),
            detected: require(self.detected, "motion detected")?,
            last_activation: require(self.last_activation, "last activation")?,
            repeat_on_tick: self.repeat_on_tick,
            clock: self.clock.unwrap_or_else(default_clock),
        })
    }
}

impl MotionAdapter {
    /// Create a builder.
    pub fn builder() -> MotionAdapterBuilder {
        MotionAdapterBuilder::default()
    }

    fn append_status(&mut self, status: u8) {
        self.history
            .add_entry(Entry::sample(self.clock.now(), Sample::Status { status }));
    }
}

impl SensorAdapter for MotionAdapter {
    fn history(&self) -> &HistoryService {
        &self.history
    }

    fn history_mut(&mut self) -> &mut HistoryService {
        &mut self.history
    }

    fn on_tick(&mut self) {
        if self.repeat_on_tick {
            self.append_status(u8::from(self.detected.get()));
        }
    }

    fn on_change(&mut self, change: Change) {
        let Change::Status(status) = change else {
            return;
        };
        self.append_status(status);
        if status != 0 {
            let now = self.clock.now();
            self.last_activation
                .set(now.saturating_sub(self.history.store().initial_time()));
        }
    }

    fn changes(&self) -> BoxStream<'static, Change> {
        self.detected
            .changes()
            .map(|detected| Change::Status(u8::from(detected)))
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::Error;

    const T0: u32 = 1_700_000_000;

    #[test]
    fn test_detection_sets_last_activation() {
        let detected = Characteristic::new(false);
        let last_activation = Characteristic::new(0);
        let clock = ManualClock::new(T0);
        let mut adapter = MotionAdapter::builder()
            .detected(detected.clone())
            .last_activation(last_activation.clone())
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();

        adapter.on_change(Change::Status(0));
        assert_eq!(last_activation.get(), 0);

        clock.advance(120);
        detected.set(true);
        adapter.on_change(Change::Status(1));
        assert_eq!(last_activation.get(), 120);

        clock.advance(60);
        detected.set(false);
        adapter.on_change(Change::Status(0));
        assert_eq!(last_activation.get(), 120);

        let store = adapter.history().store();
        assert_eq!(store.used_count(), 4);
        assert_eq!(
            store.entry_at(3).unwrap().as_sample(),
            Some(&Sample::Status { status: 1 })
        );
        assert_eq!(adapter.kind(), SensorKind::Motion);
    }

    #[tokio::test]
    async fn test_changes_map_flag_to_status() {
        let detected = Characteristic::new(false);
        let adapter = MotionAdapter::builder()
            .detected(detected.clone())
            .last_activation(Characteristic::new(0))
            .build()
            .unwrap();
        let mut changes = adapter.changes();

        detected.set(true);
        detected.set(false);
        assert_eq!(changes.next().await, Some(Change::Status(1)));
        assert_eq!(changes.next().await, Some(Change::Status(0)));
    }

    #[test]
    fn test_build_requires_last_activation() {
        let err = MotionAdapter::builder()
            .detected(Characteristic::new(false))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
