//! Door and window contact sensors.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::debug;

use evehist_types::{Entry, Sample, SensorKind};

use super::{Change, SensorAdapter, default_clock, require};
use crate::characteristic::Characteristic;
use crate::clock::Clock;
use crate::error::Result;
use crate::service::HistoryService;

/// Contact state value for an open contact.
pub const CONTACT_OPEN: u8 = 1;

/// Records every open/close transition.
#[derive(Debug)]
pub struct ContactAdapter {
    history: HistoryService,
    state: Characteristic<u8>,
    times_opened: Characteristic<u32>,
    last_activation: Characteristic<u32>,
    repeat_on_tick: bool,
    clock: Arc<dyn Clock>,
}

/// Builder for [`ContactAdapter`].
#[derive(Debug, Default)]
pub struct ContactAdapterBuilder {
    state: Option<Characteristic<u8>>,
    times_opened: Option<Characteristic<u32>>,
    last_activation: Option<Characteristic<u32>>,
    repeat_on_tick: bool,
    clock: Option<Arc<dyn Clock>>,
}

impl ContactAdapterBuilder {
    /// Contact state (0 closed, 1 open). Required.
    #[must_use]
    pub fn state(mut self, state: Characteristic<u8>) -> Self {
        self.state = Some(state);
        self
    }

    /// Open counter. Required.
    #[must_use]
    pub fn times_opened(mut self, times_opened: Characteristic<u32>) -> Self {
        self.times_opened = Some(times_opened);
        self
    }

    /// Seconds since the first history entry at the last opening. Required.
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
    pub fn build(self) -> Result<ContactAdapter> {
        Ok(ContactAdapter {
            history: HistoryService::new(SensorKind::Contact),
            state: require(self.state, "contact state")?,
            times_opened: require(self.times_opened, "times opened")?,
            last_activation: require(self.last_activation, "last activation")?,
            repeat_on_tick: self.repeat_on_tick,
            clock: self.clock.unwrap_or_else(default_clock),
        })
    }
}

impl ContactAdapter {
    /// Create a builder.
    pub fn builder() -> ContactAdapterBuilder {
        ContactAdapterBuilder::default()
    }

    fn append_status(&mut self, status: u8) {
        self.history
            .add_entry(Entry::sample(self.clock.now(), Sample::Status { status }));
    }
}

impl SensorAdapter for ContactAdapter {
    fn history(&self) -> &HistoryService {
        &self.history
    }

    fn history_mut(&mut self) -> &mut HistoryService {
        &mut self.history
    }

    fn on_tick(&mut self) {
        if self.repeat_on_tick {
            self.append_status(self.state.get());
        }
    }

    fn on_change(&mut self, change: Change) {
        let Change::Status(status) = change else {
            return;
        };
        self.append_status(status);
        let now = self.clock.now();
        let activation = now.saturating_sub(self.history.store().initial_time());
        self.last_activation.set(activation);
        if status == CONTACT_OPEN {
            let opened = self.times_opened.get().wrapping_add(1);
            self.times_opened.set(opened);
            debug!("Contact opened ({} times)", opened);
        }
    }

    fn changes(&self) -> BoxStream<'static, Change> {
        self.state.changes().map(Change::Status).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::Error;

    const T0: u32 = 1_700_000_000;

    struct Fixture {
        adapter: ContactAdapter,
        state: Characteristic<u8>,
        times_opened: Characteristic<u32>,
        last_activation: Characteristic<u32>,
        clock: ManualClock,
    }

    fn fixture(repeat_on_tick: bool) -> Fixture {
        let state = Characteristic::new(0);
        let times_opened = Characteristic::new(0);
        let last_activation = Characteristic::new(0);
        let clock = ManualClock::new(T0);
        let adapter = ContactAdapter::builder()
            .state(state.clone())
            .times_opened(times_opened.clone())
            .last_activation(last_activation.clone())
            .repeat_on_tick(repeat_on_tick)
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();
        Fixture {
            adapter,
            state,
            times_opened,
            last_activation,
            clock,
        }
    }

    #[test]
    fn test_open_records_entry_and_counters() {
        let mut f = fixture(false);
        f.adapter.on_change(Change::Status(0));

        f.clock.advance(300);
        f.state.set(1);
        f.adapter.on_change(Change::Status(1));

        assert_eq!(f.times_opened.get(), 1);
        assert_eq!(f.last_activation.get(), 300);

        let store = f.adapter.history().store();
        let newest = store.entry_at(store.last_index()).unwrap();
        assert_eq!(newest.time, T0 + 300);
        assert_eq!(newest.as_sample(), Some(&Sample::Status { status: 1 }));
        assert_eq!(f.adapter.kind().fingerprint(), &[0x01, 0x06, 0x01]);
    }

    #[test]
    fn test_close_does_not_count() {
        let mut f = fixture(false);
        f.adapter.on_change(Change::Status(1));
        f.adapter.on_change(Change::Status(0));
        assert_eq!(f.times_opened.get(), 1);
        assert_eq!(f.adapter.history().store().used_count(), 3);
    }

    #[test]
    fn test_change_records_delivered_value_not_current() {
        let mut f = fixture(false);
        // already closed again by the time the opening is handled
        f.state.set(1);
        f.state.set(0);
        f.adapter.on_change(Change::Status(1));
        f.adapter.on_change(Change::Status(0));

        assert_eq!(f.times_opened.get(), 1);
        let store = f.adapter.history().store();
        let statuses: Vec<_> = (2..=store.last_index())
            .map(|i| store.entry_at(i).unwrap().as_sample().copied())
            .collect();
        assert_eq!(
            statuses,
            vec![
                Some(Sample::Status { status: 1 }),
                Some(Sample::Status { status: 0 })
            ]
        );
    }

    #[test]
    fn test_tick_repeats_only_when_enabled() {
        let mut quiet = fixture(false);
        quiet.adapter.on_tick();
        assert_eq!(quiet.adapter.history().store().used_count(), 0);

        let mut repeating = fixture(true);
        repeating.adapter.on_tick();
        repeating.adapter.on_tick();
        assert_eq!(repeating.adapter.history().store().used_count(), 3);
        assert_eq!(repeating.times_opened.get(), 0);
    }

    #[test]
    fn test_reset_total_unsupported() {
        let mut f = fixture(false);
        assert!(matches!(
            f.adapter.reset_total(),
            Err(Error::Unsupported {
                kind: SensorKind::Contact,
                ..
            })
        ));
    }

    #[test]
    fn test_build_requires_state() {
        let err = ContactAdapter::builder()
            .times_opened(Characteristic::new(0))
            .last_activation(Characteristic::new(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("contact state"));
    }
}
