//! Live characteristic values shared between the host and adapters.
//!
//! A [`Characteristic`] is a cheaply clonable handle to one value. The host
//! writes readings into it; adapters read it, write derived values back and
//! subscribe to changes.
//!
//! The current value lives in a [`watch`] channel. Every change is also
//! published on a [`broadcast`] channel, so a subscriber that falls behind
//! still sees each intermediate value in order.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tracing::warn;

/// Changes a subscriber may fall behind by before values are dropped.
pub const CHANGE_BUFFER: usize = 64;

/// Shared, observable characteristic value.
#[derive(Debug)]
pub struct Characteristic<T> {
    value: Arc<watch::Sender<T>>,
    events: broadcast::Sender<T>,
}

impl<T> Clone for Characteristic<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            events: self.events.clone(),
        }
    }
}

impl<T> Characteristic<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a characteristic holding `initial`.
    pub fn new(initial: T) -> Self {
        let (value, _rx) = watch::channel(initial);
        let (events, _rx) = broadcast::channel(CHANGE_BUFFER);
        Self {
            value: Arc::new(value),
            events,
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Store `value`, notifying subscribers if it differs from the current one.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut published = None;
        let changed = self.value.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value.clone();
                published = Some(value);
                true
            }
        });
        if let Some(value) = published {
            // no subscribers is not an error
            let _ = self.events.send(value);
        }
        changed
    }

    /// Stream yielding every new value, in order, from the moment of the
    /// call.
    ///
    /// The current value is not replayed. A subscriber more than
    /// [`CHANGE_BUFFER`] changes behind loses the oldest ones.
    pub fn changes(&self) -> BoxStream<'static, T> {
        let rx = self.events.subscribe();
        stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(value) => return Some((value, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Change subscriber lagged, {} values dropped", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

impl<T> Default for Characteristic<T>
where
    T: Clone + Default + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_change() {
        let c = Characteristic::new(0u8);
        assert!(c.set(1));
        assert!(!c.set(1));
        assert_eq!(c.get(), 1);
    }

    #[test]
    fn test_clones_share_value() {
        let c = Characteristic::new(1.5f64);
        let other = c.clone();
        other.set(2.5);
        assert_eq!(c.get(), 2.5);
    }

    #[tokio::test]
    async fn test_changes_stream() {
        let c = Characteristic::new(0u8);
        let mut changes = c.changes();

        c.set(0);
        c.set(1);
        assert_eq!(changes.next().await, Some(1));

        c.set(0);
        assert_eq!(changes.next().await, Some(0));
    }

    #[tokio::test]
    async fn test_rapid_changes_are_all_delivered() {
        let c = Characteristic::new(0u8);
        let mut changes = c.changes();

        c.set(1);
        c.set(0);
        c.set(1);
        c.set(1);
        assert_eq!(changes.next().await, Some(1));
        assert_eq!(changes.next().await, Some(0));
        assert_eq!(changes.next().await, Some(1));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_newest_changes() {
        let c = Characteristic::new(0u32);
        let mut changes = c.changes();

        for value in 1..=(CHANGE_BUFFER as u32 + 5) {
            c.set(value);
        }
        assert_eq!(changes.next().await, Some(6));
    }
}
