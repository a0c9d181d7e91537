//! Owned subscription handles
//!
//! The service keeps one [`Subscription`] per attached signal source and
//! releases the whole set exactly once. `release_all` consumes the set, so a
//! second release cannot be expressed.

use std::fmt;

use playback_engine::{NotificationKind, ObservedProperty, PlaybackEngine, SubscriptionId};

/// The kind of signal source a subscription is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Property(ObservedProperty),
    Notification(NotificationKind),
    TimeSampler,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Property(property) => write!(f, "property {}", property),
            SignalKind::Notification(kind) => write!(f, "notification {}", kind),
            SignalKind::TimeSampler => f.write_str("periodic time sampler"),
        }
    }
}

/// One live registration against the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub kind: SignalKind,
    pub id: SubscriptionId,
}

/// The service-owned list of live subscriptions
#[derive(Debug, Default)]
pub(crate) struct SubscriptionSet {
    entries: Vec<Subscription>,
}

impl SubscriptionSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, kind: SignalKind, id: SubscriptionId) {
        self.entries.push(Subscription { kind, id });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &[Subscription] {
        &self.entries
    }

    /// Detach every subscription from `engine`
    ///
    /// Returns the number of detach calls that failed. Failures are logged and
    /// never retried.
    pub(crate) fn release_all(self, engine: Option<&dyn PlaybackEngine>) -> usize {
        let Some(engine) = engine else {
            tracing::debug!(
                "Engine already gone, dropping {} subscription(s)",
                self.entries.len()
            );
            return 0;
        };

        let mut failures = 0;
        for subscription in self.entries {
            match engine.remove(subscription.id) {
                Ok(()) => {
                    tracing::debug!("Released {} ({})", subscription.kind, subscription.id);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        "Failed to release {} ({}): {}",
                        subscription.kind,
                        subscription.id,
                        e
                    );
                }
            }
        }
        failures
    }
}
