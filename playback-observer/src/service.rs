//! Observation service
//!
//! Attaches to a playback engine, fans its property watches, notifications
//! and periodic sampler into the delivery context, and exposes typed callback
//! slots plus read-through snapshot accessors.
//!
//! # Lifecycle
//!
//! ```text
//! new()  ──▶ spawn delivery thread ──▶ attach 13 subscriptions ──▶ flush
//!                                            │ (any failure)
//!                                            ▼
//!                                      roll back, Err(Attach)
//!
//! shutdown() / Drop ──▶ close gate ──▶ release subscriptions ──▶ stop + join
//! ```
//!
//! After [`shutdown`](ObservationService::shutdown) returns, no callback is
//! invoked again, even if the engine still fires signals.

use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use playback_engine::{
    ItemId, MediaError, MediaTime, NotificationKind, ObserveOptions, ObservedProperty,
    PlaybackEngine, PlayerStatus,
};

use crate::callbacks::Callbacks;
use crate::config::ObserverConfig;
use crate::dispatcher::{spawn_dispatcher, Envelope, Producer, Shared};
use crate::error::{ObserverError, Result};
use crate::normalize::{FailureLatch, Normalizer, Signal};
use crate::snapshot::{PlaybackSnapshot, SnapshotReader};
use crate::subscription::{SignalKind, Subscription, SubscriptionSet};

/// Property watches attached at construction, with the options each needs
const PROPERTY_WATCHES: [(ObservedProperty, ObserveOptions); 7] = [
    (ObservedProperty::ItemLikelyToKeepUp, ObserveOptions::NONE),
    (ObservedProperty::PlayerStatus, ObserveOptions::INITIAL),
    (ObservedProperty::ItemStatus, ObserveOptions::INITIAL),
    (ObservedProperty::Rate, ObserveOptions::OLD),
    (ObservedProperty::ItemLoadedTimeRanges, ObserveOptions::NONE),
    (ObservedProperty::ItemSeekableTimeRanges, ObserveOptions::NONE),
    (ObservedProperty::ExternalPlaybackActive, ObserveOptions::NONE),
];

/// Number of subscriptions a live service holds
pub const SUBSCRIPTION_COUNT: usize = PROPERTY_WATCHES.len() + NotificationKind::ALL.len() + 1;

/// Watches a playback engine and delivers its lifecycle as typed callbacks
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use playback_engine::{ItemStatus, SimulatedEngine};
/// use playback_observer::{Callbacks, ObservationService};
///
/// let engine = Arc::new(SimulatedEngine::new());
/// let callbacks = Callbacks::new();
/// callbacks.item_status_changed.set(|status| println!("item: {}", status));
///
/// let service = ObservationService::new(&engine, callbacks).unwrap();
///
/// engine.load("https://example.com/stream.mp3");
/// engine.set_item_status(ItemStatus::ReadyToPlay);
/// service.flush().unwrap();
///
/// // Ready items are resumed automatically
/// assert_eq!(engine.resume_count(), 1);
///
/// service.shutdown();
/// ```
pub struct ObservationService {
    shared: Arc<Shared>,
    producer: Producer,
    reader: SnapshotReader,
    subscriptions: Mutex<Option<SubscriptionSet>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dispatcher: ThreadId,
    config: ObserverConfig,
}

impl ObservationService {
    /// Attach to `engine` with the default configuration
    ///
    /// The engine is held weakly; the caller keeps it alive.
    pub fn new<E>(engine: &Arc<E>, callbacks: impl Into<Arc<Callbacks>>) -> Result<Self>
    where
        E: PlaybackEngine + 'static,
    {
        Self::with_config(engine, callbacks, ObserverConfig::default())
    }

    pub fn with_config<E>(
        engine: &Arc<E>,
        callbacks: impl Into<Arc<Callbacks>>,
        config: ObserverConfig,
    ) -> Result<Self>
    where
        E: PlaybackEngine + 'static,
    {
        let weak: Weak<E> = Arc::downgrade(engine);
        Self::from_weak(weak, callbacks, config)
    }

    /// Attach through an existing weak reference
    ///
    /// Fails with [`ObserverError::EngineUnavailable`] when the engine is gone.
    pub fn from_weak(
        engine: Weak<dyn PlaybackEngine>,
        callbacks: impl Into<Arc<Callbacks>>,
        config: ObserverConfig,
    ) -> Result<Self> {
        let strong = engine.upgrade().ok_or(ObserverError::EngineUnavailable)?;

        let latch = Arc::new(FailureLatch::default());
        let shared = Arc::new(Shared {
            engine: engine.clone(),
            callbacks: callbacks.into(),
            active: AtomicBool::new(true),
            latch: Arc::clone(&latch),
        });

        let (tx, rx) = mpsc::channel();
        let producer = Producer::new(tx, Arc::clone(&shared));
        let worker = spawn_dispatcher(
            &config.thread_name,
            Arc::clone(&shared),
            Normalizer::new(config.auto_resume),
            rx,
        )
        .map_err(ObserverError::DispatcherSpawn)?;
        let dispatcher = worker.thread().id();

        let mut subscriptions = SubscriptionSet::new();
        if let Err(e) = attach(strong.as_ref(), &producer, &config, &mut subscriptions) {
            tracing::warn!("Attach failed, rolling back {} subscription(s)", subscriptions.len());
            shared.deactivate();
            subscriptions.release_all(Some(strong.as_ref()));
            producer.send(Envelope::Shutdown);
            if worker.join().is_err() {
                tracing::warn!("Delivery thread panicked during rollback");
            }
            return Err(e);
        }
        drop(strong);

        tracing::info!(
            "Observation service attached with {} subscriptions",
            subscriptions.len()
        );

        let service = Self {
            shared,
            producer,
            reader: SnapshotReader::new(engine, latch),
            subscriptions: Mutex::new(Some(subscriptions)),
            worker: Mutex::new(Some(worker)),
            dispatcher,
            config,
        };

        // Initial status fires are queued during attach; deliver them before returning
        service.flush()?;
        Ok(service)
    }

    // ========================================================================
    // Delivery control
    // ========================================================================

    /// Wait until every signal queued before this call has been delivered
    ///
    /// A no-op when called from inside a callback.
    pub fn flush(&self) -> Result<()> {
        if self.is_delivery_thread() {
            return Ok(());
        }
        if !self.shared.is_active() {
            return Err(ObserverError::DeliveryContextClosed);
        }

        let (ack_tx, ack_rx) = mpsc::channel();
        if !self.producer.send(Envelope::Flush(ack_tx)) {
            return Err(ObserverError::DeliveryContextClosed);
        }
        ack_rx.recv().map_err(|_| ObserverError::DeliveryContextClosed)
    }

    /// Detach from the engine and stop the delivery context
    ///
    /// Idempotent. Safe to call from inside a callback, in which case the
    /// delivery thread exits once that callback returns.
    pub fn shutdown(&self) {
        if !self.shared.deactivate() {
            return;
        }
        tracing::debug!("Shutting down observation service");

        let subscriptions = self.subscriptions.lock().take();
        if let Some(subscriptions) = subscriptions {
            let engine = self.shared.engine.upgrade();
            let failures = subscriptions.release_all(engine.as_deref());
            if failures > 0 {
                tracing::warn!("{} subscription(s) failed to release", failures);
            }
        }

        self.producer.send(Envelope::Shutdown);

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if self.is_delivery_thread() {
                tracing::debug!("Shutdown requested from a callback, not joining delivery thread");
            } else if worker.join().is_err() {
                tracing::warn!("Delivery thread panicked");
            }
        }

        tracing::info!("Observation service stopped");
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    fn is_delivery_thread(&self) -> bool {
        thread::current().id() == self.dispatcher
    }

    // ========================================================================
    // Callbacks and introspection
    // ========================================================================

    /// Callback slots; may be changed at any time from any thread
    pub fn callbacks(&self) -> &Callbacks {
        &self.shared.callbacks
    }

    /// A cloneable accessor handle that can be captured inside callbacks
    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .as_ref()
            .map(|set| set.len())
            .unwrap_or(0)
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions
            .lock()
            .as_ref()
            .map(|set| set.entries().to_vec())
            .unwrap_or_default()
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    // ========================================================================
    // Snapshot accessors
    // ========================================================================

    pub fn has_current_item(&self) -> bool {
        self.reader.has_current_item()
    }

    pub fn current_item_id(&self) -> Option<ItemId> {
        self.reader.current_item_id()
    }

    pub fn current_duration(&self) -> Option<MediaTime> {
        self.reader.current_duration()
    }

    pub fn current_date(&self) -> Option<DateTime<Utc>> {
        self.reader.current_date()
    }

    pub fn current_time(&self) -> Option<MediaTime> {
        self.reader.current_time()
    }

    pub fn is_playback_likely_to_keep_up(&self) -> bool {
        self.reader.is_playback_likely_to_keep_up()
    }

    pub fn is_playback_buffer_empty(&self) -> bool {
        self.reader.is_playback_buffer_empty()
    }

    pub fn item_error(&self) -> Option<MediaError> {
        self.reader.item_error()
    }

    pub fn player_error(&self) -> Option<MediaError> {
        self.reader.player_error()
    }

    pub fn player_status(&self) -> PlayerStatus {
        self.reader.player_status()
    }

    pub fn rate(&self) -> f32 {
        self.reader.rate()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.reader.snapshot()
    }
}

impl Drop for ObservationService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ObservationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationService")
            .field("active", &self.is_active())
            .field("subscriptions", &self.subscription_count())
            .field("config", &self.config)
            .finish()
    }
}

/// Register every signal source, recording each handle in `subscriptions`
fn attach(
    engine: &dyn PlaybackEngine,
    producer: &Producer,
    config: &ObserverConfig,
    subscriptions: &mut SubscriptionSet,
) -> Result<()> {
    for (property, options) in PROPERTY_WATCHES {
        let signal = SignalKind::Property(property);
        let producer = producer.clone();
        let id = engine
            .observe(
                property,
                options,
                Box::new(move |change| producer.signal(Signal::Property { property, change })),
            )
            .map_err(|source| ObserverError::Attach { signal, source })?;
        subscriptions.push(signal, id);
    }

    for kind in NotificationKind::ALL {
        let signal = SignalKind::Notification(kind);
        let producer = producer.clone();
        let id = engine
            .subscribe(
                kind,
                Box::new(move |notification| producer.signal(Signal::Notification(notification))),
            )
            .map_err(|source| ObserverError::Attach { signal, source })?;
        subscriptions.push(signal, id);
    }

    let producer = producer.clone();
    let id = engine
        .add_periodic_time_observer(
            config.time_interval,
            Box::new(move |time| producer.signal(Signal::Time(time))),
        )
        .map_err(|source| ObserverError::Attach {
            signal: SignalKind::TimeSampler,
            source,
        })?;
    subscriptions.push(SignalKind::TimeSampler, id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use playback_engine::SimulatedEngine;

    #[test]
    fn test_subscription_count_constant() {
        assert_eq!(SUBSCRIPTION_COUNT, 13);
    }

    #[test]
    fn test_one_subscription_per_signal_kind() {
        let engine = Arc::new(SimulatedEngine::new());
        let service = ObservationService::new(&engine, Callbacks::new()).unwrap();

        let subscriptions = service.subscriptions();
        let kinds: std::collections::HashSet<_> = subscriptions.iter().map(|s| s.kind).collect();
        assert_eq!(kinds.len(), subscriptions.len());
        assert_eq!(subscriptions.len(), SUBSCRIPTION_COUNT);

        for property in ObservedProperty::ALL {
            assert_eq!(engine.watch_count(property), 1);
        }
        for kind in NotificationKind::ALL {
            assert_eq!(engine.notification_watch_count(kind), 1);
        }
        assert_eq!(engine.periodic_observer_count(), 1);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let engine = Arc::new(SimulatedEngine::new());
        let service = ObservationService::new(&engine, Callbacks::new()).unwrap();

        service.shutdown();
        service.shutdown();

        assert!(!service.is_active());
        assert_eq!(service.subscription_count(), 0);
        assert_eq!(engine.active_subscriptions(), 0);
        assert!(matches!(service.flush(), Err(ObserverError::DeliveryContextClosed)));
    }
}
