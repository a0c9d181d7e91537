//! In-memory engine implementing the playback contract
//!
//! `SimulatedEngine` keeps all state in memory and fires handlers
//! synchronously on whichever thread performed the mutation, so every thread
//! that scripts the engine acts as an independent producer. It backs the
//! test suites and the `avplay` driver.
//!
//! Mutations follow the property-observation model: every setter fires the
//! watches of the properties it touches, even when the value did not change.
//!
//! Detach contract: [`remove`](PlaybackEngine::remove) returns once the
//! handler is unregistered. A fire that already took its handler snapshot may
//! still complete after `remove` returns.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::engine::{
    ChangeKind, Notification, NotificationHandler, NotificationKind, ObserveOptions,
    ObservedProperty, PlaybackEngine, PropertyChange, PropertyHandler, PropertyValue,
    SubscriptionId, TimeHandler,
};
use crate::error::{EngineError, MediaError, Result};
use crate::item::{ItemId, ItemState};
use crate::log::{AccessLog, AccessLogEvent, ErrorLog, ErrorLogEvent};
use crate::metadata::{MetadataOutput, TimedMetadataGroup};
use crate::status::{ItemStatus, PlayerStatus};
use crate::time::{MediaTime, TimeRange};

const ITEM_PROPERTIES: [ObservedProperty; 4] = [
    ObservedProperty::ItemStatus,
    ObservedProperty::ItemLikelyToKeepUp,
    ObservedProperty::ItemLoadedTimeRanges,
    ObservedProperty::ItemSeekableTimeRanges,
];

type SharedPropertyHandler = Arc<dyn Fn(PropertyChange) + Send + Sync>;
type SharedNotificationHandler = Arc<dyn Fn(Notification) + Send + Sync>;
type SharedTimeHandler = Arc<dyn Fn(MediaTime) + Send + Sync>;

struct PropertyWatch {
    property: ObservedProperty,
    options: ObserveOptions,
    handler: SharedPropertyHandler,
}

struct NotificationWatch {
    kind: NotificationKind,
    handler: SharedNotificationHandler,
}

struct PeriodicObserver {
    interval: MediaTime,
    next_fire: MediaTime,
    handler: SharedTimeHandler,
}

#[derive(Default)]
struct Registry {
    properties: BTreeMap<SubscriptionId, PropertyWatch>,
    notifications: BTreeMap<SubscriptionId, NotificationWatch>,
    timers: BTreeMap<SubscriptionId, PeriodicObserver>,
    metadata: BTreeMap<SubscriptionId, Arc<dyn MetadataOutput>>,
}

impl Registry {
    fn len(&self) -> usize {
        self.properties.len() + self.notifications.len() + self.timers.len() + self.metadata.len()
    }
}

struct EngineState {
    status: PlayerStatus,
    error: Option<MediaError>,
    rate: f32,
    muted: bool,
    external_playback_active: bool,
    item: Option<ItemState>,
    access_logs: HashMap<ItemId, AccessLog>,
    error_logs: HashMap<ItemId, ErrorLog>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            status: PlayerStatus::Unknown,
            error: None,
            rate: 0.0,
            muted: false,
            external_playback_active: false,
            item: None,
            access_logs: HashMap::new(),
            error_logs: HashMap::new(),
        }
    }

    fn value_of(&self, property: ObservedProperty) -> Option<PropertyValue> {
        match property {
            ObservedProperty::PlayerStatus => Some(PropertyValue::PlayerStatus(self.status)),
            ObservedProperty::Rate => Some(PropertyValue::Rate(self.rate)),
            ObservedProperty::ExternalPlaybackActive => {
                Some(PropertyValue::Flag(self.external_playback_active))
            }
            ObservedProperty::ItemStatus => {
                self.item.as_ref().map(|i| PropertyValue::ItemStatus(i.status))
            }
            ObservedProperty::ItemLikelyToKeepUp => self
                .item
                .as_ref()
                .map(|i| PropertyValue::Flag(i.is_playback_likely_to_keep_up)),
            ObservedProperty::ItemLoadedTimeRanges => self
                .item
                .as_ref()
                .map(|i| PropertyValue::TimeRanges(i.loaded_time_ranges.clone())),
            ObservedProperty::ItemSeekableTimeRanges => self
                .item
                .as_ref()
                .map(|i| PropertyValue::TimeRanges(i.seekable_time_ranges.clone())),
        }
    }
}

/// An engine that lives entirely in memory
pub struct SimulatedEngine {
    state: Mutex<EngineState>,
    registry: Mutex<Registry>,
    next_id: AtomicU64,
    resume_count: AtomicUsize,
    invalidated: AtomicBool,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::new()),
            registry: Mutex::new(Registry::default()),
            next_id: AtomicU64::new(1),
            resume_count: AtomicUsize::new(0),
            invalidated: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Scripting - player
    // ========================================================================

    pub fn set_status(&self, status: PlayerStatus) {
        self.mutate(&[ObservedProperty::PlayerStatus], |state| {
            state.status = status;
            if !status.is_failed() {
                state.error = None;
            }
        });
    }

    /// Record an engine error without touching the status
    pub fn set_error(&self, error: Option<MediaError>) {
        self.mutate(&[], |state| state.error = error);
    }

    /// Move the engine into the failed state; the error is set first
    pub fn fail(&self, error: MediaError) {
        self.mutate(&[ObservedProperty::PlayerStatus], |state| {
            state.error = Some(error);
            state.status = PlayerStatus::Failed;
        });
    }

    pub fn set_rate(&self, rate: f32) {
        self.mutate(&[ObservedProperty::Rate], |state| state.rate = rate);
    }

    pub fn set_external_playback_active(&self, active: bool) {
        self.mutate(&[ObservedProperty::ExternalPlaybackActive], |state| {
            state.external_playback_active = active;
        });
    }

    pub fn set_muted(&self, muted: bool) {
        self.state.lock().muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    // ========================================================================
    // Scripting - current item
    // ========================================================================

    /// Replace the current item with a fresh one for `url`
    pub fn load(&self, url: impl Into<String>) -> ItemId {
        let item = ItemState::new(url);
        let id = item.id;
        self.mutate(&ITEM_PROPERTIES, |state| state.item = Some(item));
        tracing::debug!("Loaded item {}", id);
        id
    }

    /// Remove the current item
    pub fn unload(&self) {
        self.mutate(&ITEM_PROPERTIES, |state| state.item = None);
    }

    pub fn set_item_status(&self, status: ItemStatus) {
        self.mutate_item(&[ObservedProperty::ItemStatus], |item| {
            item.status = status;
            if !status.is_failed() {
                item.error = None;
            }
        });
    }

    /// Fail the current item; the item error is set first
    pub fn fail_item(&self, error: MediaError) {
        self.mutate_item(&[ObservedProperty::ItemStatus], |item| {
            item.error = Some(error);
            item.status = ItemStatus::Failed;
        });
    }

    pub fn set_likely_to_keep_up(&self, likely: bool) {
        self.mutate_item(&[ObservedProperty::ItemLikelyToKeepUp], |item| {
            item.is_playback_likely_to_keep_up = likely;
        });
    }

    pub fn set_buffer_empty(&self, empty: bool) {
        self.mutate_item(&[], |item| item.is_playback_buffer_empty = empty);
    }

    pub fn set_loaded_time_ranges(&self, ranges: Vec<TimeRange>) {
        self.mutate_item(&[ObservedProperty::ItemLoadedTimeRanges], |item| {
            item.loaded_time_ranges = ranges;
        });
    }

    pub fn set_seekable_time_ranges(&self, ranges: Vec<TimeRange>) {
        self.mutate_item(&[ObservedProperty::ItemSeekableTimeRanges], |item| {
            item.seekable_time_ranges = ranges;
        });
    }

    pub fn set_duration(&self, duration: MediaTime) {
        self.mutate_item(&[], |item| item.duration = duration);
    }

    pub fn set_current_date(&self, date: Option<DateTime<Utc>>) {
        self.mutate_item(&[], |item| item.current_date = date);
    }

    /// Append an access-log entry to the current item and post the notification
    ///
    /// Returns `false` when no item is loaded.
    pub fn append_access_log(&self, event: AccessLogEvent) -> bool {
        let item = {
            let mut state = self.state.lock();
            let Some(id) = state.item.as_ref().map(|i| i.id) else {
                return false;
            };
            state.access_logs.entry(id).or_default().events.push(event);
            id
        };
        self.post(Notification::new(NotificationKind::NewAccessLogEntry, Some(item)));
        true
    }

    /// Append an error-log entry to the current item and post the notification
    ///
    /// Returns `false` when no item is loaded.
    pub fn append_error_log(&self, event: ErrorLogEvent) -> bool {
        let item = {
            let mut state = self.state.lock();
            let Some(id) = state.item.as_ref().map(|i| i.id) else {
                return false;
            };
            state.error_logs.entry(id).or_default().events.push(event);
            id
        };
        self.post(Notification::new(NotificationKind::NewErrorLogEntry, Some(item)));
        true
    }

    /// Post the stalled notification for the current item
    pub fn stall(&self) {
        let item = self.current_item_id();
        self.post(Notification::new(NotificationKind::PlaybackStalled, item));
    }

    /// Deliver a notification to every handler registered for its kind
    pub fn post(&self, notification: Notification) {
        let handlers: Vec<SharedNotificationHandler> = self
            .registry
            .lock()
            .notifications
            .values()
            .filter(|watch| watch.kind == notification.kind)
            .map(|watch| Arc::clone(&watch.handler))
            .collect();

        tracing::debug!(
            "Posting {} to {} handler(s)",
            notification.kind,
            handlers.len()
        );

        for handler in handlers {
            handler(notification.clone());
        }
    }

    /// Push one batch of timed metadata to every metadata output
    pub fn emit_metadata(&self, groups: &[TimedMetadataGroup]) {
        let outputs: Vec<Arc<dyn MetadataOutput>> =
            self.registry.lock().metadata.values().cloned().collect();
        for output in outputs {
            output.timed_metadata(groups);
        }
    }

    /// Move the playback clock forward by `delta` of wall time
    ///
    /// The clock only moves while the rate is non-zero and the item is ready.
    /// Periodic observers whose interval boundary was crossed fire once with
    /// the new position. Reaching a finite duration stops playback and posts
    /// the played-to-end notification.
    pub fn advance(&self, delta: MediaTime) {
        let Some(delta_seconds) = delta.seconds() else {
            return;
        };

        let outcome = {
            let mut state = self.state.lock();
            let rate = state.rate;
            let Some(item) = state.item.as_mut() else {
                return;
            };
            if rate == 0.0 || !item.status.is_ready() {
                return;
            }

            let step_seconds = delta_seconds * f64::from(rate);
            let mut now = item.current_time + MediaTime::from_seconds(step_seconds, 1000);
            if let Some(date) = item.current_date.as_mut() {
                *date += chrono::Duration::milliseconds((step_seconds * 1000.0) as i64);
            }

            let mut ended = false;
            if item.duration.is_numeric() && now >= item.duration {
                now = item.duration;
                ended = true;
            }
            item.current_time = now;
            let id = item.id;

            let old_rate = if ended {
                let old = state.rate;
                state.rate = 0.0;
                Some(old)
            } else {
                None
            };
            (now, id, old_rate)
        };

        let (now, item, stopped_from) = outcome;
        self.fire_timers(now);

        if let Some(old_rate) = stopped_from {
            self.fire_property(
                ObservedProperty::Rate,
                Some(PropertyValue::Rate(old_rate)),
                Some(PropertyValue::Rate(0.0)),
            );
            self.post(Notification::new(NotificationKind::PlayedToEnd, Some(item)));
        }
    }

    /// Jump the current item to `time` and fire periodic observers
    pub fn seek(&self, time: MediaTime) {
        let now = {
            let mut state = self.state.lock();
            let Some(item) = state.item.as_mut() else {
                return;
            };
            item.current_time = time;
            time
        };
        self.fire_timers(now);
    }

    /// Reject every future registration
    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of `play()` commands received
    pub fn resume_count(&self) -> usize {
        self.resume_count.load(Ordering::SeqCst)
    }

    /// Number of live registrations of any kind
    pub fn active_subscriptions(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn watch_count(&self, property: ObservedProperty) -> usize {
        self.registry
            .lock()
            .properties
            .values()
            .filter(|watch| watch.property == property)
            .count()
    }

    pub fn notification_watch_count(&self, kind: NotificationKind) -> usize {
        self.registry
            .lock()
            .notifications
            .values()
            .filter(|watch| watch.kind == kind)
            .count()
    }

    pub fn periodic_observer_count(&self) -> usize {
        self.registry.lock().timers.len()
    }

    pub fn current_item_id(&self) -> Option<ItemId> {
        self.state.lock().item.as_ref().map(|i| i.id)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn allocate_id(&self) -> Result<SubscriptionId> {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(EngineError::Invalidated);
        }
        Ok(SubscriptionId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    /// Apply `f` under the state lock, then fire watches for `properties`
    fn mutate<R>(&self, properties: &[ObservedProperty], f: impl FnOnce(&mut EngineState) -> R) -> R {
        let (changes, result) = {
            let mut state = self.state.lock();
            let before: Vec<_> = properties.iter().map(|p| state.value_of(*p)).collect();
            let result = f(&mut *state);
            let changes: Vec<_> = properties
                .iter()
                .zip(before)
                .map(|(property, old)| (*property, old, state.value_of(*property)))
                .collect();
            (changes, result)
        };

        for (property, old, new) in changes {
            self.fire_property(property, old, new);
        }
        result
    }

    /// Like `mutate`, but a no-op when no item is loaded
    fn mutate_item(&self, properties: &[ObservedProperty], f: impl FnOnce(&mut ItemState)) {
        if self.state.lock().item.is_none() {
            tracing::debug!("Ignoring item mutation: no current item");
            return;
        }
        self.mutate(properties, |state| {
            if let Some(item) = state.item.as_mut() {
                f(item);
            }
        });
    }

    fn fire_property(
        &self,
        property: ObservedProperty,
        old: Option<PropertyValue>,
        new: Option<PropertyValue>,
    ) {
        let watches: Vec<(ObserveOptions, SharedPropertyHandler)> = self
            .registry
            .lock()
            .properties
            .values()
            .filter(|watch| watch.property == property)
            .map(|watch| (watch.options, Arc::clone(&watch.handler)))
            .collect();

        for (options, handler) in watches {
            handler(PropertyChange {
                kind: ChangeKind::Setting,
                old: if options.old { old.clone() } else { None },
                new: new.clone(),
            });
        }
    }

    fn fire_timers(&self, now: MediaTime) {
        let due: Vec<SharedTimeHandler> = {
            let mut registry = self.registry.lock();
            registry
                .timers
                .values_mut()
                .filter(|timer| now >= timer.next_fire)
                .map(|timer| {
                    timer.next_fire = now + timer.interval;
                    Arc::clone(&timer.handler)
                })
                .collect()
        };

        for handler in due {
            handler(now);
        }
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn status(&self) -> PlayerStatus {
        self.state.lock().status
    }

    fn error(&self) -> Option<MediaError> {
        self.state.lock().error.clone()
    }

    fn rate(&self) -> f32 {
        self.state.lock().rate
    }

    fn is_external_playback_active(&self) -> bool {
        self.state.lock().external_playback_active
    }

    fn current_item(&self) -> Option<ItemState> {
        self.state.lock().item.clone()
    }

    fn access_log(&self, item: &ItemId) -> Option<AccessLog> {
        self.state.lock().access_logs.get(item).cloned()
    }

    fn error_log(&self, item: &ItemId) -> Option<ErrorLog> {
        self.state.lock().error_logs.get(item).cloned()
    }

    fn observe(
        &self,
        property: ObservedProperty,
        options: ObserveOptions,
        handler: PropertyHandler,
    ) -> Result<SubscriptionId> {
        let id = self.allocate_id()?;
        let handler: SharedPropertyHandler = Arc::from(handler);

        self.registry.lock().properties.insert(
            id,
            PropertyWatch {
                property,
                options,
                handler: Arc::clone(&handler),
            },
        );
        tracing::debug!("Registered watch {} on {}", id, property);

        if options.initial {
            let current = self.state.lock().value_of(property);
            handler(PropertyChange {
                kind: ChangeKind::Initial,
                old: None,
                new: current,
            });
        }

        Ok(id)
    }

    fn subscribe(
        &self,
        notification: NotificationKind,
        handler: NotificationHandler,
    ) -> Result<SubscriptionId> {
        let id = self.allocate_id()?;
        self.registry.lock().notifications.insert(
            id,
            NotificationWatch {
                kind: notification,
                handler: Arc::from(handler),
            },
        );
        tracing::debug!("Registered notification {} for {}", id, notification);
        Ok(id)
    }

    fn add_periodic_time_observer(
        &self,
        interval: MediaTime,
        handler: TimeHandler,
    ) -> Result<SubscriptionId> {
        if !interval.is_numeric() || interval <= MediaTime::ZERO {
            return Err(EngineError::UnsupportedInterval(interval));
        }
        let id = self.allocate_id()?;
        let start = self
            .state
            .lock()
            .item
            .as_ref()
            .map(|i| i.current_time)
            .unwrap_or(MediaTime::ZERO);

        self.registry.lock().timers.insert(
            id,
            PeriodicObserver {
                interval,
                next_fire: start + interval,
                handler: Arc::from(handler),
            },
        );
        tracing::debug!("Registered periodic observer {} every {}", id, interval);
        Ok(id)
    }

    fn add_metadata_output(&self, output: Arc<dyn MetadataOutput>) -> Result<SubscriptionId> {
        let id = self.allocate_id()?;
        self.registry.lock().metadata.insert(id, output);
        Ok(id)
    }

    fn remove(&self, id: SubscriptionId) -> Result<()> {
        let mut registry = self.registry.lock();
        let removed = registry.properties.remove(&id).is_some()
            || registry.notifications.remove(&id).is_some()
            || registry.timers.remove(&id).is_some()
            || registry.metadata.remove(&id).is_some();

        if removed {
            tracing::debug!("Removed registration {}", id);
            Ok(())
        } else {
            Err(EngineError::UnknownSubscription(id))
        }
    }

    fn play(&self) {
        self.resume_count.fetch_add(1, Ordering::SeqCst);
        self.set_rate(1.0);
    }

    fn pause(&self) {
        self.set_rate(0.0);
    }
}
