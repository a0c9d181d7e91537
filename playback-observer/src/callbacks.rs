//! Consumer callback slots
//!
//! Each slot holds at most one handler. Slots can be set, replaced, or cleared
//! from any thread at any time; the delivery context clones the handler out of
//! the slot right before invoking it, so a slot cleared between a signal and
//! its delivery is simply skipped.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use playback_engine::{
    AccessLogEvent, ErrorLogEvent, ItemStatus, MediaError, MediaTime, PlayerStatus, TimeRange,
};

/// A shared, invocation-only reference to a consumer handler
pub type Handler<A> = Arc<dyn Fn(A) + Send + Sync>;

/// A replaceable, nullable callback slot
///
/// Zero-argument callbacks use `Slot<()>` and are set with `|_| ...`.
///
/// # Example
///
/// ```rust
/// use playback_observer::Slot;
///
/// let slot: Slot<f32> = Slot::new();
/// assert!(!slot.is_set());
///
/// slot.set(|rate| println!("rate is now {}", rate));
/// assert!(slot.is_set());
///
/// slot.clear();
/// assert!(!slot.is_set());
/// ```
pub struct Slot<A> {
    handler: RwLock<Option<Handler<A>>>,
}

impl<A> Slot<A> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            handler: RwLock::new(None),
        }
    }

    /// Install `handler`, replacing any previous one
    pub fn set<F>(&self, handler: F)
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        *self.handler.write() = Some(Arc::new(handler));
    }

    /// Swap the handler, returning the previous one
    pub fn replace(&self, handler: Option<Handler<A>>) -> Option<Handler<A>> {
        std::mem::replace(&mut *self.handler.write(), handler)
    }

    /// Remove the handler, returning whether one was installed
    pub fn clear(&self) -> bool {
        self.handler.write().take().is_some()
    }

    pub fn is_set(&self) -> bool {
        self.handler.read().is_some()
    }

    pub(crate) fn current(&self) -> Option<Handler<A>> {
        self.handler.read().clone()
    }

    /// Invoke the installed handler, if any, with no lock held
    pub(crate) fn call(&self, value: A) -> bool {
        match self.current() {
            Some(handler) => {
                handler(value);
                true
            }
            None => false,
        }
    }

    /// Like `call`, but only while `gate` is still open
    pub(crate) fn call_if(&self, value: A, gate: &AtomicBool) -> bool {
        let Some(handler) = self.current() else {
            return false;
        };
        if !gate.load(Ordering::Acquire) {
            return false;
        }
        handler(value);
        true
    }
}

impl<A> Default for Slot<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Slot<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("is_set", &self.is_set()).finish()
    }
}

/// The full set of playback callbacks exposed to a consumer
///
/// Populate slots before handing the set to
/// [`ObservationService::new`](crate::ObservationService::new) to receive the
/// initial status deliveries, or later through
/// [`ObservationService::callbacks`](crate::ObservationService::callbacks).
#[derive(Debug, Default)]
pub struct Callbacks {
    pub loaded_time_ranges_changed: Slot<Vec<TimeRange>>,
    pub seekable_range_changed: Slot<TimeRange>,
    pub item_played_to_end: Slot<()>,
    pub item_failed_to_play_to_end: Slot<Option<MediaError>>,
    pub item_status_changed: Slot<ItemStatus>,
    pub item_new_access_log_event: Slot<AccessLogEvent>,
    pub item_new_error_log_event: Slot<ErrorLogEvent>,
    pub time_changed: Slot<Option<MediaTime>>,
    pub rate_changed: Slot<f32>,
    pub playback_stalled: Slot<()>,
    pub external_playback_active_changed: Slot<bool>,
    pub player_status_changed: Slot<PlayerStatus>,
    pub playback_likely_to_keep_up_changed: Slot<bool>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detach every handler
    pub fn clear_all(&self) {
        self.loaded_time_ranges_changed.clear();
        self.seekable_range_changed.clear();
        self.item_played_to_end.clear();
        self.item_failed_to_play_to_end.clear();
        self.item_status_changed.clear();
        self.item_new_access_log_event.clear();
        self.item_new_error_log_event.clear();
        self.time_changed.clear();
        self.rate_changed.clear();
        self.playback_stalled.clear();
        self.external_playback_active_changed.clear();
        self.player_status_changed.clear();
        self.playback_likely_to_keep_up_changed.clear();
    }

    /// Route a normalized delivery to its slot while `gate` is open
    ///
    /// Returns whether a handler ran.
    pub(crate) fn deliver(&self, delivery: Delivery, gate: &AtomicBool) -> bool {
        match delivery {
            Delivery::LoadedTimeRanges(ranges) => self.loaded_time_ranges_changed.call_if(ranges, gate),
            Delivery::SeekableRange(range) => self.seekable_range_changed.call_if(range, gate),
            Delivery::PlayedToEnd => self.item_played_to_end.call_if((), gate),
            Delivery::FailedToPlayToEnd(error) => self.item_failed_to_play_to_end.call_if(error, gate),
            Delivery::ItemStatus(status) => self.item_status_changed.call_if(status, gate),
            Delivery::AccessLogEvent(event) => self.item_new_access_log_event.call_if(event, gate),
            Delivery::ErrorLogEvent(event) => self.item_new_error_log_event.call_if(event, gate),
            Delivery::Time(time) => self.time_changed.call_if(time, gate),
            Delivery::Rate(rate) => self.rate_changed.call_if(rate, gate),
            Delivery::Stalled => self.playback_stalled.call_if((), gate),
            Delivery::ExternalPlaybackActive(active) => {
                self.external_playback_active_changed.call_if(active, gate)
            }
            Delivery::PlayerStatus(status) => self.player_status_changed.call_if(status, gate),
            Delivery::LikelyToKeepUp(likely) => {
                self.playback_likely_to_keep_up_changed.call_if(likely, gate)
            }
        }
    }
}

/// One normalized callback invocation, ready for a slot
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Delivery {
    LoadedTimeRanges(Vec<TimeRange>),
    SeekableRange(TimeRange),
    PlayedToEnd,
    FailedToPlayToEnd(Option<MediaError>),
    ItemStatus(ItemStatus),
    AccessLogEvent(AccessLogEvent),
    ErrorLogEvent(ErrorLogEvent),
    Time(Option<MediaTime>),
    Rate(f32),
    Stalled,
    ExternalPlaybackActive(bool),
    PlayerStatus(PlayerStatus),
    LikelyToKeepUp(bool),
}
