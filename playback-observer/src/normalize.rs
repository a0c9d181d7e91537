//! Per-signal normalization rules
//!
//! Turns raw engine signals into typed [`Delivery`] values. Runs only on the
//! delivery thread, so its state needs no locking; the failure latch is the
//! one piece shared with the snapshot accessors.

use parking_lot::Mutex;
use playback_engine::{
    ItemId, ItemStatus, MediaError, MediaTime, Notification, NotificationKind, ObservedProperty,
    PlaybackEngine, PlayerStatus, PropertyChange, PropertyValue, TimeRange,
};

use crate::callbacks::Delivery;

/// Error domain used when the engine fails without reporting an error
pub const SYNTHESIZED_ERROR_DOMAIN: &str = "avplay.observer";

/// A raw signal as captured on an engine thread
#[derive(Debug, Clone)]
pub(crate) enum Signal {
    Property {
        property: ObservedProperty,
        change: PropertyChange,
    },
    Notification(Notification),
    Time(MediaTime),
}

/// Errors captured at the moment a status transitioned to `Failed`
///
/// Accessors fall back to these when the engine reports no error while the
/// status still reads as failed, so a failure is queryable from inside the
/// status callback.
#[derive(Debug, Default)]
pub(crate) struct FailureLatch {
    player: Mutex<Option<MediaError>>,
    item: Mutex<Option<(ItemId, MediaError)>>,
}

impl FailureLatch {
    pub(crate) fn player(&self) -> Option<MediaError> {
        self.player.lock().clone()
    }

    pub(crate) fn item(&self, id: &ItemId) -> Option<MediaError> {
        self.item
            .lock()
            .as_ref()
            .filter(|(latched, _)| latched == id)
            .map(|(_, error)| error.clone())
    }

    fn latch_player(&self, error: MediaError) {
        *self.player.lock() = Some(error);
    }

    fn clear_player(&self) {
        self.player.lock().take();
    }

    fn latch_item(&self, id: ItemId, error: MediaError) {
        *self.item.lock() = Some((id, error));
    }

    fn clear_item(&self) {
        self.item.lock().take();
    }
}

/// Stand-in error for a `subject` ("player" or "item") that failed silently
fn synthesized_failure(subject: &str) -> MediaError {
    MediaError::new(
        SYNTHESIZED_ERROR_DOMAIN,
        -1,
        format!("{} failed without reporting an error", subject),
    )
}

/// Last delivered rate, for dedup
#[derive(Debug, Default)]
struct RateDedup {
    last: Option<f32>,
}

impl RateDedup {
    /// Record `rate` and report whether it should be delivered
    fn admit(&mut self, rate: f32) -> bool {
        let unchanged = match self.last {
            Some(last) => last == rate || (last.is_nan() && rate.is_nan()),
            None => false,
        };
        if unchanged {
            return false;
        }
        self.last = Some(rate);
        true
    }
}

/// Stateful signal normalizer owned by the delivery thread
pub(crate) struct Normalizer {
    rate: RateDedup,
    last_item_status: Option<(ItemId, ItemStatus)>,
    auto_resume: bool,
}

impl Normalizer {
    pub(crate) fn new(auto_resume: bool) -> Self {
        Self {
            rate: RateDedup::default(),
            last_item_status: None,
            auto_resume,
        }
    }

    /// Apply the rules for `signal`; `None` means the delivery is suppressed
    pub(crate) fn normalize(
        &mut self,
        signal: Signal,
        engine: &dyn PlaybackEngine,
        latch: &FailureLatch,
    ) -> Option<Delivery> {
        match signal {
            Signal::Property { property, change } => {
                self.property(property, change, engine, latch)
            }
            Signal::Notification(notification) => notification_delivery(notification, engine),
            Signal::Time(time) => Some(time_delivery(time, engine)),
        }
    }

    fn property(
        &mut self,
        property: ObservedProperty,
        change: PropertyChange,
        engine: &dyn PlaybackEngine,
        latch: &FailureLatch,
    ) -> Option<Delivery> {
        match property {
            ObservedProperty::ItemLikelyToKeepUp => {
                let item = engine.current_item()?;
                Some(Delivery::LikelyToKeepUp(item.is_playback_likely_to_keep_up))
            }
            ObservedProperty::PlayerStatus => {
                let status = match change.new.or(change.old) {
                    Some(PropertyValue::PlayerStatus(status)) => status,
                    _ => engine.status(),
                };
                Some(player_status_delivery(status, engine, latch))
            }
            ObservedProperty::ItemStatus => match change.new {
                Some(PropertyValue::ItemStatus(status)) => self.item_status(status, engine, latch),
                _ => {
                    self.last_item_status = None;
                    None
                }
            },
            ObservedProperty::Rate => {
                let rate = match change.new {
                    Some(PropertyValue::Rate(rate)) => rate,
                    _ => engine.rate(),
                };
                let previous = match change.old {
                    Some(PropertyValue::Rate(old)) => Some(old),
                    _ => None,
                };
                if self.rate.admit(rate) {
                    tracing::debug!("Rate changed: {:?} -> {}", previous, rate);
                    Some(Delivery::Rate(rate))
                } else {
                    tracing::debug!("Rate unchanged at {}, suppressing", rate);
                    None
                }
            }
            ObservedProperty::ExternalPlaybackActive => {
                let active = match change.new {
                    Some(PropertyValue::Flag(active)) => active,
                    _ => engine.is_external_playback_active(),
                };
                Some(Delivery::ExternalPlaybackActive(active))
            }
            ObservedProperty::ItemLoadedTimeRanges => match change.new {
                Some(PropertyValue::TimeRanges(ranges)) => Some(Delivery::LoadedTimeRanges(ranges)),
                _ => None,
            },
            ObservedProperty::ItemSeekableTimeRanges => match change.new {
                Some(PropertyValue::TimeRanges(ranges)) => {
                    TimeRange::span(&ranges).map(Delivery::SeekableRange)
                }
                _ => None,
            },
        }
    }

    /// Status comes from the change record; the item error is read at delivery
    fn item_status(
        &mut self,
        status: ItemStatus,
        engine: &dyn PlaybackEngine,
        latch: &FailureLatch,
    ) -> Option<Delivery> {
        let Some(item) = engine.current_item() else {
            self.last_item_status = None;
            return None;
        };
        tracing::info!("Item status changed: {}", status.raw_value());

        match status {
            ItemStatus::Failed => {
                let error = item.error.unwrap_or_else(|| synthesized_failure("item"));
                tracing::warn!(
                    "Item status error: {}",
                    error.failure_reason.as_deref().unwrap_or(&error.description)
                );
                latch.latch_item(item.id, error);
            }
            ItemStatus::ReadyToPlay => {
                latch.clear_item();
                let entering = self.last_item_status != Some((item.id, ItemStatus::ReadyToPlay));
                if self.auto_resume && entering {
                    tracing::debug!("Item {} ready, resuming playback", item.id);
                    engine.play();
                }
            }
            ItemStatus::Unknown => latch.clear_item(),
        }

        self.last_item_status = Some((item.id, status));
        Some(Delivery::ItemStatus(status))
    }
}

fn player_status_delivery(
    status: PlayerStatus,
    engine: &dyn PlaybackEngine,
    latch: &FailureLatch,
) -> Delivery {
    tracing::info!("Player status changed: {}", status);
    if status.is_failed() {
        let error = engine.error().unwrap_or_else(|| synthesized_failure("player"));
        tracing::warn!(
            "Player status error: {}",
            error.failure_reason.as_deref().unwrap_or(&error.description)
        );
        latch.latch_player(error);
    } else {
        latch.clear_player();
    }
    Delivery::PlayerStatus(status)
}

fn notification_delivery(
    notification: Notification,
    engine: &dyn PlaybackEngine,
) -> Option<Delivery> {
    match notification.kind {
        NotificationKind::PlaybackStalled => {
            tracing::info!("Playback stalled");
            Some(Delivery::Stalled)
        }
        NotificationKind::PlayedToEnd => {
            tracing::info!("Item did play to end time");
            Some(Delivery::PlayedToEnd)
        }
        NotificationKind::FailedToPlayToEnd => {
            match &notification.error {
                Some(error) => tracing::warn!("Item did fail to play to end time: {}", error),
                None => tracing::warn!("Item did fail to play to end time"),
            }
            Some(Delivery::FailedToPlayToEnd(notification.error))
        }
        NotificationKind::NewAccessLogEntry => {
            let item = posting_item(&notification, engine)?;
            let log = engine.access_log(&item)?;
            let event = log.newest()?.clone();
            tracing::info!(
                indicated_bitrate = event.indicated_bitrate,
                indicated_average_bitrate = event.indicated_average_bitrate,
                playback_start_offset = event.playback_start_offset,
                duration_watched = event.duration_watched,
                number_of_stalls = event.number_of_stalls,
                playback_session_id = ?event.playback_session_id,
                playback_type = ?event.playback_type,
                uri = ?event.uri,
                "New access log entry"
            );
            Some(Delivery::AccessLogEvent(event))
        }
        NotificationKind::NewErrorLogEntry => {
            let item = posting_item(&notification, engine)?;
            let log = engine.error_log(&item)?;
            let event = log.newest()?.clone();
            tracing::info!(
                date = ?event.date,
                error_status_code = event.error_status_code,
                error_domain = %event.error_domain,
                error_comment = ?event.error_comment,
                playback_session_id = ?event.playback_session_id,
                uri = ?event.uri,
                "New error log entry"
            );
            Some(Delivery::ErrorLogEvent(event))
        }
    }
}

/// The item a log notification refers to, falling back to the current item
fn posting_item(notification: &Notification, engine: &dyn PlaybackEngine) -> Option<ItemId> {
    notification
        .item
        .or_else(|| engine.current_item().map(|item| item.id))
}

fn time_delivery(time: MediaTime, engine: &dyn PlaybackEngine) -> Delivery {
    match engine.current_item().and_then(|item| item.current_date) {
        Some(date) => tracing::info!("Date changed {}", date),
        None => tracing::info!("Time changed {:?}", time.seconds()),
    }
    Delivery::Time(Some(time))
}
