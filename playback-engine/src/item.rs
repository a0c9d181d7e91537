//! Media item identity and point-in-time item state

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MediaError;
use crate::status::ItemStatus;
use crate::time::{MediaTime, TimeRange};

/// Identity of a media item loaded into an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Allocate a fresh, random item id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// By-value read of the current item's observable state
///
/// Returned by [`PlaybackEngine::current_item`](crate::PlaybackEngine::current_item);
/// it is never cached by the engine contract, each call reads fresh state.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemState {
    pub id: ItemId,
    pub url: String,
    pub status: ItemStatus,
    pub duration: MediaTime,
    pub current_time: MediaTime,
    /// Wall-clock date of the current position for date-addressable streams
    pub current_date: Option<DateTime<Utc>>,
    pub is_playback_likely_to_keep_up: bool,
    pub is_playback_buffer_empty: bool,
    pub error: Option<MediaError>,
    pub loaded_time_ranges: Vec<TimeRange>,
    pub seekable_time_ranges: Vec<TimeRange>,
}

impl ItemState {
    /// Fresh, not-yet-loaded state for an item at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            url: url.into(),
            status: ItemStatus::Unknown,
            duration: MediaTime::Invalid,
            current_time: MediaTime::ZERO,
            current_date: None,
            is_playback_likely_to_keep_up: false,
            is_playback_buffer_empty: true,
            error: None,
            loaded_time_ranges: Vec::new(),
            seekable_time_ranges: Vec::new(),
        }
    }
}
