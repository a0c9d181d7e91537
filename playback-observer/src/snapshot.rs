//! Read-through snapshot accessors
//!
//! Nothing here is cached: every accessor reads the engine at call time and
//! degrades to absence (or `false`) once the engine is gone.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use playback_engine::{ItemId, ItemState, MediaError, MediaTime, PlaybackEngine, PlayerStatus};
use serde::Serialize;

use crate::normalize::FailureLatch;

/// Point-in-time projection of engine state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub item_id: Option<ItemId>,
    pub duration: Option<MediaTime>,
    pub current_time: Option<MediaTime>,
    pub current_date: Option<DateTime<Utc>>,
    pub is_playback_likely_to_keep_up: bool,
    pub is_playback_buffer_empty: bool,
    pub error: Option<MediaError>,
    pub player_status: PlayerStatus,
    pub rate: f32,
}

/// Cloneable accessor handle, safe to capture inside callbacks
#[derive(Clone)]
pub struct SnapshotReader {
    engine: Weak<dyn PlaybackEngine>,
    latch: Arc<FailureLatch>,
}

impl SnapshotReader {
    pub(crate) fn new(engine: Weak<dyn PlaybackEngine>, latch: Arc<FailureLatch>) -> Self {
        Self { engine, latch }
    }

    fn item(&self) -> Option<ItemState> {
        self.engine.upgrade()?.current_item()
    }

    pub fn has_current_item(&self) -> bool {
        self.item().is_some()
    }

    pub fn current_item_id(&self) -> Option<ItemId> {
        self.item().map(|item| item.id)
    }

    pub fn current_duration(&self) -> Option<MediaTime> {
        self.item().map(|item| item.duration)
    }

    /// Wall-clock date of the current position, for date-addressable streams
    pub fn current_date(&self) -> Option<DateTime<Utc>> {
        self.item().and_then(|item| item.current_date)
    }

    pub fn current_time(&self) -> Option<MediaTime> {
        self.item().map(|item| item.current_time)
    }

    pub fn is_playback_likely_to_keep_up(&self) -> bool {
        self.item()
            .map(|item| item.is_playback_likely_to_keep_up)
            .unwrap_or(false)
    }

    pub fn is_playback_buffer_empty(&self) -> bool {
        self.item()
            .map(|item| item.is_playback_buffer_empty)
            .unwrap_or(false)
    }

    /// The current item's error, or the one captured when it failed
    ///
    /// The captured error is only reported while the item still reads as failed.
    pub fn item_error(&self) -> Option<MediaError> {
        let item = self.item()?;
        self.item_error_of(&item)
    }

    /// The engine's error, or the one captured when it failed
    ///
    /// The captured error is only reported while the engine still reads as failed.
    pub fn player_error(&self) -> Option<MediaError> {
        let engine = self.engine.upgrade()?;
        engine.error().or_else(|| {
            if engine.status().is_failed() {
                self.latch.player()
            } else {
                None
            }
        })
    }

    pub fn player_status(&self) -> PlayerStatus {
        self.engine
            .upgrade()
            .map(|engine| engine.status())
            .unwrap_or_default()
    }

    pub fn rate(&self) -> f32 {
        self.engine.upgrade().map(|engine| engine.rate()).unwrap_or(0.0)
    }

    /// Read every accessor from one consistent item read
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let engine = self.engine.upgrade();
        let item = engine.as_ref().and_then(|engine| engine.current_item());

        PlaybackSnapshot {
            item_id: item.as_ref().map(|item| item.id),
            duration: item.as_ref().map(|item| item.duration),
            current_time: item.as_ref().map(|item| item.current_time),
            current_date: item.as_ref().and_then(|item| item.current_date),
            is_playback_likely_to_keep_up: item
                .as_ref()
                .map(|item| item.is_playback_likely_to_keep_up)
                .unwrap_or(false),
            is_playback_buffer_empty: item
                .as_ref()
                .map(|item| item.is_playback_buffer_empty)
                .unwrap_or(false),
            error: item.as_ref().and_then(|item| self.item_error_of(item)),
            player_status: engine
                .as_ref()
                .map(|engine| engine.status())
                .unwrap_or_default(),
            rate: engine.as_ref().map(|engine| engine.rate()).unwrap_or(0.0),
        }
    }

    fn item_error_of(&self, item: &ItemState) -> Option<MediaError> {
        item.error.clone().or_else(|| {
            if item.status.is_failed() {
                self.latch.item(&item.id)
            } else {
                None
            }
        })
    }
}

impl std::fmt::Debug for SnapshotReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotReader")
            .field("engine_alive", &(self.engine.strong_count() > 0))
            .finish()
    }
}
