//! The playback engine contract
//!
//! An engine owns the media item, its status and buffering indicators, and
//! the playback rate. Observers attach through three kinds of registration:
//!
//! - property watches ([`PlaybackEngine::observe`]) that fire with an
//!   old/new [`PropertyChange`] record, optionally with an initial synthetic fire
//! - named notifications ([`PlaybackEngine::subscribe`]) for discrete events
//! - a periodic time sampler ([`PlaybackEngine::add_periodic_time_observer`])
//!
//! Handlers may be invoked from any engine thread and must not block.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, Result};
use crate::item::{ItemId, ItemState};
use crate::log::{AccessLog, ErrorLog};
use crate::metadata::MetadataOutput;
use crate::status::{ItemStatus, PlayerStatus};
use crate::time::{MediaTime, TimeRange};

/// Opaque handle for one registration against an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Properties an observer can watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservedProperty {
    PlayerStatus,
    Rate,
    ExternalPlaybackActive,
    ItemStatus,
    ItemLikelyToKeepUp,
    ItemLoadedTimeRanges,
    ItemSeekableTimeRanges,
}

impl ObservedProperty {
    pub const ALL: [ObservedProperty; 7] = [
        ObservedProperty::PlayerStatus,
        ObservedProperty::Rate,
        ObservedProperty::ExternalPlaybackActive,
        ObservedProperty::ItemStatus,
        ObservedProperty::ItemLikelyToKeepUp,
        ObservedProperty::ItemLoadedTimeRanges,
        ObservedProperty::ItemSeekableTimeRanges,
    ];

    /// Key path style name, used in logs
    pub fn key_path(&self) -> &'static str {
        match self {
            ObservedProperty::PlayerStatus => "status",
            ObservedProperty::Rate => "rate",
            ObservedProperty::ExternalPlaybackActive => "isExternalPlaybackActive",
            ObservedProperty::ItemStatus => "currentItem.status",
            ObservedProperty::ItemLikelyToKeepUp => "currentItem.isPlaybackLikelyToKeepUp",
            ObservedProperty::ItemLoadedTimeRanges => "currentItem.loadedTimeRanges",
            ObservedProperty::ItemSeekableTimeRanges => "currentItem.seekableTimeRanges",
        }
    }
}

impl fmt::Display for ObservedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_path())
    }
}

/// What a property watch carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    /// Fire once synchronously during registration with the current value
    pub initial: bool,
    /// Include the previous value in change records
    pub old: bool,
}

impl ObserveOptions {
    pub const NONE: ObserveOptions = ObserveOptions {
        initial: false,
        old: false,
    };
    pub const INITIAL: ObserveOptions = ObserveOptions {
        initial: true,
        old: false,
    };
    pub const OLD: ObserveOptions = ObserveOptions {
        initial: false,
        old: true,
    };
}

/// A property value as seen in a change record
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    PlayerStatus(PlayerStatus),
    ItemStatus(ItemStatus),
    Rate(f32),
    Flag(bool),
    TimeRanges(Vec<TimeRange>),
}

/// Whether a change record is the synthetic registration fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Initial,
    Setting,
}

/// Old/new pair delivered to property handlers
///
/// `old` is only populated when the watch asked for it, and `None` for values
/// on an absent item.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub kind: ChangeKind,
    pub old: Option<PropertyValue>,
    pub new: Option<PropertyValue>,
}

impl PropertyChange {
    pub fn is_initial(&self) -> bool {
        self.kind == ChangeKind::Initial
    }
}

/// Discrete lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    PlaybackStalled,
    PlayedToEnd,
    FailedToPlayToEnd,
    NewAccessLogEntry,
    NewErrorLogEntry,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 5] = [
        NotificationKind::PlaybackStalled,
        NotificationKind::PlayedToEnd,
        NotificationKind::FailedToPlayToEnd,
        NotificationKind::NewAccessLogEntry,
        NotificationKind::NewErrorLogEntry,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NotificationKind::PlaybackStalled => "PlaybackStalled",
            NotificationKind::PlayedToEnd => "DidPlayToEndTime",
            NotificationKind::FailedToPlayToEnd => "FailedToPlayToEndTime",
            NotificationKind::NewAccessLogEntry => "NewAccessLogEntry",
            NotificationKind::NewErrorLogEntry => "NewErrorLogEntry",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A posted notification
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    /// The item that posted the notification, when item-scoped
    pub item: Option<ItemId>,
    /// Payload of `FailedToPlayToEnd`
    pub error: Option<MediaError>,
}

impl Notification {
    pub fn new(kind: NotificationKind, item: Option<ItemId>) -> Self {
        Self {
            kind,
            item,
            error: None,
        }
    }

    pub fn with_error(mut self, error: MediaError) -> Self {
        self.error = Some(error);
        self
    }
}

pub type PropertyHandler = Box<dyn Fn(PropertyChange) + Send + Sync>;
pub type NotificationHandler = Box<dyn Fn(Notification) + Send + Sync>;
pub type TimeHandler = Box<dyn Fn(MediaTime) + Send + Sync>;

/// Contract every playback engine implements
///
/// Pull accessors read the engine's already-cached state and never block on
/// I/O. Registration calls return a [`SubscriptionId`] that must be passed to
/// [`remove`](PlaybackEngine::remove) to detach.
pub trait PlaybackEngine: Send + Sync {
    // ------------------------------------------------------------------
    // Pull accessors
    // ------------------------------------------------------------------

    fn status(&self) -> PlayerStatus;

    fn error(&self) -> Option<MediaError>;

    fn rate(&self) -> f32;

    fn is_external_playback_active(&self) -> bool;

    /// Fresh read of the current item, `None` when nothing is loaded
    fn current_item(&self) -> Option<ItemState>;

    fn access_log(&self, item: &ItemId) -> Option<AccessLog>;

    fn error_log(&self, item: &ItemId) -> Option<ErrorLog>;

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    fn observe(
        &self,
        property: ObservedProperty,
        options: ObserveOptions,
        handler: PropertyHandler,
    ) -> Result<SubscriptionId>;

    fn subscribe(
        &self,
        notification: NotificationKind,
        handler: NotificationHandler,
    ) -> Result<SubscriptionId>;

    fn add_periodic_time_observer(
        &self,
        interval: MediaTime,
        handler: TimeHandler,
    ) -> Result<SubscriptionId>;

    fn add_metadata_output(&self, output: Arc<dyn MetadataOutput>) -> Result<SubscriptionId>;

    /// Detach a registration of any kind
    fn remove(&self, id: SubscriptionId) -> Result<()>;

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Resume playback at the default rate
    fn play(&self);

    fn pause(&self);
}
