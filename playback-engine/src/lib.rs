//! Playback Engine Contract
//!
//! The types and trait an observer needs to watch a media playback engine,
//! plus an in-memory [`SimulatedEngine`] that implements the contract.
//!
//! # Architecture
//!
//! ```text
//! PlaybackEngine
//!     │
//!     ├── pull accessors: status, rate, error, current_item, access_log, error_log
//!     │
//!     ├── observe()                      → PropertyChange { kind, old, new }
//!     ├── subscribe()                    → Notification { kind, item, error }
//!     ├── add_periodic_time_observer()   → MediaTime
//!     ├── add_metadata_output()          → &[TimedMetadataGroup]
//!     │
//!     └── play() / pause()
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use playback_engine::{ItemStatus, ObserveOptions, ObservedProperty, PlaybackEngine, SimulatedEngine};
//!
//! let engine = SimulatedEngine::new();
//! let id = engine
//!     .observe(
//!         ObservedProperty::ItemStatus,
//!         ObserveOptions::INITIAL,
//!         Box::new(|change| println!("item status: {:?}", change.new)),
//!     )
//!     .unwrap();
//!
//! engine.load("https://example.com/live.m3u8");
//! engine.set_item_status(ItemStatus::ReadyToPlay);
//! engine.remove(id).unwrap();
//! ```

pub mod engine;
pub mod error;
pub mod item;
pub mod log;
pub mod metadata;
pub mod simulated;
pub mod status;
pub mod time;

pub use engine::{
    ChangeKind, Notification, NotificationHandler, NotificationKind, ObserveOptions,
    ObservedProperty, PlaybackEngine, PropertyChange, PropertyHandler, PropertyValue,
    SubscriptionId, TimeHandler,
};
pub use error::{EngineError, MediaError, Result};
pub use item::{ItemId, ItemState};
pub use log::{AccessLog, AccessLogEvent, ErrorLog, ErrorLogEvent, ItemLog};
pub use metadata::{
    CommonKey, MetadataItem, MetadataOutput, MetadataValue, TimedMetadataGroup, UnknownCommonKey,
};
pub use simulated::SimulatedEngine;
pub use status::{ItemStatus, PlayerStatus};
pub use time::{MediaTime, TimeRange};

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::engine::{
        Notification, NotificationKind, ObserveOptions, ObservedProperty, PlaybackEngine,
        PropertyChange, SubscriptionId,
    };
    pub use crate::error::{EngineError, MediaError};
    pub use crate::item::{ItemId, ItemState};
    pub use crate::log::{AccessLogEvent, ErrorLogEvent};
    pub use crate::metadata::{CommonKey, MetadataItem, MetadataOutput, MetadataValue, TimedMetadataGroup};
    pub use crate::simulated::SimulatedEngine;
    pub use crate::status::{ItemStatus, PlayerStatus};
    pub use crate::time::{MediaTime, TimeRange};
}
