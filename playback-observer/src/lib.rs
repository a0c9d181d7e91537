//! Playback Observation Service
//!
//! Attaches to a [`PlaybackEngine`](playback_engine::PlaybackEngine), merges its
//! property watches, lifecycle notifications and periodic time sampler into a
//! single delivery thread, and hands a consumer one coherent stream of typed
//! callbacks.
//!
//! # Architecture
//!
//! ```text
//! engine threads ──▶ handlers (enqueue only) ──▶ mpsc ──▶ delivery thread
//!                                                          │
//!                                                          ├── normalize (dedup, guards,
//!                                                          │   auto-resume, failure latch)
//!                                                          └── Callbacks slot ──▶ consumer
//! ```
//!
//! - Callbacks never run concurrently and never on an engine thread
//! - Absent engine state (no item, empty log, no error) suppresses delivery
//! - Teardown releases every subscription exactly once; after
//!   [`ObservationService::shutdown`] returns no callback runs
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use playback_engine::{PlayerStatus, SimulatedEngine};
//! use playback_observer::{Callbacks, ObservationService};
//!
//! let engine = Arc::new(SimulatedEngine::new());
//! engine.set_status(PlayerStatus::ReadyToPlay);
//!
//! let callbacks = Callbacks::new();
//! callbacks.player_status_changed.set(|status| println!("player: {}", status));
//! callbacks.rate_changed.set(|rate| println!("rate: {}", rate));
//!
//! let service = ObservationService::new(&engine, callbacks).unwrap();
//! assert_eq!(service.subscription_count(), 13);
//! ```

pub mod callbacks;
pub mod config;
mod dispatcher;
pub mod error;
pub mod logging;
pub mod metadata;
mod normalize;
pub mod service;
pub mod snapshot;
pub mod subscription;

pub use callbacks::{Callbacks, Handler, Slot};
pub use config::ObserverConfig;
pub use error::{ObserverError, Result};
pub use metadata::{MetadataEntry, MetadataSink};
pub use normalize::SYNTHESIZED_ERROR_DOMAIN;
pub use service::{ObservationService, SUBSCRIPTION_COUNT};
pub use snapshot::{PlaybackSnapshot, SnapshotReader};
pub use subscription::{SignalKind, Subscription};

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::callbacks::{Callbacks, Slot};
    pub use crate::config::ObserverConfig;
    pub use crate::error::ObserverError;
    pub use crate::metadata::{MetadataEntry, MetadataSink};
    pub use crate::service::ObservationService;
    pub use crate::snapshot::{PlaybackSnapshot, SnapshotReader};
}
