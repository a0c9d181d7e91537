//! Error types for the observation service

use playback_engine::EngineError;
use thiserror::Error;

use crate::subscription::SignalKind;

/// Result type for observer operations
pub type Result<T> = std::result::Result<T, ObserverError>;

/// Errors raised while constructing or driving an observation service
///
/// Engine-reported playback failures are not errors here; they flow through
/// the status callbacks and the error accessors as ordinary data.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// The engine reference no longer points at a live engine
    #[error("Playback engine is not available")]
    EngineUnavailable,

    /// The engine rejected one of the registrations made during construction
    #[error("Failed to attach {signal} observer: {source}")]
    Attach {
        signal: SignalKind,
        #[source]
        source: EngineError,
    },

    /// The delivery thread could not be started
    #[error("Failed to spawn delivery thread: {0}")]
    DispatcherSpawn(#[source] std::io::Error),

    /// The delivery thread is gone
    #[error("Delivery context is closed")]
    DeliveryContextClosed,
}
