//! Error types for the engine contract
//!
//! `MediaError` is data: it describes a failure the engine reports about
//! itself or an item and travels through accessors and callbacks. `EngineError`
//! is returned when a registration against the engine cannot be made.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::SubscriptionId;
use crate::time::MediaTime;

/// A failure reported by the engine for itself or for an item
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{domain} ({code}): {description}")]
pub struct MediaError {
    pub domain: String,
    pub code: i64,
    pub description: String,
    pub failure_reason: Option<String>,
}

impl MediaError {
    pub fn new(domain: impl Into<String>, code: i64, description: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            code,
            description: description.into(),
            failure_reason: None,
        }
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }
}

/// Errors returned by engine registration calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine has been torn down and accepts no new registrations
    #[error("Engine has been invalidated")]
    Invalidated,

    /// The subscription id is not (or no longer) registered
    #[error("Subscription {0} is not registered")]
    UnknownSubscription(SubscriptionId),

    /// Periodic observers need a positive numeric interval
    #[error("Unsupported periodic interval: {0}")]
    UnsupportedInterval(MediaTime),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_display() {
        let error = MediaError::new("NSURLErrorDomain", -1100, "The requested URL was not found")
            .with_failure_reason("404");
        assert_eq!(
            error.to_string(),
            "NSURLErrorDomain (-1100): The requested URL was not found"
        );
        assert_eq!(error.failure_reason.as_deref(), Some("404"));
    }

    #[test]
    fn test_engine_error_display() {
        assert_eq!(
            EngineError::UnknownSubscription(SubscriptionId::new(7)).to_string(),
            "Subscription #7 is not registered"
        );
    }
}
