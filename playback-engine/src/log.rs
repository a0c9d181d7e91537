//! Access and error log entries recorded by the engine for an item

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed access-log entry (a playback session segment)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccessLogEvent {
    pub uri: Option<String>,
    pub server_address: Option<String>,
    pub playback_session_id: Option<String>,
    pub playback_start_date: Option<DateTime<Utc>>,
    /// Offset into the stream, in seconds, where the session started
    pub playback_start_offset: f64,
    /// e.g. "LIVE", "VOD", "FILE"
    pub playback_type: Option<String>,
    /// Seconds of media watched in this session
    pub duration_watched: f64,
    pub number_of_stalls: i64,
    pub number_of_bytes_transferred: i64,
    pub number_of_media_requests: i64,
    pub indicated_bitrate: f64,
    pub indicated_average_bitrate: f64,
    pub observed_bitrate: f64,
    pub number_of_dropped_video_frames: i64,
}

/// One error-log entry recorded while loading or playing an item
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorLogEvent {
    pub date: Option<DateTime<Utc>>,
    pub uri: Option<String>,
    pub server_address: Option<String>,
    pub playback_session_id: Option<String>,
    pub error_status_code: i64,
    pub error_domain: String,
    pub error_comment: Option<String>,
}

/// Ordered collection of log entries, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLog<E> {
    pub events: Vec<E>,
}

impl<E> ItemLog<E> {
    pub fn new(events: Vec<E>) -> Self {
        Self { events }
    }

    /// The most recently appended entry
    pub fn newest(&self) -> Option<&E> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<E> Default for ItemLog<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

pub type AccessLog = ItemLog<AccessLogEvent>;
pub type ErrorLog = ItemLog<ErrorLogEvent>;
