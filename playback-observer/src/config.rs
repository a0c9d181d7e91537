//! Observation service configuration

use std::time::Duration;

use playback_engine::MediaTime;

/// Configuration for an [`ObservationService`](crate::ObservationService)
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use playback_observer::ObserverConfig;
///
/// let config = ObserverConfig::default()
///     .with_time_interval(Duration::from_millis(500))
///     .with_auto_resume(false);
///
/// assert!(!config.auto_resume);
/// assert_eq!(config.thread_name, "avplay-delivery");
/// ```
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Granularity of the periodic time sampler
    pub time_interval: MediaTime,

    /// Issue a resume command when the current item becomes ready
    pub auto_resume: bool,

    /// Name of the delivery thread
    pub thread_name: String,
}

impl ObserverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_interval(mut self, interval: Duration) -> Self {
        self.time_interval = MediaTime::from_duration(interval);
        self
    }

    /// Use an engine-native interval as-is
    pub fn with_media_time_interval(mut self, interval: MediaTime) -> Self {
        self.time_interval = interval;
        self
    }

    pub fn with_auto_resume(mut self, enabled: bool) -> Self {
        self.auto_resume = enabled;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            time_interval: MediaTime::new(1, 1),
            auto_resume: true,
            thread_name: "avplay-delivery".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval_is_one_second() {
        let config = ObserverConfig::default();
        assert_eq!(config.time_interval, MediaTime::new(1000, 1000));
        assert!(config.auto_resume);
    }

    #[test]
    fn test_builder_methods() {
        let config = ObserverConfig::new()
            .with_time_interval(Duration::from_millis(250))
            .with_thread_name("test-delivery");
        assert_eq!(config.time_interval, MediaTime::new(1, 4));
        assert_eq!(config.thread_name, "test-delivery");
    }
}
