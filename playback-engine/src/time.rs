//! Rational media time and time ranges
//!
//! Engine positions and durations are carried as a rational `value / timescale`
//! pair so that sample-accurate positions survive round trips. Live streams
//! report an indefinite duration, and unloaded items report an invalid time.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A point (or length) on a media timeline
///
/// Two numeric times compare by value, not by representation:
/// `MediaTime::new(1, 1) == MediaTime::new(600, 600)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MediaTime {
    /// No meaningful time (nothing loaded yet, or a failed computation)
    Invalid,
    /// Unbounded length, used for live streams
    Indefinite,
    /// `value / timescale` seconds
    Numeric { value: i64, timescale: u32 },
}

impl MediaTime {
    /// Zero seconds
    pub const ZERO: MediaTime = MediaTime::Numeric {
        value: 0,
        timescale: 1,
    };

    /// Create a numeric time; a zero timescale yields `Invalid`
    pub fn new(value: i64, timescale: u32) -> Self {
        if timescale == 0 {
            return MediaTime::Invalid;
        }
        MediaTime::Numeric { value, timescale }
    }

    /// Create a time from floating-point seconds at the given timescale
    pub fn from_seconds(seconds: f64, timescale: u32) -> Self {
        if !seconds.is_finite() || timescale == 0 {
            return MediaTime::Invalid;
        }
        MediaTime::Numeric {
            value: (seconds * f64::from(timescale)).round() as i64,
            timescale,
        }
    }

    /// Create a millisecond-resolution time from a `Duration`
    pub fn from_duration(duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        MediaTime::Numeric {
            value: millis,
            timescale: 1000,
        }
    }

    /// Seconds as a float, `None` for invalid or indefinite times
    pub fn seconds(&self) -> Option<f64> {
        match *self {
            MediaTime::Numeric { value, timescale } => Some(value as f64 / f64::from(timescale)),
            _ => None,
        }
    }

    /// Convert to a `Duration`; negative and non-numeric times yield `None`
    pub fn as_duration(&self) -> Option<Duration> {
        self.seconds()
            .filter(|s| *s >= 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, MediaTime::Numeric { .. })
    }

    pub fn is_indefinite(&self) -> bool {
        matches!(self, MediaTime::Indefinite)
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, MediaTime::Invalid)
    }

    /// Re-express a numeric time at another timescale, rounding to nearest
    pub fn rescale(self, timescale: u32) -> Self {
        match self {
            MediaTime::Numeric { value, timescale: from } if timescale != 0 => {
                let scaled = i128::from(value) * i128::from(timescale);
                let from = i128::from(from);
                // Round half away from zero
                let rounded = if scaled >= 0 {
                    (scaled + from / 2) / from
                } else {
                    (scaled - from / 2) / from
                };
                MediaTime::Numeric {
                    value: i64::try_from(rounded).unwrap_or(if rounded > 0 { i64::MAX } else { i64::MIN }),
                    timescale,
                }
            }
            MediaTime::Numeric { .. } => MediaTime::Invalid,
            other => other,
        }
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        MediaTime::Invalid
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: MediaTime) -> MediaTime {
        match (self, rhs) {
            (MediaTime::Invalid, _) | (_, MediaTime::Invalid) => MediaTime::Invalid,
            (MediaTime::Indefinite, _) | (_, MediaTime::Indefinite) => MediaTime::Indefinite,
            (
                MediaTime::Numeric { timescale: a, .. },
                MediaTime::Numeric { timescale: b, .. },
            ) => {
                let timescale = a.max(b);
                match (self.rescale(timescale), rhs.rescale(timescale)) {
                    (
                        MediaTime::Numeric { value: x, .. },
                        MediaTime::Numeric { value: y, .. },
                    ) => MediaTime::Numeric {
                        value: x.saturating_add(y),
                        timescale,
                    },
                    _ => MediaTime::Invalid,
                }
            }
        }
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (MediaTime::Invalid, MediaTime::Invalid) => Some(Ordering::Equal),
            (MediaTime::Invalid, _) | (_, MediaTime::Invalid) => None,
            (MediaTime::Indefinite, MediaTime::Indefinite) => Some(Ordering::Equal),
            (MediaTime::Indefinite, _) => Some(Ordering::Greater),
            (_, MediaTime::Indefinite) => Some(Ordering::Less),
            (
                MediaTime::Numeric { value: a, timescale: ta },
                MediaTime::Numeric { value: b, timescale: tb },
            ) => {
                let lhs = i128::from(a) * i128::from(tb);
                let rhs = i128::from(b) * i128::from(ta);
                Some(lhs.cmp(&rhs))
            }
        }
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.seconds() {
            Some(seconds) => write!(f, "{:.3}s", seconds),
            None if self.is_indefinite() => write!(f, "indefinite"),
            None => write!(f, "invalid"),
        }
    }
}

/// A contiguous span of the media timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: MediaTime,
    pub duration: MediaTime,
}

impl TimeRange {
    pub fn new(start: MediaTime, duration: MediaTime) -> Self {
        Self { start, duration }
    }

    /// Build a range from its start and end points
    pub fn from_bounds(start: MediaTime, end: MediaTime) -> Self {
        let duration = match (start, end) {
            (MediaTime::Numeric { timescale: a, .. }, MediaTime::Numeric { timescale: b, .. }) => {
                let timescale = a.max(b);
                match (start.rescale(timescale), end.rescale(timescale)) {
                    (
                        MediaTime::Numeric { value: s, .. },
                        MediaTime::Numeric { value: e, .. },
                    ) => MediaTime::new(e.saturating_sub(s).max(0), timescale),
                    _ => MediaTime::Invalid,
                }
            }
            (MediaTime::Numeric { .. }, MediaTime::Indefinite) => MediaTime::Indefinite,
            _ => MediaTime::Invalid,
        };
        Self { start, duration }
    }

    pub fn end(&self) -> MediaTime {
        self.start + self.duration
    }

    pub fn contains(&self, time: MediaTime) -> bool {
        time >= self.start && time < self.end()
    }

    /// Smallest range covering every range in `ranges`
    ///
    /// Returns `None` for an empty slice.
    pub fn span(ranges: &[TimeRange]) -> Option<TimeRange> {
        let first = ranges.first()?;
        let (start, end) = ranges.iter().skip(1).fold(
            (first.start, first.end()),
            |(start, end), range| {
                let start = if range.start < start { range.start } else { start };
                let range_end = range.end();
                let end = if range_end > end { range_end } else { end };
                (start, end)
            },
        );
        Some(TimeRange::from_bounds(start, end))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_representation() {
        assert_eq!(MediaTime::new(1, 1), MediaTime::new(600, 600));
        assert_eq!(MediaTime::from_seconds(2.5, 1000), MediaTime::new(5, 2));
        assert_ne!(MediaTime::new(1, 1), MediaTime::new(2, 1));
    }

    #[test]
    fn test_zero_timescale_is_invalid() {
        assert!(!MediaTime::new(10, 0).is_valid());
        assert!(!MediaTime::from_seconds(f64::NAN, 600).is_valid());
    }

    #[test]
    fn test_ordering() {
        assert!(MediaTime::new(1, 2) < MediaTime::new(1, 1));
        assert!(MediaTime::Indefinite > MediaTime::new(i64::MAX, 1));
        assert_eq!(MediaTime::Invalid.partial_cmp(&MediaTime::ZERO), None);
    }

    #[test]
    fn test_add_across_timescales() {
        let sum = MediaTime::new(1, 2) + MediaTime::new(250, 1000);
        assert_eq!(sum, MediaTime::from_seconds(0.75, 1000));
        assert!((MediaTime::Indefinite + MediaTime::ZERO).is_indefinite());
        assert!(!(MediaTime::Invalid + MediaTime::ZERO).is_valid());
    }

    #[test]
    fn test_duration_conversion() {
        let time = MediaTime::from_duration(Duration::from_millis(1500));
        assert_eq!(time.seconds(), Some(1.5));
        assert_eq!(time.as_duration(), Some(Duration::from_millis(1500)));
        assert_eq!(MediaTime::new(-1, 1).as_duration(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(MediaTime::new(3, 2).to_string(), "1.500s");
        assert_eq!(MediaTime::Indefinite.to_string(), "indefinite");
        assert_eq!(MediaTime::Invalid.to_string(), "invalid");
    }

    #[test]
    fn test_range_span() {
        let ranges = [
            TimeRange::new(MediaTime::new(10, 1), MediaTime::new(5, 1)),
            TimeRange::new(MediaTime::new(2, 1), MediaTime::new(3, 1)),
        ];
        let span = TimeRange::span(&ranges).unwrap();
        assert_eq!(span.start, MediaTime::new(2, 1));
        assert_eq!(span.end(), MediaTime::new(15, 1));
        assert!(TimeRange::span(&[]).is_none());
    }

    #[test]
    fn test_range_contains() {
        let range = TimeRange::from_bounds(MediaTime::new(1, 1), MediaTime::new(3, 1));
        assert!(range.contains(MediaTime::new(2, 1)));
        assert!(!range.contains(MediaTime::new(3, 1)));
    }

    proptest::proptest! {
        #[test]
        fn prop_span_covers_every_range(
            bounds in proptest::collection::vec((0i64..10_000, 0i64..10_000), 1..12),
        ) {
            let ranges: Vec<TimeRange> = bounds
                .iter()
                .map(|(start, length)| {
                    TimeRange::new(MediaTime::new(*start, 1000), MediaTime::new(*length, 1000))
                })
                .collect();
            let span = TimeRange::span(&ranges).unwrap();

            for range in &ranges {
                proptest::prop_assert!(span.start <= range.start);
                proptest::prop_assert!(span.end() >= range.end());
            }
        }
    }
}
