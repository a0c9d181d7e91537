//! Metadata sink
//!
//! Receives timed metadata batches pushed by the engine, keeps the entries
//! that carry a recognized common key and a text value, and republishes them
//! tagged with the batch's update number.

use parking_lot::Mutex;
use playback_engine::{CommonKey, MetadataOutput, TimedMetadataGroup};
use serde::Serialize;

use crate::callbacks::Slot;

/// One surfaced metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataEntry {
    pub key: CommonKey,
    pub value: String,
    /// Update counter value of the batch that carried this entry
    pub update: u64,
}

/// Push-delegate that filters metadata batches down to text entries
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use playback_engine::{MetadataItem, MetadataValue, TimedMetadataGroup};
/// use playback_observer::MetadataSink;
///
/// let sink = Arc::new(MetadataSink::new());
/// sink.on_entry.set(|entry| println!("{} => {}", entry.key, entry.value));
///
/// let group = TimedMetadataGroup::new(vec![
///     MetadataItem::common("title", MetadataValue::Text("Song".into())),
/// ]);
/// assert_eq!(sink.receive(&[group]), 1);
/// assert_eq!(sink.update_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MetadataSink {
    update_count: Mutex<u64>,
    pub on_entry: Slot<MetadataEntry>,
}

impl MetadataSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_count(&self) -> u64 {
        *self.update_count.lock()
    }

    /// Process one batch and return how many entries were surfaced
    ///
    /// The counter advances by one per batch, including batches where
    /// nothing survives the filter.
    ///
    /// The entry handler runs after the counter lock is released, so it may
    /// read [`update_count`](Self::update_count) or feed the sink again.
    pub fn receive(&self, groups: &[TimedMetadataGroup]) -> usize {
        let mut counter = self.update_count.lock();
        let update = *counter;

        let entries: Vec<MetadataEntry> = groups
            .iter()
            .flat_map(|group| group.items.iter())
            .filter_map(|item| {
                let key = item.common_key?;
                let value = item.value.as_text()?;
                Some(MetadataEntry {
                    key,
                    value: value.to_string(),
                    update,
                })
            })
            .collect();
        *counter += 1;
        drop(counter);

        let surfaced = entries.len();
        for entry in entries {
            tracing::info!("{} Metadata Update: {} => {}", entry.update, entry.key, entry.value);
            self.on_entry.call(entry);
        }
        surfaced
    }
}

impl MetadataOutput for MetadataSink {
    fn timed_metadata(&self, groups: &[TimedMetadataGroup]) {
        self.receive(groups);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playback_engine::{MetadataItem, MetadataValue};
    use std::sync::Arc;

    #[test]
    fn test_filters_to_common_text_entries() {
        let sink = MetadataSink::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        sink.on_entry.set(move |entry| recorder.lock().push(entry));

        let group = TimedMetadataGroup::new(vec![
            MetadataItem::common("title", MetadataValue::Text("A".into())),
            MetadataItem::common("unknown", MetadataValue::Integer(42)),
            MetadataItem::common("title", MetadataValue::Text("B".into())),
        ]);

        assert_eq!(sink.receive(&[group]), 2);
        assert_eq!(sink.update_count(), 1);

        let values: Vec<_> = seen.lock().iter().map(|e| e.value.clone()).collect();
        assert_eq!(values, vec!["A", "B"]);
        assert!(seen.lock().iter().all(|e| e.update == 0));
    }

    #[test]
    fn test_common_key_with_non_text_value_dropped() {
        let sink = MetadataSink::new();
        let group = TimedMetadataGroup::new(vec![
            MetadataItem::common("artwork", MetadataValue::Data(vec![0xff, 0xd8])),
            MetadataItem::new("StreamTitle", None, MetadataValue::Text("Raw".into())),
        ]);
        assert_eq!(sink.receive(&[group]), 0);
        assert_eq!(sink.update_count(), 1);
    }

    #[test]
    fn test_entries_carry_counter_before_increment() {
        let sink = MetadataSink::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        sink.on_entry.set(move |entry: MetadataEntry| recorder.lock().push(entry.update));

        let group = TimedMetadataGroup::new(vec![MetadataItem::common(
            "artist",
            MetadataValue::Text("X".into()),
        )]);
        sink.receive(&[]);
        sink.receive(&[group.clone(), group]);

        assert_eq!(*seen.lock(), vec![1, 1]);
        assert_eq!(sink.update_count(), 2);
    }

    #[test]
    fn test_entry_handler_can_read_update_count() {
        let sink = Arc::new(MetadataSink::new());
        let counts = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&counts);
        let inner = Arc::downgrade(&sink);
        sink.on_entry.set(move |entry: MetadataEntry| {
            if let Some(sink) = inner.upgrade() {
                recorder.lock().push((entry.update, sink.update_count()));
            }
        });

        let group = TimedMetadataGroup::new(vec![MetadataItem::common(
            "title",
            MetadataValue::Text("Live".into()),
        )]);
        sink.receive(&[group.clone()]);
        sink.receive(&[group]);

        assert_eq!(*counts.lock(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_entry_handler_can_feed_the_sink_again() {
        let sink = Arc::new(MetadataSink::new());
        let inner = Arc::downgrade(&sink);
        sink.on_entry.set(move |entry: MetadataEntry| {
            if entry.update == 0 {
                if let Some(sink) = inner.upgrade() {
                    sink.receive(&[]);
                }
            }
        });

        let group = TimedMetadataGroup::new(vec![MetadataItem::common(
            "artist",
            MetadataValue::Text("X".into()),
        )]);
        assert_eq!(sink.receive(&[group]), 1);
        assert_eq!(sink.update_count(), 2);
    }
}
