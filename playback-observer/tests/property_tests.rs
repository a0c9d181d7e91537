//! Property-based tests for rate dedup, likely-to-keep-up gating and
//! metadata filtering

use proptest::prelude::*;
use std::sync::Arc;

use parking_lot::Mutex;
use playback_engine::{
    CommonKey, MetadataItem, MetadataValue, SimulatedEngine, TimedMetadataGroup,
};
use playback_observer::{Callbacks, MetadataSink, ObservationService};

// ============================================================================
// Test Helpers
// ============================================================================

/// Rates drawn from a small set so that repeats are common
fn rate_strategy() -> impl Strategy<Value = f32> {
    prop_oneof![Just(0.0f32), Just(0.5f32), Just(1.0f32), Just(2.0f32)]
}

/// Raw metadata keys: every common key plus a few format-specific ones
fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (0..CommonKey::ALL.len()).prop_map(|i| CommonKey::ALL[i].as_str().to_string()),
        Just("StreamTitle".to_string()),
        Just("TIT2".to_string()),
        Just("unknown".to_string()),
    ]
}

fn value_strategy() -> impl Strategy<Value = MetadataValue> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,16}".prop_map(MetadataValue::Text),
        any::<i64>().prop_map(MetadataValue::Integer),
        any::<f64>().prop_map(MetadataValue::Float),
        proptest::collection::vec(any::<u8>(), 0..8).prop_map(MetadataValue::Data),
    ]
}

fn group_strategy() -> impl Strategy<Value = TimedMetadataGroup> {
    proptest::collection::vec((key_strategy(), value_strategy()), 0..6).prop_map(|items| {
        TimedMetadataGroup::new(
            items
                .into_iter()
                .map(|(key, value)| MetadataItem::common(key, value))
                .collect(),
        )
    })
}

/// Expected deliveries: the first value, then every value that differs from its predecessor
fn expected_rates(rates: &[f32]) -> Vec<f32> {
    rates
        .iter()
        .enumerate()
        .filter(|(i, rate)| *i == 0 || rates[i - 1] != **rate)
        .map(|(_, rate)| *rate)
        .collect()
}

// ============================================================================
// Rate dedup
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// The rate callback fires for the first observed value and then only
    /// where `rate[i] != rate[i - 1]`
    #[test]
    fn prop_rate_callback_fires_only_on_change(
        rates in proptest::collection::vec(rate_strategy(), 1..24),
    ) {
        let engine = Arc::new(SimulatedEngine::new());
        let service = ObservationService::new(&engine, Callbacks::new()).unwrap();

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&delivered);
        service.callbacks().rate_changed.set(move |rate| sink.lock().push(rate));

        for rate in &rates {
            engine.set_rate(*rate);
        }
        service.flush().unwrap();

        prop_assert_eq!(delivered.lock().clone(), expected_rates(&rates));
    }

    /// Without a current item, item-scoped watches never reach the
    /// likely-to-keep-up callback
    #[test]
    fn prop_likely_to_keep_up_silent_without_item(
        flips in proptest::collection::vec(any::<bool>(), 0..16),
    ) {
        let engine = Arc::new(SimulatedEngine::new());
        let service = ObservationService::new(&engine, Callbacks::new()).unwrap();

        let hits = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&hits);
        service
            .callbacks()
            .playback_likely_to_keep_up_changed
            .set(move |_| *counter.lock() += 1);

        for likely in flips {
            engine.set_likely_to_keep_up(likely);
            engine.unload();
        }
        service.flush().unwrap();

        prop_assert_eq!(*hits.lock(), 0);
    }
}

// ============================================================================
// Metadata filtering
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Only common-key text entries are forwarded, and the counter advances
    /// once per batch whatever the batch contains
    #[test]
    fn prop_metadata_filter_and_counter(
        batches in proptest::collection::vec(
            proptest::collection::vec(group_strategy(), 0..4),
            0..6,
        ),
    ) {
        let sink = MetadataSink::new();
        let forwarded = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&forwarded);
        sink.on_entry.set(move |entry| recorder.lock().push(entry));

        let mut expected = Vec::new();
        for (update, batch) in batches.iter().enumerate() {
            for item in batch.iter().flat_map(|group| group.items.iter()) {
                if let (Some(key), Some(text)) = (item.common_key, item.value.as_text()) {
                    expected.push((key, text.to_string(), update as u64));
                }
            }
            sink.receive(batch);
        }

        let actual: Vec<_> = forwarded
            .lock()
            .iter()
            .map(|entry| (entry.key, entry.value.clone(), entry.update))
            .collect();

        prop_assert_eq!(actual, expected);
        prop_assert_eq!(sink.update_count(), batches.len() as u64);
    }
}
