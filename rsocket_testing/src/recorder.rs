//! Capture metrics emitted by a closure.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Snapshot entries as returned by [`Snapshotter::snapshot`].
pub type Entries = Vec<(
    metrics_util::CompositeKey,
    Option<::metrics::Unit>,
    Option<::metrics::SharedString>,
    DebugValue,
)>;

/// Run `f` with a thread-local debugging recorder and return what it
/// recorded.
pub fn capture_metrics<F: FnOnce()>(f: F) -> Entries {
    let recorder = DebuggingRecorder::new();
    let snapshotter: Snapshotter = recorder.snapshotter();
    ::metrics::with_local_recorder(&recorder, f);
    snapshotter.snapshot().into_vec()
}

fn matches(key: &metrics_util::CompositeKey, name: &str, labels: &[(&str, &str)]) -> bool {
    key.key().name() == name
        && labels.iter().all(|(k, v)| {
            key.key()
                .labels()
                .any(|label| label.key() == *k && label.value() == *v)
        })
}

/// Value of the counter `name` carrying every label in `labels`, or 0.
#[must_use]
pub fn counter_value(entries: &Entries, name: &str, labels: &[(&str, &str)]) -> u64 {
    entries
        .iter()
        .filter(|(key, ..)| matches(key, name, labels))
        .map(|(.., value)| match value {
            DebugValue::Counter(count) => *count,
            _ => 0,
        })
        .sum()
}

/// Last value of the gauge `name`, if recorded.
#[must_use]
pub fn gauge_value(entries: &Entries, name: &str) -> Option<f64> {
    entries
        .iter()
        .find(|(key, ..)| matches(key, name, &[]))
        .and_then(|(.., value)| match value {
            DebugValue::Gauge(gauge) => Some(gauge.into_inner()),
            _ => None,
        })
}
