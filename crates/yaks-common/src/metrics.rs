//! Metrics registry for YAKS observability
//!
//! OpenTelemetry instruments for the Test controller. They are exported
//! through the meter provider installed by [`crate::telemetry`]; without an
//! OTLP endpoint they are no-ops.

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;

/// Global meter for YAKS metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("yaks"));

/// Counter of reconciliations
///
/// Labels:
/// - `action`: initialize, start, evaluate, monitor, noop
/// - `result`: success, error
pub static RECONCILE_TOTAL: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("yaks_test_reconcile_total")
        .with_description("Total number of Test reconciliations")
        .with_unit("{reconciliations}")
        .build()
});

/// Histogram of reconciliation duration
///
/// Labels:
/// - `action`: initialize, start, evaluate, monitor, noop
pub static RECONCILE_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("yaks_test_reconcile_duration_seconds")
        .with_description("Duration of Test reconciliation in seconds")
        .with_unit("s")
        .build()
});

/// Counter of phase transitions written to Test status
///
/// Labels:
/// - `phase`: the phase entered
pub static PHASE_TRANSITIONS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("yaks_test_phase_transitions_total")
        .with_description("Total number of Test phase transitions")
        .with_unit("{transitions}")
        .build()
});

/// Outcome label for [`RECONCILE_TOTAL`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileResult {
    /// Action completed
    Success,
    /// Action returned an error
    Error,
}

impl ReconcileResult {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Record one reconciliation of the given action
pub fn record_reconcile(action: &str, result: ReconcileResult, duration_secs: f64) {
    RECONCILE_TOTAL.add(
        1,
        &[
            KeyValue::new("action", action.to_string()),
            KeyValue::new("result", result.as_str()),
        ],
    );
    RECONCILE_DURATION.record(duration_secs, &[KeyValue::new("action", action.to_string())]);
}

/// Record a Test entering a phase
pub fn record_phase_transition(phase: &str) {
    PHASE_TRANSITIONS.add(1, &[KeyValue::new("phase", phase.to_string())]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_provider_is_noop() {
        record_reconcile("start", ReconcileResult::Success, 0.25);
        record_reconcile("evaluate", ReconcileResult::Error, 0.01);
        record_phase_transition("Running");
    }

    #[test]
    fn result_labels() {
        assert_eq!(ReconcileResult::Success.as_str(), "success");
        assert_eq!(ReconcileResult::Error.as_str(), "error");
    }
}
