//! Metric names recorded by the replay core.
//!
//! Recording goes through the `metrics` facade; the server installs the
//! Prometheus recorder.

/// Sessions started (counter, labels: mode = single | synchronized).
pub const REPLAY_SESSIONS_STARTED_TOTAL: &str = "replay_sessions_started_total";
/// Sessions registered and not yet finished (gauge).
pub const REPLAY_SESSIONS_ACTIVE: &str = "replay_sessions_active";
/// Connections refused because their session had already started (counter).
pub const REPLAY_LATE_JOINS_REJECTED_TOTAL: &str = "replay_late_joins_rejected_total";
/// Sessions that ended with an error (counter).
pub const REPLAY_SESSIONS_FAILED_TOTAL: &str = "replay_sessions_failed_total";
/// Records written to transports (counter, labels: route).
pub const RECORDS_SENT_TOTAL: &str = "replay_records_sent_total";
/// Times a delivery loop had to wait for a buffer to drain (counter).
pub const DELIVERY_BACKPRESSURE_WAITS_TOTAL: &str = "delivery_backpressure_waits_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_snake_case() {
        let names = [
            REPLAY_SESSIONS_STARTED_TOTAL,
            REPLAY_SESSIONS_ACTIVE,
            REPLAY_LATE_JOINS_REJECTED_TOTAL,
            REPLAY_SESSIONS_FAILED_TOTAL,
            RECORDS_SENT_TOTAL,
            DELIVERY_BACKPRESSURE_WAITS_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name} is not snake_case"
            );
        }
    }
}
