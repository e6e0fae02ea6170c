use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for the sequence runner.
///
/// All fields have defaults, so an empty JSON object is a valid settings value.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct RunnerSettings {
    /// Sleep between probe queries in Wait for Image / Wait for Pixel Color (ms).
    pub poll_interval_ms: u64,

    /// Timeout for wait actions that do not set `timeout_s` (seconds).
    pub default_timeout_s: f64,

    /// Pause before the first step of a top-level run (ms).
    pub start_delay_ms: u64,

    /// Maximum trace entries kept per run; older entries are dropped first.
    pub trace_capacity: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            default_timeout_s: 10.0,
            start_delay_ms: 0,
            trace_capacity: 10_000,
        }
    }
}

impl RunnerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn default_timeout(&self) -> Duration {
        secs(self.default_timeout_s)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

/// Seconds (possibly negative, NaN or huge) to a `Duration`, clamped at zero.
pub fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let s: RunnerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, RunnerSettings::default());
        assert_eq!(s.poll_interval(), Duration::from_millis(250));
        assert_eq!(s.default_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn secs_clamps_bad_values() {
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
        assert_eq!(secs(0.5), Duration::from_millis(500));
    }
}
