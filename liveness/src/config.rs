use crate::error::ConfigError;

use std::time::Duration;

/// How often probes run when nothing else is configured.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// How long probing stays paused after `pause` when nothing else is configured.
pub const DEFAULT_REARM_DELAY: Duration = Duration::from_secs(5);

/// Timing settings for a [`DisconnectDetector`](crate::DisconnectDetector).
///
/// With the `serde` feature, durations are read and written in human-readable
/// form, e.g. `{ "probe_interval": "500ms", "rearm_delay": "1m 30s" }`.
/// Missing fields fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorConfig {
  #[cfg_attr(feature = "serde", serde(with = "humantime_duration"))]
  pub probe_interval: Duration,
  #[cfg_attr(feature = "serde", serde(with = "humantime_duration"))]
  pub rearm_delay: Duration,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      probe_interval: DEFAULT_PROBE_INTERVAL,
      rearm_delay: DEFAULT_REARM_DELAY,
    }
  }
}

impl DetectorConfig {
  /// Whole-second settings, for hosts that configure everything in seconds.
  pub fn from_secs(probe_interval_secs: u64, rearm_delay_secs: u64) -> Self {
    Self {
      probe_interval: Duration::from_secs(probe_interval_secs),
      rearm_delay: Duration::from_secs(rearm_delay_secs),
    }
  }

  /// Parses both durations from human-readable strings such as `"250ms"`.
  pub fn parse(probe_interval: &str, rearm_delay: &str) -> Result<Self, ConfigError> {
    Ok(Self {
      probe_interval: parse_duration("probe_interval", probe_interval)?,
      rearm_delay: parse_duration("rearm_delay", rearm_delay)?,
    })
  }
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
  humantime::parse_duration(value).map_err(|source| ConfigError::InvalidDuration {
    field,
    value: value.to_string(),
    source,
  })
}

#[cfg(feature = "serde")]
mod humantime_duration {
  use serde::{Deserialize, Deserializer, Serializer};
  use std::time::Duration;

  pub(super) fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*duration))
  }

  pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_human_durations() {
    let config = DetectorConfig::parse("250ms", "2s").unwrap();
    assert_eq!(config.probe_interval, Duration::from_millis(250));
    assert_eq!(config.rearm_delay, Duration::from_secs(2));
  }

  #[test]
  fn test_parse_reports_offending_field() {
    let err = DetectorConfig::parse("1s", "soon").unwrap_err();
    let ConfigError::InvalidDuration { field, value, .. } = &err;
    assert_eq!(*field, "rearm_delay");
    assert_eq!(value, "soon");
    assert!(err.to_string().contains("rearm_delay"));
  }

  #[test]
  fn test_from_secs() {
    assert_eq!(
      DetectorConfig::from_secs(3, 10),
      DetectorConfig {
        probe_interval: Duration::from_secs(3),
        rearm_delay: Duration::from_secs(10),
      }
    );
  }

  #[cfg(feature = "serde")]
  #[test]
  fn test_deserialize_with_defaults() {
    let config: DetectorConfig = serde_json::from_str(r#"{ "probe_interval": "100ms" }"#).unwrap();
    assert_eq!(config.probe_interval, Duration::from_millis(100));
    assert_eq!(config.rearm_delay, DEFAULT_REARM_DELAY);

    let bad = serde_json::from_str::<DetectorConfig>(r#"{ "probe_interval": "fast" }"#);
    assert!(bad.is_err());
  }

  #[cfg(feature = "serde")]
  #[test]
  fn test_serialize_is_human_readable() {
    let config = DetectorConfig::parse("1m 30s", "5s").unwrap();
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(json, r#"{"probe_interval":"1m 30s","rearm_delay":"5s"}"#);
    let back: DetectorConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
  }
}
