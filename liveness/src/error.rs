use thiserror::Error;

/// Errors returned by [`Ticker`](crate::Ticker) lifecycle calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TickerError {
  /// The ticker was created with a zero interval, which would spin.
  #[error("ticker interval must be greater than zero")]
  ZeroInterval,
  /// `start` was called while another `start` loop is active.
  #[error("ticker is already running")]
  AlreadyRunning,
  /// `stop` was called with no active `start` loop to receive it.
  #[error("ticker is not running")]
  NotRunning,
}

/// Errors returned by [`DisconnectDetector::start`](crate::DisconnectDetector::start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DetectorError {
  #[error("disconnect detector has already been started")]
  AlreadyStarted,
  #[error(transparent)]
  Ticker(#[from] TickerError),
}

/// Errors that can occur when building a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuildError {
  #[error("probe interval cannot be zero")]
  ZeroProbeInterval,
}

/// A configuration value could not be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid duration for `{field}` ({value:?}): {source}")]
  InvalidDuration {
    field: &'static str,
    value: String,
    #[source]
    source: humantime::DurationError,
  },
}

/// Why a probe considered its resource unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProbeError {
  message: String,
}

impl ProbeError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }

  pub fn message(&self) -> &str {
    &self.message
  }
}

/// A failed probe, as handed to the detector's failure handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("probe #{attempt} failed: {error}")]
pub struct ProbeFailure {
  /// 1-based count of probes this detector has run, including this one.
  pub attempt: u64,
  #[source]
  pub error: ProbeError,
}
