use crate::config::{DetectorConfig, DEFAULT_PROBE_INTERVAL, DEFAULT_REARM_DELAY};
use crate::detector::{terminate, DisconnectDetector, FailureHandler};
use crate::error::{BuildError, ProbeFailure};
use crate::probe::Probe;

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A builder for creating [`DisconnectDetector`] instances.
pub struct DetectorBuilder {
  probe_interval: Duration,
  rearm_delay: Duration,
  on_failure: Option<FailureHandler>,
}

impl fmt::Debug for DetectorBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DetectorBuilder")
      .field("probe_interval", &self.probe_interval)
      .field("rearm_delay", &self.rearm_delay)
      .field("has_failure_handler", &self.on_failure.is_some())
      .finish()
  }
}

impl Default for DetectorBuilder {
  fn default() -> Self {
    Self {
      probe_interval: DEFAULT_PROBE_INTERVAL,
      rearm_delay: DEFAULT_REARM_DELAY,
      on_failure: None,
    }
  }
}

impl DetectorBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts from the timings in `config`.
  pub fn from_config(config: &DetectorConfig) -> Self {
    Self::new()
      .probe_interval(config.probe_interval)
      .rearm_delay(config.rearm_delay)
  }

  /// Sets how often the probe runs.
  pub fn probe_interval(mut self, interval: Duration) -> Self {
    self.probe_interval = interval;
    self
  }

  /// Sets how long probing stays suspended after `pause`.
  pub fn rearm_delay(mut self, delay: Duration) -> Self {
    self.rearm_delay = delay;
    self
  }

  /// Replaces the default [`terminate`] handler.
  ///
  /// The handler runs on the probe's callback thread. Anything other than
  /// ending the process leaves the detector running, and the next failed
  /// probe calls the handler again.
  pub fn on_failure<F>(mut self, handler: F) -> Self
  where
    F: Fn(&ProbeFailure) + Send + Sync + 'static,
  {
    self.on_failure = Some(Arc::new(handler));
    self
  }

  /// Builds an idle detector around `probe`.
  ///
  /// # Errors
  ///
  /// Returns `BuildError::ZeroProbeInterval` if the probe interval is zero.
  pub fn build<P: Probe>(self, probe: P) -> Result<DisconnectDetector, BuildError> {
    if self.probe_interval.is_zero() {
      return Err(BuildError::ZeroProbeInterval);
    }
    let on_failure: FailureHandler = match self.on_failure {
      Some(handler) => handler,
      None => Arc::new(terminate),
    };
    Ok(DisconnectDetector::with_handler(
      self.probe_interval,
      self.rearm_delay,
      probe,
      on_failure,
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::DetectorState;

  #[test]
  fn test_builder_defaults() {
    let detector = DetectorBuilder::new().build(|| Ok::<(), String>(())).unwrap();
    assert_eq!(detector.probe_interval(), DEFAULT_PROBE_INTERVAL);
    assert_eq!(detector.rearm_delay(), DEFAULT_REARM_DELAY);
    assert_eq!(detector.state(), DetectorState::Idle);
  }

  #[test]
  fn test_builder_rejects_zero_interval() {
    let result = DetectorBuilder::new()
      .probe_interval(Duration::ZERO)
      .build(|| Ok::<(), String>(()));
    assert_eq!(result.unwrap_err(), BuildError::ZeroProbeInterval);
  }

  #[test]
  fn test_builder_from_config() {
    let config = DetectorConfig::from_secs(2, 7);
    let builder = DetectorBuilder::from_config(&config).on_failure(|_| {});
    let rendered = format!("{:?}", builder);
    assert!(rendered.contains("has_failure_handler: true"));

    let detector = builder.build(|| Ok::<(), String>(())).unwrap();
    assert_eq!(detector.probe_interval(), Duration::from_secs(2));
    assert_eq!(detector.rearm_delay(), Duration::from_secs(7));
  }
}
