use crate::error::ProbeError;

use core::fmt;
use std::convert::Infallible;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vigil_cache::SafeCache;

/// How long [`wait_until_ready_default`] sleeps between attempts.
pub const DEFAULT_STARTUP_RETRY: Duration = Duration::from_secs(2);

/// A health check against one external resource.
///
/// Implemented for every `Fn() -> Result<(), E>` where `E: Display`, so a
/// plain closure such as `|| pool.ping()` can be used directly.
pub trait Probe: Send + Sync + 'static {
  fn check(&self) -> Result<(), ProbeError>;
}

impl<F, E> Probe for F
where
  F: Fn() -> Result<(), E> + Send + Sync + 'static,
  E: fmt::Display,
{
  fn check(&self) -> Result<(), ProbeError> {
    self().map_err(|e| ProbeError::new(e.to_string()))
  }
}

/// A named collection of probes checked as one.
///
/// Handles are cheap to clone and share the same registry, so a host can keep
/// one handle for registering resources while a detector owns another. The set
/// is healthy when every registered probe is; an empty set is healthy.
#[derive(Clone, Default)]
pub struct ProbeSet {
  probes: Arc<SafeCache<String, Arc<dyn Probe>>>,
}

impl ProbeSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `probe` under `name`, replacing any probe already there.
  /// Returns `true` if a previous probe was replaced.
  pub fn register<P: Probe>(&self, name: impl Into<String>, probe: P) -> bool {
    self.probes.insert(name.into(), Arc::new(probe)).is_some()
  }

  /// Returns `true` if a probe was registered under `name`.
  pub fn unregister(&self, name: &str) -> bool {
    self.probes.remove(name).is_some()
  }

  pub fn len(&self) -> usize {
    self.probes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.probes.is_empty()
  }

  /// Registered names, sorted.
  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.snapshot().into_iter().map(|(name, _)| name).collect();
    names.sort_unstable();
    names
  }

  // Probes are cloned out so that slow checks never hold the registry's lock.
  fn snapshot(&self) -> Vec<(String, Arc<dyn Probe>)> {
    let mut probes = Vec::with_capacity(self.probes.len());
    self
      .probes
      .for_each(|name, probe| {
        probes.push((name.clone(), Arc::clone(probe)));
        Ok::<_, Infallible>(())
      })
      .unwrap_or_else(|never| match never {});
    probes
  }
}

impl Probe for ProbeSet {
  /// Checks every probe in name order and fails on the first unhealthy one.
  fn check(&self) -> Result<(), ProbeError> {
    let mut probes = self.snapshot();
    probes.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    for (name, probe) in probes {
      probe
        .check()
        .map_err(|error| ProbeError::new(format!("{name}: {error}")))?;
    }
    Ok(())
  }
}

impl fmt::Debug for ProbeSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ProbeSet").field("names", &self.names()).finish()
  }
}

/// Blocks until `probe` succeeds, sleeping `retry_interval` between attempts.
///
/// Meant for start-up, before a [`DisconnectDetector`](crate::DisconnectDetector)
/// takes over. Returns the number of attempts made. There is no upper bound on
/// the wait.
pub fn wait_until_ready<P: Probe + ?Sized>(probe: &P, retry_interval: Duration) -> u64 {
  let mut attempts = 0;
  loop {
    attempts += 1;
    match probe.check() {
      Ok(()) => {
        tracing::debug!(attempts, "resource ready");
        return attempts;
      }
      Err(error) => {
        tracing::debug!(attempts, %error, retry_in = ?retry_interval, "resource not ready");
        thread::sleep(retry_interval);
      }
    }
  }
}

/// [`wait_until_ready`] with [`DEFAULT_STARTUP_RETRY`].
pub fn wait_until_ready_default<P: Probe + ?Sized>(probe: &P) -> u64 {
  wait_until_ready(probe, DEFAULT_STARTUP_RETRY)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[test]
  fn test_closure_probe_maps_error_message() {
    let probe = || Err::<(), _>("connection refused");
    assert_eq!(probe.check(), Err(ProbeError::new("connection refused")));

    let healthy = || Ok::<(), String>(());
    assert_eq!(healthy.check(), Ok(()));
  }

  #[test]
  fn test_probe_set_reports_failing_name() {
    let set = ProbeSet::new();
    assert!(set.check().is_ok(), "empty set is healthy");

    set.register("primary", || Ok::<(), String>(()));
    set.register("replica", || Err::<(), _>("timed out"));
    assert_eq!(set.names(), vec!["primary".to_string(), "replica".to_string()]);

    let error = set.check().unwrap_err();
    assert_eq!(error.message(), "replica: timed out");

    assert!(set.unregister("replica"));
    assert!(!set.unregister("replica"));
    assert!(set.check().is_ok());
  }

  #[test]
  fn test_probe_set_register_replaces() {
    let set = ProbeSet::new();
    assert!(!set.register("db", || Err::<(), _>("down")));
    assert!(set.register("db", || Ok::<(), String>(())));
    assert_eq!(set.len(), 1);
    assert!(set.check().is_ok());
  }

  #[test]
  fn test_probe_set_clones_share_registry() {
    let host = ProbeSet::new();
    let detector_side = host.clone();
    host.register("cache", || Err::<(), _>("evicted"));
    assert!(detector_side.check().is_err());
    assert!(!detector_side.is_empty());
  }

  #[test]
  fn test_wait_until_ready_retries_until_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let probe = move || {
      if counter.fetch_add(1, Ordering::SeqCst) < 3 {
        Err("starting")
      } else {
        Ok(())
      }
    };

    let attempts = wait_until_ready(&probe, Duration::from_millis(1));
    assert_eq!(attempts, 4);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
  }
}
