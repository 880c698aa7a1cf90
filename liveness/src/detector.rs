use crate::builder::DetectorBuilder;
use crate::error::{DetectorError, ProbeFailure};
use crate::probe::Probe;
use crate::ticker::Ticker;

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fibre::mpmc;
use fibre::RecvErrorTimeout;
use parking_lot::Mutex;

/// Exit status used by [`terminate`].
pub const FATAL_EXIT_CODE: i32 = 1;

/// Called with every probe failure.
pub type FailureHandler = Arc<dyn Fn(&ProbeFailure) + Send + Sync>;

/// The default failure handler: logs the failure and exits the process.
///
/// A lost resource is treated as unrecoverable here. Reconnecting is the job
/// of whatever supervises the process.
pub fn terminate(failure: &ProbeFailure) {
  tracing::error!(%failure, exit_code = FATAL_EXIT_CODE, "terminating process");
  std::process::exit(FATAL_EXIT_CODE);
}

/// Lifecycle state of a [`DisconnectDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorState {
  /// Constructed or stopped; `start` may be called.
  Idle,
  /// Probing on every tick.
  Running,
  /// Probing suspended by `pause`; resumes on its own after the re-arm delay.
  Paused,
}

/// Probes a resource on a fixed interval and fails fast when it disappears.
///
/// The detector owns a [`Ticker`] whose callback runs the probe. A failed
/// probe is logged and handed to the failure handler, which by default
/// [terminates](terminate) the process.
///
/// ```text
///          start               pause
///   Idle ─────────► Running ─────────► Paused
///    ▲                │   ▲               │
///    │      stop      │   └─── re-arm ────┤
///    ├────────────────┘        delay      │
///    └────────────────────────────────────┘
///                     stop
/// ```
pub struct DisconnectDetector {
  ticker: Ticker,
  rearm_delay: Duration,
  state: Mutex<DetectorState>,
  probes_run: Arc<AtomicU64>,
  terminal_tx: mpmc::Sender<()>,
  terminal_rx: mpmc::Receiver<()>,
}

impl DisconnectDetector {
  /// Creates an idle detector that runs `probe` every `probe_interval`, and
  /// after a `pause` waits `rearm_delay` before probing again.
  ///
  /// A failed probe terminates the process. Use [`builder`](Self::builder) to
  /// install a different failure handler.
  pub fn new<P: Probe>(probe_interval: Duration, rearm_delay: Duration, probe: P) -> Self {
    Self::with_handler(probe_interval, rearm_delay, probe, Arc::new(terminate))
  }

  pub fn builder() -> DetectorBuilder {
    DetectorBuilder::new()
  }

  pub(crate) fn with_handler<P: Probe>(
    probe_interval: Duration,
    rearm_delay: Duration,
    probe: P,
    on_failure: FailureHandler,
  ) -> Self {
    let probes_run = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&probes_run);

    let ticker = Ticker::new(probe_interval, move || {
      let attempt = counter.fetch_add(1, Ordering::Relaxed) + 1;
      match probe.check() {
        Ok(()) => tracing::trace!(attempt, "probe succeeded"),
        Err(error) => {
          tracing::error!(attempt, %error, "resource disconnected");
          on_failure(&ProbeFailure { attempt, error });
        }
      }
    });

    let (terminal_tx, terminal_rx) = mpmc::bounded(1);
    Self {
      ticker,
      rearm_delay,
      state: Mutex::new(DetectorState::Idle),
      probes_run,
      terminal_tx,
      terminal_rx,
    }
  }

  pub fn state(&self) -> DetectorState {
    *self.state.lock()
  }

  pub fn probe_interval(&self) -> Duration {
    self.ticker.interval()
  }

  pub fn rearm_delay(&self) -> Duration {
    self.rearm_delay
  }

  /// Number of probes dispatched so far, across restarts.
  pub fn probe_count(&self) -> u64 {
    self.probes_run.load(Ordering::Relaxed)
  }

  /// Starts probing and supervises the ticker until [`stop`](Self::stop).
  ///
  /// Blocks the calling thread, so run it on a dedicated one. Each time a
  /// [`pause`](Self::pause) ends the ticker's loop, this waits for the re-arm
  /// delay and restarts it. A `stop` ends the wait early and makes this return.
  ///
  /// # Errors
  ///
  /// - `DetectorError::AlreadyStarted` if the detector is not idle.
  /// - `DetectorError::Ticker` if the probe interval is zero, or if a previous
  ///   `start` has been stopped but its ticker loop has not exited yet.
  pub fn start(&self) -> Result<(), DetectorError> {
    {
      let mut state = self.state.lock();
      if *state != DetectorState::Idle {
        return Err(DetectorError::AlreadyStarted);
      }
      self.ticker.arm()?;
      // A stop that landed as a previous run was exiting can leave a signal behind.
      while self.terminal_rx.try_recv().is_ok() {}
      *state = DetectorState::Running;
    }
    tracing::debug!(
      probe_interval = ?self.ticker.interval(),
      rearm_delay = ?self.rearm_delay,
      "disconnect detector started"
    );

    loop {
      self.ticker.run();

      match self.terminal_rx.recv_timeout(self.rearm_delay) {
        Ok(()) | Err(RecvErrorTimeout::Disconnected) => break,
        Err(RecvErrorTimeout::Timeout) => {}
      }

      let mut state = self.state.lock();
      if *state != DetectorState::Paused {
        break;
      }
      if let Err(err) = self.ticker.arm() {
        *state = DetectorState::Idle;
        return Err(err.into());
      }
      *state = DetectorState::Running;
      tracing::debug!("probing resumed");
    }

    tracing::debug!(probes = self.probe_count(), "disconnect detector stopped");
    Ok(())
  }

  /// Suspends probing. It resumes by itself once the re-arm delay has passed.
  ///
  /// No-op unless the detector is running.
  pub fn pause(&self) {
    let mut state = self.state.lock();
    if *state != DetectorState::Running {
      return;
    }
    *state = DetectorState::Paused;
    if let Err(err) = self.ticker.stop() {
      tracing::warn!(%err, "ticker was not running on pause");
    }
    tracing::debug!(rearm_delay = ?self.rearm_delay, "probing paused");
  }

  /// Stops probing for good and lets `start` return. No automatic resume
  /// follows.
  ///
  /// No-op when the detector is idle.
  pub fn stop(&self) {
    let mut state = self.state.lock();
    match *state {
      DetectorState::Idle => return,
      DetectorState::Running => {
        if let Err(err) = self.ticker.stop() {
          tracing::warn!(%err, "ticker was not running on stop");
        }
      }
      DetectorState::Paused => {}
    }
    *state = DetectorState::Idle;
    // A full slot already carries the same signal.
    let _ = self.terminal_tx.try_send(());
  }

  /// Restarts the countdown to the next probe. No-op unless running.
  pub fn reset(&self) {
    let state = self.state.lock();
    if *state == DetectorState::Running {
      self.ticker.reset();
    }
  }
}

impl fmt::Debug for DisconnectDetector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DisconnectDetector")
      .field("state", &self.state())
      .field("probe_interval", &self.ticker.interval())
      .field("rearm_delay", &self.rearm_delay)
      .field("probes_run", &self.probe_count())
      .finish_non_exhaustive()
  }
}
