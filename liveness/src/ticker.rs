use crate::error::TickerError;

use core::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fibre::mpmc::rendezvous::{self, Receiver, Sender};
use fibre::RecvErrorTimeout;

const CALLBACK_THREAD_NAME: &str = "vigil-tick";

// Loop ownership. `STOPPING` lasts from a `stop` until the loop has exited.
const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;

/// A command handed from a controlling thread to the `start` loop.
#[derive(Debug)]
enum Command {
  Stop,
  Reset,
}

/// Invokes a callback on a fixed interval until stopped.
///
/// [`start`](Self::start) blocks for as long as the ticker runs, so it belongs
/// on a dedicated thread. Control calls ([`stop`](Self::stop),
/// [`reset`](Self::reset)) come from other threads and are handed to the loop
/// over a rendezvous channel.
///
/// Every expiry runs the callback on a freshly spawned thread and does not wait
/// for it. A callback that takes longer than the interval therefore overlaps
/// with the next one, and nothing bounds how many can be in flight. Callbacks
/// that may block must bring their own timeout. A stopped ticker does not
/// cancel callbacks that are already running.
pub struct Ticker {
  interval: Duration,
  callback: Arc<dyn Fn() + Send + Sync>,
  state: AtomicU8,
  control_tx: Sender<Command>,
  control_rx: Receiver<Command>,
}

impl Ticker {
  /// Creates a dormant ticker. No timer exists until `start` is called.
  pub fn new<F>(interval: Duration, callback: F) -> Self
  where
    F: Fn() + Send + Sync + 'static,
  {
    let (control_tx, control_rx) = rendezvous::rendezvous();
    Self {
      interval,
      callback: Arc::new(callback),
      state: AtomicU8::new(IDLE),
      control_tx,
      control_rx,
    }
  }

  pub fn interval(&self) -> Duration {
    self.interval
  }

  /// Whether a `start` loop owns the ticker and has not been told to stop.
  pub fn is_running(&self) -> bool {
    self.state.load(Ordering::Acquire) == RUNNING
  }

  /// Runs the tick loop on the calling thread until [`stop`](Self::stop) is
  /// called.
  ///
  /// # Errors
  ///
  /// - `TickerError::ZeroInterval` if the ticker was built with a zero interval.
  /// - `TickerError::AlreadyRunning` if another `start` is active, including one
  ///   that has been stopped but has not exited yet.
  pub fn start(&self) -> Result<(), TickerError> {
    self.arm()?;
    self.run();
    Ok(())
  }

  /// Stops the running loop.
  ///
  /// The command is a synchronous handoff: this returns once the loop has
  /// received it and is on its way out.
  ///
  /// # Errors
  ///
  /// Returns `TickerError::NotRunning`, without blocking, if no loop is active
  /// or another `stop` already claimed it.
  pub fn stop(&self) -> Result<(), TickerError> {
    self
      .state
      .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
      .map_err(|_| TickerError::NotRunning)?;
    self
      .control_tx
      .send(Command::Stop)
      .map_err(|_| TickerError::NotRunning)
  }

  /// Restarts the countdown so the next tick fires one full interval after the
  /// loop receives this call. The interval itself is unchanged.
  ///
  /// No-op when the ticker is not running. Must not race a concurrent `stop`.
  pub fn reset(&self) {
    if !self.is_running() {
      return;
    }
    if self.control_tx.send(Command::Reset).is_err() {
      tracing::warn!("ticker control channel closed during reset");
    }
  }

  /// Marks the ticker as owned by a loop. Split from `run` so a supervisor can
  /// claim the ticker while holding its own lock.
  pub(crate) fn arm(&self) -> Result<(), TickerError> {
    if self.interval.is_zero() {
      return Err(TickerError::ZeroInterval);
    }
    self
      .state
      .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
      .map(|_| ())
      .map_err(|_| TickerError::AlreadyRunning)
  }

  /// The tick loop. The caller must have armed the ticker first. Ownership is
  /// released only once the loop has exited.
  pub(crate) fn run(&self) {
    tracing::debug!(interval = ?self.interval, "ticker started");
    let mut next_tick = Instant::now() + self.interval;

    loop {
      let wait = next_tick.saturating_duration_since(Instant::now());
      match self.control_rx.recv_timeout(wait) {
        Ok(Command::Stop) | Err(RecvErrorTimeout::Disconnected) => break,
        Ok(Command::Reset) => {
          next_tick = Instant::now() + self.interval;
          tracing::trace!("ticker countdown reset");
        }
        Err(RecvErrorTimeout::Timeout) => {
          self.dispatch();
          next_tick += self.interval;

          let now = Instant::now();
          if next_tick <= now {
            // Missed expiries collapse into the one just dispatched.
            tracing::warn!(behind = ?(now - next_tick), "ticker fell behind schedule");
            next_tick = now + self.interval;
          }
        }
      }
    }

    self.state.store(IDLE, Ordering::Release);
    tracing::debug!("ticker stopped");
  }

  fn dispatch(&self) {
    let callback = Arc::clone(&self.callback);
    let spawned = thread::Builder::new()
      .name(CALLBACK_THREAD_NAME.to_string())
      .spawn(move || callback());

    match spawned {
      Ok(_) => tracing::trace!("tick dispatched"),
      Err(error) => tracing::warn!(%error, "failed to spawn tick callback thread"),
    }
  }
}

impl fmt::Debug for Ticker {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Ticker")
      .field("interval", &self.interval)
      .field("running", &self.is_running())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn noop_ticker(interval: Duration) -> Ticker {
    Ticker::new(interval, || {})
  }

  #[test]
  fn test_stop_without_start_does_not_block() {
    let ticker = noop_ticker(Duration::from_millis(10));
    assert_eq!(ticker.stop(), Err(TickerError::NotRunning));
    assert!(!ticker.is_running());
  }

  #[test]
  fn test_reset_without_start_is_noop() {
    let ticker = noop_ticker(Duration::from_millis(10));
    ticker.reset();
    assert!(!ticker.is_running());
  }

  #[test]
  fn test_zero_interval_is_rejected() {
    let ticker = noop_ticker(Duration::ZERO);
    assert_eq!(ticker.start(), Err(TickerError::ZeroInterval));
    assert!(!ticker.is_running());
  }

  #[test]
  fn test_arm_is_exclusive() {
    let ticker = noop_ticker(Duration::from_millis(10));
    assert_eq!(ticker.arm(), Ok(()));
    assert_eq!(ticker.arm(), Err(TickerError::AlreadyRunning));
    assert_eq!(ticker.start(), Err(TickerError::AlreadyRunning));
  }

  #[test]
  fn test_start_stop_roundtrip() {
    let ticker = Arc::new(noop_ticker(Duration::from_millis(5)));
    let runner = {
      let ticker = ticker.clone();
      thread::spawn(move || ticker.start())
    };

    while !ticker.is_running() {
      thread::yield_now();
    }
    assert_eq!(ticker.stop(), Ok(()));
    assert_eq!(runner.join().unwrap(), Ok(()));
    assert!(!ticker.is_running());
  }

  #[test]
  fn test_stopping_loop_keeps_ownership_until_exit() {
    let ticker = Arc::new(noop_ticker(Duration::from_secs(60)));
    ticker.arm().unwrap();

    let stopper = {
      let ticker = ticker.clone();
      thread::spawn(move || ticker.stop())
    };
    while ticker.state.load(Ordering::Acquire) != STOPPING {
      thread::yield_now();
    }

    // The old loop has not taken `Stop` yet, so nobody may claim the ticker.
    assert!(!ticker.is_running());
    assert_eq!(ticker.arm(), Err(TickerError::AlreadyRunning));
    assert_eq!(ticker.start(), Err(TickerError::AlreadyRunning));
    assert_eq!(ticker.stop(), Err(TickerError::NotRunning));

    ticker.run();
    assert_eq!(stopper.join().unwrap(), Ok(()));
    assert_eq!(ticker.arm(), Ok(()));
  }
}
