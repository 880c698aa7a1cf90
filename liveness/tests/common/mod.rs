#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

/// Polls `condition` until it holds or `timeout` passes. Returns whether it held.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
  let deadline = Instant::now() + timeout;
  while Instant::now() < deadline {
    if condition() {
      return true;
    }
    thread::sleep(Duration::from_millis(1));
  }
  condition()
}
