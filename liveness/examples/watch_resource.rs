use vigil_liveness::{wait_until_ready, DetectorBuilder, DetectorConfig, ProbeSet};

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
    .init();

  // A stand-in for a database pool: comes up after a few attempts and goes away
  // when `online` is cleared.
  let online = Arc::new(AtomicBool::new(false));
  let boot_attempts = Arc::new(AtomicU32::new(0));

  let startup_probe = {
    let online = online.clone();
    let boot_attempts = boot_attempts.clone();
    move || {
      if boot_attempts.fetch_add(1, Ordering::SeqCst) >= 2 {
        online.store(true, Ordering::SeqCst);
      }
      if online.load(Ordering::SeqCst) {
        Ok(())
      } else {
        Err("database is starting up")
      }
    }
  };
  let attempts = wait_until_ready(&startup_probe, Duration::from_millis(200));
  println!("Database ready after {} attempts.", attempts);

  let resources = ProbeSet::new();
  {
    let online = online.clone();
    resources.register("database", move || {
      if online.load(Ordering::SeqCst) {
        Ok(())
      } else {
        Err("connection refused")
      }
    });
  }

  let config = DetectorConfig::parse("250ms", "1s").expect("valid durations");
  let detector = Arc::new(
    DetectorBuilder::from_config(&config)
      .build(resources)
      .expect("Failed to build detector"),
  );

  let runner = {
    let detector = detector.clone();
    thread::spawn(move || detector.start())
  };

  thread::sleep(Duration::from_secs(1));
  println!("Pausing probes for a planned restart...");
  detector.pause();
  thread::sleep(Duration::from_millis(500));
  println!("State during the re-arm delay: {:?}", detector.state());

  thread::sleep(Duration::from_secs(1));
  println!("Probing resumed: {:?}. Taking the database away.", detector.state());
  online.store(false, Ordering::SeqCst);

  // The next probe fails and the default handler exits the process.
  let _ = runner.join();
}
