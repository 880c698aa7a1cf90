//! A restartable periodic ticker and a fail-fast disconnect detector.
//!
//! # Components
//! - [`Ticker`]: runs a callback on a fixed interval from a blocking `start`
//!   loop, with `stop` and `reset` handed over a rendezvous channel. Each tick
//!   runs on its own thread, so a slow callback never delays the next tick.
//! - [`DisconnectDetector`]: drives a [`Probe`] from a ticker and escalates the
//!   first failed probe to process termination. `pause` suspends probing for a
//!   re-arm delay, after which it resumes on its own.
//! - [`ProbeSet`]: a shared, named registry of probes checked as one.
//! - [`wait_until_ready`]: blocks start-up until a resource answers.
//!
//! All logging goes through `tracing`; no subscriber is installed.

pub mod builder;
pub mod config;
pub mod detector;
pub mod error;
pub mod probe;
pub mod ticker;

pub use builder::DetectorBuilder;
pub use config::DetectorConfig;
pub use detector::{terminate, DetectorState, DisconnectDetector, FailureHandler};
pub use error::{BuildError, ConfigError, DetectorError, ProbeError, ProbeFailure, TickerError};
pub use probe::{wait_until_ready, wait_until_ready_default, Probe, ProbeSet};
pub use ticker::Ticker;
