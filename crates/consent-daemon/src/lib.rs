//! consent-daemon - Consent Engine Runtime
//!
//! This library hosts the runtime around [`consent_core`]: configuration,
//! the background expiry sweep, and the revocation signal intake. The
//! `consentd` binary wires them together; embedders can assemble the same
//! pieces around their own transport.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with validated defaults
//! - [`worker`]: the interval-driven expiry sweep worker
//! - [`intake`]: the mpsc-fed revocation signal worker
//!
//! # Runtime requirements
//!
//! The workers do blocking `SQLite` work behind `spawn_blocking` and are
//! intended for a multi-threaded tokio runtime; the `consentd` binary
//! configures `flavor = "multi_thread"`.

pub mod config;
pub mod intake;
pub mod worker;

pub use config::{ConfigError, DaemonConfig};
pub use intake::RevocationIntake;
pub use worker::{SweepWorker, SweepWorkerConfig};
