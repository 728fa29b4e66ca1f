//! Timestamp helpers.
//!
//! All timestamps in this crate are u64 nanoseconds since the Unix epoch,
//! UTC. Locale display formatting happens at the presentation edge
//! ([`crate::grant::GrantResource`]), never in the core model.

use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds per second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Minutes per day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Returns the current timestamp in nanoseconds since the Unix epoch.
#[must_use]
pub fn current_timestamp_ns() -> u64 {
    #[allow(clippy::cast_possible_truncation)]
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Returns the UTC minute-of-day (0..1440) of an instant.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn minute_of_day(instant_ns: u64) -> u32 {
    (((instant_ns / NANOS_PER_SEC) % 86_400) / 60) as u32
}
