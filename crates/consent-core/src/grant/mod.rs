//! Access-grant records, lifecycle state machine, and wire types.
//!
//! An [`AccessGrant`] is a time-bound permission letting one requester read
//! specified data types for one patient. Its lifecycle:
//!
//! ```text
//! GrantRequest --> AccessGrant (pending)
//!                 |
//!                 v
//! policy accept --> approved --(sweep)--> expired
//!                 |           --(signal)-> revoked
//!                 v
//! policy reject --> rejected
//! ```
//!
//! # Key concepts
//!
//! - **Forward-only status**: a grant's status never moves backward, and
//!   terminal states are absorbing.
//! - **Optimistic versioning**: `version` is bumped by the store on every
//!   committed mutation; writers that lose a race get
//!   `ConcurrentModification` and must re-read.
//! - **UTC instants**: every timestamp is u64 Unix nanoseconds; wall-clock
//!   local time never enters the model.

mod error;
mod request;
mod state;

pub use error::GrantError;
pub use request::{
    AccessCheckResult, GrantRequest, GrantResource, format_rfc3339, parse_duration_secs,
};
pub use state::{AccessGrant, AccessLevel, GrantId, GrantStatus, RevocationReason, TimeWindow};
