//! Observability utilities.
//!
//! Runs are traced with `tracing` spans; lifecycle events go through
//! [`crate::events`]. This module only installs the subscriber.

mod subscriber;

pub use subscriber::{env_filter, init_tracing};
