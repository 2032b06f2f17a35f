//! # Observability
//!
//! Structured logging for the beam management model via `tracing`. The model
//! only emits events; hosts that already own a subscriber can skip
//! [`init_logging`] entirely.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
