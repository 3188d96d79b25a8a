//! Observability module
//!
//! Structured logging for pipeline runs: subscriber setup, per-stage spans
//! and sanitization of switch-supplied text.

pub mod telemetry;
