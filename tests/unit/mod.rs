//! Unit tests for raslog-audit modules
//!
//! These tests drive the library API end to end without touching the CLI.

mod helpers;
mod test_config;
mod test_error_paths;
mod test_pipeline;
