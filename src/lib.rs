//! raslog-audit - RASLog event frequency analysis for SAN audits
//!
//! Reads errdump and inventory tables collected from Brocade-style fabric
//! switches and reports which events keep recurring, per switch and port,
//! within the months before the configuration was collected.
//!
//! - **Extraction**: ordered, configurable regex rules turn free-form messages into columns
//! - **Correlation**: events are tied to the port and the device logged in behind it
//! - **Counting**: calendar-month buckets, noisiest conditions first
//! - **Reporting**: only non-informational buckets above the threshold
//!
//! # Quick Start
//!
//! ```ignore
//! use raslog_audit::{Config, RaslogAnalyzer};
//!
//! let config = Config::load(None)?;
//! let analyzer = RaslogAnalyzer::new(&config)?;
//! let output = analyzer.run(&inputs);
//! for (name, table) in output.tables() { /* ... */ }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod manifest;
pub mod observability;
pub mod raslog;
pub mod tables;

pub use config::Config;
pub use raslog::{AnalysisOutput, RaslogAnalyzer};
