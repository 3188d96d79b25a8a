//! Telemetry & Observability
//!
//! Provides structured logging and tracing for pipeline runs.
//! Features:
//! - One span per pipeline stage with rows in/out and timing
//! - Configurable log levels via RUST_LOG
//! - Compact text or JSON lines on stderr
//! - Control-character escaping for switch-supplied text

use std::time::Instant;
use tracing::{info, Span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line encoding on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable compact lines (default)
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Sanitize a string for safe log output by escaping control characters.
/// Prevents log injection where switch messages embed newlines to forge log entries.
pub fn sanitize_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            '\x1b' => out.push_str("\\e"),
            '\x00' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(c),
        }
    }
    out
}

/// Initialize global tracing subscriber with configurable output
/// By default, only enables tracing if RUST_LOG is explicitly set
pub fn init_tracing(format: LogFormat) {
    // If RUST_LOG not set, don't initialize tracing at all - keeps CLI output clean
    if let Ok(filter) = std::env::var("RUST_LOG") {
        init_tracing_with_filter(&filter, format);
    }
}

/// Initialize tracing for `--verbose`
pub fn init_tracing_verbose(format: LogFormat) {
    init_tracing_with_filter("info", format)
}

/// Initialize with custom filter string
pub fn init_tracing_with_filter(filter: &str, format: LogFormat) {
    // Skip if already initialized
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter_layer = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
        let registry = tracing_subscriber::registry().with(filter_layer);

        let _ = match format {
            LogFormat::Text => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_level(true)
                        .compact()
                        .with_writer(std::io::stderr), // Write to stderr, not stdout
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };
    });
}

/// Create a span for one pipeline stage; rows and timing are recorded on exit
#[macro_export]
macro_rules! stage_span {
    ($stage:expr) => {
        tracing::info_span!(
            "raslog_stage",
            stage = $stage,
            rows_in = tracing::field::Empty,
            rows_out = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        )
    };
}

/// Run one stage inside its span and log how many rows went in and came out.
pub fn run_stage<T>(stage: &str, rows_in: usize, f: impl FnOnce() -> Vec<T>) -> Vec<T> {
    let span = crate::stage_span!(stage);
    let _enter = span.enter();
    let start = Instant::now();

    let out = f();

    let duration = start.elapsed().as_millis() as u64;
    record_stage_rows(&span, rows_in, out.len(), duration);
    info!(rows_in, rows_out = out.len(), duration_ms = duration, "stage complete");
    out
}

fn record_stage_rows(span: &Span, rows_in: usize, rows_out: usize, duration_ms: u64) {
    span.record("rows_in", rows_in);
    span.record("rows_out", rows_out);
    span.record("duration_ms", duration_ms);
}

/// Initialize tracing for tests with a simple subscriber
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
