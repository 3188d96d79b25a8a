//! raslog-audit command line
//!
//! Finds recurring switch events in collected SAN configuration data.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::errors::AuditError;
use crate::manifest::{self, ManifestRows, RunManifest};
use crate::observability::telemetry::{init_tracing, init_tracing_verbose, LogFormat};
use crate::raslog::RaslogAnalyzer;
use crate::tables::{self, OutputFormat};

#[derive(Parser)]
#[command(name = "raslog-audit")]
#[command(about = "Monthly frequency analysis of SAN switch RASLog events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Log pipeline progress to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analysis over a directory of input tables
    #[command(alias = "a")]
    Analyze {
        /// Directory holding errdump, switchshow, switch_params_aggregated and portshow_aggregated
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// Directory to write result tables into
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Result table encoding
        #[arg(short, long, value_enum, default_value = "csv")]
        format: OutputFormat,

        /// Re-run even if inputs and configuration are unchanged
        #[arg(long)]
        force: bool,
    },

    /// Show the extraction rules in application order
    Rules,

    /// Validate the configuration and pattern table
    CheckConfig,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize telemetry
    if cli.verbose {
        init_tracing_verbose(cli.log_format);
    } else {
        init_tracing(cli.log_format);
    }

    let config_path = cli.config.as_deref().map(expand_config_path);
    let config = Config::load(config_path.as_deref())?;

    match cli.command {
        Commands::Analyze {
            input,
            output,
            format,
            force,
        } => analyze(&config, &input, &output, format, force).await,
        Commands::Rules => print_rules(&config),
        Commands::CheckConfig => check_config(&config),
    }
}

/// Expand `~/` and make relative paths absolute.
fn expand_config_path(p: &str) -> String {
    let expanded = match p.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|h| h.join(rest).to_string_lossy().to_string())
            .unwrap_or_else(|| p.to_string()),
        None => p.to_string(),
    };

    if Path::new(&expanded).is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded).to_string_lossy().to_string())
            .unwrap_or(expanded)
    }
}

async fn analyze(
    config: &Config,
    input: &Path,
    output: &Path,
    format: OutputFormat,
    force: bool,
) -> Result<()> {
    let analyzer = RaslogAnalyzer::new(config)?;

    let loaded = tables::load_inputs(input)
        .await
        .map_err(AuditError::from)
        .with_context(|| format!("Failed to load input tables from {}", input.display()))?;

    let fingerprint = manifest::fingerprint(&loaded.raw, config, format)
        .map_err(|e| AuditError::Internal(format!("cannot serialize configuration: {e}")))?;
    let previous = manifest::read_manifest(output).await;
    let complete = manifest::outputs_present(output, format).await;
    if !manifest::should_run(previous.as_ref(), &fingerprint, complete, force) {
        println!(
            "Inputs and configuration unchanged since last run; outputs in {} are current (use --force to re-run)",
            output.display()
        );
        return Ok(());
    }

    let inputs = loaded.tables;
    let result = tokio::task::spawn_blocking(move || analyzer.run(&inputs))
        .await
        .map_err(|e| AuditError::Internal(format!("analysis task failed: {e}")))?;

    let out_tables = result.tables();
    let written = tables::write_outputs(output, &out_tables, format)
        .await
        .map_err(AuditError::from)?;

    let rows = ManifestRows {
        errdump_aggregated: result.errdump_aggregated.len(),
        raslog_counter: result.raslog_counter.len(),
        raslog_report: result.raslog_report.len(),
    };
    manifest::write_manifest(output, &RunManifest::new(fingerprint, rows.clone()))
        .await
        .map_err(AuditError::from)?;

    println!(
        "{} events aggregated, {} monthly buckets, {} significant ({} files written to {})",
        rows.errdump_aggregated,
        rows.raslog_counter,
        rows.raslog_report,
        written.len(),
        output.display()
    );
    Ok(())
}

fn print_rules(config: &Config) -> Result<()> {
    let analyzer = RaslogAnalyzer::new(config)?;
    let patterns = analyzer.patterns();

    println!("Extraction rules (applied in order, later matches overwrite earlier ones):");
    for (i, rule) in patterns.rules().iter().enumerate() {
        let fields: Vec<&str> = rule.fields().iter().map(|f| f.column()).collect();
        println!("{:>3}. {}", i + 1, rule.name());
        println!("     fields:    [{}]", fields.join(", "));
        if let Some(condition) = rule.condition() {
            println!("     condition: {}", condition);
        }
        println!("     regex:     {}", rule.regex());
    }
    match patterns.ignore_pattern() {
        Some(ignore) => println!("Ignored message ids: {}", ignore),
        None => println!("Ignored message ids: (none)"),
    }
    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    let analyzer = RaslogAnalyzer::new(config)?;
    let settings = analyzer.settings();
    println!(
        "Configuration OK: {} rules, window {} months, threshold > {}, malformed dates {}",
        analyzer.patterns().rules().len(),
        settings.window_months,
        settings.threshold_count,
        settings.malformed_dates
    );
    Ok(())
}
