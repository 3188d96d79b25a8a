//! RASLog event frequency analysis
//!
//! Turns a SAN switch errdump into a short list of recurring, non-informational
//! events worth a reviewer's attention. The pipeline is six batch stages, each
//! fully materialized before the next one starts:
//!
//! 1. [`labels`]: resolve switch WWN and fabric context
//! 2. [`extract`]: regex field extraction against the ordered pattern table
//! 3. [`correlate`]: attach port and device context from the port inventory
//! 4. [`filter`]: evaluation window, ignore list, co-event collapse
//! 5. [`counter`]: per-month occurrence counts
//! 6. [`classify`]: significance threshold and report shaping
//!
//! No stage fails on bad data. Unresolved joins and unparseable dates become
//! nulls; only the pattern table can be rejected, and that happens in
//! [`RaslogAnalyzer::new`] before any record is looked at.

pub mod classify;
pub mod correlate;
pub mod counter;
pub mod dates;
pub mod extract;
pub mod filter;
pub mod labels;
pub mod record;
pub mod table;

use crate::config::{AnalysisConfig, Config};
use crate::errors::Result;
use crate::observability::telemetry::{run_stage, sanitize_for_log};
use classify::{ReportShape, SignificanceClassifier, SignificantEvent};
use correlate::{CorrelatedEvent, DeviceCorrelator};
use counter::{count_monthly, MonthlyCount};
use extract::PatternTable;
use filter::TemporalFilter;
use labels::{label_records, LabelStats};
use record::{InputTables, MessageStatus};
use table::Table;
use tracing::{debug, info};

pub const ERRDUMP_AGGREGATED: &str = "errdump_aggregated";
pub const RASLOG_COUNTER: &str = "raslog_counter";
pub const RASLOG_REPORT: &str = "raslog_report";

/// Every table a run writes, in output order.
pub const OUTPUT_TABLES: [&str; 3] = [ERRDUMP_AGGREGATED, RASLOG_COUNTER, RASLOG_REPORT];

/// Compiled pattern table plus analysis settings, ready to run.
#[derive(Debug)]
pub struct RaslogAnalyzer {
    patterns: PatternTable,
    analysis: AnalysisConfig,
}

/// The three result tables of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
    /// Every correlated event, before any filtering
    pub errdump_aggregated: Vec<CorrelatedEvent>,
    /// Every monthly bucket, informational ones included
    pub raslog_counter: Vec<MonthlyCount>,
    pub raslog_report: Vec<SignificantEvent>,
    pub shape: ReportShape,
}

impl RaslogAnalyzer {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let patterns = PatternTable::compile(&config.patterns)?;
        Ok(Self {
            patterns,
            analysis: config.analysis.clone(),
        })
    }

    pub fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    pub fn settings(&self) -> &AnalysisConfig {
        &self.analysis
    }

    pub fn run(&self, inputs: &InputTables) -> AnalysisOutput {
        info!(
            errdump = inputs.errdump.len(),
            switchshow = inputs.switchshow.len(),
            switch_params = inputs.switch_params.len(),
            portshow = inputs.portshow.len(),
            window_months = self.analysis.window_months,
            threshold = self.analysis.threshold_count,
            "starting raslog analysis"
        );

        let mut stats = LabelStats::default();
        let labeled = run_stage("label", inputs.errdump.len(), || {
            let (rows, s) = label_records(&inputs.errdump, &inputs.switchshow, &inputs.switch_params);
            stats = s;
            rows
        });
        info!(
            unresolved_wwn = stats.unresolved_wwn,
            unlabeled = stats.unlabeled,
            malformed_dates = stats.malformed_dates,
            "label join finished"
        );

        let extracted = run_stage("extract", labeled.len(), || self.patterns.extract_all(labeled));
        let copied = extracted
            .iter()
            .filter(|e| e.status == MessageStatus::Copied)
            .inspect(|e| {
                debug!(
                    message_id = %sanitize_for_log(&e.labeled.record.message_id),
                    message = %sanitize_for_log(&e.labeled.record.message_text),
                    "no rule matched, message copied"
                )
            })
            .count();
        let ignored = extracted
            .iter()
            .filter(|e| e.status == MessageStatus::Ignored)
            .count();
        info!(copied, ignored, "field extraction finished");

        let correlator = DeviceCorrelator::new(&inputs.portshow);
        let errdump_aggregated =
            run_stage("correlate", extracted.len(), || correlator.correlate(extracted));

        let temporal = TemporalFilter::new(self.analysis.window_months, self.analysis.malformed_dates);
        let filtered = run_stage("filter", errdump_aggregated.len(), || {
            temporal.apply(&errdump_aggregated)
        });

        let raslog_counter = run_stage("count", filtered.len(), || count_monthly(&filtered));

        let classifier = SignificanceClassifier::new(self.analysis.threshold_count);
        let raslog_report =
            run_stage("classify", raslog_counter.len(), || classifier.classify(&raslog_counter));
        let shape = ReportShape::for_report(&raslog_report, self.analysis.suppress_redundant_chassis);

        AnalysisOutput {
            errdump_aggregated,
            raslog_counter,
            raslog_report,
            shape,
        }
    }
}

impl AnalysisOutput {
    /// Output tables in write order, with report hygiene applied.
    pub fn tables(&self) -> Vec<(&'static str, Table)> {
        let aggregated = Table::from_rows(&self.errdump_aggregated);

        let mut counter = Table::from_rows(&self.raslog_counter);
        counter.drop_empty_columns();

        let mut report = Table::from_rows(&self.raslog_report);
        report.drop_empty_columns();
        if !self.shape.keep_chassis_name {
            report.drop_column("chassis_name");
        }

        vec![
            (ERRDUMP_AGGREGATED, aggregated),
            (RASLOG_COUNTER, counter),
            (RASLOG_REPORT, report),
        ]
    }
}
