//! Stage 1: attach switch WWN and fabric context to raw errdump records.

use super::dates::parse_timestamp;
use super::record::{FabricContext, LogRecord, SwitchKey, SwitchshowRow};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use tracing::debug;

/// Errdump record with switch identity resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub record: LogRecord,
    pub switch_wwn: Option<String>,
    pub fabric_name: Option<String>,
    pub fabric_label: Option<String>,
    /// `None` when the raw value did not parse
    pub message_date: Option<NaiveDateTime>,
    pub config_collection_date: Option<NaiveDateTime>,
}

/// Join counters, reported by the pipeline at `info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelStats {
    pub unresolved_wwn: usize,
    pub unlabeled: usize,
    pub malformed_dates: usize,
}

/// Left-join errdump rows onto `switchshow` and `switch_params_aggregated`.
///
/// Unresolved joins leave fields empty; no record is dropped.
pub fn label_records(
    records: &[LogRecord],
    switchshow: &[SwitchshowRow],
    fabrics: &[FabricContext],
) -> (Vec<LabeledRecord>, LabelStats) {
    let mut wwns: HashMap<&SwitchKey, Option<&str>> = HashMap::new();
    for row in switchshow {
        wwns.entry(&row.switch)
            .or_insert_with(|| row.switch_wwn.as_deref());
    }

    let mut chassis: HashMap<(&str, &str, &str), Vec<&FabricContext>> = HashMap::new();
    for row in fabrics {
        chassis.entry(row.switch.chassis()).or_default().push(row);
    }

    let mut stats = LabelStats::default();
    let labeled = records
        .iter()
        .map(|record| {
            let switch_wwn = wwns
                .get(&record.switch)
                .copied()
                .flatten()
                .map(str::to_string);
            if switch_wwn.is_none() {
                stats.unresolved_wwn += 1;
            }

            let fabric = chassis.get(&record.switch.chassis()).and_then(|rows| {
                // A chassis may host several logical switches; prefer the one named in the record.
                rows.iter()
                    .find(|r| r.switch.switch_name == record.switch.switch_name)
                    .or_else(|| rows.first())
                    .copied()
            });
            if fabric.is_none() {
                stats.unlabeled += 1;
                debug!(switch = %record.switch, "no fabric context for switch");
            }

            let message_date = parse_timestamp(&record.message_date);
            if message_date.is_none() {
                stats.malformed_dates += 1;
            }

            LabeledRecord {
                record: record.clone(),
                switch_wwn,
                fabric_name: fabric.and_then(|f| f.fabric_name.clone()),
                fabric_label: fabric.and_then(|f| f.fabric_label.clone()),
                message_date,
                config_collection_date: fabric
                    .and_then(|f| f.config_collection_date.as_deref())
                    .and_then(parse_timestamp),
            }
        })
        .collect();

    (labeled, stats)
}
