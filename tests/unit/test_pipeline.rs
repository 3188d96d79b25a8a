//! End-to-end pipeline tests
//!
//! Tests cover:
//! - Extraction, copied fallback, monthly bucketing and chassis retention scenarios
//! - Window boundary and malformed dates
//! - Ignore list and severity suppression
//! - Threshold boundary
//! - Co-event collapse
//! - Idempotence and empty input

use super::helpers::*;
use raslog_audit::config::MalformedDatePolicy;
use raslog_audit::raslog::record::{InputTables, MessageStatus, Severity};
use raslog_audit::raslog::table::Table;
use raslog_audit::raslog::{ERRDUMP_AGGREGATED, RASLOG_COUNTER, RASLOG_REPORT};
use raslog_audit::{AnalysisOutput, Config, RaslogAnalyzer};

fn table<'a>(tables: &'a [(&'static str, Table)], name: &str) -> &'a Table {
    &tables
        .iter()
        .find(|(n, _)| *n == name)
        .expect("table present")
        .1
}

fn run(inputs: &InputTables) -> AnalysisOutput {
    analyzer().run(inputs)
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenario_tests {
    use super::*;

    #[test]
    fn test_port_message_is_extracted() {
        let sw = core();
        let out = run(&inputs(
            vec![warning(&sw, "2024/03/02-10:15:32", "PORT 12 (slot 3, port 12) is now ONLINE")],
            &[sw.clone()],
            vec![],
        ));

        assert_eq!(out.errdump_aggregated.len(), 1);
        let ev = &out.errdump_aggregated[0].event;
        assert_eq!(ev.fields.message_port_index.as_deref(), Some("12"));
        assert_eq!(ev.fields.slot.as_deref(), Some("3"));
        assert_eq!(ev.fields.port.as_deref(), Some("12"));
        assert_eq!(ev.status, MessageStatus::Extracted);
    }

    #[test]
    fn test_unrecognized_message_is_copied() {
        let sw = core();
        let text = "Unrecognized vendor diagnostic XYZ";
        let out = run(&inputs(
            vec![record(&sw, "VEND-0001", Severity::Warning, "2024/03/02-10:15:32", text)],
            &[sw.clone()],
            vec![],
        ));

        let ev = &out.errdump_aggregated[0].event;
        assert_eq!(ev.fields.condition.as_deref(), Some(text));
        assert_eq!(ev.status, MessageStatus::Copied);
    }

    #[test]
    fn test_same_month_events_share_a_bucket() {
        let sw = core();
        let out = run(&inputs(
            vec![
                warning(&sw, "2024/03/02-10:15:32", "Link Timeout on port 12"),
                warning(&sw, "2024/03/29-22:01:00", "Link Timeout on port 12"),
            ],
            &[sw.clone()],
            vec![],
        ));

        assert_eq!(out.raslog_counter.len(), 1);
        assert_eq!(out.raslog_counter[0].quantity, 2);
        let tables = out.tables();
        let counter = table(&tables, RASLOG_COUNTER);
        assert_eq!(counter.cell(0, "Message_date"), Some("2024-03"));
        assert_eq!(counter.cell(0, "Quantity"), Some("2"));
        assert_eq!(counter.cell(0, "config_collection_date"), Some("2024-06-15"));
    }

    #[test]
    fn test_chassis_column_kept_when_names_differ() {
        let sw = switch("DCX-01", "fab-a-core");
        let records = repeat(4, |i| {
            warning(&sw, &format!("2024/04/{:02}-08:00:00", i + 1), "Link Timeout on port 12")
        });
        let out = run(&inputs(records, &[sw.clone()], vec![]));

        assert_eq!(out.raslog_report.len(), 1);
        assert!(out.shape.keep_chassis_name);
        let tables = out.tables();
        let report = table(&tables, RASLOG_REPORT);
        assert_eq!(report.cell(0, "chassis_name"), Some("DCX-01"));
    }

    #[test]
    fn test_chassis_column_dropped_when_redundant() {
        let sw = core();
        let records = repeat(4, |i| {
            warning(&sw, &format!("2024/04/{:02}-08:00:00", i + 1), "Link Timeout on port 12")
        });
        let out = run(&inputs(records, &[sw.clone()], vec![]));

        assert!(!out.shape.keep_chassis_name);
        let tables = out.tables();
        let report = table(&tables, RASLOG_REPORT);
        assert!(report.column("chassis_name").is_none());
        assert_eq!(report.cell(0, "switchName"), Some("core-a"));
    }
}

// ============================================================================
// Window
// ============================================================================

mod window_tests {
    use super::*;

    #[test]
    fn test_six_month_boundary_inclusive() {
        let sw = core();
        let out = run(&inputs(
            vec![
                warning(&sw, "2023/12/15-00:00:01", "Inside the window"),
                warning(&sw, "2023/12/14-23:59:59", "Outside the window"),
            ],
            &[sw.clone()],
            vec![],
        ));

        assert_eq!(out.errdump_aggregated.len(), 2);
        assert_eq!(out.raslog_counter.len(), 1);
        assert_eq!(
            out.raslog_counter[0].bucket.condition.as_deref(),
            Some("Inside the window")
        );
    }

    #[test]
    fn test_malformed_date_excluded_by_default() {
        let sw = core();
        let out = run(&inputs(vec![warning(&sw, "not a date", "Link Timeout")], &[sw.clone()], vec![]));
        assert_eq!(out.errdump_aggregated.len(), 1);
        assert!(out.raslog_counter.is_empty());
    }

    #[test]
    fn test_malformed_date_retained_when_configured() {
        let mut config = Config::default();
        config.analysis.malformed_dates = MalformedDatePolicy::Retain;
        let analyzer = RaslogAnalyzer::new(&config).unwrap();

        let sw = core();
        let out = analyzer.run(&inputs(vec![warning(&sw, "not a date", "Link Timeout")], &[sw.clone()], vec![]));
        assert_eq!(out.raslog_counter.len(), 1);
        assert!(out.raslog_counter[0].bucket.month.is_none());
    }

    #[test]
    fn test_unlabeled_switch_has_no_anchor() {
        let sw = core();
        let out = run(&InputTables {
            errdump: vec![warning(&sw, "2024/05/01-10:00:00", "Link Timeout")],
            ..Default::default()
        });
        let labeled = &out.errdump_aggregated[0].event.labeled;
        assert!(labeled.switch_wwn.is_none());
        assert!(labeled.fabric_label.is_none());
        assert!(out.raslog_counter.is_empty());
    }
}

// ============================================================================
// Exclusion and thresholds
// ============================================================================

mod significance_tests {
    use super::*;

    fn month_of(n: usize, sw: &raslog_audit::raslog::record::SwitchKey, severity: Severity) -> Vec<raslog_audit::raslog::record::LogRecord> {
        repeat(n, |i| {
            record(
                sw,
                "C2-1012",
                severity,
                &format!("2024/05/10-{:02}:{:02}:{:02}", i / 3600, i / 60 % 60, i % 60),
                "Link Timeout on port 12",
            )
        })
    }

    #[test]
    fn test_quantity_three_not_significant() {
        let sw = core();
        let out = run(&inputs(month_of(3, &sw, Severity::Warning), &[sw.clone()], vec![]));
        assert_eq!(out.raslog_counter[0].quantity, 3);
        assert!(out.raslog_report.is_empty());
    }

    #[test]
    fn test_quantity_four_significant() {
        let sw = core();
        let out = run(&inputs(month_of(4, &sw, Severity::Warning), &[sw.clone()], vec![]));
        assert_eq!(out.raslog_report.len(), 1);
        assert_eq!(out.raslog_report[0].index, 0);
        assert_eq!(out.raslog_report[0].count.quantity, 4);
    }

    #[test]
    fn test_info_never_reported() {
        let sw = core();
        let out = run(&inputs(month_of(1000, &sw, Severity::Info), &[sw.clone()], vec![]));
        assert_eq!(out.raslog_counter.len(), 1);
        assert_eq!(out.raslog_counter[0].quantity, 1000);
        assert!(out.raslog_report.is_empty());
    }

    #[test]
    fn test_ignored_ids_never_counted() {
        let sw = core();
        let records = repeat(10, |i| {
            record(
                &sw,
                "SEC-3020",
                Severity::Info,
                &format!("2024/05/{:02}-09:00:00", i + 1),
                "Event: login, Status: success, Info: Successful login attempt via REMOTE",
            )
        });
        let out = run(&inputs(records, &[sw.clone()], vec![]));

        assert_eq!(out.errdump_aggregated.len(), 10);
        assert!(out
            .errdump_aggregated
            .iter()
            .all(|e| e.event.status == MessageStatus::Ignored));
        assert!(out.raslog_counter.is_empty());
        assert!(out.raslog_report.is_empty());
    }

    #[test]
    fn test_custom_threshold() {
        let mut config = Config::default();
        config.analysis.threshold_count = 1;
        let analyzer = RaslogAnalyzer::new(&config).unwrap();
        let sw = core();
        let out = analyzer.run(&inputs(month_of(2, &sw, Severity::Error), &[sw.clone()], vec![]));
        assert_eq!(out.raslog_report.len(), 1);
    }
}

// ============================================================================
// Correlation and collapse
// ============================================================================

mod collapse_tests {
    use super::*;

    #[test]
    fn test_two_devices_behind_one_port_collapse() {
        let sw = core();
        let out = run(&inputs(
            vec![warning(&sw, "2024/05/02-10:15:32", "PORT 12 (slot 0, port 12) is now OFFLINE")],
            &[sw.clone()],
            vec![
                port(&sw, "0", "12", "12", Some("wwn-b")),
                port(&sw, "0", "12", "12", Some("wwn-a")),
            ],
        ));

        assert_eq!(out.errdump_aggregated.len(), 2);
        assert_eq!(out.raslog_counter.len(), 1);
        let bucket = &out.raslog_counter[0].bucket;
        assert_eq!(bucket.connected_port_wwn.as_deref(), Some("wwn-a, wwn-b"));
        assert_eq!(bucket.device_host_name_port.as_deref(), Some("esx01"));
        assert_eq!(out.raslog_counter[0].quantity, 1);
    }

    #[test]
    fn test_device_location_reaches_counter() {
        let sw = core();
        let mut first = port(&sw, "0", "12", "12", Some("wwn-a"));
        first.device_location = Some("rack-7".to_string());
        let mut second = port(&sw, "0", "12", "12", Some("wwn-b"));
        second.device_location = Some("rack-9".to_string());

        let out = run(&inputs(
            vec![warning(&sw, "2024/05/02-10:15:32", "PORT 12 (slot 0, port 12) is now OFFLINE")],
            &[sw.clone()],
            vec![first, second],
        ));

        assert_eq!(out.raslog_counter.len(), 1);
        let tables = out.tables();
        let counter = table(&tables, RASLOG_COUNTER);
        assert_eq!(counter.cell(0, "Device_Location"), Some("rack-7, rack-9"));
        assert!(counter.column("deviceSubtype").is_none());
    }

    #[test]
    fn test_port_without_device_leaves_fan_out_null() {
        let sw = core();
        let out = run(&inputs(
            vec![warning(&sw, "2024/05/02-10:15:32", "PORT 7 (slot 0, port 7) is now OFFLINE")],
            &[sw.clone()],
            vec![port(&sw, "0", "7", "7", None)],
        ));

        let bucket = &out.raslog_counter[0].bucket;
        assert!(bucket.connected_port_wwn.is_none());
        assert_eq!(bucket.port_type.as_deref(), Some("F-Port"));
    }

    #[test]
    fn test_all_null_columns_dropped_from_counter() {
        let sw = core();
        let out = run(&inputs(
            vec![warning(&sw, "2024/05/02-10:15:32", "Link Timeout")],
            &[sw.clone()],
            vec![],
        ));
        let tables = out.tables();
        let counter = table(&tables, RASLOG_COUNTER);
        assert!(counter.column("Connected_portWwn").is_none());
        assert!(counter.column("Quantity").is_some());
        let aggregated = table(&tables, ERRDUMP_AGGREGATED);
        assert!(aggregated.column("Connected_portWwn").is_some());
    }
}

// ============================================================================
// Run-level properties
// ============================================================================

mod run_tests {
    use super::*;

    #[test]
    fn test_rerun_is_byte_identical() {
        let sw = core();
        let other = switch("core-b", "core-b");
        let mut records = repeat(5, |i| warning(&sw, &format!("2024/05/{:02}-10:00:00", i + 1), "Link Timeout"));
        records.extend(repeat(6, |i| {
            warning(&other, &format!("2024/04/{:02}-10:00:00", i + 1), "PORT 3 (slot 1, port 3) is now OFFLINE")
        }));
        let inputs = inputs(
            records,
            &[sw.clone(), other.clone()],
            vec![port(&other, "1", "3", "3", Some("wwn-x")), port(&other, "1", "3", "3", Some("wwn-y"))],
        );

        let first = run(&inputs);
        let second = run(&inputs);
        assert_eq!(first, second);
        for ((_, a), (_, b)) in first.tables().iter().zip(second.tables().iter()) {
            assert_eq!(a.to_csv().unwrap(), b.to_csv().unwrap());
        }
    }

    #[test]
    fn test_empty_input_produces_shaped_empty_tables() {
        let out = run(&InputTables::default());
        assert!(out.errdump_aggregated.is_empty());
        assert!(out.raslog_counter.is_empty());
        assert!(out.raslog_report.is_empty());

        let tables = out.tables();
        assert_eq!(tables.len(), 3);
        for (_, t) in &tables {
            assert!(t.is_empty());
            assert!(!t.columns.is_empty());
        }
    }

    #[test]
    fn test_counter_sorted_by_switch_then_quantity() {
        let a = switch("core-a", "core-a");
        let b = switch("core-b", "core-b");
        let mut records = repeat(2, |i| warning(&b, &format!("2024/05/{:02}-10:00:00", i + 1), "Quiet"));
        records.extend(repeat(1, |_| warning(&a, "2024/05/03-10:00:00", "Quiet")));
        records.extend(repeat(5, |i| warning(&a, &format!("2024/05/{:02}-11:00:00", i + 1), "Noisy")));
        let out = run(&inputs(records, &[a.clone(), b.clone()], vec![]));

        let order: Vec<(&str, u64)> = out
            .raslog_counter
            .iter()
            .map(|c| (c.bucket.switch.switch_name.as_str(), c.quantity))
            .collect();
        assert_eq!(order, vec![("core-a", 5), ("core-a", 1), ("core-b", 2)]);
    }
}
