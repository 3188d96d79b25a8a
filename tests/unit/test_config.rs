//! Unit tests for the config module
//!
//! Tests cover:
//! - AnalysisConfig defaults
//! - PatternConfig defaults and rule tables from TOML
//! - Loading from explicit paths
//! - Config flowing into the analyzer

use super::helpers::*;
use raslog_audit::config::{AnalysisConfig, Config, MalformedDatePolicy, PatternConfig};
use raslog_audit::raslog::extract::{default_rules, TargetField, DEFAULT_IGNORE_MESSAGE};
use raslog_audit::raslog::record::MessageStatus;
use raslog_audit::RaslogAnalyzer;
use std::fs;
use tempfile::tempdir;

// ============================================================================
// Defaults
// ============================================================================

mod default_tests {
    use super::*;

    #[test]
    fn test_analysis_defaults() {
        let analysis = AnalysisConfig::default();
        assert_eq!(analysis.window_months, 6);
        assert_eq!(analysis.threshold_count, 3);
        assert_eq!(analysis.malformed_dates, MalformedDatePolicy::Exclude);
        assert!(analysis.suppress_redundant_chassis);
    }

    #[test]
    fn test_pattern_defaults() {
        let patterns = PatternConfig::default();
        assert_eq!(patterns.ignore_message.as_deref(), Some(DEFAULT_IGNORE_MESSAGE));
        assert_eq!(patterns.rules, default_rules());
        assert!(patterns.enabled.is_none());
    }

    #[test]
    fn test_default_rule_names_are_unique() {
        let mut names: Vec<String> = default_rules().into_iter().map(|r| r.name).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}

// ============================================================================
// Loading
// ============================================================================

mod load_tests {
    use super::*;

    #[test]
    fn test_load_partial_file_keeps_default_rules() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raslog-audit.toml");
        fs::write(&path, "[analysis]\nwindow_months = 12\n").unwrap();

        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config.analysis.window_months, 12);
        assert_eq!(config.patterns.rules, default_rules());
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[analysis\nwindow_months = ").unwrap();
        let err = Config::load(path.to_str()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_load_zero_window_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zero.toml");
        fs::write(&path, "[analysis]\nwindow_months = 0\n").unwrap();
        assert!(Config::load(path.to_str()).is_err());
    }

    #[test]
    fn test_load_custom_rule_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(
            &path,
            r#"
[patterns]
ignore_message = "^AUDIT-"

[[patterns.rules]]
name = "fan"
regex = '(?i)fan (\d+) failed'
fields = ["obj"]
condition = "Fan failure"
"#,
        )
        .unwrap();

        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config.patterns.rules.len(), 1);
        assert_eq!(config.patterns.rules[0].fields, vec![TargetField::ObjectName]);

        let analyzer = RaslogAnalyzer::new(&config).unwrap();
        let (fields, status) = analyzer.patterns().extract_fields("EM-1034", "Fan 2 failed");
        assert_eq!(fields.condition.as_deref(), Some("Fan failure"));
        assert_eq!(fields.object_name.as_deref(), Some("2"));
        assert_eq!(status, MessageStatus::Extracted);
        assert!(analyzer.patterns().is_ignored("AUDIT-1"));
    }
}

// ============================================================================
// Analyzer wiring
// ============================================================================

mod wiring_tests {
    use super::*;

    #[test]
    fn test_window_setting_reaches_filter() {
        let mut config = Config::default();
        config.analysis.window_months = 1;
        let analyzer = RaslogAnalyzer::new(&config).unwrap();

        let sw = core();
        let out = analyzer.run(&inputs(
            vec![
                warning(&sw, "2024/05/20-10:00:00", "Recent"),
                warning(&sw, "2024/04/20-10:00:00", "Older"),
            ],
            &[sw.clone()],
            vec![],
        ));
        assert_eq!(out.raslog_counter.len(), 1);
        assert_eq!(out.raslog_counter[0].bucket.condition.as_deref(), Some("Recent"));
    }

    #[test]
    fn test_enabled_subset_limits_rules() {
        let mut config = Config::default();
        config.patterns.enabled = Some(vec!["port_id".to_string()]);
        let analyzer = RaslogAnalyzer::new(&config).unwrap();
        assert_eq!(analyzer.patterns().rules().len(), 1);
        assert_eq!(analyzer.patterns().rules()[0].name(), "port_id");
    }

    #[test]
    fn test_no_chassis_suppression() {
        let mut config = Config::default();
        config.analysis.suppress_redundant_chassis = false;
        let analyzer = RaslogAnalyzer::new(&config).unwrap();

        let sw = core();
        let records = repeat(4, |i| warning(&sw, &format!("2024/05/{:02}-10:00:00", i + 1), "Link Timeout"));
        let out = analyzer.run(&inputs(records, &[sw.clone()], vec![]));
        assert!(out.shape.keep_chassis_name);
    }
}
