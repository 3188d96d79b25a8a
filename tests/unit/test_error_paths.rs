//! Error path and edge case tests
//!
//! These tests focus on the fatal categories and their exit codes:
//! - Structural pattern misconfiguration
//! - Missing and malformed input tables
//! - Degraded data that must not become an error

use super::helpers::*;
use raslog_audit::config::Config;
use raslog_audit::errors::{
    get_exit_code, AuditError, InputError, PatternError, EXIT_CONFIG_ERROR, EXIT_INPUT_ERROR,
};
use raslog_audit::raslog::extract::{RuleSpec, TargetField};
use raslog_audit::raslog::record::{InputTables, Severity};
use raslog_audit::tables::load_inputs;
use raslog_audit::RaslogAnalyzer;
use std::fs;
use tempfile::tempdir;

fn rule(name: &str, regex: &str, fields: Vec<TargetField>) -> RuleSpec {
    RuleSpec {
        name: name.to_string(),
        regex: regex.to_string(),
        fields,
        condition: None,
    }
}

// ============================================================================
// Pattern misconfiguration
// ============================================================================

mod pattern_error_tests {
    use super::*;

    fn analyzer_error(config: &Config) -> AuditError {
        RaslogAnalyzer::new(config).unwrap_err()
    }

    #[test]
    fn test_invalid_regex_is_config_exit() {
        let mut config = Config::default();
        config.patterns.rules.push(rule("broken", "(unclosed", vec![TargetField::Port]));

        let err = analyzer_error(&config);
        assert!(matches!(err, AuditError::Pattern(PatternError::InvalidRegex { .. })));
        assert_eq!(get_exit_code(&err.into()), EXIT_CONFIG_ERROR);
    }

    #[test]
    fn test_unknown_enabled_rule() {
        let mut config = Config::default();
        config.patterns.enabled = Some(vec!["port_id".to_string(), "nope".to_string()]);
        let err = analyzer_error(&config);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_duplicate_rule_name() {
        let mut config = Config::default();
        let first = config.patterns.rules[0].clone();
        config.patterns.rules.push(first);
        assert!(matches!(
            analyzer_error(&config),
            AuditError::Pattern(PatternError::DuplicateRule { .. })
        ));
    }

    #[test]
    fn test_more_fields_than_groups() {
        let mut config = Config::default();
        config.patterns.rules = vec![rule("short", r"port (\d+)", vec![TargetField::Slot, TargetField::Port])];
        assert!(matches!(
            analyzer_error(&config),
            AuditError::Pattern(PatternError::GroupMismatch { fields: 2, groups: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        let mut config = Config::default();
        config.patterns.ignore_message = Some("[".to_string());
        assert!(matches!(
            analyzer_error(&config),
            AuditError::Pattern(PatternError::InvalidIgnorePattern(_))
        ));
    }
}

// ============================================================================
// Input tables
// ============================================================================

mod input_error_tests {
    use super::*;

    fn write_valid_tables(dir: &std::path::Path) {
        fs::write(dir.join("errdump.json"), "[]").unwrap();
        fs::write(dir.join("switchshow.json"), "[]").unwrap();
        fs::write(dir.join("switch_params_aggregated.json"), "[]").unwrap();
        fs::write(
            dir.join("portshow_aggregated.csv"),
            "configname,chassis_name,chassis_wwn,switchName,slot,port\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_empty_tables_load() {
        let dir = tempdir().unwrap();
        write_valid_tables(dir.path());
        let loaded = load_inputs(dir.path()).await.unwrap();
        assert!(loaded.tables.errdump.is_empty());
        assert!(loaded.tables.portshow.is_empty());
        assert_eq!(loaded.raw.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_portshow() {
        let dir = tempdir().unwrap();
        write_valid_tables(dir.path());
        fs::remove_file(dir.path().join("portshow_aggregated.csv")).unwrap();

        let err = load_inputs(dir.path()).await.unwrap_err();
        assert!(matches!(err, InputError::Missing { ref table, .. } if table == "portshow_aggregated"));
        let err: anyhow::Error = AuditError::from(err).into();
        assert_eq!(get_exit_code(&err), EXIT_INPUT_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_errdump() {
        let dir = tempdir().unwrap();
        write_valid_tables(dir.path());
        fs::write(dir.path().join("errdump.json"), "{\"not\": \"an array\"}").unwrap();

        let err = load_inputs(dir.path()).await.unwrap_err();
        assert!(matches!(err, InputError::Malformed { ref table, .. } if table == "errdump"));
    }
}

// ============================================================================
// Degraded data stays non-fatal
// ============================================================================

mod degraded_data_tests {
    use super::*;

    #[test]
    fn test_unknown_severity_and_bad_dates_do_not_fail() {
        let sw = core();
        let out = analyzer().run(&InputTables {
            errdump: vec![
                record(&sw, "X-1", Severity::Unknown, "", ""),
                record(&sw, "X-2", Severity::Critical, "31/31/2024", "PORT 99 (slot 9, port 99) is now FAULTY"),
            ],
            portshow: vec![port(&switch("other", "other"), "9", "99", "99", Some("wwn"))],
            ..Default::default()
        });
        assert_eq!(out.errdump_aggregated.len(), 2);
        assert!(out.raslog_report.is_empty());
    }
}
