//! Fixture builders for a small two-switch fabric.

use raslog_audit::raslog::record::{
    FabricContext, InputTables, LogRecord, PortInventoryRow, Severity, SwitchKey, SwitchshowRow,
};
use raslog_audit::{Config, RaslogAnalyzer};

pub const COLLECTED: &str = "2024-06-15 08:00:00";

pub fn switch(chassis: &str, name: &str) -> SwitchKey {
    SwitchKey::new("audit-2024", chassis, "10:00:00:05:1e:00:00:01", name)
}

pub fn core() -> SwitchKey {
    switch("core-a", "core-a")
}

pub fn record(sw: &SwitchKey, id: &str, severity: Severity, date: &str, text: &str) -> LogRecord {
    LogRecord {
        switch: sw.clone(),
        sequence: None,
        message_id: id.to_string(),
        severity,
        message_date: date.to_string(),
        message_text: text.to_string(),
        security_audit_flag: None,
    }
}

pub fn warning(sw: &SwitchKey, date: &str, text: &str) -> LogRecord {
    record(sw, "C2-1012", Severity::Warning, date, text)
}

pub fn switchshow(sw: &SwitchKey) -> SwitchshowRow {
    SwitchshowRow {
        switch: sw.clone(),
        switch_wwn: Some("10:00:00:05:1e:aa:bb:cc".to_string()),
    }
}

pub fn fabric(sw: &SwitchKey, label: &str) -> FabricContext {
    FabricContext {
        switch: sw.clone(),
        fabric_name: Some("prod".to_string()),
        fabric_label: Some(label.to_string()),
        config_collection_date: Some(COLLECTED.to_string()),
    }
}

pub fn port(sw: &SwitchKey, slot: &str, port: &str, index: &str, wwn: Option<&str>) -> PortInventoryRow {
    PortInventoryRow {
        switch: sw.clone(),
        slot: Some(slot.to_string()),
        port: Some(port.to_string()),
        port_index: Some(index.to_string()),
        port_type: Some("F-Port".to_string()),
        port_state: Some("Online".to_string()),
        speed: Some("N16".to_string()),
        connected_port_wwn: wwn.map(str::to_string),
        device_host_name: wwn.map(|_| "esx01".to_string()),
        device_type: wwn.map(|_| "Srv".to_string()),
        ..Default::default()
    }
}

/// Inputs for `records` on switches that all resolve to fabric A.
pub fn inputs(records: Vec<LogRecord>, switches: &[SwitchKey], ports: Vec<PortInventoryRow>) -> InputTables {
    InputTables {
        errdump: records,
        switchshow: switches.iter().map(switchshow).collect(),
        switch_params: switches.iter().map(|s| fabric(s, "A")).collect(),
        portshow: ports,
    }
}

pub fn analyzer() -> RaslogAnalyzer {
    RaslogAnalyzer::new(&Config::default()).expect("default config compiles")
}

pub fn repeat(n: usize, f: impl Fn(usize) -> LogRecord) -> Vec<LogRecord> {
    (0..n).map(f).collect()
}
