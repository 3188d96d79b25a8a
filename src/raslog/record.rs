//! Input row types for the RASLog pipeline.
//!
//! Column names follow the upstream scanner tables (`errdump`, `switchshow`,
//! `switch_params_aggregated`, `portshow_aggregated`) so the rows can be
//! deserialized directly from their JSON or CSV exports.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// Switch identity
// ============================================================================

/// Composite identity of a logical switch inside one collected configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SwitchKey {
    pub configname: String,
    pub chassis_name: String,
    pub chassis_wwn: String,
    #[serde(rename = "switchName")]
    pub switch_name: String,
}

impl SwitchKey {
    pub fn new(configname: &str, chassis_name: &str, chassis_wwn: &str, switch_name: &str) -> Self {
        Self {
            configname: configname.to_string(),
            chassis_name: chassis_name.to_string(),
            chassis_wwn: chassis_wwn.to_string(),
            switch_name: switch_name.to_string(),
        }
    }

    /// Chassis part of the key; fabric context is joined on it.
    pub fn chassis(&self) -> (&str, &str, &str) {
        (&self.configname, &self.chassis_name, &self.chassis_wwn)
    }
}

impl fmt::Display for SwitchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}({})/{}",
            self.configname, self.chassis_name, self.chassis_wwn, self.switch_name
        )
    }
}

// ============================================================================
// Severity
// ============================================================================

/// RASLog message severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
    #[default]
    Unknown,
}

impl Severity {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "INFO" | "INFORMATIONAL" => Severity::Info,
            "WARNING" | "WARN" => Severity::Warning,
            "ERROR" | "ERR" => Severity::Error,
            "CRITICAL" | "CRIT" | "FATAL" => Severity::Critical,
            _ => Severity::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }

    /// Informational messages are never reported as significant.
    pub fn is_informational(&self) -> bool {
        matches!(self, Severity::Info)
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Severity::from_str(&s)
    }
}

impl From<Option<String>> for Severity {
    fn from(s: Option<String>) -> Self {
        s.map_or(Severity::Unknown, Severity::from)
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Message status
// ============================================================================

/// How the extractor handled a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// At least one rule populated the condition
    Extracted,
    /// No rule matched; the raw text is used as the condition
    Copied,
    /// Message id is on the ignore list
    Ignored,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Extracted => "extracted",
            MessageStatus::Copied => "copied",
            MessageStatus::Ignored => "ignored",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Input tables
// ============================================================================

/// One line of a switch's errdump ring buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(flatten)]
    pub switch: SwitchKey,
    /// External numbering column; never part of any grouping key
    #[serde(default, deserialize_with = "lenient_cell")]
    pub sequence: Option<String>,
    #[serde(rename = "Message_ID", default, deserialize_with = "lenient_text")]
    pub message_id: String,
    #[serde(rename = "Severity", default)]
    pub severity: Severity,
    /// Raw timestamp; empty when the export had none
    #[serde(rename = "Message_date", default, deserialize_with = "lenient_text")]
    pub message_date: String,
    #[serde(rename = "Message", default, deserialize_with = "lenient_text")]
    pub message_text: String,
    #[serde(rename = "Security_audit", default, deserialize_with = "lenient_cell")]
    pub security_audit_flag: Option<String>,
}

/// `switchshow` row, used only to resolve the switch WWN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchshowRow {
    #[serde(flatten)]
    pub switch: SwitchKey,
    #[serde(rename = "switchWwn", default, deserialize_with = "lenient_cell")]
    pub switch_wwn: Option<String>,
}

/// `switch_params_aggregated` row: fabric membership and collection date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricContext {
    #[serde(flatten)]
    pub switch: SwitchKey,
    #[serde(rename = "Fabric_name", default, deserialize_with = "lenient_cell")]
    pub fabric_name: Option<String>,
    #[serde(rename = "Fabric_label", default, deserialize_with = "lenient_cell")]
    pub fabric_label: Option<String>,
    #[serde(default, deserialize_with = "lenient_cell")]
    pub config_collection_date: Option<String>,
}

/// `portshow_aggregated` row: one port with whatever device is connected to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortInventoryRow {
    #[serde(flatten)]
    pub switch: SwitchKey,
    #[serde(default, deserialize_with = "lenient_cell")]
    pub slot: Option<String>,
    #[serde(default, deserialize_with = "lenient_cell")]
    pub port: Option<String>,
    #[serde(rename = "portIndex", default, deserialize_with = "lenient_cell")]
    pub port_index: Option<String>,
    #[serde(rename = "Index_slot_port", default, deserialize_with = "lenient_cell")]
    pub index_slot_port: Option<String>,
    #[serde(rename = "portType", default, deserialize_with = "lenient_cell")]
    pub port_type: Option<String>,
    #[serde(rename = "portState", default, deserialize_with = "lenient_cell")]
    pub port_state: Option<String>,
    #[serde(default, deserialize_with = "lenient_cell")]
    pub speed: Option<String>,
    #[serde(rename = "Connected_portId", default, deserialize_with = "lenient_cell")]
    pub connected_port_id: Option<String>,
    #[serde(rename = "Connected_portWwn", default, deserialize_with = "lenient_cell")]
    pub connected_port_wwn: Option<String>,
    #[serde(rename = "Device_Host_Name", default, deserialize_with = "lenient_cell")]
    pub device_host_name: Option<String>,
    #[serde(rename = "Device_Port", default, deserialize_with = "lenient_cell")]
    pub device_port: Option<String>,
    #[serde(rename = "Device_Location", default, deserialize_with = "lenient_cell")]
    pub device_location: Option<String>,
    #[serde(rename = "deviceType", default, deserialize_with = "lenient_cell")]
    pub device_type: Option<String>,
    #[serde(rename = "deviceSubtype", default, deserialize_with = "lenient_cell")]
    pub device_subtype: Option<String>,
    #[serde(rename = "Fabric_name", default, deserialize_with = "lenient_cell")]
    pub fabric_name: Option<String>,
    #[serde(rename = "Fabric_label", default, deserialize_with = "lenient_cell")]
    pub fabric_label: Option<String>,
}

/// The four already-materialized tables the pipeline consumes.
#[derive(Debug, Clone, Default)]
pub struct InputTables {
    pub errdump: Vec<LogRecord>,
    pub switchshow: Vec<SwitchshowRow>,
    pub switch_params: Vec<FabricContext>,
    pub portshow: Vec<PortInventoryRow>,
}

/// Accept strings, numbers and nulls for nullable text cells.
///
/// Scanner exports are not consistent about quoting port numbers, and blank
/// CSV cells must read as null.
fn lenient_cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Required text cells that may still arrive as null; null reads as empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_cell(deserializer)?.unwrap_or_default())
}
