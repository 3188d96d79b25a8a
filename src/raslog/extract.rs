//! Stage 2: pattern-driven field extraction.
//!
//! Every rule in the ordered [`PatternTable`] is tried against every message.
//! Rules are independent: each one that matches writes its captured groups into
//! its target fields, so a later rule overwrites a field an earlier rule set.
//! After all rules ran, the message is classified as extracted, copied or
//! ignored.

use super::labels::LabeledRecord;
use super::record::MessageStatus;
use crate::config::PatternConfig;
use crate::errors::PatternError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ============================================================================
// Target fields
// ============================================================================

/// Column a capture group can be written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetField {
    #[serde(rename = "Condition")]
    Condition,
    #[serde(rename = "Message_portIndex")]
    MessagePortIndex,
    #[serde(rename = "Message_portType")]
    MessagePortType,
    #[serde(rename = "slot")]
    Slot,
    #[serde(rename = "port")]
    Port,
    #[serde(rename = "Message_portId")]
    MessagePortId,
    #[serde(rename = "Current_value")]
    CurrentValue,
    #[serde(rename = "Dashboard_category")]
    DashboardCategory,
    #[serde(rename = "obj")]
    ObjectName,
}

impl TargetField {
    pub const ALL: [TargetField; 9] = [
        TargetField::Condition,
        TargetField::MessagePortIndex,
        TargetField::MessagePortType,
        TargetField::Slot,
        TargetField::Port,
        TargetField::MessagePortId,
        TargetField::CurrentValue,
        TargetField::DashboardCategory,
        TargetField::ObjectName,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            TargetField::Condition => "Condition",
            TargetField::MessagePortIndex => "Message_portIndex",
            TargetField::MessagePortType => "Message_portType",
            TargetField::Slot => "slot",
            TargetField::Port => "port",
            TargetField::MessagePortId => "Message_portId",
            TargetField::CurrentValue => "Current_value",
            TargetField::DashboardCategory => "Dashboard_category",
            TargetField::ObjectName => "obj",
        }
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// The fixed set of extracted columns. Unpopulated fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtractedFields {
    pub condition: Option<String>,
    pub message_port_index: Option<String>,
    pub message_port_type: Option<String>,
    pub slot: Option<String>,
    pub port: Option<String>,
    pub message_port_id: Option<String>,
    pub current_value: Option<String>,
    pub dashboard_category: Option<String>,
    pub object_name: Option<String>,
}

impl ExtractedFields {
    pub fn get(&self, field: TargetField) -> Option<&str> {
        match field {
            TargetField::Condition => self.condition.as_deref(),
            TargetField::MessagePortIndex => self.message_port_index.as_deref(),
            TargetField::MessagePortType => self.message_port_type.as_deref(),
            TargetField::Slot => self.slot.as_deref(),
            TargetField::Port => self.port.as_deref(),
            TargetField::MessagePortId => self.message_port_id.as_deref(),
            TargetField::CurrentValue => self.current_value.as_deref(),
            TargetField::DashboardCategory => self.dashboard_category.as_deref(),
            TargetField::ObjectName => self.object_name.as_deref(),
        }
    }

    pub fn set(&mut self, field: TargetField, value: String) {
        let slot = match field {
            TargetField::Condition => &mut self.condition,
            TargetField::MessagePortIndex => &mut self.message_port_index,
            TargetField::MessagePortType => &mut self.message_port_type,
            TargetField::Slot => &mut self.slot,
            TargetField::Port => &mut self.port,
            TargetField::MessagePortId => &mut self.message_port_id,
            TargetField::CurrentValue => &mut self.current_value,
            TargetField::DashboardCategory => &mut self.dashboard_category,
            TargetField::ObjectName => &mut self.object_name,
        };
        *slot = Some(value);
    }
}

// ============================================================================
// Rules
// ============================================================================

/// A rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub regex: String,
    #[serde(default)]
    pub fields: Vec<TargetField>,
    /// Canonical condition assigned on match. `$1`/`${name}` expand to
    /// capture groups; write `$$` for a literal dollar sign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl RuleSpec {
    fn new(name: &str, regex: &str, fields: &[TargetField], condition: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            regex: regex.to_string(),
            fields: fields.to_vec(),
            condition: condition.map(str::to_string),
        }
    }
}

/// Default message id ignore list: audit and login noise that is never actionable.
pub const DEFAULT_IGNORE_MESSAGE: &str =
    r"(?i)^(?:SEC-(?:1203|1307|3020|3021)|AUTH-1042|LOG-1000|ZONE-1022)$";

/// Built-in rule table, in application order.
pub fn default_rules() -> Vec<RuleSpec> {
    use TargetField::*;
    vec![
        RuleSpec::new(
            "port_index_slot_port",
            r"(?i)\bport (\d+)(?:\s*\(([a-z]+-?port)\))?\s*\(slot (\d+), port (\d+)\)",
            &[MessagePortIndex, MessagePortType, Slot, Port],
            None,
        ),
        RuleSpec::new(
            "port_id",
            r"(?i)\b(?:pid|port ?id)\s*[:=]?\s*(?:0x)?([0-9a-f]{6})\b",
            &[MessagePortId],
            None,
        ),
        RuleSpec::new(
            "port_state_change",
            r"(?i)\bis now (online|offline|faulty|disabled|enabled)\b",
            &[],
            Some("Port ${1}"),
        ),
        RuleSpec::new("maps_condition", r"(?i)\bcondition=([^,]+)", &[Condition], None),
        RuleSpec::new(
            "condition_port_index",
            r"(?i)\bport (\d+), condition=([^,]+)",
            &[MessagePortIndex, Condition],
            None,
        ),
        RuleSpec::new(
            "condition_slot_port",
            r"(?i)\bport (\d+)/(\d+), condition=([^,]+)",
            &[Slot, Port, Condition],
            None,
        ),
        RuleSpec::new(
            "maps_current_value",
            r"(?i)current value:\s*\[([^\]]+)\]",
            &[CurrentValue],
            None,
        ),
        RuleSpec::new(
            "bottleneck_detected",
            r"(?i)\blatency bottleneck (?:on|at) port (\d+)\.\s*([\d.]+ pct\. of \d+ secs)",
            &[MessagePortIndex, CurrentValue],
            Some("Latency bottleneck detected"),
        ),
        RuleSpec::new(
            "bottleneck_cleared",
            r"(?i)\blatency bottleneck (?:on|at) port (\d+) (?:is )?cleared",
            &[MessagePortIndex],
            Some("Latency bottleneck cleared"),
        ),
        RuleSpec::new(
            "bottleneck_severe",
            r"(?i)severe latency bottleneck detected at slot (\d+) port (\d+)(?:.*?credit stall of (\d+(?:\.\d+)? ?ms))?",
            &[Slot, Port, CurrentValue],
            Some("Severe latency bottleneck"),
        ),
        RuleSpec::new(
            "maps_dashboard_category",
            r"(?i)dashboard category=([^.,]+)",
            &[DashboardCategory],
            None,
        ),
        RuleSpec::new(
            "maps_object",
            r"(?i)^(?:\[[\w-]+\],\s*)?([^,\[\]]+?),\s*condition=",
            &[ObjectName],
            None,
        ),
        RuleSpec::new(
            "slow_drain_device",
            r"(?i)\bslot (\d+),? port (\d+) is a slow drain device",
            &[Slot, Port],
            Some("Slow drain device"),
        ),
    ]
}

/// A compiled extraction rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    name: String,
    regex: Regex,
    fields: Vec<TargetField>,
    condition: Option<String>,
}

impl PatternRule {
    pub fn compile(spec: &RuleSpec) -> Result<Self, PatternError> {
        if spec.fields.is_empty() && spec.condition.is_none() {
            return Err(PatternError::EmptyRule {
                name: spec.name.clone(),
            });
        }

        let regex = Regex::new(&spec.regex).map_err(|source| PatternError::InvalidRegex {
            name: spec.name.clone(),
            source,
        })?;

        // captures_len counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if spec.fields.len() > groups {
            return Err(PatternError::GroupMismatch {
                name: spec.name.clone(),
                fields: spec.fields.len(),
                groups,
            });
        }

        Ok(Self {
            name: spec.name.clone(),
            regex,
            fields: spec.fields.clone(),
            condition: spec.condition.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regex(&self) -> &str {
        self.regex.as_str()
    }

    pub fn fields(&self) -> &[TargetField] {
        &self.fields
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Write this rule's captures into `out`. Returns whether the rule matched.
    ///
    /// Only groups that participated in the match are written.
    pub fn apply(&self, text: &str, out: &mut ExtractedFields) -> bool {
        let Some(caps) = self.regex.captures(text) else {
            return false;
        };

        for (i, field) in self.fields.iter().enumerate() {
            if let Some(m) = caps.get(i + 1) {
                let value = m.as_str().trim();
                if !value.is_empty() {
                    out.set(*field, value.to_string());
                }
            }
        }

        if let Some(template) = &self.condition {
            let mut condition = String::new();
            caps.expand(template, &mut condition);
            let condition = condition.trim();
            if !condition.is_empty() {
                out.set(TargetField::Condition, condition.to_string());
            }
        }

        true
    }
}

// ============================================================================
// Pattern table
// ============================================================================

/// Errdump record after extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEvent {
    pub labeled: LabeledRecord,
    pub fields: ExtractedFields,
    pub status: MessageStatus,
}

/// Ordered rule list plus the message id ignore pattern.
#[derive(Debug, Clone)]
pub struct PatternTable {
    rules: Vec<PatternRule>,
    ignore: Option<Regex>,
}

impl PatternTable {
    /// Compile and validate the configured rules.
    ///
    /// Any structural problem is fatal here, before a single record is read.
    pub fn compile(config: &PatternConfig) -> Result<Self, PatternError> {
        let mut seen = HashSet::new();
        for spec in &config.rules {
            if !seen.insert(spec.name.as_str()) {
                return Err(PatternError::DuplicateRule {
                    name: spec.name.clone(),
                });
            }
        }

        let selected: Vec<&RuleSpec> = match &config.enabled {
            Some(names) => names
                .iter()
                .map(|name| {
                    config
                        .rules
                        .iter()
                        .find(|spec| &spec.name == name)
                        .ok_or_else(|| PatternError::UnknownRule { name: name.clone() })
                })
                .collect::<Result<_, _>>()?,
            None => config.rules.iter().collect(),
        };

        let rules = selected
            .into_iter()
            .map(PatternRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let ignore = match config.ignore_message.as_deref() {
            Some(pattern) if !pattern.trim().is_empty() => {
                Some(Regex::new(pattern).map_err(PatternError::InvalidIgnorePattern)?)
            }
            _ => None,
        };

        Ok(Self { rules, ignore })
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn ignore_pattern(&self) -> Option<&str> {
        self.ignore.as_ref().map(Regex::as_str)
    }

    pub fn is_ignored(&self, message_id: &str) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|re| re.is_match(message_id.trim()))
    }

    /// Run every rule in order and classify the result.
    pub fn extract_fields(&self, message_id: &str, text: &str) -> (ExtractedFields, MessageStatus) {
        let mut fields = ExtractedFields::default();
        for rule in &self.rules {
            rule.apply(text, &mut fields);
        }

        let status = if self.is_ignored(message_id) {
            MessageStatus::Ignored
        } else if fields.condition.is_some() {
            MessageStatus::Extracted
        } else {
            fields.condition = Some(text.to_string());
            MessageStatus::Copied
        };

        (fields, status)
    }

    pub fn extract(&self, labeled: LabeledRecord) -> ExtractedEvent {
        let (fields, status) =
            self.extract_fields(&labeled.record.message_id, &labeled.record.message_text);
        ExtractedEvent {
            labeled,
            fields,
            status,
        }
    }

    pub fn extract_all(&self, records: Vec<LabeledRecord>) -> Vec<ExtractedEvent> {
        records.into_iter().map(|r| self.extract(r)).collect()
    }
}
