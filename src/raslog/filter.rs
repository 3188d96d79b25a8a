//! Stage 4: evaluation window, ignore exclusion and co-event collapse.
//!
//! A single port event is often logged once per device logged in behind the
//! port. Rows that agree on everything except the device fan-out columns are
//! collapsed into one, with the fan-out values concatenated and deduplicated.
//! Device location and subtype are collapsed the same way so the monthly
//! counter keeps them.

use super::correlate::CorrelatedEvent;
use super::dates::window_start;
use super::extract::ExtractedFields;
use super::record::{MessageStatus, Severity, SwitchKey};
use crate::config::MalformedDatePolicy;
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Stand-in for a missing fan-out value while cells are concatenated.
///
/// Angle brackets never occur in switch, port or host names.
pub const PLACEHOLDER: &str = "<null>";

/// Separator between concatenated fan-out values.
pub const FANOUT_SEPARATOR: &str = ", ";

/// Everything that identifies one logical event. Fan-out columns are excluded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventIdentity {
    pub switch: SwitchKey,
    pub switch_wwn: Option<String>,
    pub fabric_name: Option<String>,
    pub fabric_label: Option<String>,
    pub config_collection_date: Option<NaiveDateTime>,
    pub message_date: Option<NaiveDateTime>,
    pub message_id: String,
    pub severity: Severity,
    pub message_text: String,
    pub security_audit_flag: Option<String>,
    pub fields: ExtractedFields,
    pub status: MessageStatus,
    pub port_type: Option<String>,
    pub port_state: Option<String>,
    pub speed: Option<String>,
}

impl EventIdentity {
    fn of(ev: &CorrelatedEvent) -> Self {
        let labeled = &ev.event.labeled;
        Self {
            switch: labeled.record.switch.clone(),
            switch_wwn: labeled.switch_wwn.clone(),
            fabric_name: labeled.fabric_name.clone(),
            fabric_label: labeled.fabric_label.clone(),
            config_collection_date: labeled.config_collection_date,
            message_date: labeled.message_date,
            message_id: labeled.record.message_id.clone(),
            severity: labeled.record.severity,
            message_text: labeled.record.message_text.clone(),
            security_audit_flag: labeled.record.security_audit_flag.clone(),
            fields: ev.event.fields.clone(),
            status: ev.event.status,
            port_type: ev.device.port_type.clone(),
            port_state: ev.device.port_state.clone(),
            speed: ev.device.speed.clone(),
        }
    }
}

/// Collapsed device fan-out. Cells hold `", "`-joined, deduplicated values,
/// with [`PLACEHOLDER`] standing in for missing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FanOut {
    pub connected_port_id: String,
    pub connected_port_wwn: String,
    pub device_host_name_port: String,
    pub device_location: String,
    pub device_type: String,
    pub device_subtype: String,
}

/// Event that survived the window and ignore tests, after collapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredEvent {
    pub identity: EventIdentity,
    pub fan_out: FanOut,
}

/// Window + collapse settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalFilter {
    pub window_months: u32,
    pub malformed_dates: MalformedDatePolicy,
}

impl TemporalFilter {
    pub fn new(window_months: u32, malformed_dates: MalformedDatePolicy) -> Self {
        Self {
            window_months,
            malformed_dates,
        }
    }

    /// `message_date >= collection_date - window_months`, compared on calendar dates.
    ///
    /// A missing or unparseable date on either side defers to the malformed-date policy.
    pub fn in_window(
        &self,
        message_date: Option<NaiveDateTime>,
        collection_date: Option<NaiveDateTime>,
    ) -> bool {
        let start = collection_date.and_then(|c| window_start(c.date(), self.window_months));
        match (message_date, start) {
            (Some(message), Some(start)) => message.date() >= start,
            _ => self.malformed_dates == MalformedDatePolicy::Retain,
        }
    }

    pub fn apply(&self, events: &[CorrelatedEvent]) -> Vec<FilteredEvent> {
        let mut outside = 0usize;
        let mut ignored = 0usize;

        let mut order: Vec<EventIdentity> = Vec::new();
        let mut groups: HashMap<EventIdentity, Vec<&CorrelatedEvent>> = HashMap::new();

        for ev in events {
            let labeled = &ev.event.labeled;
            if !self.in_window(labeled.message_date, labeled.config_collection_date) {
                outside += 1;
                continue;
            }
            if ev.event.status == MessageStatus::Ignored {
                ignored += 1;
                continue;
            }

            let identity = EventIdentity::of(ev);
            match groups.get_mut(&identity) {
                Some(members) => members.push(ev),
                None => {
                    groups.insert(identity.clone(), vec![ev]);
                    order.push(identity);
                }
            }
        }

        let filtered: Vec<FilteredEvent> = order
            .into_iter()
            .filter_map(|identity| {
                let members = groups.remove(&identity)?;
                Some(FilteredEvent {
                    fan_out: collapse(&members),
                    identity,
                })
            })
            .collect();

        debug!(
            outside_window = outside,
            ignored,
            rows_out = filtered.len(),
            "temporal filter applied"
        );
        filtered
    }
}

fn collapse(members: &[&CorrelatedEvent]) -> FanOut {
    let column = |get: fn(&CorrelatedEvent) -> Option<&str>| {
        dedup_cell(&concat_cells(members.iter().map(|ev| get(*ev))))
    };
    FanOut {
        connected_port_id: column(|ev| ev.device.connected_port_id.as_deref()),
        connected_port_wwn: column(|ev| ev.device.connected_port_wwn.as_deref()),
        device_host_name_port: column(|ev| ev.device_host_name_port.as_deref()),
        device_location: column(|ev| ev.device.device_location.as_deref()),
        device_type: column(|ev| ev.device.device_type.as_deref()),
        device_subtype: column(|ev| ev.device.device_subtype.as_deref()),
    }
}

/// Join group values with [`FANOUT_SEPARATOR`], missing values as [`PLACEHOLDER`].
pub fn concat_cells<'a>(values: impl Iterator<Item = Option<&'a str>>) -> String {
    values
        .map(|v| v.unwrap_or(PLACEHOLDER))
        .collect::<Vec<_>>()
        .join(FANOUT_SEPARATOR)
}

/// Split a concatenated cell, drop duplicates and rejoin in sorted order.
pub fn dedup_cell(cell: &str) -> String {
    cell.split(FANOUT_SEPARATOR)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(FANOUT_SEPARATOR)
}
