//! Stage 3: attach port and device context from `portshow_aggregated`.
//!
//! Correlation is an ordered plan of [`CorrelationStep`]s. Join steps are all
//! executed by [`apply_tier`], parameterized by which key to match on, which
//! columns to copy and whether to fill gaps or merge. Adding a fallback tier
//! means adding a plan entry, not another join function.

use super::extract::ExtractedEvent;
use super::record::{PortInventoryRow, SwitchKey};
use std::collections::HashMap;
use tracing::debug;

/// Slot assumed for fixed-port switches that report no slot.
pub const DEFAULT_SLOT: &str = "0";

// ============================================================================
// Device info
// ============================================================================

/// Device and port columns copied from the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceInfo {
    pub connected_port_id: Option<String>,
    pub connected_port_wwn: Option<String>,
    pub device_host_name: Option<String>,
    pub device_port: Option<String>,
    pub device_location: Option<String>,
    pub device_type: Option<String>,
    pub device_subtype: Option<String>,
    pub port_type: Option<String>,
    pub port_state: Option<String>,
    pub speed: Option<String>,
}

impl DeviceInfo {
    pub fn from_row(row: &PortInventoryRow) -> Self {
        Self {
            connected_port_id: row.connected_port_id.clone(),
            connected_port_wwn: row.connected_port_wwn.clone(),
            device_host_name: row.device_host_name.clone(),
            device_port: row.device_port.clone(),
            device_location: row.device_location.clone(),
            device_type: row.device_type.clone(),
            device_subtype: row.device_subtype.clone(),
            port_type: row.port_type.clone(),
            port_state: row.port_state.clone(),
            speed: row.speed.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == DeviceInfo::default()
    }

    /// Whether a connected device is known, as opposed to port columns only.
    pub fn has_device(&self) -> bool {
        self.device_host_name.is_some() || self.connected_port_wwn.is_some()
    }

    /// Copy values from `other` into columns that are still empty.
    pub fn fill_from(&mut self, other: &DeviceInfo) {
        fill(&mut self.connected_port_id, &other.connected_port_id);
        fill(&mut self.connected_port_wwn, &other.connected_port_wwn);
        fill(&mut self.device_host_name, &other.device_host_name);
        fill(&mut self.device_port, &other.device_port);
        fill(&mut self.device_location, &other.device_location);
        fill(&mut self.device_type, &other.device_type);
        fill(&mut self.device_subtype, &other.device_subtype);
        fill(&mut self.port_type, &other.port_type);
        fill(&mut self.port_state, &other.port_state);
        fill(&mut self.speed, &other.speed);
    }

    /// Host name and device port joined for display.
    pub fn host_name_port(&self) -> Option<String> {
        match (&self.device_host_name, &self.device_port) {
            (Some(host), Some(port)) => Some(format!("{host} {port}")),
            (Some(host), None) => Some(host.clone()),
            (None, Some(port)) => Some(port.clone()),
            (None, None) => None,
        }
    }
}

fn fill(target: &mut Option<String>, source: &Option<String>) {
    if target.is_none() {
        target.clone_from(source);
    }
}

/// Extracted event with device context attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedEvent {
    pub event: ExtractedEvent,
    pub device: DeviceInfo,
    pub device_host_name_port: Option<String>,
}

impl CorrelatedEvent {
    pub fn new(event: ExtractedEvent) -> Self {
        Self {
            event,
            device: DeviceInfo::default(),
            device_host_name_port: None,
        }
    }

    pub fn switch(&self) -> &SwitchKey {
        &self.event.labeled.record.switch
    }
}

// ============================================================================
// Join tiers
// ============================================================================

/// Key an event and an inventory row are matched on, always scoped to the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKey {
    /// (switch, portIndex)
    PortIndex,
    /// (switch, slot, port)
    SlotPort,
    /// (switch, Connected_portId == Message_portId)
    ConnectedPortId,
}

type KeyValue = (SwitchKey, String, String);

impl JoinKey {
    fn event_key(&self, ev: &CorrelatedEvent) -> Option<KeyValue> {
        let fields = &ev.event.fields;
        let switch = ev.switch().clone();
        match self {
            JoinKey::PortIndex => fields
                .message_port_index
                .clone()
                .map(|index| (switch, index, String::new())),
            JoinKey::SlotPort => match (&fields.slot, &fields.port) {
                (Some(slot), Some(port)) => Some((switch, slot.clone(), port.clone())),
                _ => None,
            },
            JoinKey::ConnectedPortId => fields
                .message_port_id
                .as_deref()
                .map(|id| (switch, normalize_port_id(id), String::new())),
        }
    }

    fn row_key(&self, row: &PortInventoryRow) -> Option<KeyValue> {
        let switch = row.switch.clone();
        match self {
            JoinKey::PortIndex => row
                .port_index
                .clone()
                .map(|index| (switch, index, String::new())),
            JoinKey::SlotPort => match (&row.slot, &row.port) {
                (Some(slot), Some(port)) => Some((switch, slot.clone(), port.clone())),
                _ => None,
            },
            JoinKey::ConnectedPortId => row
                .connected_port_id
                .as_deref()
                .map(|id| (switch, normalize_port_id(id), String::new())),
        }
    }
}

/// Port ids show up as `0x010c00`, `010C00` or `10c00`.
fn normalize_port_id(id: &str) -> String {
    let trimmed = id.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("{:0>6}", digits.to_lowercase())
}

/// Whether a tier may overwrite what is already known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Take the first matching row, fill only empty columns
    Fill,
    /// Left join: one output row per matching inventory row, columns overwritten
    Merge,
}

/// Column group a tier copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinColumns {
    SlotPort,
    DeviceInfo,
    FabricLabel,
}

impl JoinColumns {
    /// Events a fill tier has anything to contribute to.
    fn has_gap(&self, ev: &CorrelatedEvent) -> bool {
        match self {
            JoinColumns::SlotPort => ev.event.fields.port.is_none(),
            JoinColumns::DeviceInfo => !ev.device.has_device(),
            JoinColumns::FabricLabel => {
                ev.event.labeled.fabric_name.is_none() || ev.event.labeled.fabric_label.is_none()
            }
        }
    }

    fn copy(&self, ev: &mut CorrelatedEvent, row: &PortInventoryRow, policy: JoinPolicy) {
        match (self, policy) {
            (JoinColumns::SlotPort, JoinPolicy::Fill) => {
                fill(&mut ev.event.fields.slot, &row.slot);
                fill(&mut ev.event.fields.port, &row.port);
            }
            (JoinColumns::SlotPort, JoinPolicy::Merge) => {
                ev.event.fields.slot.clone_from(&row.slot);
                ev.event.fields.port.clone_from(&row.port);
            }
            (JoinColumns::DeviceInfo, JoinPolicy::Fill) => {
                ev.device.fill_from(&DeviceInfo::from_row(row));
            }
            (JoinColumns::DeviceInfo, JoinPolicy::Merge) => {
                ev.device = DeviceInfo::from_row(row);
            }
            (JoinColumns::FabricLabel, JoinPolicy::Fill) => {
                fill(&mut ev.event.labeled.fabric_name, &row.fabric_name);
                fill(&mut ev.event.labeled.fabric_label, &row.fabric_label);
            }
            (JoinColumns::FabricLabel, JoinPolicy::Merge) => {
                ev.event.labeled.fabric_name.clone_from(&row.fabric_name);
                ev.event.labeled.fabric_label.clone_from(&row.fabric_label);
            }
        }
    }
}

/// One join against the port inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinTier {
    pub name: &'static str,
    pub key: JoinKey,
    pub columns: JoinColumns,
    pub policy: JoinPolicy,
    /// Only consider inventory rows with a known device name
    pub require_device: bool,
}

/// Execute one join tier. Unmatched events pass through unchanged.
pub fn apply_tier(
    events: Vec<CorrelatedEvent>,
    tier: &JoinTier,
    inventory: &[PortInventoryRow],
) -> Vec<CorrelatedEvent> {
    let mut index: HashMap<KeyValue, Vec<&PortInventoryRow>> = HashMap::new();
    for row in inventory {
        if tier.require_device && row.device_host_name.is_none() {
            continue;
        }
        if let Some(key) = tier.key.row_key(row) {
            index.entry(key).or_default().push(row);
        }
    }

    let mut matched = 0usize;
    let mut out = Vec::with_capacity(events.len());
    for mut ev in events {
        let eligible = tier.policy == JoinPolicy::Merge || tier.columns.has_gap(&ev);
        let rows = if eligible {
            tier.key.event_key(&ev).and_then(|key| index.get(&key))
        } else {
            None
        };

        match (rows, tier.policy) {
            (Some(rows), JoinPolicy::Merge) => {
                matched += 1;
                for row in rows {
                    let mut joined = ev.clone();
                    tier.columns.copy(&mut joined, row, JoinPolicy::Merge);
                    out.push(joined);
                }
            }
            (Some(rows), JoinPolicy::Fill) => {
                matched += 1;
                if let Some(row) = rows.first() {
                    tier.columns.copy(&mut ev, row, JoinPolicy::Fill);
                }
                out.push(ev);
            }
            (None, _) => out.push(ev),
        }
    }

    debug!(
        tier = tier.name,
        matched,
        rows_out = out.len(),
        "correlation tier applied"
    );
    out
}

// ============================================================================
// Correlation plan
// ============================================================================

/// One step of the correlation plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationStep {
    Join(JoinTier),
    /// Port known but slot missing: assume slot 0
    DefaultSlot,
}

/// The standard plan: index lookup, slot default, device merge, port-id fallback, fabric fill.
pub fn default_plan() -> Vec<CorrelationStep> {
    vec![
        CorrelationStep::Join(JoinTier {
            name: "port_index",
            key: JoinKey::PortIndex,
            columns: JoinColumns::SlotPort,
            policy: JoinPolicy::Fill,
            require_device: true,
        }),
        CorrelationStep::DefaultSlot,
        CorrelationStep::Join(JoinTier {
            name: "slot_port_device",
            key: JoinKey::SlotPort,
            columns: JoinColumns::DeviceInfo,
            policy: JoinPolicy::Merge,
            require_device: false,
        }),
        CorrelationStep::Join(JoinTier {
            name: "connected_port_id",
            key: JoinKey::ConnectedPortId,
            columns: JoinColumns::DeviceInfo,
            policy: JoinPolicy::Fill,
            require_device: false,
        }),
        CorrelationStep::Join(JoinTier {
            name: "fabric_label",
            key: JoinKey::SlotPort,
            columns: JoinColumns::FabricLabel,
            policy: JoinPolicy::Fill,
            require_device: false,
        }),
    ]
}

/// Runs a correlation plan against one port inventory.
pub struct DeviceCorrelator<'a> {
    inventory: &'a [PortInventoryRow],
    plan: Vec<CorrelationStep>,
}

impl<'a> DeviceCorrelator<'a> {
    pub fn new(inventory: &'a [PortInventoryRow]) -> Self {
        Self::with_plan(inventory, default_plan())
    }

    pub fn with_plan(inventory: &'a [PortInventoryRow], plan: Vec<CorrelationStep>) -> Self {
        Self { inventory, plan }
    }

    pub fn correlate(&self, events: Vec<ExtractedEvent>) -> Vec<CorrelatedEvent> {
        let mut events: Vec<CorrelatedEvent> = events.into_iter().map(CorrelatedEvent::new).collect();

        for step in &self.plan {
            events = match step {
                CorrelationStep::DefaultSlot => {
                    for ev in &mut events {
                        let fields = &mut ev.event.fields;
                        if fields.port.is_some() && fields.slot.is_none() {
                            fields.slot = Some(DEFAULT_SLOT.to_string());
                        }
                    }
                    events
                }
                CorrelationStep::Join(tier) => {
                    if tier.policy == JoinPolicy::Merge && !has_any_key(&events, tier.key) {
                        // an all-null key column would join nothing
                        debug!(tier = tier.name, "no event carries the join key, skipping");
                        events
                    } else {
                        apply_tier(events, tier, self.inventory)
                    }
                }
            };
        }

        for ev in &mut events {
            ev.device_host_name_port = ev.device.host_name_port();
        }
        events
    }
}

fn has_any_key(events: &[CorrelatedEvent], key: JoinKey) -> bool {
    events.iter().any(|ev| key.event_key(ev).is_some())
}
