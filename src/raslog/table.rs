//! Column tables for the three pipeline outputs.
//!
//! Stage types stay strongly typed; they are flattened into a [`Table`] only
//! at the edge, where report hygiene (dropping all-null columns) and
//! serialization happen.

use super::classify::SignificantEvent;
use super::correlate::CorrelatedEvent;
use super::counter::MonthlyCount;
use crate::errors::OutputError;
use chrono::NaiveDateTime;
use serde_json::{Map, Value};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row type that can be flattened into named, nullable text cells.
pub trait TableRow {
    const COLUMNS: &'static [&'static str];

    /// One cell per entry of [`TableRow::COLUMNS`], same order.
    fn cells(&self) -> Vec<Option<String>>;
}

/// Ordered column names plus nullable text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn from_rows<T: TableRow>(rows: &[T]) -> Self {
        Self {
            columns: T::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: rows.iter().map(TableRow::cells).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row`, `column`; `None` for nulls and unknown columns.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Remove columns that are null in every row. An empty table keeps its schema.
    pub fn drop_empty_columns(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let keep: Vec<bool> = (0..self.columns.len())
            .map(|i| self.rows.iter().any(|r| r.get(i).is_some_and(Option::is_some)))
            .collect();
        self.retain_columns(&keep);
    }

    pub fn drop_column(&mut self, name: &str) {
        if let Some(idx) = self.column(name) {
            let keep: Vec<bool> = (0..self.columns.len()).map(|i| i != idx).collect();
            self.retain_columns(&keep);
        }
    }

    fn retain_columns(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    /// CSV with a header row; nulls become empty cells.
    pub fn to_csv(&self) -> Result<Vec<u8>, OutputError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        writer
            .into_inner()
            .map_err(|e| OutputError::Csv(e.into_error().into()))
    }

    /// One JSON object per row, nulls kept as `null`.
    pub fn to_json_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| {
                        let value = cell.clone().map(Value::String).unwrap_or(Value::Null);
                        (name.clone(), value)
                    })
                    .collect();
                Value::Object(object)
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, OutputError> {
        Ok(serde_json::to_vec_pretty(&self.to_json_records())?)
    }
}

fn datetime_cell(value: Option<NaiveDateTime>) -> Option<String> {
    value.map(|d| d.format(DATETIME_FORMAT).to_string())
}

// ============================================================================
// Row layouts
// ============================================================================

impl TableRow for CorrelatedEvent {
    const COLUMNS: &'static [&'static str] = &[
        "configname",
        "chassis_name",
        "chassis_wwn",
        "switchName",
        "switchWwn",
        "Fabric_name",
        "Fabric_label",
        "config_collection_date",
        "sequence",
        "Message_ID",
        "Severity",
        "Message_date",
        "Message",
        "Security_audit",
        "Condition",
        "Message_portIndex",
        "Message_portType",
        "slot",
        "port",
        "Message_portId",
        "Current_value",
        "Dashboard_category",
        "obj",
        "message_status",
        "portType",
        "portState",
        "speed",
        "Connected_portId",
        "Connected_portWwn",
        "Device_Host_Name",
        "Device_Port",
        "Device_Location",
        "deviceType",
        "deviceSubtype",
        "Device_Host_Name_Port",
    ];

    fn cells(&self) -> Vec<Option<String>> {
        let labeled = &self.event.labeled;
        let record = &labeled.record;
        let sw = &record.switch;
        let f = &self.event.fields;
        let d = &self.device;
        vec![
            Some(sw.configname.clone()),
            Some(sw.chassis_name.clone()),
            Some(sw.chassis_wwn.clone()),
            Some(sw.switch_name.clone()),
            labeled.switch_wwn.clone(),
            labeled.fabric_name.clone(),
            labeled.fabric_label.clone(),
            datetime_cell(labeled.config_collection_date),
            record.sequence.clone(),
            Some(record.message_id.clone()),
            Some(record.severity.to_string()),
            datetime_cell(labeled.message_date).or_else(|| Some(record.message_date.clone())),
            Some(record.message_text.clone()),
            record.security_audit_flag.clone(),
            f.condition.clone(),
            f.message_port_index.clone(),
            f.message_port_type.clone(),
            f.slot.clone(),
            f.port.clone(),
            f.message_port_id.clone(),
            f.current_value.clone(),
            f.dashboard_category.clone(),
            f.object_name.clone(),
            Some(self.event.status.to_string()),
            d.port_type.clone(),
            d.port_state.clone(),
            d.speed.clone(),
            d.connected_port_id.clone(),
            d.connected_port_wwn.clone(),
            d.device_host_name.clone(),
            d.device_port.clone(),
            d.device_location.clone(),
            d.device_type.clone(),
            d.device_subtype.clone(),
            self.device_host_name_port.clone(),
        ]
    }
}

impl TableRow for MonthlyCount {
    const COLUMNS: &'static [&'static str] = &[
        "configname",
        "chassis_name",
        "chassis_wwn",
        "switchName",
        "switchWwn",
        "Fabric_name",
        "Fabric_label",
        "config_collection_date",
        "Message_date",
        "Message_ID",
        "Severity",
        "Message_portIndex",
        "Message_portType",
        "slot",
        "port",
        "Message_portId",
        "Condition",
        "Dashboard_category",
        "obj",
        "message_status",
        "portType",
        "portState",
        "speed",
        "Connected_portId",
        "Connected_portWwn",
        "Device_Host_Name_Port",
        "Device_Location",
        "deviceType",
        "deviceSubtype",
        "Quantity",
    ];

    fn cells(&self) -> Vec<Option<String>> {
        let b = &self.bucket;
        vec![
            Some(b.switch.configname.clone()),
            Some(b.switch.chassis_name.clone()),
            Some(b.switch.chassis_wwn.clone()),
            Some(b.switch.switch_name.clone()),
            b.switch_wwn.clone(),
            b.fabric_name.clone(),
            b.fabric_label.clone(),
            b.config_collection_date.map(|d| d.to_string()),
            b.month.map(|m| m.to_string()),
            Some(b.message_id.clone()),
            Some(b.severity.to_string()),
            b.message_port_index.clone(),
            b.message_port_type.clone(),
            b.slot.clone(),
            b.port.clone(),
            b.message_port_id.clone(),
            b.condition.clone(),
            b.dashboard_category.clone(),
            b.object_name.clone(),
            Some(b.status.to_string()),
            b.port_type.clone(),
            b.port_state.clone(),
            b.speed.clone(),
            b.connected_port_id.clone(),
            b.connected_port_wwn.clone(),
            b.device_host_name_port.clone(),
            b.device_location.clone(),
            b.device_type.clone(),
            b.device_subtype.clone(),
            Some(self.quantity.to_string()),
        ]
    }
}

/// Report rows lead with their index; the rest mirrors [`MonthlyCount`].
const REPORT_COLUMNS: [&str; 31] = [
    "index",
    "configname",
    "chassis_name",
    "chassis_wwn",
    "switchName",
    "switchWwn",
    "Fabric_name",
    "Fabric_label",
    "config_collection_date",
    "Message_date",
    "Message_ID",
    "Severity",
    "Message_portIndex",
    "Message_portType",
    "slot",
    "port",
    "Message_portId",
    "Condition",
    "Dashboard_category",
    "obj",
    "message_status",
    "portType",
    "portState",
    "speed",
    "Connected_portId",
    "Connected_portWwn",
    "Device_Host_Name_Port",
    "Device_Location",
    "deviceType",
    "deviceSubtype",
    "Quantity",
];

impl TableRow for SignificantEvent {
    const COLUMNS: &'static [&'static str] = &REPORT_COLUMNS;

    fn cells(&self) -> Vec<Option<String>> {
        let mut cells = Vec::with_capacity(REPORT_COLUMNS.len());
        cells.push(Some(self.index.to_string()));
        cells.extend(self.count.cells());
        cells
    }
}
