//! Stage 5: count events per calendar month and descriptive bucket.

use super::dates::YearMonth;
use super::filter::{FilteredEvent, PLACEHOLDER};
use super::record::{MessageStatus, Severity, SwitchKey};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Grouping key of the monthly counter.
///
/// Message text and the measured value are left out on purpose: they vary
/// between occurrences of the same condition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountBucket {
    /// `None` only when malformed dates are retained
    pub month: Option<YearMonth>,
    pub switch: SwitchKey,
    pub switch_wwn: Option<String>,
    pub fabric_name: Option<String>,
    pub fabric_label: Option<String>,
    /// Collection date without time of day
    pub config_collection_date: Option<NaiveDate>,
    pub message_id: String,
    pub severity: Severity,
    pub message_port_index: Option<String>,
    pub message_port_type: Option<String>,
    pub slot: Option<String>,
    pub port: Option<String>,
    pub message_port_id: Option<String>,
    pub condition: Option<String>,
    pub dashboard_category: Option<String>,
    pub object_name: Option<String>,
    pub status: MessageStatus,
    pub port_type: Option<String>,
    pub port_state: Option<String>,
    pub speed: Option<String>,
    pub connected_port_id: Option<String>,
    pub connected_port_wwn: Option<String>,
    pub device_host_name_port: Option<String>,
    pub device_location: Option<String>,
    pub device_type: Option<String>,
    pub device_subtype: Option<String>,
}

impl CountBucket {
    fn of(ev: &FilteredEvent) -> Self {
        let id = &ev.identity;
        let f = &id.fields;
        Self {
            month: id.message_date.map(|d| YearMonth::of(d.date())),
            switch: id.switch.clone(),
            switch_wwn: id.switch_wwn.clone(),
            fabric_name: id.fabric_name.clone(),
            fabric_label: id.fabric_label.clone(),
            config_collection_date: id.config_collection_date.map(|d| d.date()),
            message_id: id.message_id.clone(),
            severity: id.severity,
            message_port_index: f.message_port_index.clone(),
            message_port_type: f.message_port_type.clone(),
            slot: f.slot.clone(),
            port: f.port.clone(),
            message_port_id: f.message_port_id.clone(),
            condition: f.condition.clone(),
            dashboard_category: f.dashboard_category.clone(),
            object_name: f.object_name.clone(),
            status: id.status,
            port_type: id.port_type.clone(),
            port_state: id.port_state.clone(),
            speed: id.speed.clone(),
            connected_port_id: Some(ev.fan_out.connected_port_id.clone()),
            connected_port_wwn: Some(ev.fan_out.connected_port_wwn.clone()),
            device_host_name_port: Some(ev.fan_out.device_host_name_port.clone()),
            device_location: Some(ev.fan_out.device_location.clone()),
            device_type: Some(ev.fan_out.device_type.clone()),
            device_subtype: Some(ev.fan_out.device_subtype.clone()),
        }
    }

    /// Turn placeholder-only fan-out cells back into nulls.
    fn revert_placeholders(&mut self) {
        for cell in [
            &mut self.connected_port_id,
            &mut self.connected_port_wwn,
            &mut self.device_host_name_port,
            &mut self.device_location,
            &mut self.device_type,
            &mut self.device_subtype,
        ] {
            if cell.as_deref() == Some(PLACEHOLDER) {
                *cell = None;
            }
        }
    }
}

/// Number of events in one bucket during one month. Always at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyCount {
    pub bucket: CountBucket,
    pub quantity: u64,
}

/// Bucket filtered events by calendar month and count them.
///
/// Output is sorted by chassis, fabric label, fabric name, switch and month,
/// then by descending quantity so the noisiest conditions come first.
pub fn count_monthly(events: &[FilteredEvent]) -> Vec<MonthlyCount> {
    let mut counts: HashMap<CountBucket, u64> = HashMap::new();
    for ev in events {
        if ev.identity.fields.condition.is_none() {
            continue;
        }
        *counts.entry(CountBucket::of(ev)).or_insert(0) += 1;
    }

    let mut rows: Vec<MonthlyCount> = counts
        .into_iter()
        .map(|(mut bucket, quantity)| {
            bucket.revert_placeholders();
            MonthlyCount { bucket, quantity }
        })
        .collect();
    rows.sort_by(report_order);
    rows
}

fn report_order(a: &MonthlyCount, b: &MonthlyCount) -> Ordering {
    let (x, y) = (&a.bucket, &b.bucket);
    x.switch
        .chassis_name
        .cmp(&y.switch.chassis_name)
        .then_with(|| nulls_last(&x.fabric_label, &y.fabric_label))
        .then_with(|| nulls_last(&x.fabric_name, &y.fabric_name))
        .then_with(|| x.switch.switch_name.cmp(&y.switch.switch_name))
        .then_with(|| nulls_last(&x.month, &y.month))
        .then_with(|| b.quantity.cmp(&a.quantity))
        .then_with(|| x.cmp(y))
}

fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
