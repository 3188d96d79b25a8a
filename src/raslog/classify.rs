//! Stage 6: pick the monthly buckets worth a reviewer's attention.

use super::counter::MonthlyCount;

/// Default occurrence threshold. A bucket must exceed it to be reported.
pub const DEFAULT_THRESHOLD: u64 = 3;

/// Report row with a contiguous 0-based index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignificantEvent {
    pub index: usize,
    pub count: MonthlyCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignificanceClassifier {
    pub threshold: u64,
}

impl Default for SignificanceClassifier {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SignificanceClassifier {
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    /// More than `threshold` occurrences and not informational.
    pub fn is_significant(&self, count: &MonthlyCount) -> bool {
        count.quantity > self.threshold && !count.bucket.severity.is_informational()
    }

    /// Filter `counts`, keeping their order, and re-index from zero.
    pub fn classify(&self, counts: &[MonthlyCount]) -> Vec<SignificantEvent> {
        counts
            .iter()
            .filter(|c| self.is_significant(c))
            .cloned()
            .enumerate()
            .map(|(index, count)| SignificantEvent { index, count })
            .collect()
    }
}

/// Presentation decisions for the report table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportShape {
    pub keep_chassis_name: bool,
}

impl ReportShape {
    /// Chassis names that differ from the switch name are always shown,
    /// whatever the redundancy preference says.
    pub fn for_report(events: &[SignificantEvent], suppress_redundant_chassis: bool) -> Self {
        let differs = events.iter().any(|e| {
            let switch = &e.count.bucket.switch;
            switch.chassis_name != switch.switch_name
        });
        Self {
            keep_chassis_name: !suppress_redundant_chassis || differs,
        }
    }
}
