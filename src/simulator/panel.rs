//! Panel-level records produced by the timeline simulator.

use crate::cell::TableIndex;

/// One panel queued for a table: already-derived per-job cycle
/// parameters, so the simulator never touches `CycleTimeConstants`
/// directly.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelUnit {
    pub job_id: String,
    pub fixture_id: String,
    pub molds: u32,
    pub setup: i64,
    pub layout: i64,
    pub pour_per_mold: f64,
    pub cure: f64,
    pub unload: i64,
    /// Only consulted for ON_TABLE_TODAY start-condition selection on a
    /// table's very first panel; otherwise unused by the simulator.
    pub equivalent: f64,
    pub sched_qty: u32,
}

/// A completed panel with every phase boundary recorded.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduledPanel {
    pub job_id: String,
    pub table: TableIndex,
    pub panel_index: u32,
    pub setup_start: i64,
    pub setup_end: i64,
    pub layout_end: i64,
    pub pour_end: i64,
    pub cure_end: i64,
    pub unload_start: i64,
    pub unload_end: i64,
}

impl ScheduledPanel {
    /// First operator task start (SETUP if not skipped, else LAYOUT).
    pub fn start_time(&self) -> i64 {
        self.setup_start
    }

    pub fn end_time(&self) -> i64 {
        self.unload_end
    }

    /// Total minutes the operator spent on this panel (everything but CURE).
    pub fn operator_time(&self) -> i64 {
        (self.setup_end - self.setup_start)
            + (self.layout_end - self.setup_end)
            + (self.pour_end - self.layout_end)
            + (self.unload_end - self.unload_start)
    }

    pub fn cure_time(&self) -> i64 {
        self.cure_end - self.pour_end
    }

    /// True iff this panel's operator-occupied intervals overlap another's.
    /// Used only in tests — the engine's single simulated operator thread
    /// guarantees this never happens by construction.
    pub fn overlaps(&self, other: &ScheduledPanel) -> bool {
        let a_intervals = [
            (self.setup_start, self.setup_end),
            (self.setup_end, self.layout_end),
            (self.layout_end, self.pour_end),
            (self.unload_start, self.unload_end),
        ];
        let b_intervals = [
            (other.setup_start, other.setup_end),
            (other.setup_end, other.layout_end),
            (other.layout_end, other.pour_end),
            (other.unload_start, other.unload_end),
        ];
        a_intervals.iter().any(|&(a0, a1)| {
            b_intervals
                .iter()
                .any(|&(b0, b1)| a0 < b1 && b0 < a1 && a0 != a1 && b0 != b1)
        })
    }
}

/// Tomorrow's ON_TABLE_TODAY seed: SETUP+LAYOUT done with no POUR yet.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EndOfDayPrepPanel {
    pub job_id: String,
    pub table: TableIndex,
    pub fixture_id: String,
    pub setup_start: i64,
    pub setup_end: i64,
    pub layout_end: i64,
}
