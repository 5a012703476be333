//! Job records and operator-supplied run configuration.

use crate::cell::{CellColor, TableIndex};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Fixture pattern family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pattern {
    D,
    S,
    V,
}

impl Pattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::D => "D",
            Pattern::S => "S",
            Pattern::V => "V",
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mold type required by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MoldType {
    Standard,
    Double2cc,
    ThreeInUrethane,
}

/// Table a job was already set up on before this shift began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnTableToday {
    pub cell: CellColor,
    pub table: TableIndex,
}

/// Immutable job inputs plus operator-set mutable fields.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Job {
    pub id: String,
    pub req_by: NaiveDate,
    pub description: String,
    pub pattern: Pattern,
    pub opening_size: f64,
    pub wire_diameter: f64,
    pub molds: u32,
    pub mold_type: MoldType,
    pub prod_qty: u32,
    pub equivalent: f64,
    pub orange_eligible: bool,

    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub on_table_today: Option<OnTableToday>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub job_quantity_remaining: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub expedite: bool,

    #[cfg_attr(feature = "serde", serde(default))]
    pub row_number: u32,
}

impl Job {
    /// Fixture identifier: reusing the same fixture skips SETUP.
    pub fn fixture_id(&self) -> String {
        format!("{}-{}-{}", self.pattern, self.opening_size, self.wire_diameter)
    }

    /// Invariant: `mold_type == DOUBLE2CC => molds >= 2`.
    pub fn satisfies_mold_count_invariant(&self) -> bool {
        !matches!(self.mold_type, MoldType::Double2cc) || self.molds >= 2
    }
}

/// A shift's worth of jobs.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DailyProductionLoad {
    pub jobs: Vec<Job>,
}

impl DailyProductionLoad {
    pub fn get_job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Jobs currently pinned to a table, keyed by table id.
    pub fn jobs_on_tables(&self) -> Vec<(CellColor, TableIndex, &Job)> {
        self.jobs
            .iter()
            .filter_map(|j| j.on_table_today.map(|t| (t.cell, t.table, j)))
            .collect()
    }
}

/// Shift type selects available minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShiftType {
    Standard,
    Overtime,
}

/// Operator-supplied configuration for one run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperatorInputs {
    pub active_cells: HashSet<CellColor>,
    pub shift_type: ShiftType,
    pub summer_mode: bool,
    pub schedule_date: NaiveDate,
    pub orange_allow_3inurethane: bool,
    pub orange_allow_double2cc: bool,
    pub orange_allow_deep_double2cc: bool,
}

impl OperatorInputs {
    pub fn is_cell_active(&self, cell: CellColor) -> bool {
        self.active_cells.contains(&cell)
    }

    /// Whether `mold_type` may run on ORANGE under this run's opt-in flags.
    /// Other mold types are allowed on ORANGE by default.
    pub fn is_job_allowed_on_orange(&self, mold_type: MoldType) -> bool {
        match mold_type {
            MoldType::ThreeInUrethane => self.orange_allow_3inurethane,
            MoldType::Double2cc => self.orange_allow_double2cc,
            MoldType::Standard => true,
        }
    }
}
