//! Validates an already-parsed [`DailyProductionLoad`] against
//! [`CycleTimeConstants`] and [`OperatorInputs`]. Parsing itself (Excel,
//! YAML) is out of scope; this operates purely on in-memory domain types.

use crate::calendar::is_business_day;
use crate::cell::{CellColor, TableIndex};
use crate::config::{mold_depth, CycleTimeConstants, MoldDepth};
use crate::job::{DailyProductionLoad, Job, MoldType, OperatorInputs};
use crate::resource::{mold_requirement, MoldPart};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    pub job_id: Option<String>,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub job_id: Option<String>,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationWarning>,
    pub valid_job_ids: Vec<String>,
    pub invalid_job_ids: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn add_error(&mut self, job_id: Option<&str>, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            job_id: job_id.map(String::from),
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn add_warning(&mut self, job_id: Option<&str>, field: &str, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            job_id: job_id.map(String::from),
            field: field.to_string(),
            message: message.into(),
        });
    }
}

const WEEKDAY_NAMES: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

fn mold_part_name(part: MoldPart) -> Option<&'static str> {
    match part {
        MoldPart::Deep => Some(CycleTimeConstants::DEEP_MOLD),
        MoldPart::DeepDouble2cc => Some(CycleTimeConstants::DEEP_DOUBLE2CC_MOLD),
        MoldPart::ThreeInUrethane => Some(CycleTimeConstants::THREE_IN_URETHANE_MOLD),
        MoldPart::Double2cc => Some(CycleTimeConstants::DOUBLE2CC_MOLD),
        // CellColor-keyed molds depend on which cell a job ultimately lands
        // on, which validation (unlike assignment) does not decide.
        MoldPart::CellColor => None,
    }
}

fn validate_mold_requirements(job: &Job, config: &CycleTimeConstants, result: &mut ValidationResult) {
    let requirement = mold_requirement(job);
    for (part, count) in requirement.parts {
        if count == 0 {
            continue;
        }
        if let Some(name) = mold_part_name(part) {
            if !config.molds.contains_key(name) {
                result.add_error(
                    Some(&job.id),
                    "mold_type",
                    format!("required mold {name} is not defined in this run's configuration"),
                );
            }
        }
    }
}

fn validate_task_timing(job: &Job, config: &CycleTimeConstants, result: &mut ValidationResult) {
    if let Err(e) = config.get_task_timing(job.wire_diameter, job.equivalent) {
        result.add_error(Some(&job.id), "wire_diameter", e.to_string());
    }
}

fn validate_fixture(job: &Job, config: &CycleTimeConstants, result: &mut ValidationResult) {
    if !config.fixtures.contains_key(job.pattern.as_str()) {
        result.add_warning(
            Some(&job.id),
            "pattern",
            format!("no fixture concurrency limit configured for pattern {}", job.pattern),
        );
    }
}

fn validate_mold_type_count(job: &Job, result: &mut ValidationResult) {
    if !job.satisfies_mold_count_invariant() {
        result.add_error(
            Some(&job.id),
            "molds",
            format!("mold_type DOUBLE2CC requires molds >= 2, got {}", job.molds),
        );
    }
}

fn check_orange_warnings(job: &Job, result: &mut ValidationResult) {
    if job.molds >= 6 && !job.orange_eligible {
        result.add_warning(
            Some(&job.id),
            "orange_eligible",
            "job uses 6 or more molds but is not orange_eligible",
        );
    }
    if mold_depth(job.wire_diameter) == MoldDepth::Deep && job.orange_eligible {
        result.add_warning(
            Some(&job.id),
            "orange_eligible",
            "DEEP-depth jobs cannot run on ORANGE regardless of orange_eligible",
        );
    }
}

fn validate_on_table_today(
    load: &DailyProductionLoad,
    operator_inputs: &OperatorInputs,
    result: &mut ValidationResult,
) {
    let mut seen: HashSet<(CellColor, TableIndex)> = HashSet::new();
    for job in &load.jobs {
        let Some(pin) = job.on_table_today else { continue };
        if !seen.insert((pin.cell, pin.table)) {
            result.add_error(
                Some(&job.id),
                "on_table_today",
                format!("duplicate ON_TABLE_TODAY assignment for {} table {}", pin.cell, pin.table),
            );
        }
        if pin.cell == CellColor::Orange && !operator_inputs.is_cell_active(CellColor::Orange) {
            result.add_warning(
                Some(&job.id),
                "on_table_today",
                "job pinned to ORANGE but ORANGE is not an active cell",
            );
        }
        if !operator_inputs.is_cell_active(pin.cell) {
            result.add_warning(
                Some(&job.id),
                "on_table_today",
                format!("job pinned to inactive cell {}", pin.cell),
            );
        }
        if job.job_quantity_remaining.is_none() {
            result.add_error(
                Some(&job.id),
                "job_quantity_remaining",
                "ON_TABLE_TODAY jobs must carry job_quantity_remaining",
            );
        }
    }
}

fn validate_operator_inputs(operator_inputs: &OperatorInputs, result: &mut ValidationResult) {
    if operator_inputs.active_cells.is_empty() {
        result.add_error(None, "active_cells", "no active cells configured for this shift");
    }
    if operator_inputs.active_cells.contains(&CellColor::Orange)
        && !operator_inputs.orange_allow_3inurethane
        && !operator_inputs.orange_allow_double2cc
        && !operator_inputs.orange_allow_deep_double2cc
    {
        result.add_warning(
            None,
            "active_cells",
            "ORANGE is active but no specialty mold type opt-in flags are set",
        );
    }
}

fn validate_schedule_date(operator_inputs: &OperatorInputs, config: &CycleTimeConstants, result: &mut ValidationResult) {
    if !is_business_day(operator_inputs.schedule_date, &config.holidays) {
        let weekday = operator_inputs.schedule_date.format("%A").to_string();
        result.add_warning(
            None,
            "schedule_date",
            format!("schedule_date {} is not a business day ({weekday})", operator_inputs.schedule_date),
        );
    }
}

/// Full validation battery over an in-memory production load.
pub fn validate_production_load(
    load: &DailyProductionLoad,
    config: &CycleTimeConstants,
    operator_inputs: &OperatorInputs,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    validate_operator_inputs(operator_inputs, &mut result);
    validate_schedule_date(operator_inputs, config, &mut result);
    validate_on_table_today(load, operator_inputs, &mut result);

    let mut job_errors: HashMap<String, usize> = HashMap::new();
    for job in &load.jobs {
        let errors_before = result.errors.len();
        validate_task_timing(job, config, &mut result);
        validate_mold_requirements(job, config, &mut result);
        validate_mold_type_count(job, &mut result);
        validate_fixture(job, config, &mut result);
        check_orange_warnings(job, &mut result);
        job_errors.insert(job.id.clone(), result.errors.len() - errors_before);
    }

    for job in &load.jobs {
        if job_errors.get(&job.id).copied().unwrap_or(0) > 0 {
            result.invalid_job_ids.push(job.id.clone());
        } else {
            result.valid_job_ids.push(job.id.clone());
        }
    }

    result
}

/// Validates a single job without operator-run context (no active-cell
/// or schedule-date checks).
pub fn validate_single_job(job: &Job, config: &CycleTimeConstants) -> ValidationResult {
    let mut result = ValidationResult::default();
    validate_task_timing(job, config, &mut result);
    validate_mold_requirements(job, config, &mut result);
    validate_mold_type_count(job, &mut result);
    validate_fixture(job, config, &mut result);
    check_orange_warnings(job, &mut result);
    if result.errors.is_empty() {
        result.valid_job_ids.push(job.id.clone());
    } else {
        result.invalid_job_ids.push(job.id.clone());
    }
    result
}
