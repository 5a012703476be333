//! Candidate mold allocations for a job on a cell: computed, never applied
//! to the pool directly (the caller reserves once it accepts the result).

use crate::cell::CellColor;
use crate::config::{mold_depth, CycleTimeConstants, MoldDepth};
use crate::derived::DerivedFields;
use crate::job::{Job, MoldType};
use crate::resource::pool::ResourcePool;
use std::collections::HashMap;

/// The `mold_name -> count` breakdown a job needs, before sourcing.
#[derive(Debug, Clone, PartialEq)]
pub struct MoldRequirement {
    pub depth: MoldDepth,
    /// Keyed by a sourcing placeholder: `"{CELL}"` stands for whichever
    /// concrete mold name [`allocate_molds_for_job`] sources for the STD
    /// color-mold portion. DEEP requirements use concrete names directly.
    pub parts: Vec<(MoldPart, u32)>,
}

/// One line item of a mold requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoldPart {
    /// The cell's own STD color mold (or `ORANGE_MOLD` on ORANGE), sourced
    /// via the priority ladder in [`allocate_molds_for_job`].
    CellColor,
    Deep,
    DeepDouble2cc,
    ThreeInUrethane,
    Double2cc,
}

/// The mold-assignment rule from §4.2, applied before any sourcing.
pub fn mold_requirement(job: &Job) -> MoldRequirement {
    let depth = mold_depth(job.wire_diameter);
    let molds = job.molds;

    let parts = match (depth, job.mold_type) {
        (MoldDepth::Deep, MoldType::Standard) => vec![(MoldPart::Deep, molds)],
        (MoldDepth::Deep, MoldType::Double2cc) | (MoldDepth::Deep, MoldType::ThreeInUrethane) => {
            vec![(MoldPart::Deep, molds.saturating_sub(1)), (MoldPart::DeepDouble2cc, 1)]
        }
        (MoldDepth::Std, MoldType::Standard) => vec![(MoldPart::CellColor, molds)],
        (MoldDepth::Std, MoldType::ThreeInUrethane) => vec![
            (MoldPart::CellColor, molds.saturating_sub(1)),
            (MoldPart::ThreeInUrethane, 1),
        ],
        (MoldDepth::Std, MoldType::Double2cc) => vec![
            (MoldPart::CellColor, molds.saturating_sub(2)),
            (MoldPart::Double2cc, 1),
        ],
    };

    MoldRequirement { depth, parts }
}

/// A candidate allocation: `mold_name -> count`, plus whether it is
/// satisfiable against the pool's current availability.
#[derive(Debug, Clone, PartialEq)]
pub struct MoldAllocation {
    pub assignments: HashMap<String, u32>,
    pub valid: bool,
    pub error: Option<String>,
}

impl MoldAllocation {
    fn invalid(error: impl Into<String>) -> Self {
        MoldAllocation {
            assignments: HashMap::new(),
            valid: false,
            error: Some(error.into()),
        }
    }
}

fn cell_color_mold_name(cell: CellColor) -> String {
    cell.mold_name()
}

fn part_name(part: MoldPart, cell: CellColor, config: &CycleTimeConstants) -> String {
    match part {
        MoldPart::CellColor => cell_color_mold_name(cell),
        MoldPart::Deep => CycleTimeConstants::DEEP_MOLD.to_string(),
        MoldPart::DeepDouble2cc => CycleTimeConstants::DEEP_DOUBLE2CC_MOLD.to_string(),
        MoldPart::ThreeInUrethane => CycleTimeConstants::THREE_IN_URETHANE_MOLD.to_string(),
        MoldPart::Double2cc => CycleTimeConstants::DOUBLE2CC_MOLD.to_string(),
    }
}

/// Computes a candidate allocation for `job` on `cell`. Does not mutate
/// `pool`. DEEP parts and specialty STD parts (3INURETHANE/DOUBLE2CC) are
/// drawn straight from their named pool; only the STD `CellColor` part
/// goes through the cell/common/inactive-cell sourcing ladder.
pub fn allocate_molds_for_job(
    job: &Job,
    _derived: &DerivedFields,
    cell: CellColor,
    config: &CycleTimeConstants,
    pool: &ResourcePool,
) -> MoldAllocation {
    let requirement = mold_requirement(job);
    let mut assignments: HashMap<String, u32> = HashMap::new();

    for (part, count) in requirement.parts {
        if count == 0 {
            continue;
        }
        let name = if part == MoldPart::CellColor {
            match pool.source_std_color_mold(config, cell, count) {
                Some(name) => name,
                None => {
                    return MoldAllocation::invalid(format!(
                        "no color mold available for cell {cell} ({count} needed)"
                    ))
                }
            }
        } else {
            part_name(part, cell, config)
        };

        let available = pool.mold_available(&name);
        if available < count {
            return MoldAllocation::invalid(format!(
                "insufficient {name}: need {count}, have {available}"
            ));
        }
        *assignments.entry(name).or_insert(0) += count;
    }

    MoldAllocation {
        assignments,
        valid: true,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MoldInfo, TaskTiming};
    use crate::job::Pattern;
    use crate::resource::pool::create_resource_pool;
    use std::collections::HashSet;

    fn job(mold_type: MoldType, wire_diameter: f64, molds: u32) -> Job {
        Job {
            id: "J1".to_string(),
            req_by: chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            description: String::new(),
            pattern: Pattern::D,
            opening_size: 0.5,
            wire_diameter,
            molds,
            mold_type,
            prod_qty: 10,
            equivalent: 1.0,
            orange_eligible: true,
            on_table_today: None,
            job_quantity_remaining: None,
            expedite: false,
            row_number: 0,
        }
    }

    #[test]
    fn deep_standard_uses_only_deep_mold() {
        let req = mold_requirement(&job(MoldType::Standard, 9.0, 3));
        assert_eq!(req.parts, vec![(MoldPart::Deep, 3)]);
    }

    #[test]
    fn deep_double2cc_splits_one_to_deep_double2cc() {
        let req = mold_requirement(&job(MoldType::Double2cc, 9.0, 3));
        assert_eq!(
            req.parts,
            vec![(MoldPart::Deep, 2), (MoldPart::DeepDouble2cc, 1)]
        );
    }

    #[test]
    fn std_standard_uses_only_cell_color() {
        let req = mold_requirement(&job(MoldType::Standard, 3.0, 4));
        assert_eq!(req.parts, vec![(MoldPart::CellColor, 4)]);
    }

    #[test]
    fn std_three_in_urethane_splits_one() {
        let req = mold_requirement(&job(MoldType::ThreeInUrethane, 3.0, 3));
        assert_eq!(
            req.parts,
            vec![(MoldPart::CellColor, 2), (MoldPart::ThreeInUrethane, 1)]
        );
    }

    #[test]
    fn std_double2cc_subtracts_two_no_off_by_one_correction() {
        // Resolved Open Question: literal (molds-2)*color + 1*DOUBLE2CC, no fixup.
        let req = mold_requirement(&job(MoldType::Double2cc, 3.0, 2));
        assert_eq!(
            req.parts,
            vec![(MoldPart::CellColor, 0), (MoldPart::Double2cc, 1)]
        );
    }

    fn config() -> CycleTimeConstants {
        let mut molds = HashMap::new();
        molds.insert(
            "RED_MOLD".to_string(),
            MoldInfo {
                name: "RED_MOLD".to_string(),
                depth: MoldDepth::Std,
                wire_range: "<=4".to_string(),
                quantity: 4,
                compliant_cells: [CellColor::Red].into_iter().collect(),
            },
        );
        molds.insert(
            "COMMON_MOLD".to_string(),
            MoldInfo {
                name: "COMMON_MOLD".to_string(),
                depth: MoldDepth::Std,
                wire_range: "<=4".to_string(),
                quantity: 2,
                compliant_cells: CellColor::ALL.into_iter().collect(),
            },
        );
        molds.insert(
            "DOUBLE2CC_MOLD".to_string(),
            MoldInfo {
                name: "DOUBLE2CC_MOLD".to_string(),
                depth: MoldDepth::Std,
                wire_range: "<=4".to_string(),
                quantity: 1,
                compliant_cells: CellColor::ALL.into_iter().collect(),
            },
        );
        CycleTimeConstants {
            task_timings: vec![TaskTiming {
                wire_diameter_bucket: "<=4".to_string(),
                equivalent_tier: "1.0".to_string(),
                setup: 15,
                layout: 10,
                pour_per_mold: 2.0,
                cure: 30.0,
                unload: 5,
                sched_constant: 40.0,
                sched_class: crate::cell::SchedClass::A,
                pull_ahead: 0.0,
            }],
            molds,
            fixtures: HashMap::new(),
            holidays: HashSet::new(),
            standard_shift_minutes: 440,
            overtime_shift_minutes: 500,
            summer_cure_multiplier: 1.5,
            pour_cutoff_minutes: 40,
            max_layout_pour_gap: 60,
        }
    }

    #[test]
    fn allocation_sources_own_color_mold_first() {
        let config = config();
        let active = [CellColor::Red].into_iter().collect();
        let pool = create_resource_pool(&config, &active);
        let derived = crate::derived::calculate_fields_for_job(
            &job(MoldType::Standard, 3.0, 2),
            &config,
            chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
        )
        .unwrap();
        let alloc = allocate_molds_for_job(
            &job(MoldType::Standard, 3.0, 2),
            &derived,
            CellColor::Red,
            &config,
            &pool,
        );
        assert!(alloc.valid);
        assert_eq!(alloc.assignments.get("RED_MOLD"), Some(&2));
    }

    #[test]
    fn allocation_falls_back_to_common_mold_when_color_exhausted() {
        let config = config();
        let active = [CellColor::Red].into_iter().collect();
        let mut pool = create_resource_pool(&config, &active);
        assert!(pool.reserve_molds("RED_MOLD", 4));
        let derived = crate::derived::calculate_fields_for_job(
            &job(MoldType::Standard, 3.0, 1),
            &config,
            chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
        )
        .unwrap();
        let alloc = allocate_molds_for_job(
            &job(MoldType::Standard, 3.0, 1),
            &derived,
            CellColor::Red,
            &config,
            &pool,
        );
        assert!(alloc.valid);
        assert_eq!(alloc.assignments.get("COMMON_MOLD"), Some(&1));
    }

    #[test]
    fn allocation_fails_when_nothing_available() {
        let config = config();
        let active = [CellColor::Red].into_iter().collect();
        let mut pool = create_resource_pool(&config, &active);
        assert!(pool.reserve_molds("RED_MOLD", 4));
        assert!(pool.reserve_molds("COMMON_MOLD", 2));
        let derived = crate::derived::calculate_fields_for_job(
            &job(MoldType::Standard, 3.0, 1),
            &config,
            chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
        )
        .unwrap();
        let alloc = allocate_molds_for_job(
            &job(MoldType::Standard, 3.0, 1),
            &derived,
            CellColor::Red,
            &config,
            &pool,
        );
        assert!(!alloc.valid);
        assert!(alloc.error.is_some());
    }
}
