//! Frozen per-run configuration: task timings, mold inventory, fixture
//! limits, holidays, shift lengths. Loading this from YAML/Excel is out of
//! scope; the crate only consumes the already-parsed struct.

use crate::cell::CellColor;
use crate::error::ConfigurationError;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Mold depth bucket, derived from wire diameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MoldDepth {
    Deep,
    Std,
}

/// `DEEP` if `wire_diameter >= 8.0`, else `STD`.
pub fn mold_depth(wire_diameter: f64) -> MoldDepth {
    if wire_diameter >= 8.0 {
        MoldDepth::Deep
    } else {
        MoldDepth::Std
    }
}

/// Wire-diameter bucket used to key task timing lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireBucket {
    Le4,
    Mid,
    Ge8,
}

fn wire_bucket(wire_diameter: f64) -> WireBucket {
    if wire_diameter <= 4.0 {
        WireBucket::Le4
    } else if wire_diameter < 8.0 {
        WireBucket::Mid
    } else {
        WireBucket::Ge8
    }
}

/// Equivalent tier: rounds UP to the next configured tier (conservative).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EquivalentTier {
    T1_0,
    T1_25,
    T1_5,
    T1_75,
    Ge2,
}

fn equivalent_tier(equivalent: f64) -> EquivalentTier {
    if equivalent <= 1.0 {
        EquivalentTier::T1_0
    } else if equivalent <= 1.25 {
        EquivalentTier::T1_25
    } else if equivalent <= 1.5 {
        EquivalentTier::T1_5
    } else if equivalent <= 1.75 {
        EquivalentTier::T1_75
    } else {
        EquivalentTier::Ge2
    }
}

/// A single task-timing configuration row, keyed by wire bucket and
/// equivalent tier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskTiming {
    pub wire_diameter_bucket: String,
    pub equivalent_tier: String,
    pub setup: i64,
    pub layout: i64,
    pub pour_per_mold: f64,
    pub cure: f64,
    pub unload: i64,
    pub sched_constant: f64,
    pub sched_class: crate::cell::SchedClass,
    pub pull_ahead: f64,
}

fn bucket_label(b: WireBucket) -> &'static str {
    match b {
        WireBucket::Le4 => "<=4",
        WireBucket::Mid => "4-8",
        WireBucket::Ge8 => ">=8",
    }
}

fn tier_label(t: EquivalentTier) -> &'static str {
    match t {
        EquivalentTier::T1_0 => "1.0",
        EquivalentTier::T1_25 => "1.25",
        EquivalentTier::T1_5 => "1.5",
        EquivalentTier::T1_75 => "1.75",
        EquivalentTier::Ge2 => ">=2",
    }
}

/// Named inventory entry for a mold.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoldInfo {
    pub name: String,
    pub depth: MoldDepth,
    pub wire_range: String,
    pub quantity: u32,
    pub compliant_cells: HashSet<CellColor>,
}

/// `pattern -> max_concurrent`.
pub type FixtureLimits = HashMap<String, u32>;

/// Frozen configuration for one scheduling run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CycleTimeConstants {
    pub task_timings: Vec<TaskTiming>,
    pub molds: HashMap<String, MoldInfo>,
    pub fixtures: FixtureLimits,
    pub holidays: HashSet<NaiveDate>,
    pub standard_shift_minutes: i64,
    pub overtime_shift_minutes: i64,
    pub summer_cure_multiplier: f64,
    pub pour_cutoff_minutes: i64,
    pub max_layout_pour_gap: i64,
}

impl CycleTimeConstants {
    /// Reserved mold names that callers are expected to define for the
    /// colors/types they actually use.
    pub const DEEP_MOLD: &'static str = "DEEP_MOLD";
    pub const DEEP_DOUBLE2CC_MOLD: &'static str = "DEEP_DOUBLE2CC_MOLD";
    pub const COMMON_MOLD: &'static str = "COMMON_MOLD";
    pub const DOUBLE2CC_MOLD: &'static str = "DOUBLE2CC_MOLD";
    pub const THREE_IN_URETHANE_MOLD: &'static str = "3INURETHANE_MOLD";

    /// Look up the task timing row for a job's wire diameter and
    /// equivalent, applying the cascading-tier-with-fallback rule:
    /// equivalent rounds up to the nearest configured tier (0.01
    /// tolerance on the final match); if no row matches exactly, fall
    /// back to the `>=2` tier for the same wire bucket; fail only if
    /// even that is undefined.
    pub fn get_task_timing(
        &self,
        wire_diameter: f64,
        equivalent: f64,
    ) -> Result<&TaskTiming, ConfigurationError> {
        let bucket = wire_bucket(wire_diameter);
        let tier = equivalent_tier(equivalent);
        let bucket_str = bucket_label(bucket);
        let tier_str = tier_label(tier);

        if let Some(row) = self.task_timings.iter().find(|t| {
            t.wire_diameter_bucket == bucket_str
                && (t.equivalent_tier == tier_str
                    || (tier != EquivalentTier::Ge2
                        && (t.equivalent_tier.parse::<f64>().ok())
                            .map(|v| (v - equivalent_tier_value(tier)).abs() < 0.01)
                            .unwrap_or(false)))
        }) {
            return Ok(row);
        }

        // Fallback: try the >=2 tier for the same wire bucket.
        if let Some(row) = self
            .task_timings
            .iter()
            .find(|t| t.wire_diameter_bucket == bucket_str && t.equivalent_tier == ">=2")
        {
            return Ok(row);
        }

        Err(ConfigurationError::new(
            "task_timings",
            format!(
                "no task timing for wire_diameter={wire_diameter} (bucket {bucket_str}), equivalent={equivalent} (tier {tier_str})"
            ),
        ))
    }

    pub fn mold_depth(&self, wire_diameter: f64) -> MoldDepth {
        mold_depth(wire_diameter)
    }

    pub fn shift_minutes(&self, overtime: bool) -> i64 {
        if overtime {
            self.overtime_shift_minutes
        } else {
            self.standard_shift_minutes
        }
    }

    pub fn get_mold(&self, name: &str) -> Option<&MoldInfo> {
        self.molds.get(name)
    }

    pub fn get_fixture_limit(&self, pattern: &str) -> Option<u32> {
        self.fixtures.get(pattern).copied()
    }
}

fn equivalent_tier_value(t: EquivalentTier) -> f64 {
    match t {
        EquivalentTier::T1_0 => 1.0,
        EquivalentTier::T1_25 => 1.25,
        EquivalentTier::T1_5 => 1.5,
        EquivalentTier::T1_75 => 1.75,
        EquivalentTier::Ge2 => 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::SchedClass;

    fn timing(bucket: &str, tier: &str) -> TaskTiming {
        TaskTiming {
            wire_diameter_bucket: bucket.to_string(),
            equivalent_tier: tier.to_string(),
            setup: 15,
            layout: 10,
            pour_per_mold: 2.0,
            cure: 30.0,
            unload: 5,
            sched_constant: 1.0,
            sched_class: SchedClass::A,
            pull_ahead: 0.0,
        }
    }

    fn constants_with(rows: Vec<TaskTiming>) -> CycleTimeConstants {
        CycleTimeConstants {
            task_timings: rows,
            molds: HashMap::new(),
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
    fn mold_depth_boundary_b2() {
        assert_eq!(mold_depth(8.0), MoldDepth::Deep);
        assert_eq!(mold_depth(7.99), MoldDepth::Std);
    }

    #[test]
    fn equivalent_two_selects_ge2_tier_b3() {
        let c = constants_with(vec![timing("<=4", ">=2")]);
        let row = c.get_task_timing(3.0, 2.0).unwrap();
        assert_eq!(row.equivalent_tier, ">=2");
    }

    #[test]
    fn equivalent_rounds_up_to_next_tier() {
        let c = constants_with(vec![timing("<=4", "1.25")]);
        // 1.1 should round up to 1.25, not 1.0
        let row = c.get_task_timing(3.0, 1.1).unwrap();
        assert_eq!(row.equivalent_tier, "1.25");
    }

    #[test]
    fn missing_exact_tier_falls_back_to_ge2() {
        let c = constants_with(vec![timing("4-8", ">=2")]);
        // no 1.0 tier defined for this bucket; falls back to >=2 rather than failing
        let row = c.get_task_timing(6.0, 1.0).unwrap();
        assert_eq!(row.equivalent_tier, ">=2");
    }

    #[test]
    fn missing_everything_is_configuration_error() {
        let c = constants_with(vec![timing(">=8", ">=2")]);
        let err = c.get_task_timing(3.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("task_timings"));
    }

    #[test]
    fn wire_bucket_boundaries() {
        let c = constants_with(vec![
            timing("<=4", "1.0"),
            timing("4-8", "1.0"),
            timing(">=8", "1.0"),
        ]);
        assert_eq!(c.get_task_timing(4.0, 1.0).unwrap().wire_diameter_bucket, "<=4");
        assert_eq!(c.get_task_timing(4.01, 1.0).unwrap().wire_diameter_bucket, "4-8");
        assert_eq!(c.get_task_timing(8.0, 1.0).unwrap().wire_diameter_bucket, ">=8");
    }
}
