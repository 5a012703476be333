//! Mutable mold/fixture bookkeeping shared across one variant's cells.

use crate::cell::{CellColor, TableIndex};
use crate::config::{CycleTimeConstants, MoldDepth};
use crate::derived::DerivedFields;
use crate::job::{Job, MoldType, OperatorInputs};
use std::collections::{HashMap, HashSet};

/// Live counts for one scheduling run.
///
/// Invariant: `0 <= mold_available[m] <= mold_inventory[m]`;
/// `fixture_in_use[p] <= max_concurrent[p]`.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    mold_inventory: HashMap<String, u32>,
    mold_available: HashMap<String, u32>,
    /// Per-color molds pinned to their owning cell while that cell is
    /// active. Pinning does not remove them from `mold_available` — it
    /// only prevents *other* cells from claiming them (see
    /// [`get_compliant_cells_for_job`]'s sourcing ladder).
    mold_reserved_for_active: HashMap<String, CellColor>,
    fixture_in_use: HashMap<String, u32>,
    fixture_limits: HashMap<String, u32>,
    active_cells: HashSet<CellColor>,
}

impl ResourcePool {
    pub fn mold_available(&self, name: &str) -> u32 {
        self.mold_available.get(name).copied().unwrap_or(0)
    }

    /// Succeeds iff `mold_available[name] >= k`; decrements on success.
    pub fn reserve_molds(&mut self, name: &str, k: u32) -> bool {
        let available = self.mold_available(name);
        if available < k {
            return false;
        }
        self.mold_available.insert(name.to_string(), available - k);
        true
    }

    /// Increments, capped at inventory.
    pub fn release_molds(&mut self, name: &str, k: u32) {
        let inventory = self.mold_inventory.get(name).copied().unwrap_or(0);
        let available = self.mold_available(name);
        let new_available = (available + k).min(inventory);
        self.mold_available.insert(name.to_string(), new_available);
    }

    pub fn check_fixture_limit(&self, pattern: &str) -> bool {
        let in_use = self.fixture_in_use.get(pattern).copied().unwrap_or(0);
        let limit = self.fixture_limits.get(pattern).copied().unwrap_or(u32::MAX);
        in_use < limit
    }

    pub fn reserve_fixture(&mut self, pattern: &str) {
        *self.fixture_in_use.entry(pattern.to_string()).or_insert(0) += 1;
    }

    pub fn release_fixture(&mut self, pattern: &str) {
        if let Some(count) = self.fixture_in_use.get_mut(pattern) {
            *count = count.saturating_sub(1);
        }
    }

    fn cell_owns_reservation(&self, mold_name: &str, cell: CellColor) -> bool {
        self.mold_reserved_for_active.get(mold_name) == Some(&cell)
    }

    fn mold_compliant_cells<'a>(
        &self,
        config: &'a CycleTimeConstants,
        mold_name: &str,
    ) -> Option<&'a HashSet<CellColor>> {
        config.get_mold(mold_name).map(|m| &m.compliant_cells)
    }

    /// STD-mold sourcing ladder for the `{CELL}_MOLD` portion of an
    /// allocation: the cell's own color mold first, then `COMMON_MOLD`,
    /// then an inactive cell's color mold if it lists the target cell as
    /// compliant. DEEP molds are a single shared pool and skip this
    /// ladder entirely (handled directly by the caller).
    pub(crate) fn source_std_color_mold(
        &self,
        config: &CycleTimeConstants,
        cell: CellColor,
        needed: u32,
    ) -> Option<String> {
        if needed == 0 {
            return Some(cell.mold_name());
        }
        let own = cell.mold_name();
        if self.cell_owns_reservation(&own, cell) && self.mold_available(&own) >= needed {
            return Some(own);
        }
        if self.mold_available(CycleTimeConstants::COMMON_MOLD) >= needed {
            return Some(CycleTimeConstants::COMMON_MOLD.to_string());
        }
        for (name, owner) in &self.mold_reserved_for_active {
            if *owner == cell {
                continue;
            }
            if self.active_cells.contains(owner) {
                continue;
            }
            let compliant = self
                .mold_compliant_cells(config, name)
                .map(|cells| cells.contains(&cell))
                .unwrap_or(false);
            if compliant && self.mold_available(name) >= needed {
                return Some(name.clone());
            }
        }
        None
    }
}

/// Initializes the pool from static config: `mold_available` starts equal
/// to inventory, and each active non-ORANGE cell's own color mold is
/// pinned (but not deducted).
pub fn create_resource_pool(
    config: &CycleTimeConstants,
    active_cells: &HashSet<CellColor>,
) -> ResourcePool {
    let mold_inventory: HashMap<String, u32> = config
        .molds
        .values()
        .map(|m| (m.name.clone(), m.quantity))
        .collect();
    let mold_available = mold_inventory.clone();

    let mut mold_reserved_for_active = HashMap::new();
    for &cell in active_cells {
        if cell == CellColor::Orange {
            continue;
        }
        let mold_name = cell.mold_name();
        if config.molds.contains_key(&mold_name) {
            mold_reserved_for_active.insert(mold_name, cell);
        }
    }

    ResourcePool {
        mold_inventory,
        mold_available,
        mold_reserved_for_active,
        fixture_in_use: HashMap::new(),
        fixture_limits: config.fixtures.clone(),
        active_cells: active_cells.clone(),
    }
}

/// Cells that can legally host a job: mold-depth compliant, and for
/// ORANGE, the job's `orange_eligible` flag plus operator opt-in for
/// specialty mold types.
pub fn get_compliant_cells_for_job(
    job: &Job,
    derived: &DerivedFields,
    config: &CycleTimeConstants,
    active_cells: &HashSet<CellColor>,
    operator_inputs: &OperatorInputs,
) -> Vec<CellColor> {
    active_cells
        .iter()
        .copied()
        .filter(|&cell| is_cell_compliant(cell, job, derived, config, operator_inputs))
        .collect()
}

fn is_cell_compliant(
    cell: CellColor,
    job: &Job,
    derived: &DerivedFields,
    config: &CycleTimeConstants,
    operator_inputs: &OperatorInputs,
) -> bool {
    if cell == CellColor::Orange {
        if !job.orange_eligible {
            return false;
        }
        if derived.mold_depth == MoldDepth::Deep {
            return false;
        }
        if !matches!(job.mold_type, MoldType::Standard)
            && !operator_inputs.is_job_allowed_on_orange(job.mold_type)
        {
            return false;
        }
        return true;
    }

    match derived.mold_depth {
        MoldDepth::Deep => config
            .get_mold(CycleTimeConstants::DEEP_MOLD)
            .map(|m| m.compliant_cells.contains(&cell))
            .unwrap_or(true),
        MoldDepth::Std => config
            .get_mold(&cell.mold_name())
            .map(|m| m.compliant_cells.contains(&cell))
            .unwrap_or(true),
    }
}

/// Rough per-cell remaining-minutes summary used by policies that prefer
/// cells with the most spare capacity (`MaximumOutput`, `FixtureFirst`).
#[derive(Debug, Clone, Copy)]
pub struct CellCapacity {
    pub cell: CellColor,
    pub remaining_minutes: i64,
    pub jobs_on_table: u32,
}

/// Summarizes each active cell's spare shift capacity, after subtracting a
/// rough estimate for whatever is already pinned via ON_TABLE_TODAY.
/// Sorted by `remaining_minutes` descending (ties broken by cell identity)
/// so callers can take the first `n` for "largest remaining capacity".
pub fn calculate_cell_capacities(
    active_cells: &HashSet<CellColor>,
    jobs_on_tables: &[(CellColor, TableIndex, &Job)],
    config: &CycleTimeConstants,
    shift_minutes: i64,
) -> Vec<CellCapacity> {
    let mut consumed_minutes: HashMap<CellColor, i64> = HashMap::new();
    let mut jobs_count: HashMap<CellColor, u32> = HashMap::new();

    for &(cell, _table, job) in jobs_on_tables {
        *jobs_count.entry(cell).or_insert(0) += 1;
        if let Ok(timing) = config.get_task_timing(job.wire_diameter, job.equivalent) {
            let pour = (timing.pour_per_mold * job.molds as f64).floor() as i64;
            let estimate = timing.setup + timing.layout + pour + timing.cure.floor() as i64 + timing.unload;
            *consumed_minutes.entry(cell).or_insert(0) += estimate;
        }
    }

    let mut capacities: Vec<CellCapacity> = active_cells
        .iter()
        .map(|&cell| {
            let total_minutes = shift_minutes * 2; // two tables per cell
            let used = consumed_minutes.get(&cell).copied().unwrap_or(0);
            CellCapacity {
                cell,
                remaining_minutes: (total_minutes - used).max(0),
                jobs_on_table: jobs_count.get(&cell).copied().unwrap_or(0),
            }
        })
        .collect();

    capacities.sort_by(|a, b| b.remaining_minutes.cmp(&a.remaining_minutes).then(a.cell.cmp(&b.cell)));
    capacities
}
