//! Mold inventory, fixture concurrency caps, and compliance rules.
//!
//! The pool tracks live counts for one scheduling run: `mold_available` is
//! mutated by `reserve_molds`/`release_molds`; `allocate_molds_for_job`
//! itself never mutates the pool — it computes a candidate allocation that
//! the caller reserves explicitly once accepted.

mod allocation;
mod pool;

pub use allocation::{allocate_molds_for_job, mold_requirement, MoldAllocation, MoldPart, MoldRequirement};
pub use pool::{
    calculate_cell_capacities, create_resource_pool, get_compliant_cells_for_job, CellCapacity, ResourcePool,
};
