//! Top-level driver: ON_TABLE_TODAY pre-phase, the 12 policy/ordering
//! variants, and per-cell hand-off to the timeline simulator.

use super::ordering::Ordering;
use super::policy::{is_hard_rule_violated, score_candidate, CandidateContext, Policy};
use super::rough_time::{cycle_estimate, max_panels_that_fit};
use crate::cell::{CellColor, SchedClass, TableIndex};
use crate::config::CycleTimeConstants;
use crate::derived::{calculate_fields_for_job, DerivedFields, Priority};
use crate::error::SchedulingError;
use crate::job::{DailyProductionLoad, Job, OperatorInputs};
use crate::resource::{
    allocate_molds_for_job, calculate_cell_capacities, create_resource_pool, get_compliant_cells_for_job,
    MoldAllocation, ResourcePool,
};
use crate::simulator::{simulate_cell, CellScheduleResult, CellStatus, PanelUnit, SimulatorInput, TableInput};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// One job's placement on a cell/table, or an unplaced fragment.
#[derive(Debug, Clone)]
pub struct JobCellAssignment {
    pub job_id: String,
    pub cell: CellColor,
    pub table: TableIndex,
    pub mold_allocation: MoldAllocation,
    pub panels_to_schedule: u32,
    pub is_on_table_today: bool,
    pub assignment_reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScheduleStatus {
    Optimal,
    Partial,
    Feasible,
    Infeasible,
}

#[derive(Debug, Clone)]
pub struct MultiCellScheduleResult {
    pub schedule_date: NaiveDate,
    pub shift_minutes: i64,
    pub status: ScheduleStatus,
    pub cell_results: HashMap<CellColor, CellScheduleResult>,
    pub job_assignments: Vec<JobCellAssignment>,
    pub unscheduled_jobs: Vec<(String, String)>,
    pub total_panels: u32,
    pub total_operator_minutes: i64,
    pub warnings: Vec<String>,
}

impl MultiCellScheduleResult {
    pub fn is_feasible(&self) -> bool {
        !matches!(self.status, ScheduleStatus::Infeasible)
    }

    pub fn get_scheduled_job_ids(&self) -> Vec<&str> {
        self.job_assignments.iter().map(|a| a.job_id.as_str()).collect()
    }
}

struct WorkingJob<'a> {
    job: &'a Job,
    derived: DerivedFields,
    panels_remaining: u32,
}

struct TableTrack {
    remaining_minutes: f64,
    last_fixture: Option<String>,
    current_class: Option<SchedClass>,
    queue: Vec<(String, DerivedFields, u32, bool)>, // job_id, derived, panels, is_pinned_leading
}

/// D/E and up tier used by `MostRestrictedMix` to schedule the most
/// pairing-restricted classes first: D/E before C before B before A.
fn class_tier(class: SchedClass) -> u8 {
    match class {
        SchedClass::D | SchedClass::E => 0,
        SchedClass::C => 1,
        SchedClass::B => 2,
        SchedClass::A => 3,
    }
}

/// `MaximumOutput`'s structural behavior: cells dedicated to class-A-only
/// work, and the single table class-E jobs should cluster onto.
#[derive(Debug, Clone, Default)]
struct MaximumOutputPlan {
    dedicated_cells: HashSet<CellColor>,
    class_e_table: Option<(CellColor, TableIndex)>,
}

impl MaximumOutputPlan {
    fn rejects(&self, cell: CellColor, sched_class: SchedClass) -> bool {
        self.dedicated_cells.contains(&cell) && sched_class != SchedClass::A
    }

    fn class_e_bonus(&self, cell: CellColor, table: TableIndex, sched_class: SchedClass) -> f64 {
        if sched_class == SchedClass::E && self.class_e_table == Some((cell, table)) {
            25.0
        } else {
            0.0
        }
    }
}

/// `surplus = Σ(sched_qty of class A) − Σ(sched_qty of everything else)`
/// among jobs still pending placement. `surplus >= 16` dedicates the 2
/// cells with the most spare capacity to class-A-only work; `surplus > 0`
/// dedicates 1; otherwise none. Class-E jobs cluster onto a single table,
/// preferring one already hosting a class-E job (from ON_TABLE_TODAY).
#[allow(clippy::too_many_arguments)]
fn compute_maximum_output_plan(
    pending: &[WorkingJob],
    tables: &HashMap<(CellColor, TableIndex), TableTrack>,
    jobs_on_tables_active: &[(CellColor, TableIndex, &Job)],
    active_cells: &HashSet<CellColor>,
    table_order: &[CellColor],
    config: &CycleTimeConstants,
    shift_minutes: i64,
) -> MaximumOutputPlan {
    let mut class_a_qty: i64 = 0;
    let mut other_qty: i64 = 0;
    for wj in pending {
        if wj.derived.sched_class == SchedClass::A {
            class_a_qty += wj.derived.sched_qty as i64;
        } else {
            other_qty += wj.derived.sched_qty as i64;
        }
    }
    let surplus = class_a_qty - other_qty;
    let dedicate_count = if surplus >= 16 {
        2
    } else if surplus > 0 {
        1
    } else {
        0
    };

    let dedicated_cells: HashSet<CellColor> = if dedicate_count > 0 {
        let capacities = calculate_cell_capacities(active_cells, jobs_on_tables_active, config, shift_minutes);
        capacities.into_iter().take(dedicate_count).map(|c| c.cell).collect()
    } else {
        HashSet::new()
    };

    let class_e_table = tables
        .iter()
        .find(|(_, track)| track.current_class == Some(SchedClass::E))
        .map(|(&key, _)| key)
        .or_else(|| {
            let has_pending_e = pending.iter().any(|wj| wj.derived.sched_class == SchedClass::E);
            has_pending_e
                .then(|| table_order.first().map(|&cell| (cell, TableIndex::One)))
                .flatten()
        });

    debug!(
        surplus,
        dedicate_count,
        dedicated_cells = ?dedicated_cells,
        class_e_table = ?class_e_table,
        "computed MaximumOutput plan"
    );

    MaximumOutputPlan {
        dedicated_cells,
        class_e_table,
    }
}

/// Runs one `(policy, ordering)` variant to completion.
pub fn schedule_variant(
    policy: Policy,
    ordering: Ordering,
    load: &DailyProductionLoad,
    config: &CycleTimeConstants,
    operator_inputs: &OperatorInputs,
) -> Result<MultiCellScheduleResult, SchedulingError> {
    info!(%policy, %ordering, date = %operator_inputs.schedule_date, "scheduling variant start");
    let today = operator_inputs.schedule_date;
    let shift_minutes = config.shift_minutes(operator_inputs.shift_type == crate::job::ShiftType::Overtime);
    let active_cells = operator_inputs.active_cells.clone();

    let mut derived_by_id: HashMap<String, DerivedFields> = HashMap::new();
    for job in &load.jobs {
        let derived = calculate_fields_for_job(job, config, today)?;
        derived_by_id.insert(job.id.clone(), derived);
    }

    let mut pool = create_resource_pool(config, &active_cells);
    let mut assignments: Vec<JobCellAssignment> = Vec::new();
    let mut unscheduled: Vec<(String, String)> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let active_cells_vec: Vec<CellColor> = active_cells.iter().copied().collect();
    let table_order = crate::cell::table_order(today, &active_cells_vec);
    let mut tables: HashMap<(CellColor, TableIndex), TableTrack> = HashMap::new();
    for &cell in &active_cells {
        for table in [TableIndex::One, TableIndex::Two] {
            tables.insert(
                (cell, table),
                TableTrack {
                    remaining_minutes: shift_minutes as f64,
                    last_fixture: None,
                    current_class: None,
                    queue: Vec::new(),
                },
            );
        }
    }

    let mut pending: Vec<WorkingJob> = Vec::new();

    // --- ON_TABLE_TODAY pre-phase ---
    for (cell, table, job) in load.jobs_on_tables() {
        let derived = derived_by_id.get(&job.id).unwrap().clone();
        if operator_inputs.is_cell_active(cell) {
            let alloc = allocate_molds_for_job(job, &derived, cell, config, &pool);
            if alloc.valid {
                for (name, count) in &alloc.assignments {
                    pool.reserve_molds(name, *count);
                }
            } else {
                warn!(
                    job_id = %job.id,
                    %cell,
                    ?table,
                    error = %alloc.error.clone().unwrap_or_default(),
                    "resource exhausted: ON_TABLE_TODAY job's molds could not be reserved"
                );
                warnings.push(format!(
                    "job {} is ON_TABLE_TODAY on {cell} table {table} but molds could not be reserved: {}",
                    job.id,
                    alloc.error.clone().unwrap_or_default()
                ));
            }
            let panels = derived.sched_qty;
            if let Some(track) = tables.get_mut(&(cell, table)) {
                track.queue.push((job.id.clone(), derived.clone(), panels, true));
                track.last_fixture = Some(job.fixture_id());
                track.current_class = Some(derived.sched_class);
            }
            assignments.push(JobCellAssignment {
                job_id: job.id.clone(),
                cell,
                table,
                mold_allocation: alloc,
                panels_to_schedule: panels,
                is_on_table_today: true,
                assignment_reason: "ON_TABLE_TODAY".to_string(),
            });
        } else if derived.priority as u8 <= Priority::FutureExpedite as u8 {
            warnings.push(format!(
                "job {} was pinned to inactive cell {cell}; requeued for reassignment",
                job.id
            ));
            pending.push(WorkingJob {
                job,
                derived: derived.clone(),
                panels_remaining: derived.sched_qty,
            });
        } else {
            warnings.push(format!(
                "job {} was pinned to inactive cell {cell} and dropped (low priority, can wait)",
                job.id
            ));
            unscheduled.push((job.id.clone(), "pinned cell inactive, low priority".to_string()));
        }
    }

    let pinned_ids: std::collections::HashSet<&str> =
        load.jobs_on_tables().into_iter().map(|(_, _, j)| j.id.as_str()).collect();
    for job in &load.jobs {
        if pinned_ids.contains(job.id.as_str()) {
            continue;
        }
        let derived = derived_by_id.get(&job.id).unwrap().clone();
        pending.push(WorkingJob {
            job,
            panels_remaining: derived.sched_qty,
            derived,
        });
    }

    if policy == Policy::MostRestrictedMix {
        pending.sort_by(|a, b| {
            (class_tier(a.derived.sched_class), a.derived.priority, a.derived.build_date).cmp(&(
                class_tier(b.derived.sched_class),
                b.derived.priority,
                b.derived.build_date,
            ))
        });
    } else {
        pending.sort_by(|a, b| {
            (a.derived.priority, a.derived.build_date).cmp(&(b.derived.priority, b.derived.build_date))
        });
    }

    let jobs_on_tables_active: Vec<(CellColor, TableIndex, &Job)> = load
        .jobs_on_tables()
        .into_iter()
        .filter(|&(cell, _, _)| operator_inputs.is_cell_active(cell))
        .collect();

    let mo_plan = if policy == Policy::MaximumOutput {
        Some(compute_maximum_output_plan(
            &pending,
            &tables,
            &jobs_on_tables_active,
            &active_cells,
            &table_order,
            config,
            shift_minutes,
        ))
    } else {
        None
    };

    let capacity_order: Option<Vec<CellColor>> = if ordering == Ordering::FixtureFirst {
        let capacities = calculate_cell_capacities(&active_cells, &jobs_on_tables_active, config, shift_minutes);
        Some(capacities.into_iter().map(|c| c.cell).collect())
    } else {
        None
    };

    match ordering {
        Ordering::JobFirst => assign_job_first(
            policy,
            &mut pending,
            &mut tables,
            &mut pool,
            config,
            operator_inputs,
            &table_order,
            capacity_order.as_deref(),
            mo_plan.as_ref(),
            &mut assignments,
            &mut unscheduled,
        ),
        Ordering::TableFirst => assign_table_first(
            policy,
            &mut pending,
            &mut tables,
            &mut pool,
            config,
            operator_inputs,
            &table_order,
            mo_plan.as_ref(),
            &mut assignments,
            &mut unscheduled,
        ),
        Ordering::FixtureFirst => assign_fixture_first(
            policy,
            &mut pending,
            &mut tables,
            &mut pool,
            config,
            operator_inputs,
            &table_order,
            capacity_order.as_deref(),
            mo_plan.as_ref(),
            &mut assignments,
            &mut unscheduled,
        ),
    }

    // --- Hand off to the single-cell simulator ---
    let mut cell_results = HashMap::new();
    let mut total_panels = 0u32;
    let mut total_operator_minutes = 0i64;
    for &cell in &active_cells {
        let table_one = build_table_input(&tables, cell, TableIndex::One);
        let table_two = build_table_input(&tables, cell, TableIndex::Two);
        let input = SimulatorInput {
            table_one,
            table_two,
            shift_minutes,
            summer_mode: operator_inputs.summer_mode,
            pour_cutoff_minutes: config.pour_cutoff_minutes,
            max_layout_pour_gap: config.max_layout_pour_gap,
        };
        let result = simulate_cell(input)?;
        total_panels += result.total_panels;
        total_operator_minutes += result.total_operator_minutes;
        cell_results.insert(cell, result);
    }

    let any_scheduled = !assignments.is_empty();
    let any_cell_optimal = cell_results.values().any(|r| r.status == CellStatus::Optimal);
    let status = if active_cells.is_empty() || !any_scheduled {
        ScheduleStatus::Infeasible
    } else if unscheduled.is_empty() {
        ScheduleStatus::Optimal
    } else if any_cell_optimal {
        ScheduleStatus::Partial
    } else {
        ScheduleStatus::Feasible
    };

    info!(
        %policy,
        %ordering,
        ?status,
        total_panels,
        unscheduled = unscheduled.len(),
        "scheduling variant done"
    );

    Ok(MultiCellScheduleResult {
        schedule_date: today,
        shift_minutes,
        status,
        cell_results,
        job_assignments: assignments,
        unscheduled_jobs: unscheduled,
        total_panels,
        total_operator_minutes,
        warnings,
    })
}

fn build_table_input(
    tables: &HashMap<(CellColor, TableIndex), TableTrack>,
    cell: CellColor,
    table: TableIndex,
) -> TableInput {
    let mut input = TableInput::new(table);
    if let Some(track) = tables.get(&(cell, table)) {
        let mut last_fixture: Option<String> = None;
        for (job_id, derived, panels, is_pinned_leading) in &track.queue {
            if *panels == 0 {
                continue;
            }
            let leading = input.queue.is_empty() && *is_pinned_leading;
            for _ in 0..*panels {
                input.queue.push_back(PanelUnit {
                    job_id: job_id.clone(),
                    fixture_id: derived.fixture_id.clone(),
                    molds: derived.molds,
                    setup: derived.setup,
                    layout: derived.layout,
                    pour_per_mold: derived.pour_per_mold,
                    cure: derived.cure,
                    unload: derived.unload,
                    equivalent: derived.equivalent,
                    sched_qty: derived.sched_qty,
                });
            }
            if leading {
                input.first_is_pinned = true;
            }
            last_fixture = Some(derived.fixture_id.clone());
        }
    }
    input
}

fn compliant_candidates(
    job: &Job,
    derived: &DerivedFields,
    config: &CycleTimeConstants,
    operator_inputs: &OperatorInputs,
) -> Vec<CellColor> {
    get_compliant_cells_for_job(job, derived, config, &operator_inputs.active_cells, operator_inputs)
}

#[allow(clippy::too_many_arguments)]
fn try_place(
    policy: Policy,
    job: &Job,
    derived: &DerivedFields,
    panels_wanted: u32,
    tables: &mut HashMap<(CellColor, TableIndex), TableTrack>,
    pool: &mut ResourcePool,
    config: &CycleTimeConstants,
    operator_inputs: &OperatorInputs,
    table_order: &[CellColor],
    capacity_order: Option<&[CellColor]>,
    mo_plan: Option<&MaximumOutputPlan>,
) -> Option<(CellColor, TableIndex, u32, MoldAllocation)> {
    let mut candidates = compliant_candidates(job, derived, config, operator_inputs);
    if let Some(order) = capacity_order {
        candidates.sort_by_key(|c| order.iter().position(|x| x == c).unwrap_or(usize::MAX));
    }
    let mut best: Option<(f64, CellColor, TableIndex, u32, MoldAllocation)> = None;

    for cell in candidates {
        if mo_plan.map(|p| p.rejects(cell, derived.sched_class)).unwrap_or(false) {
            continue;
        }
        let weekday_rank = table_order.iter().position(|&c| c == cell).unwrap_or(usize::MAX);
        for table in [TableIndex::One, TableIndex::Two] {
            let opposite = table.opposite();
            let track = match tables.get(&(cell, table)) {
                Some(t) => t,
                None => continue,
            };
            let opposite_class = tables.get(&(cell, opposite)).and_then(|t| t.current_class);

            let ctx = CandidateContext {
                sched_class: derived.sched_class,
                opposite_class,
                remaining_capacity_minutes: track.remaining_minutes,
                fixture_reuse: track.last_fixture.as_deref() == Some(derived.fixture_id.as_str()),
                weekday_rank,
            };
            if is_hard_rule_violated(policy, &ctx) {
                continue;
            }

            let needs_setup = track.last_fixture.as_deref() != Some(derived.fixture_id.as_str());
            let estimate = cycle_estimate(
                derived.setup,
                derived.layout,
                derived.pour_per_mold,
                job.molds,
                derived.cure,
                derived.unload,
                operator_inputs.summer_mode,
                needs_setup,
            );
            let fits = max_panels_that_fit(estimate, track.remaining_minutes);
            if fits == 0 {
                continue;
            }
            let panels = panels_wanted.min(fits);

            if !pool.check_fixture_limit(job.pattern.as_str()) {
                continue;
            }

            let alloc = allocate_molds_for_job(job, derived, cell, config, pool);
            if !alloc.valid {
                continue;
            }

            let mut score = score_candidate(policy, &ctx);
            if let Some(p) = mo_plan {
                score += p.class_e_bonus(cell, table, derived.sched_class);
            }
            if best.as_ref().map(|(s, ..)| score > *s).unwrap_or(true) {
                best = Some((score, cell, table, panels, alloc));
            }
        }
    }

    best.map(|(_, cell, table, panels, alloc)| (cell, table, panels, alloc))
}

#[allow(clippy::too_many_arguments)]
fn commit_placement(
    job: &Job,
    derived: &DerivedFields,
    cell: CellColor,
    table: TableIndex,
    panels: u32,
    alloc: MoldAllocation,
    tables: &mut HashMap<(CellColor, TableIndex), TableTrack>,
    pool: &mut ResourcePool,
    operator_inputs: &OperatorInputs,
    assignments: &mut Vec<JobCellAssignment>,
) {
    for (name, count) in &alloc.assignments {
        pool.reserve_molds(name, *count);
    }
    pool.reserve_fixture(job.pattern.as_str());

    let needs_setup;
    if let Some(track) = tables.get_mut(&(cell, table)) {
        needs_setup = track.last_fixture.as_deref() != Some(derived.fixture_id.as_str());
        let estimate = cycle_estimate(
            derived.setup,
            derived.layout,
            derived.pour_per_mold,
            job.molds,
            derived.cure,
            derived.unload,
            operator_inputs.summer_mode,
            needs_setup,
        );
        track.remaining_minutes -= super::rough_time::rough_time(estimate, panels);
        track.last_fixture = Some(derived.fixture_id.clone());
        track.current_class = Some(derived.sched_class);
        track.queue.push((job.id.clone(), derived.clone(), panels, false));
    }

    assignments.push(JobCellAssignment {
        job_id: job.id.clone(),
        cell,
        table,
        mold_allocation: alloc,
        panels_to_schedule: panels,
        is_on_table_today: false,
        assignment_reason: "ASSIGNED".to_string(),
    });
}

#[allow(clippy::too_many_arguments)]
fn assign_job_first(
    policy: Policy,
    pending: &mut [WorkingJob],
    tables: &mut HashMap<(CellColor, TableIndex), TableTrack>,
    pool: &mut ResourcePool,
    config: &CycleTimeConstants,
    operator_inputs: &OperatorInputs,
    table_order: &[CellColor],
    capacity_order: Option<&[CellColor]>,
    mo_plan: Option<&MaximumOutputPlan>,
    assignments: &mut Vec<JobCellAssignment>,
    unscheduled: &mut Vec<(String, String)>,
) {
    for wj in pending.iter_mut() {
        while wj.panels_remaining > 0 {
            match try_place(
                policy,
                wj.job,
                &wj.derived,
                wj.panels_remaining,
                tables,
                pool,
                config,
                operator_inputs,
                table_order,
                capacity_order,
                mo_plan,
            ) {
                Some((cell, table, panels, alloc)) => {
                    commit_placement(wj.job, &wj.derived, cell, table, panels, alloc, tables, pool, operator_inputs, assignments);
                    wj.panels_remaining -= panels;
                }
                None => break,
            }
        }
        if wj.panels_remaining > 0 {
            debug!(job_id = %wj.job.id, "unscheduled: no compliant cell/table had capacity or molds");
            unscheduled.push((wj.job.id.clone(), "no compliant cell/table had capacity or molds".to_string()));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn assign_table_first(
    policy: Policy,
    pending: &mut Vec<WorkingJob>,
    tables: &mut HashMap<(CellColor, TableIndex), TableTrack>,
    pool: &mut ResourcePool,
    config: &CycleTimeConstants,
    operator_inputs: &OperatorInputs,
    table_order: &[CellColor],
    mo_plan: Option<&MaximumOutputPlan>,
    assignments: &mut Vec<JobCellAssignment>,
    unscheduled: &mut Vec<(String, String)>,
) {
    let mut slots: Vec<(CellColor, TableIndex)> = Vec::new();
    for &cell in table_order {
        slots.push((cell, TableIndex::One));
        slots.push((cell, TableIndex::Two));
    }

    let mut remaining: Vec<usize> = (0..pending.len()).collect();
    loop {
        let mut progressed = false;
        // MostRestrictedMix schedules strictly in D/E -> C -> B -> A order:
        // each pass only considers the lowest class tier still pending.
        let min_tier = (policy == Policy::MostRestrictedMix)
            .then(|| remaining.iter().map(|&idx| class_tier(pending[idx].derived.sched_class)).min())
            .flatten();

        for &(cell, table) in &slots {
            let mut chosen_idx: Option<usize> = None;
            let mut chosen_panels = 0u32;
            let mut chosen_alloc: Option<MoldAllocation> = None;
            let mut best_score = f64::MIN;

            for &idx in &remaining {
                let wj = &pending[idx];
                if wj.panels_remaining == 0 {
                    continue;
                }
                if let Some(tier) = min_tier {
                    if class_tier(wj.derived.sched_class) != tier {
                        continue;
                    }
                }
                if mo_plan.map(|p| p.rejects(cell, wj.derived.sched_class)).unwrap_or(false) {
                    continue;
                }
                let candidates = compliant_candidates(wj.job, &wj.derived, config, operator_inputs);
                if !candidates.contains(&cell) {
                    continue;
                }
                let opposite = table.opposite();
                let opposite_class = tables.get(&(cell, opposite)).and_then(|t| t.current_class);
                let track = match tables.get(&(cell, table)) {
                    Some(t) => t,
                    None => continue,
                };
                let weekday_rank = table_order.iter().position(|&c| c == cell).unwrap_or(usize::MAX);
                let ctx = CandidateContext {
                    sched_class: wj.derived.sched_class,
                    opposite_class,
                    remaining_capacity_minutes: track.remaining_minutes,
                    fixture_reuse: track.last_fixture.as_deref() == Some(wj.derived.fixture_id.as_str()),
                    weekday_rank,
                };
                if is_hard_rule_violated(policy, &ctx) {
                    continue;
                }
                let needs_setup = track.last_fixture.as_deref() != Some(wj.derived.fixture_id.as_str());
                let estimate = cycle_estimate(
                    wj.derived.setup,
                    wj.derived.layout,
                    wj.derived.pour_per_mold,
                    wj.job.molds,
                    wj.derived.cure,
                    wj.derived.unload,
                    operator_inputs.summer_mode,
                    needs_setup,
                );
                let fits = max_panels_that_fit(estimate, track.remaining_minutes);
                if fits == 0 {
                    continue;
                }
                if !pool.check_fixture_limit(wj.job.pattern.as_str()) {
                    continue;
                }
                let alloc = allocate_molds_for_job(wj.job, &wj.derived, cell, config, pool);
                if !alloc.valid {
                    continue;
                }
                let score = score_candidate(policy, &ctx)
                    + mo_plan.map(|p| p.class_e_bonus(cell, table, wj.derived.sched_class)).unwrap_or(0.0);
                if score > best_score {
                    best_score = score;
                    chosen_idx = Some(idx);
                    chosen_panels = wj.panels_remaining.min(fits);
                    chosen_alloc = Some(alloc);
                }
            }

            if let (Some(idx), Some(alloc)) = (chosen_idx, chosen_alloc) {
                let (job, derived) = (pending[idx].job, pending[idx].derived.clone());
                commit_placement(job, &derived, cell, table, chosen_panels, alloc, tables, pool, operator_inputs, assignments);
                pending[idx].panels_remaining -= chosen_panels;
                progressed = true;
            }
        }
        remaining.retain(|&idx| pending[idx].panels_remaining > 0);
        if !progressed || remaining.is_empty() {
            break;
        }
    }

    for idx in remaining {
        debug!(job_id = %pending[idx].job.id, "unscheduled: no compliant cell/table had capacity or molds");
        unscheduled.push((pending[idx].job.id.clone(), "no compliant cell/table had capacity or molds".to_string()));
    }
}

#[allow(clippy::too_many_arguments)]
fn assign_fixture_first(
    policy: Policy,
    pending: &mut [WorkingJob],
    tables: &mut HashMap<(CellColor, TableIndex), TableTrack>,
    pool: &mut ResourcePool,
    config: &CycleTimeConstants,
    operator_inputs: &OperatorInputs,
    table_order: &[CellColor],
    capacity_order: Option<&[CellColor]>,
    mo_plan: Option<&MaximumOutputPlan>,
    assignments: &mut Vec<JobCellAssignment>,
    unscheduled: &mut Vec<(String, String)>,
) {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, wj) in pending.iter().enumerate() {
        groups.entry(wj.derived.fixture_id.clone()).or_default().push(idx);
    }

    let mut group_keys: Vec<String> = groups.keys().cloned().collect();
    group_keys.sort_by(|a, b| {
        let ga = &groups[a];
        let gb = &groups[b];
        let has_p0 = |g: &[usize]| g.iter().any(|&i| pending[i].derived.priority == Priority::PastDueOrExpediteToday);
        let earliest = |g: &[usize]| g.iter().map(|&i| pending[i].job.req_by).min().unwrap();
        let total_panels = |g: &[usize]| g.iter().map(|&i| pending[i].panels_remaining).sum::<u32>();
        (has_p0(gb), earliest(ga), std::cmp::Reverse(total_panels(ga)))
            .cmp(&(has_p0(ga), earliest(gb), std::cmp::Reverse(total_panels(gb))))
    });

    for key in group_keys {
        let indices = groups[&key].clone();
        for idx in indices {
            let wj = &mut pending[idx];
            while wj.panels_remaining > 0 {
                match try_place(
                    policy,
                    wj.job,
                    &wj.derived,
                    wj.panels_remaining,
                    tables,
                    pool,
                    config,
                    operator_inputs,
                    table_order,
                    capacity_order,
                    mo_plan,
                ) {
                    Some((cell, table, panels, alloc)) => {
                        commit_placement(wj.job, &wj.derived, cell, table, panels, alloc, tables, pool, operator_inputs, assignments);
                        wj.panels_remaining -= panels;
                    }
                    None => break,
                }
            }
            if wj.panels_remaining > 0 {
                debug!(job_id = %wj.job.id, "unscheduled: no compliant cell/table had capacity or molds");
                unscheduled.push((wj.job.id.clone(), "no compliant cell/table had capacity or molds".to_string()));
            }
        }
    }
}

/// Runs all 4 policies x 3 orderings.
pub fn schedule_all_variants(
    load: &DailyProductionLoad,
    config: &CycleTimeConstants,
    operator_inputs: &OperatorInputs,
) -> Result<Vec<(Policy, Ordering, MultiCellScheduleResult)>, SchedulingError> {
    let mut results = Vec::with_capacity(12);
    for policy in Policy::ALL {
        for ordering in Ordering::ALL {
            let result = schedule_variant(policy, ordering, load, config, operator_inputs)?;
            results.push((policy, ordering, result));
        }
    }
    Ok(results)
}

/// Runs all 12 variants and returns the highest-ranked result
/// ([`crate::evaluation::rank_score`]), ties broken by insertion order.
pub fn schedule_all_cells(
    load: &DailyProductionLoad,
    config: &CycleTimeConstants,
    operator_inputs: &OperatorInputs,
) -> Result<MultiCellScheduleResult, SchedulingError> {
    info!(
        date = %operator_inputs.schedule_date,
        jobs = load.jobs.len(),
        active_cells = operator_inputs.active_cells.len(),
        "schedule_all_cells start"
    );
    if operator_inputs.active_cells.is_empty() {
        return Ok(MultiCellScheduleResult {
            schedule_date: operator_inputs.schedule_date,
            shift_minutes: config.shift_minutes(operator_inputs.shift_type == crate::job::ShiftType::Overtime),
            status: ScheduleStatus::Infeasible,
            cell_results: HashMap::new(),
            job_assignments: Vec::new(),
            unscheduled_jobs: load.jobs.iter().map(|j| (j.id.clone(), "no active cells".to_string())).collect(),
            total_panels: 0,
            total_operator_minutes: 0,
            warnings: vec!["no active cells".to_string()],
        });
    }

    let variants = schedule_all_variants(load, config, operator_inputs)?;

    let today = operator_inputs.schedule_date;
    let mut priorities = HashMap::new();
    let mut sched_classes = HashMap::new();
    for job in &load.jobs {
        let derived = calculate_fields_for_job(job, config, today)?;
        priorities.insert(job.id.clone(), derived.priority);
        sched_classes.insert(job.id.clone(), derived.sched_class);
    }

    let evaluations: Vec<crate::evaluation::MethodEvaluation> = variants
        .iter()
        .map(|(policy, ordering, result)| {
            crate::evaluation::evaluate(*policy, *ordering, result, &priorities, &sched_classes)
        })
        .collect();
    let scores = crate::evaluation::rank_scores(&evaluations);
    let best = crate::evaluation::select_best(&scores);

    let (best_policy, best_ordering, best_result) = variants.into_iter().nth(best).unwrap();
    info!(
        %best_policy,
        %best_ordering,
        status = ?best_result.status,
        total_panels = best_result.total_panels,
        "schedule_all_cells done"
    );
    Ok(best_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{MoldType, Pattern};

    fn job(id: &str) -> Job {
        Job {
            id: id.to_string(),
            req_by: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            description: String::new(),
            pattern: Pattern::D,
            opening_size: 0.5,
            wire_diameter: 4.0,
            molds: 2,
            mold_type: MoldType::Standard,
            prod_qty: 10,
            equivalent: 1.0,
            orange_eligible: true,
            on_table_today: None,
            job_quantity_remaining: None,
            expedite: false,
            row_number: 0,
        }
    }

    fn derived(sched_class: SchedClass, sched_qty: u32) -> DerivedFields {
        DerivedFields {
            job_id: "J".to_string(),
            fixture_id: "D-0.5-4".to_string(),
            mold_depth: crate::config::MoldDepth::Std,
            molds: 2,
            equivalent: 1.0,
            sched_qty,
            sched_constant: 40.0,
            sched_class,
            pull_ahead: 0.0,
            setup: 15,
            layout: 10,
            pour_per_mold: 2.0,
            cure: 30.0,
            unload: 5,
            build_load: 1.0,
            build_date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            priority: Priority::Future,
        }
    }

    fn working<'a>(job: &'a Job, sched_class: SchedClass, sched_qty: u32) -> WorkingJob<'a> {
        WorkingJob {
            job,
            derived: derived(sched_class, sched_qty),
            panels_remaining: sched_qty,
        }
    }

    #[test]
    fn class_tier_orders_de_before_c_before_b_before_a() {
        assert!(class_tier(SchedClass::D) < class_tier(SchedClass::C));
        assert_eq!(class_tier(SchedClass::D), class_tier(SchedClass::E));
        assert!(class_tier(SchedClass::C) < class_tier(SchedClass::B));
        assert!(class_tier(SchedClass::B) < class_tier(SchedClass::A));
    }

    #[test]
    fn maximum_output_plan_rejects_non_class_a_on_dedicated_cells() {
        let plan = MaximumOutputPlan {
            dedicated_cells: [CellColor::Red].into_iter().collect(),
            class_e_table: None,
        };
        assert!(plan.rejects(CellColor::Red, SchedClass::B));
        assert!(!plan.rejects(CellColor::Red, SchedClass::A));
        assert!(!plan.rejects(CellColor::Blue, SchedClass::B));
    }

    #[test]
    fn maximum_output_plan_bonuses_only_the_designated_class_e_table() {
        let plan = MaximumOutputPlan {
            dedicated_cells: HashSet::new(),
            class_e_table: Some((CellColor::Green, TableIndex::One)),
        };
        assert!(plan.class_e_bonus(CellColor::Green, TableIndex::One, SchedClass::E) > 0.0);
        assert_eq!(plan.class_e_bonus(CellColor::Green, TableIndex::Two, SchedClass::E), 0.0);
        assert_eq!(plan.class_e_bonus(CellColor::Green, TableIndex::One, SchedClass::D), 0.0);
    }

    #[test]
    fn surplus_of_16_or_more_dedicates_two_cells() {
        let j1 = job("J1");
        let j2 = job("J2");
        let pending = vec![working(&j1, SchedClass::A, 20), working(&j2, SchedClass::B, 2)];
        let tables = HashMap::new();
        let active: HashSet<CellColor> = [CellColor::Red, CellColor::Blue, CellColor::Green].into_iter().collect();
        let table_order = vec![CellColor::Red, CellColor::Blue, CellColor::Green];
        let config = crate::config::CycleTimeConstants {
            task_timings: Vec::new(),
            molds: HashMap::new(),
            fixtures: HashMap::new(),
            holidays: HashSet::new(),
            standard_shift_minutes: 440,
            overtime_shift_minutes: 500,
            summer_cure_multiplier: 1.5,
            pour_cutoff_minutes: 40,
            max_layout_pour_gap: 60,
        };
        let plan = compute_maximum_output_plan(&pending, &tables, &[], &active, &table_order, &config, 440);
        // surplus = 20 - 2 = 18 >= 16 -> 2 dedicated cells.
        assert_eq!(plan.dedicated_cells.len(), 2);
    }

    #[test]
    fn nonpositive_surplus_dedicates_no_cells() {
        let j1 = job("J1");
        let j2 = job("J2");
        let pending = vec![working(&j1, SchedClass::A, 2), working(&j2, SchedClass::B, 20)];
        let tables = HashMap::new();
        let active: HashSet<CellColor> = [CellColor::Red, CellColor::Blue].into_iter().collect();
        let table_order = vec![CellColor::Red, CellColor::Blue];
        let config = crate::config::CycleTimeConstants {
            task_timings: Vec::new(),
            molds: HashMap::new(),
            fixtures: HashMap::new(),
            holidays: HashSet::new(),
            standard_shift_minutes: 440,
            overtime_shift_minutes: 500,
            summer_cure_multiplier: 1.5,
            pour_cutoff_minutes: 40,
            max_layout_pour_gap: 60,
        };
        let plan = compute_maximum_output_plan(&pending, &tables, &[], &active, &table_order, &config, 440);
        assert!(plan.dedicated_cells.is_empty());
    }
}
