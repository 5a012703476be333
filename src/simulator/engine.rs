//! Event-driven, minute-accurate single-cell timeline simulator.
//!
//! One simulated operator thread drives SETUP/LAYOUT/POUR/UNLOAD across
//! two tables; CURE is the only phase that advances time without the
//! operator. Deterministic given its inputs — no randomness, no I/O.

use super::panel::{EndOfDayPrepPanel, PanelUnit, ScheduledPanel};
use crate::cell::TableIndex;
use crate::error::SchedulingError;
use std::collections::{HashMap, VecDeque};

const MAX_ITERATIONS: u32 = 200;

/// Queued work for one table, plus whether the first queue entry is an
/// ON_TABLE_TODAY pin (which may skip SETUP/LAYOUT on the initial start).
#[derive(Debug, Clone)]
pub struct TableInput {
    pub table: TableIndex,
    pub queue: VecDeque<PanelUnit>,
    pub first_is_pinned: bool,
}

impl TableInput {
    pub fn new(table: TableIndex) -> Self {
        TableInput {
            table,
            queue: VecDeque::new(),
            first_is_pinned: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatorInput {
    pub table_one: TableInput,
    pub table_two: TableInput,
    pub shift_minutes: i64,
    pub summer_mode: bool,
    pub pour_cutoff_minutes: i64,
    #[allow(dead_code)]
    pub max_layout_pour_gap: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellStatus {
    Optimal,
    Infeasible,
}

#[derive(Debug, Clone, Default)]
pub struct TableResult {
    pub completed_panels: Vec<ScheduledPanel>,
    pub prep_panel: Option<EndOfDayPrepPanel>,
    pub forced_table_idle: i64,
}

#[derive(Debug, Clone)]
pub struct CellScheduleResult {
    pub status: CellStatus,
    pub table_results: HashMap<TableIndex, TableResult>,
    pub total_panels: u32,
    pub total_operator_minutes: i64,
    pub forced_operator_idle: i64,
}

/// Internal per-table simulation state. `unload` is carried alongside the
/// in-flight panel since [`ScheduledPanel`] only records the unload
/// window once it actually happens.
struct TableState {
    table: TableIndex,
    queue: VecDeque<PanelUnit>,
    completed: Vec<ScheduledPanel>,
    cure_end_time: Option<i64>,
    in_flight: Option<ScheduledPanel>,
    in_flight_unload: i64,
    last_fixture: Option<String>,
    panel_index: u32,
    prep: Option<EndOfDayPrepPanel>,
    forced_idle: i64,
}

impl TableState {
    fn new(input: TableInput) -> Self {
        TableState {
            table: input.table,
            queue: input.queue,
            completed: Vec::new(),
            cure_end_time: None,
            in_flight: None,
            in_flight_unload: 0,
            last_fixture: None,
            panel_index: 0,
            prep: None,
            forced_idle: 0,
        }
    }

    fn is_done(&self) -> bool {
        self.cure_end_time.is_none() && self.queue.is_empty() && self.in_flight.is_none()
    }
}

/// Lower equivalent wins; ties broken by larger cure, then larger
/// sched_qty.
fn wins_start_with_pour(a: &PanelUnit, b: &PanelUnit) -> bool {
    if (a.equivalent - b.equivalent).abs() > f64::EPSILON {
        a.equivalent < b.equivalent
    } else if (a.cure - b.cure).abs() > f64::EPSILON {
        a.cure > b.cure
    } else {
        a.sched_qty > b.sched_qty
    }
}

/// Selects which pinned table (if either) skips SETUP/LAYOUT on its
/// initial start because LAYOUT already happened before this shift began.
fn determine_start_conditions(a: Option<&PanelUnit>, b: Option<&PanelUnit>) -> (bool, bool) {
    match (a, b) {
        (Some(a_unit), Some(b_unit)) => {
            if wins_start_with_pour(a_unit, b_unit) {
                (true, false)
            } else {
                (false, true)
            }
        }
        (Some(_), None) => (true, false),
        (None, Some(_)) => (false, true),
        (None, None) => (false, false),
    }
}

fn start_panel(
    state: &mut TableState,
    panel: PanelUnit,
    current_time: &mut i64,
    skip_setup_layout: bool,
    summer_mode: bool,
) {
    let fixture_changed = state.last_fixture.as_deref() != Some(panel.fixture_id.as_str());
    let setup_start = *current_time;
    let setup_minutes = if skip_setup_layout {
        0
    } else if fixture_changed {
        panel.setup
    } else {
        0
    };
    let setup_end = setup_start + setup_minutes;

    let layout_minutes = if skip_setup_layout { 0 } else { panel.layout };
    let layout_end = setup_end + layout_minutes;

    let pour_minutes = (panel.pour_per_mold * panel.molds as f64).floor() as i64;
    let pour_end = layout_end + pour_minutes;

    let cure_multiplier = if summer_mode { 1.5 } else { 1.0 };
    let cure_minutes = (panel.cure * cure_multiplier).floor() as i64;
    let cure_end = pour_end + cure_minutes;

    *current_time = pour_end;
    state.last_fixture = Some(panel.fixture_id.clone());
    state.cure_end_time = Some(cure_end);
    state.in_flight_unload = panel.unload;
    state.in_flight = Some(ScheduledPanel {
        job_id: panel.job_id,
        table: state.table,
        panel_index: state.panel_index,
        setup_start,
        setup_end,
        layout_end,
        pour_end,
        cure_end,
        unload_start: 0,
        unload_end: 0,
    });
    state.panel_index += 1;
}

/// Advances `current_time` past this table's CURE and UNLOAD, moving its
/// in-flight panel to `completed`. Returns the forced-operator-idle delta
/// (positive iff the operator had to wait for CURE to finish).
fn finish_panel(state: &mut TableState, current_time: &mut i64) -> i64 {
    let cure_end = state
        .cure_end_time
        .take()
        .expect("finish_panel called without an in-flight cure");
    let operator_idle_delta = (cure_end - *current_time).max(0);
    let table_idle_delta = (*current_time - cure_end).max(0);
    state.forced_idle += table_idle_delta;
    *current_time = (*current_time).max(cure_end);

    let unload_start = *current_time;
    let unload_end = unload_start + state.in_flight_unload;
    *current_time = unload_end;

    let mut panel = state.in_flight.take().expect("in_flight panel missing");
    panel.unload_start = unload_start;
    panel.unload_end = unload_end;
    state.completed.push(panel);

    operator_idle_delta
}

/// Runs the single-cell simulation to completion or `max_iterations`.
pub fn simulate_cell(input: SimulatorInput) -> Result<CellScheduleResult, SchedulingError> {
    let shift_minutes = input.shift_minutes;
    let pour_cutoff = input.pour_cutoff_minutes;
    let summer_mode = input.summer_mode;
    let pinned_flags = [input.table_one.first_is_pinned, input.table_two.first_is_pinned];

    let mut tables = [
        TableState::new(input.table_one),
        TableState::new(input.table_two),
    ];

    let first_pinned = [
        tables[0].queue.front().cloned(),
        tables[1].queue.front().cloned(),
    ];
    let a_unit = if pinned_flags[0] { first_pinned[0].as_ref() } else { None };
    let b_unit = if pinned_flags[1] { first_pinned[1].as_ref() } else { None };
    let (a_starts_with_pour, b_starts_with_pour) = determine_start_conditions(a_unit, b_unit);
    let starts_with_pour = [a_starts_with_pour, b_starts_with_pour];

    let mut current_time: i64 = 0;
    let mut forced_operator_idle: i64 = 0;

    for i in 0..2 {
        if let Some(panel) = tables[i].queue.pop_front() {
            let skip = pinned_flags[i] && starts_with_pour[i];
            start_panel(&mut tables[i], panel, &mut current_time, skip, summer_mode);
        }
    }

    let mut iterations: u32 = 0;
    loop {
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            tracing::error!(
                max_iterations = MAX_ITERATIONS,
                "single-cell simulator safety counter tripped"
            );
            return Err(SchedulingError::InvariantBroken(format!(
                "single-cell simulator exceeded {MAX_ITERATIONS} iterations"
            )));
        }

        if tables.iter().all(TableState::is_done) || current_time >= shift_minutes {
            break;
        }

        let candidates: Vec<usize> = (0..2).filter(|&i| tables[i].cure_end_time.is_some()).collect();

        let i = match candidates
            .iter()
            .copied()
            .min_by_key(|&i| tables[i].cure_end_time.unwrap())
        {
            Some(i) => i,
            None => {
                // Neither table is curing: try to start any idle, queued table.
                let mut started = false;
                for j in 0..2 {
                    if tables[j].cure_end_time.is_none()
                        && tables[j].in_flight.is_none()
                        && !tables[j].queue.is_empty()
                    {
                        if let Some(panel) = tables[j].queue.pop_front() {
                            start_panel(&mut tables[j], panel, &mut current_time, false, summer_mode);
                            started = true;
                        }
                    }
                }
                if !started {
                    break;
                }
                continue;
            }
        };

        forced_operator_idle += finish_panel(&mut tables[i], &mut current_time);

        let remaining = shift_minutes - current_time;
        if remaining >= pour_cutoff {
            if let Some(next) = tables[i].queue.pop_front() {
                start_panel(&mut tables[i], next, &mut current_time, false, summer_mode);
            }
        } else {
            let other = 1 - i;
            let other_curing = tables[other].cure_end_time.is_some();
            if tables[i].prep.is_none() && !other_curing {
                if let Some(next) = tables[i].queue.front() {
                    let fixture_changed = tables[i].last_fixture.as_deref() != Some(next.fixture_id.as_str());
                    let setup = if fixture_changed { next.setup } else { 0 };
                    let layout = next.layout;
                    if current_time + setup + layout <= shift_minutes {
                        let panel = tables[i].queue.pop_front().unwrap();
                        let setup_start = current_time;
                        let setup_end = setup_start + setup;
                        let layout_end = setup_end + layout;
                        tables[i].prep = Some(EndOfDayPrepPanel {
                            job_id: panel.job_id,
                            table: tables[i].table,
                            fixture_id: panel.fixture_id,
                            setup_start,
                            setup_end,
                            layout_end,
                        });
                        current_time = layout_end;
                    }
                }
            }
        }
    }

    let mut table_results = HashMap::new();
    let mut total_panels = 0u32;
    let mut total_operator_minutes = 0i64;
    for state in tables {
        total_panels += state.completed.len() as u32;
        total_operator_minutes += state.completed.iter().map(ScheduledPanel::operator_time).sum::<i64>();
        table_results.insert(
            state.table,
            TableResult {
                completed_panels: state.completed,
                prep_panel: state.prep,
                forced_table_idle: state.forced_idle,
            },
        );
    }

    let status = if total_panels > 0 {
        CellStatus::Optimal
    } else {
        CellStatus::Infeasible
    };

    Ok(CellScheduleResult {
        status,
        table_results,
        total_panels,
        total_operator_minutes,
        forced_operator_idle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::TableIndex;

    fn unit(job_id: &str, fixture_id: &str) -> PanelUnit {
        PanelUnit {
            job_id: job_id.to_string(),
            fixture_id: fixture_id.to_string(),
            molds: 2,
            setup: 15,
            layout: 10,
            pour_per_mold: 2.0,
            cure: 30.0,
            unload: 5,
            equivalent: 1.0,
            sched_qty: 10,
        }
    }

    fn basic_input(queue_one: Vec<PanelUnit>, queue_two: Vec<PanelUnit>) -> SimulatorInput {
        let mut table_one = TableInput::new(TableIndex::One);
        table_one.queue = queue_one.into_iter().collect();
        let mut table_two = TableInput::new(TableIndex::Two);
        table_two.queue = queue_two.into_iter().collect();
        SimulatorInput {
            table_one,
            table_two,
            shift_minutes: 440,
            summer_mode: false,
            pour_cutoff_minutes: 40,
            max_layout_pour_gap: 60,
        }
    }

    #[test]
    fn single_panel_completes_and_is_optimal_s1() {
        let input = basic_input(vec![unit("J1", "D-1-2")], vec![]);
        let result = simulate_cell(input).unwrap();
        assert_eq!(result.status, CellStatus::Optimal);
        assert_eq!(result.total_panels, 1);
    }

    #[test]
    fn empty_queues_are_infeasible() {
        let input = basic_input(vec![], vec![]);
        let result = simulate_cell(input).unwrap();
        assert_eq!(result.status, CellStatus::Infeasible);
        assert_eq!(result.total_panels, 0);
    }

    #[test]
    fn consecutive_same_fixture_panels_skip_setup() {
        let input = basic_input(
            vec![unit("J1", "D-1-2"), unit("J2", "D-1-2")],
            vec![],
        );
        let result = simulate_cell(input).unwrap();
        let table = &result.table_results[&TableIndex::One];
        assert_eq!(table.completed_panels.len(), 2);
        let second = &table.completed_panels[1];
        assert_eq!(second.setup_end - second.setup_start, 0);
    }

    #[test]
    fn panels_never_start_past_shift_end() {
        let mut input = basic_input(vec![unit("J1", "D-1-2"); 50], vec![]);
        input.shift_minutes = 100;
        let result = simulate_cell(input).unwrap();
        for panel in &result.table_results[&TableIndex::One].completed_panels {
            assert!(panel.end_time() <= 100);
        }
    }

    #[test]
    fn no_panels_overlap_on_operator_timeline() {
        let input = basic_input(
            vec![unit("J1", "D-1-2"), unit("J2", "D-1-2")],
            vec![unit("J3", "S-2-3")],
        );
        let result = simulate_cell(input).unwrap();
        let mut all: Vec<&ScheduledPanel> = result
            .table_results
            .values()
            .flat_map(|t| t.completed_panels.iter())
            .collect();
        all.sort_by_key(|p| p.start_time());
        for w in all.windows(2) {
            assert!(!w[0].overlaps(w[1]));
        }
    }
}
