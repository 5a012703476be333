//! Per-variant metrics and the ranking score used to pick the best of
//! the 12 `(policy, ordering)` candidates.

use crate::assignment::{MultiCellScheduleResult, Ordering, Policy};
use crate::cell::SchedClass;
use crate::derived::Priority;
use crate::simulator::CellStatus;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityMetric {
    pub scheduled_count: u32,
    pub panels_scheduled: u32,
}

/// A scored snapshot of one `(policy, ordering)` result. Kept alongside
/// its result purely for diagnostics (via `tracing`) and ranking; never
/// mutates or re-derives the simulation itself.
#[derive(Debug, Clone)]
pub struct MethodEvaluation {
    pub policy: Policy,
    pub ordering: Ordering,
    /// Indexed by `Priority as usize` (0 = most urgent .. 3 = least).
    pub priority_metrics: [PriorityMetric; 4],
    pub class_metrics: HashMap<SchedClass, u32>,
    pub forced_table_idle: i64,
    pub forced_operator_idle: i64,
    pub operator_utilization_pct: f64,
    pub total_panels: u32,
    pub total_jobs_scheduled: u32,
    pub total_jobs_unscheduled: u32,
}

impl MethodEvaluation {
    pub fn full_name(&self) -> String {
        format!("{}+{}", self.policy, self.ordering)
    }
}

/// Builds the metrics for one already-computed result. `derived_by_id`
/// must be the same per-job derived fields the assignment phase used
/// (priority and sched_class are not otherwise recoverable from the
/// result alone).
pub fn evaluate(
    policy: Policy,
    ordering: Ordering,
    result: &MultiCellScheduleResult,
    priorities: &HashMap<String, Priority>,
    sched_classes: &HashMap<String, SchedClass>,
) -> MethodEvaluation {
    let mut priority_metrics = [PriorityMetric::default(); 4];
    let mut class_metrics: HashMap<SchedClass, u32> = HashMap::new();

    for assignment in &result.job_assignments {
        if let Some(&priority) = priorities.get(&assignment.job_id) {
            let entry = &mut priority_metrics[priority as usize];
            entry.scheduled_count += 1;
            entry.panels_scheduled += assignment.panels_to_schedule;
        }
        if let Some(&class) = sched_classes.get(&assignment.job_id) {
            *class_metrics.entry(class).or_insert(0) += assignment.panels_to_schedule;
        }
    }

    let forced_table_idle: i64 = result
        .cell_results
        .values()
        .flat_map(|cell| cell.table_results.values())
        .map(|table| table.forced_table_idle)
        .sum();
    let forced_operator_idle: i64 = result.cell_results.values().map(|cell| cell.forced_operator_idle).sum();

    let eligible_cells = result
        .cell_results
        .values()
        .filter(|cell| matches!(cell.status, CellStatus::Optimal))
        .count() as f64;
    let operator_utilization_pct = if eligible_cells > 0.0 && result.shift_minutes > 0 {
        let operator_minutes: i64 = result
            .cell_results
            .values()
            .filter(|cell| matches!(cell.status, CellStatus::Optimal))
            .map(|cell| cell.total_operator_minutes)
            .sum();
        (operator_minutes as f64) / (result.shift_minutes as f64 * eligible_cells) * 100.0
    } else {
        0.0
    };

    let total_jobs_scheduled = result.job_assignments.len() as u32;
    let total_jobs_unscheduled = result.unscheduled_jobs.len() as u32;

    MethodEvaluation {
        policy,
        ordering,
        priority_metrics,
        class_metrics,
        forced_table_idle,
        forced_operator_idle,
        operator_utilization_pct,
        total_panels: result.total_panels,
        total_jobs_scheduled,
        total_jobs_unscheduled,
    }
}

/// `0.4·panels/max_panels + 0.3·p0_scheduled/max_p0 + 0.2·(1 −
/// total_idle/max_idle) + 0.1·jobs/max_jobs`. Higher is better.
pub fn rank_scores(evaluations: &[MethodEvaluation]) -> Vec<f64> {
    let max_panels = evaluations.iter().map(|e| e.total_panels).max().unwrap_or(0).max(1) as f64;
    let max_p0 = evaluations
        .iter()
        .map(|e| e.priority_metrics[0].scheduled_count)
        .max()
        .unwrap_or(0)
        .max(1) as f64;
    let max_idle = evaluations
        .iter()
        .map(|e| e.forced_table_idle + e.forced_operator_idle)
        .max()
        .unwrap_or(0)
        .max(1) as f64;
    let max_jobs = evaluations.iter().map(|e| e.total_jobs_scheduled).max().unwrap_or(0).max(1) as f64;

    evaluations
        .iter()
        .map(|e| {
            let idle = (e.forced_table_idle + e.forced_operator_idle) as f64;
            0.4 * (e.total_panels as f64 / max_panels)
                + 0.3 * (e.priority_metrics[0].scheduled_count as f64 / max_p0)
                + 0.2 * (1.0 - idle / max_idle)
                + 0.1 * (e.total_jobs_scheduled as f64 / max_jobs)
        })
        .collect()
}

/// Index of the highest score; first occurrence wins ties (stable,
/// insertion order).
pub fn select_best(scores: &[f64]) -> usize {
    let mut best = 0;
    let mut best_score = f64::MIN;
    for (i, &score) in scores.iter().enumerate() {
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation(total_panels: u32, p0: u32, idle: i64, jobs: u32) -> MethodEvaluation {
        let mut priority_metrics = [PriorityMetric::default(); 4];
        priority_metrics[0].scheduled_count = p0;
        MethodEvaluation {
            policy: Policy::PriorityFirst,
            ordering: Ordering::JobFirst,
            priority_metrics,
            class_metrics: HashMap::new(),
            forced_table_idle: idle,
            forced_operator_idle: 0,
            operator_utilization_pct: 0.0,
            total_panels,
            total_jobs_scheduled: jobs,
            total_jobs_unscheduled: 0,
        }
    }

    #[test]
    fn full_name_joins_policy_and_ordering() {
        let e = evaluation(10, 1, 0, 1);
        assert_eq!(e.full_name(), "PriorityFirst+JobFirst");
    }

    #[test]
    fn higher_panels_and_lower_idle_scores_higher() {
        let a = evaluation(100, 5, 0, 10);
        let b = evaluation(50, 5, 50, 10);
        let scores = rank_scores(&[a, b]);
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn select_best_breaks_ties_by_insertion_order() {
        let a = evaluation(10, 1, 0, 1);
        let b = evaluation(10, 1, 0, 1);
        let scores = rank_scores(&[a, b]);
        assert_eq!(select_best(&scores), 0);
    }
}
