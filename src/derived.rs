//! Derived-field computation: convert a raw [`Job`] plus frozen config and
//! today's date into scheduling-ready fields.

use crate::cell::SchedClass;
use crate::calendar::subtract_business_days;
use crate::config::{mold_depth, CycleTimeConstants, MoldDepth};
use crate::error::ConfigurationError;
use crate::job::Job;
use chrono::NaiveDate;

/// Derived urgency. Lower is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Priority {
    PastDueOrExpediteToday = 0,
    DueToday = 1,
    FutureExpedite = 2,
    Future = 3,
}

/// Fields computed once per job for the duration of a scheduling run.
/// Never mutated after computation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DerivedFields {
    pub job_id: String,
    pub fixture_id: String,
    pub mold_depth: MoldDepth,
    pub molds: u32,
    pub equivalent: f64,
    pub sched_qty: u32,
    pub sched_constant: f64,
    pub sched_class: SchedClass,
    pub pull_ahead: f64,
    pub setup: i64,
    pub layout: i64,
    pub pour_per_mold: f64,
    pub cure: f64,
    pub unload: i64,
    pub build_load: f64,
    pub build_date: NaiveDate,
    pub priority: Priority,
}

/// Pure function: `(job, config, today) -> DerivedFields`.
///
/// Fails only with [`ConfigurationError`] when no task timing (including
/// the `>=2` fallback tier) is defined for the job's wire diameter /
/// equivalent combination.
pub fn calculate_fields_for_job(
    job: &Job,
    config: &CycleTimeConstants,
    today: NaiveDate,
) -> Result<DerivedFields, ConfigurationError> {
    let timing = config.get_task_timing(job.wire_diameter, job.equivalent)?;

    let sched_qty = match job.on_table_today {
        Some(_) => job.job_quantity_remaining.unwrap_or(job.prod_qty),
        None => job.prod_qty,
    };

    let build_load = (sched_qty as f64) * job.equivalent / timing.sched_constant;
    let lead_time_days = (build_load + timing.pull_ahead).ceil().max(0.0) as u32;
    let build_date = subtract_business_days(job.req_by, lead_time_days, &config.holidays);

    let priority = calculate_priority(build_date, today, job.expedite);

    Ok(DerivedFields {
        job_id: job.id.clone(),
        fixture_id: job.fixture_id(),
        mold_depth: mold_depth(job.wire_diameter),
        molds: job.molds,
        equivalent: job.equivalent,
        sched_qty,
        sched_constant: timing.sched_constant,
        sched_class: timing.sched_class,
        pull_ahead: timing.pull_ahead,
        setup: timing.setup,
        layout: timing.layout,
        pour_per_mold: timing.pour_per_mold,
        cure: timing.cure,
        unload: timing.unload,
        build_load,
        build_date,
        priority,
    })
}

/// 0 if past due or due today with expedite; 1 if due today without
/// expedite; 2 if due in the future with expedite; 3 otherwise.
pub fn calculate_priority(build_date: NaiveDate, today: NaiveDate, expedite: bool) -> Priority {
    if build_date < today || (build_date == today && expedite) {
        Priority::PastDueOrExpediteToday
    } else if build_date == today {
        Priority::DueToday
    } else if expedite {
        Priority::FutureExpedite
    } else {
        Priority::Future
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{MoldType, OnTableToday, Pattern};
    use std::collections::{HashMap, HashSet};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config_with_timing() -> CycleTimeConstants {
        CycleTimeConstants {
            task_timings: vec![crate::config::TaskTiming {
                wire_diameter_bucket: "<=4".to_string(),
                equivalent_tier: "1.0".to_string(),
                setup: 15,
                layout: 10,
                pour_per_mold: 2.0,
                cure: 30.0,
                unload: 5,
                sched_constant: 40.0,
                sched_class: SchedClass::A,
                pull_ahead: 0.0,
            }],
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

    fn job() -> Job {
        Job {
            id: "J1".to_string(),
            req_by: ymd(2026, 8, 10),
            description: String::new(),
            pattern: Pattern::D,
            opening_size: 0.5,
            wire_diameter: 4.0,
            molds: 2,
            mold_type: MoldType::Standard,
            prod_qty: 40,
            equivalent: 1.0,
            orange_eligible: true,
            on_table_today: None,
            job_quantity_remaining: None,
            expedite: false,
            row_number: 0,
        }
    }

    #[test]
    fn sched_qty_is_prod_qty_when_not_on_table_p9() {
        let config = config_with_timing();
        let derived = calculate_fields_for_job(&job(), &config, ymd(2026, 7, 28)).unwrap();
        assert_eq!(derived.sched_qty, 40);
    }

    #[test]
    fn sched_qty_is_remaining_when_on_table() {
        let config = config_with_timing();
        let mut j = job();
        j.on_table_today = Some(OnTableToday {
            cell: crate::cell::CellColor::Red,
            table: crate::cell::TableIndex::One,
        });
        j.job_quantity_remaining = Some(5);
        let derived = calculate_fields_for_job(&j, &config, ymd(2026, 7, 28)).unwrap();
        assert_eq!(derived.sched_qty, 5);
    }

    #[test]
    fn build_load_formula() {
        let config = config_with_timing();
        let derived = calculate_fields_for_job(&job(), &config, ymd(2026, 7, 28)).unwrap();
        // sched_qty * equivalent / sched_constant = 40 * 1.0 / 40.0 = 1.0
        assert_eq!(derived.build_load, 1.0);
    }

    #[test]
    fn build_date_is_business_day_p10() {
        let config = config_with_timing();
        let derived = calculate_fields_for_job(&job(), &config, ymd(2026, 7, 28)).unwrap();
        assert!(crate::calendar::is_business_day(
            derived.build_date,
            &config.holidays
        ));
    }

    #[test]
    fn priority_past_due() {
        assert_eq!(
            calculate_priority(ymd(2026, 7, 1), ymd(2026, 7, 28), false),
            Priority::PastDueOrExpediteToday
        );
    }

    #[test]
    fn priority_today_with_expedite() {
        assert_eq!(
            calculate_priority(ymd(2026, 7, 28), ymd(2026, 7, 28), true),
            Priority::PastDueOrExpediteToday
        );
    }

    #[test]
    fn priority_today_without_expedite() {
        assert_eq!(
            calculate_priority(ymd(2026, 7, 28), ymd(2026, 7, 28), false),
            Priority::DueToday
        );
    }

    #[test]
    fn priority_future_with_expedite() {
        assert_eq!(
            calculate_priority(ymd(2026, 8, 1), ymd(2026, 7, 28), true),
            Priority::FutureExpedite
        );
    }

    #[test]
    fn priority_future_without_expedite() {
        assert_eq!(
            calculate_priority(ymd(2026, 8, 1), ymd(2026, 7, 28), false),
            Priority::Future
        );
    }

    #[test]
    fn missing_task_timing_is_configuration_error() {
        let config = config_with_timing();
        let mut j = job();
        j.wire_diameter = 20.0; // >=8 bucket, undefined
        assert!(calculate_fields_for_job(&j, &config, ymd(2026, 7, 28)).is_err());
    }
}
