//! Rough per-panel cycle-time estimation used for packing decisions only.
//! The timeline simulator (`simulator`) is the ground truth for the
//! actual schedule; these estimates exist to decide how many panels of a
//! job plausibly fit on a table before running the real simulation.

const TRANSITION_MINUTES: f64 = 5.0;

/// Estimated minutes for the first panel (full SETUP/LAYOUT) and for
/// every subsequent panel on the same table (SETUP zeroed when the
/// fixture does not change).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleEstimate {
    pub cycle_first: f64,
    pub cycle_subsequent: f64,
}

/// `needs_setup` zeros SETUP when `last_fixture == job.fixture_id`.
pub fn cycle_estimate(
    setup: i64,
    layout: i64,
    pour_per_mold: f64,
    molds: u32,
    cure: f64,
    unload: i64,
    summer_mode: bool,
    needs_setup: bool,
) -> CycleEstimate {
    let setup_minutes = if needs_setup { setup as f64 } else { 0.0 };
    let pour = pour_per_mold * molds as f64;
    let op_first = setup_minutes + layout as f64 + pour;
    let op_subsequent = layout as f64 + pour;
    let cure_adj = cure * if summer_mode { 1.5 } else { 1.0 };

    CycleEstimate {
        cycle_first: op_first.max(cure_adj) + unload as f64,
        cycle_subsequent: op_subsequent.max(cure_adj) + unload as f64 + TRANSITION_MINUTES,
    }
}

pub fn rough_time(estimate: CycleEstimate, panels: u32) -> f64 {
    if panels == 0 {
        return 0.0;
    }
    estimate.cycle_first + (panels - 1) as f64 * estimate.cycle_subsequent
}

/// Inverts `rough_time`: the most panels that fit within `available_minutes`.
pub fn max_panels_that_fit(estimate: CycleEstimate, available_minutes: f64) -> u32 {
    if estimate.cycle_first > available_minutes {
        return 0;
    }
    1 + ((available_minutes - estimate.cycle_first) / estimate.cycle_subsequent).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(needs_setup: bool) -> CycleEstimate {
        cycle_estimate(15, 10, 2.0, 2, 30.0, 5, false, needs_setup)
    }

    #[test]
    fn first_panel_includes_setup() {
        let e = estimate(true);
        // op_first = 15+10+4=29, cure=30 -> max=30, +5 unload = 35
        assert_eq!(e.cycle_first, 35.0);
    }

    #[test]
    fn subsequent_panel_skips_setup_when_fixture_reused() {
        let e = estimate(false);
        // op_subsequent = 10+4=14, cure=30 -> max=30, +5+5(transition) = 40
        assert_eq!(e.cycle_subsequent, 40.0);
    }

    #[test]
    fn rough_time_zero_panels_is_zero() {
        assert_eq!(rough_time(estimate(true), 0), 0.0);
    }

    #[test]
    fn rough_time_matches_formula_for_k_panels() {
        let e = estimate(true);
        assert_eq!(rough_time(e, 3), e.cycle_first + 2.0 * e.cycle_subsequent);
    }

    #[test]
    fn max_panels_zero_when_first_panel_does_not_fit() {
        let e = estimate(true);
        assert_eq!(max_panels_that_fit(e, 10.0), 0);
    }

    #[test]
    fn max_panels_inverts_rough_time() {
        let e = estimate(true);
        let available = rough_time(e, 4);
        assert_eq!(max_panels_that_fit(e, available), 4);
    }

    #[test]
    fn summer_mode_inflates_cure() {
        let normal = cycle_estimate(15, 10, 2.0, 2, 30.0, 5, false, true);
        let summer = cycle_estimate(15, 10, 2.0, 2, 30.0, 5, true, true);
        assert!(summer.cycle_first > normal.cycle_first);
    }
}
