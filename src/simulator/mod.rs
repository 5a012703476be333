//! Deterministic discrete-time simulation of one cell's two tables
//! sharing a single operator.

mod engine;
mod panel;

pub use engine::{simulate_cell, CellScheduleResult, CellStatus, SimulatorInput, TableInput, TableResult};
pub use panel::{EndOfDayPrepPanel, PanelUnit, ScheduledPanel};
