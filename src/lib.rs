//! cell-scheduler
//!
//! Shift-scheduling core for a thermoforming plant: derived-field
//! computation, mold/fixture resource pooling, a heuristic assignment
//! engine (12 policy/ordering variants), and a single-cell timeline
//! simulator.

pub mod assignment;
pub mod calendar;
pub mod cell;
pub mod config;
pub mod derived;
pub mod error;
pub mod evaluation;
pub mod job;
pub mod resource;
pub mod simulator;
pub mod validate;

pub use error::{ConfigurationError, SchedulingError, ValidationError};
