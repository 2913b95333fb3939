//! Turning a glove sample into wheel duties.
pub mod duty;
pub mod hysteresis;

pub use duty::{compute_duty, DutyPair};
pub use hysteresis::{DirectionFilter, Gate, HysteresisState};
