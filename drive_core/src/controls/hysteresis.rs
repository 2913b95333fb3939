//! Debounced direction reversal.
//!
//! Flipping the H-bridge direction pins while the wheels are spinning is hard on the
//! drivers, and a hand held near the tilt midpoint would do it constantly. A request for the
//! other direction is only honoured after it has been held for more than `threshold` ticks,
//! and thrust is cut for as long as the request and the committed direction disagree.
use crate::motors::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HysteresisState {
    Aligned,
    Pending,
}

/// What the filter wants done with this tick's duties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gate {
    /// Requested direction matches, duties go through untouched
    Pass,
    /// Waiting out a reversal, duties are forced to zero
    Hold,
    /// Reversal accepted this tick: set both direction pins, duties still zero
    Commit(Direction),
}

impl Gate {
    pub fn suppresses_duty(&self) -> bool {
        !matches!(self, Gate::Pass)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionFilter {
    committed: Direction,
    /// One wider than the threshold so `threshold + 1` is reachable for any `u8` threshold
    counter: u16,
    threshold: u8,
}

impl DirectionFilter {
    pub fn new(threshold: u8) -> Self {
        Self {
            committed: Direction::Forward,
            counter: 0,
            threshold,
        }
    }

    pub fn update(&mut self, desired: Direction) -> Gate {
        if desired == self.committed {
            self.counter = 0;
            return Gate::Pass;
        }

        self.counter += 1;
        if self.counter > u16::from(self.threshold) {
            log::info!("direction change to {:?} committed", desired);
            self.committed = desired;
            self.counter = 0;
            return Gate::Commit(desired);
        }

        Gate::Hold
    }

    pub fn committed(&self) -> Direction {
        self.committed
    }

    pub fn state(&self) -> HysteresisState {
        if self.counter == 0 {
            HysteresisState::Aligned
        } else {
            HysteresisState::Pending
        }
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }
}
