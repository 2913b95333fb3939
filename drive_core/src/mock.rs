//! Host side stand-ins for the board peripherals.
use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::encoder::Odometer;
use crate::timer::{CompareChannel, CompareOutputMode, TickCounter};

/// Output pin whose level can be observed through any clone.
#[derive(Debug, Clone, Default)]
pub struct MockPin {
    level: Rc<Cell<bool>>,
    writes: Rc<Cell<u32>>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.level.get()
    }

    pub fn is_low(&self) -> bool {
        !self.level.get()
    }

    pub fn writes(&self) -> u32 {
        self.writes.get()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.set(false);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.set(true);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MockChannel {
    top: u16,
    compare: Rc<Cell<u16>>,
    mode: Rc<Cell<CompareOutputMode>>,
}

impl MockChannel {
    pub fn new(top: u16) -> Self {
        Self {
            top,
            compare: Rc::new(Cell::new(0)),
            mode: Rc::new(Cell::new(CompareOutputMode::Disconnected)),
        }
    }

    pub fn compare(&self) -> u16 {
        self.compare.get()
    }

    pub fn mode(&self) -> CompareOutputMode {
        self.mode.get()
    }

    pub fn is_driving(&self) -> bool {
        self.mode.get() != CompareOutputMode::Disconnected
    }
}

impl CompareChannel for MockChannel {
    fn top(&self) -> u16 {
        self.top
    }

    fn set_compare(&mut self, value: u16) {
        self.compare.set(value);
    }

    fn set_output_mode(&mut self, mode: CompareOutputMode) {
        self.mode.set(mode);
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockCounter {
    ticks: Rc<Cell<u32>>,
    resets: Rc<Cell<u32>>,
}

impl MockCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ticks: u32) {
        self.ticks.set(ticks);
    }

    pub fn resets(&self) -> u32 {
        self.resets.get()
    }
}

impl TickCounter for MockCounter {
    fn ticks(&self) -> u32 {
        self.ticks.get()
    }

    fn reset(&mut self) {
        self.ticks.set(0);
        self.resets.set(self.resets.get() + 1);
    }
}

#[derive(Debug, Default)]
pub struct NoopDelay {
    pub total_ns: u64,
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

/// A wheel on the bench: every time the encoder is polled while the PWM output is driving,
/// the shaft moves one count. Which way depends on the direction pin and on how the motor
/// leads are wired.
pub struct SimulatedWheel {
    pub pwm: MockChannel,
    pub dir: MockPin,
    /// Level on the direction pin that makes the encoder count up
    pub counts_up_when_high: bool,
    /// Stalled wheels never move
    pub stalled: bool,
    pub position: i32,
    pub polls: u32,
}

impl SimulatedWheel {
    pub fn new(pwm: MockChannel, dir: MockPin, counts_up_when_high: bool) -> Self {
        Self {
            pwm,
            dir,
            counts_up_when_high,
            stalled: false,
            position: 0,
            polls: 0,
        }
    }
}

impl Odometer for SimulatedWheel {
    fn count(&mut self) -> i32 {
        self.polls += 1;
        if self.pwm.is_driving() && !self.stalled {
            if self.dir.is_high() == self.counts_up_when_high {
                self.position += 1;
            } else {
                self.position -= 1;
            }
        }
        self.position
    }

    fn reset_count(&mut self) {
        self.position = 0;
    }
}
