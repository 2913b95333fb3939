pub mod calibration;

use core::ops::Not;

use embedded_hal::digital::{OutputPin, PinState};

use crate::error::Error;
use crate::timer::{compare_for_duty, CompareChannel, CompareOutputMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// Glove direction bit, forward = 1.
    pub fn from_bit(bit: u8) -> Self {
        if bit != 0 {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }

    pub fn to_bit(&self) -> u8 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => 0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// One wheel: PWM compare output for speed, a GPIO for the driver's direction input.
///
/// `forward_level` is the direction pin level that makes the encoder count up. It starts
/// out as a guess (low) and is fixed by [`calibration::calibrate`], after which "forward"
/// means the same thing for both wheels no matter how they are wired.
pub struct Motor<C, D> {
    side: Side,
    pwm: C,
    dir: D,
    forward_level: PinState,
    duty: u8,
    direction: Direction,
}

impl<C, D, E> Motor<C, D>
where
    C: CompareChannel,
    D: OutputPin<Error = E>,
{
    /// Takes the outputs and leaves the motor de-energised and pointing forward.
    pub fn new(side: Side, pwm: C, dir: D) -> Result<Self, Error<E>> {
        let mut motor = Self {
            side,
            pwm,
            dir,
            forward_level: PinState::Low,
            duty: 0,
            direction: Direction::Forward,
        };

        motor.set_duty(0);
        motor.set_forward()?;

        Ok(motor)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// 0 detaches the PWM pin entirely so the driver coasts, anything above 100 is 100.
    pub fn set_duty(&mut self, percent: u8) {
        let percent = percent.min(100);
        self.duty = percent;

        if percent == 0 {
            self.pwm.set_compare(0);
            self.pwm.set_output_mode(CompareOutputMode::Disconnected);
            return;
        }

        let compare = compare_for_duty(self.pwm.top(), percent);
        self.pwm.set_compare(compare);
        self.pwm.set_output_mode(CompareOutputMode::ClearOnMatch);
    }

    pub fn set_forward(&mut self) -> Result<(), Error<E>> {
        self.dir.set_state(self.forward_level).map_err(Error::Pin)?;
        self.direction = Direction::Forward;
        Ok(())
    }

    pub fn set_backward(&mut self) -> Result<(), Error<E>> {
        self.dir
            .set_state(self.forward_level.not())
            .map_err(Error::Pin)?;
        self.direction = Direction::Backward;
        Ok(())
    }

    pub fn set_direction(&mut self, direction: Direction) -> Result<(), Error<E>> {
        match direction {
            Direction::Forward => self.set_forward(),
            Direction::Backward => self.set_backward(),
        }
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn forward_level(&self) -> PinState {
        self.forward_level
    }

    pub(crate) fn flip_polarity(&mut self) {
        self.forward_level = self.forward_level.not();
    }

    pub fn release(self) -> (C, D) {
        (self.pwm, self.dir)
    }
}

pub struct MotorPair<L, R> {
    pub left: L,
    pub right: R,
}

impl<C1, D1, C2, D2, E> MotorPair<Motor<C1, D1>, Motor<C2, D2>>
where
    C1: CompareChannel,
    D1: OutputPin<Error = E>,
    C2: CompareChannel,
    D2: OutputPin<Error = E>,
{
    pub fn new(left: Motor<C1, D1>, right: Motor<C2, D2>) -> Self {
        Self { left, right }
    }

    pub fn set_direction(&mut self, direction: Direction) -> Result<(), Error<E>> {
        self.left.set_direction(direction)?;
        self.right.set_direction(direction)
    }

    /// Duties go out unchanged for either direction, only the direction pins differ.
    pub fn set_duty(&mut self, left: u8, right: u8) {
        self.left.set_duty(left);
        self.right.set_duty(right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockChannel, MockPin};

    fn motor() -> Motor<MockChannel, MockPin> {
        Motor::new(Side::Left, MockChannel::new(3999), MockPin::new()).unwrap()
    }

    #[test]
    fn starts_off_and_forward() {
        let m = motor();
        assert_eq!(m.duty(), 0);
        assert_eq!(m.direction(), Direction::Forward);
        assert_eq!(m.pwm.mode(), CompareOutputMode::Disconnected);
        assert!(m.dir.is_low());
    }

    #[test]
    fn duty_drives_compare_register() {
        let mut m = motor();
        m.set_duty(50);
        assert_eq!(m.pwm.compare(), 1999);
        assert_eq!(m.pwm.mode(), CompareOutputMode::ClearOnMatch);

        m.set_duty(130);
        assert_eq!(m.duty(), 100);
        assert_eq!(m.pwm.compare(), 3999);
    }

    #[test]
    fn zero_duty_disconnects_output() {
        let mut m = motor();
        m.set_duty(80);
        m.set_duty(0);
        assert_eq!(m.pwm.mode(), CompareOutputMode::Disconnected);
        assert_eq!(m.pwm.compare(), 0);
    }

    #[test]
    fn polarity_decides_direction_level() {
        let mut m = motor();
        m.set_backward().unwrap();
        assert!(m.dir.is_high());

        m.flip_polarity();
        m.set_forward().unwrap();
        assert!(m.dir.is_high());
        m.set_backward().unwrap();
        assert!(m.dir.is_low());
        assert_eq!(m.direction(), Direction::Backward);
    }

    #[test]
    fn pair_applies_same_direction() {
        let left = motor();
        let mut right = Motor::new(Side::Right, MockChannel::new(3999), MockPin::new()).unwrap();
        right.flip_polarity();
        let mut pair = MotorPair::new(left, right);

        pair.set_direction(Direction::Backward).unwrap();
        assert!(pair.left.dir.is_high());
        assert!(pair.right.dir.is_low());

        pair.set_duty(30, 0);
        assert_eq!(pair.left.duty(), 30);
        assert_eq!(pair.right.pwm.mode(), CompareOutputMode::Disconnected);
    }

    #[test]
    fn direction_bits() {
        assert_eq!(Direction::from_bit(1), Direction::Forward);
        assert_eq!(Direction::from_bit(7), Direction::Forward);
        assert_eq!(Direction::from_bit(0), Direction::Backward);
        assert_eq!(Direction::Backward.to_bit(), 0);
        assert_eq!(Direction::Forward.opposite(), Direction::Backward);
    }
}
