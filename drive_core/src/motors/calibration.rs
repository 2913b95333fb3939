//! Startup polarity discovery.
//!
//! The direction pin level that moves a wheel "forward" depends on how its leads were
//! soldered. Spin each wheel a little with the current guess, look at which way the encoder
//! went, flip the guess if it went negative, then drive the wheel back to where it started.
//! This physically nudges the vehicle and must finish before the drive loop starts.
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::{Direction, Motor};
use crate::config::CalibrationConfig;
use crate::encoder::Odometer;
use crate::error::{CalibrationError, Error};
use crate::timer::CompareChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationStage {
    Probe,
    Recenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationReport {
    pub flipped: bool,
    /// Encoder count when the probe stopped, before any flip
    pub probe_count: i32,
    pub polls: u32,
}

pub fn calibrate<C, D, E, O, DL>(
    motor: &mut Motor<C, D>,
    encoder: &mut O,
    delay: &mut DL,
    config: &CalibrationConfig,
) -> Result<CalibrationReport, Error<E>>
where
    C: CompareChannel,
    D: OutputPin<Error = E>,
    E: core::fmt::Debug,
    O: Odometer,
    DL: DelayNs,
{
    let result = probe_and_center(motor, encoder, delay, config);
    // Whatever happened, the wheel does not keep spinning.
    motor.set_duty(0);

    match &result {
        Ok(report) => log::info!(
            "{:?} motor calibrated: probe {} counts, flipped {}, {} polls",
            motor.side(),
            report.probe_count,
            report.flipped,
            report.polls
        ),
        Err(e) => log::error!("{:?} motor calibration failed: {:?}", motor.side(), e),
    }

    result
}

fn probe_and_center<C, D, E, O, DL>(
    motor: &mut Motor<C, D>,
    encoder: &mut O,
    delay: &mut DL,
    config: &CalibrationConfig,
) -> Result<CalibrationReport, Error<E>>
where
    C: CompareChannel,
    D: OutputPin<Error = E>,
    O: Odometer,
    DL: DelayNs,
{
    let max_polls = config.max_polls();
    let mut polls = 0;

    encoder.reset_count();
    motor.set_forward()?;
    motor.set_duty(config.duty_percent);

    let mut count = encoder.count();
    while count.abs() < config.threshold {
        if polls >= max_polls {
            return Err(CalibrationError::Timeout {
                stage: CalibrationStage::Probe,
                count,
            }
            .into());
        }
        delay.delay_us(config.poll_interval.ticks());
        count = encoder.count();
        polls += 1;
    }
    motor.set_duty(0);

    let probe_count = encoder.count();
    let flipped = probe_count < 0;
    if flipped {
        motor.flip_polarity();
    }

    polls += return_to_reference(motor, encoder, delay, config)?;

    Ok(CalibrationReport {
        flipped,
        probe_count,
        polls,
    })
}

/// Creep back to encoder count zero and stop there. Returns the number of polls spent.
pub fn return_to_reference<C, D, E, O, DL>(
    motor: &mut Motor<C, D>,
    encoder: &mut O,
    delay: &mut DL,
    config: &CalibrationConfig,
) -> Result<u32, Error<E>>
where
    C: CompareChannel,
    D: OutputPin<Error = E>,
    O: Odometer,
    DL: DelayNs,
{
    let max_polls = config.max_polls();
    let mut polls = 0;

    let mut count = encoder.count();
    while count != 0 {
        if polls >= max_polls {
            motor.set_duty(0);
            return Err(CalibrationError::Timeout {
                stage: CalibrationStage::Recenter,
                count,
            }
            .into());
        }

        let towards_zero = if count > 0 {
            Direction::Backward
        } else {
            Direction::Forward
        };
        if motor.direction() != towards_zero || motor.duty() == 0 {
            motor.set_direction(towards_zero)?;
            motor.set_duty(config.duty_percent);
        }

        delay.delay_us(config.poll_interval.ticks());
        count = encoder.count();
        polls += 1;
    }

    motor.set_duty(0);
    motor.set_forward()?;

    Ok(polls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockChannel, MockPin, NoopDelay, SimulatedWheel};
    use crate::motors::Side;
    use crate::timer::CompareOutputMode;
    use embedded_hal::digital::PinState;

    fn bench(counts_up_when_high: bool) -> (Motor<MockChannel, MockPin>, SimulatedWheel) {
        let pwm = MockChannel::new(3999);
        let dir = MockPin::new();
        let wheel = SimulatedWheel::new(pwm.clone(), dir.clone(), counts_up_when_high);
        let motor = Motor::new(Side::Left, pwm, dir).unwrap();
        (motor, wheel)
    }

    #[test]
    fn correct_guess_keeps_polarity() {
        let (mut motor, mut wheel) = bench(false);
        let mut delay = NoopDelay::default();

        let report = calibrate(&mut motor, &mut wheel, &mut delay, &CalibrationConfig::DEFAULT)
            .unwrap();

        assert!(!report.flipped);
        assert!(report.probe_count >= 10);
        assert_eq!(motor.forward_level(), PinState::Low);
        assert_eq!(wheel.position, 0);
        assert_eq!(motor.duty(), 0);
        assert_eq!(wheel.pwm.mode(), CompareOutputMode::Disconnected);
    }

    #[test]
    fn wrong_guess_flips_once() {
        let (mut motor, mut wheel) = bench(true);
        let mut delay = NoopDelay::default();
        let cfg = CalibrationConfig::DEFAULT;

        let report = calibrate(&mut motor, &mut wheel, &mut delay, &cfg).unwrap();
        assert!(report.flipped);
        assert!(report.probe_count <= -10);
        assert_eq!(motor.forward_level(), PinState::High);
        assert_eq!(wheel.position, 0);

        // Running it again with the corrected polarity leaves it alone.
        let report = calibrate(&mut motor, &mut wheel, &mut delay, &cfg).unwrap();
        assert!(!report.flipped);
        assert_eq!(motor.forward_level(), PinState::High);
        assert_eq!(wheel.position, 0);

        // forward now counts up
        motor.set_forward().unwrap();
        assert!(wheel.dir.is_high());
    }

    #[test]
    fn polls_are_paced_by_the_delay() {
        let (mut motor, mut wheel) = bench(false);
        let mut delay = NoopDelay::default();
        let report = calibrate(&mut motor, &mut wheel, &mut delay, &CalibrationConfig::DEFAULT)
            .unwrap();
        assert_eq!(delay.total_ns, report.polls as u64 * 1_000_000);
    }

    #[test]
    fn stalled_wheel_times_out() {
        let (mut motor, mut wheel) = bench(false);
        wheel.stalled = true;
        let mut delay = NoopDelay::default();
        let cfg = CalibrationConfig::DEFAULT;

        let err = calibrate(&mut motor, &mut wheel, &mut delay, &cfg).unwrap_err();
        assert_eq!(
            err,
            Error::Calibration(CalibrationError::Timeout {
                stage: CalibrationStage::Probe,
                count: 0
            })
        );
        assert_eq!(wheel.polls, cfg.max_polls() + 1);
        assert_eq!(motor.duty(), 0);
        assert_eq!(wheel.pwm.mode(), CompareOutputMode::Disconnected);
    }

    #[test]
    fn recenter_from_either_side() {
        let (mut motor, mut wheel) = bench(false);
        let mut delay = NoopDelay::default();
        let cfg = CalibrationConfig::DEFAULT;

        wheel.position = 7;
        let polls = return_to_reference(&mut motor, &mut wheel, &mut delay, &cfg).unwrap();
        assert_eq!(wheel.position, 0);
        assert_eq!(polls, 7);

        wheel.position = -3;
        return_to_reference(&mut motor, &mut wheel, &mut delay, &cfg).unwrap();
        assert_eq!(wheel.position, 0);
        assert_eq!(motor.direction(), Direction::Forward);
        assert_eq!(motor.duty(), 0);
    }
}
