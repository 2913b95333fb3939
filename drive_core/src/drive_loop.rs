//! The fixed cadence control step.
//!
//! [`DriveLoop::step`] is pure bookkeeping: the firmware gathers what happened since the last
//! tick into a [`TickInput`], and acts on the returned [`TickCommand`] (trigger the sonar,
//! drive the LEDs, [`DriveLoop::apply`] the motor outputs). Nothing in here touches hardware
//! or gets called from interrupt context.
use embedded_hal::digital::OutputPin;

use crate::config::DriveConfig;
use crate::controls::{compute_duty, DirectionFilter, DutyPair, Gate, HysteresisState};
use crate::error::Error;
use crate::glove::GloveSample;
use crate::motors::{Direction, Motor, MotorPair};
use crate::navigation::{SafetyBubble, SonarSchedule};
use crate::timer::CompareChannel;
use crate::ultrasonic::Echo;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    /// Newest sample received since the previous tick
    pub sample: Option<GloveSample>,
    pub connected: bool,
    /// Sonar can take a trigger. Builds without a sonar always pass `false`.
    pub sonar_idle: bool,
    /// Result consumed from the sonar this tick
    pub echo: Option<Echo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickCommand {
    pub duty: DutyPair,
    /// Set both direction pins before writing the duties
    pub commit: Option<Direction>,
    pub trigger_sonar: bool,
    pub blocked: bool,
    pub hysteresis: HysteresisState,
    pub stale: bool,
}

pub struct DriveLoop {
    config: DriveConfig,
    sample: GloveSample,
    ticks_since_sample: u16,
    connected: bool,
    stale: bool,
    blocked: bool,
    filter: DirectionFilter,
    bubble: SafetyBubble,
    schedule: SonarSchedule,
}

impl DriveLoop {
    pub fn new(config: DriveConfig) -> Self {
        Self {
            sample: GloveSample::STOPPED,
            // nothing received yet counts as stale
            ticks_since_sample: config.stale_timeout_ticks,
            connected: false,
            stale: true,
            blocked: false,
            filter: DirectionFilter::new(config.debounce_ticks),
            bubble: SafetyBubble::new(&config),
            schedule: SonarSchedule::new(config.sonar_rest_ticks),
            config,
        }
    }

    pub fn step(&mut self, input: TickInput) -> TickCommand {
        match input.sample {
            Some(sample) if input.connected => {
                self.sample = sample.sanitized();
                self.ticks_since_sample = 0;
            }
            _ => self.ticks_since_sample = self.ticks_since_sample.saturating_add(1),
        }

        if input.connected != self.connected {
            if input.connected {
                log::info!("glove connected");
            } else {
                log::warn!("glove disconnected, stopping");
            }
            self.connected = input.connected;
        }
        if !input.connected {
            // Fall back to the committed direction so a dropped link never finishes a reversal.
            self.sample = GloveSample {
                direction: self.filter.committed(),
                ..GloveSample::STOPPED
            };
        }

        let stale = self.ticks_since_sample >= self.config.stale_timeout_ticks;
        if stale && !self.stale {
            log::warn!(
                "no glove sample for {} ticks, stopping",
                self.ticks_since_sample
            );
        }
        self.stale = stale;

        let mut duty = if stale || !input.connected {
            DutyPair::ZERO
        } else {
            compute_duty(
                self.sample.pitch_degrees,
                self.sample.throttle_percent,
                &self.config,
            )
        };

        if let Some(echo) = input.echo {
            self.bubble.update_front(echo);
            self.schedule.on_result();
        }
        let trigger_sonar = self.schedule.poll(input.sonar_idle);
        if trigger_sonar {
            self.schedule.on_trigger();
        }

        let blocked = self.bubble.is_blocked(self.filter.committed());
        if blocked != self.blocked {
            log::debug!(
                "front {} cm, blocked {}",
                self.bubble.front_distance(),
                blocked
            );
            self.blocked = blocked;
        }
        if blocked {
            duty = DutyPair::ZERO;
        }

        let gate = self.filter.update(self.sample.direction);
        if gate.suppresses_duty() {
            duty = DutyPair::ZERO;
        }
        let commit = match gate {
            Gate::Commit(direction) => Some(direction),
            _ => None,
        };

        TickCommand {
            duty,
            commit,
            trigger_sonar,
            blocked,
            hysteresis: self.filter.state(),
            stale,
        }
    }

    /// Direction pins first so a committed reversal never runs on the old direction.
    pub fn apply<C1, D1, C2, D2, E>(
        command: &TickCommand,
        motors: &mut MotorPair<Motor<C1, D1>, Motor<C2, D2>>,
    ) -> Result<(), Error<E>>
    where
        C1: CompareChannel,
        D1: OutputPin<Error = E>,
        C2: CompareChannel,
        D2: OutputPin<Error = E>,
    {
        if let Some(direction) = command.commit {
            motors.set_direction(direction)?;
        }
        motors.set_duty(command.duty.left, command.duty.right);
        Ok(())
    }

    pub fn committed_direction(&self) -> Direction {
        self.filter.committed()
    }
}
