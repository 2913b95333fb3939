//! Compile time tunables for the drive loop.
//!
//! There is no storage on the vehicle, so everything starts from the `DEFAULT` constants and
//! the firmware derives variants with the `with_*` builders before validating once at boot.
use fugit::{MicrosDurationU32, MillisDurationU32};
use num_traits::float::FloatCore;

use crate::error::ConfigError;
use crate::timer::TimerConfig;

/// How the raw glove throttle is scaled down before steering is mixed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ThrottleLimiter {
    #[default]
    Halve,
    /// Divide by 1.5, a little more top speed than `Halve`.
    TwoThirds,
}

impl ThrottleLimiter {
    pub fn limit(&self, throttle: i32) -> i32 {
        match self {
            ThrottleLimiter::Halve => throttle / 2,
            ThrottleLimiter::TwoThirds => throttle * 2 / 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SonarConfig {
    /// Counts per overflow of the free running timer (TOP + 1)
    pub counter_period: u32,
    pub ticks_per_us: f32,
    pub max_response: MicrosDurationU32,
    pub trigger_pulse: MicrosDurationU32,
    /// Round trip microseconds per centimetre
    pub us_per_cm: f32,
}

impl SonarConfig {
    pub const DEFAULT: Self = Self {
        counter_period: 256,
        ticks_per_us: 1.0,
        max_response: MicrosDurationU32::millis(200),
        trigger_pulse: MicrosDurationU32::micros(10),
        us_per_cm: 58.0,
    };

    /// Derive tick rate and wrap period from the counter's input clock and its setup.
    pub fn with_timer_clock(self, clock_hz: u32, timer: &TimerConfig) -> Self {
        let div = timer.clock.divisor().unwrap_or(1) as f32;
        Self {
            counter_period: timer.period(),
            ticks_per_us: clock_hz as f32 / div / 1_000_000.0,
            ..self
        }
    }

    pub fn max_ticks(&self) -> u32 {
        (self.max_response.ticks() as f32 * self.ticks_per_us).round() as u32
    }
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConfig {
    pub duty_percent: u8,
    /// Encoder counts the probe has to cover before the sign is trusted
    pub threshold: i32,
    pub poll_interval: MicrosDurationU32,
    /// Upper bound for each of the probe and re-center waits
    pub stage_timeout: MillisDurationU32,
}

impl CalibrationConfig {
    pub const DEFAULT: Self = Self {
        duty_percent: 15,
        threshold: 10,
        poll_interval: MicrosDurationU32::millis(1),
        stage_timeout: MillisDurationU32::millis(2000),
    };

    pub fn max_polls(&self) -> u32 {
        let poll_us = self.poll_interval.ticks().max(1);
        (self.stage_timeout.ticks() * 1000) / poll_us
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveConfig {
    pub tick: MillisDurationU32,
    /// Ticks of sustained disagreement before a direction change is committed
    pub debounce_ticks: u8,
    pub limiter: ThrottleLimiter,
    pub dead_zone_degrees: i16,
    pub saturation_degrees: i16,
    pub obstacle_stop_cm: f32,
    /// Distance assumed when the sonar did not answer
    pub far_cm: f32,
    /// Ticks between consuming a sonar result and triggering the next one
    pub sonar_rest_ticks: u8,
    pub stale_timeout_ticks: u16,
    pub link_timeout_ticks: u16,
    pub sonar: SonarConfig,
    pub calibration: CalibrationConfig,
}

impl DriveConfig {
    pub const DEFAULT: Self = Self {
        tick: MillisDurationU32::millis(10),
        debounce_ticks: 25,
        limiter: ThrottleLimiter::Halve,
        dead_zone_degrees: 10,
        saturation_degrees: 80,
        obstacle_stop_cm: 15.0,
        far_cm: 1000.0,
        sonar_rest_ticks: 5,
        stale_timeout_ticks: 50,
        link_timeout_ticks: 100,
        sonar: SonarConfig::DEFAULT,
        calibration: CalibrationConfig::DEFAULT,
    };

    pub fn with_tick(self, tick: MillisDurationU32) -> Self {
        Self { tick, ..self }
    }

    pub fn with_debounce_ticks(self, debounce_ticks: u8) -> Self {
        Self {
            debounce_ticks,
            ..self
        }
    }

    pub fn with_limiter(self, limiter: ThrottleLimiter) -> Self {
        Self { limiter, ..self }
    }

    pub fn with_sonar(self, sonar: SonarConfig) -> Self {
        Self { sonar, ..self }
    }

    pub fn with_calibration(self, calibration: CalibrationConfig) -> Self {
        Self {
            calibration,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick.ticks() == 0 {
            return Err(ConfigError::InvalidDriveParameter("tick period"));
        }
        if self.debounce_ticks == 0 {
            return Err(ConfigError::InvalidDriveParameter("debounce ticks"));
        }
        if self.stale_timeout_ticks == 0 {
            return Err(ConfigError::InvalidDriveParameter("stale timeout"));
        }
        if self.link_timeout_ticks == 0 {
            return Err(ConfigError::InvalidDriveParameter("link timeout"));
        }
        if self.dead_zone_degrees < 0
            || self.dead_zone_degrees >= self.saturation_degrees
            || self.saturation_degrees > 90
        {
            return Err(ConfigError::InvalidDriveParameter("steering angles"));
        }
        if self.calibration.duty_percent == 0 || self.calibration.duty_percent > 100 {
            return Err(ConfigError::InvalidDriveParameter("calibration duty"));
        }
        if self.calibration.threshold <= 0 || self.calibration.poll_interval.ticks() == 0 {
            return Err(ConfigError::InvalidDriveParameter("calibration wait"));
        }
        if self.sonar.counter_period == 0 || !(self.sonar.ticks_per_us > 0.0) {
            return Err(ConfigError::InvalidDriveParameter("sonar timing"));
        }

        Ok(())
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
