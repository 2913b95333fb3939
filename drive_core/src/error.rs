use core::fmt;

use crate::fatal::FatalCode;
use crate::motors::calibration::CalibrationStage;

/// Rejected hardware or drive configuration. These are never recoverable at runtime, the
/// firmware hands them straight to the fatal abort path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    InvalidClockSelect(u16),
    InvalidWaveformMode(u8),
    InvalidChannel(u8),
    InvalidCompareOutputMode(u8),
    InvalidTop,
    InvalidDriveParameter(&'static str),
}

impl ConfigError {
    pub fn fatal_code(&self) -> FatalCode {
        match self {
            ConfigError::InvalidClockSelect(_) => FatalCode::CLOCK_SELECT,
            ConfigError::InvalidWaveformMode(_)
            | ConfigError::InvalidChannel(_)
            | ConfigError::InvalidTop => FatalCode::TIMER_MODE,
            ConfigError::InvalidCompareOutputMode(_) => FatalCode::COMPARE_OUTPUT,
            ConfigError::InvalidDriveParameter(_) => FatalCode::DRIVE_CONFIG,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidClockSelect(div) => write!(f, "invalid clock divisor {}", div),
            ConfigError::InvalidWaveformMode(mode) => write!(f, "invalid waveform mode {}", mode),
            ConfigError::InvalidChannel(ch) => write!(f, "invalid timer channel {}", ch),
            ConfigError::InvalidCompareOutputMode(com) => {
                write!(f, "invalid compare output mode {}", com)
            }
            ConfigError::InvalidTop => write!(f, "pwm mode needs a non-zero top"),
            ConfigError::InvalidDriveParameter(what) => write!(f, "invalid drive parameter: {}", what),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// The encoder never reached its target within the bounded wait, the motor is
    /// probably stalled or the encoder is unplugged.
    Timeout { stage: CalibrationStage, count: i32 },
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::Timeout { stage, count } => {
                write!(f, "calibration timed out in {:?} at count {}", stage, count)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    Config(ConfigError),
    Calibration(CalibrationError),
    Pin(E),
}

impl<E> Error<E> {
    pub fn fatal_code(&self) -> FatalCode {
        match self {
            Error::Config(e) => e.fatal_code(),
            Error::Calibration(_) => FatalCode::CALIBRATION,
            Error::Pin(_) => FatalCode::PIN_IO,
        }
    }
}

impl<E> From<ConfigError> for Error<E> {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl<E> From<CalibrationError> for Error<E> {
    fn from(e: CalibrationError) -> Self {
        Error::Calibration(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e),
            Error::Calibration(e) => write!(f, "calibration: {}", e),
            Error::Pin(e) => write!(f, "pin: {:?}", e),
        }
    }
}
