//! Hardware timer abstraction.
//!
//! The timer settings are explicit enums checked once at the boundary, raw register bit
//! layouts only exist inside the board crate.
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSelect {
    Off,
    Div1,
    Div8,
    Div64,
    Div256,
    Div1024,
}

impl ClockSelect {
    pub fn from_divisor(divisor: u16) -> Result<Self, ConfigError> {
        match divisor {
            0 => Ok(ClockSelect::Off),
            1 => Ok(ClockSelect::Div1),
            8 => Ok(ClockSelect::Div8),
            64 => Ok(ClockSelect::Div64),
            256 => Ok(ClockSelect::Div256),
            1024 => Ok(ClockSelect::Div1024),
            d => Err(ConfigError::InvalidClockSelect(d)),
        }
    }

    /// `None` when the clock is stopped.
    pub fn divisor(&self) -> Option<u16> {
        match self {
            ClockSelect::Off => None,
            ClockSelect::Div1 => Some(1),
            ClockSelect::Div8 => Some(8),
            ClockSelect::Div64 => Some(64),
            ClockSelect::Div256 => Some(256),
            ClockSelect::Div1024 => Some(1024),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaveformMode {
    /// Free running, counts to the full width and overflows
    Normal,
    /// Clear on compare match, counts to `top`
    Ctc,
    /// Single slope PWM, counts to `top`
    FastPwm,
    /// Dual slope PWM, counts up and down to `top`
    PhaseCorrectPwm,
}

impl WaveformMode {
    pub fn is_pwm(&self) -> bool {
        matches!(self, WaveformMode::FastPwm | WaveformMode::PhaseCorrectPwm)
    }

    /// Canonical mode number, the inverse of `TryFrom<u8>`.
    pub fn number(&self) -> u8 {
        match self {
            WaveformMode::Normal => 0,
            WaveformMode::Ctc => 4,
            WaveformMode::PhaseCorrectPwm => 8,
            WaveformMode::FastPwm => 14,
        }
    }
}

/// Waveform generation mode numbers of the 16-bit AVR timers. Only the modes with a
/// meaning here are accepted, the rest are rejected instead of silently approximated.
impl TryFrom<u8> for WaveformMode {
    type Error = ConfigError;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        match mode {
            0 => Ok(WaveformMode::Normal),
            4 | 12 => Ok(WaveformMode::Ctc),
            8 | 10 => Ok(WaveformMode::PhaseCorrectPwm),
            14 | 15 => Ok(WaveformMode::FastPwm),
            m => Err(ConfigError::InvalidWaveformMode(m)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompareOutputMode {
    /// Pin detached from the timer, the output is not driven at all
    #[default]
    Disconnected,
    /// Output high from the start of the period until the compare match
    ClearOnMatch,
    /// Inverted: low until the compare match
    SetOnMatch,
}

impl TryFrom<u8> for CompareOutputMode {
    type Error = ConfigError;

    fn try_from(com: u8) -> Result<Self, Self::Error> {
        match com {
            0 => Ok(CompareOutputMode::Disconnected),
            2 => Ok(CompareOutputMode::ClearOnMatch),
            3 => Ok(CompareOutputMode::SetOnMatch),
            c => Err(ConfigError::InvalidCompareOutputMode(c)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    A,
    B,
    C,
    D,
}

impl TryFrom<u8> for Channel {
    type Error = ConfigError;

    fn try_from(ch: u8) -> Result<Self, Self::Error> {
        match ch {
            0 => Ok(Channel::A),
            1 => Ok(Channel::B),
            2 => Ok(Channel::C),
            3 => Ok(Channel::D),
            c => Err(ConfigError::InvalidChannel(c)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
    pub clock: ClockSelect,
    pub waveform: WaveformMode,
    pub top: u16,
}

impl TimerConfig {
    /// Undivided single slope PWM counting to `top`.
    pub const fn fast_pwm(top: u16) -> Self {
        Self {
            clock: ClockSelect::Div1,
            waveform: WaveformMode::FastPwm,
            top,
        }
    }

    /// 8-bit free running counter for time of flight measurement.
    pub const FREE_RUNNING_8BIT: Self = Self {
        clock: ClockSelect::Div1,
        waveform: WaveformMode::Normal,
        top: 255,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.waveform.is_pwm() && self.top == 0 {
            return Err(ConfigError::InvalidTop);
        }
        Ok(())
    }

    /// Counts per period (TOP + 1)
    pub fn period(&self) -> u32 {
        self.top as u32 + 1
    }
}

/// Compare register value for a duty percentage. Matches the fixed point register
/// semantics: the value is rounded down and shifted down by one so 100% never exceeds TOP.
pub fn compare_for_duty(top: u16, percent: u8) -> u16 {
    let percent = percent.min(100) as u32;
    let scaled = (top as u32 + 1) * percent / 100;
    scaled.saturating_sub(1) as u16
}

pub trait HardwareTimer {
    fn configure(&mut self, config: &TimerConfig) -> Result<(), ConfigError>;
    fn set_clock_select(&mut self, clock: ClockSelect);
    fn counter(&self) -> u16;
    fn reset_counter(&mut self);
    fn listen_overflow(&mut self);
    fn clear_overflow(&mut self);
}

/// One compare output of a PWM timer.
pub trait CompareChannel {
    fn top(&self) -> u16;
    fn set_compare(&mut self, value: u16);
    fn set_output_mode(&mut self, mode: CompareOutputMode);
}

/// A free running tick source, read and zeroed from interrupt context.
pub trait TickCounter {
    fn ticks(&self) -> u32;
    fn reset(&mut self);
}

impl<T: HardwareTimer> TickCounter for T {
    fn ticks(&self) -> u32 {
        self.counter() as u32
    }

    fn reset(&mut self) {
        self.reset_counter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_values() {
        assert_eq!(compare_for_duty(3999, 100), 3999);
        assert_eq!(compare_for_duty(3999, 50), 1999);
        assert_eq!(compare_for_duty(3999, 15), 599);
        assert_eq!(compare_for_duty(3999, 1), 39);
        // clamped
        assert_eq!(compare_for_duty(3999, 250), 3999);
        // rounding down on an 8-bit top
        assert_eq!(compare_for_duty(255, 15), 37);
        assert_eq!(compare_for_duty(0, 0), 0);
    }

    #[test]
    fn clock_select_boundary() {
        assert_eq!(ClockSelect::from_divisor(0), Ok(ClockSelect::Off));
        assert_eq!(ClockSelect::from_divisor(256), Ok(ClockSelect::Div256));
        assert_eq!(
            ClockSelect::from_divisor(32),
            Err(ConfigError::InvalidClockSelect(32))
        );
        assert_eq!(ClockSelect::Off.divisor(), None);
    }

    #[test]
    fn waveform_and_compare_modes() {
        assert_eq!(WaveformMode::try_from(14), Ok(WaveformMode::FastPwm));
        assert_eq!(WaveformMode::try_from(0), Ok(WaveformMode::Normal));
        assert_eq!(WaveformMode::try_from(12), Ok(WaveformMode::Ctc));
        assert_eq!(WaveformMode::Ctc.number(), 4);
        assert_eq!(
            WaveformMode::try_from(WaveformMode::FastPwm.number()),
            Ok(WaveformMode::FastPwm)
        );
        assert_eq!(
            WaveformMode::try_from(13),
            Err(ConfigError::InvalidWaveformMode(13))
        );
        assert_eq!(
            CompareOutputMode::try_from(1),
            Err(ConfigError::InvalidCompareOutputMode(1))
        );
        assert_eq!(Channel::try_from(1), Ok(Channel::B));
        assert_eq!(Channel::try_from(4), Err(ConfigError::InvalidChannel(4)));
    }

    #[test]
    fn pwm_needs_top() {
        assert_eq!(TimerConfig::fast_pwm(0).validate(), Err(ConfigError::InvalidTop));
        assert!(TimerConfig::fast_pwm(3999).validate().is_ok());
        assert_eq!(TimerConfig::fast_pwm(3999).period(), 4000);
        assert!(TimerConfig::FREE_RUNNING_8BIT.validate().is_ok());
        assert_eq!(TimerConfig::FREE_RUNNING_8BIT.period(), 256);
    }
}
