//! HC-SR04 on the front bumper, timed by TIM9 as a plain free running counter.
use drive_core::error::ConfigError;
use drive_core::timer::{ClockSelect, HardwareTimer, TimerConfig, WaveformMode};
use drive_core::ultrasonic::Sonar;
use stm32f4xx_hal::{
    gpio::{Input, Output, PushPull, PB0, PB1},
    pac::TIM9,
};

pub type TriggerPin = PB0<Output<PushPull>>;
pub type EchoPin = PB1<Input>;
pub type FrontSonar = Sonar<TriggerPin, SonarTimer>;

/// TIM9 driven through its registers, the HAL counter wants to own the period in
/// microseconds while the sonar needs raw ticks and an overflow interrupt.
pub struct SonarTimer {
    tim: TIM9,
    /// TIM9 input clock (APB2 timer clock)
    clock_hz: u32,
}

impl SonarTimer {
    /// The peripheral clock has to be enabled already.
    pub fn new(tim: TIM9, clock_hz: u32) -> Self {
        tim.cr1.modify(|_, w| w.cen().clear_bit());
        Self { tim, clock_hz }
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }
}

impl HardwareTimer for SonarTimer {
    fn configure(&mut self, config: &TimerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config.waveform != WaveformMode::Normal {
            return Err(ConfigError::InvalidWaveformMode(config.waveform.number()));
        }

        self.tim.cr1.modify(|_, w| w.cen().clear_bit());
        self.tim.arr.write(|w| unsafe { w.bits(config.top as u32) });
        self.tim.cnt.write(|w| unsafe { w.bits(0) });
        self.set_clock_select(config.clock);

        Ok(())
    }

    fn set_clock_select(&mut self, clock: ClockSelect) {
        match clock.divisor() {
            None => self.tim.cr1.modify(|_, w| w.cen().clear_bit()),
            Some(div) => {
                self.tim.psc.write(|w| unsafe { w.bits(div as u32 - 1) });
                // load the prescaler now instead of at the next overflow
                self.tim.egr.write(|w| w.ug().set_bit());
                self.tim.sr.modify(|_, w| w.uif().clear_bit());
                self.tim.cr1.modify(|_, w| w.cen().set_bit());
            }
        }
    }

    fn counter(&self) -> u16 {
        self.tim.cnt.read().bits() as u16
    }

    fn reset_counter(&mut self) {
        self.tim.cnt.write(|w| unsafe { w.bits(0) });
    }

    fn listen_overflow(&mut self) {
        self.tim.dier.modify(|_, w| w.uie().set_bit());
    }

    fn clear_overflow(&mut self) {
        self.tim.sr.modify(|_, w| w.uif().clear_bit());
    }
}

/// Raw parts, the firmware assembles the [`FrontSonar`] once the timer is configured.
pub struct SonarParts {
    pub trigger: TriggerPin,
    pub echo: EchoPin,
    pub timer: SonarTimer,
}
