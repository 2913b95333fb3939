use drive_core::error::ConfigError;
use drive_core::timer::{Channel, CompareChannel, CompareOutputMode, TimerConfig};
use stm32f4xx_hal::{
    gpio::{Alternate, Pin},
    pac::TIM3,
    timer::{ChannelBuilder, Polarity, PwmChannel, PwmHz},
};

type PwmC6 = Pin<'C', 6_u8, Alternate<2>>;
type PwmC7 = Pin<'C', 7_u8, Alternate<2>>;

pub type Pwm3 = PwmHz<TIM3, (ChannelBuilder<TIM3, 0>, ChannelBuilder<TIM3, 1>)>;

/// One TIM3 output driving a motor driver's PWM input.
///
/// The timer runs in PWM mode 1 (output active while the counter is below the compare
/// register), so a compare value of `n` out of `top` keeps the output active for `n + 1`
/// counts, the same as a single slope AVR timer.
pub struct MotorChannel<const C: u8> {
    channel: PwmChannel<TIM3, C>,
}

pub type LeftPwm = MotorChannel<0>;
pub type RightPwm = MotorChannel<1>;

impl<const C: u8> MotorChannel<C> {
    /// Fails for a channel number TIM3 does not have, or a period too short to carry a duty.
    pub fn new(mut channel: PwmChannel<TIM3, C>) -> Result<Self, ConfigError> {
        Channel::try_from(C)?;
        TimerConfig::fast_pwm(channel.get_max_duty().saturating_sub(1)).validate()?;

        channel.disable();
        channel.set_duty(0);
        Ok(Self { channel })
    }
}

impl<const C: u8> CompareChannel for MotorChannel<C> {
    fn top(&self) -> u16 {
        self.channel.get_max_duty().saturating_sub(1)
    }

    fn set_compare(&mut self, value: u16) {
        let max = self.channel.get_max_duty();
        self.channel.set_duty(value.saturating_add(1).min(max));
    }

    fn set_output_mode(&mut self, mode: CompareOutputMode) {
        match mode {
            CompareOutputMode::Disconnected => self.channel.disable(),
            CompareOutputMode::ClearOnMatch => {
                self.channel.set_polarity(Polarity::ActiveHigh);
                self.channel.enable();
            }
            CompareOutputMode::SetOnMatch => {
                self.channel.set_polarity(Polarity::ActiveLow);
                self.channel.enable();
            }
        }
    }
}
