use core::convert::Infallible;

use drive_core::{Error, Motor, MotorPair, Side};
use stm32f4xx_hal::{
    gpio::{Output, PushPull, PD0, PD1},
    pac::TIM3,
    timer::PwmChannel,
};

use crate::pwm::{LeftPwm, MotorChannel, RightPwm};

pub type LeftDir = PD0<Output<PushPull>>;
pub type RightDir = PD1<Output<PushPull>>;

pub type LeftMotor = Motor<LeftPwm, LeftDir>;
pub type RightMotor = Motor<RightPwm, RightDir>;
pub type Motors = MotorPair<LeftMotor, RightMotor>;

/// Motor driver inputs as they come out of board bring-up.
pub struct MotorOutputs {
    pub left_pwm: PwmChannel<TIM3, 0>,
    pub left_dir: LeftDir,
    pub right_pwm: PwmChannel<TIM3, 1>,
    pub right_dir: RightDir,
}

impl MotorOutputs {
    pub fn into_motors(self) -> Result<Motors, Error<Infallible>> {
        let left_pwm: LeftPwm = MotorChannel::new(self.left_pwm)?;
        let right_pwm: RightPwm = MotorChannel::new(self.right_pwm)?;
        let left = Motor::new(Side::Left, left_pwm, self.left_dir)?;
        let right = Motor::new(Side::Right, right_pwm, self.right_dir)?;
        Ok(MotorPair::new(left, right))
    }
}
