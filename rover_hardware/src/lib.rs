#![no_std]

use fugit::HertzU32;
use stm32f4xx_hal::{
    gpio::Edge,
    pac::{CorePeripherals, Peripherals},
    prelude::*,
    serial::Serial,
    timer::{Channel1, Channel2, SysDelay, Timer3},
};

pub mod encoder;
pub mod fatal;
pub mod led;
pub mod motors;
pub mod pwm;
pub mod serial;
pub mod ultrasonic;

use encoder::{EncoderPins, LeftEncoderPins, RightEncoderPins};
use fatal::Reset;
use led::{Indicators, OrangeLed};
use motors::MotorOutputs;
use serial::{DebugSerialPort, LinkSerialPort};
use ultrasonic::{SonarParts, SonarTimer};

pub const MOTOR_PWM: HertzU32 = HertzU32::Hz(4_000);

pub struct RoverHardware {
    pub delay: SysDelay,
    /// Input clock of the APB1 timers, TIM2 runs the monotonic from it
    pub mono_clock_hz: u32,

    pub indicators: Indicators,
    pub heartbeat_led: OrangeLed,

    pub link_serial: LinkSerialPort,
    pub dbg_serial: DebugSerialPort,

    pub motors: MotorOutputs,
    pub left_encoder: LeftEncoderPins,
    pub right_encoder: RightEncoderPins,
    pub sonar: SonarParts,

    pub fatal: Reset,
}

impl RoverHardware {
    pub fn init(mut pac: Peripherals, core: CorePeripherals) -> Self {
        // TIM9 is driven through its registers, clock it before RCC is handed to the HAL
        pac.RCC.apb2enr.modify(|_, w| w.tim9en().enabled());

        let mut syscfg = pac.SYSCFG.constrain();

        let rcc = pac.RCC.constrain();
        let clocks = rcc
            .cfgr
            .sysclk(168.MHz())
            .pclk1(42.MHz())
            .pclk2(84.MHz())
            .freeze();
        let delay = core.SYST.delay(&clocks);

        let gpioa = pac.GPIOA.split();
        let gpiob = pac.GPIOB.split();
        let gpioc = pac.GPIOC.split();
        let gpiod = pac.GPIOD.split();
        let gpioe = pac.GPIOE.split();

        // Status LED's
        let indicators = Indicators {
            link: gpiod.pd12.into_push_pull_output(),
            blocked: gpiod.pd14.into_push_pull_output(),
            pending: gpiod.pd15.into_push_pull_output(),
        };
        let heartbeat_led = gpiod.pd13.into_push_pull_output();

        let tx_pin = gpioa.pa2.into_alternate();
        let rx_pin = gpioa.pa3.into_alternate();
        let mut link_serial =
            Serial::new(pac.USART2, (tx_pin, rx_pin), 38400.bps(), &clocks).unwrap();
        link_serial.listen(stm32f4xx_hal::serial::Event::RxNotEmpty);

        let debug_tx_pin = gpioa.pa9.into_alternate();
        let dbg_serial = pac.USART1.tx(debug_tx_pin, 115200.bps(), &clocks).unwrap();

        let tim3 = Timer3::new(pac.TIM3, &clocks);
        let tim3_pins = (Channel1::new(gpioc.pc6), Channel2::new(gpioc.pc7));
        let pwm3 = tim3.pwm_hz(tim3_pins, MOTOR_PWM);
        let (left_pwm, right_pwm) = pwm3.split();

        let motors = MotorOutputs {
            left_pwm,
            left_dir: gpiod.pd0.into_push_pull_output(),
            right_pwm,
            right_dir: gpiod.pd1.into_push_pull_output(),
        };

        // Encoders: every edge on A or B, left on EXTI9_5, right on EXTI15_10
        let mut left_a = gpioe.pe5.into_pull_up_input();
        let mut left_b = gpioe.pe6.into_pull_up_input();
        let mut right_a = gpioe.pe11.into_pull_up_input();
        let mut right_b = gpioe.pe12.into_pull_up_input();
        left_a.make_interrupt_source(&mut syscfg);
        left_a.trigger_on_edge(&mut pac.EXTI, Edge::RisingFalling);
        left_a.enable_interrupt(&mut pac.EXTI);
        left_b.make_interrupt_source(&mut syscfg);
        left_b.trigger_on_edge(&mut pac.EXTI, Edge::RisingFalling);
        left_b.enable_interrupt(&mut pac.EXTI);
        right_a.make_interrupt_source(&mut syscfg);
        right_a.trigger_on_edge(&mut pac.EXTI, Edge::RisingFalling);
        right_a.enable_interrupt(&mut pac.EXTI);
        right_b.make_interrupt_source(&mut syscfg);
        right_b.trigger_on_edge(&mut pac.EXTI, Edge::RisingFalling);
        right_b.enable_interrupt(&mut pac.EXTI);

        let left_encoder = EncoderPins::new(left_a, left_b);
        let right_encoder = EncoderPins::new(right_a, right_b);

        // Front ultrasonic
        let trigger = gpiob.pb0.into_push_pull_output();
        let mut echo = gpiob.pb1.into_pull_down_input();
        echo.make_interrupt_source(&mut syscfg);
        echo.trigger_on_edge(&mut pac.EXTI, Edge::RisingFalling);
        echo.enable_interrupt(&mut pac.EXTI);

        let sonar = SonarParts {
            trigger,
            echo,
            timer: SonarTimer::new(pac.TIM9, clocks.timclk2().raw()),
        };

        Self {
            delay,
            mono_clock_hz: clocks.timclk1().raw(),
            indicators,
            heartbeat_led,
            link_serial,
            dbg_serial,
            motors,
            left_encoder,
            right_encoder,
            sonar,
            fatal: Reset::new(clocks.sysclk().raw()),
        }
    }
}
