#![no_std]
#![no_main]

mod logging;
mod odometer;
mod time;

use core::convert::Infallible;
use core::fmt::Debug;

use drive_core::fatal::FatalAbort;
use drive_core::Error;

#[cfg(feature = "defmt_logger")]
use panic_probe as _;

#[cfg(all(feature = "serial_logger", not(feature = "defmt_logger")))]
use panic_halt as _;

#[cfg(not(any(feature = "defmt_logger", feature = "serial_logger")))]
compile_error!("enable at least one of the `defmt_logger` or `serial_logger` features");

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

const SONAR_ENABLED: bool = cfg!(feature = "sonar");
/// TIM9 prescaler, one count every ~1.5 us at the 168 MHz APB2 timer clock
const SONAR_PRESCALER: u16 = 256;
/// Glove samples waiting for the control task, only the newest one is used
const SAMPLE_QUEUE: usize = 4;

/// Errors reaching the firmware are not recoverable, report and blink the code.
fn or_kill<T, E: Debug>(result: Result<T, Error<E>>, fatal: &mut impl FatalAbort) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            log::error!("{}", e);
            fatal.kill(e.fatal_code())
        }
    }
}

#[rtic::app(device = stm32f4xx_hal::pac, dispatchers = [SPI1, SPI2])]
mod app {
    use super::*;

    use crate::odometer::LockedOdometer;

    use drive_core::{
        config::SonarConfig,
        controls::HysteresisState,
        encoder::{Encoders, QuadratureDecoder},
        glove::{FrameReader, GloveSample, LinkMonitor},
        motors::calibration::calibrate,
        timer::{ClockSelect, HardwareTimer, TimerConfig},
        ultrasonic::Sonar,
        DriveConfig, DriveLoop, Side, TickInput,
    };
    use embedded_hal_02::serial::Read;
    use rover_hardware::{
        encoder::{LeftEncoderPins, RightEncoderPins},
        fatal::Reset,
        led::{Indicators, OrangeLed},
        motors::Motors,
        serial::{DebugSerialPort, LinkRx},
        ultrasonic::{EchoPin, FrontSonar},
        RoverHardware,
    };
    use rtic_monotonics::{stm32::Tim2 as Mono, Monotonic};
    use rtic_sync::channel::{Receiver, Sender};
    use stm32f4xx_hal::{gpio::ExtiPin, timer::SysDelay};

    #[shared]
    struct Shared {
        encoders: Encoders,
        sonar: FrontSonar,
    }

    #[local]
    struct Local {
        config: DriveConfig,
        motors: Motors,
        delay: SysDelay,
        fatal: Reset,
        indicators: Indicators,
        heartbeat_led: OrangeLed,
        dbg_serial: DebugSerialPort,
        left_encoder: LeftEncoderPins,
        right_encoder: RightEncoderPins,
        echo: EchoPin,
        link_rx: LinkRx,
        frames: FrameReader,
        samples_tx: Sender<'static, GloveSample, SAMPLE_QUEUE>,
        samples_rx: Receiver<'static, GloveSample, SAMPLE_QUEUE>,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        // set DBGMCU to allow wfi in idle function while using defmt
        let dbgmcu = &ctx.device.DBGMCU;
        dbgmcu.cr.modify(|_, w| {
            w.dbg_sleep().set_bit();
            w.dbg_standby().set_bit();
            w.dbg_stop().set_bit()
        });
        // enabling the dma1 clock keeps one AHB bus master active, which prevents SRAM from reading as 0's
        // https://github.com/probe-rs/probe-rs/issues/350#issuecomment-740550519
        ctx.device.RCC.ahb1enr.modify(|_, w| w.dma1en().enabled());

        let hw = RoverHardware::init(ctx.device, ctx.core);

        logging::init(logging::Level::Info);
        log::info!("{} v{}", NAME, VERSION);

        let mono_token = rtic_monotonics::create_stm32_tim2_monotonic_token!();
        Mono::start(hw.mono_clock_hz, mono_token);

        let mut fatal = hw.fatal;

        let mut sonar_timer = hw.sonar.timer;
        let sonar_clock = or_kill(
            ClockSelect::from_divisor(SONAR_PRESCALER).map_err(Error::<Infallible>::from),
            &mut fatal,
        );
        let sonar_timer_config = TimerConfig {
            clock: sonar_clock,
            ..TimerConfig::FREE_RUNNING_8BIT
        };
        let config = DriveConfig::DEFAULT.with_sonar(
            SonarConfig::DEFAULT.with_timer_clock(sonar_timer.clock_hz(), &sonar_timer_config),
        );
        or_kill(config.validate().map_err(Error::<Infallible>::from), &mut fatal);

        or_kill(
            sonar_timer
                .configure(&sonar_timer_config)
                .map_err(Error::<Infallible>::from),
            &mut fatal,
        );
        sonar_timer.listen_overflow();
        let sonar = or_kill(
            Sonar::new(hw.sonar.trigger, sonar_timer, config.sonar),
            &mut fatal,
        );

        let motors = or_kill(hw.motors.into_motors(), &mut fatal);

        let (left_a, left_b) = hw.left_encoder.levels();
        let (right_a, right_b) = hw.right_encoder.levels();
        let encoders = Encoders {
            left: QuadratureDecoder::with_levels(left_a, left_b),
            right: QuadratureDecoder::with_levels(right_a, right_b),
        };

        let (_link_tx, link_rx) = hw.link_serial.split();
        let (samples_tx, samples_rx) = rtic_sync::make_channel!(GloveSample, SAMPLE_QUEUE);

        log::info!(
            "tick {} ms, sonar {} ticks/us, sonar {}",
            config.tick.ticks(),
            config.sonar.ticks_per_us,
            if SONAR_ENABLED { "on" } else { "off" }
        );

        control::spawn().unwrap();
        heartbeat::spawn().unwrap();
        log_drain::spawn().unwrap();

        (
            Shared { encoders, sonar },
            Local {
                config,
                motors,
                delay: hw.delay,
                fatal,
                indicators: hw.indicators,
                heartbeat_led: hw.heartbeat_led,
                dbg_serial: hw.dbg_serial,
                left_encoder: hw.left_encoder,
                right_encoder: hw.right_encoder,
                echo: hw.sonar.echo,
                link_rx,
                frames: FrameReader::new(),
                samples_tx,
                samples_rx,
            },
        )
    }

    /// Calibrates both wheels, then runs the drive loop at a fixed cadence forever.
    #[task(
        priority = 1,
        shared = [encoders, sonar],
        local = [config, motors, delay, fatal, indicators, samples_rx]
    )]
    async fn control(mut ctx: control::Context) {
        let config = *ctx.local.config;
        let motors = ctx.local.motors;
        let delay = ctx.local.delay;
        let fatal = ctx.local.fatal;

        let mut left = LockedOdometer::new(&mut ctx.shared.encoders, Side::Left);
        or_kill(
            calibrate(&mut motors.left, &mut left, delay, &config.calibration),
            fatal,
        );
        let mut right = LockedOdometer::new(&mut ctx.shared.encoders, Side::Right);
        or_kill(
            calibrate(&mut motors.right, &mut right, delay, &config.calibration),
            fatal,
        );

        let mut drive = DriveLoop::new(config);
        let mut link = LinkMonitor::new(config.link_timeout_ticks);
        let period = time::mono_duration(config.tick);
        let mut next_tick = Mono::now();

        loop {
            let mut sample = None;
            while let Ok(received) = ctx.local.samples_rx.try_recv() {
                sample = Some(received);
            }

            link.tick();
            if sample.is_some() {
                link.on_sample();
            }

            let (sonar_idle, echo) = if SONAR_ENABLED {
                ctx.shared.sonar.lock(|sonar| {
                    let echo = sonar.take_reading();
                    (sonar.is_idle(), echo)
                })
            } else {
                (false, None)
            };

            let command = drive.step(TickInput {
                sample,
                connected: link.is_connected(),
                sonar_idle,
                echo,
            });

            if command.trigger_sonar {
                let fired = ctx.shared.sonar.lock(|sonar| sonar.trigger(&mut *delay));
                or_kill(fired, fatal);
            }

            or_kill(DriveLoop::apply(&command, motors), fatal);

            ctx.local.indicators.show(
                link.is_connected(),
                command.blocked,
                command.hysteresis == HysteresisState::Pending,
            );

            next_tick += period;
            Mono::delay_until(next_tick).await;
        }
    }

    #[task(priority = 1, local = [heartbeat_led])]
    async fn heartbeat(ctx: heartbeat::Context) {
        loop {
            ctx.local.heartbeat_led.toggle();
            Mono::delay(time::HEARTBEAT).await;
        }
    }

    /// Feeds queued serial log output to the debug USART a few bytes at a time.
    #[task(priority = 1, local = [dbg_serial])]
    async fn log_drain(ctx: log_drain::Context) {
        loop {
            let more = logging::serial_logger::drain(ctx.local.dbg_serial);
            Mono::delay(if more { time::LOG_CHUNK_GAP } else { time::LOG_IDLE }).await;
        }
    }

    #[task(binds = EXTI9_5, priority = 3, shared = [encoders], local = [left_encoder])]
    fn left_encoder_edge(mut ctx: left_encoder_edge::Context) {
        let pins = ctx.local.left_encoder;
        pins.clear_interrupt();
        let (a, b) = pins.levels();
        ctx.shared.encoders.lock(|encoders| encoders.left.on_edge(a, b));
    }

    #[task(binds = EXTI15_10, priority = 3, shared = [encoders], local = [right_encoder])]
    fn right_encoder_edge(mut ctx: right_encoder_edge::Context) {
        let pins = ctx.local.right_encoder;
        pins.clear_interrupt();
        let (a, b) = pins.levels();
        ctx.shared.encoders.lock(|encoders| encoders.right.on_edge(a, b));
    }

    #[task(binds = EXTI1, priority = 2, shared = [sonar], local = [echo])]
    fn echo_edge(mut ctx: echo_edge::Context) {
        let echo = ctx.local.echo;
        echo.clear_interrupt_pending_bit();
        let rising = echo.is_high();
        ctx.shared.sonar.lock(|sonar| sonar.on_echo_edge(rising));
    }

    #[task(binds = TIM1_BRK_TIM9, priority = 2, shared = [sonar])]
    fn sonar_overflow(mut ctx: sonar_overflow::Context) {
        ctx.shared.sonar.lock(|sonar| {
            sonar.counter_mut().clear_overflow();
            sonar.on_overflow();
        });
    }

    #[task(binds = USART2, priority = 2, local = [link_rx, frames, samples_tx])]
    fn link_byte(ctx: link_byte::Context) {
        let byte = match ctx.local.link_rx.read() {
            Ok(byte) => byte,
            Err(e) => {
                log::warn!("link uart: {:?}", e);
                return;
            }
        };

        match ctx.local.frames.push(byte) {
            Some(Ok(sample)) => {
                if ctx.local.samples_tx.try_send(sample).is_err() {
                    log::warn!("glove sample dropped, control task behind");
                }
            }
            Some(Err(e)) => log::warn!("bad glove frame: {:?}", e),
            None => {}
        }
    }
}
