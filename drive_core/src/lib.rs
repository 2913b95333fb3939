//! Drive logic for the glove controlled rover.
//!
//! Everything in here is independent of the microcontroller: the board crate hands in
//! `embedded-hal` pins, PWM compare channels and a free running tick counter, and the
//! firmware feeds interrupt events (encoder edges, echo edges, timer overflows) into the
//! state machines defined here.
//!
//! | Module | Purpose |
//! | ------ | ------- |
//! | [`encoder`] | Quadrature decoding from pin change interrupts |
//! | [`timer`] | Clock select / waveform / compare output abstraction |
//! | [`motors`] | Duty + direction output per wheel, polarity calibration |
//! | [`controls`] | Throttle/steering mixing and direction change hysteresis |
//! | [`ultrasonic`] | Trigger/echo time of flight state machine |
//! | [`navigation`] | Stop-on-obstacle guard and sonar scheduling |
//! | [`glove`] | Samples from the glove link, framing and link freshness |
//! | [`drive_loop`] | The fixed cadence control step tying it all together |
//! | [`line_queue`] | Bounded line buffer for log output drained at low priority |
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod controls;
pub mod drive_loop;
pub mod encoder;
pub mod error;
pub mod fatal;
pub mod glove;
pub mod line_queue;
pub mod motors;
pub mod navigation;
pub mod timer;
pub mod ultrasonic;

#[cfg(test)]
pub(crate) mod mock;

pub use config::DriveConfig;
pub use drive_loop::{DriveLoop, TickCommand, TickInput};
pub use error::{ConfigError, Error};
pub use glove::GloveSample;
pub use motors::{Direction, Motor, MotorPair, Side};
