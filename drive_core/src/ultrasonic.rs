//! Trigger/echo ultrasonic ranging (HC-SR04 style).
//!
//! The sensor answers a 10us trigger pulse by raising its echo line for as long as the
//! sound took to come back. Both echo edges and the overflow of a free running counter are
//! interrupts, so the measurement is a small state machine that those handlers step and the
//! control loop only polls:
//!
//! ```text
//! Off --trigger--> Pulsing --echo rise--> Measuring --echo fall--> Available --take--> Off
//!                     |                       |
//!                     +------ too many overflows ------> Available (no response)
//! ```
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::SonarConfig;
use crate::error::Error;
use crate::timer::TickCounter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SonarState {
    Off,
    Pulsing,
    Measuring,
    Available,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Echo {
    Distance(f32),
    NoResponse,
}

impl Echo {
    /// -1 for a reading that timed out.
    pub fn centimeters(&self) -> f32 {
        match self {
            Echo::Distance(cm) => *cm,
            Echo::NoResponse => -1.0,
        }
    }
}

pub struct Sonar<TRIG, T> {
    trigger: TRIG,
    counter: T,
    config: SonarConfig,
    state: SonarState,
    overflows: u32,
    reading: Option<Echo>,
}

impl<TRIG, T, E> Sonar<TRIG, T>
where
    TRIG: OutputPin<Error = E>,
    T: TickCounter,
{
    pub fn new(mut trigger: TRIG, counter: T, config: SonarConfig) -> Result<Self, Error<E>> {
        trigger.set_low().map_err(Error::Pin)?;
        Ok(Self {
            trigger,
            counter,
            config,
            state: SonarState::Off,
            overflows: 0,
            reading: None,
        })
    }

    /// Fire a ping. Refused (`Ok(false)`) unless the previous result has been taken.
    pub fn trigger<D: DelayNs>(&mut self, delay: &mut D) -> Result<bool, Error<E>> {
        if self.state != SonarState::Off {
            return Ok(false);
        }

        self.trigger.set_low().map_err(Error::Pin)?;
        self.trigger.set_high().map_err(Error::Pin)?;
        delay.delay_us(self.config.trigger_pulse.ticks());
        self.trigger.set_low().map_err(Error::Pin)?;

        self.overflows = 0;
        self.counter.reset();
        self.state = SonarState::Pulsing;

        Ok(true)
    }

    /// Echo line changed. Edges that do not fit the current state are ignored.
    pub fn on_echo_edge(&mut self, rising: bool) {
        match (self.state, rising) {
            (SonarState::Pulsing, true) => {
                // start of flight
                self.counter.reset();
                self.overflows = 0;
                self.state = SonarState::Measuring;
            }
            (SonarState::Measuring, false) => {
                let elapsed = self.elapsed_ticks();
                let echo = if elapsed > self.config.max_ticks() {
                    Echo::NoResponse
                } else {
                    Echo::Distance(self.ticks_to_cm(elapsed))
                };
                self.finish(echo);
            }
            _ => {}
        }
    }

    /// Free running counter wrapped.
    pub fn on_overflow(&mut self) {
        if !matches!(self.state, SonarState::Pulsing | SonarState::Measuring) {
            return;
        }

        self.overflows = self.overflows.saturating_add(1);
        if self.elapsed_ticks() > self.config.max_ticks() {
            log::warn!("sonar timed out in {:?}", self.state);
            self.finish(Echo::NoResponse);
        }
    }

    /// Consume a finished measurement, after which a new one may be triggered.
    pub fn take_reading(&mut self) -> Option<Echo> {
        if self.state != SonarState::Available {
            return None;
        }
        self.state = SonarState::Off;
        self.reading.take()
    }

    pub fn state(&self) -> SonarState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SonarState::Off
    }

    /// For the overflow handler to acknowledge the interrupt.
    pub fn counter_mut(&mut self) -> &mut T {
        &mut self.counter
    }

    pub fn ticks_to_cm(&self, ticks: u32) -> f32 {
        ticks as f32 / self.config.ticks_per_us / self.config.us_per_cm
    }

    fn elapsed_ticks(&self) -> u32 {
        self.overflows
            .saturating_mul(self.config.counter_period)
            .saturating_add(self.counter.ticks())
    }

    fn finish(&mut self, echo: Echo) {
        self.reading = Some(echo);
        self.state = SonarState::Available;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCounter, MockPin, NoopDelay};

    fn sonar() -> (Sonar<MockPin, MockCounter>, MockPin, MockCounter) {
        let pin = MockPin::new();
        let counter = MockCounter::new();
        let sonar = Sonar::new(pin.clone(), counter.clone(), SonarConfig::DEFAULT).unwrap();
        (sonar, pin, counter)
    }

    /// Replays a flight of `ticks` counter ticks as overflow interrupts plus a remainder.
    fn fly(sonar: &mut Sonar<MockPin, MockCounter>, counter: &MockCounter, ticks: u32) {
        sonar.on_echo_edge(true);
        for _ in 0..ticks / 256 {
            counter.set(0);
            sonar.on_overflow();
        }
        counter.set(ticks % 256);
    }

    #[test]
    fn trigger_pulse() {
        let (mut s, pin, counter) = sonar();
        let mut delay = NoopDelay::default();

        assert_eq!(s.trigger(&mut delay), Ok(true));
        assert!(pin.is_low());
        // low, high, low after the initial low in new()
        assert_eq!(pin.writes(), 4);
        assert_eq!(delay.total_ns, 10_000);
        assert_eq!(counter.resets(), 1);
        assert_eq!(s.state(), SonarState::Pulsing);
    }

    #[test]
    fn worked_example_100cm() {
        let (mut s, _, counter) = sonar();
        s.trigger(&mut NoopDelay::default()).unwrap();

        // 5800us round trip at one tick per microsecond
        fly(&mut s, &counter, 5800);
        assert_eq!(s.state(), SonarState::Measuring);
        s.on_echo_edge(false);

        assert_eq!(s.state(), SonarState::Available);
        let echo = s.take_reading().unwrap();
        assert!((echo.centimeters() - 100.0).abs() < 0.01);
        assert_eq!(s.state(), SonarState::Off);
        assert_eq!(s.take_reading(), None);
    }

    #[test]
    fn tick_rate_scales_distance() {
        let config = SonarConfig::DEFAULT
            .with_timer_clock(16_000_000, &crate::timer::TimerConfig::FREE_RUNNING_8BIT);
        let s = Sonar::new(MockPin::new(), MockCounter::new(), config).unwrap();
        // 16 ticks/us, 15cm is 870us
        assert!((s.ticks_to_cm(13_920) - 15.0).abs() < 0.01);
    }

    #[test]
    fn long_flight_times_out() {
        let (mut s, _, counter) = sonar();
        s.trigger(&mut NoopDelay::default()).unwrap();
        s.on_echo_edge(true);

        // 200ms = 200_000 ticks = 781.25 overflows
        for _ in 0..781 {
            counter.set(0);
            s.on_overflow();
            assert_eq!(s.state(), SonarState::Measuring);
        }
        s.on_overflow();
        assert_eq!(s.state(), SonarState::Available);

        // a late falling edge does not overwrite the timeout
        s.on_echo_edge(false);
        assert_eq!(s.take_reading(), Some(Echo::NoResponse));
        assert_eq!(Echo::NoResponse.centimeters(), -1.0);
    }

    #[test]
    fn missing_echo_does_not_wedge() {
        let (mut s, _, _) = sonar();
        s.trigger(&mut NoopDelay::default()).unwrap();
        for _ in 0..800 {
            s.on_overflow();
        }
        assert_eq!(s.take_reading(), Some(Echo::NoResponse));
        assert!(s.is_idle());
    }

    #[test]
    fn falling_edge_past_threshold_is_no_response() {
        let (mut s, _, counter) = sonar();
        s.trigger(&mut NoopDelay::default()).unwrap();
        fly(&mut s, &counter, 199_900);
        counter.set(255);
        // overflow interrupt for the last wrap not serviced yet
        s.overflows += 1;
        s.on_echo_edge(false);
        assert_eq!(s.take_reading(), Some(Echo::NoResponse));
    }

    #[test]
    fn trigger_refused_while_busy() {
        let (mut s, pin, _) = sonar();
        let mut delay = NoopDelay::default();
        s.trigger(&mut delay).unwrap();
        let writes = pin.writes();

        assert_eq!(s.trigger(&mut delay), Ok(false));
        s.on_echo_edge(true);
        assert_eq!(s.trigger(&mut delay), Ok(false));
        s.on_echo_edge(false);
        // result not consumed yet
        assert_eq!(s.trigger(&mut delay), Ok(false));
        assert_eq!(pin.writes(), writes);

        s.take_reading();
        assert_eq!(s.trigger(&mut delay), Ok(true));
    }

    #[test]
    fn stray_edges_ignored() {
        let (mut s, _, _) = sonar();
        s.on_echo_edge(true);
        s.on_echo_edge(false);
        s.on_overflow();
        assert_eq!(s.state(), SonarState::Off);

        s.trigger(&mut NoopDelay::default()).unwrap();
        s.on_echo_edge(false);
        assert_eq!(s.state(), SonarState::Pulsing);
    }
}
