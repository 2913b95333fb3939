use stm32f4xx_hal::gpio::{Output, Pin, PushPull, PD12, PD13, PD14, PD15};

pub type GreenLed = PD12<Output<PushPull>>;
pub type OrangeLed = PD13<Output<PushPull>>;
pub type RedLed = PD14<Output<PushPull>>;
pub type BlueLed = PD15<Output<PushPull>>;

pub trait Led {
    fn turn_on(&mut self);
    fn turn_off(&mut self);
    fn toggle(&mut self);

    fn set(&mut self, on: bool) {
        if on {
            self.turn_on();
        } else {
            self.turn_off();
        }
    }
}

impl<const P: char, const N: u8> Led for Pin<P, N, Output<PushPull>> {
    fn turn_on(&mut self) {
        self.set_high();
    }

    fn turn_off(&mut self) {
        self.set_low();
    }

    fn toggle(&mut self) {
        Pin::toggle(self);
    }
}

/// The three LEDs that mirror drive state. Orange is left to the heartbeat task.
pub struct Indicators {
    pub link: GreenLed,
    pub blocked: RedLed,
    pub pending: BlueLed,
}

impl Indicators {
    pub fn show(&mut self, connected: bool, blocked: bool, pending: bool) {
        self.link.set(connected);
        self.blocked.set(blocked);
        self.pending.set(pending);
    }
}
