//! Last resort: stop the motors, blink the code on every LED, reset.
use cortex_m::peripheral::SCB;
use drive_core::fatal::{FatalAbort, FatalCode};
use stm32f4xx_hal::pac;

/// PD12..PD15 in BSRR
const ALL_LEDS: u32 = 0xF << 12;

pub struct Reset {
    cycles_per_ms: u32,
}

impl Reset {
    pub fn new(sysclk_hz: u32) -> Self {
        Self {
            cycles_per_ms: sysclk_hz / 1000,
        }
    }

    fn wait_ms(&self, ms: u32) {
        for _ in 0..ms {
            cortex_m::asm::delay(self.cycles_per_ms);
        }
    }
}

impl FatalAbort for Reset {
    fn kill(&mut self, code: FatalCode) -> ! {
        cortex_m::interrupt::disable();

        // Whoever owned these pins is never running again.
        let dp = unsafe { pac::Peripherals::steal() };
        dp.TIM3.ccer.reset();
        dp.TIM3.cr1.modify(|_, w| w.cen().clear_bit());
        dp.TIM9.cr1.modify(|_, w| w.cen().clear_bit());

        let leds = |on: bool| {
            let bits = if on { ALL_LEDS } else { ALL_LEDS << 16 };
            dp.GPIOD.bsrr.write(|w| unsafe { w.bits(bits) });
        };

        leds(true);
        self.wait_ms(5000);
        leds(false);
        self.wait_ms(2000);

        for _ in 0..code.blinks() {
            leds(true);
            self.wait_ms(250);
            leds(false);
            self.wait_ms(250);
        }

        SCB::sys_reset()
    }
}
