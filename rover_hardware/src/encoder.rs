use stm32f4xx_hal::gpio::{ExtiPin, Input, Pin};

/// A/B channel inputs of one wheel encoder, both edges of both pins raise the same EXTI
/// group interrupt.
pub struct EncoderPins<const P: char, const A: u8, const B: u8> {
    a: Pin<P, A, Input>,
    b: Pin<P, B, Input>,
}

pub type LeftEncoderPins = EncoderPins<'E', 5, 6>;
pub type RightEncoderPins = EncoderPins<'E', 11, 12>;

impl<const P: char, const A: u8, const B: u8> EncoderPins<P, A, B> {
    pub fn new(a: Pin<P, A, Input>, b: Pin<P, B, Input>) -> Self {
        Self { a, b }
    }

    pub fn levels(&self) -> (bool, bool) {
        (self.a.is_high(), self.b.is_high())
    }

    pub fn clear_interrupt(&mut self) {
        self.a.clear_interrupt_pending_bit();
        self.b.clear_interrupt_pending_bit();
    }
}
