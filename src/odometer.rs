use drive_core::encoder::{Encoders, Odometer};
use drive_core::Side;

/// Reads one wheel's count out of the encoder state shared with the edge interrupts.
pub struct LockedOdometer<'a, M> {
    encoders: &'a mut M,
    side: Side,
}

impl<'a, M: rtic::Mutex<T = Encoders>> LockedOdometer<'a, M> {
    pub fn new(encoders: &'a mut M, side: Side) -> Self {
        Self { encoders, side }
    }
}

impl<M: rtic::Mutex<T = Encoders>> Odometer for LockedOdometer<'_, M> {
    fn count(&mut self) -> i32 {
        let side = self.side;
        self.encoders.lock(|encoders| encoders[side].count())
    }

    fn reset_count(&mut self) {
        let side = self.side;
        self.encoders.lock(|encoders| encoders[side].reset_count())
    }
}
