//! Quadrature decoding from pin change interrupts.
//!
//! The board has no spare timer in encoder mode, so each wheel's A/B channels raise an
//! interrupt on every edge and the handler hands the sampled levels to
//! [`QuadratureDecoder::on_edge`]. Direction falls out of comparing each channel against the
//! *other* channel's previous level.
use core::ops::{Index, IndexMut};

use crate::motors::Side;

/// Anything that reports a signed wheel position, whether it is the decoder itself or a
/// handle that has to lock it first.
pub trait Odometer {
    fn count(&mut self) -> i32;
    fn reset_count(&mut self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QuadratureDecoder {
    position: i32,
    last_a: bool,
    last_b: bool,
    errors: u32,
}

impl QuadratureDecoder {
    pub const fn new() -> Self {
        Self {
            position: 0,
            last_a: false,
            last_b: false,
            errors: 0,
        }
    }

    /// Seed the previous levels, otherwise the first edge after boot is decoded against
    /// an assumed low/low.
    pub fn with_levels(a: bool, b: bool) -> Self {
        Self {
            last_a: a,
            last_b: b,
            ..Self::new()
        }
    }

    /// Only ever called from the channel's interrupt handler.
    pub fn on_edge(&mut self, a: bool, b: bool) {
        let forward = a ^ self.last_b;
        let backward = b ^ self.last_a;

        if forward {
            self.position = self.position.wrapping_add(1);
        }
        if backward {
            self.position = self.position.wrapping_sub(1);
        }

        // Both channels moving between two interrupts means an edge went by unseen.
        if a != self.last_a && b != self.last_b {
            self.errors = self.errors.wrapping_add(1);
        }

        self.last_a = a;
        self.last_b = b;
    }

    pub fn count(&self) -> i32 {
        self.position
    }

    pub fn reset_count(&mut self) {
        self.position = 0;
    }

    pub fn error_count(&self) -> u32 {
        self.errors
    }
}

impl Odometer for QuadratureDecoder {
    fn count(&mut self) -> i32 {
        self.position
    }

    fn reset_count(&mut self) {
        QuadratureDecoder::reset_count(self)
    }
}

/// Both wheel decoders, shared between the edge interrupts and the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Encoders {
    pub left: QuadratureDecoder,
    pub right: QuadratureDecoder,
}

impl Index<Side> for Encoders {
    type Output = QuadratureDecoder;

    fn index(&self, side: Side) -> &Self::Output {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

impl IndexMut<Side> for Encoders {
    fn index_mut(&mut self, side: Side) -> &mut Self::Output {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}
