/// Number of short blinks shown before the board resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FatalCode(u8);

impl FatalCode {
    pub const CLOCK_SELECT: Self = Self(1);
    pub const TIMER_MODE: Self = Self(2);
    pub const COMPARE_OUTPUT: Self = Self(3);
    pub const DRIVE_CONFIG: Self = Self(4);
    pub const CALIBRATION: Self = Self(11);
    pub const PIN_IO: Self = Self(12);

    pub const fn blinks(&self) -> u8 {
        self.0
    }
}

/// Last resort for unrecoverable errors: show the code and reset the device.
pub trait FatalAbort {
    fn kill(&mut self, code: FatalCode) -> !;
}
