use crate::config::DriveConfig;

/// Percent duty for each wheel, always within `[0, limited throttle]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyPair {
    pub left: u8,
    pub right: u8,
}

impl DutyPair {
    pub const ZERO: Self = Self { left: 0, right: 0 };
}

/// Mix glove tilt into the throttle.
///
/// Small tilts inside the dead-zone drive straight. Past the saturation angle the pitch is
/// pinned to +-100 so the inner wheel stops completely. Negative pitch turns left by slowing
/// the left wheel, positive pitch slows the right wheel.
pub fn compute_duty(pitch_degrees: i16, throttle_percent: u8, config: &DriveConfig) -> DutyPair {
    let dead_zone = config.dead_zone_degrees as i32;
    let saturation = config.saturation_degrees as i32;

    let mut pitch = pitch_degrees as i32;
    if pitch > -dead_zone && pitch < dead_zone {
        pitch = 0;
    } else if pitch > saturation {
        pitch = 100;
    } else if pitch < -saturation {
        pitch = -100;
    }

    let throttle = config.limiter.limit(throttle_percent.min(100) as i32);

    let mut left = throttle;
    let mut right = throttle;
    if pitch < 0 {
        left = throttle + pitch;
    } else if pitch > 0 {
        right = throttle - pitch;
    }

    DutyPair {
        left: left.clamp(0, throttle) as u8,
        right: right.clamp(0, throttle) as u8,
    }
}
