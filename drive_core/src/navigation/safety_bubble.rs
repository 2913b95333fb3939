use crate::config::DriveConfig;
use crate::motors::Direction;
use crate::ultrasonic::Echo;

/// Reactive stop-on-obstacle guard for the single forward facing sonar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyBubble {
    front_cm: f32,
    stop_cm: f32,
    far_cm: f32,
}

impl SafetyBubble {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            front_cm: config.far_cm,
            stop_cm: config.obstacle_stop_cm,
            far_cm: config.far_cm,
        }
    }

    /// A ping that never came back is taken as open space.
    pub fn update_front(&mut self, echo: Echo) {
        self.front_cm = match echo {
            Echo::Distance(cm) => cm,
            Echo::NoResponse => self.far_cm,
        };
    }

    pub fn front_distance(&self) -> f32 {
        self.front_cm
    }

    /// Reversing away from an obstacle is always allowed.
    pub fn is_blocked(&self, direction: Direction) -> bool {
        direction == Direction::Forward && self.front_cm < self.stop_cm
    }
}

/// Spaces out pings so echoes from the previous one have died down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SonarSchedule {
    rest_ticks: u8,
    resting: u8,
}

impl SonarSchedule {
    /// The first ping goes out on the first idle tick.
    pub fn new(rest_ticks: u8) -> Self {
        Self {
            rest_ticks,
            resting: rest_ticks,
        }
    }

    /// Called once per tick, returns whether to trigger now.
    pub fn poll(&mut self, sonar_idle: bool) -> bool {
        if !sonar_idle {
            return false;
        }
        if self.resting < self.rest_ticks {
            self.resting += 1;
            return false;
        }
        true
    }

    /// A result was just consumed, start resting.
    pub fn on_result(&mut self) {
        self.resting = 0;
    }

    /// A ping went out, even if it was not this schedule that asked for it.
    pub fn on_trigger(&mut self) {
        self.resting = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_only_forward_and_close() {
        let mut bubble = SafetyBubble::new(&DriveConfig::DEFAULT);
        assert!(!bubble.is_blocked(Direction::Forward));

        bubble.update_front(Echo::Distance(14.9));
        assert!(bubble.is_blocked(Direction::Forward));
        assert!(!bubble.is_blocked(Direction::Backward));

        bubble.update_front(Echo::Distance(15.0));
        assert!(!bubble.is_blocked(Direction::Forward));
    }

    #[test]
    fn no_response_means_far() {
        let mut bubble = SafetyBubble::new(&DriveConfig::DEFAULT);
        bubble.update_front(Echo::Distance(3.0));
        bubble.update_front(Echo::NoResponse);
        assert_eq!(bubble.front_distance(), 1000.0);
        assert!(!bubble.is_blocked(Direction::Forward));
    }

    #[test]
    fn schedule_rests_between_pings() {
        let mut schedule = SonarSchedule::new(5);
        assert!(schedule.poll(true));
        schedule.on_trigger();

        // measuring
        assert!(!schedule.poll(false));
        assert!(!schedule.poll(false));

        schedule.on_result();
        let fired: Vec<bool> = (0..7).map(|_| schedule.poll(true)).collect();
        assert_eq!(fired, [false, false, false, false, false, true, true]);
    }
}
