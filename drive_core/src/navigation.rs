pub mod safety_bubble;

pub use safety_bubble::{SafetyBubble, SonarSchedule};
