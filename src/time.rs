use fugit::{MillisDurationU32, TimerDurationU64};

/// Tick type of the TIM2 monotonic
pub type MonoDuration = TimerDurationU64<1_000_000>;

pub const HEARTBEAT: MonoDuration = MonoDuration::millis(500);
/// Pause between serial log chunks while output is queued
pub const LOG_CHUNK_GAP: MonoDuration = MonoDuration::millis(1);
pub const LOG_IDLE: MonoDuration = MonoDuration::millis(10);

pub fn mono_duration(duration: MillisDurationU32) -> MonoDuration {
    MonoDuration::millis(duration.ticks() as u64)
}
