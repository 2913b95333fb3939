//! `log` facade front end. Every record goes to each back-end enabled by cargo features.
#[cfg(feature = "defmt_logger")]
pub mod defmt_logger;

/// Always built, the drain task owns the debug port either way.
pub mod serial_logger;

pub use log::Level;
use log::{Metadata, Record};

struct FanOut;

static LOGGER: FanOut = FanOut;

/// A second call is a no-op.
pub fn init(level: Level) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level.to_level_filter());
    }
}

fn each_back_end(mut f: impl FnMut(&dyn log::Log)) {
    #[cfg(feature = "defmt_logger")]
    f(defmt_logger::get_logger());

    #[cfg(feature = "serial_logger")]
    f(serial_logger::get_logger());
}

impl log::Log for FanOut {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            each_back_end(|logger| logger.log(record));
        }
    }

    fn flush(&self) {
        each_back_end(|logger| logger.flush());
    }
}
