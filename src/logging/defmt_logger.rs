use defmt::Display2Format;
use defmt_rtt as _;
use log::{Level, Metadata, Record};

pub(crate) struct DefmtLogger;

static DEFMT_LOGGER: DefmtLogger = DefmtLogger;

pub(super) fn get_logger() -> &'static impl log::Log {
    &DEFMT_LOGGER
}

impl log::Log for DefmtLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let args = Display2Format(record.args());
        match record.level() {
            Level::Trace => defmt::trace!("{}", args),
            Level::Debug => defmt::debug!("{}", args),
            Level::Info => defmt::info!("{}", args),
            Level::Warn => defmt::warn!("{}", args),
            Level::Error => defmt::error!("{}", args),
        }
    }

    fn flush(&self) {}
}
