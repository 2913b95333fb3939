//! `level: message` lines on the debug USART.
//!
//! Records are formatted where they are logged and queued. The blocking UART writes happen
//! in [`drain`], called from the lowest priority task, so interrupts are only masked while
//! a line is copied into or out of the queue.
use core::cell::RefCell;
use core::fmt::Write;

use cortex_m::interrupt::{self, Mutex};
use drive_core::line_queue::LineQueue;
use embedded_hal_02::blocking::serial::Write as _;
use rover_hardware::serial::DebugSerialPort;

const QUEUE_LEN: usize = 1024;
/// Bytes written per call to [`drain`], about 0.7 ms at 115200 baud
const CHUNK_LEN: usize = 8;

static BACKLOG: Mutex<RefCell<LineQueue<QUEUE_LEN>>> = Mutex::new(RefCell::new(LineQueue::new()));

/// Writes the next chunk of queued output. Returns `true` while more is waiting.
pub fn drain(tx: &mut DebugSerialPort) -> bool {
    let mut chunk = [0u8; CHUNK_LEN];
    let (len, dropped, more) = interrupt::free(|cs| {
        let mut backlog = BACKLOG.borrow(cs).borrow_mut();
        let len = backlog.pop_chunk(&mut chunk);
        (len, backlog.take_dropped(), !backlog.is_empty())
    });

    // Nowhere to report a failed log write.
    if dropped > 0 {
        let _ = write!(tx, "serial log overflowed, {} lines lost\r\n", dropped);
    }
    let _ = tx.bwrite_all(&chunk[..len]);

    more
}

#[cfg(feature = "serial_logger")]
pub(super) use back_end::get_logger;

#[cfg(feature = "serial_logger")]
mod back_end {
    use core::fmt::Write;

    use cortex_m::interrupt;
    use heapless::String;
    use log::{Level, Metadata, Record};

    use super::BACKLOG;

    /// Longer records are cut short
    const LINE_LEN: usize = 126;

    pub(crate) struct SerialLogger;

    static SERIAL_LOGGER: SerialLogger = SerialLogger;

    pub(in crate::logging) fn get_logger() -> &'static impl log::Log {
        &SERIAL_LOGGER
    }

    impl log::Log for SerialLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }

            let level = match record.level() {
                Level::Trace => "trace",
                Level::Debug => "debug",
                Level::Info => "info",
                Level::Warn => "warn",
                Level::Error => "error",
            };

            let mut line: String<LINE_LEN> = String::new();
            // a full line keeps what fit
            let _ = write!(line, "{}: {}", level, record.args());

            interrupt::free(|cs| {
                BACKLOG.borrow(cs).borrow_mut().push_line(line.as_bytes());
            });
        }

        fn flush(&self) {}
    }
}
