use log::{LevelFilter, SetLoggerError};
use spin::{Mutex, Once};

use crate::serial::Serial;

static LOGGER: SerialLogger = SerialLogger;

static SERIAL: Once<Mutex<Serial>> = Once::new();

pub struct SerialLogger;

impl log::Log for SerialLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        use core::fmt::Write;

        if self.enabled(record.metadata()) {
            if cfg!(feature = "log_e9") {
                let mut writer = crate::arch::x86::e9::DebugPort;

                _ = writeln!(writer, "[{}] {}", record.level(), record.args());
            } else if let Some(serial) = SERIAL.get() {
                _ = writeln!(serial.lock(), "[{}] {}", record.level(), record.args());
            }
        }
    }

    fn flush(&self) {}
}

pub fn init_serial_logger(serial: Serial) -> Result<(), SetLoggerError> {
    SERIAL.call_once(|| Mutex::new(serial));

    log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Trace))
}
