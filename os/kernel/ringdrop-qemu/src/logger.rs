use crate::qemu_trace;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// A `log::Log` backend writing `[LEVEL] target: message` lines to the
/// QEMU debug port.
pub struct QemuLogger {
    max_level: LevelFilter,
}

impl QemuLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Install this logger as the global `log` backend. Call once, early;
    /// the logger lives in a private static because `set_logger` wants a
    /// `&'static dyn Log` and the kernel has no allocator at that point.
    ///
    /// # Errors
    /// [`SetLoggerError`] if a global logger is already installed.
    #[allow(static_mut_refs, clippy::missing_panics_doc)]
    pub fn init(self) -> Result<(), SetLoggerError> {
        static mut LOGGER: Option<QemuLogger> = None;

        unsafe {
            LOGGER = Some(self);
            log::set_logger(LOGGER.as_ref().unwrap() as &'static dyn Log)?;
        }
        log::set_max_level(LevelFilter::Trace);
        Ok(())
    }
}

impl Log for QemuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        qemu_trace!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}
