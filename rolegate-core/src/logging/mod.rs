//! Logging setup on top of the standard `log` crate
//!
//! Library code only uses the `log` macros. Binaries call [`init_logging`]
//! once at startup; lines go to stderr so command output on stdout stays
//! clean.
//!
//! ```rust,no_run
//! use rolegate_core::config::LoggingConfig;
//!
//! rolegate_core::logging::init_logging(&LoggingConfig::default()).unwrap();
//! log::info!("Matrix loaded");
//! ```

pub mod formatter;

pub use formatter::{LogEntry, LogFormat};

use crate::config::LoggingConfig;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the Rolegate logger
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    config.validate()?;
    let level = config.level_filter()?;
    let format = LogFormat::from_config(&config.format).unwrap_or_default();

    let mut result = Ok(());
    INIT.call_once(|| {
        result = log::set_boxed_logger(Box::new(RolegateLogger { level, format }))
            .map(|()| log::set_max_level(level))
            .map_err(anyhow::Error::from);
    });
    result
}

struct RolegateLogger {
    level: log::LevelFilter,
    format: LogFormat,
}

impl log::Log for RolegateLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = LogEntry::from_log_record(record);
        let line = self.format.format_entry(&entry);
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
