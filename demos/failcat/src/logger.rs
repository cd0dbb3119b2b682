use std::io::Write;
use std::thread;

use flexi_logger::{DeferredNow, FlexiLoggerError, Logger, LoggerHandle};
use log::Record;

/// Initializes a stderr logger with custom formatting. The returned handle
/// must stay alive for the duration of the program.
pub fn init() -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str("info")?
        .log_to_stderr()
        .format(log_format)
        .start()
}

/// Custom log line format: timestamp, level, thread name, and message.
fn log_format(w: &mut dyn Write, now: &mut DeferredNow, record: &Record) -> std::io::Result<()> {
    write!(
        w,
        "{} [{:<5}] [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        record.level(),
        thread::current().name().unwrap_or("<unnamed>"),
        &record.args()
    )
}
