mod config;
mod error;
mod format;
mod init;
mod level;
mod timer;

pub use config::{ENV_LOG_COLOR, ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_LOG_TZ, LoggerConfig};
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;
pub use timer::{LogTimer, LoggerTimeZone};

/// Install the global tracing subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] when called twice. With
/// [`LoggerTimeZone::Local`] the offset is resolved once, here; call this before the
/// async runtime starts worker threads, or timestamps fall back to UTC.
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => init::text(cfg),
        LoggerFormat::Json => init::json(cfg),
        LoggerFormat::Journald => init::journald(cfg),
    }
}
