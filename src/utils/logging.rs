//! Minimal logging system.
//!
//! Lines go through the `log` facade and are mirrored on a broadcast channel so a
//! console view can follow a running session.

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

// Channel for sending logs to the UI
static LOG_CHANNEL: Lazy<broadcast::Sender<String>> = Lazy::new(|| {
    let (sender, _) = broadcast::channel(256);
    sender
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }

    const fn as_log(self) -> log::Level {
        match self {
            Self::Error => log::Level::Error,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
            Self::Debug => log::Level::Debug,
        }
    }
}

/// Installs `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
pub fn init_from_env() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Receives every line logged through the macros from now on.
pub fn subscribe() -> broadcast::Receiver<String> {
    LOG_CHANNEL.subscribe()
}

pub fn log(level: LogLevel, message: &str) {
    log::log!(target: "dream_fetcher", level.as_log(), "{message}");
    if level != LogLevel::Debug {
        // Nobody listening is fine
        let _ = LOG_CHANNEL.send(format!("[{}] {}", level.as_str(), message));
    }
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::utils::logging::log($crate::utils::logging::LogLevel::Error, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::utils::logging::log($crate::utils::logging::LogLevel::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::utils::logging::log($crate::utils::logging::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::utils::logging::log($crate::utils::logging::LogLevel::Debug, &format!($($arg)*))
    };
}
