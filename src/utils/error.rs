//! Error handling.

use std::fmt;

/// Failures that abort a download session, plus the plumbing errors that feed them.
#[derive(Debug)]
pub enum Error {
    /// No version id could be resolved for the selected profile.
    VersionUnresolved(String),
    /// Version metadata could not be fetched or parsed.
    VersionMetadata(String),
    /// The asset index was fetched but could not be read or decoded.
    AssetIndex(String),
    /// A fetch worker died before the pool drained.
    PoolInterrupted(String),
    /// The session was cancelled through its token.
    Cancelled,
    /// Configuration could not be loaded or saved.
    Config(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Http(String),
    Other(String),
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether this error ends the whole session rather than a single item.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::VersionUnresolved(_)
                | Self::VersionMetadata(_)
                | Self::AssetIndex(_)
                | Self::PoolInterrupted(_)
                | Self::Cancelled
                | Self::Config(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionUnresolved(msg) => write!(f, "Version ID is unresolved: {msg}"),
            Self::VersionMetadata(msg) => write!(f, "Version info could not be obtained: {msg}"),
            Self::AssetIndex(msg) => write!(f, "Failed to read asset index: {msg}"),
            Self::PoolInterrupted(msg) => write!(f, "Download pool unexpectedly closed: {msg}"),
            Self::Cancelled => write!(f, "Download cancelled"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::Json(err) => write!(f, "JSON error: {err}"),
            Self::Http(msg) => write!(f, "HTTP error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::PoolInterrupted(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Self::new(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Self::new(msg)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[macro_export]
macro_rules! simple_error {
    ($msg:literal) => {
        $crate::utils::error::Error::new(format!($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::utils::error::Error::new(format!($fmt, $($arg)*))
    };
}
