//! Where session messages go.

use crate::{log_error, log_info};

/// Fire-and-forget sink for session messages.
pub trait EventSink: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to the crate logger (and its UI broadcast).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn info(&self, message: &str) {
        log_info!("{message}");
    }

    fn error(&self, message: &str) {
        log_error!("{message}");
    }
}
