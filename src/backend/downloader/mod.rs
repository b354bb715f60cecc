//! Reconciliation and concurrent fetching of game files.
//!
//! A session resolves the version to install, turns its metadata into
//! [`DownloadDescriptor`]s, checks them against the working directory with the
//! [`Reconciler`], then hands the missing subset to the [`FetchPool`]. Progress is
//! readable at any time through a [`ProgressMonitor`].

/// Message sink for session events.
pub mod events;
/// HTTP transfer primitive.
pub mod http;
/// Download descriptors.
pub mod models;
/// Bounded worker pool.
pub mod pool;
/// Shared progress counters.
pub mod progress;
/// Manifest versus disk comparison.
pub mod reconciler;
/// Bounded retry loop.
pub mod retry;
/// Session orchestration.
pub mod session;
/// Local file validation.
pub mod validator;

pub use events::{EventSink, LogSink};
pub use http::{HttpFetcher, RemoteFetcher};
pub use models::DownloadDescriptor;
pub use pool::{FetchPool, FetchSummary};
pub use progress::{ProgressMonitor, ProgressSnapshot, ProgressState};
pub use reconciler::{LibrarySource, ManifestSources, ReconciliationResult, Reconciler};
pub use session::Downloader;
pub use validator::{LocalValidator, Validity};
