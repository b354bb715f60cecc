//! Dream Fetcher: works out which game files a Minecraft installation is missing and
//! downloads them with a small pool of concurrent transfers.

pub mod backend;
pub mod utils;

pub use backend::downloader::{Downloader, ProgressMonitor};
pub use backend::utils::config::{DownloaderConfig, VersionSelection};
pub use utils::{Error, Result};
