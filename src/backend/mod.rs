//! Backend of the application.

pub mod downloader;
pub mod launcher;
pub mod utils;
