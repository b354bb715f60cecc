//! Version metadata: models, platform rules and version selection.

/// Data models and structures.
pub mod models;
/// Library rule evaluation and native selection.
pub mod platform;
/// Version management functionality.
pub mod versions;

pub use platform::PlatformInfo;
pub use versions::VersionManager;
