use std::path::{Path, PathBuf};

/// One remote object a session may have to fetch.
///
/// Identity is the destination path: two descriptors resolving to the same file are the
/// same download obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDescriptor {
    /// `None` when the source declares no fetchable object.
    pub url: Option<String>,
    /// `None` when the size is unknown; hash validation still applies.
    pub size: Option<u64>,
    /// Lowercase hex SHA-1.
    pub sha1: Option<String>,
    /// Relative to the session working directory.
    pub destination: PathBuf,
    /// Overrides the file name in progress reporting.
    pub display_name: Option<String>,
}

impl DownloadDescriptor {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: Some(url.into()),
            size: None,
            sha1: None,
            destination: destination.into(),
            display_name: None,
        }
    }

    /// A descriptor whose source has nothing to download.
    pub fn unavailable(destination: impl Into<PathBuf>) -> Self {
        Self {
            url: None,
            size: None,
            sha1: None,
            destination: destination.into(),
            display_name: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_sha1(mut self, sha1: impl Into<String>) -> Self {
        self.sha1 = Some(sha1.into().to_ascii_lowercase());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Bytes this descriptor contributes to progress totals.
    pub fn size_or_zero(&self) -> u64 {
        self.size.unwrap_or(0)
    }

    /// Label shown while the file transfers.
    pub fn label(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => self
                .destination
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.destination.display().to_string()),
        }
    }

    pub fn resolve(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(&self.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_prefers_display_name() {
        let d = DownloadDescriptor::new("https://x/abc", "assets/objects/ab/abc");
        assert_eq!(d.label(), "abc");
        assert_eq!(
            d.with_display_name("minecraft/sounds/step.ogg").label(),
            "minecraft/sounds/step.ogg"
        );
    }

    #[test]
    fn hashes_are_normalized_and_unknown_size_counts_zero() {
        let d = DownloadDescriptor::new("https://x", "a.jar").with_sha1("ABCDEF");
        assert_eq!(d.sha1.as_deref(), Some("abcdef"));
        assert_eq!(d.size_or_zero(), 0);
        assert_eq!(d.with_size(7).size_or_zero(), 7);
    }
}
