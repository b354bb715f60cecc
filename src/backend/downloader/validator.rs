//! Local file validation.

use super::models::DownloadDescriptor;
use crate::backend::utils::system::files::verify_checksum;
use crate::log_debug;
use std::path::Path;

/// What the working directory already holds for a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Absent,
    PresentValid,
    PresentInvalid,
}

impl Validity {
    pub const fn needs_download(self) -> bool {
        !matches!(self, Self::PresentValid)
    }
}

pub struct LocalValidator;

impl LocalValidator {
    /// Checks `local_path` against the descriptor's size and SHA-1.
    ///
    /// A declared hash is always computed, even when the size already matches.
    pub async fn validate(descriptor: &DownloadDescriptor, local_path: &Path) -> Validity {
        let metadata = match tokio::fs::metadata(local_path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Validity::Absent,
        };

        if let Some(expected) = descriptor.size {
            if metadata.len() != expected {
                log_debug!(
                    "File size mismatch for {:?}: expected {}, got {}",
                    local_path,
                    expected,
                    metadata.len()
                );
                return Validity::PresentInvalid;
            }
        }

        match &descriptor.sha1 {
            Some(expected) if !verify_checksum(local_path, expected).await => {
                Validity::PresentInvalid
            }
            _ => Validity::PresentValid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";

    async fn check(size: Option<u64>, sha1: Option<&str>) -> Validity {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let mut descriptor = DownloadDescriptor::new("https://x/hello", "hello.txt");
        descriptor.size = size;
        descriptor.sha1 = sha1.map(str::to_string);
        LocalValidator::validate(&descriptor, &path).await
    }

    #[tokio::test]
    async fn decision_table() {
        // (size matches, hash declared, hash matches)
        assert_eq!(check(Some(5), Some(HELLO_SHA1)).await, Validity::PresentValid);
        assert_eq!(check(Some(5), Some("deadbeef")).await, Validity::PresentInvalid);
        assert_eq!(check(Some(5), None).await, Validity::PresentValid);
        assert_eq!(check(Some(4), Some(HELLO_SHA1)).await, Validity::PresentInvalid);
        assert_eq!(check(Some(4), Some("deadbeef")).await, Validity::PresentInvalid);
        assert_eq!(check(Some(4), None).await, Validity::PresentInvalid);
    }

    #[tokio::test]
    async fn unknown_size_still_checks_hash() {
        assert_eq!(check(None, Some(HELLO_SHA1)).await, Validity::PresentValid);
        assert_eq!(check(None, Some("deadbeef")).await, Validity::PresentInvalid);
        assert_eq!(check(None, None).await, Validity::PresentValid);
    }

    #[tokio::test]
    async fn missing_files_and_directories_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = DownloadDescriptor::new("https://x", "sub").with_size(0);

        let missing = LocalValidator::validate(&descriptor, &dir.path().join("nope")).await;
        assert_eq!(missing, Validity::Absent);

        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
        let directory = LocalValidator::validate(&descriptor, &dir.path().join("sub")).await;
        assert_eq!(directory, Validity::Absent);
        assert!(directory.needs_download());
    }
}
