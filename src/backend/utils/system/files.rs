//! File system utilities for common operations.

use crate::log_debug;
use crate::utils::Result;
use sha1::{Digest, Sha1};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Ensures a directory exists, creating it and all parent directories if necessary.
pub async fn ensure_directory<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !fs::try_exists(path).await.unwrap_or(false) {
        fs::create_dir_all(path).await?;
        log_debug!("Created directory: {path:?}");
    }
    Ok(())
}

/// Ensures the parent directory of a file exists.
pub async fn ensure_parent_directory<P: AsRef<Path>>(file_path: P) -> Result<()> {
    if let Some(parent) = file_path.as_ref().parent() {
        ensure_directory(parent).await?;
    }
    Ok(())
}

/// Streams a file through SHA-1 and returns the lowercase hex digest.
pub async fn sha1_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = fs::File::open(path.as_ref()).await?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; 65536];

    loop {
        match file.read(&mut buffer).await? {
            0 => break,
            n => hasher.update(&buffer[..n]),
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compares the SHA-1 of a file against an expected hex digest.
///
/// Unreadable files count as a mismatch.
pub async fn verify_checksum<P: AsRef<Path>>(path: P, expected_sha1: &str) -> bool {
    let path = path.as_ref();
    match sha1_file(path).await {
        Ok(computed) if computed.eq_ignore_ascii_case(expected_sha1) => true,
        Ok(computed) => {
            log_debug!("SHA1 mismatch for {path:?}: expected {expected_sha1}, got {computed}");
            false
        }
        Err(e) => {
            log_debug!("Could not hash {path:?}: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha1("hello")
    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";

    #[tokio::test]
    async fn hashes_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        assert_eq!(sha1_file(&path).await.unwrap(), HELLO_SHA1);
        assert!(verify_checksum(&path, HELLO_SHA1).await);
        assert!(verify_checksum(&path, &HELLO_SHA1.to_uppercase()).await);
        assert!(!verify_checksum(&path, "0000").await);
    }

    #[tokio::test]
    async fn missing_file_never_verifies() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!verify_checksum(dir.path().join("nope"), HELLO_SHA1).await);
    }

    #[tokio::test]
    async fn creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a/b/c.bin");
        ensure_parent_directory(&file).await.unwrap();
        assert!(dir.path().join("a/b").is_dir());
        ensure_parent_directory(&file).await.unwrap();
    }
}
