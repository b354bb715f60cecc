//! HTTP transfer primitive.

use crate::backend::utils::config::HttpConfig;
use crate::backend::utils::system::files::ensure_parent_directory;
use crate::log_debug;
use crate::utils::{Error, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Fetches one URL into one file.
///
/// Implementations replace `destination` atomically: after a call either the old
/// content or the complete new content is in place. Any `Err` is retryable.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn download_file(&self, url: &str, destination: &Path) -> Result<()>;
}

/// `reqwest`-backed fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }

    async fn stream_to(&self, url: &str, partial: &Path) -> Result<u64> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "Failed to download {url}: HTTP {}",
                response.status()
            )));
        }

        let mut file = File::create(partial).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn download_file(&self, url: &str, destination: &Path) -> Result<()> {
        ensure_parent_directory(destination).await?;
        let mut partial = PartialFile::new(partial_path(destination));

        log_debug!("Downloading {} to {:?}", url, destination);
        let written = self.stream_to(url, &partial.path).await?;
        tokio::fs::rename(&partial.path, destination).await?;
        partial.committed = true;
        log_debug!("Wrote {written} bytes to {destination:?}");
        Ok(())
    }
}

/// Removes the `.part` file unless the transfer was committed, including when the
/// download future is dropped mid-stream.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Sibling file the transfer streams into before it is renamed over the target.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::downloader::retry::{RetryOutcome, with_retry};
    use tokio::io::AsyncReadExt;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn partial_file_sits_next_to_target() {
        assert_eq!(
            partial_path(Path::new("assets/objects/ab/abcdef")),
            PathBuf::from("assets/objects/ab/abcdef.part")
        );
        assert_eq!(
            partial_path(Path::new("versions/1.8.9/1.8.9.jar")),
            PathBuf::from("versions/1.8.9/1.8.9.jar.part")
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error_and_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(&HttpConfig {
            connect_timeout_secs: 1,
            timeout_secs: 1,
            ..HttpConfig::default()
        })
        .unwrap();
        let dest = dir.path().join("x/file.bin");

        let result = fetcher.download_file("http://127.0.0.1:1/file.bin", &dest).await;
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    /// Sends the headers and the first kilobyte of a large body, then stalls.
    async fn stalling_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 1000000\r\n\r\n")
                .await
                .unwrap();
            socket.write_all(&[7u8; 1000]).await.unwrap();
            std::future::pending::<()>().await;
        });
        format!("http://{addr}/big.bin")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelling_mid_transfer_removes_the_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = stalling_server().await;
        let dest = dir.path().join("objects/big.bin");
        let part = partial_path(&dest);
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        let token = CancellationToken::new();

        let transfer = {
            let token = token.clone();
            let dest = dest.clone();
            tokio::spawn(async move {
                with_retry(0, &token, |_| fetcher.download_file(&url, &dest)).await
            })
        };

        for _ in 0..500 {
            if part.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(part.exists(), "transfer never started writing");

        token.cancel();
        let outcome = transfer.await.unwrap();
        assert!(matches!(outcome, RetryOutcome::Cancelled));
        assert!(!part.exists());
        assert!(!dest.exists());
    }
}
