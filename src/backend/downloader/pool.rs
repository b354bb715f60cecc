//! Bounded concurrent fetching of the reconciled file list.

use super::events::EventSink;
use super::http::RemoteFetcher;
use super::models::DownloadDescriptor;
use super::progress::ProgressState;
use super::retry::{RetryOutcome, with_retry};
use crate::backend::utils::system::files::verify_checksum;
use crate::utils::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// How one fetch item ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Downloaded,
    Failed,
    Cancelled,
}

/// Per-run tallies, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub downloaded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// State every worker shares.
struct Worker {
    fetcher: Arc<dyn RemoteFetcher>,
    sink: Arc<dyn EventSink>,
    progress: Arc<ProgressState>,
    working_dir: PathBuf,
    download_tries: u32,
}

/// Fixed-width worker pool.
pub struct FetchPool {
    worker: Arc<Worker>,
    pool_size: usize,
}

impl FetchPool {
    pub fn new(
        fetcher: Arc<dyn RemoteFetcher>,
        sink: Arc<dyn EventSink>,
        progress: Arc<ProgressState>,
        working_dir: PathBuf,
        pool_size: usize,
        download_tries: u32,
    ) -> Self {
        Self {
            worker: Arc::new(Worker {
                fetcher,
                sink,
                progress,
                working_dir,
                download_tries,
            }),
            pool_size: pool_size.max(1),
        }
    }

    /// Downloads every descriptor, at most `pool_size` at a time, and waits for all of
    /// them. Items that exhaust their retries are logged and skipped; only a worker
    /// dying is an error.
    pub async fn fetch(
        &self,
        descriptors: Vec<DownloadDescriptor>,
        cancel: &CancellationToken,
    ) -> Result<FetchSummary> {
        let semaphore = Arc::new(Semaphore::new(self.pool_size));
        let mut workers = JoinSet::new();
        let mut summary = FetchSummary::default();

        // Taking the permit before spawning keeps submission in list order.
        for descriptor in descriptors {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    summary.cancelled += 1;
                    continue;
                }
                permit = semaphore.clone().acquire_owned() => permit
                    .map_err(|e| Error::PoolInterrupted(e.to_string()))?,
            };

            let worker = self.worker.clone();
            let cancel = cancel.clone();
            workers.spawn(async move {
                let _permit = permit;
                worker.fetch_one(descriptor, &cancel).await
            });
        }
        semaphore.close();

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(ItemOutcome::Downloaded) => summary.downloaded += 1,
                Ok(ItemOutcome::Failed) => summary.failed += 1,
                Ok(ItemOutcome::Cancelled) => summary.cancelled += 1,
                Err(e) => {
                    workers.abort_all();
                    return Err(Error::PoolInterrupted(e.to_string()));
                }
            }
        }

        Ok(summary)
    }
}

impl Worker {
    async fn fetch_one(
        &self,
        descriptor: DownloadDescriptor,
        cancel: &CancellationToken,
    ) -> ItemOutcome {
        let label = descriptor.label();
        let Some(url) = descriptor.url.as_deref() else {
            self.sink.error(&format!("No download URL for {label}, skipping"));
            return ItemOutcome::Failed;
        };
        let destination = descriptor.resolve(&self.working_dir);

        self.progress.set_current_file(&label);
        self.sink.info(&format!("Downloading {label} from {url}"));

        let outcome = with_retry(self.download_tries, cancel, |_| {
            let destination = &destination;
            let expected = descriptor.sha1.as_deref();
            async move {
                self.fetcher.download_file(url, destination).await?;
                match expected {
                    Some(sha1) if !verify_checksum(destination, sha1).await => Err(Error::new(
                        format!("Hash mismatch for {url}: expected {sha1}"),
                    )),
                    _ => Ok(()),
                }
            }
        })
        .await;

        match outcome {
            RetryOutcome::Done => {
                self.progress.add_downloaded(descriptor.size_or_zero());
                ItemOutcome::Downloaded
            }
            RetryOutcome::Exhausted(e) => {
                self.sink
                    .error(&format!("Failed to download file {label} from {url}: {e}"));
                ItemOutcome::Failed
            }
            RetryOutcome::Cancelled => ItemOutcome::Cancelled,
        }
    }
}
