//! A full download session: resolve the version, reconcile, fetch.

use super::events::{EventSink, LogSink};
use super::http::{HttpFetcher, RemoteFetcher};
use super::models::DownloadDescriptor;
use super::pool::FetchPool;
use super::progress::{ProgressMonitor, ProgressState};
use super::reconciler::{LibrarySource, ManifestSources, Reconciler};
use super::retry::RetryOutcome;
use crate::backend::launcher::models::{Artifact, AssetManifest, Library, VersionDetails};
use crate::backend::launcher::platform::PlatformInfo;
use crate::backend::launcher::versions::VersionManager;
use crate::backend::utils::config::DownloaderConfig;
use crate::backend::utils::launcher::paths::{
    asset_index_path, asset_object_path, asset_object_url, library_path, version_jar_path,
};
use crate::simple_error;
use crate::utils::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where a version's asset index comes from.
struct AssetIndexLocation {
    id: String,
    url: String,
}

/// Drives download sessions and owns their progress.
pub struct Downloader {
    config: DownloaderConfig,
    fetcher: Arc<dyn RemoteFetcher>,
    sink: Arc<dyn EventSink>,
    platform: PlatformInfo,
    progress: Arc<ProgressState>,
}

/// Clears the active flag however the session ends.
struct ActiveGuard<'a>(&'a ProgressState);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

impl Downloader {
    pub fn new(
        config: DownloaderConfig,
        fetcher: Arc<dyn RemoteFetcher>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config: config.normalized(),
            fetcher,
            sink,
            platform: PlatformInfo::new(),
            progress: Arc::new(ProgressState::new()),
        }
    }

    /// HTTP fetcher and log sink, as the binary uses them.
    pub fn from_config(config: DownloaderConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.http)?;
        Ok(Self::new(config, Arc::new(fetcher), Arc::new(LogSink)))
    }

    /// Overrides the detected platform used for library rules.
    pub fn with_platform(mut self, platform: PlatformInfo) -> Self {
        self.platform = platform;
        self
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    pub fn monitor(&self) -> ProgressMonitor {
        ProgressMonitor::new(self.progress.clone())
    }

    pub async fn start_download(&self) -> Result<()> {
        self.start_download_with(&CancellationToken::new()).await
    }

    /// Runs one session to completion, a fatal error, or cancellation.
    pub async fn start_download_with(&self, cancel: &CancellationToken) -> Result<()> {
        if !self.progress.begin() {
            return Err(simple_error!("A download session is already running"));
        }
        let _active = ActiveGuard(&self.progress);

        let result = self.run(cancel).await;
        if let Err(e) = &result {
            self.sink.error(&e.to_string());
        }
        result
    }

    async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        self.sink.info("Download work has started.");

        let versions = VersionManager::new(
            &self.config,
            self.fetcher.as_ref(),
            self.sink.as_ref(),
            cancel,
        );
        let manifest = versions.load_manifest().await?;
        let version_id = versions.resolve_version_id(manifest.as_ref())?;
        self.sink.info(&format!("Using version ID: {version_id}"));
        let details = versions
            .fetch_version_details(manifest.as_ref(), &version_id)
            .await?;

        self.sink.info("Fetching asset urls..");
        let assets = self.asset_descriptors(&versions, &details).await?;

        self.sink.info("Fetching version and library urls..");
        let sources = ManifestSources {
            assets,
            client: self.client_descriptor(&details),
            libraries: self.library_sources(&details),
        };

        let reconciled = Reconciler::new(&self.config.working_dir, self.sink.as_ref())
            .reconcile(sources)
            .await;
        self.progress
            .prime(reconciled.bytes_total, reconciled.bytes_validated);
        self.sink.info(&format!(
            "{} bytes required, {} already valid, {} bytes in {} files to fetch",
            reconciled.bytes_total,
            reconciled.bytes_validated,
            reconciled.bytes_pending(),
            reconciled.to_fetch.len()
        ));

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        self.sink.info("Downloading required game files...");
        if reconciled.to_fetch.is_empty() {
            self.sink.info("Nothing to download.");
            return Ok(());
        }

        let pool = FetchPool::new(
            self.fetcher.clone(),
            self.sink.clone(),
            self.progress.clone(),
            self.config.working_dir.clone(),
            self.config.pool_size,
            self.config.download_tries,
        );
        let summary = pool.fetch(reconciled.to_fetch, cancel).await?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        self.sink.info(&format!(
            "Download finished: {} fetched, {} failed",
            summary.downloaded, summary.failed
        ));
        Ok(())
    }

    /// Fetches the asset index and lists its objects.
    ///
    /// A download failure skips assets; an index that arrived but cannot be
    /// decoded is fatal.
    async fn asset_descriptors(
        &self,
        versions: &VersionManager<'_>,
        details: &VersionDetails,
    ) -> Result<Vec<DownloadDescriptor>> {
        let Some(location) = self.asset_index_location(details) else {
            self.sink.info(&format!(
                "Version {} does not have any valid assets.",
                details.id
            ));
            return Ok(Vec::new());
        };
        let full_path = match asset_index_path(&location.id) {
            Ok(relative) => self.config.working_dir.join(relative),
            Err(e) => {
                self.sink.error(&format!("Skipping assets: {e}"));
                return Ok(Vec::new());
            }
        };

        if self.config.offline {
            if !full_path.is_file() {
                self.sink.error(&format!(
                    "No local asset index for version {}",
                    location.id
                ));
                return Ok(Vec::new());
            }
        } else {
            match versions.fetch_with_retry(&location.url, &full_path).await {
                RetryOutcome::Done => {}
                RetryOutcome::Cancelled => return Err(Error::Cancelled),
                RetryOutcome::Exhausted(e) => {
                    self.sink.error(&format!(
                        "Failed to download asset index for version {}: {e}",
                        location.id
                    ));
                    return Ok(Vec::new());
                }
            }
        }

        let bytes = tokio::fs::read(&full_path)
            .await
            .map_err(|e| Error::AssetIndex(format!("{}: {e}", full_path.display())))?;
        let manifest: AssetManifest = serde_json::from_str(&decode_index(bytes))
            .map_err(|e| Error::AssetIndex(format!("{}: {e}", full_path.display())))?;

        let mut objects: Vec<_> = manifest.objects.into_iter().collect();
        objects.sort_by(|a, b| a.0.cmp(&b.0));

        let mut descriptors = Vec::with_capacity(objects.len());
        for (key, object) in objects {
            let hash = object.hash.to_ascii_lowercase();
            let (path, url) = match (
                asset_object_path(&hash),
                asset_object_url(&self.config.urls.resources, &hash),
            ) {
                (Ok(path), Ok(url)) => (path, url),
                (Err(e), _) | (_, Err(e)) => {
                    self.sink.error(&format!("Skipping asset {key}: {e}"));
                    continue;
                }
            };
            descriptors.push(
                DownloadDescriptor::new(url, path)
                    .with_size(object.size)
                    .with_sha1(hash)
                    .with_display_name(key),
            );
        }
        Ok(descriptors)
    }

    fn asset_index_location(&self, details: &VersionDetails) -> Option<AssetIndexLocation> {
        if let Some(index) = &details.asset_index {
            return Some(AssetIndexLocation {
                id: index.id.clone(),
                url: index.url.clone(),
            });
        }

        let id = details.assets.as_deref().filter(|id| !id.is_empty())?;
        Some(AssetIndexLocation {
            id: id.to_string(),
            url: format!(
                "{}/{id}.json",
                self.config.urls.legacy_asset_indexes.trim_end_matches('/')
            ),
        })
    }

    fn client_descriptor(&self, details: &VersionDetails) -> Option<DownloadDescriptor> {
        let client = details.downloads.as_ref()?.client.as_ref()?;
        self.checked(
            "client",
            artifact_descriptor(client, || version_jar_path(&details.id)),
        )
    }

    fn library_sources(&self, details: &VersionDetails) -> Vec<LibrarySource> {
        details
            .libraries
            .iter()
            .map(|library| {
                let applicable = self.platform.is_compatible(library);
                let artifact = library
                    .downloads
                    .as_ref()
                    .and_then(|d| d.artifact.as_ref())
                    .and_then(|a| {
                        let fallback = || library_path(&maven_path(library, None));
                        self.checked(&library.name, artifact_descriptor(a, fallback))
                    });
                let classifier = self.platform.native_artifact(library).and_then(|a| {
                    let fallback = || library_path(&maven_path(library, Some("natives")));
                    self.checked(&library.name, artifact_descriptor(a, fallback))
                });

                if applicable && artifact.is_none() && classifier.is_none() {
                    self.sink.info(&format!(
                        "Library {} has no download for this platform",
                        library.name
                    ));
                }

                LibrarySource {
                    name: library.name.clone(),
                    applicable,
                    artifact,
                    classifier,
                }
            })
            .collect()
    }

    /// Logs and drops a descriptor whose destination could not be built.
    fn checked(
        &self,
        origin: &str,
        descriptor: Result<DownloadDescriptor>,
    ) -> Option<DownloadDescriptor> {
        descriptor
            .map_err(|e| self.sink.error(&format!("Skipping {origin}: {e}")))
            .ok()
    }
}

/// Descriptor for a metadata artifact; `fallback` is used when it declares no path.
fn artifact_descriptor(
    artifact: &Artifact,
    fallback: impl FnOnce() -> Result<PathBuf>,
) -> Result<DownloadDescriptor> {
    let destination = match artifact.path.as_deref() {
        Some(path) => library_path(path)?,
        None => fallback()?,
    };

    let mut descriptor = match &artifact.url {
        Some(url) if !url.is_empty() => DownloadDescriptor::new(url.clone(), destination),
        _ => DownloadDescriptor::unavailable(destination),
    };
    if let Some(size) = artifact.size {
        descriptor = descriptor.with_size(size);
    }
    if let Some(sha1) = &artifact.sha1 {
        descriptor = descriptor.with_sha1(sha1.clone());
    }
    Ok(descriptor)
}

/// `group/artifact/version/artifact-version[-classifier].jar` from a Maven coordinate.
fn maven_path(library: &Library, classifier: Option<&str>) -> String {
    let mut parts = library.name.split(':');
    let group = parts.next().unwrap_or_default().replace('.', "/");
    let artifact = parts.next().unwrap_or_default();
    let version = parts.next().unwrap_or_default();

    match classifier {
        Some(classifier) => {
            format!("{group}/{artifact}/{version}/{artifact}-{version}-{classifier}.jar")
        }
        None => format!("{group}/{artifact}/{version}/{artifact}-{version}.jar"),
    }
}

/// Asset indexes are UTF-8 in practice; very old ones are Latin-1.
fn decode_index(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}
