//! Version selection and version metadata retrieval.

use super::models::{VersionDetails, VersionManifest};
use crate::backend::downloader::events::EventSink;
use crate::backend::downloader::http::RemoteFetcher;
use crate::backend::downloader::retry::{RetryOutcome, with_retry};
use crate::backend::utils::config::{DownloaderConfig, VersionSelection};
use crate::backend::utils::launcher::paths::{version_json_path, version_manifest_path};
use crate::utils::{Error, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub struct VersionManager<'a> {
    config: &'a DownloaderConfig,
    fetcher: &'a dyn RemoteFetcher,
    sink: &'a dyn EventSink,
    cancel: &'a CancellationToken,
}

impl<'a> VersionManager<'a> {
    pub fn new(
        config: &'a DownloaderConfig,
        fetcher: &'a dyn RemoteFetcher,
        sink: &'a dyn EventSink,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            config,
            fetcher,
            sink,
            cancel,
        }
    }

    /// Refreshes the cached version manifest and loads it.
    ///
    /// A failed refresh falls back to the cached copy; no usable copy gives `None`.
    pub async fn load_manifest(&self) -> Result<Option<VersionManifest>> {
        let path = self.config.working_dir.join(version_manifest_path());

        if !self.config.offline {
            match self
                .fetch_with_retry(&self.config.urls.version_manifest, &path)
                .await
            {
                RetryOutcome::Done => {}
                RetryOutcome::Cancelled => return Err(Error::Cancelled),
                RetryOutcome::Exhausted(e) => self
                    .sink
                    .error(&format!("Failed to refresh the version manifest: {e}")),
            }
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(manifest) => Ok(Some(manifest)),
                Err(e) => {
                    self.sink
                        .error(&format!("Cached version manifest is unreadable: {e}"));
                    Ok(None)
                }
            },
            Err(_) => Ok(None),
        }
    }

    /// Picks the version id the configured selection points at.
    pub fn resolve_version_id(&self, manifest: Option<&VersionManifest>) -> Result<String> {
        let latest = manifest.map(|m| &m.latest);
        let resolved = match &self.config.selection {
            VersionSelection::Custom {
                version: Some(version),
            } if !version.is_empty() => Some(version.clone()),
            VersionSelection::Custom { .. } | VersionSelection::LatestRelease => {
                latest.and_then(|l| l.release.clone())
            }
            VersionSelection::LatestSnapshot => latest.and_then(|l| l.snapshot.clone()),
        };

        resolved.ok_or_else(|| {
            Error::VersionUnresolved(format!(
                "no version id for selection {:?}",
                self.config.selection
            ))
        })
    }

    /// Fetches `versions/<id>/<id>.json` and parses it. Any failure here is fatal.
    pub async fn fetch_version_details(
        &self,
        manifest: Option<&VersionManifest>,
        version_id: &str,
    ) -> Result<VersionDetails> {
        let path = version_json_path(version_id)
            .map(|relative| self.config.working_dir.join(relative))
            .map_err(|e| Error::VersionMetadata(e.to_string()))?;
        let url = manifest
            .and_then(|m| m.get_version(version_id))
            .map(|v| v.url.as_str());

        match (self.config.offline, url) {
            (false, Some(url)) => match self.fetch_with_retry(url, &path).await {
                RetryOutcome::Done => {}
                RetryOutcome::Cancelled => return Err(Error::Cancelled),
                RetryOutcome::Exhausted(e) => {
                    self.sink.error(&format!(
                        "Failed to download version index {version_id}.json"
                    ));
                    return Err(Error::VersionMetadata(format!("{version_id}: {e}")));
                }
            },
            (false, None) => self.sink.info(&format!(
                "Version {version_id} is not listed remotely, using the local copy"
            )),
            (true, _) => {}
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::VersionMetadata(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::VersionMetadata(format!("{}: {e}", path.display())))
    }

    pub async fn fetch_with_retry(&self, url: &str, destination: &Path) -> RetryOutcome {
        with_retry(self.config.download_tries, self.cancel, |_| {
            self.fetcher.download_file(url, destination)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::downloader::events::LogSink;
    use crate::backend::launcher::models::{LatestVersions, VersionInfo};
    use async_trait::async_trait;

    struct NoNetwork;

    #[async_trait]
    impl RemoteFetcher for NoNetwork {
        async fn download_file(&self, url: &str, _destination: &Path) -> Result<()> {
            Err(Error::Http(format!("offline: {url}")))
        }
    }

    fn manifest() -> VersionManifest {
        VersionManifest {
            latest: LatestVersions {
                release: Some("1.20.1".into()),
                snapshot: Some("23w31a".into()),
            },
            versions: vec![VersionInfo {
                id: "1.20.1".into(),
                version_type: "release".into(),
                url: "https://meta/1.20.1.json".into(),
            }],
        }
    }

    fn config(selection: VersionSelection, dir: &Path) -> DownloaderConfig {
        DownloaderConfig {
            working_dir: dir.to_path_buf(),
            selection,
            download_tries: 1,
            ..DownloaderConfig::default()
        }
    }

    #[test]
    fn selection_resolves_against_latest() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let m = manifest();
        let cases = [
            (VersionSelection::LatestRelease, Some("1.20.1")),
            (VersionSelection::LatestSnapshot, Some("23w31a")),
            (VersionSelection::Custom { version: None }, Some("1.20.1")),
            (
                VersionSelection::Custom {
                    version: Some("1.8.9".into()),
                },
                Some("1.8.9"),
            ),
        ];

        for (selection, expected) in cases {
            let cfg = config(selection, dir.path());
            let versions = VersionManager::new(&cfg, &NoNetwork, &LogSink, &token);
            assert_eq!(versions.resolve_version_id(Some(&m)).ok().as_deref(), expected);
        }
    }

    #[test]
    fn nothing_to_resolve_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let cfg = config(VersionSelection::LatestRelease, dir.path());
        let versions = VersionManager::new(&cfg, &NoNetwork, &LogSink, &token);

        let err = versions.resolve_version_id(None).unwrap_err();
        assert!(matches!(err, Error::VersionUnresolved(_)));
    }

    #[tokio::test]
    async fn unreachable_metadata_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let cfg = config(VersionSelection::LatestRelease, dir.path());
        let versions = VersionManager::new(&cfg, &NoNetwork, &LogSink, &token);

        let err = versions
            .fetch_version_details(Some(&manifest()), "1.20.1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VersionMetadata(_)));
    }

    #[tokio::test]
    async fn unlisted_version_uses_local_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let cfg = config(VersionSelection::LatestRelease, dir.path());
        let path = dir.path().join(version_json_path("custom").unwrap());
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, r#"{"id": "custom", "libraries": []}"#)
            .await
            .unwrap();

        let versions = VersionManager::new(&cfg, &NoNetwork, &LogSink, &token);
        let details = versions
            .fetch_version_details(Some(&manifest()), "custom")
            .await
            .unwrap();
        assert_eq!(details.id, "custom");
        assert!(details.asset_index.is_none());

        assert!(versions.load_manifest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn version_ids_cannot_leave_the_versions_directory() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let cfg = config(VersionSelection::LatestRelease, dir.path());
        let versions = VersionManager::new(&cfg, &NoNetwork, &LogSink, &token);

        let err = versions
            .fetch_version_details(None, "../../outside")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VersionMetadata(_)));
    }
}
