use crate::backend::utils::launcher::paths::get_launcher_dir;
use crate::backend::utils::system::files::ensure_parent_directory;
use crate::utils::{Error, Result};
use crate::log_info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_POOL_SIZE: usize = 5;
pub const DEFAULT_DOWNLOAD_TRIES: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Root every relative destination path is resolved against.
    pub working_dir: PathBuf,
    /// Concurrent transfers in the fetch pool.
    pub pool_size: usize,
    /// Extra attempts after a failed download.
    pub download_tries: u32,
    /// Use local version metadata and asset indexes instead of fetching them.
    pub offline: bool,
    pub selection: VersionSelection,
    pub urls: RemoteUrls,
    pub http: HttpConfig,
}

/// Which version a session downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VersionSelection {
    LatestRelease,
    LatestSnapshot,
    /// A pinned version; falls back to the latest release when `version` is empty.
    Custom { version: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteUrls {
    pub version_manifest: String,
    pub resources: String,
    pub legacy_asset_indexes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        let working_dir = get_launcher_dir().unwrap_or_else(|_| PathBuf::from(".minecraft"));

        Self {
            working_dir,
            pool_size: DEFAULT_POOL_SIZE,
            download_tries: DEFAULT_DOWNLOAD_TRIES,
            offline: false,
            selection: VersionSelection::default(),
            urls: RemoteUrls::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for VersionSelection {
    fn default() -> Self {
        Self::LatestRelease
    }
}

impl Default for RemoteUrls {
    fn default() -> Self {
        Self {
            version_manifest: "https://launchermeta.mojang.com/mc/game/version_manifest.json"
                .to_string(),
            resources: "https://resources.download.minecraft.net".to_string(),
            legacy_asset_indexes: "https://s3.amazonaws.com/Minecraft.Download/indexes"
                .to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("DreamFetcher/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl DownloaderConfig {
    /// Loads the config at `path`, writing the defaults there first if it does not exist.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        let mut config = match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str::<Self>(&content)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save(path).await?;
                log_info!("Wrote default configuration to {}", path.display());
                config
            }
            Err(e) => return Err(Error::Config(format!("{}: {e}", path.display()))),
        };
        config.apply_env();
        Ok(config.normalized())
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        ensure_parent_directory(path).await?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// `DREAM_FETCHER_DIR` and `DREAM_FETCHER_POOL_SIZE` override the file.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("DREAM_FETCHER_DIR") {
            if !dir.is_empty() {
                self.working_dir = PathBuf::from(dir);
            }
        }
        if let Some(size) = std::env::var("DREAM_FETCHER_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.pool_size = size;
        }
    }

    pub fn normalized(mut self) -> Self {
        self.pool_size = self.pool_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/fetcher.json");

        let config = DownloaderConfig::load_or_create(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.download_tries, DEFAULT_DOWNLOAD_TRIES);
        assert_eq!(config.selection, VersionSelection::LatestRelease);
    }

    #[tokio::test]
    async fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetcher.json");
        tokio::fs::write(
            &path,
            r#"{
                "pool_size": 0,
                "offline": true,
                "selection": {"type": "custom", "version": "1.8.9"}
            }"#,
        )
        .await
        .unwrap();

        let config = DownloaderConfig::load_or_create(&path).await.unwrap();
        assert_eq!(config.pool_size, 1);
        assert!(config.offline);
        assert_eq!(
            config.selection,
            VersionSelection::Custom {
                version: Some("1.8.9".to_string())
            }
        );
        assert_eq!(config.urls.resources, RemoteUrls::default().resources);
    }

    #[tokio::test]
    async fn garbage_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetcher.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = DownloaderConfig::load_or_create(&path).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
