use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<VersionInfo>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LatestVersions {
    pub release: Option<String>,
    pub snapshot: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionDetails {
    pub id: String,
    #[serde(default)]
    pub libraries: Vec<Library>,
    pub downloads: Option<Downloads>,
    #[serde(rename = "assetIndex")]
    pub asset_index: Option<AssetIndex>,
    /// Legacy asset index id for versions without `assetIndex`.
    pub assets: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    pub action: String,
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OsRule {
    pub name: Option<String>,
    pub arch: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    pub rules: Option<Vec<Rule>>,
    pub natives: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryDownloads {
    pub artifact: Option<Artifact>,
    pub classifiers: Option<HashMap<String, Artifact>>,
}

/// A downloadable file as version metadata declares it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artifact {
    pub path: Option<String>,
    pub sha1: Option<String>,
    pub size: Option<u64>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Downloads {
    pub client: Option<Artifact>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetIndex {
    pub id: String,
    pub sha1: Option<String>,
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetManifest {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl VersionManifest {
    pub fn get_version(&self, version_id: &str) -> Option<&VersionInfo> {
        self.versions.iter().find(|v| v.id == version_id)
    }
}

impl Rule {
    /// Whether the rule's OS constraints hold for this platform. Action is not applied.
    pub fn applies_to(&self, os_name: &str, os_arch: &str) -> bool {
        let Some(os) = &self.os else {
            return true;
        };
        let name_ok = os.name.as_deref().is_none_or(|name| name == os_name);
        let arch_ok = os.arch.as_deref().is_none_or(|arch| arch == os_arch);
        name_ok && arch_ok
    }
}
