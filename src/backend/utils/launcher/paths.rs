//! Path layout of a working directory.
//!
//! Everything here is relative to the session working directory except
//! [`get_launcher_dir`], which picks the default working directory itself.

use std::path::{Component, Path, PathBuf};

use crate::simple_error;
use crate::utils::Result;

const LAUNCHER_DIR: &str = "DreamLauncher";
const VERSIONS: &str = "versions";
const LIBRARIES: &str = "libraries";
const ASSETS: &str = "assets";
const OBJECTS: &str = "objects";
const INDEXES: &str = "indexes";
const VERSION_MANIFEST: &str = "version_manifest.json";

/// Get the base launcher directory (`DreamLauncher`).
pub fn get_launcher_dir() -> Result<PathBuf> {
    let base_dir = match std::env::consts::OS {
        "windows" => std::env::var("APPDATA")
            .ok()
            .map(PathBuf::from)
            .ok_or_else(|| simple_error!("Could not determine AppData directory"))?,
        "macos" => std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
            .ok_or_else(|| simple_error!("Could not determine home directory"))?,
        _ => std::env::var("HOME")
            .ok()
            .map(PathBuf::from)
            .ok_or_else(|| simple_error!("Could not determine home directory"))?,
    };
    Ok(base_dir.join(LAUNCHER_DIR))
}

/// Cached copy of the remote version manifest.
#[inline]
pub fn version_manifest_path() -> PathBuf {
    PathBuf::from(VERSIONS).join(VERSION_MANIFEST)
}

/// `versions/<id>/<id>.json`
pub fn version_json_path(version: &str) -> Result<PathBuf> {
    let version = path_segment(version)?;
    Ok(PathBuf::from(VERSIONS)
        .join(version)
        .join(format!("{version}.json")))
}

/// `versions/<id>/<id>.jar`
pub fn version_jar_path(version: &str) -> Result<PathBuf> {
    let version = path_segment(version)?;
    Ok(PathBuf::from(VERSIONS)
        .join(version)
        .join(format!("{version}.jar")))
}

/// `assets/indexes/<id>.json`
pub fn asset_index_path(index_id: &str) -> Result<PathBuf> {
    let index_id = path_segment(index_id)?;
    Ok(PathBuf::from(ASSETS)
        .join(INDEXES)
        .join(format!("{index_id}.json")))
}

/// `assets/objects/<hash[0:2]>/<hash>`
pub fn asset_object_path(hash: &str) -> Result<PathBuf> {
    let hash = checked_hash(hash)?;
    Ok(PathBuf::from(ASSETS).join(OBJECTS).join(&hash[..2]).join(hash))
}

/// `<resources>/<hash[0:2]>/<hash>`
pub fn asset_object_url(resources_url: &str, hash: &str) -> Result<String> {
    let hash = checked_hash(hash)?;
    Ok(format!(
        "{}/{}/{hash}",
        resources_url.trim_end_matches('/'),
        &hash[..2]
    ))
}

/// `libraries/<artifact path>`
pub fn library_path(artifact_path: &str) -> Result<PathBuf> {
    let relative = Path::new(artifact_path);
    if artifact_path.is_empty() || !stays_inside(relative) {
        return Err(simple_error!(
            "Library path escapes the libraries directory: {artifact_path:?}"
        ));
    }
    Ok(Path::new(LIBRARIES).join(relative))
}

/// True when `path` is relative and made only of plain names, so joining it onto a
/// directory can never leave that directory.
pub fn stays_inside(path: &Path) -> bool {
    !path.is_absolute()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// A single file name component: no separators, not `.` or `..`.
fn path_segment(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':', '\0']);
    if valid {
        Ok(name)
    } else {
        Err(simple_error!("Not a valid file name: {name:?}"))
    }
}

/// Asset hashes are 40-character hex SHA-1 digests.
fn checked_hash(hash: &str) -> Result<&str> {
    if hash.len() == 40 && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(hash)
    } else {
        Err(simple_error!("Malformed asset hash: {hash:?}"))
    }
}
