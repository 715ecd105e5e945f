use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tokio::fs;

use crate::{error::Result, request::RestoreRequest};

use super::parse::VersionedPath;

/// One entry of a JSON manifest: `{"path": ..., "version": ..., "temp_path": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub version: i64,
    #[serde(default)]
    pub temp_path: Option<PathBuf>,
}

impl From<VersionedPath> for ManifestEntry {
    fn from(versioned: VersionedPath) -> Self {
        ManifestEntry {
            path: versioned.path,
            version: versioned.version,
            temp_path: None,
        }
    }
}

pub async fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let bytes = fs::read(path).await?;
    parse_manifest(&bytes)
}

pub fn parse_manifest(bytes: &[u8]) -> Result<Vec<ManifestEntry>> {
    let entries = serde_json::from_slice(bytes)?;
    Ok(entries)
}

/// Turns entries into requests whose context is the destination path, so
/// results can be reported by name.
pub fn into_requests(entries: Vec<ManifestEntry>) -> Vec<RestoreRequest<PathBuf>> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let temp_path = entry
                .temp_path
                .unwrap_or_else(|| default_temp_path(&entry.path, entry.version, index));
            RestoreRequest::new(entry.path.clone(), entry.version, temp_path, entry.path)
        })
        .collect()
}

/// Hidden sibling of the destination, unique per entry so duplicate
/// destinations never share a temp file.
pub fn default_temp_path(path: &Path, version: i64, index: usize) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or(OsStr::new("restore")));
    name.push(format!(".{version}.{index}.tmp"));
    path.with_file_name(name)
}
