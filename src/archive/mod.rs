mod local;
mod s3;
mod url;

use std::{
    fmt::Debug,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::outcome::ErrorKind;

pub use self::{local::LocalArchive, s3::S3Archive, url::ArchiveUrl};

pub type SharedArchive = Arc<dyn ArchiveClient>;

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Identifies one versioned file on an archive host.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub host: &'a str,
    pub username: &'a str,
    pub machine_id: i64,
    pub path: &'a Path,
    pub version: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("cannot reach archive host `{host}`: {message}")]
    Network { host: String, message: String },

    #[error("`{username}` is not authorized for machine {machine_id}")]
    Auth { username: String, machine_id: i64 },

    #[error("version {version} of `{}` does not exist", path.display())]
    VersionNotFound { path: PathBuf, version: i64 },

    #[error("remote I/O error: {0}")]
    RemoteIo(String),
}

impl FetchError {
    pub fn network<S: ToString>(request: &FetchRequest, message: S) -> Self {
        FetchError::Network {
            host: request.host.to_owned(),
            message: message.to_string(),
        }
    }

    pub fn auth(request: &FetchRequest) -> Self {
        FetchError::Auth {
            username: request.username.to_owned(),
            machine_id: request.machine_id,
        }
    }

    pub fn version_not_found(request: &FetchRequest) -> Self {
        FetchError::VersionNotFound {
            path: request.path.to_owned(),
            version: request.version,
        }
    }

    pub fn remote_io<S: ToString>(message: S) -> Self {
        FetchError::RemoteIo(message.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Network { .. } => ErrorKind::NetworkError,
            FetchError::Auth { .. } => ErrorKind::AuthError,
            FetchError::VersionNotFound { .. } => ErrorKind::VersionNotFound,
            FetchError::RemoteIo(_) => ErrorKind::RemoteIoError,
        }
    }
}

/// Counters kept by every archive adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveStats {
    pub fetch_requests: u64,
    pub failed_requests: u64,
    pub bytes_downloaded: u64,
}

impl ArchiveStats {
    pub fn new() -> Self {
        ArchiveStats::default()
    }

    pub fn add_fetch<T>(&mut self, result: &FetchResult<T>, size: u64) {
        self.fetch_requests += 1;
        if result.is_ok() {
            self.bytes_downloaded += size;
        } else {
            self.failed_requests += 1;
        }
    }
}

/// Fetches one versioned file's content from an archive host into a local
/// temp file. Implementations may be slow and may fail; callers never look
/// past the returned error kind.
#[async_trait]
pub trait ArchiveClient: Debug + Send + Sync {
    /// Writes the requested version to `temp_path` and returns its size.
    async fn fetch(&self, request: &FetchRequest<'_>, temp_path: &Path) -> FetchResult<u64>;

    fn stats(&self) -> ArchiveStats;
}

pub async fn create_archive(url: &ArchiveUrl, latency: Option<Duration>) -> SharedArchive {
    match url {
        ArchiveUrl::S3(prefix) => Arc::new(S3Archive::new(prefix.clone()).await),
        ArchiveUrl::Local(path) => Arc::new(LocalArchive::new(path, latency)),
    }
}

/// Object key shared by all adapters: `<username>/<machine_id>/<path>/<version>`.
pub fn object_key(request: &FetchRequest) -> String {
    let username = relative_path(Path::new(request.username));
    let relative = relative_path(request.path);
    format!(
        "{}/{}/{}/{}",
        username.to_string_lossy(),
        request.machine_id,
        relative.to_string_lossy(),
        request.version
    )
}

/// Strips roots, prefixes and `..` so a restore path can be nested under an
/// archive directory without escaping it.
pub fn relative_path(path: &Path) -> PathBuf {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}
