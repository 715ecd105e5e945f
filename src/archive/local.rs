use std::{
    io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use log::trace;
use tokio::{fs, time::sleep};

use crate::{
    error::{Error, Result},
    sync::lock,
};

use super::{
    object_key, relative_path, ArchiveClient, ArchiveStats, FetchError, FetchRequest, FetchResult,
};

/// Archive kept in a local directory tree, laid out as
/// `<root>/<host>/<username>/<machine_id>/<path>/<version>`.
#[derive(Debug)]
pub struct LocalArchive {
    root: PathBuf,
    latency: Option<Duration>,
    stats: Mutex<ArchiveStats>,
}

impl LocalArchive {
    pub fn new<P: AsRef<Path>>(root: P, latency: Option<Duration>) -> Self {
        LocalArchive {
            root: root.as_ref().to_owned(),
            latency,
            stats: Mutex::new(ArchiveStats::new()),
        }
    }

    fn host_path(&self, host: &str) -> Option<PathBuf> {
        let host = relative_path(Path::new(host));
        if host.as_os_str().is_empty() {
            None
        } else {
            Some(self.root.join(host))
        }
    }

    fn machine_path(host_path: &Path, request: &FetchRequest) -> PathBuf {
        host_path
            .join(relative_path(Path::new(request.username)))
            .join(request.machine_id.to_string())
    }

    /// Stores `data` as the given version, creating directories as needed.
    pub async fn put(&self, request: &FetchRequest<'_>, data: &[u8]) -> Result<()> {
        let host_path = self
            .host_path(request.host)
            .ok_or_else(|| Error::invalid_argument("host is empty"))?;
        let object_path = host_path.join(object_key(request));
        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(object_path, data).await?;
        Ok(())
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            sleep(latency).await;
        }
    }

    async fn copy_object(&self, request: &FetchRequest<'_>, temp_path: &Path) -> FetchResult<u64> {
        let host_path = self
            .host_path(request.host)
            .ok_or_else(|| FetchError::network(request, "empty host"))?;
        if !exists(&host_path).await? {
            return Err(FetchError::network(request, "no such host"));
        }

        if !exists(&Self::machine_path(&host_path, request)).await? {
            return Err(FetchError::auth(request));
        }

        let object_path = host_path.join(object_key(request));
        if !exists(&object_path).await? {
            return Err(FetchError::version_not_found(request));
        }

        trace!("copying {} to {}", object_path.display(), temp_path.display());
        let size = fs::copy(&object_path, temp_path)
            .await
            .map_err(FetchError::remote_io)?;
        Ok(size)
    }
}

#[async_trait]
impl ArchiveClient for LocalArchive {
    async fn fetch(&self, request: &FetchRequest<'_>, temp_path: &Path) -> FetchResult<u64> {
        self.simulate_latency().await;

        let result = self.copy_object(request, temp_path).await;
        let size = *result.as_ref().unwrap_or(&0);
        lock(&self.stats).add_fetch(&result, size);
        result
    }

    fn stats(&self) -> ArchiveStats {
        *lock(&self.stats)
    }
}

async fn exists(path: &Path) -> FetchResult<bool> {
    match fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(FetchError::remote_io(err)),
    }
}
