use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, warn};
use tokio::time::sleep;

use crate::{
    archive::{FetchRequest, SharedArchive},
    format::{format_path, format_size},
    install::{discard, AtomicInstaller},
    outcome::{ErrorKind, RestoreOutcome},
    stats::RestoreStats,
    sync::lock,
};

/// Where a batch's files come from.
#[derive(Debug, Clone)]
pub struct Origin {
    pub host: String,
    pub username: String,
    pub machine_id: i64,
}

/// The parts of a request a task needs; the caller's context stays behind
/// in the batch's outcome table.
#[derive(Debug, Clone)]
pub struct FileTarget {
    pub path: PathBuf,
    pub version: i64,
    pub temp_path: PathBuf,
}

impl Origin {
    fn fetch_request<'a>(&'a self, target: &'a FileTarget) -> FetchRequest<'a> {
        FetchRequest {
            host: &self.host,
            username: &self.username,
            machine_id: self.machine_id,
            path: &target.path,
            version: target.version,
        }
    }
}

/// Drives single files through fetch then install.
#[derive(Debug, Clone)]
pub struct FileRestorer {
    archive: SharedArchive,
    installer: AtomicInstaller,
    retries: u32,
    retry_delay: Duration,
    stats: Arc<Mutex<RestoreStats>>,
}

impl FileRestorer {
    pub fn new(
        archive: SharedArchive,
        installer: AtomicInstaller,
        retries: u32,
        retry_delay: Duration,
        stats: Arc<Mutex<RestoreStats>>,
    ) -> Self {
        FileRestorer {
            archive,
            installer,
            retries,
            retry_delay,
            stats,
        }
    }

    /// Restores one file, re-running the whole fetch and install after
    /// transient failures. Only the last attempt's result is returned.
    pub async fn restore(&self, origin: &Origin, target: &FileTarget) -> RestoreOutcome {
        let mut attempt = 0;

        loop {
            match self.attempt(origin, target).await {
                Ok(size) => {
                    let outcome = RestoreOutcome::Success(target.version);
                    lock(&self.stats).add_file(&outcome, size);
                    debug!(
                        "restored {} version {} ({})",
                        format_path(&target.path),
                        target.version,
                        format_size(size)
                    );
                    return outcome;
                }
                Err(kind) if kind.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    lock(&self.stats).retries += 1;
                    warn!(
                        "{kind} restoring {}, retrying ({attempt}/{})",
                        format_path(&target.path),
                        self.retries
                    );
                    sleep(self.retry_delay).await;
                }
                Err(kind) => {
                    let outcome = RestoreOutcome::Failed(kind);
                    lock(&self.stats).add_file(&outcome, 0);
                    return outcome;
                }
            }
        }
    }

    async fn attempt(&self, origin: &Origin, target: &FileTarget) -> Result<u64, ErrorKind> {
        let request = origin.fetch_request(target);

        let size = match self.archive.fetch(&request, &target.temp_path).await {
            Ok(size) => size,
            Err(err) => {
                warn!("fetching {} failed: {err}", format_path(&target.path));
                discard(&target.temp_path).await;
                return Err(err.kind());
            }
        };

        self.installer
            .install(&target.temp_path, &target.path)
            .await
            .map_err(|err| {
                warn!("{err}");
                err.kind()
            })?;

        Ok(size)
    }
}
