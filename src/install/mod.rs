#[cfg(test)]
mod tests;

use std::{
    ffi::OsString,
    fmt, io,
    path::{Path, PathBuf},
    process,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use log::{debug, warn};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};

use crate::{error::Error, format::format_path, outcome::ErrorKind};

static SIBLING_COUNTER: AtomicU64 = AtomicU64::new(0);

pub type InstallResult<T> = std::result::Result<T, InstallError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    #[error("cannot install `{}`: {message}", path.display())]
    Install { path: PathBuf, message: String },

    #[error("cannot install `{}` across volumes: {message}", path.display())]
    CrossVolume { path: PathBuf, message: String },
}

impl InstallError {
    fn install<S: ToString>(path: &Path, message: S) -> Self {
        InstallError::Install {
            path: path.to_owned(),
            message: message.to_string(),
        }
    }

    fn cross_volume<S: ToString>(path: &Path, message: S) -> Self {
        InstallError::CrossVolume {
            path: path.to_owned(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            InstallError::Install { .. } => ErrorKind::InstallError,
            InstallError::CrossVolume { .. } => ErrorKind::CrossVolumeError,
        }
    }
}

/// What to do when the temp file and the destination live on different
/// filesystems and a plain rename is impossible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrossVolumePolicy {
    /// Copy into a sibling of the destination, then rename the sibling.
    #[default]
    CopyThenRename,
    Fail,
}

impl FromStr for CrossVolumePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copy" => Ok(CrossVolumePolicy::CopyThenRename),
            "fail" => Ok(CrossVolumePolicy::Fail),
            _ => Err(Error::InvalidArgument(format!(
                "cross-volume policy `{s}` is not one of `copy`, `fail`"
            ))),
        }
    }
}

impl fmt::Display for CrossVolumePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossVolumePolicy::CopyThenRename => f.write_str("copy"),
            CrossVolumePolicy::Fail => f.write_str("fail"),
        }
    }
}

/// Moves fully written temp files over their destinations. The destination
/// either keeps its previous content or receives the complete new content,
/// and the temp file is gone afterwards whatever the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicInstaller {
    cross_volume: CrossVolumePolicy,
}

impl AtomicInstaller {
    pub fn new(cross_volume: CrossVolumePolicy) -> Self {
        AtomicInstaller { cross_volume }
    }

    pub async fn install(&self, temp_path: &Path, destination: &Path) -> InstallResult<()> {
        let result = self.commit(temp_path, destination).await;
        if result.is_err() {
            discard(temp_path).await;
        }

        result
    }

    async fn commit(&self, temp_path: &Path, destination: &Path) -> InstallResult<()> {
        sync_file(temp_path)
            .await
            .map_err(|err| InstallError::install(destination, err))?;

        if let Some(parent) = non_empty_parent(destination) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| InstallError::install(destination, err))?;
        }

        match fs::rename(temp_path, destination).await {
            Ok(()) => {
                debug!("renamed into {}", format_path(destination));
                Ok(())
            }
            Err(err) => self.on_rename_error(err, temp_path, destination).await,
        }
    }

    /// Handles a failed rename of `temp_path` over `destination`. Only a
    /// cross-device failure under `CopyThenRename` can still succeed; the temp
    /// file is removed either way.
    async fn on_rename_error(
        &self,
        err: io::Error,
        temp_path: &Path,
        destination: &Path,
    ) -> InstallResult<()> {
        let result = if !is_cross_device(&err) {
            Err(InstallError::install(destination, err))
        } else {
            match self.cross_volume {
                CrossVolumePolicy::CopyThenRename => {
                    copy_then_rename(temp_path, destination).await
                }
                CrossVolumePolicy::Fail => Err(InstallError::cross_volume(destination, err)),
            }
        };

        discard(temp_path).await;
        result
    }
}

async fn copy_then_rename(temp_path: &Path, destination: &Path) -> InstallResult<()> {
    let sibling = sibling_path(destination);
    debug!(
        "{} is on another volume, staging through {}",
        format_path(temp_path),
        format_path(&sibling)
    );

    let result = async {
        fs::copy(temp_path, &sibling).await?;
        sync_file(&sibling).await?;
        fs::rename(&sibling, destination).await
    }
    .await;

    if let Err(err) = result {
        discard(&sibling).await;
        return Err(InstallError::cross_volume(destination, err));
    }

    Ok(())
}

/// Hidden, unique name in the destination's directory.
fn sibling_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(destination.file_name().unwrap_or_default());
    name.push(format!(
        ".{}.{}.partial",
        process::id(),
        SIBLING_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    destination.with_file_name(name)
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

async fn sync_file(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().write(true).open(path).await?;
    file.sync_all().await
}

/// Removes a leftover file; a missing file is not an error.
pub async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!("could not remove {}: {err}", format_path(path)),
    }
}
