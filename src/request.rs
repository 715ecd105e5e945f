use std::path::PathBuf;

use crate::error::{Error, Result};

/// One file to restore: where it goes, which version, and where to stage it.
#[derive(Debug, Clone)]
pub struct RestoreRequest<C> {
    pub path: PathBuf,
    pub version: i64,
    pub temp_path: PathBuf,
    pub context: C,
}

impl<C> RestoreRequest<C> {
    pub fn new<P: Into<PathBuf>, T: Into<PathBuf>>(
        path: P,
        version: i64,
        temp_path: T,
        context: C,
    ) -> Self {
        RestoreRequest {
            path: path.into(),
            version,
            temp_path: temp_path.into(),
            context,
        }
    }
}

/// Everything submitted by one `restore_files` call.
#[derive(Debug, Clone)]
pub struct RestoreBatch<C, B> {
    pub host: String,
    pub files: Vec<RestoreRequest<C>>,
    pub username: String,
    pub machine_id: i64,
    pub context: B,
}

impl<C, B> RestoreBatch<C, B> {
    pub fn new<H: Into<String>, U: Into<String>>(
        host: H,
        files: Vec<RestoreRequest<C>>,
        username: U,
        machine_id: i64,
        context: B,
    ) -> Self {
        RestoreBatch {
            host: host.into(),
            files,
            username: username.into(),
            machine_id,
            context,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::invalid_argument("host is empty"));
        }

        if self.username.is_empty() {
            return Err(Error::invalid_argument("username is empty"));
        }

        if self.files.is_empty() {
            return Err(Error::invalid_argument("batch contains no files"));
        }

        for (index, request) in self.files.iter().enumerate() {
            if request.path.as_os_str().is_empty() {
                return Err(Error::InvalidArgument(format!("file {index} has an empty path")));
            }

            if request.temp_path.as_os_str().is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "file {index} has an empty temp path"
                )));
            }
        }

        Ok(())
    }
}
