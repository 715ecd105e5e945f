use std::{fmt, path::PathBuf, str::FromStr};

use crate::error::Error;

pub const S3_PREFIX: &str = "s3://";
pub const LOCAL_PREFIX: &str = "file://";

/// Selects an archive adapter. For S3 the host names the bucket and the URL
/// carries an optional key prefix; for local archives the URL names the root
/// directory holding one subdirectory per host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveUrl {
    S3(String),
    Local(PathBuf),
}

impl FromStr for ArchiveUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(prefix) = s.strip_prefix(S3_PREFIX) {
            Ok(ArchiveUrl::S3(prefix.trim_matches('/').to_owned()))
        } else if let Some(path_str) = s.strip_prefix(LOCAL_PREFIX) {
            if path_str.is_empty() {
                return Err(Error::InvalidArchiveUrl(s.to_owned()));
            }

            Ok(ArchiveUrl::Local(path_str.into()))
        } else {
            Err(Error::InvalidArchiveUrl(s.to_owned()))
        }
    }
}

impl fmt::Display for ArchiveUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveUrl::S3(prefix) => write!(f, "{S3_PREFIX}{prefix}"),
            ArchiveUrl::Local(path) => write!(f, "{LOCAL_PREFIX}{}", path.display()),
        }
    }
}
