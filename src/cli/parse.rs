use std::{fmt::Display, ops::RangeInclusive, path::PathBuf, str::FromStr};

use crate::error::Error;

pub fn parse_range_inclusive<N: PartialEq + PartialOrd + FromStr + Display>(
    s: &str,
    range: RangeInclusive<N>,
) -> Result<N, String> {
    let value: N = s.parse().map_err(|_| "invalid numeric value")?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "{} is not in range {}-{}",
            value,
            range.start(),
            range.end(),
        ))
    }
}

/// A file named on the command line as `PATH@VERSION`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedPath {
    pub path: PathBuf,
    pub version: i64,
}

impl FromStr for VersionedPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidVersionedPath(s.to_owned());

        // Paths may contain '@' themselves, versions never do.
        let (path, version) = s.rsplit_once('@').ok_or_else(invalid)?;
        if path.is_empty() {
            return Err(invalid());
        }

        let version = version.parse().map_err(|_| invalid())?;
        Ok(VersionedPath {
            path: PathBuf::from(path),
            version,
        })
    }
}

pub fn parse_versioned_path(s: &str) -> Result<VersionedPath, String> {
    s.parse().map_err(|err: Error| err.to_string())
}
