use std::{
    env::{self, VarError},
    ffi::OsStr,
    num::NonZeroUsize,
    thread::available_parallelism,
    time::Duration,
};

use humantime::parse_duration;

use crate::{
    error::{Error, Result},
    install::CrossVolumePolicy,
};

pub const ENV_VAR_ARCHIVE: &str = "NEPTUNE_ARCHIVE";
pub const ENV_VAR_LATENCY: &str = "NEPTUNE_LATENCY";
pub const ENV_VAR_JOBS: &str = "NEPTUNE_JOBS";
pub const ENV_VAR_RETRIES: &str = "NEPTUNE_RETRIES";
pub const ENV_VAR_RETRY_DELAY: &str = "NEPTUNE_RETRY_DELAY";

pub const DEFAULT_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Knobs for a `RestoreClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreConfig {
    /// Upper bound on files fetched/installed at once. `None` means the
    /// machine's available parallelism.
    pub max_concurrency: Option<NonZeroUsize>,

    /// Extra attempts for a file whose fetch failed with a transient error.
    pub retries: u32,

    pub retry_delay: Duration,

    pub cross_volume: CrossVolumePolicy,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        RestoreConfig {
            max_concurrency: None,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            cross_volume: CrossVolumePolicy::default(),
        }
    }
}

impl RestoreConfig {
    pub fn new() -> Self {
        RestoreConfig::default()
    }

    /// Defaults overridden by any `NEPTUNE_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        let mut config = RestoreConfig::default();

        if let Some(jobs) = get_env_var(ENV_VAR_JOBS)? {
            let jobs = parse_env_number::<usize>(ENV_VAR_JOBS, &jobs)?;
            config.max_concurrency = NonZeroUsize::new(jobs);
        }

        if let Some(retries) = get_env_var(ENV_VAR_RETRIES)? {
            config.retries = parse_env_number(ENV_VAR_RETRIES, &retries)?;
        }

        if let Some(delay) = get_env_var(ENV_VAR_RETRY_DELAY)? {
            config.retry_delay = parse_duration(&delay)?;
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = NonZeroUsize::new(max_concurrency);
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn with_cross_volume(mut self, cross_volume: CrossVolumePolicy) -> Self {
        self.cross_volume = cross_volume;
        self
    }

    /// Worker count for a batch of `batch_len` files.
    pub fn concurrency_for(&self, batch_len: usize) -> usize {
        let limit = self.max_concurrency.unwrap_or_else(default_parallelism);
        limit.get().min(batch_len).max(1)
    }
}

fn default_parallelism() -> NonZeroUsize {
    available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

pub fn get_env_var<T: AsRef<OsStr>>(name: T) -> Result<Option<String>> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_env_number<N: std::str::FromStr>(name: &str, value: &str) -> Result<N> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("`{name}` must be a number, got `{value}`")))
}
