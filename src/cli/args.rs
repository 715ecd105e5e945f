use std::{ops::RangeInclusive, path::PathBuf, time::Duration};

use clap::{ArgAction, Args, ValueEnum};
use concolor_clap::ColorChoice;
use humantime::parse_duration;

use crate::{archive::ArchiveUrl, install::CrossVolumePolicy};

use super::parse::{parse_range_inclusive, parse_versioned_path, VersionedPath};

const TASK_COUNT_RANGE: RangeInclusive<usize> = 1..=1024;
const RETRY_COUNT_RANGE: RangeInclusive<u32> = 0..=100;

fn parse_task_count(s: &str) -> Result<usize, String> {
    parse_range_inclusive(s, TASK_COUNT_RANGE)
}

fn parse_retry_count(s: &str) -> Result<u32, String> {
    parse_range_inclusive(s, RETRY_COUNT_RANGE)
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Archive host to restore from (the bucket, for S3 archives)
    #[arg(long, value_name = "HOST")]
    pub host: String,

    /// User the files were backed up as
    #[arg(short = 'u', long = "user", value_name = "NAME")]
    pub username: String,

    /// Machine the files were backed up from
    #[arg(short = 'm', long, value_name = "ID")]
    pub machine_id: i64,

    /// Files to restore, as PATH@VERSION
    #[arg(value_name = "PATH@VERSION", value_parser = parse_versioned_path)]
    pub files: Vec<VersionedPath>,

    /// JSON file listing more files to restore
    #[arg(short = 'M', long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Maximum number of files restored at once
    #[arg(short = 'j', long, value_name = "NUM", value_parser = parse_task_count)]
    pub tasks: Option<usize>,

    /// Extra attempts for files that fail with a transient error
    #[arg(long, value_name = "NUM", value_parser = parse_retry_count)]
    pub retries: Option<u32>,

    /// Pause before each retry
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub retry_delay: Option<Duration>,

    /// What to do when a temp file is on another volume than its destination
    #[arg(long, value_name = "POLICY", default_value_t = CrossVolumePolicy::CopyThenRename)]
    pub cross_volume: CrossVolumePolicy,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Archive backend (e.g. 's3://<prefix>' or 'file://<path>')
    #[arg(short, long, value_name = "URL")]
    pub archive: Option<ArchiveUrl>,

    /// Add latency when using a local archive
    #[arg(short = 'L', long, value_parser = parse_duration)]
    pub latency: Option<Duration>,

    /// Print stats after completion
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "basic")]
    pub stats: Option<StatsType>,

    #[command(flatten)]
    pub logger: LoggerArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatsType {
    Basic,
    Json,
}

#[derive(Args, Debug)]
pub struct LoggerArgs {
    /// When to use color in output
    #[arg(short, long, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Print more output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub verbose: u8,

    /// Print less output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub quiet: u8,
}
