use std::{path::PathBuf, time::Duration};

use async_channel::Receiver;
use clap::builder::styling::AnsiColor;
use log::{info, warn};
use serde::Serialize;

use crate::{
    archive::{create_archive, ArchiveStats, ArchiveUrl},
    config::{get_env_var, RestoreConfig, ENV_VAR_ARCHIVE, ENV_VAR_LATENCY},
    error::{Error, Result},
    format::{format_elapsed, format_path, format_size, format_time},
    outcome::{BatchOutcome, BatchStatus, RestoreOutcome},
    request::RestoreBatch,
    restore::RestoreClient,
    stats::RestoreStats,
};

use super::{
    args::{GlobalArgs, RestoreArgs, StatsType},
    manifest::{into_requests, load_manifest, ManifestEntry},
    print_stat, print_stats_json,
};

#[derive(Debug)]
enum Event {
    File(PathBuf, RestoreOutcome),
    Done(BatchOutcome),
}

#[derive(Debug, Serialize)]
struct FullStats {
    #[serde(flatten)]
    restore: RestoreStats,
    archive: ArchiveStats,
}

pub async fn main(cli: RestoreArgs) -> Result<BatchStatus> {
    let mut entries: Vec<ManifestEntry> =
        cli.files.into_iter().map(ManifestEntry::from).collect();
    if let Some(manifest) = &cli.manifest {
        entries.extend(load_manifest(manifest).await?);
    }

    let config = restore_config(
        RestoreConfig::from_env()?,
        cli.tasks,
        cli.retries,
        cli.retry_delay,
    )
    .with_cross_volume(cli.cross_volume);
    let archive_url = archive_url(&cli.global)?;
    let latency = match cli.global.latency {
        Some(latency) => Some(latency),
        None => get_env_var(ENV_VAR_LATENCY)?
            .as_deref()
            .map(humantime::parse_duration)
            .transpose()?,
    };

    let archive = create_archive(&archive_url, latency).await;
    let client = RestoreClient::init(config, archive)?;
    let batch = RestoreBatch::new(
        cli.host,
        into_requests(entries),
        cli.username,
        cli.machine_id,
        (),
    );

    let (sender, receiver) = async_channel::unbounded();
    let done_sender = sender.clone();
    client.restore_files(
        batch,
        move |path, outcome| {
            if sender.try_send(Event::File(path, outcome)).is_err() {
                warn!("result dropped, reporter is gone");
            }
        },
        move |(), outcome| {
            if done_sender.try_send(Event::Done(outcome)).is_err() {
                warn!("batch result dropped, reporter is gone");
            }
        },
    )?;

    let outcome = report(receiver).await?;
    client.shutdown().await;
    client.terminate()?;

    match cli.global.stats {
        Some(StatsType::Basic) => {
            let stats = client.stats();
            let archive_stats = client.archive_stats();
            print_stat("started", format_time(&stats.start_time));
            print_stat("files restored", stats.files_restored);
            print_stat("files failed", stats.files_failed);
            print_stat("bytes restored", format_size(stats.bytes_restored));
            print_stat("retries", stats.retries);
            print_stat("fetch requests", archive_stats.fetch_requests);
            print_stat("failed requests", archive_stats.failed_requests);
            print_stat("elapsed time", format_elapsed(stats.elapsed_time()));
        }
        Some(StatsType::Json) => {
            print_stats_json(&FullStats {
                restore: client.stats(),
                archive: client.archive_stats(),
            })?;
        }
        None => {}
    }

    Ok(outcome.status)
}

fn restore_config(
    mut config: RestoreConfig,
    tasks: Option<usize>,
    retries: Option<u32>,
    retry_delay: Option<Duration>,
) -> RestoreConfig {
    if let Some(tasks) = tasks {
        config = config.with_max_concurrency(tasks);
    }

    if let Some(retries) = retries {
        config = config.with_retries(retries);
    }

    if let Some(retry_delay) = retry_delay {
        config = config.with_retry_delay(retry_delay);
    }

    config
}

fn archive_url(args: &GlobalArgs) -> Result<ArchiveUrl> {
    if let Some(url) = &args.archive {
        return Ok(url.clone());
    }

    match get_env_var(ENV_VAR_ARCHIVE)? {
        Some(url) => url.parse(),
        None => Err(Error::Cli(format!(
            "either `--archive` or `{ENV_VAR_ARCHIVE}` must be set"
        ))),
    }
}

/// Logs results as they arrive until the batch reports completion.
async fn report(receiver: Receiver<Event>) -> Result<BatchOutcome> {
    while let Ok(event) = receiver.recv().await {
        match event {
            Event::File(path, RestoreOutcome::Success(version)) => {
                let style = AnsiColor::Green.on_default();
                info!(
                    "{style}restored{style:#} {} (version {version})",
                    format_path(&path)
                );
            }
            Event::File(path, RestoreOutcome::Failed(kind)) => {
                warn!("could not restore {}: {kind}", format_path(&path));
            }
            Event::Done(outcome) => {
                let style = match outcome.status {
                    BatchStatus::Success => AnsiColor::Green.on_default(),
                    BatchStatus::PartialFailure => AnsiColor::Yellow.on_default(),
                    BatchStatus::TotalFailure => AnsiColor::Red.on_default(),
                };
                info!(
                    "{style}{}{style:#}: {} restored, {} failed in {}",
                    outcome.status,
                    outcome.succeeded,
                    outcome.failed,
                    format_elapsed(outcome.elapsed)
                );
                return Ok(outcome);
            }
        }
    }

    Err(Error::Cli("restore ended without a result".to_owned()))
}
