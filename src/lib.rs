#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod install;
pub mod outcome;
pub mod request;
pub mod restore;
pub mod stats;

mod format;
mod logger;
mod pool;
mod sync;

pub use self::{
    archive::{ArchiveClient, ArchiveUrl, LocalArchive, S3Archive, SharedArchive},
    config::RestoreConfig,
    error::{Error, Result},
    install::CrossVolumePolicy,
    outcome::{BatchOutcome, BatchStatus, ErrorKind, RestoreOutcome, VERSION_SENTINEL},
    request::{RestoreBatch, RestoreRequest},
    restore::{BatchId, RestoreClient},
};
