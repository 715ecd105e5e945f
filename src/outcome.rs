use std::{fmt, time::Duration};

/// Version reported to per-file callbacks when nothing was restored.
pub const VERSION_SENTINEL: i64 = -1;

pub const STATUS_OK: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NetworkError,
    AuthError,
    VersionNotFound,
    RemoteIoError,
    InstallError,
    CrossVolumeError,
    BusyError,
    Terminated,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::InvalidArgument => 1,
            ErrorKind::NetworkError => 2,
            ErrorKind::AuthError => 3,
            ErrorKind::VersionNotFound => 4,
            ErrorKind::RemoteIoError => 5,
            ErrorKind::InstallError => 6,
            ErrorKind::CrossVolumeError => 7,
            ErrorKind::BusyError => 8,
            ErrorKind::Terminated => 9,
            ErrorKind::Internal => 10,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        let kind = match code {
            1 => ErrorKind::InvalidArgument,
            2 => ErrorKind::NetworkError,
            3 => ErrorKind::AuthError,
            4 => ErrorKind::VersionNotFound,
            5 => ErrorKind::RemoteIoError,
            6 => ErrorKind::InstallError,
            7 => ErrorKind::CrossVolumeError,
            8 => ErrorKind::BusyError,
            9 => ErrorKind::Terminated,
            10 => ErrorKind::Internal,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_fetch_stage(self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkError
                | ErrorKind::AuthError
                | ErrorKind::VersionNotFound
                | ErrorKind::RemoteIoError
        )
    }

    pub fn is_install_stage(self) -> bool {
        matches!(self, ErrorKind::InstallError | ErrorKind::CrossVolumeError)
    }

    /// Whether a fresh attempt could plausibly succeed where this one failed.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::NetworkError | ErrorKind::RemoteIoError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NetworkError => "network error",
            ErrorKind::AuthError => "authentication error",
            ErrorKind::VersionNotFound => "version not found",
            ErrorKind::RemoteIoError => "remote I/O error",
            ErrorKind::InstallError => "install error",
            ErrorKind::CrossVolumeError => "cross-volume error",
            ErrorKind::BusyError => "busy",
            ErrorKind::Terminated => "terminated",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// Terminal result for one restore request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Success(i64),
    Failed(ErrorKind),
}

impl RestoreOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RestoreOutcome::Success(_))
    }

    pub fn status_code(&self) -> i32 {
        match self {
            RestoreOutcome::Success(_) => STATUS_OK,
            RestoreOutcome::Failed(kind) => kind.code(),
        }
    }

    pub fn version_or_sentinel(&self) -> i64 {
        match self {
            RestoreOutcome::Success(version) => *version,
            RestoreOutcome::Failed(_) => VERSION_SENTINEL,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            RestoreOutcome::Success(_) => None,
            RestoreOutcome::Failed(kind) => Some(*kind),
        }
    }
}

impl fmt::Display for RestoreOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreOutcome::Success(version) => write!(f, "restored version {version}"),
            RestoreOutcome::Failed(kind) => write!(f, "failed ({kind})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Success,
    PartialFailure,
    TotalFailure,
}

impl BatchStatus {
    pub fn code(self) -> i32 {
        match self {
            BatchStatus::Success => STATUS_OK,
            BatchStatus::PartialFailure => 1,
            BatchStatus::TotalFailure => 2,
        }
    }

    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => BatchStatus::Success,
            (0, _) => BatchStatus::TotalFailure,
            _ => BatchStatus::PartialFailure,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchStatus::Success => "success",
            BatchStatus::PartialFailure => "partial failure",
            BatchStatus::TotalFailure => "total failure",
        };
        f.write_str(name)
    }
}

/// Aggregate result handed to the batch callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub status: BatchStatus,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn new(succeeded: usize, failed: usize, elapsed: Duration) -> Self {
        BatchOutcome {
            status: BatchStatus::from_counts(succeeded, failed),
            succeeded,
            failed,
            elapsed,
        }
    }

    pub fn status_code(&self) -> i32 {
        self.status.code()
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}
