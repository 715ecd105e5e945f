mod from;

use std::fmt::Display;

use thiserror::Error;

use crate::outcome::ErrorKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} batch(es) still in flight")]
    Busy(usize),

    #[error("client has been terminated")]
    Terminated,

    #[error("no tokio runtime is running")]
    NoRuntime,

    #[error("archive URL `{0}` is invalid")]
    InvalidArchiveUrl(String),

    #[error("`{0}` is not a versioned path, expected `PATH@VERSION`")]
    InvalidVersionedPath(String),

    #[error("{0}")]
    Cli(String),

    #[error(transparent)]
    Other(AnyError),
}

#[derive(Error, Debug)]
pub struct AnyError(anyhow::Error);

impl Display for AnyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for AnyError {
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

impl Error {
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Other(AnyError(error.into()))
    }

    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidArchiveUrl(_)
            | Error::InvalidVersionedPath(_)
            | Error::Cli(_) => ErrorKind::InvalidArgument,
            Error::Busy(_) => ErrorKind::BusyError,
            Error::Terminated => ErrorKind::Terminated,
            Error::NoRuntime | Error::Other(_) => ErrorKind::Internal,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Other(AnyError(error))
    }
}
