use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure a public operation can report.
///
/// Drivers convert their native errors into one of these at their boundary,
/// so nothing above `client` sees a `suppaftp` or `russh` type.
#[derive(Debug, Error)]
pub enum MoverError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    #[error("{0}")]
    AuthenticationFailed(String),
    #[error("{0}")]
    ConnectionFailed(String),
    #[error("Invalid session key: {0}")]
    InvalidSession(String),
    #[error("Could not write file {0}")]
    TransferIncomplete(String),
    #[error("No such file or directory: {0}")]
    RemoteNotFound(String),
    #[error("{0}")]
    RemoteOperationFailed(String),
    #[error("Could not read {}: {source}", path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Serializable discriminant carried in error replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    MalformedRequest,
    AuthenticationFailed,
    ConnectionFailed,
    InvalidSession,
    TransferIncomplete,
    RemoteNotFound,
    RemoteOperationFailed,
}

impl MoverError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedRequest(_) => ErrorKind::MalformedRequest,
            Self::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            Self::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
            Self::InvalidSession(_) => ErrorKind::InvalidSession,
            Self::TransferIncomplete(_) => ErrorKind::TransferIncomplete,
            Self::RemoteNotFound(_) => ErrorKind::RemoteNotFound,
            // A payload that cannot be read fails the upload like any other put step.
            Self::RemoteOperationFailed(_) | Self::LocalFile { .. } => {
                ErrorKind::RemoteOperationFailed
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MoverError>;
