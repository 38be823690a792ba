use crate::client::{Protocol, RemoteEntry};
use crate::connection::ConnectParams;
use crate::error::{ErrorKind, MoverError, Result};
use crate::registry::SessionKey;
use crate::utils::{child_path, strip_file_scheme};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Decodes operation arguments, reporting any mismatch as `MalformedRequest`.
pub fn parse<T: DeserializeOwned>(args: &Value) -> Result<T> {
    T::deserialize(args).map_err(|e| MoverError::MalformedRequest(e.to_string()))
}

/// Arguments of `testConnection` and `connect`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectRequest {
    pub user: String,
    pub password: String,
    pub host: String,
    pub protocol: Protocol,
    #[serde(default)]
    pub port: Option<u16>,
}

impl ConnectRequest {
    pub fn params(&self) -> ConnectParams {
        ConnectParams {
            protocol: self.protocol,
            host: self.host.clone(),
            port: self.port.unwrap_or_else(|| self.protocol.default_port()),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

/// Arguments of `disconnect`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRequest {
    pub key: SessionKey,
    pub protocol: Protocol,
}

/// Arguments of `ls`, `rm` and `rmdir`.
#[derive(Debug, Clone, Deserialize)]
pub struct PathRequest {
    pub key: SessionKey,
    pub protocol: Protocol,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRequest {
    pub key: SessionKey,
    pub protocol: Protocol,
    pub name: String,
    pub data_container: DataContainer,
    pub ensure_path: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataContainer {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: String,
}

impl DataContainer {
    pub fn payload(&self) -> DataPayload {
        if self.kind == "url" {
            DataPayload::LocalFile(PathBuf::from(strip_file_scheme(&self.data)))
        } else {
            DataPayload::Inline(self.data.as_bytes().to_vec())
        }
    }
}

/// What an upload sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataPayload {
    Inline(Vec<u8>),
    LocalFile(PathBuf),
}

impl DataPayload {
    /// Loads the whole payload into memory.
    pub async fn read(self) -> Result<Vec<u8>> {
        match self {
            Self::Inline(bytes) => Ok(bytes),
            Self::LocalFile(path) => tokio::fs::read(&path)
                .await
                .map_err(|source| MoverError::LocalFile { path, source }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
}

/// Directory listing as callers see it: subdirectories only, sorted, with a
/// synthetic `..` first and any backend `.`/`..` dropped.
pub fn directory_listing(parent: &str, entries: Vec<RemoteEntry>) -> Vec<DirectoryEntry> {
    let mut names: Vec<String> = entries
        .into_iter()
        .filter(|e| e.is_dir && e.name != "." && e.name != "..")
        .map(|e| e.name)
        .collect();
    names.sort();

    std::iter::once("..".to_string())
        .chain(names)
        .map(|name| DirectoryEntry {
            path: child_path(parent, &name),
            name,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Entries(Vec<DirectoryEntry>),
}

/// Uniform result of every public operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Payload>,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Reply {
    pub const fn ok() -> Self {
        Self::Success { payload: None }
    }

    pub fn text(message: impl Into<String>) -> Self {
        Self::Success {
            payload: Some(Payload::Text(message.into())),
        }
    }

    pub fn entries(entries: Vec<DirectoryEntry>) -> Self {
        Self::Success {
            payload: Some(Payload::Entries(entries)),
        }
    }

    pub fn error(err: &MoverError) -> Self {
        Self::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success {
                payload: Some(Payload::Text(text)),
            } => Some(text),
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { kind, .. } => Some(*kind),
            Self::Success { .. } => None,
        }
    }
}

impl From<Result<()>> for Reply {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::error(&e),
        }
    }
}
