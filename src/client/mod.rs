pub mod ftp;
#[cfg(test)]
pub(crate) mod mock;
pub mod sftp;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Protocol {
    #[serde(rename = "SFTP", alias = "sftp")]
    Sftp,
    #[serde(rename = "FTP", alias = "ftp")]
    Ftp,
}

impl Protocol {
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Sftp => 22,
            Self::Ftp => 21,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sftp => f.write_str("SFTP"),
            Self::Ftp => f.write_str("FTP"),
        }
    }
}

/// One item of a raw backend listing, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
}

/// A live, authenticated connection to one remote server.
///
/// `ensure_directory` and `finish_upload` carry the protocol quirks: the
/// defaults fit SFTP, and the FTP driver overrides both.
#[async_trait]
pub trait RemoteClient: Send {
    fn protocol(&self) -> Protocol;

    /// Streams `data` into `path`, returning only once the server has
    /// accepted the whole transfer.
    async fn store(&mut self, path: &str, data: Vec<u8>) -> Result<()>;
    async fn list_entries(&mut self, path: &str) -> Result<Vec<RemoteEntry>>;
    async fn stat(&mut self, path: &str) -> Result<()>;
    async fn make_directory(&mut self, path: &str) -> Result<()>;
    async fn delete_file(&mut self, path: &str) -> Result<()>;
    async fn remove_directory(&mut self, path: &str) -> Result<()>;
    async fn disconnect(&mut self) -> Result<()>;

    /// Creates `path` unless it already exists. Existing and freshly created
    /// directories are both success.
    async fn ensure_directory(&mut self, path: &str) -> Result<()> {
        if self.stat(path).await.is_err() {
            self.make_directory(path).await?;
        }
        Ok(())
    }

    /// Post-upload fixups for a stored file.
    async fn finish_upload(&mut self, _path: &str) -> Result<()> {
        Ok(())
    }
}
