use super::{Protocol, RemoteClient, RemoteEntry};
use crate::connection::ConnectParams;
use crate::error::{MoverError, Result};
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::keys::known_hosts::check_known_hosts_path;
use russh::keys::ssh_key;
use russh::Disconnect;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::StatusCode;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// How the server's host key is checked during the SSH handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept only keys already recorded in the given known_hosts file.
    Verify { known_hosts: PathBuf },
    /// Accept any key. Opt-in only; exposes the session to interception.
    AcceptAny,
}

struct SshHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match &self.policy {
            HostKeyPolicy::AcceptAny => Ok(true),
            HostKeyPolicy::Verify { known_hosts } => {
                let known =
                    check_known_hosts_path(&self.host, self.port, server_public_key, known_hosts)?;
                if !known {
                    tracing::error!(
                        host = %self.host,
                        port = self.port,
                        known_hosts = %known_hosts.display(),
                        "SSH host key is not in known_hosts"
                    );
                }
                Ok(known)
            }
        }
    }
}

pub struct SftpClient {
    addr: String,
    sftp: SftpSession,
    session: Handle<SshHandler>,
}

impl SftpClient {
    pub async fn connect(params: &ConnectParams, policy: HostKeyPolicy) -> Result<Self> {
        let addr = params.addr();
        if policy == HostKeyPolicy::AcceptAny {
            tracing::warn!(addr = %addr, "SSH host key verification is disabled");
        }

        let config = Arc::new(client::Config::default());
        let handler = SshHandler {
            host: params.host.clone(),
            port: params.port,
            policy,
        };

        let mut session = client::connect(config, (params.host.as_str(), params.port), handler)
            .await
            .map_err(|e| MoverError::ConnectionFailed(format!("SSH connect to {addr}: {e}")))?;

        let auth = session
            .authenticate_password(params.user.as_str(), params.password.as_str())
            .await
            .map_err(|e| MoverError::ConnectionFailed(format!("SSH authenticate {addr}: {e}")))?;
        if !auth.success() {
            return Err(MoverError::AuthenticationFailed(
                "Bad username or password".to_string(),
            ));
        }

        let channel = session
            .channel_open_session()
            .await
            .map_err(|e| MoverError::ConnectionFailed(format!("SSH open channel {addr}: {e}")))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| MoverError::ConnectionFailed(format!("SFTP subsystem {addr}: {e}")))?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| MoverError::ConnectionFailed(format!("SFTP init {addr}: {e}")))?;

        tracing::info!(addr = %addr, user = %params.user, "SFTP session established");
        Ok(Self {
            addr,
            sftp,
            session,
        })
    }
}

fn sftp_error(path: &str, e: SftpError) -> MoverError {
    match e {
        SftpError::Status(status) if matches!(status.status_code, StatusCode::NoSuchFile) => {
            MoverError::RemoteNotFound(path.to_string())
        }
        other => MoverError::RemoteOperationFailed(format!("{path}: {other}")),
    }
}

#[async_trait]
impl RemoteClient for SftpClient {
    fn protocol(&self) -> Protocol {
        Protocol::Sftp
    }

    async fn store(&mut self, path: &str, data: Vec<u8>) -> Result<()> {
        let mut file = self
            .sftp
            .create(path)
            .await
            .map_err(|e| sftp_error(path, e))?;

        let write = async {
            file.write_all(&data).await?;
            file.flush().await?;
            file.shutdown().await
        };
        write
            .await
            .map_err(|e| MoverError::RemoteOperationFailed(format!("{path}: {e}")))
    }

    async fn list_entries(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let dir = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| sftp_error(path, e))?;

        Ok(dir
            .map(|entry| RemoteEntry {
                name: entry.file_name(),
                is_dir: entry.file_type().is_dir(),
            })
            .collect())
    }

    async fn stat(&mut self, path: &str) -> Result<()> {
        self.sftp
            .metadata(path)
            .await
            .map(|_| ())
            .map_err(|e| sftp_error(path, e))
    }

    async fn make_directory(&mut self, path: &str) -> Result<()> {
        self.sftp
            .create_dir(path)
            .await
            .map_err(|e| sftp_error(path, e))
    }

    async fn delete_file(&mut self, path: &str) -> Result<()> {
        self.sftp
            .remove_file(path)
            .await
            .map_err(|e| sftp_error(path, e))
    }

    async fn remove_directory(&mut self, path: &str) -> Result<()> {
        self.sftp
            .remove_dir(path)
            .await
            .map_err(|e| sftp_error(path, e))
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Err(e) = self.sftp.close().await {
            tracing::debug!(addr = %self.addr, "SFTP close: {e}");
        }
        self.session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| MoverError::ConnectionFailed(format!("SSH disconnect {}: {e}", self.addr)))?;

        tracing::info!(addr = %self.addr, "SFTP session closed");
        Ok(())
    }
}
