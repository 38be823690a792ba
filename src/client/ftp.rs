use super::{Protocol, RemoteClient, RemoteEntry};
use crate::connection::ConnectParams;
use crate::error::{MoverError, Result};
use async_trait::async_trait;
use std::io::Write;
use suppaftp::list::File as ListFile;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};

const UPLOADED_FILE_MODE: &str = "744";
const CREATED_DIR_MODE: &str = "755";

pub struct FtpClient {
    addr: String,
    // Taken while a blocking call runs; `None` afterwards means the
    // connection was lost mid-operation.
    stream: Option<FtpStream>,
}

impl FtpClient {
    pub async fn connect(params: &ConnectParams) -> Result<Self> {
        let host = params.host.clone();
        let port = params.port;
        let username = params.user.clone();
        let password = params.password.clone();

        let stream = tokio::task::spawn_blocking(move || {
            Self::connect_ftp(&host, port, &username, &password)
        })
        .await
        .map_err(join_error)??;

        tracing::info!(addr = %params.addr(), user = %params.user, "FTP session established");
        Ok(Self {
            addr: params.addr(),
            stream: Some(stream),
        })
    }

    fn connect_ftp(host: &str, port: u16, username: &str, password: &str) -> Result<FtpStream> {
        let mut ftp = FtpStream::connect((host, port)).map_err(|e| match e {
            FtpError::UnexpectedResponse(response) => MoverError::ConnectionFailed(format!(
                "Operation failed. Server reply code: {}",
                response.status.code()
            )),
            other => MoverError::ConnectionFailed(format!("FTP connect to {host}:{port}: {other}")),
        })?;

        ftp.login(username, password).map_err(|e| match e {
            FtpError::UnexpectedResponse(_) => {
                MoverError::AuthenticationFailed("Bad username or password".to_string())
            }
            other => MoverError::ConnectionFailed(other.to_string()),
        })?;

        ftp.transfer_type(FileType::Binary).map_err(ftp_error)?;
        ftp.set_mode(Mode::Passive);
        Ok(ftp)
    }

    /// Runs `op` against the control connection on the blocking pool.
    async fn with_stream<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut FtpStream) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut ftp = self.stream.take().ok_or_else(|| {
            MoverError::ConnectionFailed(format!("FTP connection to {} is closed", self.addr))
        })?;

        let (ftp, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut ftp);
            (ftp, result)
        })
        .await
        .map_err(join_error)?;

        self.stream = Some(ftp);
        result
    }

    /// Parses one LIST line in POSIX or DOS format. Totals and anything
    /// else unparseable yield `None`.
    fn parse_list_line(line: &str) -> Option<RemoteEntry> {
        match line.parse::<ListFile>() {
            Ok(file) => Some(RemoteEntry {
                name: file.name().to_string(),
                is_dir: file.is_directory(),
            }),
            Err(e) => {
                tracing::trace!(line, "skipping LIST line: {e}");
                None
            }
        }
    }
}

fn ftp_error(e: FtpError) -> MoverError {
    match e {
        FtpError::ConnectionError(io) => MoverError::ConnectionFailed(io.to_string()),
        other => MoverError::RemoteOperationFailed(other.to_string()),
    }
}

fn join_error(e: tokio::task::JoinError) -> MoverError {
    MoverError::ConnectionFailed(format!("FTP worker failed: {e}"))
}

/// Negative replies are expected for some commands (mkdir on an existing
/// directory, SITE on servers without CHMOD); only transport failures count.
fn tolerate_reply<T>(command: &str, result: suppaftp::FtpResult<T>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(FtpError::UnexpectedResponse(response)) => {
            tracing::debug!(command, code = response.status.code(), "FTP command refused");
            Ok(())
        }
        Err(e) => Err(ftp_error(e)),
    }
}

fn missing_or(path: &str, e: FtpError) -> MoverError {
    match e {
        FtpError::UnexpectedResponse(_) => MoverError::RemoteNotFound(path.to_string()),
        other => ftp_error(other),
    }
}

#[async_trait]
impl RemoteClient for FtpClient {
    fn protocol(&self) -> Protocol {
        Protocol::Ftp
    }

    async fn store(&mut self, path: &str, data: Vec<u8>) -> Result<()> {
        let path = path.to_string();

        self.with_stream(move |ftp| {
            let mut stream = ftp.put_with_stream(&path).map_err(ftp_error)?;
            let written = stream.write_all(&data).and_then(|()| stream.flush());

            // The completion reply is read even after a failed write, otherwise
            // it would be taken as the reply to the next command.
            let completed = ftp.finalize_put_stream(stream);

            if let Err(e) = written {
                if let Err(reply) = completed {
                    tracing::debug!(path = %path, "FTP transfer aborted: {reply}");
                }
                return Err(MoverError::RemoteOperationFailed(format!("{path}: {e}")));
            }

            // The transfer only counts once the server confirms it.
            completed.map_err(|e| {
                tracing::warn!(path = %path, "FTP transfer not confirmed: {e}");
                MoverError::TransferIncomplete(path.clone())
            })
        })
        .await
    }

    async fn list_entries(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let path = path.to_string();

        let lines = self
            .with_stream(move |ftp| ftp.list(Some(path.as_str())).map_err(|e| missing_or(&path, e)))
            .await?;

        Ok(lines
            .iter()
            .filter_map(|line| Self::parse_list_line(line))
            .collect())
    }

    async fn stat(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.with_stream(move |ftp| {
            ftp.nlst(Some(path.as_str()))
                .map(|_| ())
                .map_err(|e| missing_or(&path, e))
        })
        .await
    }

    async fn make_directory(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.with_stream(move |ftp| ftp.mkdir(&path).map_err(ftp_error))
            .await
    }

    async fn delete_file(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.with_stream(move |ftp| ftp.rm(&path).map_err(|e| missing_or(&path, e)))
            .await
    }

    async fn remove_directory(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.with_stream(move |ftp| ftp.rmdir(&path).map_err(|e| missing_or(&path, e)))
            .await
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(mut ftp) = self.stream.take() else {
            return Ok(());
        };

        tokio::task::spawn_blocking(move || ftp.quit().map_err(ftp_error))
            .await
            .map_err(join_error)??;

        tracing::info!(addr = %self.addr, "FTP session closed");
        Ok(())
    }

    /// FTP has no cheap existence check, so creation is always attempted and a refusal
    /// (usually "already exists") is ignored.
    async fn ensure_directory(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.with_stream(move |ftp| {
            tolerate_reply("MKD", ftp.mkdir(&path))?;
            tolerate_reply(
                "SITE CHMOD",
                ftp.site(format!("CHMOD {CREATED_DIR_MODE} {path}")),
            )
        })
        .await
    }

    async fn finish_upload(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.with_stream(move |ftp| {
            tolerate_reply(
                "SITE CHMOD",
                ftp.site(format!("CHMOD {UPLOADED_FILE_MODE} {path}")),
            )
        })
        .await
    }
}
