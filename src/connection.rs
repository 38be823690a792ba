use crate::client::{
    ftp::FtpClient,
    sftp::{HostKeyPolicy, SftpClient},
    Protocol, RemoteClient,
};
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;

/// Everything needed to open and authenticate one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl ConnectParams {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Opens authenticated clients. The network implementation is swapped for
/// an in-memory one in tests.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, params: &ConnectParams) -> Result<Box<dyn RemoteClient>>;
}

pub struct NetworkConnector {
    host_keys: HostKeyPolicy,
}

impl NetworkConnector {
    pub const fn new(host_keys: HostKeyPolicy) -> Self {
        Self { host_keys }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(config.host_key_policy()?))
    }
}

#[async_trait]
impl Connector for NetworkConnector {
    async fn open(&self, params: &ConnectParams) -> Result<Box<dyn RemoteClient>> {
        tracing::debug!(protocol = %params.protocol, addr = %params.addr(), "opening connection");

        let client: Box<dyn RemoteClient> = match params.protocol {
            Protocol::Sftp => Box::new(SftpClient::connect(params, self.host_keys.clone()).await?),
            Protocol::Ftp => Box::new(FtpClient::connect(params).await?),
        };
        Ok(client)
    }
}
