use crate::config::Config;
use crate::connection::{Connector, NetworkConnector};
use crate::dispatch::Dispatcher;
use crate::ensure::ensure_path;
use crate::error::{MoverError, Result};
use crate::registry::SessionRegistry;
use crate::request::{
    directory_listing, parse, ConnectRequest, PathRequest, PutRequest, Reply, SessionRequest,
};
use serde_json::Value;
use std::sync::Arc;

const PROBE_CONTENTS: &[u8] = b"Hello Alto";

/// The public operation set. Every method takes raw JSON arguments and
/// returns a `Reply`; nothing here returns an error or panics on bad input.
pub struct Mover {
    connector: Box<dyn Connector>,
    dispatcher: Dispatcher,
    probe_file_name: String,
}

impl Mover {
    pub fn new(config: &Config, connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            dispatcher: Dispatcher::new(Arc::new(SessionRegistry::new()), config.lock_scope),
            probe_file_name: config.probe_file_name.clone(),
        }
    }

    /// A mover that talks to real servers.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let connector = NetworkConnector::from_config(config)?;
        Ok(Self::new(config, Box::new(connector)))
    }

    pub fn registry(&self) -> &SessionRegistry {
        self.dispatcher.registry()
    }

    /// Routes an operation by its wire name.
    pub async fn handle(&self, op: &str, args: &Value) -> Reply {
        match op {
            "testConnection" => self.test_connection(args).await,
            "connect" => self.connect(args).await,
            "disconnect" => self.disconnect(args).await,
            "put" => self.put(args).await,
            "rm" => self.rm(args).await,
            "rmdir" => self.rmdir(args).await,
            "ls" => self.ls(args).await,
            other => Reply::error(&MoverError::MalformedRequest(format!(
                "Unknown operation: {other}"
            ))),
        }
    }

    /// Connects, writes and deletes a probe file, and logs out again.
    pub async fn test_connection(&self, args: &Value) -> Reply {
        self.try_test_connection(args).await.into()
    }

    async fn try_test_connection(&self, args: &Value) -> Result<()> {
        let request: ConnectRequest = parse(args)?;
        let params = request.params();
        let mut client = self.connector.open(&params).await?;

        let mut probe = client
            .store(&self.probe_file_name, PROBE_CONTENTS.to_vec())
            .await;
        if probe.is_ok() {
            probe = client.delete_file(&self.probe_file_name).await;
        }
        // Logout runs whatever the probe did; only its own failure is ignored.
        if let Err(e) = client.disconnect().await {
            tracing::warn!(addr = %params.addr(), "error while closing test connection: {e}");
        }

        if let Err(e) = &probe {
            tracing::warn!(protocol = %params.protocol, addr = %params.addr(), "connection test failed: {e}");
        }
        probe?;
        tracing::info!(protocol = %params.protocol, addr = %params.addr(), "connection test passed");
        Ok(())
    }

    /// Opens a session and replies with its key.
    pub async fn connect(&self, args: &Value) -> Reply {
        match self.try_connect(args).await {
            Ok(key) => Reply::text(key),
            Err(e) => {
                tracing::warn!("connect failed: {e}");
                Reply::error(&e)
            }
        }
    }

    async fn try_connect(&self, args: &Value) -> Result<String> {
        let request: ConnectRequest = parse(args)?;
        let params = request.params();
        let client = self.connector.open(&params).await?;
        let key = self.registry().register(client);

        tracing::info!(protocol = %params.protocol, addr = %params.addr(), key = %key, "connected");
        Ok(key.to_string())
    }

    pub async fn disconnect(&self, args: &Value) -> Reply {
        let result = match parse::<SessionRequest>(args) {
            Ok(request) => self.dispatcher.retire(request.protocol, &request.key).await,
            Err(e) => Err(e),
        };
        result.into()
    }

    /// Uploads a payload, optionally creating the parent directories first.
    pub async fn put(&self, args: &Value) -> Reply {
        let request: PutRequest = match parse(args) {
            Ok(request) => request,
            Err(e) => return Reply::error(&e),
        };

        let PutRequest {
            key,
            protocol,
            name,
            data_container,
            ensure_path: ensure,
        } = request;
        let payload = data_container.payload();
        tracing::debug!(protocol = %protocol, name = %name, kind = %data_container.kind, "putting file");

        let target = name.clone();
        let outcome = self
            .dispatcher
            .run(protocol, &key, "put", move |client| {
                Box::pin(async move {
                    if ensure {
                        ensure_path(client, &target, true).await?;
                    }
                    let bytes = payload.read().await?;
                    client.store(&target, bytes).await?;
                    client.finish_upload(&target).await
                })
            })
            .await
            .and_then(|result| result);

        if let Err(e) = &outcome {
            tracing::error!(protocol = %protocol, name = %name, "put failed: {e}");
        }
        outcome.into()
    }

    /// Deletes a file. A failed delete is reported as success with a note.
    pub async fn rm(&self, args: &Value) -> Reply {
        self.remove(args, "rm", false).await
    }

    /// Deletes a directory. A failed delete is reported as success with a note.
    pub async fn rmdir(&self, args: &Value) -> Reply {
        self.remove(args, "rmdir", true).await
    }

    async fn remove(&self, args: &Value, op: &'static str, directory: bool) -> Reply {
        let PathRequest {
            key,
            protocol,
            name,
        } = match parse(args) {
            Ok(request) => request,
            Err(e) => return Reply::error(&e),
        };

        let target = name.clone();
        let outcome = self
            .dispatcher
            .run(protocol, &key, op, move |client| {
                Box::pin(async move {
                    if directory {
                        client.remove_directory(&target).await
                    } else {
                        client.delete_file(&target).await
                    }
                })
            })
            .await;

        match outcome {
            Ok(Ok(())) => Reply::ok(),
            // Deletes are idempotent for callers: any failure reads as "already gone".
            Ok(Err(e)) => {
                tracing::warn!(protocol = %protocol, name = %name, op, "delete failed: {e}");
                Reply::text(format!("File not found: {name}"))
            }
            Err(e) => Reply::error(&e),
        }
    }

    /// Lists the subdirectories of a path. Listing failures come back through
    /// the success channel with the error text as payload.
    pub async fn ls(&self, args: &Value) -> Reply {
        let PathRequest {
            key,
            protocol,
            name,
        } = match parse(args) {
            Ok(request) => request,
            Err(e) => return Reply::error(&e),
        };

        let target = name.clone();
        let outcome = self
            .dispatcher
            .run(protocol, &key, "ls", move |client| {
                Box::pin(async move { client.list_entries(&target).await })
            })
            .await;

        match outcome {
            Ok(Ok(entries)) => Reply::entries(directory_listing(&name, entries)),
            Ok(Err(e)) => {
                tracing::warn!(protocol = %protocol, name = %name, "listing failed: {e}");
                Reply::text(e.to_string())
            }
            Err(e) => Reply::error(&e),
        }
    }

    /// Closes every open session.
    pub async fn shutdown(&self) {
        for session in self.registry().drain() {
            let mut client = session.handle.lock().await;
            if let Err(e) = client.disconnect().await {
                tracing::warn!(protocol = %session.protocol, key = %session.key, "error while closing session: {e}");
            }
        }
    }
}
