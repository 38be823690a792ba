use crate::client::{Protocol, RemoteClient};
use crate::error::{MoverError, Result};
use crate::registry::{SessionKey, SessionRegistry};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// How widely dispatched operations are serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LockScope {
    /// One operation at a time per session; sessions run concurrently.
    #[default]
    Session,
    /// One operation at a time per protocol family, across all its sessions.
    Family,
}

/// Routes operations to registered sessions under the configured lock scope.
///
/// Lock order is always family gate, then session lock. The session lock is
/// taken in both scopes, so one session never runs two operations at once.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    scope: LockScope,
    sftp_gate: Mutex<()>,
    ftp_gate: Mutex<()>,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>, scope: LockScope) -> Self {
        Self {
            registry,
            scope,
            sftp_gate: Mutex::new(()),
            ftp_gate: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub const fn scope(&self) -> LockScope {
        self.scope
    }

    async fn family_gate(&self, protocol: Protocol) -> Option<MutexGuard<'_, ()>> {
        if self.scope != LockScope::Family {
            return None;
        }
        let gate = match protocol {
            Protocol::Sftp => &self.sftp_gate,
            Protocol::Ftp => &self.ftp_gate,
        };
        Some(gate.lock().await)
    }

    /// Runs `op` against the session's client while holding its locks.
    ///
    /// The outer `Result` is the dispatch outcome (`InvalidSession`); the
    /// operation's own result is returned untouched in `T`, so each operation
    /// decides how its failures are reported.
    pub async fn run<T, F>(&self, protocol: Protocol, key: &SessionKey, name: &str, op: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut (dyn RemoteClient + 'static)) -> BoxFuture<'c, T>,
    {
        let session = self.registry.resolve(protocol, key)?;
        let _gate = self.family_gate(protocol).await;
        let mut client = session.handle.lock().await;

        // A disconnect may have won the race between resolve and lock.
        if !self.registry.is_current(&session) {
            return Err(MoverError::InvalidSession(key.to_string()));
        }

        tracing::debug!(protocol = %protocol, key = %key, op = name, "dispatching");
        let output = op(&mut **client).await;
        tracing::debug!(protocol = %protocol, key = %key, op = name, "done");
        Ok(output)
    }

    /// Unregisters the session, waits for any in-flight operation on it, then
    /// logs it out. Teardown failures are logged and swallowed.
    pub async fn retire(&self, protocol: Protocol, key: &SessionKey) -> Result<()> {
        let _gate = self.family_gate(protocol).await;
        let session = self.registry.remove(protocol, key)?;

        let mut client = session.handle.lock().await;
        if let Err(e) = client.disconnect().await {
            tracing::warn!(protocol = %protocol, key = %key, "error while closing session: {e}");
        }
        tracing::info!(protocol = %protocol, key = %key, "session closed");
        Ok(())
    }
}
