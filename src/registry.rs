use crate::client::{Protocol, RemoteClient};
use crate::error::{MoverError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// A connected client behind its per-session execution lock.
pub type SharedClient = Arc<tokio::sync::Mutex<Box<dyn RemoteClient>>>;

/// Opaque token handed out by `connect`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone)]
pub struct Session {
    pub key: SessionKey,
    pub protocol: Protocol,
    pub handle: SharedClient,
}

impl Session {
    /// True when both values refer to the same live connection.
    pub fn same_handle(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }
}

type Family = Mutex<HashMap<SessionKey, Session>>;

/// Live sessions, partitioned by protocol family. A key is only meaningful
/// within the family that issued it.
#[derive(Default)]
pub struct SessionRegistry {
    sftp: Family,
    ftp: Family,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn family(&self, protocol: Protocol) -> MutexGuard<'_, HashMap<SessionKey, Session>> {
        let family = match protocol {
            Protocol::Sftp => &self.sftp,
            Protocol::Ftp => &self.ftp,
        };
        family.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores a freshly connected client under a new random key.
    pub fn register(&self, client: Box<dyn RemoteClient>) -> SessionKey {
        let protocol = client.protocol();
        let key = SessionKey::generate();
        let session = Session {
            key: key.clone(),
            protocol,
            handle: Arc::new(tokio::sync::Mutex::new(client)),
        };

        self.family(protocol).insert(key.clone(), session);
        tracing::debug!(protocol = %protocol, key = %key, "session registered");
        key
    }

    pub fn resolve(&self, protocol: Protocol, key: &SessionKey) -> Result<Session> {
        self.family(protocol)
            .get(key)
            .cloned()
            .ok_or_else(|| MoverError::InvalidSession(key.to_string()))
    }

    /// Removes the session and hands it to the caller for teardown.
    pub fn remove(&self, protocol: Protocol, key: &SessionKey) -> Result<Session> {
        let session = self
            .family(protocol)
            .remove(key)
            .ok_or_else(|| MoverError::InvalidSession(key.to_string()))?;
        tracing::debug!(protocol = %protocol, key = %key, "session removed");
        Ok(session)
    }

    /// Whether `session` is still the registered entry for its key.
    pub fn is_current(&self, session: &Session) -> bool {
        self.family(session.protocol)
            .get(&session.key)
            .is_some_and(|current| current.same_handle(session))
    }

    pub fn len(&self, protocol: Protocol) -> usize {
        self.family(protocol).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len(Protocol::Sftp) == 0 && self.len(Protocol::Ftp) == 0
    }

    /// Empties both families.
    pub fn drain(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.family(Protocol::Sftp).drain().map(|(_, s)| s).collect();
        sessions.extend(self.family(Protocol::Ftp).drain().map(|(_, s)| s));
        sessions
    }
}
