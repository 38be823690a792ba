#![allow(dead_code)]

use async_trait::async_trait;
use remote_mover::config::Config;
use remote_mover::connection::{ConnectParams, Connector};
use remote_mover::error::{MoverError, Result};
use remote_mover::{LockScope, Mover, Protocol, RemoteClient, RemoteEntry, Reply};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PASSWORD: &str = "secret";

/// Remote filesystem state shared by every client of one server.
#[derive(Debug, Default)]
pub struct RemoteFs {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub chmods: Vec<String>,
    pub disconnects: usize,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent_of(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// An in-process stand-in for an SFTP/FTP server.
pub struct MemoryServer {
    pub fs: Mutex<RemoteFs>,
    /// Makes FTP uploads fail on completion.
    pub fail_completion: AtomicBool,
    /// Makes every file delete fail.
    pub fail_delete: AtomicBool,
    pub store_delay: Option<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryServer {
    pub fn new(store_delay: Option<Duration>) -> Self {
        let mut fs = RemoteFs::default();
        fs.dirs.insert("/".to_string());
        fs.dirs.insert(String::new());
        Self {
            fs: Mutex::new(fs),
            fail_completion: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            store_delay,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn fs(&self) -> std::sync::MutexGuard<'_, RemoteFs> {
        self.fs.lock().unwrap()
    }

    pub fn add_dir(&self, path: &str) {
        self.fs().dirs.insert(normalize(path));
    }

    pub fn add_file(&self, path: &str, contents: &[u8]) {
        self.fs().files.insert(normalize(path), contents.to_vec());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.fs().files.get(&normalize(path)).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.fs().dirs.contains(&normalize(path))
    }

    /// Highest number of uploads that were in progress at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct MemoryClient {
    protocol: Protocol,
    server: Arc<MemoryServer>,
}

#[async_trait]
impl RemoteClient for MemoryClient {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn store(&mut self, path: &str, data: Vec<u8>) -> Result<()> {
        let now = self.server.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.server.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.server.store_delay {
            tokio::time::sleep(delay).await;
        }
        self.server.active.fetch_sub(1, Ordering::SeqCst);

        let path = normalize(path);
        let mut fs = self.server.fs();
        if !fs.dirs.contains(&parent_of(&path)) {
            return Err(MoverError::RemoteNotFound(path));
        }
        if self.protocol == Protocol::Ftp && self.server.fail_completion.load(Ordering::SeqCst) {
            return Err(MoverError::TransferIncomplete(path));
        }
        fs.files.insert(path, data);
        Ok(())
    }

    async fn list_entries(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let path = normalize(path);
        let fs = self.server.fs();
        if !fs.dirs.contains(&path) {
            return Err(MoverError::RemoteNotFound(path));
        }

        let mut entries = vec![
            RemoteEntry { name: ".".to_string(), is_dir: true },
            RemoteEntry { name: "..".to_string(), is_dir: true },
        ];
        // Reverse order so callers cannot rely on the backend sorting.
        entries.extend(
            fs.dirs
                .iter()
                .rev()
                .filter(|d| *d != &path && parent_of(d) == path)
                .map(|d| RemoteEntry { name: name_of(d).to_string(), is_dir: true }),
        );
        entries.extend(
            fs.files
                .keys()
                .filter(|f| parent_of(f) == path)
                .map(|f| RemoteEntry { name: name_of(f).to_string(), is_dir: false }),
        );
        Ok(entries)
    }

    async fn stat(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        let fs = self.server.fs();
        if fs.dirs.contains(&path) || fs.files.contains_key(&path) {
            Ok(())
        } else {
            Err(MoverError::RemoteNotFound(path))
        }
    }

    async fn make_directory(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        let mut fs = self.server.fs();
        if fs.dirs.contains(&path) {
            return Err(MoverError::RemoteOperationFailed(format!("{path}: File exists")));
        }
        if !fs.dirs.contains(&parent_of(&path)) {
            return Err(MoverError::RemoteNotFound(path));
        }
        fs.dirs.insert(path);
        Ok(())
    }

    async fn delete_file(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        if self.server.fail_delete.load(Ordering::SeqCst) {
            return Err(MoverError::RemoteOperationFailed(format!("{path}: permission denied")));
        }
        match self.server.fs().files.remove(&path) {
            Some(_) => Ok(()),
            None => Err(MoverError::RemoteNotFound(path)),
        }
    }

    async fn remove_directory(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        let mut fs = self.server.fs();
        if !fs.dirs.contains(&path) {
            return Err(MoverError::RemoteNotFound(path));
        }
        let occupied = fs.dirs.iter().any(|d| d != &path && parent_of(d) == path)
            || fs.files.keys().any(|f| parent_of(f) == path);
        if occupied {
            return Err(MoverError::RemoteOperationFailed(format!("{path}: Directory not empty")));
        }
        fs.dirs.remove(&path);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.server.fs().disconnects += 1;
        Ok(())
    }

    async fn ensure_directory(&mut self, path: &str) -> Result<()> {
        match self.protocol {
            Protocol::Sftp => {
                if self.stat(path).await.is_err() {
                    self.make_directory(path).await?;
                }
            }
            Protocol::Ftp => {
                let _ = self.make_directory(path).await;
                self.server.fs().chmods.push(format!("755 {path}"));
            }
        }
        Ok(())
    }

    async fn finish_upload(&mut self, path: &str) -> Result<()> {
        if self.protocol == Protocol::Ftp {
            self.server.fs().chmods.push(format!("744 {path}"));
        }
        Ok(())
    }
}

pub struct MemoryConnector {
    server: Arc<MemoryServer>,
}

impl MemoryConnector {
    pub fn new(server: Arc<MemoryServer>) -> Self {
        Self { server }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, params: &ConnectParams) -> Result<Box<dyn RemoteClient>> {
        if params.password != PASSWORD {
            return Err(MoverError::AuthenticationFailed(
                "Bad username or password".to_string(),
            ));
        }
        Ok(Box::new(MemoryClient {
            protocol: params.protocol,
            server: self.server.clone(),
        }))
    }
}

pub fn mover_with(scope: LockScope, store_delay: Option<Duration>) -> (Mover, Arc<MemoryServer>) {
    let server = Arc::new(MemoryServer::new(store_delay));
    let config = Config {
        lock_scope: scope,
        ..Config::default()
    };
    let mover = Mover::new(&config, Box::new(MemoryConnector::new(server.clone())));
    (mover, server)
}

pub fn mover() -> (Mover, Arc<MemoryServer>) {
    mover_with(LockScope::Session, None)
}

pub fn connect_args(protocol: &str) -> Value {
    json!({
        "user": "alice",
        "password": PASSWORD,
        "host": "files.example.com",
        "protocol": protocol
    })
}

/// Connects and returns the session key.
pub async fn connect(mover: &Mover, protocol: &str) -> String {
    let reply = mover.connect(&connect_args(protocol)).await;
    assert!(reply.is_success(), "connect failed: {reply:?}");
    reply.message().unwrap().to_string()
}

pub fn put_args(key: &str, protocol: &str, name: &str, data: &str, ensure_path: bool) -> Value {
    json!({
        "key": key,
        "protocol": protocol,
        "name": name,
        "dataContainer": {"type": "text", "data": data},
        "ensurePath": ensure_path
    })
}

pub fn path_args(key: &str, protocol: &str, name: &str) -> Value {
    json!({"key": key, "protocol": protocol, "name": name})
}

pub fn assert_success(reply: &Reply) {
    assert!(reply.is_success(), "expected success, got {reply:?}");
}
