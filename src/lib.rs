#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod ensure;
pub mod error;
pub mod mover;
pub mod registry;
pub mod request;
pub mod serve;
pub mod utils;

pub use client::{Protocol, RemoteClient, RemoteEntry};
pub use config::Config;
pub use connection::{ConnectParams, Connector};
pub use dispatch::LockScope;
pub use error::{ErrorKind, MoverError};
pub use mover::Mover;
pub use registry::SessionKey;
pub use request::{DirectoryEntry, Payload, Reply};
