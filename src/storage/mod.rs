//! Where preprocessed material ends up.
//!
//! Two kinds of sinks are supported: random-access stores, addressed by a
//! namespace and a key, and streamed stores, where each key is a queue that
//! the online phase drains in order (typically one queue per worker thread).
//! Values are serialized with `bincode`.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod distribute;
pub mod file;
pub mod keys;
pub mod memory;

pub use file::FileStreamedStorage;
pub use memory::{MemoryStorage, MemoryStreamedStorage};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Serialization failed: {0}")]
    Serialization(#[from] bincode::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Storage backend failed: {0}")]
    Backend(String),
}

/// Random-access key/value store.
pub trait Storage {
    fn put_object<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError>;

    /// `Ok(None)` if nothing is stored under `name`/`key`.
    fn get_object<T: DeserializeOwned>(&self, name: &str, key: &str)
        -> Result<Option<T>, StorageError>;

    /// Drop every object under `name`.
    fn clear(&mut self, name: &str) -> Result<(), StorageError>;
}

/// Append-only queues addressed by key.
pub trait StreamedStorage {
    fn put_next<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError>;

    /// Take the oldest value not yet consumed.
    fn get_next<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, StorageError>;

    /// Look at the value `get_next` would return without consuming it.
    fn peek_next<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, StorageError>;

    /// Drop everything stored under `key`.
    fn truncate(&mut self, key: &str) -> Result<(), StorageError>;
}
