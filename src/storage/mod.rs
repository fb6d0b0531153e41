//! Storage backends behind one stat/stream contract.
//!
//! ```text
//!                    StorageAddress
//!                          │
//!               Storage::stat (matches the tag once)
//!                 ┌────────┴────────┐
//!                 ▼                 ▼
//!          LocalBackend       RemoteBackend ── ObjectStore (S3)
//!                 │                 │
//!                 └──── Box<dyn StoredObject> ────┘
//!                          │
//!                 size() / open_stream(window)
//! ```
//!
//! A [`StoredObject`] is created per request and owned by the request. It
//! holds whatever the backend already opened (a file handle, the body of
//! the size probe) and releases it when dropped, so abandoning a request at
//! any step never leaks a handle.

mod local;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::io::{ByteStream, ObjectStore};
use crate::path::StorageAddress;
use crate::range::ByteWindow;

pub use local::{LocalBackend, LocalFile, DEFAULT_STREAM_CHUNK_SIZE};
pub use remote::{RemoteBackend, RemoteObject};

/// An existing, readable file or object whose size is known.
#[async_trait]
pub trait StoredObject: Send {
    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Consume the object and stream `window` (or everything when `None`).
    async fn open_stream(
        self: Box<Self>,
        window: Option<ByteWindow>,
    ) -> Result<ByteStream, StorageError>;
}

/// Both backends, selected per request by the address tag.
#[derive(Clone)]
pub struct Storage {
    local: LocalBackend,
    remote: RemoteBackend,
}

impl Storage {
    pub fn new(local: LocalBackend, remote: RemoteBackend) -> Self {
        Self { local, remote }
    }

    /// Default local backend plus a remote backend over `store`.
    pub fn with_object_store(store: Arc<dyn ObjectStore>) -> Self {
        Self::new(LocalBackend::new(), RemoteBackend::new(store))
    }

    /// Existence and type check for `address`.
    ///
    /// Fails with [`StorageError::NotFound`] for a missing file or object and
    /// [`StorageError::IsDirectory`] for a local directory.
    pub async fn stat(
        &self,
        address: &StorageAddress,
    ) -> Result<Box<dyn StoredObject>, StorageError> {
        match address {
            StorageAddress::Local { path } => {
                let file = self.local.stat(path).await?;
                Ok(Box::new(file))
            }
            StorageAddress::Remote { bucket, key } => {
                let object = self.remote.stat(bucket, key).await?;
                Ok(Box::new(object))
            }
        }
    }
}
