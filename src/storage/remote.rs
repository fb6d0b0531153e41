//! Object-store backend.
//!
//! The store cannot return the full object size together with a ranged body
//! in one call, so a read is two-phase:
//!
//! 1. [`RemoteBackend::fetch_metadata_and_body`]: unranged GET, yields the
//!    size and a body that has not been read yet.
//! 2. [`RemoteBackend::fetch_range`]: only when a satisfiable range was
//!    negotiated; the first body is dropped unread.
//!
//! A missing object ends the read after the first call.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::StoredObject;
use crate::error::StorageError;
use crate::io::{ByteStream, ObjectBody, ObjectStore};
use crate::range::ByteWindow;

/// Reads objects through a shared [`ObjectStore`] client.
#[derive(Clone)]
pub struct RemoteBackend {
    store: Arc<dyn ObjectStore>,
}

impl RemoteBackend {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// First call: full object size plus its unread body.
    pub async fn fetch_metadata_and_body(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectBody, StorageError> {
        self.store.get_object(bucket, key, None).await
    }

    /// Second call: exactly the bytes of `window`.
    pub async fn fetch_range(
        &self,
        bucket: &str,
        key: &str,
        window: ByteWindow,
    ) -> Result<ByteStream, StorageError> {
        let ranged = self.store.get_object(bucket, key, Some(window)).await?;
        if ranged.content_length != window.len() {
            debug!(
                bucket,
                key,
                expected = window.len(),
                actual = ranged.content_length,
                "Ranged object body length differs from the requested window"
            );
        }
        Ok(ranged.body)
    }

    /// Probe the object; fails with `NotFound` when it does not exist.
    pub async fn stat(&self, bucket: &str, key: &str) -> Result<RemoteObject, StorageError> {
        let probe = self.fetch_metadata_and_body(bucket, key).await?;

        Ok(RemoteObject {
            backend: self.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: probe.content_length,
            body: probe.body,
        })
    }
}

/// An object whose size is known and whose full body is already open.
pub struct RemoteObject {
    backend: RemoteBackend,
    bucket: String,
    key: String,
    size: u64,
    body: ByteStream,
}

impl RemoteObject {
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl StoredObject for RemoteObject {
    fn size(&self) -> u64 {
        self.size
    }

    async fn open_stream(
        self: Box<Self>,
        window: Option<ByteWindow>,
    ) -> Result<ByteStream, StorageError> {
        let RemoteObject {
            backend,
            bucket,
            key,
            body,
            ..
        } = *self;

        match window {
            None => Ok(body),
            Some(window) => {
                drop(body);
                backend.fetch_range(&bucket, &key, window).await
            }
        }
    }
}
