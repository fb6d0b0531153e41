use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::StorageError;
use crate::range::ByteWindow;

/// A boxed stream of bytes for streaming reads.
///
/// Dropping the stream releases the underlying file handle or connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Response of a single object-store GET.
pub struct ObjectBody {
    /// Length of `body` in bytes (the full object size for unranged requests)
    pub content_length: u64,

    /// The object bytes, not yet read
    pub body: ByteStream,
}

/// Trait for fetching objects from an S3-compatible store.
///
/// One call is one network request. Implementations must be safe to share
/// across concurrent requests and must report a missing bucket or key as
/// [`StorageError::NotFound`], decided from the error code or status and
/// never from message text.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// GET `bucket/key`, optionally restricted to `range`.
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteWindow>,
    ) -> Result<ObjectBody, StorageError>;
}
