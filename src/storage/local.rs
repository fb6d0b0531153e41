//! Local filesystem backend.

use std::io::SeekFrom;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::trace;

use super::StoredObject;
use crate::error::StorageError;
use crate::io::ByteStream;
use crate::range::ByteWindow;

/// Default read size for streamed files (64 KiB).
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Reads files from the local filesystem.
#[derive(Debug, Clone, Copy)]
pub struct LocalBackend {
    chunk_size: usize,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
        }
    }

    /// Use a different read size for streamed bodies.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Check that `path` is an existing regular file and open it.
    pub async fn stat(&self, path: &str) -> Result<LocalFile, StorageError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;
        if metadata.is_dir() {
            return Err(StorageError::IsDirectory(path.to_string()));
        }

        let file = File::open(path)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;

        Ok(LocalFile {
            path: path.to_string(),
            file,
            size: metadata.len(),
            chunk_size: self.chunk_size,
        })
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// An opened local file.
pub struct LocalFile {
    path: String,
    file: File,
    size: u64,
    chunk_size: usize,
}

impl LocalFile {
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl StoredObject for LocalFile {
    fn size(&self) -> u64 {
        self.size
    }

    async fn open_stream(
        self: Box<Self>,
        window: Option<ByteWindow>,
    ) -> Result<ByteStream, StorageError> {
        let LocalFile {
            path,
            mut file,
            size,
            chunk_size,
        } = *self;

        let (offset, len) = match window {
            Some(window) => (window.start, window.len()),
            None => (0, size),
        };

        if offset > 0 {
            trace!(path = %path, offset, len, "Seeking local file");
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| StorageError::from_io(e, &path))?;
        }

        let reader = file.take(len);
        Ok(Box::pin(ReaderStream::with_capacity(reader, chunk_size)))
    }
}
