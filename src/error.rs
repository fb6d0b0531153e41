use thiserror::Error;

/// Errors produced while turning a request path into a storage address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Percent-decoding produced bytes that are not valid UTF-8
    #[error("Malformed percent-encoding in path")]
    BadEncoding,

    /// Object-store address does not match `s3://bucket/key`
    #[error("Invalid S3 URI format: {0}. Expected format: s3://bucket/key")]
    InvalidAddress(String),
}

/// Errors that can occur when reading from local or remote storage
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// File or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local path is a directory and cannot be streamed
    #[error("Is a directory: {0}")]
    IsDirectory(String),

    /// Local filesystem error other than "does not exist"
    #[error("I/O error: {0}")]
    Io(String),

    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),
}

impl StorageError {
    /// Map an I/O error for `path`, keeping "does not exist" distinct.
    pub fn from_io(err: std::io::Error, path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::Io(format!("{}: {}", path, err)),
        }
    }
}

/// Errors raised by an authorization capability while deciding a request
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Upstream user server could not be reached or answered unexpectedly
    #[error("Upstream auth error: {0}")]
    Upstream(String),

    /// Upstream answered with a body we could not decode
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

/// Every way a data request can end short of streaming bytes.
///
/// Each variant maps to exactly one HTTP status in the server layer.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Path(#[from] PathError),

    /// The caller is not a valid user
    #[error("Unauthorized")]
    Unauthenticated,

    /// The caller may not read this address
    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}
