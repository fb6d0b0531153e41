//! Request path resolution.
//!
//! Turns the raw path that follows `{base}files` into a [`StorageAddress`].
//!
//! ```text
//! /tmp/plate.zarr/0/.zattrs          -> Local  { path: "/tmp/plate.zarr/0/.zattrs" }
//! /s3://bucket/plate.zarr/0/.zattrs  -> Remote { bucket: "bucket", key: "plate.zarr/0/.zattrs" }
//! /s3://bucket                       -> PathError::InvalidAddress
//! ```
//!
//! Percent-decoding is best-effort: `%` sequences that are not valid escapes
//! are kept literally. Decoded bytes that are not UTF-8 are rejected with
//! [`PathError::BadEncoding`]. The decoded string is NFC-normalized.
//!
//! This module does not confine local paths to a root. [`contains_path`] is
//! the primitive for callers that do.

use std::fmt;

use unicode_normalization::UnicodeNormalization;

use crate::error::PathError;

/// URI prefix that marks an object-store address.
pub const S3_SCHEME_PREFIX: &str = "s3://";

/// Resolved location of the requested data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageAddress {
    /// A path on the local filesystem
    Local { path: String },

    /// An object in an S3-compatible store
    Remote { bucket: String, key: String },
}

impl StorageAddress {
    /// Whether this address points at the object store.
    pub fn is_remote(&self) -> bool {
        matches!(self, StorageAddress::Remote { .. })
    }
}

impl fmt::Display for StorageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageAddress::Local { path } => write!(f, "{}", path),
            StorageAddress::Remote { bucket, key } => {
                write!(f, "{}{}/{}", S3_SCHEME_PREFIX, bucket, key)
            }
        }
    }
}

/// Decode and NFC-normalize a raw request path.
pub fn decode_path(raw: &str) -> Result<String, PathError> {
    let decoded = urlencoding::decode(raw).map_err(|_| PathError::BadEncoding)?;
    Ok(decoded.nfc().collect())
}

/// Resolve a raw request path into a storage address.
pub fn resolve(raw: &str) -> Result<StorageAddress, PathError> {
    let decoded = decode_path(raw)?;

    let without_separator = decoded.strip_prefix('/').unwrap_or(&decoded);
    if without_separator.starts_with(S3_SCHEME_PREFIX) {
        return parse_s3_uri(without_separator);
    }

    Ok(StorageAddress::Local { path: decoded })
}

/// Parse `s3://bucket/key` into a remote address.
///
/// The bucket must be non-empty and contain no `/`; the key must be
/// non-empty and may contain further `/` separators.
pub fn parse_s3_uri(uri: &str) -> Result<StorageAddress, PathError> {
    let invalid = || PathError::InvalidAddress(uri.to_string());

    let rest = uri.strip_prefix(S3_SCHEME_PREFIX).ok_or_else(invalid)?;
    let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;
    if bucket.is_empty() || key.is_empty() {
        return Err(invalid());
    }

    Ok(StorageAddress::Remote {
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}

/// Check that `candidate` lies inside `root`.
///
/// True iff the relative path from `root` to `candidate` contains no `..`
/// segment. Purely lexical: both sides are normalized (empty and `.`
/// segments dropped, `..` folded into its parent) and nothing touches the
/// filesystem. An absolute path is never contained in a relative root and
/// vice versa.
pub fn contains_path(root: &str, candidate: &str) -> bool {
    if root.starts_with('/') != candidate.starts_with('/') {
        return false;
    }

    let root = normalize_segments(root);
    let candidate = normalize_segments(candidate);

    candidate.len() >= root.len() && candidate[..root.len()] == root[..]
}

fn normalize_segments(path: &str) -> Vec<&str> {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // `..` above the filesystem root stays at the root
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    segments
}
