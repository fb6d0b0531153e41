use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::Client;
use tokio_util::io::ReaderStream;
use tracing::trace;

use super::{ObjectBody, ObjectStore};
use crate::error::StorageError;
use crate::range::ByteWindow;

/// Error codes the store uses for a missing bucket or key.
const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NoSuchBucket", "NotFound"];

/// S3-backed implementation of [`ObjectStore`].
///
/// Reads objects from S3 or S3-compatible storage (MinIO, Ceph, etc.).
/// Bodies are streamed, never collected in memory.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteWindow>,
    ) -> Result<ObjectBody, StorageError> {
        let mut request = self.client.get_object().bucket(bucket).key(key);
        if let Some(window) = range {
            trace!(bucket, key, range = %window.to_range_header(), "Ranged S3 GET");
            request = request.range(window.to_range_header());
        }

        let output = request
            .send()
            .await
            .map_err(|e| map_get_object_error(e, bucket, key))?;

        let content_length = object_size(output.content_length(), bucket, key)?;
        let body = ReaderStream::new(output.body.into_async_read());

        Ok(ObjectBody {
            content_length,
            body: Box::pin(body),
        })
    }
}

/// Body length from the response; absent or negative is a store fault.
fn object_size(content_length: Option<i64>, bucket: &str, key: &str) -> Result<u64, StorageError> {
    content_length
        .and_then(|length| u64::try_from(length).ok())
        .ok_or_else(|| StorageError::S3(format!("s3://{}/{}: missing content length", bucket, key)))
}

/// Classify a GetObject failure, keeping "not found" distinct.
fn map_get_object_error(
    err: SdkError<GetObjectError>,
    bucket: &str,
    key: &str,
) -> StorageError {
    let identifier = format!("s3://{}/{}", bucket, key);

    if let Some(service_err) = err.as_service_error() {
        let code_is_not_found = service_err
            .code()
            .map(|code| NOT_FOUND_CODES.contains(&code))
            .unwrap_or(false);
        if service_err.is_no_such_key() || code_is_not_found {
            return StorageError::NotFound(identifier);
        }
    }

    let status_is_404 = err
        .raw_response()
        .map(|r| r.status().as_u16() == 404)
        .unwrap_or(false);
    if status_is_404 {
        return StorageError::NotFound(identifier);
    }

    StorageError::S3(format!("{}: {}", identifier, DisplayErrorContext(&err)))
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
///
/// For AWS S3, pass `None` to use the default endpoint:
/// ```ignore
/// let client = create_s3_client(None, "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services usually need path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
