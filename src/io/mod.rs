mod object_store;
mod s3_store;

pub use object_store::{ByteStream, ObjectBody, ObjectStore};
pub use s3_store::{create_s3_client, S3ObjectStore};
