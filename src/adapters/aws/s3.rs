//! S3 object access and bucket emptying.

use super::error::{build_error, sdk_error};
use crate::domain::model::PutObject;
use crate::domain::ports::S3Api;
use crate::utils::error::{FrameworkError, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier, ServerSideEncryption};
use aws_sdk_s3::Client;

const SERVICE: &str = "S3";

pub struct S3Client {
    client: Client,
}

impl S3Client {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// One `DeleteObjects` call; list pages never exceed its 1000-key limit.
    async fn delete_batch(&self, bucket: &str, objects: Vec<ObjectIdentifier>) -> Result<usize> {
        if objects.is_empty() {
            return Ok(0);
        }

        let count = objects.len();
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| build_error(SERVICE, e))?;

        let output = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DeleteObjects", e))?;

        let failed = output.errors().len();
        if failed > 0 {
            tracing::warn!(bucket = %bucket, failed, "Some objects could not be deleted");
        }
        Ok(count - failed)
    }
}

#[async_trait]
impl S3Api for S3Client {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "GetObject", e))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| FrameworkError::operation_failed(format!("Failed to read s3://{}/{}: {}", bucket, key, e)))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put_object(&self, object: PutObject) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .body(ByteStream::from(object.body))
            .set_content_type(object.content_type);

        if let Some(kms_key_id) = object.kms_key_id {
            request = request
                .server_side_encryption(ServerSideEncryption::AwsKms)
                .ssekms_key_id(kms_key_id);
        }

        request
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "PutObject", e))?;
        Ok(())
    }

    async fn delete_objects_with_prefix(&self, bucket: &str, prefix: &str) -> Result<usize> {
        let mut deleted = 0;
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "ListObjectsV2", e))?;

            let objects = output
                .contents()
                .iter()
                .filter_map(|object| object.key())
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| build_error(SERVICE, e))?;
            deleted += self.delete_batch(bucket, objects).await?;

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(str::to_string);
                if continuation_token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(deleted)
    }

    async fn delete_object_versions(&self, bucket: &str) -> Result<usize> {
        let mut deleted = 0;
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_id_marker.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "ListObjectVersions", e))?;

            let versions = output
                .versions()
                .iter()
                .filter_map(|v| v.key().map(|key| (key, v.version_id())));
            let markers = output
                .delete_markers()
                .iter()
                .filter_map(|m| m.key().map(|key| (key, m.version_id())));

            let objects = versions
                .chain(markers)
                .map(|(key, version_id)| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .set_version_id(version_id.map(str::to_string))
                        .build()
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| build_error(SERVICE, e))?;
            deleted += self.delete_batch(bucket, objects).await?;

            if output.is_truncated() == Some(true) {
                key_marker = output.next_key_marker().map(str::to_string);
                version_id_marker = output.next_version_id_marker().map(str::to_string);
                if key_marker.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(deleted)
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DeleteBucket", e))?;
        Ok(())
    }
}
