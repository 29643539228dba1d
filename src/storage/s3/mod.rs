use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::delete_object::DeleteObjectOutput;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::storage::{Storage, StoragePair, StorageTrait};
use crate::types::ListingPage;

mod client_builder;

pub struct S3StorageFactory {}

impl S3StorageFactory {
    pub async fn create(client_config: &ClientConfig, bucket: &str) -> Storage {
        S3Storage::boxed_new(Arc::new(client_config.create_client().await), bucket)
    }

    /// Both storages share one client.
    pub async fn create_pair(
        client_config: &ClientConfig,
        upload_bucket: &str,
        drain_bucket: &str,
    ) -> StoragePair {
        let client = Arc::new(client_config.create_client().await);

        StoragePair {
            upload: S3Storage::boxed_new(client.clone(), upload_bucket),
            drain: S3Storage::boxed_new(client, drain_bucket),
        }
    }
}

#[derive(Clone)]
struct S3Storage {
    bucket: String,
    client: Arc<Client>,
}

impl S3Storage {
    fn boxed_new(client: Arc<Client>, bucket: &str) -> Storage {
        Box::new(S3Storage {
            bucket: bucket.to_string(),
            client,
        })
    }
}

#[async_trait]
impl StorageTrait for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<PutObjectOutput> {
        let content_length = data.len() as i64;

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(content_length)
            .set_content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .context("aws_sdk_s3::client::put_object() failed.")?;

        trace!(
            bucket = self.bucket,
            key = key,
            size = content_length,
            "put_object() completed."
        );

        Ok(result)
    }

    async fn delete_object(&self, key: &str) -> Result<DeleteObjectOutput> {
        let result = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("aws_sdk_s3::client::delete_object() failed.")?;

        trace!(bucket = self.bucket, key = key, "delete_object() completed.");

        Ok(result)
    }

    async fn list_objects(
        &self,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> Result<ListingPage> {
        let list_objects_output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_continuation_token(continuation_token)
            .max_keys(max_keys)
            .send()
            .await
            .context("aws_sdk_s3::client::list_objects_v2() failed.")?;

        let keys: Vec<String> = list_objects_output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(|key| key.to_string()))
            .collect();

        let next_continuation_token = if list_objects_output.is_truncated().unwrap_or(false) {
            list_objects_output
                .next_continuation_token()
                .map(|token| token.to_string())
        } else {
            None
        };

        debug!(
            bucket = self.bucket,
            objects = keys.len(),
            truncated = next_continuation_token.is_some(),
            "list_objects_v2() completed."
        );

        Ok(ListingPage {
            keys,
            next_continuation_token,
        })
    }
}
