use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::operation::delete_object::DeleteObjectOutput;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use dyn_clone::DynClone;

use crate::types::ListingPage;

pub mod local;
pub mod s3;

/// A store bound to one bucket. Clones share the underlying client, so a
/// storage can be handed to every worker of a pool.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

pub struct StoragePair {
    pub upload: Storage,
    pub drain: Storage,
}

#[async_trait]
pub trait StorageTrait: DynClone {
    fn bucket(&self) -> &str;
    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<PutObjectOutput>;
    async fn delete_object(&self, key: &str) -> Result<DeleteObjectOutput>;
    async fn list_objects(
        &self,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> Result<ListingPage>;
}
