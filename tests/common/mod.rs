#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::ops::Bound;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::operation::delete_object::DeleteObjectOutput;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use s3bulk::Config;
use s3bulk::config::args::parse_from_args;
use s3bulk::pipeline::Pipeline;
use s3bulk::storage::{Storage, StorageTrait};
use s3bulk::types::{ListingPage, create_pipeline_cancellation_token};

#[derive(Default)]
struct FakeState {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    put_keys: Mutex<Vec<String>>,
    delete_counts: Mutex<HashMap<String, usize>>,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

/// In-memory bucket. Clones share their state, so a test keeps one handle
/// while the pipeline owns the others.
#[derive(Clone)]
pub struct FakeStorage {
    bucket: String,
    state: Arc<FakeState>,
    fail_put_at: Option<usize>,
    fail_delete_at: Option<usize>,
    fail_list_at: Option<usize>,
    put_gate: Option<Arc<Semaphore>>,
}

impl FakeStorage {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            state: Arc::new(FakeState::default()),
            fail_put_at: None,
            fail_delete_at: None,
            fail_list_at: None,
            put_gate: None,
        }
    }

    /// The n-th put call (1-based) fails.
    pub fn failing_put_at(bucket: &str, n: usize) -> Self {
        Self {
            fail_put_at: Some(n),
            ..Self::new(bucket)
        }
    }

    /// The n-th delete call (1-based) fails and leaves the object in place.
    pub fn failing_delete_at(bucket: &str, n: usize) -> Self {
        Self {
            fail_delete_at: Some(n),
            ..Self::new(bucket)
        }
    }

    /// The n-th list call (1-based) fails.
    pub fn failing_list_at(bucket: &str, n: usize) -> Self {
        Self {
            fail_list_at: Some(n),
            ..Self::new(bucket)
        }
    }

    /// Every put call waits for a permit of `gate`.
    pub fn gated(bucket: &str, gate: Arc<Semaphore>) -> Self {
        Self {
            put_gate: Some(gate),
            ..Self::new(bucket)
        }
    }

    pub fn boxed(&self) -> Storage {
        Box::new(self.clone())
    }

    pub fn seed(&self, count: usize) {
        let mut objects = self.state.objects.lock().unwrap();
        for i in 0..count {
            objects.insert(format!("object{i:05}"), vec![0; 8]);
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state.objects.lock().unwrap().get(key).cloned()
    }

    pub fn put_keys(&self) -> Vec<String> {
        self.state.put_keys.lock().unwrap().clone()
    }

    pub fn delete_counts(&self) -> HashMap<String, usize> {
        self.state.delete_counts.lock().unwrap().clone()
    }

    pub fn put_calls(&self) -> usize {
        self.state.put_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.state.delete_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageTrait for FakeStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: Option<String>,
    ) -> Result<PutObjectOutput> {
        let call = self.state.put_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(gate) = &self.put_gate {
            let _permit = gate.acquire().await?;
        }

        if self.fail_put_at == Some(call) {
            return Err(anyhow!("put_object() failed. call={call}"));
        }

        self.state.put_keys.lock().unwrap().push(key.to_string());
        self.state
            .objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data);

        Ok(PutObjectOutput::builder().build())
    }

    async fn delete_object(&self, key: &str) -> Result<DeleteObjectOutput> {
        let call = self.state.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_delete_at == Some(call) {
            return Err(anyhow!("delete_object() failed. call={call}"));
        }

        *self
            .state
            .delete_counts
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default() += 1;
        self.state.objects.lock().unwrap().remove(key);

        Ok(DeleteObjectOutput::builder().build())
    }

    // The continuation token is the last key of the previous page.
    async fn list_objects(
        &self,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> Result<ListingPage> {
        let call = self.state.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_list_at == Some(call) {
            return Err(anyhow!("list_objects() failed. call={call}"));
        }


        let objects = self.state.objects.lock().unwrap();
        let lower = match &continuation_token {
            Some(token) => Bound::Excluded(token.clone()),
            None => Bound::Unbounded,
        };

        let mut remaining = objects.range((lower, Bound::Unbounded)).map(|(key, _)| key);
        let keys: Vec<String> = remaining
            .by_ref()
            .take(max_keys as usize)
            .cloned()
            .collect();

        let next_continuation_token = if remaining.next().is_some() {
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListingPage {
            keys,
            next_continuation_token,
        })
    }
}

pub struct TestHelper;

impl TestHelper {
    pub fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }

    pub fn create_source_dir(relative_paths: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for relative_path in relative_paths {
            Self::create_file(temp_dir.path(), relative_path, relative_path.as_bytes());
        }
        temp_dir
    }

    pub fn create_file(root: &Path, relative_path: &str, content: &[u8]) {
        let path = root.join(relative_path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn build_config(source_dir: &Path, extra_args: &[&str]) -> Config {
        let source_dir = source_dir.to_str().unwrap();

        let mut args = vec!["s3bulk"];
        args.extend_from_slice(extra_args);
        args.extend_from_slice(&[source_dir, "s3://upload-bucket"]);

        Config::try_from(parse_from_args(args).unwrap()).unwrap()
    }

    pub async fn run_pipeline(
        config: Config,
        upload_storage: &FakeStorage,
        drain_storage: &FakeStorage,
    ) -> Pipeline {
        let mut pipeline = Pipeline::with_storages(
            config,
            upload_storage.boxed(),
            drain_storage.boxed(),
            create_pipeline_cancellation_token(),
        );
        pipeline.run().await;

        pipeline
    }

    pub fn error_store() -> (Arc<AtomicBool>, Arc<Mutex<VecDeque<Error>>>) {
        (
            Arc::new(AtomicBool::new(false)),
            Arc::new(Mutex::new(VecDeque::new())),
        )
    }
}
