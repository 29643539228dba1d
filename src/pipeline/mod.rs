use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Error, Result, anyhow};
use async_channel::{Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::Config;
use crate::pipeline::drainer::ObjectDrainer;
use crate::pipeline::uploader::ObjectUploader;
use crate::storage::local::FileCollector;
use crate::storage::s3::S3StorageFactory;
use crate::storage::{Storage, StoragePair};
use crate::types::error::is_cancelled_error;
use crate::types::{BulkStatistics, PipelineCancellationToken, PipelineReport};

pub use completion_counter::CompletionCounter;
pub use worker_pool::{SendResult, WorkerPool};

mod completion_counter;
mod drainer;
mod stage;
mod uploader;
mod worker;
mod worker_pool;

/// Uploads a local directory to one bucket and then drains a bucket.
///
/// The drain phase starts only after every upload has been acknowledged.
/// Any failure stops the pipeline before the next phase begins.
pub struct Pipeline {
    config: Config,
    upload_storage: Storage,
    drain_storage: Storage,
    cancellation_token: PipelineCancellationToken,
    stats_sender: Sender<BulkStatistics>,
    stats_receiver: Receiver<BulkStatistics>,
    has_error: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<Error>>>,
    ready: bool,
    report: PipelineReport,
}

impl Pipeline {
    pub async fn new(config: Config, cancellation_token: PipelineCancellationToken) -> Result<Self> {
        let client_config = config
            .client_config
            .clone()
            .context("client config is required to access the object store.")?;

        let StoragePair { upload, drain } =
            S3StorageFactory::create_pair(&client_config, &config.upload_bucket, &config.drain_bucket)
                .await;

        Ok(Self::with_storages(config, upload, drain, cancellation_token))
    }

    /// Builds a pipeline on top of arbitrary stores.
    pub fn with_storages(
        config: Config,
        upload_storage: Storage,
        drain_storage: Storage,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        let (stats_sender, stats_receiver) = async_channel::unbounded();

        Self {
            config,
            upload_storage,
            drain_storage,
            cancellation_token,
            stats_sender,
            stats_receiver,
            has_error: Arc::new(AtomicBool::new(false)),
            errors: Arc::new(Mutex::new(VecDeque::<Error>::new())),
            ready: true,
            report: PipelineReport::default(),
        }
    }

    pub async fn run(&mut self) {
        if !self.ready {
            panic!("it can be executed only once.")
        }
        self.ready = false;

        self.run_phases().await;

        self.shutdown().await;
    }

    async fn run_phases(&mut self) {
        let jobs = match FileCollector::from_config(&self.config).collect().await {
            Ok(jobs) => jobs,
            Err(e) => {
                self.print_and_store_error(Some(e), "collect local files failed.");
                return;
            }
        };

        debug!(
            files = jobs.len(),
            source = %self.config.source_dir.display(),
            "local files have been collected."
        );

        let uploader = ObjectUploader::new(
            self.start_worker_pool(&self.upload_storage),
            self.stats_sender.clone(),
        );
        match uploader.upload(jobs).await {
            Ok(phase_report) => self.report.uploaded = phase_report.objects,
            Err(e) => {
                self.store_phase_error(e, "upload phase failed.");
                return;
            }
        }

        if self.has_error() || self.is_cancelled() {
            return;
        }

        if self.config.is_same_bucket_drained() {
            warn!(
                bucket = self.config.drain_bucket,
                "the uploaded bucket is drained. use --drain-bucket to drain another bucket."
            );
        }

        let drainer = ObjectDrainer::new(
            dyn_clone::clone_box(&*self.drain_storage),
            self.start_worker_pool(&self.drain_storage),
            self.stats_sender.clone(),
            self.cancellation_token.clone(),
            self.config.max_keys,
            self.config.follow_pagination,
        );
        match drainer.drain().await {
            Ok(drain_report) => {
                self.report.deleted = drain_report.deleted;
                self.report.drain_iterations = drain_report.iterations;
                self.report.list_calls = drain_report.list_calls;
            }
            Err(e) => {
                self.store_phase_error(e, "drain phase failed.");
            }
        }
    }

    fn start_worker_pool(&self, storage: &Storage) -> WorkerPool {
        WorkerPool::start(
            self.config.worker_size,
            storage,
            self.stats_sender.clone(),
            self.cancellation_token.clone(),
            self.has_error.clone(),
            self.errors.clone(),
        )
    }

    // A cancelled phase either carries a worker error that has already been
    // stored, or was interrupted by the user.
    fn store_phase_error(&self, e: Error, message: &str) {
        if is_cancelled_error(&e) {
            if !self.has_error() {
                info!("pipeline has been cancelled.");
            }
            return;
        }

        self.print_and_store_error(Some(e), message);
    }

    async fn shutdown(&self) {
        self.close_stats_sender();
    }

    fn print_and_store_error(&self, e: Option<Error>, message: &str) {
        self.has_error.store(true, Ordering::SeqCst);

        if let Some(e) = e {
            let error = e.to_string();
            let source = e.source();

            error!(error = error, source = source, message);
            self.errors.lock().unwrap().push_back(e);
        } else {
            error!("{}", message.to_string());
            self.errors
                .lock()
                .unwrap()
                .push_back(anyhow!(message.to_string()));
        }
    }

    pub fn get_stats_receiver(&self) -> Receiver<BulkStatistics> {
        self.stats_receiver.clone()
    }

    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn get_errors_and_consume(&self) -> Option<Vec<Error>> {
        if !self.has_error() {
            return None;
        }

        let error_list = self.errors.clone();
        let mut error_list = error_list.lock().unwrap();

        Some(error_list.drain(..).collect())
    }

    pub fn get_report(&self) -> PipelineReport {
        self.report
    }

    pub fn close_stats_sender(&self) {
        self.stats_sender.close();
    }
}

pub(crate) fn log_error(
    has_error: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<Error>>>,
    e: Error,
    message: &str,
) {
    has_error.store(true, Ordering::SeqCst);

    let error = e.to_string();
    let source = e.source();

    error!(error = error, source = source, message);

    let mut error_list = errors.lock().unwrap();
    error_list.push_back(e);
}
