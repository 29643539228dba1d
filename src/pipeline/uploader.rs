use std::time::Instant;

use anyhow::{Result, anyhow};
use async_channel::Sender;
use tracing::{info, trace};

use crate::pipeline::worker_pool::{SendResult, WorkerPool};
use crate::types::error::BulkError;
use crate::types::{BulkJob, BulkStatistics, PhaseReport, UploadJob};

pub struct ObjectUploader {
    pool: WorkerPool,
    stats_sender: Sender<BulkStatistics>,
}

impl ObjectUploader {
    pub fn new(pool: WorkerPool, stats_sender: Sender<BulkStatistics>) -> Self {
        Self { pool, stats_sender }
    }

    /// Enqueues every job, blocking on a full queue, then waits for all of
    /// them. The pool is shut down in every case.
    pub async fn upload(self, jobs: Vec<UploadJob>) -> Result<PhaseReport> {
        let result = self.submit_and_wait(jobs).await;
        self.pool.shutdown().await;

        result
    }

    async fn submit_and_wait(&self, jobs: Vec<UploadJob>) -> Result<PhaseReport> {
        trace!(jobs = jobs.len(), "upload phase has started.");

        let start_time = Instant::now();
        let mut submitted: u64 = 0;

        for job in jobs {
            if self.pool.submit(BulkJob::Upload(job)).await? == SendResult::Closed {
                return Err(anyhow!(BulkError::Cancelled));
            }
            submitted += 1;
        }

        self.pool.wait().await?;

        let elapsed = start_time.elapsed();
        info!(
            uploaded = submitted,
            elapsed_sec = elapsed.as_secs_f64(),
            "Uploaded {} files [concurrently] in {:.2} seconds",
            submitted,
            elapsed.as_secs_f64()
        );

        let _ = self
            .stats_sender
            .send(BulkStatistics::UploadSummary {
                uploaded: submitted,
                elapsed,
            })
            .await;

        Ok(PhaseReport {
            objects: submitted,
            elapsed,
        })
    }
}
