use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use anyhow::{Error, Result, anyhow};
use async_channel::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::pipeline::completion_counter::CompletionCounter;
use crate::pipeline::log_error;
use crate::pipeline::stage::Stage;
use crate::pipeline::worker::ObjectWorker;
use crate::storage::Storage;
use crate::types::error::BulkError;
use crate::types::{BulkJob, BulkStatistics, PipelineCancellationToken};

#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Success,
    Closed,
}

/// A fixed set of workers draining one bounded job queue.
///
/// The queue holds at most `pool_size` jobs, so `submit()` blocks while
/// every worker is busy and the queue is full. The first failing job records
/// its error and cancels the shared token, which stops every other worker
/// and wakes up a producer blocked in `submit()` or `wait()`.
pub struct WorkerPool {
    sender: Sender<BulkJob>,
    counter: Arc<CompletionCounter>,
    cancellation_token: PipelineCancellationToken,
    join_handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(
        pool_size: u16,
        storage: &Storage,
        stats_sender: Sender<BulkStatistics>,
        cancellation_token: PipelineCancellationToken,
        has_error: Arc<AtomicBool>,
        errors: Arc<Mutex<VecDeque<Error>>>,
    ) -> Self {
        let pool_size = pool_size.max(1);
        let (sender, receiver) = async_channel::bounded::<BulkJob>(pool_size as usize);
        let counter = Arc::new(CompletionCounter::new());

        let mut join_handles = Vec::with_capacity(pool_size as usize);
        for worker_index in 0..pool_size {
            let stage = Stage::new(
                dyn_clone::clone_box(&**storage),
                receiver.clone(),
                counter.clone(),
                stats_sender.clone(),
                cancellation_token.clone(),
            );
            let worker = ObjectWorker::new(stage, worker_index);
            let has_error = has_error.clone();
            let error_list = errors.clone();

            join_handles.push(tokio::spawn(async move {
                let result = worker.run().await;
                match result {
                    Ok(_) => {}
                    Err(e) => {
                        log_error(has_error, error_list, e, "bulk worker failed.");
                    }
                }
            }));
        }

        debug!(
            pool_size = pool_size,
            bucket = storage.bucket(),
            "worker pool has been started."
        );

        Self {
            sender,
            counter,
            cancellation_token,
            join_handles,
        }
    }

    /// Blocks while the queue is full. The job is counted before it is
    /// enqueued, and uncounted again if it never makes it into the queue.
    pub async fn submit(&self, job: BulkJob) -> Result<SendResult> {
        let mut pending_job = PendingJob::new(&self.counter);

        tokio::select! {
            biased;

            _ = self.cancellation_token.cancelled() => Err(anyhow!(BulkError::Cancelled)),
            send_result = self.sender.send(job) => {
                match send_result {
                    Ok(_) => {
                        pending_job.enqueued();
                        Ok(SendResult::Success)
                    }
                    Err(_) => {
                        trace!("job queue has been closed.");
                        Ok(SendResult::Closed)
                    }
                }
            },
        }
    }

    /// Returns once every submitted job has finished. A failed job cancels
    /// the token before its completion is counted, so this never succeeds
    /// after a failure.
    pub async fn wait(&self) -> Result<()> {
        tokio::select! {
            biased;

            _ = self.cancellation_token.cancelled() => Err(anyhow!(BulkError::Cancelled)),
            _ = self.counter.wait() => {
                if self.cancellation_token.is_cancelled() {
                    return Err(anyhow!(BulkError::Cancelled));
                }
                Ok(())
            },
        }
    }

    pub fn in_flight(&self) -> usize {
        self.counter.outstanding()
    }

    pub fn queued(&self) -> usize {
        self.sender.len()
    }

    /// Closes the queue and joins the workers. Workers may be stuck in a
    /// store call after cancellation, so they are aborted instead.
    pub async fn shutdown(self) {
        self.sender.close();

        if self.cancellation_token.is_cancelled() {
            for join_handle in &self.join_handles {
                join_handle.abort();
            }
        }

        for join_handle in self.join_handles {
            let _ = join_handle.await;
        }

        trace!("worker pool has been shut down.");
    }
}

// Also covers a submit() future dropped while blocked on a full queue.
struct PendingJob<'a> {
    counter: &'a CompletionCounter,
    enqueued: bool,
}

impl<'a> PendingJob<'a> {
    fn new(counter: &'a CompletionCounter) -> Self {
        counter.add(1);
        Self {
            counter,
            enqueued: false,
        }
    }

    fn enqueued(&mut self) {
        self.enqueued = true;
    }
}

impl Drop for PendingJob<'_> {
    fn drop(&mut self) {
        if !self.enqueued {
            self.counter.done();
        }
    }
}
