use std::time::Instant;

use anyhow::{Result, anyhow};
use async_channel::Sender;
use tracing::{debug, info, trace};

use crate::pipeline::worker_pool::{SendResult, WorkerPool};
use crate::storage::Storage;
use crate::types::error::BulkError;
use crate::types::{
    BulkJob, BulkStatistics, DeleteJob, DrainReport, ListingPage, PipelineCancellationToken,
};

#[derive(Debug, PartialEq)]
enum DrainState {
    Listing { continuation_token: Option<String> },
    Enqueueing(ListingPage),
    Waiting,
    Done,
}

/// Deletes objects until a listing comes back empty.
///
/// One iteration lists, enqueues every listed key and then waits for the
/// pool to go idle before listing again from the start. With pagination the
/// iteration follows continuation tokens first. Either way a bucket holding
/// K non-empty pages costs K+1 list calls.
pub struct ObjectDrainer {
    storage: Storage,
    pool: WorkerPool,
    stats_sender: Sender<BulkStatistics>,
    cancellation_token: PipelineCancellationToken,
    max_keys: i32,
    follow_pagination: bool,
}

impl ObjectDrainer {
    pub fn new(
        storage: Storage,
        pool: WorkerPool,
        stats_sender: Sender<BulkStatistics>,
        cancellation_token: PipelineCancellationToken,
        max_keys: i32,
        follow_pagination: bool,
    ) -> Self {
        Self {
            storage,
            pool,
            stats_sender,
            cancellation_token,
            max_keys,
            follow_pagination,
        }
    }

    /// The pool is shut down in every case.
    pub async fn drain(self) -> Result<DrainReport> {
        let result = self.run_state_machine().await;
        self.pool.shutdown().await;

        result
    }

    async fn run_state_machine(&self) -> Result<DrainReport> {
        trace!(
            bucket = self.storage.bucket(),
            follow_pagination = self.follow_pagination,
            "drain phase has started."
        );

        let start_time = Instant::now();
        let mut report = DrainReport::default();
        let mut enqueued_in_iteration: u64 = 0;

        let mut state = DrainState::Listing {
            continuation_token: None,
        };

        loop {
            if self.cancellation_token.is_cancelled() {
                return Err(anyhow!(BulkError::Cancelled));
            }

            state = match state {
                DrainState::Listing { continuation_token } => {
                    let page = self
                        .storage
                        .list_objects(continuation_token, self.max_keys)
                        .await?;
                    report.list_calls += 1;

                    debug!(
                        objects = page.len(),
                        truncated = page.is_truncated(),
                        list_calls = report.list_calls,
                        "listing page received."
                    );

                    next_state_after_listing(page, enqueued_in_iteration)
                }
                DrainState::Enqueueing(page) => {
                    let ListingPage {
                        keys,
                        next_continuation_token,
                    } = page;

                    for key in keys {
                        let job = BulkJob::Delete(DeleteJob::new(&key));
                        if self.pool.submit(job).await? == SendResult::Closed {
                            return Err(anyhow!(BulkError::Cancelled));
                        }
                        enqueued_in_iteration += 1;
                    }

                    match next_continuation_token {
                        Some(continuation_token) if self.follow_pagination => {
                            DrainState::Listing {
                                continuation_token: Some(continuation_token),
                            }
                        }
                        _ => DrainState::Waiting,
                    }
                }
                DrainState::Waiting => {
                    self.pool.wait().await?;

                    report.iterations += 1;
                    report.deleted += enqueued_in_iteration;

                    let elapsed = start_time.elapsed();
                    info!(
                        iteration = report.iterations,
                        deleted = enqueued_in_iteration,
                        total_deleted = report.deleted,
                        elapsed_sec = elapsed.as_secs_f64(),
                        "Deleted {} files [concurrently] in {:.2} seconds",
                        report.deleted,
                        elapsed.as_secs_f64()
                    );

                    let _ = self
                        .stats_sender
                        .send(BulkStatistics::DrainIterationSummary {
                            iteration: report.iterations,
                            deleted: enqueued_in_iteration,
                            total_deleted: report.deleted,
                            elapsed,
                        })
                        .await;

                    enqueued_in_iteration = 0;

                    DrainState::Listing {
                        continuation_token: None,
                    }
                }
                DrainState::Done => break,
            };

            trace!(state = ?state, "drain state has changed.");
        }

        report.elapsed = start_time.elapsed();

        debug!(
            deleted = report.deleted,
            iterations = report.iterations,
            list_calls = report.list_calls,
            "drain phase has been completed."
        );

        Ok(report)
    }
}

// An empty page still carrying a token may be followed by non-empty ones.
fn next_state_after_listing(page: ListingPage, enqueued_in_iteration: u64) -> DrainState {
    if !page.is_empty() {
        return DrainState::Enqueueing(page);
    }

    if let Some(continuation_token) = page.next_continuation_token {
        return DrainState::Listing {
            continuation_token: Some(continuation_token),
        };
    }

    if enqueued_in_iteration == 0 {
        DrainState::Done
    } else {
        DrainState::Waiting
    }
}
