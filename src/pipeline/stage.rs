use std::sync::Arc;

use async_channel::{Receiver, Sender};

use crate::pipeline::completion_counter::CompletionCounter;
use crate::storage::Storage;
use crate::types::{BulkJob, BulkStatistics, PipelineCancellationToken};

/// Everything one worker of a pool needs.
pub struct Stage {
    pub storage: Storage,
    pub receiver: Receiver<BulkJob>,
    pub counter: Arc<CompletionCounter>,
    pub stats_sender: Sender<BulkStatistics>,
    pub cancellation_token: PipelineCancellationToken,
}

impl Stage {
    pub fn new(
        storage: Storage,
        receiver: Receiver<BulkJob>,
        counter: Arc<CompletionCounter>,
        stats_sender: Sender<BulkStatistics>,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        Self {
            storage,
            receiver,
            counter,
            stats_sender,
            cancellation_token,
        }
    }

    pub async fn send_stats(&self, stats: BulkStatistics) {
        // nobody may be watching the progress.
        let _ = self.stats_sender.send(stats).await;
    }
}
