use anyhow::{Context, Result};
use tracing::{error, info, trace};

use crate::types::BulkStatistics::{DeleteComplete, UploadComplete};
use crate::types::{BulkJob, DeleteJob, UploadJob};

use super::stage::Stage;

pub struct ObjectWorker {
    worker_index: u16,
    base: Stage,
}

impl ObjectWorker {
    pub fn new(base: Stage, worker_index: u16) -> Self {
        Self { base, worker_index }
    }

    pub async fn run(&self) -> Result<()> {
        trace!(worker_index = self.worker_index, "worker has been started.");
        self.receive_and_process().await
    }

    async fn receive_and_process(&self) -> Result<()> {
        loop {
            tokio::select! {
                biased;

                _ = self.base.cancellation_token.cancelled() => {
                    info!(worker_index = self.worker_index, "worker has been cancelled.");
                    return Ok(());
                }
                recv_result = self.base.receiver.recv() => {
                    match recv_result {
                        Ok(job) => {
                            let kind = job.kind();
                            let key = job.key().to_string();

                            let result = self.process(job).await;

                            // The token must fire before the counter can reach zero.
                            if let Err(e) = result {
                                self.base.cancellation_token.cancel();
                                self.base.counter.done();
                                error!(
                                    worker_index = self.worker_index,
                                    kind = kind,
                                    key = key,
                                    "worker has been cancelled with error."
                                );
                                return Err(e);
                            }

                            self.base.counter.done();
                        },
                        Err(_) => {
                            // normal shutdown
                            trace!(worker_index = self.worker_index, "worker has been completed.");
                            break;
                        }
                    }
                },
            }
        }

        Ok(())
    }

    async fn process(&self, job: BulkJob) -> Result<()> {
        match job {
            BulkJob::Upload(job) => self.upload(job).await,
            BulkJob::Delete(job) => self.delete(job).await,
        }
    }

    async fn upload(&self, job: UploadJob) -> Result<()> {
        let size = job.size();
        let key = job.key;

        self.base
            .storage
            .put_object(&key, job.data, job.content_type)
            .await
            .with_context(|| format!("upload object failed. key={key}"))?;

        info!(
            worker_index = self.worker_index,
            bucket = self.base.storage.bucket(),
            key = key,
            size = size,
            "upload completed."
        );

        self.base.send_stats(UploadComplete { key, size }).await;

        Ok(())
    }

    async fn delete(&self, job: DeleteJob) -> Result<()> {
        self.base
            .storage
            .delete_object(&job.key)
            .await
            .with_context(|| format!("delete object failed. key={}", job.key))?;

        info!(
            worker_index = self.worker_index,
            bucket = self.base.storage.bucket(),
            key = job.key,
            "delete completed."
        );

        self.base.send_stats(DeleteComplete { key: job.key }).await;

        Ok(())
    }
}
