use tokio::sync::watch;
use tracing::error;

/// Counts outstanding jobs of a phase.
///
/// `add()` must be called before the job is enqueued and `done()` after it
/// has finished, so `wait()` can never observe zero while a job is in flight.
#[derive(Debug)]
pub struct CompletionCounter {
    outstanding: watch::Sender<usize>,
}

impl Default for CompletionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionCounter {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self { outstanding }
    }

    pub fn add(&self, count: usize) {
        self.outstanding.send_modify(|outstanding| *outstanding += count);
    }

    pub fn done(&self) {
        self.outstanding.send_modify(|outstanding| {
            if *outstanding == 0 {
                error!("completion counter has been decremented below zero.");
                return;
            }
            *outstanding -= 1;
        });
    }

    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    pub async fn wait(&self) {
        let mut receiver = self.outstanding.subscribe();
        // the sender lives in self, so the channel cannot be closed here.
        let _ = receiver.wait_for(|outstanding| *outstanding == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_without_jobs() {
        init_dummy_tracing_subscriber();

        let counter = CompletionCounter::new();
        tokio::time::timeout(Duration::from_secs(1), counter.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn wait_returns_after_all_done() {
        init_dummy_tracing_subscriber();

        let counter = Arc::new(CompletionCounter::new());
        counter.add(100);

        let mut join_handles = Vec::new();
        for _ in 0..100 {
            let counter = counter.clone();
            join_handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.done();
            }));
        }

        tokio::time::timeout(Duration::from_secs(10), counter.wait())
            .await
            .unwrap();
        assert_eq!(counter.outstanding(), 0);

        for join_handle in join_handles {
            join_handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn wait_blocks_while_outstanding() {
        init_dummy_tracing_subscriber();

        let counter = CompletionCounter::new();
        counter.add(2);
        counter.done();

        assert_eq!(counter.outstanding(), 1);
        assert!(
            tokio::time::timeout(Duration::from_millis(200), counter.wait())
                .await
                .is_err()
        );

        counter.done();
        tokio::time::timeout(Duration::from_secs(1), counter.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn done_without_add_does_not_underflow() {
        init_dummy_tracing_subscriber();

        let counter = CompletionCounter::new();
        counter.done();

        assert_eq!(counter.outstanding(), 0);
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
