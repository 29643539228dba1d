use std::future::Future;
use std::io;

use tokio::task::JoinHandle;
use tokio::{select, signal};
use tracing::{debug, error, warn};

use s3bulk::types::PipelineCancellationToken;

pub fn spawn_ctrl_c_handler(cancellation_token: PipelineCancellationToken) -> JoinHandle<()> {
    tokio::spawn(cancel_on_interrupt(cancellation_token, signal::ctrl_c()))
}

async fn cancel_on_interrupt<F>(cancellation_token: PipelineCancellationToken, interrupt: F)
where
    F: Future<Output = io::Result<()>>,
{
    select! {
        _ = cancellation_token.cancelled() => {
            debug!("cancellation_token canceled.")
        }
        result = interrupt => {
            match result {
                Ok(()) => {
                    warn!("ctrl-c received, in-flight requests will not be waited for.");
                    cancellation_token.cancel();
                }
                Err(e) => {
                    error!("failed to listen for ctrl-c signal: {e}");
                }
            }
        }
    }
}
