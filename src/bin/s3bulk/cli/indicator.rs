use std::io;
use std::io::Write;

use async_channel::Receiver;
use indicatif::{HumanBytes, HumanCount, HumanDuration, ProgressBar, ProgressStyle};
use s3bulk::types::BulkStatistics;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const REFRESH_INTERVAL: f32 = 1.0;

/// Per-object lines belong to the progress display. Phase summaries are
/// printed whenever results are shown.
#[derive(Debug, PartialEq)]
enum ConsoleLine {
    Object(String),
    Summary(String),
}

impl ConsoleLine {
    fn printable(self, show_progress: bool, show_result: bool) -> Option<String> {
        match self {
            ConsoleLine::Object(line) if show_progress => Some(line),
            ConsoleLine::Summary(line) if show_progress || show_result => Some(line),
            _ => None,
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct IndicatorTotals {
    uploaded: u64,
    uploaded_bytes: u64,
    deleted: u64,
    drain_iterations: u64,
}

impl IndicatorTotals {
    fn apply(&mut self, stats: BulkStatistics) -> ConsoleLine {
        match stats {
            BulkStatistics::UploadComplete { key, size } => {
                self.uploaded += 1;
                self.uploaded_bytes += size;
                ConsoleLine::Object(format!("uploaded {key}"))
            }
            BulkStatistics::DeleteComplete { key } => {
                self.deleted += 1;
                ConsoleLine::Object(format!("deleted {key}"))
            }
            BulkStatistics::UploadSummary { uploaded, elapsed } => ConsoleLine::Summary(format!(
                "Uploaded {uploaded} files [concurrently] in {:.2} seconds",
                elapsed.as_secs_f64()
            )),
            BulkStatistics::DrainIterationSummary {
                iteration,
                total_deleted,
                elapsed,
                ..
            } => {
                self.drain_iterations = iteration;
                ConsoleLine::Summary(format!(
                    "Deleted {total_deleted} files [concurrently] in {:.2} seconds",
                    elapsed.as_secs_f64()
                ))
            }
        }
    }
}

pub fn show_indicator(
    stats_receiver: Receiver<BulkStatistics>,
    show_progress: bool,
    show_result: bool,
) -> JoinHandle<()> {
    let progress_text = ProgressBar::new(0);
    if let Ok(progress_style) = ProgressStyle::with_template("{wide_msg}") {
        progress_text.set_style(progress_style);
    }

    tokio::spawn(async move {
        let start_time = Instant::now();
        let mut totals = IndicatorTotals::default();

        loop {
            let period = Instant::now();
            loop {
                while let Ok(stats) = stats_receiver.try_recv() {
                    let line = totals.apply(stats).printable(show_progress, show_result);
                    if let Some(line) = line {
                        progress_text.suspend(|| println!("{line}"));
                    }
                }

                if REFRESH_INTERVAL < period.elapsed().as_secs_f32() {
                    break;
                }

                if stats_receiver.is_closed() && stats_receiver.is_empty() {
                    if show_result {
                        if let Ok(progress_style) = ProgressStyle::with_template("{msg}") {
                            progress_text.set_style(progress_style);
                        }

                        progress_text.finish_with_message(format!(
                            "{:>3} | uploaded {} objects,  deleted {} objects,  drain iterations {},  duration {}",
                            HumanBytes(totals.uploaded_bytes),
                            HumanCount(totals.uploaded),
                            HumanCount(totals.deleted),
                            totals.drain_iterations,
                            HumanDuration(start_time.elapsed()),
                        ));

                        println!();
                        let _ = io::stdout().flush();
                    }

                    return;
                }

                tokio::time::sleep(std::time::Duration::from_secs_f32(0.05)).await;
            }

            if show_progress {
                progress_text.set_message(format!(
                    "{:>3} | uploaded {} objects,  deleted {} objects",
                    HumanBytes(totals.uploaded_bytes),
                    HumanCount(totals.uploaded),
                    HumanCount(totals.deleted),
                ));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const WAITING_TIME_MILLIS_FOR_ASYNC_INDICATOR_SET_MESSAGE: u64 = 1500;

    #[test]
    fn totals_are_accumulated() {
        let mut totals = IndicatorTotals::default();

        assert_eq!(
            totals.apply(BulkStatistics::UploadComplete {
                key: "data1".to_string(),
                size: 5,
            }),
            ConsoleLine::Object("uploaded data1".to_string())
        );
        assert_eq!(
            totals.apply(BulkStatistics::UploadSummary {
                uploaded: 1,
                elapsed: Duration::from_millis(1500),
            }),
            ConsoleLine::Summary("Uploaded 1 files [concurrently] in 1.50 seconds".to_string())
        );
        assert_eq!(
            totals.apply(BulkStatistics::DeleteComplete {
                key: "data1".to_string(),
            }),
            ConsoleLine::Object("deleted data1".to_string())
        );
        assert_eq!(
            totals.apply(BulkStatistics::DrainIterationSummary {
                iteration: 1,
                deleted: 1,
                total_deleted: 1,
                elapsed: Duration::from_millis(250),
            }),
            ConsoleLine::Summary("Deleted 1 files [concurrently] in 0.25 seconds".to_string())
        );

        assert_eq!(
            totals,
            IndicatorTotals {
                uploaded: 1,
                uploaded_bytes: 5,
                deleted: 1,
                drain_iterations: 1,
            }
        );
    }

    #[test]
    fn summary_lines_survive_without_progress() {
        let object_line = || ConsoleLine::Object("deleted data1".to_string());
        let summary_line = || ConsoleLine::Summary("Deleted 1 files".to_string());

        assert_eq!(
            object_line().printable(true, true),
            Some("deleted data1".to_string())
        );
        assert_eq!(object_line().printable(false, true), None);

        assert_eq!(
            summary_line().printable(false, true),
            Some("Deleted 1 files".to_string())
        );
        assert_eq!(
            summary_line().printable(true, false),
            Some("Deleted 1 files".to_string())
        );
        assert_eq!(summary_line().printable(false, false), None);
    }

    #[tokio::test]
    async fn indicator_test_show_summary_only() {
        init_dummy_tracing_subscriber();

        let (stats_sender, stats_receiver) = async_channel::unbounded();
        let join_handle = show_indicator(stats_receiver, false, true);

        send_all_statistics(&stats_sender).await;
        stats_sender.close();

        join_handle.await.unwrap();
    }

    #[tokio::test]
    async fn indicator_test_show_result() {
        init_dummy_tracing_subscriber();

        let (stats_sender, stats_receiver) = async_channel::unbounded();
        let join_handle = show_indicator(stats_receiver, true, true);

        send_all_statistics(&stats_sender).await;

        tokio::time::sleep(Duration::from_millis(
            WAITING_TIME_MILLIS_FOR_ASYNC_INDICATOR_SET_MESSAGE,
        ))
        .await;
        stats_sender.close();

        join_handle.await.unwrap();
    }

    #[tokio::test]
    async fn indicator_test_show_no_result() {
        init_dummy_tracing_subscriber();

        let (stats_sender, stats_receiver) = async_channel::unbounded();
        let join_handle = show_indicator(stats_receiver, false, false);

        send_all_statistics(&stats_sender).await;
        stats_sender.close();

        join_handle.await.unwrap();
    }

    async fn send_all_statistics(stats_sender: &async_channel::Sender<BulkStatistics>) {
        stats_sender
            .send(BulkStatistics::UploadComplete {
                key: "test".to_string(),
                size: 1,
            })
            .await
            .unwrap();
        stats_sender
            .send(BulkStatistics::UploadSummary {
                uploaded: 1,
                elapsed: Duration::from_millis(10),
            })
            .await
            .unwrap();
        stats_sender
            .send(BulkStatistics::DeleteComplete {
                key: "test".to_string(),
            })
            .await
            .unwrap();
        stats_sender
            .send(BulkStatistics::DrainIterationSummary {
                iteration: 1,
                deleted: 1,
                total_deleted: 1,
                elapsed: Duration::from_millis(20),
            })
            .await
            .unwrap();
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
