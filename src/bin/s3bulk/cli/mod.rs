use anyhow::{Result, anyhow};
use tokio::time::Instant;
use tracing::{error, info, trace, warn};

use s3bulk::Config;
use s3bulk::pipeline::Pipeline;
use s3bulk::types::{BULK_SUMMARY_NAME, PipelineReport, create_pipeline_cancellation_token};

mod ctrl_c_handler;
mod indicator;
mod ui_config;

pub async fn run(config: Config) -> Result<()> {
    let cancellation_token = create_pipeline_cancellation_token();

    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = Instant::now();
    trace!("bulk pipeline start.");

    let mut pipeline = Pipeline::new(config.clone(), cancellation_token).await?;
    let indicator_join_handle = indicator::show_indicator(
        pipeline.get_stats_receiver(),
        ui_config::is_progress_indicator_needed(&config),
        ui_config::is_show_result_needed(&config),
    );

    pipeline.run().await;
    indicator_join_handle.await?;

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    if pipeline.has_error() {
        if let Some(errors) = pipeline.get_errors_and_consume() {
            for e in errors {
                eprintln!("{e:?}");
            }
        }
        error!(duration_sec = duration_sec, "s3bulk failed.");

        return Err(anyhow!("s3bulk failed."));
    }

    if pipeline.is_cancelled() {
        warn!(duration_sec = duration_sec, "s3bulk has been cancelled.");

        return Err(anyhow!("s3bulk has been cancelled."));
    }

    show_bulk_report_summary(&pipeline.get_report(), &duration_sec);

    trace!(duration_sec = duration_sec, "s3bulk has been completed.");

    Ok(())
}

fn show_bulk_report_summary(report: &PipelineReport, duration_sec: &str) {
    info!(
        name = BULK_SUMMARY_NAME,
        uploaded = report.uploaded,
        deleted = report.deleted,
        drain_iterations = report.drain_iterations,
        list_calls = report.list_calls,
        duration_sec = duration_sec,
    );
}

#[cfg(test)]
mod tests {
    use s3bulk::config::args::parse_from_args;

    use super::*;

    #[tokio::test]
    async fn run_pipeline_error() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "s3bulk",
            "--access-key",
            "dummy_access_key",
            "--secret-access-key",
            "dummy_secret_access_key",
            "--region",
            "us-east-1",
            "--aws-max-attempts",
            "1",
            "--endpoint-url",
            "https://invalid-s3-endpoint-url.6329313.local:65535",
            "--show-no-progress",
            "./src",
            "s3://invalid-bucket",
        ];
        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

        assert!(run(config).await.is_err());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
