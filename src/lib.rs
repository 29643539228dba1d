/*!
# Overview
s3bulk uploads every file of a local directory tree to an S3(or S3-compatible) bucket,
then deletes the contents of a bucket until a listing comes back empty.

Both phases run on a fixed-size pool of concurrent workers fed by a bounded queue,
so memory stays bounded no matter how many objects are involved.

## Behavior
- Upload
  Every regular file under the source directory is uploaded with its file name as the key.
  Files sharing a name in different directories map to the same key, and the last one wins.
  `Content-Type` is guessed from the file extension unless `--no-guess-mime-type` is given.

- Drain
  The bucket is listed, every listed key is deleted, and the listing is repeated from the
  start once all deletes have been acknowledged. The drain ends when a listing returns no keys.
  By default continuation tokens are followed inside one listing pass.
  `--single-page-listing` lists a single page per pass instead.

- Failure
  The first failed request cancels the running phase. The drain never starts after a failed upload.

## As a library
s3bulk CLI is a thin wrapper of the s3bulk library.

Example usage
=============

```no_run
use s3bulk::config::Config;
use s3bulk::config::args::parse_from_args;
use s3bulk::pipeline::Pipeline;
use s3bulk::types::{BulkStatistics, create_pipeline_cancellation_token};

#[tokio::main]
async fn main() {
    let args = vec!["program_name", "--worker-size", "16", "./upload_dir", "s3://my-bucket"];

    let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
    let cancellation_token = create_pipeline_cancellation_token();

    let mut pipeline = Pipeline::new(config, cancellation_token).await.unwrap();
    pipeline.run().await;

    let stats_receiver = pipeline.get_stats_receiver();
    while let Ok(stats) = stats_receiver.recv().await {
        if let BulkStatistics::DrainIterationSummary { total_deleted, .. } = stats {
            println!("deleted so far: {total_deleted}");
        }
    }

    if pipeline.has_error() {
        println!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
    }
}
```
*/
pub use config::Config;
pub use config::args::CLIArgs;
pub mod config;
pub mod pipeline;
pub mod storage;
pub mod types;
