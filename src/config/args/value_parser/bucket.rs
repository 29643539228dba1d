use crate::types::error::BulkError;

const S3_SCHEME: &str = "s3://";
const MIN_BUCKET_NAME_LENGTH: usize = 3;
const MAX_BUCKET_NAME_LENGTH: usize = 63;

/// Accepts `bucket` or `s3://bucket[/]`. Prefixes are not supported.
pub fn check_bucket(bucket: &str) -> Result<String, String> {
    parse_bucket_name(bucket)
        .map(|_| bucket.to_string())
        .map_err(|e| e.to_string())
}

pub fn parse_bucket_name(bucket: &str) -> Result<String, BulkError> {
    let name = bucket.strip_prefix(S3_SCHEME).unwrap_or(bucket);
    let name = name.strip_suffix('/').unwrap_or(name);

    if name.len() < MIN_BUCKET_NAME_LENGTH
        || MAX_BUCKET_NAME_LENGTH < name.len()
        || name.contains('/')
        || !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.' || c == '_')
    {
        return Err(BulkError::InvalidBucketName(bucket.to_string()));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_bucket() {
        init_dummy_tracing_subscriber();

        assert_eq!(parse_bucket_name("my-bucket").unwrap(), "my-bucket");
        assert_eq!(parse_bucket_name("s3://my-bucket").unwrap(), "my-bucket");
        assert_eq!(parse_bucket_name("s3://my-bucket/").unwrap(), "my-bucket");
        assert_eq!(parse_bucket_name("my.bucket.01").unwrap(), "my.bucket.01");
        check_bucket("s3://my-bucket").unwrap();
    }

    #[test]
    fn invalid_bucket() {
        init_dummy_tracing_subscriber();

        assert_eq!(
            parse_bucket_name("s3://my-bucket/prefix").unwrap_err(),
            BulkError::InvalidBucketName("s3://my-bucket/prefix".to_string())
        );
        assert!(parse_bucket_name("").is_err());
        assert!(parse_bucket_name("s3://").is_err());
        assert!(parse_bucket_name("ab").is_err());
        assert!(parse_bucket_name("My-Bucket").is_err());
        assert!(check_bucket("bucket name").is_err());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
