use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BulkError {
    #[error("cancelled")]
    Cancelled,
    #[error("source must be a directory: {0}")]
    SourceNotDirectory(String),
    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),
}

pub fn is_cancelled_error(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<BulkError>(), Some(BulkError::Cancelled))
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn cancelled_error_is_detected() {
        assert!(is_cancelled_error(&anyhow!(BulkError::Cancelled)));
        assert!(!is_cancelled_error(&anyhow!(BulkError::InvalidBucketName(
            "a/b".to_string()
        ))));
        assert!(!is_cancelled_error(&anyhow!("other error")));
    }
}
