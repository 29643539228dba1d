use std::fmt;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;

pub const BULK_SUMMARY_NAME: &str = "SUMMARY";

/// Shared by the orchestrator, every worker pool and the Ctrl-C handler.
pub type PipelineCancellationToken = tokio_util::sync::CancellationToken;

pub fn create_pipeline_cancellation_token() -> PipelineCancellationToken {
    PipelineCancellationToken::new()
}

#[derive(Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub key: String,
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

impl UploadJob {
    pub fn new(key: &str, data: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            key: key.to_string(),
            data,
            content_type,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl Debug for UploadJob {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadJob")
            .field("key", &self.key)
            .field("size", &self.data.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteJob {
    pub key: String,
}

impl DeleteJob {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkJob {
    Upload(UploadJob),
    Delete(DeleteJob),
}

impl BulkJob {
    pub fn key(&self) -> &str {
        match self {
            Self::Upload(job) => &job.key,
            Self::Delete(job) => &job.key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upload(_) => "upload",
            Self::Delete(_) => "delete",
        }
    }
}

/// One response of a list call. `next_continuation_token` is set only when
/// the store reported the listing as truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub keys: Vec<String>,
    pub next_continuation_token: Option<String>,
}

impl ListingPage {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_truncated(&self) -> bool {
        self.next_continuation_token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkStatistics {
    UploadComplete {
        key: String,
        size: u64,
    },
    DeleteComplete {
        key: String,
    },
    UploadSummary {
        uploaded: u64,
        elapsed: Duration,
    },
    DrainIterationSummary {
        iteration: u64,
        deleted: u64,
        total_deleted: u64,
        elapsed: Duration,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseReport {
    pub objects: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub deleted: u64,
    pub iterations: u64,
    pub list_calls: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub uploaded: u64,
    pub deleted: u64,
    pub drain_iterations: u64,
    pub list_calls: u64,
}

#[derive(Debug, Clone)]
pub struct ClientConfigLocation {
    pub aws_config_file: Option<PathBuf>,
    pub aws_shared_credentials_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum S3Credentials {
    Profile(String),
    Credentials { access_keys: AccessKeys },
    FromEnvironment,
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}
