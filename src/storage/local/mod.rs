use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::Config;
use crate::types::UploadJob;
use crate::types::error::BulkError;

/// Walks a local directory and materializes one upload job per regular file.
///
/// The object key is the file name only, so files sharing a name in
/// different directories map to the same key. The later one in walk order
/// overwrites the earlier one in the bucket.
pub struct FileCollector {
    root: PathBuf,
    follow_symlinks: bool,
    guess_mime_type: bool,
}

impl FileCollector {
    pub fn new(root: &Path, follow_symlinks: bool, guess_mime_type: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            follow_symlinks,
            guess_mime_type,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.source_dir,
            config.follow_symlinks,
            !config.no_guess_mime_type,
        )
    }

    pub async fn collect(&self) -> Result<Vec<UploadJob>> {
        trace!(root = %self.root.display(), "collect local files has started.");

        if !tokio::fs::metadata(&self.root)
            .await
            .is_ok_and(|metadata| metadata.is_dir())
        {
            return Err(anyhow!(BulkError::SourceNotDirectory(
                self.root.to_string_lossy().to_string()
            )));
        }

        let mut jobs = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .unwrap_or_else(|| Path::new(""))
                    .to_string_lossy()
                    .to_string();
                anyhow!(e).context(format!("failed to walk local directory: {path}"))
            })?;

            if !is_regular_file(&entry) {
                continue;
            }

            jobs.push(self.build_upload_job(&entry).await?);
        }

        debug!(
            root = %self.root.display(),
            files = jobs.len(),
            "collect local files has been completed."
        );

        Ok(jobs)
    }

    async fn build_upload_job(&self, entry: &DirEntry) -> Result<UploadJob> {
        let path = entry.path();
        let key = entry.file_name().to_string_lossy().to_string();

        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read local file: {}", path.display()))?;

        let content_type = if self.guess_mime_type {
            mime_guess::from_path(path)
                .first_raw()
                .map(|mime| mime.to_string())
        } else {
            None
        };

        trace!(key = key, size = data.len(), "local file collected.");

        Ok(UploadJob::new(&key, data, content_type))
    }
}

// With follow_links(true), walkdir reports the type of the link target.
fn is_regular_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
}
