//! Parallel download of remote images (catalog icons, listing logos) into a
//! local cache directory.

use crate::progress::ProgressMonitor;
use crate::tasks::{ConcurrentTaskManager, TaskError, TaskManagerConfig};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to download {url}: {message}")]
    Download { url: String, message: String },
    #[error("failed to write resource {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Fetches the bytes behind a URL. Called from worker threads.
pub trait ResourceRetriever: Send + Sync {
    fn retrieve(&self, url: &str) -> Result<Vec<u8>, ResourceError>;
}

/// Downloads batches of resources through a bounded task pool.
pub struct ResourceFetcher {
    retriever: Arc<dyn ResourceRetriever>,
    cache_dir: PathBuf,
    max_threads: usize,
    task_config: TaskManagerConfig,
}

impl ResourceFetcher {
    pub fn new(retriever: Arc<dyn ResourceRetriever>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            retriever,
            cache_dir: cache_dir.into(),
            max_threads: crate::tasks::MAX_THREADS,
            task_config: TaskManagerConfig::default(),
        }
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub fn with_task_config(mut self, config: TaskManagerConfig) -> Self {
        self.task_config = config;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Local file a resource is stored under. Stable for a given URL.
    pub fn resource_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(resource_file_name(url))
    }

    /// Downloads every URL not already cached. Returns the local paths in the
    /// order of `urls`. Fails after all downloads have been attempted if any
    /// of them failed.
    pub fn fetch_all(
        &self,
        urls: &[String],
        monitor: &dyn ProgressMonitor,
    ) -> Result<Vec<PathBuf>, TaskError> {
        let paths: Vec<PathBuf> = urls.iter().map(|url| self.resource_path(url)).collect();
        // one download per cache file; duplicates would race on the same `.part`
        let mut queued = HashSet::new();
        let missing: Vec<(String, PathBuf)> = urls
            .iter()
            .cloned()
            .zip(paths.iter().cloned())
            .filter(|(_, path)| !path.exists() && queued.insert(path.clone()))
            .collect();
        if missing.is_empty() {
            return Ok(paths);
        }

        fs::create_dir_all(&self.cache_dir).map_err(|source| {
            TaskError::Failed(crate::status::Status::from_error(ResourceError::Write {
                path: self.cache_dir.clone(),
                source,
            }))
        })?;

        let threads = self.max_threads.min(missing.len());
        let mut manager =
            ConcurrentTaskManager::with_config(threads, "resource-fetch", self.task_config)?;
        for (url, path) in missing {
            let retriever = Arc::clone(&self.retriever);
            manager.submit(url.clone(), move || download(retriever.as_ref(), &url, &path))?;
        }
        manager.wait_until_finished(monitor)?;
        Ok(paths)
    }
}

fn download(
    retriever: &dyn ResourceRetriever,
    url: &str,
    path: &Path,
) -> Result<(), ResourceError> {
    let bytes = retriever.retrieve(url)?;
    // write then rename so a cancelled download never leaves a partial file
    let partial = path.with_extension("part");
    fs::write(&partial, &bytes).map_err(|source| ResourceError::Write {
        path: partial.clone(),
        source,
    })?;
    fs::rename(&partial, path).map_err(|source| ResourceError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(url, path = %path.display(), size = bytes.len(), "resource cached");
    Ok(())
}

/// Hex SHA-256 of the URL, keeping a short alphanumeric extension if the URL
/// path has one.
pub fn resource_file_name(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    let extension = url
        .split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });
    match extension {
        Some(ext) => format!("{digest}.{}", ext.to_ascii_lowercase()),
        None => digest,
    }
}
