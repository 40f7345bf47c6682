use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::cancel::CancelSignal;
use super::retry::{classify_error, RetryPolicy};
use super::task::DownloadTask;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::store;

/// How a task reached success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { bytes: u64 },
    /// The destination already matched; no request was made.
    Skipped,
}

/// Streaming, SHA-1 verified downloader for a single task at a time.
/// Batches go through [`super::DownloadScheduler`].
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    retry: RetryPolicy,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // ── Single task ─────────────────────────────────────

    /// Bring `task.dest` up to date, retrying transient failures.
    pub async fn download(
        &self,
        task: &DownloadTask,
        cancel: &CancelSignal,
    ) -> LauncherResult<DownloadOutcome> {
        if store::is_satisfied(&task.dest, task.sha1.as_deref(), task.size).await {
            debug!("Up to date: {:?}", task.dest);
            return Ok(DownloadOutcome::Skipped);
        }

        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(LauncherError::Cancelled);
            }

            let mut wait = cancel.clone();
            let result = tokio::select! {
                result = self.fetch(task, cancel) => result,
                _ = wait.cancelled() => {
                    let _ = tokio::fs::remove_file(store::partial_path(&task.dest)).await;
                    Err(LauncherError::Cancelled)
                }
            };

            let err = match result {
                Ok(bytes) => {
                    debug!("Downloaded: {} -> {:?} ({} bytes)", task.url, task.dest, bytes);
                    return Ok(DownloadOutcome::Downloaded { bytes });
                }
                Err(LauncherError::Cancelled) => return Err(LauncherError::Cancelled),
                Err(e) => e,
            };

            let Some(delay) = self.retry.next_delay(classify_error(&err), attempt) else {
                return Err(err);
            };
            warn!(
                "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                attempt,
                self.retry.max_attempts(),
                task.url,
                err,
                delay
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait.cancelled() => return Err(LauncherError::Cancelled),
            }
            attempt += 1;
        }
    }

    /// One attempt: stream into `<dest>.part`, move it into place, then verify.
    ///
    /// A file that fails verification stays at `dest`; the next run will not
    /// accept it and downloads it again.
    async fn fetch(&self, task: &DownloadTask, cancel: &CancelSignal) -> LauncherResult<u64> {
        store::ensure_parent(&task.dest).await?;

        let response = self.client.get(&task.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: task.url.clone(),
                status: status.as_u16(),
            });
        }

        let partial = store::partial_path(&task.dest);
        let (actual_sha1, written) = match stream_to(&partial, response, cancel).await {
            Ok(done) => done,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        store::commit(&partial, &task.dest).await?;

        if let Some(expected) = &task.sha1 {
            if !actual_sha1.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::Sha1Mismatch {
                    path: task.dest.clone(),
                    expected: expected.clone(),
                    actual: actual_sha1,
                });
            }
        }
        if let Some(expected) = task.size {
            if written != expected {
                return Err(LauncherError::SizeMismatch {
                    path: task.dest.clone(),
                    expected,
                    actual: written,
                });
            }
        }

        Ok(written)
    }
}

/// Write the body chunk by chunk, hashing as it goes. Returns the hex SHA-1
/// and the byte count.
async fn stream_to(
    partial: &Path,
    response: reqwest::Response,
    cancel: &CancelSignal,
) -> LauncherResult<(String, u64)> {
    let mut hasher = Sha1::new();
    let mut written = 0u64;

    // Scoped so the handle is closed before the rename (Windows).
    {
        let mut file = tokio::fs::File::create(partial)
            .await
            .map_err(|e| LauncherError::io(partial, e))?;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            if cancel.is_cancelled() {
                return Err(LauncherError::Cancelled);
            }
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io(partial, e))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| LauncherError::io(partial, e))?;
    }

    Ok((hex::encode(hasher.finalize()), written))
}
