use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::cancel::CancelSignal;
use super::client::{DownloadOutcome, Downloader};
use super::task::{DownloadTask, FailedDownload};
use crate::core::error::LauncherError;

type TaskQueue = Arc<Mutex<VecDeque<DownloadTask>>>;

enum Report {
    Done(DownloadOutcome),
    Failed(FailedDownload),
}

/// Fixed pool of workers draining a shared queue of [`DownloadTask`]s.
///
/// Workers report every retired task over one channel to a single
/// collector, so the failure list has exactly one writer.
#[derive(Debug, Clone)]
pub struct DownloadScheduler {
    downloader: Arc<Downloader>,
    cancel: CancelSignal,
}

impl DownloadScheduler {
    pub fn new(downloader: Downloader) -> Self {
        Self {
            downloader: Arc::new(downloader),
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Run every task with `worker_count` parallel workers and return the
    /// failures. Returns only once every task was retired.
    pub async fn run(&self, tasks: Vec<DownloadTask>, worker_count: usize) -> Vec<FailedDownload> {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = worker_count.clamp(1, total);
        info!(
            "Starting batch download: {} files, workers={}",
            total, workers
        );

        let queue: TaskQueue = Arc::new(Mutex::new(tasks.into_iter().collect()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            pool.spawn(worker(
                worker_id,
                queue.clone(),
                self.downloader.clone(),
                self.cancel.clone(),
                tx.clone(),
            ));
        }
        drop(tx);

        let mut downloaded = 0usize;
        let mut skipped = 0usize;
        let mut failures = Vec::new();
        while let Some(report) = rx.recv().await {
            match report {
                Report::Done(DownloadOutcome::Downloaded { .. }) => downloaded += 1,
                Report::Done(DownloadOutcome::Skipped) => skipped += 1,
                Report::Failed(failed) => failures.push(failed),
            }
        }

        // Barrier: every worker has exited.
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                warn!("Download worker terminated abnormally: {}", e);
            }
        }

        // Only non-empty if a worker was aborted mid-batch.
        for task in drain(&queue) {
            failures.push(task.failed("download worker terminated"));
        }

        info!(
            "Batch finished: {} downloaded, {} up to date, {} failed",
            downloaded,
            skipped,
            failures.len()
        );
        failures
    }
}

async fn worker(
    worker_id: usize,
    queue: TaskQueue,
    downloader: Arc<Downloader>,
    cancel: CancelSignal,
    reports: mpsc::UnboundedSender<Report>,
) {
    while let Some(task) = next_task(&queue) {
        let report = if cancel.is_cancelled() {
            Report::Failed(task.failed(LauncherError::Cancelled))
        } else {
            retire(worker_id, &task, &downloader, &cancel).await
        };
        if reports.send(report).is_err() {
            break;
        }
    }
}

/// Download one task and run its hook. A panic in either is turned into a
/// failure for that task and the worker moves on.
async fn retire(
    worker_id: usize,
    task: &DownloadTask,
    downloader: &Downloader,
    cancel: &CancelSignal,
) -> Report {
    let work = AssertUnwindSafe(async {
        let outcome = downloader.download(task, cancel).await?;
        task.complete();
        Ok::<_, LauncherError>(outcome)
    });

    match work.catch_unwind().await {
        Ok(Ok(outcome)) => Report::Done(outcome),
        Ok(Err(e)) => {
            debug!("Worker {} failed {}: {}", worker_id, task.url, e);
            Report::Failed(task.failed(e))
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            warn!("Worker {} panicked on {}: {}", worker_id, task.url, reason);
            Report::Failed(task.failed(format!("download task panicked: {reason}")))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn next_task(queue: &TaskQueue) -> Option<DownloadTask> {
    queue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .pop_front()
}

fn drain(queue: &TaskQueue) -> Vec<DownloadTask> {
    queue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .drain(..)
        .collect()
}
