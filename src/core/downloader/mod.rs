pub mod cancel;
pub mod client;
pub mod retry;
pub mod scheduler;
pub mod task;

pub use cancel::{CancelHandle, CancelSignal};
pub use client::{DownloadOutcome, Downloader};
pub use retry::RetryPolicy;
pub use scheduler::DownloadScheduler;
pub use task::{DownloadTask, FailedDownload};
