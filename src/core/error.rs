use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::downloader::FailedDownload;

/// Central error type for the launcher core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── Resolution ──────────────────────────────────────
    #[error("Version {version_id} not found: {reason}")]
    VersionNotFound { version_id: String, reason: String },

    #[error("Cyclic inheritance detected: {}", .chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Size mismatch for {path:?}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    // ── Launch preparation ──────────────────────────────
    #[error(
        "Version {version_id}: {} required download(s) failed:\n{}",
        .failures.len(),
        FailureList(.failures)
    )]
    DownloadFailure {
        version_id: String,
        failures: Vec<FailedDownload>,
    },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Operation cancelled")]
    Cancelled,

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    /// Wrap an IO error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for post-download hash or size mismatches.
    pub fn is_verification(&self) -> bool {
        matches!(
            self,
            LauncherError::Sha1Mismatch { .. } | LauncherError::SizeMismatch { .. }
        )
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

struct FailureList<'a>(&'a [FailedDownload]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, failure) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", failure)?;
        }
        Ok(())
    }
}
