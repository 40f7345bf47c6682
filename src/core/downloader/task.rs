use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Callback run with the destination once a task succeeded or was skipped.
pub type CompletionHook = Arc<dyn Fn(&Path) + Send + Sync>;

/// A single file to fetch, with optional integrity expectations.
#[derive(Clone)]
pub struct DownloadTask {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    pub size: Option<u64>,
    /// A failed required task blocks the launch; optional ones are only logged.
    pub required: bool,
    pub on_complete: Option<CompletionHook>,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            sha1: None,
            size: None,
            required: true,
            on_complete: None,
        }
    }

    pub fn with_sha1(mut self, sha1: Option<String>) -> Self {
        self.sha1 = sha1.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn on_complete(mut self, hook: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    pub(crate) fn complete(&self) {
        if let Some(hook) = &self.on_complete {
            hook(&self.dest);
        }
    }

    pub(crate) fn failed(&self, error: impl ToString) -> FailedDownload {
        FailedDownload {
            url: self.url.clone(),
            path: self.dest.clone(),
            error: error.to_string(),
            required: self.required,
        }
    }
}

impl fmt::Debug for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadTask")
            .field("url", &self.url)
            .field("dest", &self.dest)
            .field("sha1", &self.sha1)
            .field("size", &self.size)
            .field("required", &self.required)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// A task that ended in failure after all attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    pub url: String,
    pub path: PathBuf,
    pub error: String,
    pub required: bool,
}

impl fmt::Display for FailedDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.url, self.path.display(), self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builder_defaults_to_required_and_drops_blank_hash() {
        let task = DownloadTask::new("https://example.com/a.jar", "/tmp/a.jar")
            .with_sha1(Some("  ".into()))
            .with_size(Some(3));
        assert!(task.required);
        assert!(task.sha1.is_none());
        assert_eq!(task.size, Some(3));
        assert!(!task.clone().optional().required);
    }

    #[test]
    fn completion_hook_receives_destination() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let task = DownloadTask::new("u", "/tmp/x.jar").on_complete(move |path| {
            assert_eq!(path, Path::new("/tmp/x.jar"));
            seen.fetch_add(1, Ordering::SeqCst);
        });
        task.complete();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(format!("{:?}", task).contains("on_complete: true"));
    }

    #[test]
    fn failure_display_names_url_path_and_error() {
        let failed = DownloadTask::new("https://example.com/a.jar", "/libs/a.jar").failed("HTTP 404");
        assert_eq!(
            failed.to_string(),
            "https://example.com/a.jar -> /libs/a.jar: HTTP 404"
        );
        assert!(failed.required);
    }
}
