// ─── Launcher Configuration ───
// Paths, worker pool size, retry policy and JVM/window defaults for a launch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::downloader::RetryPolicy;
use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "LaunchCore";

/// Default number of parallel download workers.
pub const DEFAULT_WORKER_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 854,
            height: 480,
        }
    }
}

/// Everything the runtime assembler needs besides the version id and the
/// account. Persisted as JSON; every field falls back to its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Root of the installation (`libraries/`, `versions/`, `assets/`).
    pub game_dir: PathBuf,
    /// Where natives are unpacked for a launch. `None` means
    /// `versions/<id>/natives`, one directory per version.
    pub natives_dir: Option<PathBuf>,
    /// Java executable used by [`crate::RuntimeAssembler::command_for`].
    pub java_path: PathBuf,
    pub max_memory_mb: u32,
    pub window: WindowSize,
    pub worker_count: usize,
    pub retry: RetryPolicy,
    pub demo: bool,
    pub launcher_name: String,
    pub launcher_version: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            game_dir: default_game_dir(),
            natives_dir: None,
            java_path: PathBuf::from("java"),
            max_memory_mb: 2048,
            window: WindowSize::default(),
            worker_count: DEFAULT_WORKER_COUNT,
            retry: RetryPolicy::default(),
            demo: false,
            launcher_name: "LaunchCore".into(),
            launcher_version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

impl LauncherConfig {
    /// Configuration rooted at `game_dir`, everything else default.
    pub fn with_game_dir(game_dir: impl Into<PathBuf>) -> Self {
        Self {
            game_dir: game_dir.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> LauncherResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(LauncherError::io(path, e)),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| LauncherError::io(path, e))
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.game_dir.join("libraries")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.game_dir.join("versions")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.game_dir.join("assets")
    }

    pub fn effective_natives_dir(&self, version_id: &str) -> PathBuf {
        self.natives_dir
            .clone()
            .unwrap_or_else(|| self.versions_dir().join(version_id).join("natives"))
    }
}

fn default_game_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
