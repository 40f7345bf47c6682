// ─── Artifact Store ───
// Filesystem layout of an installation plus integrity checks and atomic writes.
//
//   <root>/libraries/<group>/<artifact>/<version>/<artifact>-<version>[-<classifier>].jar
//   <root>/versions/<id>/<id>.json, <id>.jar
//   <root>/assets/indexes/<asset index id>.json

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::core::config::LauncherConfig;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::MavenArtifact;

const HASH_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &LauncherConfig) -> Self {
        Self::new(config.game_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn library_path(&self, artifact: &MavenArtifact) -> PathBuf {
        self.libraries_dir().join(artifact.local_path())
    }

    pub fn version_json_path(&self, version_id: &str) -> PathBuf {
        self.versions_dir()
            .join(version_id)
            .join(format!("{}.json", version_id))
    }

    pub fn version_jar_path(&self, version_id: &str) -> PathBuf {
        self.versions_dir()
            .join(version_id)
            .join(format!("{}.jar", version_id))
    }

    pub fn asset_index_path(&self, index_id: &str) -> PathBuf {
        self.assets_dir()
            .join("indexes")
            .join(format!("{}.json", index_id))
    }

    /// Raw descriptor JSON for `version_id`, or `None` when the file is absent.
    pub async fn read_version_json(&self, version_id: &str) -> LauncherResult<Option<String>> {
        let path = self.version_json_path(version_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LauncherError::io(path, e)),
        }
    }

    /// Persist a descriptor under `versions/<id>/<id>.json`.
    pub async fn write_version_json(&self, version_id: &str, raw: &str) -> LauncherResult<()> {
        write_atomic(&self.version_json_path(version_id), raw.as_bytes()).await
    }
}

/// Hex SHA-1 of a file, read in fixed-size chunks.
pub async fn sha1_file(path: &Path) -> LauncherResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut buf)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Whether an existing file can stand in for a download.
///
/// The hash decides when one is expected; the size is only consulted when
/// there is no hash. With neither, any existing file is accepted: files only
/// appear at their final path through [`commit`].
pub async fn is_satisfied(path: &Path, sha1: Option<&str>, size: Option<u64>) -> bool {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => m,
        _ => return false,
    };

    if let Some(expected) = sha1 {
        return match sha1_file(path).await {
            Ok(actual) => actual.eq_ignore_ascii_case(expected),
            Err(e) => {
                debug!("Cannot hash {:?}: {}", path, e);
                false
            }
        };
    }

    match size {
        Some(expected) => metadata.len() == expected,
        None => true,
    }
}

/// Sibling path a download is streamed into before it is moved into place.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    dest.with_file_name(name)
}

/// Create the parent directory of `path` if it is missing.
pub async fn ensure_parent(path: &Path) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    Ok(())
}

/// Move a completed partial file over `dest`.
pub async fn commit(partial: &Path, dest: &Path) -> LauncherResult<()> {
    tokio::fs::rename(partial, dest)
        .await
        .map_err(|e| LauncherError::io(dest, e))
}

/// Write `bytes` to `path` without ever exposing a half-written file.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> LauncherResult<()> {
    ensure_parent(path).await?;
    let partial = partial_path(path);
    tokio::fs::write(&partial, bytes)
        .await
        .map_err(|e| LauncherError::io(&partial, e))?;
    commit(&partial, path).await
}

/// Remove everything under `dir` and recreate it empty.
pub async fn reset_dir(dir: &Path) -> LauncherResult<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(LauncherError::io(dir, e)),
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| LauncherError::io(dir, e))
}
