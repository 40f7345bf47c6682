// ─── Classpath & Natives ───
// Both follow catalog order, never download completion order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::catalog::ResolvedLibrarySet;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::store;

/// Build the `-cp` value: the main jar first, then every artifact in
/// catalog order that exists on disk.
pub fn build_classpath(main_jar: &Path, libraries: &ResolvedLibrarySet, separator: &str) -> String {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(libraries.len() + 1);

    let main = safe_path_str(main_jar);
    seen.insert(main.clone());
    entries.push(main);

    for lib in libraries.artifacts() {
        if !lib.local_path.is_file() {
            warn!("Library missing from disk, left off classpath: {:?}", lib.local_path);
            continue;
        }
        let entry = safe_path_str(&lib.local_path);
        if seen.insert(entry.clone()) {
            entries.push(entry);
        }
    }

    debug!("Classpath has {} entries", entries.len());
    entries.join(separator)
}

/// Platform-specific Java classpath separator.
pub fn get_classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Recreate `natives_dir` and unpack every extraction-flagged native into
/// it, in catalog order. A later jar overwrites files of the same name
/// written by an earlier one.
pub async fn extract_natives(
    libraries: &ResolvedLibrarySet,
    natives_dir: &Path,
) -> LauncherResult<usize> {
    store::reset_dir(natives_dir).await?;

    let mut extracted = 0;
    for lib in libraries.extractable_natives() {
        if !lib.local_path.is_file() {
            warn!("Native jar missing, nothing extracted: {:?}", lib.local_path);
            continue;
        }

        let jar = lib.local_path.clone();
        let dest = natives_dir.to_path_buf();
        let exclude = lib
            .extract
            .as_ref()
            .map(|rules| rules.exclude.clone())
            .unwrap_or_default();

        extracted += tokio::task::spawn_blocking(move || unpack_jar(&jar, &dest, &exclude))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))??;
    }

    info!("Extracted {} native files into {:?}", extracted, natives_dir);
    Ok(extracted)
}

fn unpack_jar(jar: &Path, dest: &Path, exclude: &[String]) -> LauncherResult<usize> {
    let file = std::fs::File::open(jar).map_err(|e| LauncherError::io(jar, e))?;
    let mut archive = zip::ZipArchive::new(std::io::BufReader::new(file))?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if entry.is_dir() || exclude.iter().any(|prefix| name.starts_with(prefix.as_str())) {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe entry {:?} in {:?}", name, jar);
            continue;
        };

        let target: PathBuf = dest.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = std::fs::File::create(&target).map_err(|e| LauncherError::io(&target, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&target, e))?;
        debug!("Extracted native: {}", name);
        written += 1;
    }

    Ok(written)
}

/// Absolute form of `path` when it exists, without the `\\?\` prefix on Windows.
pub fn safe_path_str(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = resolved.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        // Java rejects extended-length paths on the classpath.
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}
