// ─── Library Catalog ───
// Expands a resolved descriptor's libraries into concrete local paths and
// downloads for the current platform, in declaration order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, MOJANG_LIBRARIES};
use crate::core::rules::RuleContext;
use crate::core::version::{DownloadInfo, ExtractFlag, ExtractRules, LibraryEntry, VersionDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryKind {
    /// Goes on the classpath.
    Artifact,
    /// Platform-specific bundle, possibly unpacked into the natives directory.
    Native,
}

#[derive(Debug, Clone)]
pub struct ResolvedLibrary {
    /// Coordinate as declared in the descriptor.
    pub name: String,
    pub kind: LibraryKind,
    pub local_path: PathBuf,
    /// Where to fetch it from; `None` when the descriptor gives no URL.
    pub download: Option<DownloadInfo>,
    /// Set for natives that must be unpacked before launch.
    pub extract: Option<ExtractRules>,
}

/// Rule-filtered libraries in catalog order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedLibrarySet {
    pub entries: Vec<ResolvedLibrary>,
}

impl ResolvedLibrarySet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedLibrary> {
        self.entries.iter()
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &ResolvedLibrary> {
        self.entries
            .iter()
            .filter(|lib| lib.kind == LibraryKind::Artifact)
    }

    /// Natives flagged for extraction, in catalog order.
    pub fn extractable_natives(&self) -> impl Iterator<Item = &ResolvedLibrary> {
        self.entries
            .iter()
            .filter(|lib| lib.kind == LibraryKind::Native && lib.extract.is_some())
    }
}

pub struct LibraryCatalog {
    libraries_dir: PathBuf,
    ctx: RuleContext,
}

impl LibraryCatalog {
    pub fn new(libraries_dir: impl Into<PathBuf>, ctx: RuleContext) -> Self {
        Self {
            libraries_dir: libraries_dir.into(),
            ctx,
        }
    }

    pub fn expand(&self, descriptor: &VersionDescriptor) -> LauncherResult<ResolvedLibrarySet> {
        let mut set = ResolvedLibrarySet::default();
        let mut seen: HashSet<(LibraryKind, PathBuf)> = HashSet::new();

        for lib in &descriptor.libraries {
            if !lib.is_allowed(&self.ctx) {
                debug!("Skipping library (rules): {}", lib.name);
                continue;
            }

            for resolved in self.expand_entry(lib)? {
                if !seen.insert((resolved.kind, resolved.local_path.clone())) {
                    warn!(
                        "Duplicate library {} ({:?}) ignored",
                        resolved.name, resolved.kind
                    );
                    continue;
                }
                set.entries.push(resolved);
            }
        }

        info!(
            "Catalogued {} of {} libraries for {} ({} files)",
            descriptor
                .libraries
                .iter()
                .filter(|lib| lib.is_allowed(&self.ctx))
                .count(),
            descriptor.libraries.len(),
            descriptor.id,
            set.len()
        );
        Ok(set)
    }

    fn expand_entry(&self, lib: &LibraryEntry) -> LauncherResult<Vec<ResolvedLibrary>> {
        let mut out = Vec::with_capacity(2);
        let coordinate = MavenArtifact::parse(&lib.name);

        match &lib.downloads {
            Some(downloads) => {
                if let Some(info) = &downloads.artifact {
                    out.push(ResolvedLibrary {
                        name: lib.name.clone(),
                        kind: LibraryKind::Artifact,
                        local_path: self.artifact_path(lib, coordinate.as_ref().ok(), info)?,
                        download: Some(info.clone()),
                        extract: None,
                    });
                }
            }
            None => {
                // Loader-style entry: the coordinate plus an optional repository base.
                let artifact = coordinate
                    .as_ref()
                    .map_err(|_| LauncherError::InvalidMavenCoordinate(lib.name.clone()))?;
                let repo = lib.url.as_deref().unwrap_or(MOJANG_LIBRARIES);
                out.push(ResolvedLibrary {
                    name: lib.name.clone(),
                    kind: LibraryKind::Artifact,
                    local_path: self.libraries_dir.join(artifact.local_path()),
                    download: Some(DownloadInfo {
                        url: Some(artifact.url(repo)),
                        ..DownloadInfo::default()
                    }),
                    extract: None,
                });
            }
        }

        if let Some((classifier, info)) = lib.native_download(&self.ctx) {
            let artifact = coordinate
                .as_ref()
                .map_err(|_| LauncherError::InvalidMavenCoordinate(lib.name.clone()))?;
            out.push(ResolvedLibrary {
                name: lib.name.clone(),
                kind: LibraryKind::Native,
                local_path: self
                    .libraries_dir
                    .join(artifact.with_classifier(&classifier).local_path()),
                download: Some(info.clone()),
                extract: lib.extract.as_ref().and_then(ExtractFlag::rules),
            });
        }

        Ok(out)
    }

    /// Path derived from the coordinate; the descriptor's own `path` is only
    /// used when the coordinate cannot be parsed.
    fn artifact_path(
        &self,
        lib: &LibraryEntry,
        coordinate: Option<&MavenArtifact>,
        info: &DownloadInfo,
    ) -> LauncherResult<PathBuf> {
        if let Some(artifact) = coordinate {
            return Ok(self.libraries_dir.join(artifact.local_path()));
        }
        match info.path.as_deref().filter(|p| is_relative_inside(p)) {
            Some(path) => Ok(self.libraries_dir.join(path)),
            None => Err(LauncherError::InvalidMavenCoordinate(lib.name.clone())),
        }
    }
}

fn is_relative_inside(raw: &str) -> bool {
    let path = Path::new(raw);
    path.is_relative()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn linux() -> RuleContext {
        RuleContext {
            os_name: "linux".into(),
            os_version: "6.1".into(),
            arch: "x86_64".into(),
            features: HashMap::new(),
        }
    }

    fn descriptor(libraries: serde_json::Value) -> VersionDescriptor {
        serde_json::from_value(json!({ "id": "test", "libraries": libraries })).unwrap()
    }

    fn artifact(url: &str) -> serde_json::Value {
        json!({ "artifact": { "url": url, "sha1": "00", "size": 1 } })
    }

    #[test]
    fn artifact_paths_follow_coordinates_in_order() {
        let catalog = LibraryCatalog::new("/mc/libraries", linux());
        let set = catalog
            .expand(&descriptor(json!([
                { "name": "com.mojang:brigadier:1.2.9", "downloads": artifact("https://x/b.jar") },
                { "name": "net.sf.jopt-simple:jopt-simple:5.0.4", "downloads": artifact("https://x/j.jar") }
            ])))
            .unwrap();

        let paths: Vec<_> = set.iter().map(|l| l.local_path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/mc/libraries/com/mojang/brigadier/1.2.9/brigadier-1.2.9.jar"),
                PathBuf::from(
                    "/mc/libraries/net/sf/jopt-simple/jopt-simple/5.0.4/jopt-simple-5.0.4.jar"
                ),
            ]
        );
        assert!(set.iter().all(|l| l.kind == LibraryKind::Artifact));
    }

    #[test]
    fn rules_filter_entries() {
        let catalog = LibraryCatalog::new("/mc/libraries", linux());
        let set = catalog
            .expand(&descriptor(json!([
                { "name": "a:mac-only:1", "downloads": artifact("https://x/a.jar"),
                  "rules": [{ "action": "allow", "os": { "name": "osx" } }] },
                { "name": "a:not-windows:1", "downloads": artifact("https://x/b.jar"),
                  "rules": [{ "action": "disallow", "os": { "name": "windows" } }] }
            ])))
            .unwrap();

        let names: Vec<_> = set.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["a:not-windows:1"]);
    }

    #[test]
    fn natives_get_classifier_paths_and_extraction_flag() {
        let catalog = LibraryCatalog::new("/mc/libraries", linux());
        let set = catalog
            .expand(&descriptor(json!([
                { "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
                  "natives": { "linux": "natives-linux" },
                  "extract": { "exclude": ["META-INF/"] },
                  "downloads": {
                      "artifact": { "url": "https://x/p.jar", "sha1": "01", "size": 1 },
                      "classifiers": { "natives-linux": { "url": "https://x/p-linux.jar", "sha1": "02", "size": 2 } }
                  } },
                { "name": "org.lwjgl:lwjgl-glfw:3.3.3",
                  "downloads": {
                      "classifiers": { "natives-linux": { "url": "https://x/glfw-linux.jar" } }
                  } }
            ])))
            .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.entries[0].kind, LibraryKind::Artifact);
        assert_eq!(set.entries[1].kind, LibraryKind::Native);
        assert_eq!(
            set.entries[1].local_path,
            PathBuf::from(
                "/mc/libraries/org/lwjgl/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives-linux.jar"
            )
        );
        assert_eq!(
            set.entries[1].extract,
            Some(ExtractRules { exclude: vec!["META-INF/".into()] })
        );
        // Native without an extract flag stays a plain download.
        assert_eq!(set.entries[2].kind, LibraryKind::Native);
        assert!(set.entries[2].extract.is_none());

        let extractable: Vec<_> = set.extractable_natives().map(|l| l.name.as_str()).collect();
        assert_eq!(extractable, vec!["org.lwjgl.lwjgl:lwjgl-platform:2.9.4"]);
        assert_eq!(set.artifacts().count(), 1);
    }

    #[test]
    fn loader_entries_without_downloads_use_repository_url() {
        let catalog = LibraryCatalog::new("/mc/libraries", linux());
        let set = catalog
            .expand(&descriptor(json!([
                { "name": "net.fabricmc:sponge-mixin:0.12.5", "url": "https://maven.fabricmc.net/" },
                { "name": "com.example:plain:1.0" }
            ])))
            .unwrap();

        assert_eq!(
            set.entries[0].download.as_ref().unwrap().url(),
            Some("https://maven.fabricmc.net/net/fabricmc/sponge-mixin/0.12.5/sponge-mixin-0.12.5.jar")
        );
        assert_eq!(
            set.entries[1].download.as_ref().unwrap().url(),
            Some("https://libraries.minecraft.net/com/example/plain/1.0/plain-1.0.jar")
        );
    }

    #[test]
    fn duplicate_surviving_entries_keep_first() {
        let catalog = LibraryCatalog::new("/mc/libraries", linux());
        let set = catalog
            .expand(&descriptor(json!([
                { "name": "a:b:1", "downloads": artifact("https://first/b.jar") },
                { "name": "a:b:1", "downloads": artifact("https://second/b.jar") }
            ])))
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.entries[0].download.as_ref().unwrap().url(),
            Some("https://first/b.jar")
        );
    }

    #[test]
    fn unparsable_coordinate_falls_back_to_declared_path() {
        let catalog = LibraryCatalog::new("/mc/libraries", linux());
        let set = catalog
            .expand(&descriptor(json!([
                { "name": "weird-name",
                  "downloads": { "artifact": { "path": "custom/weird.jar", "url": "https://x/w.jar" } } }
            ])))
            .unwrap();
        assert_eq!(set.entries[0].local_path, PathBuf::from("/mc/libraries/custom/weird.jar"));

        let err = catalog
            .expand(&descriptor(json!([{ "name": "weird-name" }])))
            .unwrap_err();
        assert!(matches!(err, LauncherError::InvalidMavenCoordinate(_)));
    }
}
