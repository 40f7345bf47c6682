use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::core::error::{LauncherError, LauncherResult};

/// A parsed library coordinate.
///
/// Supported formats:
///   `group:artifact:version`
///   `group:artifact:version:classifier`
///   either of the above with an `@extension` suffix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    /// File extension. Defaults to `"jar"`.
    pub extension: String,
}

impl MavenArtifact {
    /// Parse a coordinate string.
    ///
    /// # Examples
    /// ```
    /// use launch_core::core::maven::MavenArtifact;
    ///
    /// let a = MavenArtifact::parse("net.sf.jopt-simple:jopt-simple:5.0.4").unwrap();
    /// assert_eq!(a.group_id, "net.sf.jopt-simple");
    /// ```
    pub fn parse(coord: &str) -> LauncherResult<Self> {
        let coord = coord.trim();
        let (coord_part, extension) = match coord.rsplit_once('@') {
            Some((head, ext)) if !ext.is_empty() => (head, ext),
            _ => (coord, "jar"),
        };

        let parts: Vec<&str> = coord_part.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(LauncherError::InvalidMavenCoordinate(coord.to_string()));
        }

        let classifier = match parts.len() {
            3 => None,
            4 => Some(parts[3].to_string()),
            _ => return Err(LauncherError::InvalidMavenCoordinate(coord.to_string())),
        };

        Ok(Self {
            group_id: parts[0].to_string(),
            artifact_id: parts[1].to_string(),
            version: parts[2].to_string(),
            classifier,
            extension: extension.to_string(),
        })
    }

    /// Same coordinate with a different classifier (e.g. `natives-linux`).
    pub fn with_classifier(&self, classifier: &str) -> Self {
        let mut clone = self.clone();
        clone.classifier = Some(classifier.to_string());
        clone
    }

    /// Identity of a library independent of its version:
    /// `group:artifact[:classifier]`. Two entries with the same key are the
    /// same library, so a later one overrides an earlier one.
    pub fn key(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}:{}:{}", self.group_id, self.artifact_id, c),
            None => format!("{}:{}", self.group_id, self.artifact_id),
        }
    }

    /// Group with dots turned into path separators (`net/sf/jopt-simple`).
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// `artifact-version[-classifier].extension`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, c, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }

    /// `<repo>/<group_path>/<artifact>/<version>/<filename>`
    pub fn url(&self, repo_base: &str) -> String {
        let base = repo_base.trim_end_matches('/');
        format!(
            "{}/{}/{}/{}/{}",
            base,
            self.group_path(),
            self.artifact_id,
            self.version,
            self.filename()
        )
    }

    /// Path relative to the `libraries/` directory.
    pub fn local_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.group_id.split('.') {
            path.push(segment);
        }
        path.join(&self.artifact_id)
            .join(&self.version)
            .join(self.filename())
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        if self.extension != "jar" {
            write!(f, "@{}", self.extension)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_coordinate() {
        let a = MavenArtifact::parse("net.sf.jopt-simple:jopt-simple:5.0.4").unwrap();
        assert_eq!(a.group_id, "net.sf.jopt-simple");
        assert_eq!(a.artifact_id, "jopt-simple");
        assert_eq!(a.version, "5.0.4");
        assert_eq!(a.classifier, None);
        assert_eq!(a.extension, "jar");
        assert_eq!(a.to_string(), "net.sf.jopt-simple:jopt-simple:5.0.4");
    }

    #[test]
    fn parse_with_classifier_and_extension() {
        let a = MavenArtifact::parse("org.lwjgl:lwjgl:3.3.3:natives-windows").unwrap();
        assert_eq!(a.classifier.as_deref(), Some("natives-windows"));

        let zip = MavenArtifact::parse("com.example:bundle:1.0@zip").unwrap();
        assert_eq!(zip.extension, "zip");
        assert_eq!(zip.filename(), "bundle-1.0.zip");
    }

    #[test]
    fn rejects_malformed_coordinates() {
        assert!(MavenArtifact::parse("just-a-name").is_err());
        assert!(MavenArtifact::parse("a:b").is_err());
        assert!(MavenArtifact::parse("a::1.0").is_err());
        assert!(MavenArtifact::parse("a:b:c:d:e").is_err());
    }

    #[test]
    fn url_construction() {
        let a = MavenArtifact::parse("net.sf.jopt-simple:jopt-simple:5.0.4").unwrap();
        assert_eq!(
            a.url("https://libraries.minecraft.net/"),
            "https://libraries.minecraft.net/net/sf/jopt-simple/jopt-simple/5.0.4/jopt-simple-5.0.4.jar"
        );
    }

    #[test]
    fn local_path_with_and_without_classifier() {
        let a = MavenArtifact::parse("org.lwjgl:lwjgl:3.3.3").unwrap();
        assert_eq!(
            a.local_path(),
            PathBuf::from("org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3.jar")
        );
        assert_eq!(
            a.with_classifier("natives-linux").local_path(),
            PathBuf::from("org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-linux.jar")
        );
    }

    #[test]
    fn key_ignores_version() {
        let old = MavenArtifact::parse("org.ow2.asm:asm:9.3").unwrap();
        let new = MavenArtifact::parse("org.ow2.asm:asm:9.6").unwrap();
        assert_eq!(old.key(), new.key());
        assert_ne!(old.key(), old.with_classifier("sources").key());
    }
}
