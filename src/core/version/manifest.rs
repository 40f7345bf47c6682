// ─── Version Manifest ───
// Remote index of published versions, used to populate the local store.

use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::info;

use super::descriptor::VersionDescriptor;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::store::ArtifactStore;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub release_time: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    pub async fn fetch(client: &reqwest::Client) -> LauncherResult<Self> {
        Self::fetch_from(client, VERSION_MANIFEST_URL).await
    }

    pub async fn fetch_from(client: &reqwest::Client, url: &str) -> LauncherResult<Self> {
        info!("Fetching version manifest from {}", url);
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let manifest: VersionManifest = response.json().await?;
        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Download the descriptor for `id`, check its hash and save it to
    /// `versions/<id>/<id>.json`.
    pub async fn install_descriptor(
        &self,
        client: &reqwest::Client,
        store: &ArtifactStore,
        id: &str,
    ) -> LauncherResult<VersionDescriptor> {
        let entry = self
            .find_version(id)
            .ok_or_else(|| LauncherError::VersionNotFound {
                version_id: id.to_string(),
                reason: "not listed in the version manifest".into(),
            })?;

        let response = client.get(&entry.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: entry.url.clone(),
                status: status.as_u16(),
            });
        }
        let raw = response.text().await?;

        if let Some(expected) = &entry.sha1 {
            let actual = hex::encode(Sha1::digest(raw.as_bytes()));
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::Sha1Mismatch {
                    path: store.version_json_path(id),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let descriptor: VersionDescriptor = serde_json::from_str(&raw)?;
        store.write_version_json(id, &raw).await?;
        info!("Installed descriptor for {}", id);
        Ok(descriptor)
    }
}
