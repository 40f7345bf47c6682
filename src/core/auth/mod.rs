// ─── Accounts ───
// The credential bundle consumed by argument assembly. Obtaining real
// tokens happens outside this crate behind `Authenticator`.

use async_trait::async_trait;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

use crate::core::error::{LauncherError, LauncherResult};

pub const AZURE_CLIENT_ID_FALLBACK: &str = "00000000402B5328";

const OFFLINE_ACCESS_TOKEN: &str = "offline_access_token";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    Offline,
    Microsoft,
}

/// Opaque to the launch core: only substituted into arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchAccountProfile {
    pub mode: AccountMode,
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub xuid: String,
    pub user_type: String,
    pub client_id: String,
}

impl Default for LaunchAccountProfile {
    fn default() -> Self {
        Self::offline("Player")
    }
}

impl LaunchAccountProfile {
    pub fn offline(username: &str) -> Self {
        let username = username.trim();
        Self {
            mode: AccountMode::Offline,
            username: username.to_string(),
            uuid: offline_uuid(username).to_string(),
            access_token: OFFLINE_ACCESS_TOKEN.into(),
            xuid: "0".into(),
            user_type: "legacy".into(),
            client_id: AZURE_CLIENT_ID_FALLBACK.into(),
        }
    }

    /// Fill blank fields so no placeholder ends up empty on the command line.
    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = "Player".into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = offline_uuid(&self.username).to_string();
        }
        if self.access_token.trim().is_empty() {
            self.access_token = OFFLINE_ACCESS_TOKEN.into();
        }
        if self.xuid.trim().is_empty() {
            self.xuid = "0".into();
        }
        if self.user_type.trim().is_empty() {
            self.user_type = match self.mode {
                AccountMode::Offline => "legacy".into(),
                AccountMode::Microsoft => "msa".into(),
            };
        }
        if self.client_id.trim().is_empty() {
            self.client_id = AZURE_CLIENT_ID_FALLBACK.into();
        }
        self
    }
}

/// Supplies the credential bundle for a launch.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> LauncherResult<LaunchAccountProfile>;
}

/// Local play without an account.
#[derive(Debug, Clone)]
pub struct OfflineAuthenticator {
    username: String,
}

impl OfflineAuthenticator {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

#[async_trait]
impl Authenticator for OfflineAuthenticator {
    async fn authenticate(&self) -> LauncherResult<LaunchAccountProfile> {
        let name = self.username.trim();
        if name.is_empty() || name.len() > 16 || name.chars().any(char::is_whitespace) {
            return Err(LauncherError::Other(format!(
                "Invalid offline username: {:?}",
                self.username
            )));
        }
        Ok(LaunchAccountProfile::offline(name))
    }
}

/// Name-based (MD5, version 3) UUID of `OfflinePlayer:<name>`.
pub fn offline_uuid(username: &str) -> Uuid {
    let digest = Md5::digest(format!("OfflinePlayer:{}", username).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    Builder::from_md5_bytes(bytes).into_uuid()
}
