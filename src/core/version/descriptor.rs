// ─── Version Descriptor ───
// Serde model of a version JSON (`versions/<id>/<id>.json`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::maven::MavenArtifact;
use crate::core::rules::{self, Rule, RuleContext};

/// A parsed version JSON. After resolution it describes the whole
/// inheritance chain and is not modified again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    /// Id of the version whose jar is launched (defaults to `id`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<VersionDownloads>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
    /// Legacy space-separated game arguments (pre-1.13).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersionInfo>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub version_type: Option<String>,
    /// Fields this crate does not interpret, carried through resolution.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<DownloadInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<DownloadInfo>,
}

/// `{url, sha1, size}` as found under `downloads.*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl DownloadInfo {
    /// The URL when it is present and non-empty.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentFragment>,
    #[serde(default)]
    pub jvm: Vec<ArgumentFragment>,
}

/// One element of `arguments.game` / `arguments.jvm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentFragment {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgumentValue,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    One(String),
    Many(Vec<String>),
}

impl ArgumentFragment {
    /// Values this fragment contributes under `ctx` (empty when its rules disallow).
    pub fn values_for(&self, ctx: &RuleContext) -> Vec<String> {
        match self {
            ArgumentFragment::Plain(arg) => vec![arg.clone()],
            ArgumentFragment::Conditional { rules: r, value } => {
                if !rules::applies(r, ctx) {
                    return vec![];
                }
                match value {
                    ArgumentValue::One(s) => vec![s.clone()],
                    ArgumentValue::Many(v) => v.clone(),
                }
            }
        }
    }
}

// ─── Library Entry ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// `group:artifact:version[:classifier]`
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    /// Legacy OS → classifier map, e.g. `{"windows": "natives-windows-${arch}"}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natives: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractFlag>,
    /// Repository base for entries without `downloads`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Rule lists of conditional child entries sharing this entry's key.
    /// Wherever one of them applies, the child entry replaces this one.
    #[serde(skip)]
    pub replaced_when: Vec<Vec<Rule>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<DownloadInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<BTreeMap<String, DownloadInfo>>,
}

/// `"extract": true` or `"extract": {"exclude": ["META-INF/"]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractFlag {
    Enabled(bool),
    Rules(ExtractRules),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ExtractFlag {
    /// Exclusion prefixes when extraction is enabled, `None` otherwise.
    pub fn rules(&self) -> Option<ExtractRules> {
        match self {
            ExtractFlag::Enabled(true) => Some(ExtractRules::default()),
            ExtractFlag::Enabled(false) => None,
            ExtractFlag::Rules(rules) => Some(rules.clone()),
        }
    }
}

impl LibraryEntry {
    pub fn is_allowed(&self, ctx: &RuleContext) -> bool {
        rules::applies(&self.rules, ctx)
            && !self
                .replaced_when
                .iter()
                .any(|child_rules| rules::applies(child_rules, ctx))
    }

    /// Override identity (`group:artifact[:classifier]`); the raw name when
    /// the coordinate does not parse.
    pub fn key(&self) -> String {
        MavenArtifact::parse(&self.name)
            .map(|a| a.key())
            .unwrap_or_else(|_| self.name.clone())
    }

    /// Native classifier and its download for the platform in `ctx`.
    ///
    /// The legacy `natives` map wins when present; otherwise the platform
    /// keys (`natives-<os>`) are looked up directly among the classifiers.
    pub fn native_download(&self, ctx: &RuleContext) -> Option<(String, &DownloadInfo)> {
        let classifiers = self.downloads.as_ref()?.classifiers.as_ref()?;

        if let Some(natives) = &self.natives {
            let classifier = natives
                .get(&ctx.os_name)?
                .replace("${arch}", ctx.arch_bits());
            return classifiers
                .get(&classifier)
                .map(|info| (classifier, info));
        }

        ctx.platform_native_keys()
            .into_iter()
            .find_map(|key| classifiers.get(&key).map(|info| (key, info)))
    }
}

impl VersionDescriptor {
    /// Id of the version whose jar goes first on the classpath.
    pub fn jar_id(&self) -> &str {
        self.jar.as_deref().unwrap_or(&self.id)
    }

    /// JVM fragments that apply under `ctx`, flattened.
    pub fn jvm_args(&self, ctx: &RuleContext) -> Vec<String> {
        match &self.arguments {
            Some(args) => args.jvm.iter().flat_map(|f| f.values_for(ctx)).collect(),
            None => vec![],
        }
    }

    /// Game fragments that apply under `ctx`, falling back to the legacy
    /// `minecraftArguments` string.
    pub fn game_args(&self, ctx: &RuleContext) -> Vec<String> {
        match &self.arguments {
            Some(args) if !args.game.is_empty() => {
                args.game.iter().flat_map(|f| f.values_for(ctx)).collect()
            }
            _ => match &self.minecraft_arguments {
                Some(s) => s.split_whitespace().map(ToString::to_string).collect(),
                None => vec![],
            },
        }
    }

    /// Asset index id, preferring `assetIndex.id` over the legacy `assets` field.
    pub fn asset_index_id(&self) -> Option<&str> {
        self.asset_index
            .as_ref()
            .map(|ai| ai.id.as_str())
            .or(self.assets.as_deref())
    }
}
