// ─── Rule Evaluation ───
// Decides whether a conditional library or argument fragment applies to the
// running platform and the enabled launch features.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

/// A single `{ "action": ..., "os": {...}, "features": {...} }` rule.
///
/// Condition keys this evaluator does not understand are kept in `unknown`
/// so that such a rule never matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, bool>>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Regular expression matched against the OS version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

/// Platform identity and enabled features a rule list is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleContext {
    /// Manifest OS name: `windows`, `osx` or `linux`.
    pub os_name: String,
    pub os_version: String,
    /// Manifest arch name: `x86`, `x86_64`, `arm64`, ...
    pub arch: String,
    pub features: HashMap<String, bool>,
}

impl RuleContext {
    /// Context describing the machine this process runs on, no features enabled.
    pub fn current() -> Self {
        Self {
            os_name: current_os_name().to_string(),
            os_version: current_os_version(),
            arch: current_arch_name().to_string(),
            features: HashMap::new(),
        }
    }

    pub fn with_feature(mut self, name: &str, enabled: bool) -> Self {
        self.features.insert(name.to_string(), enabled);
        self
    }

    /// Value substituted for `${arch}` in legacy native classifiers.
    pub fn arch_bits(&self) -> &'static str {
        match self.arch.as_str() {
            "x86" | "arm32" => "32",
            _ => "64",
        }
    }

    /// Fallback classifier keys tried when a library carries no `natives` map.
    pub fn platform_native_keys(&self) -> Vec<String> {
        let mut keys = vec![format!("natives-{}", self.os_name)];
        if self.os_name == "osx" {
            keys.push("natives-macos".into());
        }
        keys
    }
}

/// Evaluate a rule list. The action of the last matching rule wins.
///
/// With no matching rule the outcome is disallowed when the list grants
/// anything (contains an `allow` rule), and allowed when it only carves out
/// exclusions. An empty list is therefore allowed.
pub fn applies(rules: &[Rule], ctx: &RuleContext) -> bool {
    let mut allowed = !rules.iter().any(|rule| rule.action == RuleAction::Allow);
    for rule in rules {
        if rule_matches(rule, ctx) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

fn rule_matches(rule: &Rule, ctx: &RuleContext) -> bool {
    if !rule.unknown.is_empty() {
        debug!("Rule has unknown conditions {:?}, treating as non-matching", rule.unknown.keys());
        return false;
    }

    if let Some(os) = &rule.os {
        if !os_matches(os, ctx) {
            return false;
        }
    }

    if let Some(features) = &rule.features {
        let all_match = features.iter().all(|(name, expected)| {
            ctx.features.get(name).copied().unwrap_or(false) == *expected
        });
        if !all_match {
            return false;
        }
    }

    true
}

fn os_matches(os: &OsCondition, ctx: &RuleContext) -> bool {
    if !os.unknown.is_empty() {
        return false;
    }

    if let Some(name) = &os.name {
        if name != &ctx.os_name {
            return false;
        }
    }

    if let Some(arch) = &os.arch {
        if !arch_matches(arch, &ctx.arch) {
            return false;
        }
    }

    if let Some(pattern) = &os.version {
        match Regex::new(pattern) {
            Ok(re) if re.is_match(&ctx.os_version) => {}
            Ok(_) => return false,
            Err(e) => {
                debug!("Invalid os.version pattern {:?}: {}", pattern, e);
                return false;
            }
        }
    }

    true
}

fn arch_matches(wanted: &str, actual: &str) -> bool {
    if wanted == actual {
        return true;
    }
    // Aliases seen in third-party manifests.
    matches!(
        (wanted, actual),
        ("x64", "x86_64") | ("amd64", "x86_64") | ("aarch64", "arm64")
    )
}

/// Manifest OS name for the current platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

fn current_arch_name() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "x86",
        "x86_64" => "x86_64",
        "aarch64" => "arm64",
        "arm" => "arm32",
        other => other,
    }
}

/// OS version in the form the JVM reports as `os.version`: the kernel
/// release on Linux, the product version on macOS, the NT version on Windows.
fn current_os_version() -> String {
    let version = if cfg!(target_os = "linux") {
        sysinfo::System::kernel_version().or_else(sysinfo::System::os_version)
    } else {
        sysinfo::System::os_version().or_else(sysinfo::System::kernel_version)
    }
    .unwrap_or_default();

    if cfg!(target_os = "windows") {
        nt_version(&version)
    } else {
        version
    }
}

/// `"11 (22631)"` and `"10 (19045)"` both run on NT 10.0.
fn nt_version(product: &str) -> String {
    let major: String = product
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    match major.split('.').next().and_then(|m| m.parse::<u32>().ok()) {
        Some(m) if m >= 10 => "10.0".into(),
        Some(_) if major.contains('.') => major,
        Some(m) => format!("{m}.0"),
        None => product.trim().to_string(),
    }
}
