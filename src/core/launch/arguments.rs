// ─── Argument Assembly ───
// Fixed launcher flags first, then the descriptor's rule-filtered fragments
// with `${...}` placeholders substituted.

use std::path::Path;

use crate::core::auth::LaunchAccountProfile;
use crate::core::config::WindowSize;

use super::classpath::safe_path_str;

/// Values available for placeholder substitution.
pub struct ArgumentContext<'a> {
    pub account: &'a LaunchAccountProfile,
    pub version_name: &'a str,
    pub version_type: &'a str,
    pub game_dir: &'a Path,
    pub assets_dir: &'a Path,
    pub assets_index_name: &'a str,
    pub natives_dir: &'a Path,
    pub libraries_dir: &'a Path,
    pub main_jar: &'a Path,
    pub classpath: &'a str,
    pub classpath_separator: &'a str,
    pub launcher_name: &'a str,
    pub launcher_version: &'a str,
    pub window: WindowSize,
    pub max_memory_mb: u32,
}

impl ArgumentContext<'_> {
    fn placeholders(&self) -> Vec<(&'static str, String)> {
        let account = self.account;
        vec![
            ("${auth_player_name}", account.username.clone()),
            ("${auth_uuid}", account.uuid.clone()),
            ("${auth_access_token}", account.access_token.clone()),
            (
                "${auth_session}",
                format!("token:{}:{}", account.access_token, account.uuid),
            ),
            ("${auth_xuid}", account.xuid.clone()),
            ("${clientid}", account.client_id.clone()),
            ("${user_type}", account.user_type.clone()),
            ("${user_properties}", "{}".into()),
            ("${version_name}", self.version_name.to_string()),
            ("${version_type}", self.version_type.to_string()),
            ("${game_directory}", safe_path_str(self.game_dir)),
            ("${assets_root}", safe_path_str(self.assets_dir)),
            ("${game_assets}", safe_path_str(self.assets_dir)),
            ("${assets_index_name}", self.assets_index_name.to_string()),
            ("${natives_directory}", safe_path_str(self.natives_dir)),
            ("${library_directory}", safe_path_str(self.libraries_dir)),
            ("${classpath}", self.classpath.to_string()),
            ("${classpath_separator}", self.classpath_separator.to_string()),
            ("${launcher_name}", self.launcher_name.to_string()),
            ("${launcher_version}", self.launcher_version.to_string()),
            ("${resolution_width}", self.window.width.to_string()),
            ("${resolution_height}", self.window.height.to_string()),
        ]
    }

    /// Replace every known placeholder; `None` when something stays unresolved.
    pub fn substitute(&self, raw: &str) -> Option<String> {
        if !raw.contains("${") {
            return Some(raw.to_string());
        }
        let mut resolved = raw.to_string();
        for (key, value) in self.placeholders() {
            if resolved.contains(key) {
                resolved = resolved.replace(key, &value);
            }
        }
        (!resolved.contains("${")).then_some(resolved)
    }
}

/// Launcher-owned JVM flags followed by the descriptor's JVM arguments.
///
/// Descriptor flags that set something already set here are skipped, and
/// `-cp`/`-classpath` pairs are dropped because the classpath is passed
/// separately.
pub fn build_jvm_args(ctx: &ArgumentContext<'_>, descriptor_args: &[String]) -> Vec<String> {
    let mut args = vec![
        format!("-Xmx{}M", ctx.max_memory_mb),
        format!("-Djava.library.path={}", safe_path_str(ctx.natives_dir)),
        format!("-Dminecraft.client.jar={}", safe_path_str(ctx.main_jar)),
        format!(
            "-Dminecraft.applet.TargetDirectory={}",
            safe_path_str(ctx.game_dir)
        ),
        format!("-Dminecraft.launcher.brand={}", ctx.launcher_name),
        format!("-Dminecraft.launcher.version={}", ctx.launcher_version),
    ];
    let fixed: Vec<String> = args.iter().map(|a| jvm_flag_key(a).to_string()).collect();

    let mut extra = Vec::new();
    let mut i = 0;
    while i < descriptor_args.len() {
        let arg = &descriptor_args[i];

        if arg == "-cp" || arg == "-classpath" || arg == "--class-path" {
            i += 2;
            continue;
        }

        match ctx.substitute(arg) {
            Some(resolved) => {
                if !fixed.iter().any(|key| key == jvm_flag_key(&resolved)) {
                    extra.push(resolved);
                }
            }
            None => drop_dangling_option(&mut extra, arg),
        }
        i += 1;
    }

    args.extend(extra);
    args
}

/// Launcher-owned game options followed by the descriptor's game arguments.
/// A descriptor option already set here is skipped together with its value.
pub fn build_game_args(ctx: &ArgumentContext<'_>, descriptor_args: &[String]) -> Vec<String> {
    let account = ctx.account;
    let mut args: Vec<String> = [
        ("--username", account.username.clone()),
        ("--version", ctx.version_name.to_string()),
        ("--gameDir", safe_path_str(ctx.game_dir)),
        ("--assetsDir", safe_path_str(ctx.assets_dir)),
        ("--assetIndex", ctx.assets_index_name.to_string()),
        ("--uuid", account.uuid.clone()),
        ("--accessToken", account.access_token.clone()),
        ("--userType", account.user_type.clone()),
        ("--versionType", ctx.version_type.to_string()),
        ("--width", ctx.window.width.to_string()),
        ("--height", ctx.window.height.to_string()),
    ]
    .into_iter()
    .flat_map(|(flag, value)| [flag.to_string(), value])
    .collect();

    let mut extra: Vec<String> = Vec::new();
    let mut i = 0;
    while i < descriptor_args.len() {
        let arg = &descriptor_args[i];

        if arg.starts_with("--") && contains_flag(&args, arg) {
            let has_value = descriptor_args
                .get(i + 1)
                .is_some_and(|next| !next.starts_with("--"));
            i += if has_value { 2 } else { 1 };
            continue;
        }

        match ctx.substitute(arg) {
            Some(resolved) => extra.push(resolved),
            None => drop_dangling_option(&mut extra, arg),
        }
        i += 1;
    }

    args.extend(extra);
    args
}

fn contains_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

/// What a JVM flag configures: `-Dkey`, the `-Xmx`/`-Xms`/`-Xss` family,
/// or the whole argument otherwise.
fn jvm_flag_key(arg: &str) -> &str {
    if let Some(property) = arg.strip_prefix("-D") {
        let end = property.find('=').map_or(arg.len(), |idx| idx + 2);
        return &arg[..end];
    }
    for sized in ["-Xmx", "-Xms", "-Xss"] {
        if arg.starts_with(sized) {
            return sized;
        }
    }
    arg
}

/// An unresolved value also takes the option it belonged to.
fn drop_dangling_option(args: &mut Vec<String>, unresolved: &str) {
    if unresolved.starts_with('-') {
        return;
    }
    if args
        .last()
        .is_some_and(|last| last.starts_with('-') && !last.contains('='))
    {
        let _ = args.pop();
    }
}

pub(crate) fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
