// ─── Runtime Assembler ───
// resolve → catalog → download barrier → natives → classpath → arguments.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{info, warn};

use super::arguments::{build_game_args, build_jvm_args, shell_escape, ArgumentContext};
use super::classpath::{build_classpath, extract_natives, get_classpath_separator};
use crate::core::auth::LaunchAccountProfile;
use crate::core::catalog::{LibraryCatalog, ResolvedLibrarySet};
use crate::core::config::LauncherConfig;
use crate::core::downloader::{CancelSignal, DownloadScheduler, DownloadTask, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::rules::RuleContext;
use crate::core::store::ArtifactStore;
use crate::core::version::{VersionDescriptor, VersionResolver};

/// Everything needed to start the game, built fresh for each launch.
#[derive(Debug, Clone)]
pub struct RuntimeEnvironment {
    pub descriptor: VersionDescriptor,
    pub libraries: ResolvedLibrarySet,
    pub game_dir: PathBuf,
    pub natives_dir: PathBuf,
    pub main_jar: PathBuf,
    pub main_class: String,
    pub classpath: String,
    pub jvm_args: Vec<String>,
    pub game_args: Vec<String>,
}

/// Executable, arguments and working directory handed to the process runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl RuntimeEnvironment {
    /// `java <jvm args> -cp <classpath> <main class> <game args>`
    pub fn command(&self, java: impl Into<PathBuf>) -> LaunchCommand {
        let mut args = self.jvm_args.clone();
        args.push("-cp".into());
        args.push(self.classpath.clone());
        args.push(self.main_class.clone());
        args.extend(self.game_args.iter().cloned());

        LaunchCommand {
            program: java.into(),
            args,
            working_dir: self.game_dir.clone(),
        }
    }
}

impl LaunchCommand {
    /// Copy/paste form for logs. The access token is masked.
    pub fn display_for_logs(&self) -> String {
        let mut parts = vec![shell_escape(&self.program.to_string_lossy())];
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                parts.push("<hidden>".into());
            } else {
                parts.push(shell_escape(arg));
            }
            mask_next = arg == "--accessToken";
        }
        parts.join(" ")
    }

    pub fn to_command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.working_dir);
        cmd
    }
}

pub struct RuntimeAssembler {
    config: LauncherConfig,
    store: ArtifactStore,
    resolver: VersionResolver,
    scheduler: DownloadScheduler,
    context: RuleContext,
    cancel: CancelSignal,
}

impl RuntimeAssembler {
    pub fn new(config: LauncherConfig) -> LauncherResult<Self> {
        let client = build_http_client()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: LauncherConfig, client: reqwest::Client) -> Self {
        let store = ArtifactStore::from_config(&config);
        let downloader = Downloader::new(client).with_retry(config.retry.clone());
        Self {
            resolver: VersionResolver::new(store.clone()),
            scheduler: DownloadScheduler::new(downloader),
            store,
            config,
            context: RuleContext::current(),
            cancel: CancelSignal::never(),
        }
    }

    /// Evaluate rules against `context` instead of the running machine.
    pub fn with_rule_context(mut self, context: RuleContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.scheduler = self.scheduler.with_cancel(cancel.clone());
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Command for `env` using the configured Java executable.
    pub fn command_for(&self, env: &RuntimeEnvironment) -> LaunchCommand {
        env.command(&self.config.java_path)
    }

    pub async fn prepare(
        &self,
        version_id: &str,
        account: &LaunchAccountProfile,
    ) -> LauncherResult<RuntimeEnvironment> {
        info!("Preparing {}", version_id);
        let descriptor = self.resolver.resolve(version_id).await?;
        let main_class = descriptor.main_class.clone().ok_or_else(|| {
            LauncherError::Other(format!("Version {} declares no mainClass", descriptor.id))
        })?;

        let mut ctx = self.context.clone();
        ctx.features
            .entry("is_demo_user".into())
            .or_insert(self.config.demo);
        ctx.features
            .entry("has_custom_resolution".into())
            .or_insert(true);

        let libraries =
            LibraryCatalog::new(self.store.libraries_dir(), ctx.clone()).expand(&descriptor)?;

        let tasks = self.download_tasks(&descriptor, &libraries);
        let failures = self.scheduler.run(tasks, self.config.worker_count).await;
        if self.cancel.is_cancelled() {
            return Err(LauncherError::Cancelled);
        }

        let (required, optional): (Vec<_>, Vec<_>) =
            failures.into_iter().partition(|f| f.required);
        for failure in &optional {
            warn!("Optional download failed, continuing: {}", failure);
        }
        if !required.is_empty() {
            return Err(LauncherError::DownloadFailure {
                version_id: version_id.to_string(),
                failures: required,
            });
        }

        let natives_dir = self.config.effective_natives_dir(&descriptor.id);
        extract_natives(&libraries, &natives_dir).await?;

        let main_jar = self.store.version_jar_path(descriptor.jar_id());
        let separator = get_classpath_separator();
        let classpath = build_classpath(&main_jar, &libraries, separator);

        let account = account.clone().sanitized();
        let assets_dir = self.store.assets_dir();
        let libraries_dir = self.store.libraries_dir();
        let args_ctx = ArgumentContext {
            account: &account,
            version_name: &descriptor.id,
            version_type: descriptor.version_type.as_deref().unwrap_or("release"),
            game_dir: self.store.root(),
            assets_dir: &assets_dir,
            assets_index_name: descriptor.asset_index_id().unwrap_or("legacy"),
            natives_dir: &natives_dir,
            libraries_dir: &libraries_dir,
            main_jar: &main_jar,
            classpath: &classpath,
            classpath_separator: separator,
            launcher_name: &self.config.launcher_name,
            launcher_version: &self.config.launcher_version,
            window: self.config.window,
            max_memory_mb: self.config.max_memory_mb,
        };
        let jvm_args = build_jvm_args(&args_ctx, &descriptor.jvm_args(&ctx));
        let game_args = build_game_args(&args_ctx, &descriptor.game_args(&ctx));

        info!(
            "Prepared {}: {} classpath entries, main class {}",
            descriptor.id,
            classpath.split(separator).count(),
            main_class
        );

        Ok(RuntimeEnvironment {
            game_dir: self.store.root().to_path_buf(),
            natives_dir,
            main_jar,
            main_class,
            classpath,
            jvm_args,
            game_args,
            libraries,
            descriptor,
        })
    }

    /// Main jar, every catalogued library with a URL, and the asset index.
    fn download_tasks(
        &self,
        descriptor: &VersionDescriptor,
        libraries: &ResolvedLibrarySet,
    ) -> Vec<DownloadTask> {
        let mut tasks = Vec::with_capacity(libraries.len() + 2);
        let mut dests = HashSet::new();

        let client = descriptor.downloads.as_ref().and_then(|d| d.client.as_ref());
        if let Some((url, info)) = client.and_then(|info| info.url().map(|url| (url, info))) {
            tasks.push(
                DownloadTask::new(url, self.store.version_jar_path(descriptor.jar_id()))
                    .with_sha1(info.sha1.clone())
                    .with_size(info.size),
            );
        }

        for lib in libraries.iter() {
            let Some(info) = &lib.download else { continue };
            let Some(url) = info.url() else { continue };
            tasks.push(
                DownloadTask::new(url, lib.local_path.clone())
                    .with_sha1(info.sha1.clone())
                    .with_size(info.size),
            );
        }

        if let Some(index) = descriptor.asset_index.as_ref().filter(|i| !i.url.is_empty()) {
            tasks.push(
                DownloadTask::new(&index.url, self.store.asset_index_path(&index.id))
                    .with_sha1(index.sha1.clone())
                    .with_size(index.size)
                    .optional(),
            );
        }

        tasks.retain(|task| dests.insert(task.dest.clone()));
        tasks
    }
}
