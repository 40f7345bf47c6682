// ─── Version Resolver ───
// Loads a descriptor from the store, follows `inheritsFrom` and merges the
// chain into one effective descriptor.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info};

use super::descriptor::{Arguments, LibraryEntry, VersionDescriptor};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::rules::Rule;
use crate::core::store::ArtifactStore;

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = LauncherResult<VersionDescriptor>> + Send + 'a>>;

/// Resolves version descriptors from `versions/<id>/<id>.json`. Nothing is
/// cached: every call reads the store again.
pub struct VersionResolver {
    store: ArtifactStore,
}

impl VersionResolver {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Resolve `version_id` and all of its ancestors into a single descriptor.
    pub async fn resolve(&self, version_id: &str) -> LauncherResult<VersionDescriptor> {
        let mut visited = Vec::new();
        let resolved = self.resolve_chain(version_id, &mut visited).await?;
        info!(
            "Resolved {} ({} libraries, chain: {})",
            version_id,
            resolved.libraries.len(),
            visited.join(" -> ")
        );
        Ok(resolved)
    }

    /// Load one descriptor without following its parent.
    pub async fn load(&self, version_id: &str) -> LauncherResult<VersionDescriptor> {
        let raw = self
            .store
            .read_version_json(version_id)
            .await?
            .ok_or_else(|| LauncherError::VersionNotFound {
                version_id: version_id.to_string(),
                reason: format!(
                    "no descriptor at {:?}",
                    self.store.version_json_path(version_id)
                ),
            })?;

        let mut descriptor: VersionDescriptor =
            serde_json::from_str(&raw).map_err(|e| LauncherError::VersionNotFound {
                version_id: version_id.to_string(),
                reason: format!("unparsable descriptor: {}", e),
            })?;

        if descriptor.id.trim().is_empty() {
            descriptor.id = version_id.to_string();
        }
        Ok(descriptor)
    }

    // Recursion through an async fn needs the boxed future.
    fn resolve_chain<'a>(
        &'a self,
        version_id: &'a str,
        visited: &'a mut Vec<String>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            if visited.iter().any(|seen| seen == version_id) {
                let mut chain = visited.clone();
                chain.push(version_id.to_string());
                return Err(LauncherError::CyclicInheritance { chain });
            }
            visited.push(version_id.to_string());

            let descriptor = self.load(version_id).await?;
            let Some(parent_id) = descriptor.inherits_from.clone() else {
                return Ok(descriptor);
            };

            debug!("{} inherits from {}", version_id, parent_id);
            let parent = self.resolve_chain(&parent_id, visited).await?;
            Ok(merge(parent, descriptor))
        })
    }
}

/// Merge `child` over an already resolved `parent`.
///
/// Scalars take the child's value when present. Libraries and argument
/// lists are concatenated parent-first; a child library with the same
/// `group:artifact[:classifier]` as a parent library replaces it.
pub fn merge(parent: VersionDescriptor, child: VersionDescriptor) -> VersionDescriptor {
    let child_has_client = child
        .downloads
        .as_ref()
        .is_some_and(|d| d.client.is_some());

    let jar = match child.jar {
        Some(jar) => Some(jar),
        None if child_has_client => None,
        None => Some(parent.jar_id().to_string()),
    };
    let downloads = if child_has_client {
        child.downloads
    } else {
        parent.downloads.or(child.downloads)
    };

    let mut extra = parent.extra;
    extra.extend(child.extra);

    VersionDescriptor {
        id: child.id,
        inherits_from: None,
        main_class: child.main_class.or(parent.main_class),
        jar,
        libraries: merge_libraries(parent.libraries, child.libraries),
        downloads,
        asset_index: child.asset_index.or(parent.asset_index),
        assets: child.assets.or(parent.assets),
        arguments: merge_arguments(parent.arguments, child.arguments),
        minecraft_arguments: child.minecraft_arguments.or(parent.minecraft_arguments),
        java_version: child.java_version.or(parent.java_version),
        version_type: child.version_type.or(parent.version_type),
        extra,
    }
}

/// Parent entries come first, then the child's. A child entry replaces
/// parent entries with the same key; a conditional one only where its own
/// rules apply.
fn merge_libraries(parent: Vec<LibraryEntry>, child: Vec<LibraryEntry>) -> Vec<LibraryEntry> {
    let mut replaced_always: HashSet<String> = HashSet::new();
    let mut replaced_when: HashMap<String, Vec<Vec<Rule>>> = HashMap::new();
    for lib in &child {
        if lib.rules.is_empty() {
            replaced_always.insert(lib.key());
        } else {
            replaced_when
                .entry(lib.key())
                .or_default()
                .push(lib.rules.clone());
        }
    }

    let mut merged: Vec<LibraryEntry> = parent
        .into_iter()
        .filter_map(|mut lib| {
            let key = lib.key();
            if replaced_always.contains(&key) {
                debug!("Library {} overridden by child version", lib.name);
                return None;
            }
            if let Some(conditions) = replaced_when.get(&key) {
                debug!("Library {} conditionally overridden by child version", lib.name);
                lib.replaced_when.extend(conditions.iter().cloned());
            }
            Some(lib)
        })
        .collect();
    merged.extend(child);
    merged
}

fn merge_arguments(parent: Option<Arguments>, child: Option<Arguments>) -> Option<Arguments> {
    match (parent, child) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only),
        (Some(mut parent), Some(child)) => {
            parent.jvm.extend(child.jvm);
            parent.game.extend(child.game);
            Some(parent)
        }
    }
}
