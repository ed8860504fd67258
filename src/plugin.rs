//! Installed plugin index and symlink provenance.
//!
//! Claude Code records installed plugins in `installed_plugins.json`. The index
//! built here maps each enabled install path to its plugin, and
//! [`PluginResolver`] uses it to explain where a symlinked skill directory
//! points: into the plugin cache (an installed plugin) or elsewhere (a plugin
//! under development).

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::PluginError;
use crate::skill::PluginInfo;

/// Directory names skipped when inferring a marketplace from a dev checkout.
const DEV_CONTAINER_DIRS: [&str; 3] = ["go", "src", "projects"];

/// Only the fields the index uses are read; timestamps and commit ids in the
/// manifest are ignored.
#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    plugins: BTreeMap<String, Vec<Installation>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Installation {
    enabled: Option<bool>,
    #[serde(default)]
    scope: String,
    install_path: PathBuf,
    #[serde(default)]
    version: String,
}

/// One enabled plugin installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    /// `name@marketplace` or bare `name`.
    pub plugin_key: String,
    pub plugin_name: String,
    pub marketplace: String,
    pub version: String,
    pub install_path: PathBuf,
    pub install_scope: String,
}

/// Enabled plugins keyed by cleaned install path.
#[derive(Debug, Clone, Default)]
pub struct PluginIndex {
    by_path: BTreeMap<PathBuf, PluginEntry>,
}

impl PluginIndex {
    /// Load the manifest at `path`. A missing file is an empty index.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(PluginError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let manifest: Manifest = serde_json::from_str(&text).map_err(|source| PluginError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_manifest(manifest))
    }

    /// Build an index from manifest JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let manifest: Manifest = serde_json::from_str(text)?;
        Ok(Self::from_manifest(manifest))
    }

    /// Plugin keys are visited in sorted order, so when two installations share
    /// an install path the lexically last key wins.
    fn from_manifest(manifest: Manifest) -> Self {
        let mut by_path = BTreeMap::new();
        for (plugin_key, installations) in manifest.plugins {
            let (plugin_name, marketplace) = split_plugin_key(&plugin_key);
            for install in installations {
                if !install.enabled.unwrap_or(true) {
                    continue;
                }
                let install_path = clean_path(&install.install_path);
                by_path.insert(
                    install_path.clone(),
                    PluginEntry {
                        plugin_key: plugin_key.clone(),
                        plugin_name: plugin_name.to_string(),
                        marketplace: marketplace.to_string(),
                        version: install.version,
                        install_path,
                        install_scope: install.scope,
                    },
                );
            }
        }
        Self { by_path }
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Entries in install-path order.
    pub fn entries(&self) -> impl Iterator<Item = &PluginEntry> {
        self.by_path.values()
    }

    /// The entry installed exactly at `path`.
    pub fn lookup_exact(&self, path: &Path) -> Option<&PluginEntry> {
        self.by_path.get(&clean_path(path))
    }

    /// The entry whose install path is `path` or one of its ancestors. The
    /// deepest install path wins.
    pub fn lookup_prefix(&self, path: &Path) -> Option<&PluginEntry> {
        let query = clean_path(path);
        self.by_path
            .iter()
            .filter(|(install, _)| query.starts_with(install))
            .max_by_key(|(install, _)| install.components().count())
            .map(|(_, entry)| entry)
    }
}

fn split_plugin_key(key: &str) -> (&str, &str) {
    key.split_once('@').unwrap_or((key, ""))
}

/// Lexically clean a path: drop `.` components and fold `..` into the parent.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    cleaned.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                );
                let ends_in_parent =
                    matches!(cleaned.components().next_back(), Some(Component::ParentDir));
                if ends_in_parent || cleaned.as_os_str().is_empty() {
                    cleaned.push("..");
                } else if !at_root {
                    cleaned.pop();
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}

/// Classifies symlinked skill directories using the plugin index.
#[derive(Debug, Clone, Default)]
pub struct PluginResolver {
    index: PluginIndex,
    cache_root: PathBuf,
}

impl PluginResolver {
    pub fn new(index: PluginIndex, cache_root: impl AsRef<Path>) -> Self {
        Self {
            index,
            cache_root: clean_path(cache_root.as_ref()),
        }
    }

    /// Load the manifest named by `config`. A broken manifest is logged and
    /// treated as empty so discovery still runs.
    pub fn from_config(config: &Config) -> Self {
        let index = match PluginIndex::load(&config.plugin_manifest) {
            Ok(index) => index,
            Err(err) => {
                warn!("Ignoring plugin manifest: {err}");
                PluginIndex::default()
            }
        };
        debug!("Loaded {} plugin installation(s)", index.len());
        Self::new(index, &config.plugin_cache)
    }

    pub fn index(&self) -> &PluginIndex {
        &self.index
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Provenance for a skill found directly in an index entry's install path.
    pub fn info_for_entry(&self, entry: &PluginEntry) -> PluginInfo {
        PluginInfo {
            plugin_name: entry.plugin_key.clone(),
            marketplace: entry.marketplace.clone(),
            version: entry.version.clone(),
            install_path: entry.install_path.clone(),
            symlink_target: PathBuf::new(),
            install_scope: entry.install_scope.clone(),
            is_dev: !entry.install_path.starts_with(&self.cache_root),
        }
    }

    /// Describe where `skill_dir` points when it is a symlink. Returns `None`
    /// for regular directories and unreadable links.
    pub fn resolve(&self, skill_dir: &Path) -> Option<PluginInfo> {
        let meta = fs::symlink_metadata(skill_dir).ok()?;
        if !meta.file_type().is_symlink() {
            return None;
        }

        let raw_target = fs::read_link(skill_dir).ok()?;
        let target = if raw_target.is_relative() {
            skill_dir
                .parent()
                .map(|parent| parent.join(&raw_target))
                .unwrap_or(raw_target)
        } else {
            raw_target
        };
        let target = clean_path(&target);

        let info = match target.strip_prefix(&self.cache_root) {
            Ok(relative) => self.cached_info(&target, relative),
            Err(_) => self.dev_info(&target),
        };
        Some(info)
    }

    /// `<cache>/<marketplace>/<plugin>/<version>/...`, overlaid with the index
    /// entry that contains the target.
    fn cached_info(&self, target: &Path, relative: &Path) -> PluginInfo {
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();

        let mut info = PluginInfo {
            symlink_target: target.to_path_buf(),
            is_dev: false,
            ..PluginInfo::default()
        };
        if let Some(marketplace) = segments.first() {
            info.marketplace.clone_from(marketplace);
            info.install_path = self.cache_root.join(marketplace);
        }
        if let Some(plugin) = segments.get(1) {
            info.plugin_name = format!("{plugin}@{}", info.marketplace);
            info.install_path.push(plugin);
        }
        if let Some(version) = segments.get(2) {
            info.version.clone_from(version);
            info.install_path.push(version);
        }

        if let Some(entry) = self.index.lookup_prefix(target) {
            overlay_entry(&mut info, entry);
        }
        info
    }

    /// A symlink outside the cache: a local checkout of a plugin.
    fn dev_info(&self, target: &Path) -> PluginInfo {
        let mut info = PluginInfo {
            symlink_target: target.to_path_buf(),
            is_dev: true,
            ..PluginInfo::default()
        };
        if let Some(marketplace) = infer_dev_marketplace(target) {
            info.marketplace = marketplace;
        }
        if let Some(entry) = self.index.lookup_prefix(target) {
            overlay_entry(&mut info, entry);
        }
        info
    }
}

fn overlay_entry(info: &mut PluginInfo, entry: &PluginEntry) {
    info.plugin_name.clone_from(&entry.plugin_key);
    if !entry.marketplace.is_empty() {
        info.marketplace.clone_from(&entry.marketplace);
    }
    if !entry.version.is_empty() {
        info.version.clone_from(&entry.version);
    }
    info.install_path.clone_from(&entry.install_path);
    info.install_scope.clone_from(&entry.install_scope);
}

/// `.../dev/<name>/...` names the marketplace; generic container directories
/// such as `src` are skipped.
fn infer_dev_marketplace(target: &Path) -> Option<String> {
    let segments: Vec<String> = target
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    let dev_at = segments.iter().position(|segment| segment == "dev")?;
    let mut name = segments.get(dev_at + 1)?;
    if DEV_CONTAINER_DIRS.contains(&name.as_str()) {
        name = segments.get(dev_at + 2)?;
    }
    Some(name.clone())
}
