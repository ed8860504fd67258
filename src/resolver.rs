//! Tiered skill resolution.
//!
//! A [`Resolver`] lists the search paths for one platform in scope order
//! (repo, user, admin, system), parses each existing path, stamps the records
//! with their scope and merges them by name. A record only replaces another of
//! the same name when its scope strictly outranks the incumbent's, so the first
//! path searched within a scope wins ties.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::discovery::find_repo_root;
use crate::parser::{parser_for, PluginCacheParser, SkillParser};
use crate::plugin::PluginResolver;
use crate::skill::{Platform, Scope, Skill};

/// Skill directory name under a platform's configuration directory.
const SKILLS_DIR: &str = "skills";

/// What to resolve and where to look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    pub platform: Platform,
    pub working_dir: PathBuf,
    /// Explicit repository root; detected from `working_dir` when absent.
    pub repo_root: Option<PathBuf>,
    pub admin_path: Option<PathBuf>,
    pub system_path: Option<PathBuf>,
    /// Merge skills from the Claude Code plugin cache at plugin scope.
    pub include_plugins: bool,
}

impl ResolverOptions {
    pub fn new(platform: Platform, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            working_dir: working_dir.into(),
            repo_root: None,
            admin_path: None,
            system_path: None,
            include_plugins: false,
        }
    }
}

/// Resolves the effective skill set for one platform.
#[derive(Debug, Clone)]
pub struct Resolver {
    options: ResolverOptions,
    config: Config,
    plugins: Option<Arc<PluginResolver>>,
}

impl Resolver {
    /// Build a resolver; the plugin manifest is read here for Claude Code.
    pub fn new(options: ResolverOptions, config: &Config) -> Self {
        let plugins = (options.platform == Platform::ClaudeCode)
            .then(|| Arc::new(PluginResolver::from_config(config)));
        Self {
            options,
            config: config.clone(),
            plugins,
        }
    }

    /// The repository root used for repo scope, if any.
    pub fn repo_root(&self) -> Option<PathBuf> {
        self.options
            .repo_root
            .clone()
            .or_else(|| find_repo_root(&self.options.working_dir))
    }

    /// Search paths in precedence order. Paths that do not exist are kept;
    /// they are skipped at parse time.
    pub fn search_paths(&self) -> Vec<(Scope, PathBuf)> {
        let platform_dir = self.options.platform.config_dir();
        let skills_under = |base: &Path| base.join(platform_dir).join(SKILLS_DIR);

        let mut paths = Vec::new();

        let working_dir = absolute(&self.options.working_dir);
        paths.push((Scope::Repo, skills_under(&working_dir)));
        if let Some(repo_root) = self.repo_root() {
            if absolute(&repo_root) != working_dir {
                paths.push((Scope::Repo, skills_under(&repo_root)));
            }
        }

        paths.push((Scope::User, skills_under(&self.config.home_dir)));

        if let Some(admin) = &self.options.admin_path {
            paths.push((Scope::Admin, admin.clone()));
        }
        if let Some(system) = &self.options.system_path {
            paths.push((Scope::System, system.clone()));
        }

        paths
    }

    /// Resolve across every scope.
    pub fn resolve(&self) -> Vec<Skill> {
        let mut scopes = Scope::SEARCH_ORDER.to_vec();
        scopes.push(Scope::Plugin);
        self.resolve_scopes(&scopes)
    }

    /// Resolve using only the listed scopes.
    pub fn resolve_scopes(&self, scopes: &[Scope]) -> Vec<Skill> {
        let mut records = Vec::new();

        for (scope, path) in self.search_paths() {
            if !scopes.contains(&scope) {
                continue;
            }
            if !path.exists() {
                debug!("Skipping missing {scope} path {}", path.display());
                continue;
            }

            let parser = parser_for(self.options.platform, &path, &self.config, self.plugins.clone());
            match parser.parse() {
                Ok(skills) => {
                    debug!("Found {} skill(s) at {scope} path {}", skills.len(), path.display());
                    records.extend(skills.into_iter().map(|mut skill| {
                        skill.scope = Some(scope);
                        skill
                    }));
                }
                Err(err) => warn!("Skipping {scope} path {}: {err}", path.display()),
            }
        }

        if self.options.include_plugins && scopes.contains(&Scope::Plugin) {
            records.extend(self.plugin_records());
        }

        merge_by_precedence(records)
    }

    /// Resolve a single scope; the first path searched wins name collisions.
    pub fn resolve_scope(&self, scope: Scope) -> Vec<Skill> {
        self.resolve_scopes(&[scope])
    }

    fn plugin_records(&self) -> Vec<Skill> {
        let Some(plugins) = &self.plugins else {
            return Vec::new();
        };
        match PluginCacheParser::new(Arc::clone(plugins)).parse() {
            Ok(skills) => skills,
            Err(err) => {
                warn!("Skipping plugin cache: {err}");
                Vec::new()
            }
        }
    }
}

/// Keep one record per name: a later record replaces the incumbent only when
/// its scope strictly outranks it. Output is sorted by name.
pub fn merge_by_precedence(records: Vec<Skill>) -> Vec<Skill> {
    let mut merged: BTreeMap<String, Skill> = BTreeMap::new();
    for skill in records {
        match merged.entry(skill.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(skill);
            }
            Entry::Occupied(mut slot) => {
                let incumbent = slot.get().scope.unwrap_or(Scope::Builtin);
                let candidate = skill.scope.unwrap_or(Scope::Builtin);
                if candidate.outranks(incumbent) {
                    debug!(
                        "{} at {candidate} overrides {} at {incumbent}",
                        skill.source_path.display(),
                        slot.get().source_path.display()
                    );
                    slot.insert(skill);
                }
            }
        }
    }
    merged.into_values().collect()
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
