//! Skills shipped by installed Claude Code plugins.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use super::{merge_tiers, SkillParser, StandardParser};
use crate::error::ParserError;
use crate::plugin::PluginResolver;
use crate::skill::{Platform, Scope, Skill};

/// Walks every enabled plugin in the plugin index and parses its `SKILL.md`
/// files. Records always carry `scope = plugin` and provenance from the index.
#[derive(Debug, Clone)]
pub struct PluginCacheParser {
    plugins: Arc<PluginResolver>,
}

impl PluginCacheParser {
    pub fn new(plugins: Arc<PluginResolver>) -> Self {
        Self { plugins }
    }
}

impl SkillParser for PluginCacheParser {
    fn parse(&self) -> Result<Vec<Skill>, ParserError> {
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut tiers = Vec::new();

        for entry in self.plugins.index().entries() {
            if !visited.insert(entry.install_path.clone()) {
                continue;
            }

            let standard = StandardParser::new(entry.install_path.clone(), Platform::ClaudeCode);
            let mut skills = match standard.parse() {
                Ok(skills) => skills,
                Err(err) => {
                    warn!("Skipping plugin {}: {err}", entry.plugin_key);
                    continue;
                }
            };

            let info = self.plugins.info_for_entry(entry);
            for skill in &mut skills {
                skill.scope = Some(Scope::Plugin);
                skill.plugin_info = Some(info.clone());
            }
            tiers.push(skills);
        }

        Ok(merge_tiers(tiers))
    }

    fn platform(&self) -> Platform {
        Platform::ClaudeCode
    }

    fn default_path(&self) -> PathBuf {
        self.plugins.cache_root().to_path_buf()
    }
}
