//! Platform parsers.
//!
//! Every parser turns one root directory into a list of [`Skill`] records.
//! The standard `SKILL.md` parser is shared; each platform parser owns one and
//! layers its legacy conventions on top.

mod claude;
mod codex;
mod cursor;
mod plugin_cache;
mod standard;

pub use claude::ClaudeParser;
pub use codex::CodexParser;
pub use cursor::CursorParser;
pub use plugin_cache::PluginCacheParser;
pub use standard::StandardParser;

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ParserError, SkillError};
use crate::frontmatter::{self, Frontmatter};
use crate::plugin::PluginResolver;
use crate::skill::{Platform, Skill};

/// Common contract of the platform parsers.
pub trait SkillParser {
    /// Parse every skill under the parser's root.
    fn parse(&self) -> Result<Vec<Skill>, ParserError>;

    /// Platform the produced records belong to.
    fn platform(&self) -> Platform;

    /// Conventional user-level root for this parser.
    fn default_path(&self) -> PathBuf;
}

/// Build the parser for `platform` rooted at `root`.
pub fn parser_for(
    platform: Platform,
    root: &Path,
    config: &Config,
    plugins: Option<Arc<PluginResolver>>,
) -> Box<dyn SkillParser> {
    match platform {
        Platform::ClaudeCode => {
            let parser = ClaudeParser::new(root, &config.home_dir);
            Box::new(match plugins {
                Some(resolver) => parser.with_plugins(resolver),
                None => parser,
            })
        }
        Platform::Cursor => Box::new(CursorParser::new(root, &config.home_dir)),
        Platform::Codex => Box::new(CodexParser::new(root, &config.home_dir)),
    }
}

/// Check that the root can be listed.
///
/// Returns `Ok(false)` when it does not exist so callers can return no skills.
pub(crate) fn check_root(root: &Path) -> Result<bool, ParserError> {
    match fs::read_dir(root) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ParserError::UnreadableRoot {
            path: root.to_path_buf(),
            source,
        }),
    }
}

/// A skill file read from disk with its frontmatter split off and decoded.
pub(crate) struct SourceFile {
    pub frontmatter: Frontmatter,
    pub body: String,
    pub modified_at: DateTime<Utc>,
}

impl SourceFile {
    pub fn read(path: &Path) -> Result<Self, SkillError> {
        let io_err = |source: std::io::Error| SkillError::Io {
            path: path.to_path_buf(),
            source,
        };

        let content = fs::read(path).map_err(io_err)?;
        let modified_at = modified_time(path).map_err(io_err)?;

        let split = frontmatter::split(&content);
        let frontmatter =
            frontmatter::decode(&split.frontmatter).map_err(|source| SkillError::Frontmatter {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            frontmatter,
            body: frontmatter::normalize_body(&split.body),
            modified_at,
        })
    }
}

pub(crate) fn modified_time(path: &Path) -> std::io::Result<DateTime<Utc>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Log and drop per-file failures.
pub(crate) fn skip_failures(results: Vec<Result<Skill, SkillError>>) -> Vec<Skill> {
    results
        .into_iter()
        .filter_map(|result| match result {
            Ok(skill) => Some(skill),
            Err(err) => {
                warn!("Skipping skill: {err}");
                None
            }
        })
        .collect()
}

/// Flatten tiers ordered highest first; the first record seen for a name wins.
pub(crate) fn merge_tiers<I>(tiers: I) -> Vec<Skill>
where
    I: IntoIterator<Item = Vec<Skill>>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    for skill in tiers.into_iter().flatten() {
        if seen.insert(skill.name.clone()) {
            merged.push(skill);
        } else {
            debug!("Dropping shadowed skill {} from {}", skill.name, skill.source_path.display());
        }
    }
    merged
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::{Path, PathBuf};

    pub fn write_file(path: &Path, content: &str) -> PathBuf {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write file");
        path.to_path_buf()
    }

    pub fn names(skills: &[crate::skill::Skill]) -> Vec<&str> {
        let mut names: Vec<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}
