//! Codex CLI skills: standard `SKILL.md` directories, instructions embedded in
//! `config.toml`, and `AGENTS.md` files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use super::{check_root, merge_tiers, modified_time, skip_failures, SkillParser, SourceFile, StandardParser};
use crate::discovery::{discover_files, get_dir_name, is_skill_md};
use crate::error::{ParserError, SkillError};
use crate::skill::{Platform, Skill};
use crate::validation::is_valid_name;

const CONFIG_FILE: &str = "config.toml";
const AGENTS_PATTERNS: [&str; 2] = ["AGENTS.md", "**/AGENTS.md"];

pub const CONFIG_SKILL_NAME: &str = "codex-config";
const ROOT_AGENTS_NAME: &str = "agents";
const FALLBACK_AGENTS_NAME: &str = "codex-agents";

/// The subset of `config.toml` that carries instructions.
#[derive(Debug, Default, Deserialize)]
struct CodexConfig {
    model: Option<String>,
    approval_policy: Option<String>,
    sandbox_mode: Option<String>,
    instructions: Option<String>,
    developer_instructions: Option<String>,
    profile: Option<String>,
}

impl CodexConfig {
    fn promoted_metadata(&self) -> BTreeMap<String, String> {
        [
            ("model", &self.model),
            ("approval_policy", &self.approval_policy),
            ("sandbox_mode", &self.sandbox_mode),
            ("profile", &self.profile),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
        .collect()
    }

    fn combined_instructions(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.instructions, &self.developer_instructions]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

/// Parser for a `.codex` root.
#[derive(Debug, Clone)]
pub struct CodexParser {
    root: PathBuf,
    home: PathBuf,
    standard: StandardParser,
}

impl CodexParser {
    pub fn new(root: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            standard: StandardParser::new(root.clone(), Platform::Codex),
            root,
            home: home.into(),
        }
    }

    /// The synthetic `codex-config` skill, if the config carries instructions.
    fn parse_config(&self) -> Result<Option<Skill>, SkillError> {
        let path = self.root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let io_err = |source: std::io::Error| SkillError::Io {
            path: path.clone(),
            source,
        };
        let text = fs::read_to_string(&path).map_err(io_err)?;
        let modified_at = modified_time(&path).map_err(io_err)?;
        let config: CodexConfig = toml::from_str(&text).map_err(|source| SkillError::Toml {
            path: path.clone(),
            source,
        })?;

        let Some(body) = config.combined_instructions() else {
            return Ok(None);
        };

        let mut skill = Skill::new(CONFIG_SKILL_NAME, Platform::Codex, &path);
        skill.description = "Instructions from Codex config.toml".to_string();
        skill.body = body;
        skill.modified_at = modified_at;
        skill.metadata = config.promoted_metadata();
        Ok(Some(skill))
    }

    fn parse_agents(&self) -> Vec<Skill> {
        let results = discover_files(&self.root, &AGENTS_PATTERNS)
            .into_iter()
            .filter(|path| !is_skill_md(path))
            .map(|path| self.parse_agents_file(&path))
            .collect();
        skip_failures(results)
    }

    fn parse_agents_file(&self, path: &Path) -> Result<Skill, SkillError> {
        let source = SourceFile::read(path)?;

        let mut skill = Skill::new(self.agents_name(path), Platform::Codex, path);
        skill.description = source.frontmatter.trimmed("description").unwrap_or_default();
        skill.body = source.body;
        skill.modified_at = source.modified_at;
        skill.metadata = source.frontmatter.remaining(&["name", "description"]);
        Ok(skill)
    }

    /// `agents` at the root, `<dir>-agents` below it, `codex-agents` when the
    /// directory name does not make a valid skill name.
    fn agents_name(&self, path: &Path) -> String {
        let parent = path.parent().unwrap_or(&self.root);
        let root = std::path::absolute(&self.root).unwrap_or_else(|_| self.root.clone());
        if parent == root {
            return ROOT_AGENTS_NAME.to_string();
        }

        let candidate = format!("{}-agents", get_dir_name(parent));
        if is_valid_name(&candidate) {
            candidate
        } else {
            FALLBACK_AGENTS_NAME.to_string()
        }
    }
}

impl SkillParser for CodexParser {
    fn parse(&self) -> Result<Vec<Skill>, ParserError> {
        if !check_root(&self.root)? {
            return Ok(Vec::new());
        }

        let standard = self.standard.parse()?;
        let config = match self.parse_config() {
            Ok(skill) => skill.into_iter().collect(),
            Err(err) => {
                warn!("Skipping Codex config: {err}");
                Vec::new()
            }
        };
        let agents = self.parse_agents();

        Ok(merge_tiers([standard, config, agents]))
    }

    fn platform(&self) -> Platform {
        Platform::Codex
    }

    fn default_path(&self) -> PathBuf {
        self.home.join(Platform::Codex.config_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_support::{names, write_file};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn config_instructions_become_a_skill() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(
            &root.join("config.toml"),
            "model = \"o4\"\napproval_policy = \"on-request\"\ninstructions = \"Be brief.\"\n\
             developer_instructions = \"Prefer Rust.\"\n\n[profiles.fast]\nmodel = \"mini\"\n",
        );

        let skills = CodexParser::new(root, root).parse().expect("parse");
        assert_eq!(names(&skills), vec![CONFIG_SKILL_NAME]);
        let skill = &skills[0];
        assert_eq!(skill.body, "Be brief.\n\nPrefer Rust.");
        assert_eq!(skill.metadata.get("model").map(String::as_str), Some("o4"));
        assert_eq!(
            skill.metadata.get("approval_policy").map(String::as_str),
            Some("on-request")
        );
        assert!(!skill.metadata.contains_key("sandbox_mode"));
    }

    #[test]
    fn config_without_instructions_yields_nothing() {
        let dir = TempDir::new().expect("temp dir");
        write_file(&dir.path().join("config.toml"), "model = \"o4\"\n");
        let skills = CodexParser::new(dir.path(), dir.path()).parse().expect("parse");
        assert!(skills.is_empty());
    }

    #[test]
    fn malformed_config_is_skipped() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(&root.join("config.toml"), "instructions = \n");
        write_file(&root.join("AGENTS.md"), "Root agent notes\n");

        let skills = CodexParser::new(root, root).parse().expect("parse");
        assert_eq!(names(&skills), vec!["agents"]);
    }

    #[test]
    fn agents_files_are_named_by_location() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(&root.join("AGENTS.md"), "Root notes\n");
        write_file(&root.join("backend/AGENTS.md"), "Backend notes\n");
        write_file(&root.join("has space/AGENTS.md"), "Odd notes\n");

        let skills = CodexParser::new(root, root).parse().expect("parse");
        assert_eq!(names(&skills), vec!["agents", "backend-agents", "codex-agents"]);
        let backend = skills.iter().find(|s| s.name == "backend-agents").expect("backend");
        assert_eq!(backend.body, "Backend notes");
    }

    #[test]
    fn tiers_resolve_standard_then_config_then_agents() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(
            &root.join("config.toml"),
            "instructions = \"from config\"\n",
        );
        write_file(
            &root.join("codex-config/SKILL.md"),
            "---\nname: codex-config\n---\nfrom standard\n",
        );
        write_file(&root.join("AGENTS.md"), "---\nname: ignored\n---\nroot agents\n");
        write_file(
            &root.join("agents/SKILL.md"),
            "---\nname: agents\n---\nstandard agents\n",
        );

        let skills = CodexParser::new(root, root).parse().expect("parse");
        assert_eq!(names(&skills), vec!["agents", "codex-config"]);
        for skill in &skills {
            assert!(skill.body.starts_with("standard") || skill.body == "from standard");
        }
    }
}
