//! Claude Code skills: standard `SKILL.md` directories plus legacy loose
//! markdown files and slash commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::standard::{apply_common_fields, collect_metadata};
use super::{check_root, merge_tiers, skip_failures, SkillParser, SourceFile, StandardParser};
use crate::discovery::{discover_files, file_stem, get_dir_name, is_skill_md, owned_by_standard_skill};
use crate::error::{ParserError, SkillError};
use crate::plugin::PluginResolver;
use crate::skill::{Platform, Skill, SkillType};
use crate::validation::validate_name;

const LEGACY_PATTERNS: [&str; 2] = ["*.md", "**/*.md"];

/// Directory whose direct children are slash commands.
const COMMANDS_DIR: &str = "commands";

/// Frontmatter keys that mark a file as a slash command.
const COMMAND_KEYS: [&str; 4] = ["allowed-tools", "argument-hint", "model", "trigger"];

const LEGACY_DEDICATED_KEYS: [&str; 7] = [
    "name",
    "description",
    "tools",
    "allowed-tools",
    "type",
    "trigger",
    "scope",
];

/// Parser for a `.claude/skills`-style root.
#[derive(Debug, Clone)]
pub struct ClaudeParser {
    root: PathBuf,
    home: PathBuf,
    standard: StandardParser,
    plugins: Option<Arc<PluginResolver>>,
}

impl ClaudeParser {
    pub fn new(root: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            standard: StandardParser::new(root.clone(), Platform::ClaudeCode),
            root,
            home: home.into(),
            plugins: None,
        }
    }

    /// Attach provenance to skills whose directory is a symlink.
    #[must_use]
    pub fn with_plugins(mut self, plugins: Arc<PluginResolver>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    fn parse_legacy(&self) -> Vec<Skill> {
        let results = discover_files(&self.root, &LEGACY_PATTERNS)
            .into_iter()
            .filter(|path| !is_skill_md(path) && !owned_by_standard_skill(path, &self.root))
            .map(|path| parse_legacy_file(&path))
            .collect();
        skip_failures(results)
    }

    fn attach_provenance(&self, skills: &mut [Skill]) {
        let Some(plugins) = &self.plugins else {
            return;
        };

        for skill in skills {
            let Some(dir) = skill.dir() else {
                continue;
            };
            if let Some(info) = plugins.resolve(dir) {
                debug!(
                    "Skill {} comes from plugin {} (dev: {})",
                    skill.name, info.plugin_name, info.is_dev
                );
                skill.plugin_info = Some(info);
            }
        }
    }
}

impl SkillParser for ClaudeParser {
    fn parse(&self) -> Result<Vec<Skill>, ParserError> {
        if !check_root(&self.root)? {
            return Ok(Vec::new());
        }

        let standard = self.standard.parse()?;
        let legacy = self.parse_legacy();
        let mut skills = merge_tiers([standard, legacy]);
        self.attach_provenance(&mut skills);
        Ok(skills)
    }

    fn platform(&self) -> Platform {
        Platform::ClaudeCode
    }

    fn default_path(&self) -> PathBuf {
        self.home.join(Platform::ClaudeCode.config_dir()).join("skills")
    }
}

fn is_command(path: &Path) -> bool {
    path.parent()
        .map(|parent| get_dir_name(parent) == COMMANDS_DIR)
        .unwrap_or(false)
}

fn parse_legacy_file(path: &Path) -> Result<Skill, SkillError> {
    let source = SourceFile::read(path)?;
    let fm = &source.frontmatter;
    let stem = file_stem(path);

    let explicit_name = fm.string("name");
    let name = explicit_name.clone().unwrap_or_else(|| stem.clone());
    validate_name(&name).map_err(|err| SkillError::InvalidName {
        path: path.to_path_buf(),
        source: err,
    })?;

    let mut skill = Skill::new(name, Platform::ClaudeCode, path);
    skill.description = fm.trimmed("description").unwrap_or_default();
    skill.body = source.body.clone();
    skill.modified_at = source.modified_at;

    let command = is_command(path);
    if command {
        skill.skill_type = SkillType::Prompt;
    }
    apply_common_fields(&mut skill, fm)?;

    let command_flavored = COMMAND_KEYS.iter().any(|key| fm.contains(key));
    if command && skill.trigger.is_none() && (explicit_name.is_none() || command_flavored) {
        skill.trigger = Some(format!("/{stem}"));
    }

    skill.metadata = collect_metadata(fm, &LEGACY_DEDICATED_KEYS);
    Ok(skill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_support::{names, write_file};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn parse(root: &Path) -> Vec<Skill> {
        ClaudeParser::new(root, root).parse().expect("parse")
    }

    #[test]
    fn command_file_becomes_prompt_with_trigger() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(
            &root.join("commands/review.md"),
            "---\ndescription: Review code quality\nallowed-tools: Bash, Read, Grep\n---\nReview the diff.\n",
        );

        let skills = parse(root);
        assert_eq!(skills.len(), 1);
        let skill = &skills[0];
        assert_eq!(skill.name, "review");
        assert_eq!(skill.skill_type, SkillType::Prompt);
        assert_eq!(skill.trigger.as_deref(), Some("/review"));
        assert_eq!(skill.description, "Review code quality");
        assert_eq!(skill.tools, vec!["Bash", "Read", "Grep"]);
        assert_eq!(skill.body, "Review the diff.");
    }

    #[test]
    fn named_command_without_command_keys_has_no_trigger() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(
            &root.join("commands/plan.md"),
            "---\nname: planner\ndescription: Plan work\n---\nPlan.\n",
        );
        write_file(
            &root.join("commands/ship.md"),
            "---\nname: shipper\nargument-hint: <branch>\n---\nShip.\n",
        );
        write_file(
            &root.join("commands/fix.md"),
            "---\ntrigger: /quickfix\ntype: skill\n---\nFix.\n",
        );

        let skills = parse(root);
        let by_name = |name: &str| skills.iter().find(|s| s.name == name).expect(name);

        let planner = by_name("planner");
        assert_eq!(planner.skill_type, SkillType::Prompt);
        assert_eq!(planner.trigger, None);

        let shipper = by_name("shipper");
        assert_eq!(shipper.trigger.as_deref(), Some("/ship"));
        assert_eq!(
            shipper.metadata.get("argument-hint").map(String::as_str),
            Some("<branch>")
        );

        let fix = by_name("fix");
        assert_eq!(fix.skill_type, SkillType::Skill);
        assert_eq!(fix.trigger.as_deref(), Some("/quickfix"));
    }

    #[test]
    fn standard_skill_wins_over_legacy_file() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(&root.join("dup.md"), "---\nname: dup\ndescription: legacy\n---\n");
        write_file(
            &root.join("dup/SKILL.md"),
            "---\nname: dup\ndescription: standard\n---\n",
        );

        let skills = parse(root);
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].description, "standard");
    }

    #[test]
    fn files_under_skill_directories_are_not_legacy_skills() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(&root.join("pdf/SKILL.md"), "---\nname: pdf\n---\n");
        write_file(&root.join("pdf/references/forms.md"), "# Forms\n");
        write_file(&root.join("pdf/docs/deep/notes.md"), "# Notes\n");
        write_file(&root.join("loose.md"), "A loose skill\n");

        let skills = parse(root);
        assert_eq!(names(&skills), vec!["loose", "pdf"]);
        let loose = skills.iter().find(|s| s.name == "loose").expect("loose");
        assert_eq!(loose.skill_type, SkillType::Skill);
        assert_eq!(loose.trigger, None);
    }

    #[test]
    fn tools_key_takes_priority_over_allowed_tools() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(
            &root.join("helper.md"),
            "---\ntools: [Edit]\nallowed-tools: Bash\n---\n",
        );

        let skills = parse(root);
        assert_eq!(skills[0].tools, vec!["Edit"]);
    }

    #[test]
    fn declared_legacy_names_are_not_trimmed_or_replaced() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(&root.join("padded.md"), "---\nname: \" padded \"\n---\nBody\n");
        write_file(&root.join("commands/blank.md"), "---\nname: \"  \"\n---\nBody\n");
        write_file(&root.join("plain.md"), "Body\n");

        assert_eq!(names(&parse(root)), vec!["plain"]);
    }

    #[test]
    fn default_path_is_under_home() {
        let parser = ClaudeParser::new("/work/.claude/skills", "/home/me");
        assert_eq!(parser.default_path(), PathBuf::from("/home/me/.claude/skills"));
        assert_eq!(parser.platform(), Platform::ClaudeCode);
    }
}
