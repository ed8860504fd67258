//! The `SKILL.md` layout shared by every platform.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{check_root, skip_failures, SkillParser, SourceFile};
use crate::discovery::{discover_files, get_dir_name};
use crate::error::{Error, ParserError, SkillError};
use crate::frontmatter::Frontmatter;
use crate::skill::{Platform, Skill, RESOURCE_DIRS};
use crate::validation::validate_name;

const PATTERNS: [&str; 2] = ["SKILL.md", "**/SKILL.md"];

/// Frontmatter keys that map onto dedicated record fields.
const DEDICATED_KEYS: [&str; 14] = [
    "name",
    "description",
    "tools",
    "allowed-tools",
    "type",
    "trigger",
    "scope",
    "license",
    "disable-model-invocation",
    "compatibility",
    "scripts",
    "references",
    "assets",
    "metadata",
];

/// Parses `<dir>/SKILL.md` skills anywhere below a root.
#[derive(Debug, Clone)]
pub struct StandardParser {
    root: PathBuf,
    platform: Platform,
}

impl StandardParser {
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    /// Parse a single `SKILL.md`.
    pub fn parse_file(&self, path: &Path) -> Result<Skill, SkillError> {
        let source = SourceFile::read(path)?;
        let skill_dir = path.parent().unwrap_or(&self.root);

        let name = source
            .frontmatter
            .string("name")
            .unwrap_or_else(|| get_dir_name(skill_dir));
        validate_name(&name).map_err(|err| SkillError::InvalidName {
            path: path.to_path_buf(),
            source: err,
        })?;

        let mut skill = Skill::new(name, self.platform, path);
        skill.description = source.frontmatter.trimmed("description").unwrap_or_default();
        skill.body = source.body;
        skill.modified_at = source.modified_at;
        apply_common_fields(&mut skill, &source.frontmatter)?;
        apply_standard_extensions(&mut skill, &source.frontmatter);
        skill.metadata = collect_metadata(&source.frontmatter, &DEDICATED_KEYS);
        attach_resources(&mut skill, skill_dir);

        Ok(skill)
    }
}

impl SkillParser for StandardParser {
    fn parse(&self) -> Result<Vec<Skill>, ParserError> {
        if !check_root(&self.root)? {
            return Ok(Vec::new());
        }

        let results = discover_files(&self.root, &PATTERNS)
            .iter()
            .map(|path| self.parse_file(path))
            .collect();
        Ok(skip_failures(results))
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn default_path(&self) -> PathBuf {
        self.root.clone()
    }
}

/// Tools, type, trigger and scope, which every layout reads the same way.
pub(crate) fn apply_common_fields(skill: &mut Skill, fm: &Frontmatter) -> Result<(), SkillError> {
    skill.tools = tool_list(fm);

    let path = skill.source_path.clone();
    let invalid = |source: Error| SkillError::InvalidField {
        path: path.clone(),
        source,
    };

    if let Some(kind) = fm.trimmed("type") {
        skill.skill_type = kind.parse().map_err(invalid)?;
    }
    if let Some(trigger) = fm.trimmed("trigger") {
        skill.trigger = Some(trigger);
    }
    if let Some(scope) = fm.trimmed("scope") {
        skill.scope = Some(scope.parse().map_err(invalid)?);
    }
    Ok(())
}

/// `tools` when present, otherwise `allowed-tools`; both accept a list or a
/// comma-separated string.
pub(crate) fn tool_list(fm: &Frontmatter) -> Vec<String> {
    if fm.contains("tools") {
        fm.string_list("tools")
    } else {
        fm.string_list("allowed-tools")
    }
}

fn apply_standard_extensions(skill: &mut Skill, fm: &Frontmatter) {
    skill.license = fm.trimmed("license");
    skill.disable_model_invocation = fm.bool("disable-model-invocation");
    skill.compatibility = fm.string_map("compatibility");
    skill.scripts = fm.string_list("scripts");
    skill.references = fm.string_list("references");
    skill.assets = fm.string_list("assets");
}

/// Unknown keys plus the entries of a nested `metadata:` mapping.
pub(crate) fn collect_metadata(
    fm: &Frontmatter,
    excluded: &[&str],
) -> std::collections::BTreeMap<String, String> {
    let mut metadata = fm.string_map("metadata");
    metadata.extend(fm.remaining(excluded));
    metadata
}

/// Add files found under `scripts/`, `references/` and `assets/` next to the
/// skill file, relative to the skill directory.
fn attach_resources(skill: &mut Skill, skill_dir: &Path) {
    for dir_name in RESOURCE_DIRS {
        let dir = skill_dir.join(dir_name);
        if !dir.is_dir() {
            continue;
        }

        let target = match dir_name {
            "scripts" => &mut skill.scripts,
            "references" => &mut skill.references,
            _ => &mut skill.assets,
        };

        let mut found: Vec<String> = WalkDir::new(&dir)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(skill_dir)
                    .ok()
                    .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        found.sort();

        for rel in found {
            if !target.contains(&rel) {
                target.push(rel);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NameError;
    use crate::parser::test_support::{names, write_file};
    use crate::skill::{Scope, SkillType};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn parses_standard_fields() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(
            &root.join("pdf/SKILL.md"),
            "---\nname: pdf-tools\ndescription: Work with PDFs\nlicense: MIT\n\
             disable-model-invocation: true\ncompatibility:\n  claude-code: '>=1.0'\n\
             allowed-tools: [Bash, Read]\nscope: repository\nauthor: someone\n\
             metadata:\n  version: 2\n---\r\n\r\n# PDF\r\n\r\nUse it.\r\n",
        );
        write_file(&root.join("pdf/scripts/extract.py"), "print()");
        write_file(&root.join("pdf/references/spec/notes.md"), "notes");
        write_file(&root.join("pdf/assets/logo.png"), "png");

        let parser = StandardParser::new(root, Platform::ClaudeCode);
        let skills = parser.parse().expect("parse");
        assert_eq!(skills.len(), 1);
        let skill = &skills[0];

        assert_eq!(skill.name, "pdf-tools");
        assert_eq!(skill.description, "Work with PDFs");
        assert_eq!(skill.body, "# PDF\n\nUse it.");
        assert_eq!(skill.license.as_deref(), Some("MIT"));
        assert!(skill.disable_model_invocation);
        assert_eq!(
            skill.compatibility.get("claude-code").map(String::as_str),
            Some(">=1.0")
        );
        assert_eq!(skill.tools, vec!["Bash", "Read"]);
        assert_eq!(skill.scope, Some(Scope::Repo));
        assert_eq!(skill.skill_type, SkillType::Skill);
        assert_eq!(skill.scripts, vec!["scripts/extract.py"]);
        assert_eq!(skill.references, vec!["references/spec/notes.md"]);
        assert_eq!(skill.assets, vec!["assets/logo.png"]);
        assert_eq!(skill.metadata.get("author").map(String::as_str), Some("someone"));
        assert_eq!(skill.metadata.get("version").map(String::as_str), Some("2"));
        assert!(!skill.metadata.contains_key("license"));
    }

    #[test]
    fn declared_resources_are_not_duplicated() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(
            &root.join("tool/SKILL.md"),
            "---\nscripts: [scripts/run.sh, scripts/remote.sh]\n---\nBody",
        );
        write_file(&root.join("tool/scripts/run.sh"), "#!/bin/sh");

        let skills = StandardParser::new(root, Platform::Cursor).parse().expect("parse");
        assert_eq!(skills[0].scripts, vec!["scripts/run.sh", "scripts/remote.sh"]);
    }

    #[test]
    fn name_falls_back_to_directory() {
        let dir = TempDir::new().expect("temp dir");
        write_file(&dir.path().join("deploy/SKILL.md"), "Just a body\n");

        let skills = StandardParser::new(dir.path(), Platform::Codex).parse().expect("parse");
        assert_eq!(names(&skills), vec!["deploy"]);
        assert_eq!(skills[0].body, "Just a body");
        assert_eq!(skills[0].platform, Platform::Codex);
    }

    #[test]
    fn invalid_files_are_skipped() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        write_file(&root.join("good/SKILL.md"), "---\nname: good\n---\nok");
        write_file(&root.join("bad-name/SKILL.md"), "---\nname: has space\n---\n");
        write_file(&root.join("bad-yaml/SKILL.md"), "---\nname: [broken\n---\n");
        write_file(&root.join("bad-scope/SKILL.md"), "---\nscope: galaxy\n---\n");

        let skills = StandardParser::new(root, Platform::ClaudeCode).parse().expect("parse");
        assert_eq!(names(&skills), vec!["good"]);
    }

    #[test]
    fn declared_names_are_validated_as_written() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        let padded = write_file(&root.join("padded/SKILL.md"), "---\nname: \" review \"\n---\nBody");
        write_file(&root.join("blank/SKILL.md"), "---\nname: \"   \"\n---\nBody");
        write_file(&root.join("empty/SKILL.md"), "---\nname: \"\"\n---\nBody");

        let parser = StandardParser::new(root, Platform::ClaudeCode);
        assert!(parser.parse().expect("parse").is_empty());

        let err = parser.parse_file(&padded).expect_err("padded name");
        assert!(matches!(
            err,
            SkillError::InvalidName {
                source: NameError::SurroundingWhitespace(ref name),
                ..
            } if name == " review "
        ));
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = TempDir::new().expect("temp dir");
        let parser = StandardParser::new(dir.path().join("missing"), Platform::ClaudeCode);
        assert!(parser.parse().expect("parse").is_empty());
    }
}
