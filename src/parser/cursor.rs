//! Cursor skills and legacy `.md`/`.mdc` rules.

use std::path::{Path, PathBuf};

use super::{check_root, merge_tiers, skip_failures, SkillParser, SourceFile, StandardParser};
use crate::discovery::{discover_files, file_stem, is_skill_md, owned_by_standard_skill};
use crate::error::{ParserError, SkillError};
use crate::skill::{Platform, Skill};
use crate::validation::validate_name;

const LEGACY_PATTERNS: [&str; 4] = ["*.md", "*.mdc", "**/*.md", "**/*.mdc"];

/// Parser for a `.cursor/skills` or `.cursor/rules` root.
#[derive(Debug, Clone)]
pub struct CursorParser {
    root: PathBuf,
    home: PathBuf,
    standard: StandardParser,
}

impl CursorParser {
    pub fn new(root: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            standard: StandardParser::new(root.clone(), Platform::Cursor),
            root,
            home: home.into(),
        }
    }

    fn parse_legacy(&self) -> Vec<Skill> {
        let results = discover_files(&self.root, &LEGACY_PATTERNS)
            .into_iter()
            .filter(|path| !is_skill_md(path) && !owned_by_standard_skill(path, &self.root))
            .map(|path| parse_rule_file(&path))
            .collect();
        skip_failures(results)
    }
}

impl SkillParser for CursorParser {
    fn parse(&self) -> Result<Vec<Skill>, ParserError> {
        if !check_root(&self.root)? {
            return Ok(Vec::new());
        }

        let standard = self.standard.parse()?;
        Ok(merge_tiers([standard, self.parse_legacy()]))
    }

    fn platform(&self) -> Platform {
        Platform::Cursor
    }

    fn default_path(&self) -> PathBuf {
        self.home.join(Platform::Cursor.config_dir()).join("skills")
    }
}

/// A rule keeps every frontmatter key except `name` as metadata; description
/// and tools are never promoted.
fn parse_rule_file(path: &Path) -> Result<Skill, SkillError> {
    let source = SourceFile::read(path)?;

    let name = source
        .frontmatter
        .string("name")
        .unwrap_or_else(|| file_stem(path));
    validate_name(&name).map_err(|err| SkillError::InvalidName {
        path: path.to_path_buf(),
        source: err,
    })?;

    let mut skill = Skill::new(name, Platform::Cursor, path);
    skill.body = source.body;
    skill.modified_at = source.modified_at;
    skill.metadata = source.frontmatter.remaining(&["name"]);
    Ok(skill)
}
