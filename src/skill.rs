//! Core skill types: the normalized record, platforms and scopes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Name of the standard-format skill file.
pub const SKILL_FILE: &str = "SKILL.md";

/// Conventional subdirectories scanned next to a `SKILL.md`.
pub const RESOURCE_DIRS: [&str; 3] = ["scripts", "references", "assets"];

/// An assistant platform whose skills can be discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    ClaudeCode,
    Cursor,
    Codex,
}

impl Platform {
    pub const ALL: [Self; 3] = [Self::ClaudeCode, Self::Cursor, Self::Codex];

    /// The tag used in serialized data and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude-code",
            Self::Cursor => "cursor",
            Self::Codex => "codex",
        }
    }

    /// Configuration directory under a home or project directory.
    pub const fn config_dir(self) -> &'static str {
        match self {
            Self::ClaudeCode => ".claude",
            Self::Cursor => ".cursor",
            Self::Codex => ".codex",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude-code" | "claude" => Ok(Self::ClaudeCode),
            "cursor" => Ok(Self::Cursor),
            "codex" => Ok(Self::Codex),
            other => Err(Error::UnknownPlatform(other.to_string())),
        }
    }
}

/// Provenance layer of a skill. Declaration order is precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Repo,
    User,
    Admin,
    System,
    Builtin,
    Plugin,
}

impl Scope {
    /// Scopes a resolver searches, highest precedence first.
    pub const SEARCH_ORDER: [Self; 5] = [
        Self::Repo,
        Self::User,
        Self::Admin,
        Self::System,
        Self::Builtin,
    ];

    /// Rank of the scope; 0 is the highest precedence.
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Repo => 0,
            Self::User => 1,
            Self::Admin => 2,
            Self::System => 3,
            Self::Builtin => 4,
            Self::Plugin => 5,
        }
    }

    /// True when `self` takes strictly higher precedence than `other`.
    pub const fn outranks(self, other: Self) -> bool {
        self.precedence() < other.precedence()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Repo => "repo",
            Self::User => "user",
            Self::Admin => "admin",
            Self::System => "system",
            Self::Builtin => "builtin",
            Self::Plugin => "plugin",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repo" | "repository" => Ok(Self::Repo),
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "system" => Ok(Self::System),
            "builtin" => Ok(Self::Builtin),
            "plugin" => Ok(Self::Plugin),
            _ => Err(Error::UnknownScope(s.to_string())),
        }
    }
}

/// Whether a record is a model-invoked skill or a user-invoked prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    #[default]
    Skill,
    Prompt,
}

impl FromStr for SkillType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skill" => Ok(Self::Skill),
            "prompt" => Ok(Self::Prompt),
            _ => Err(Error::UnknownSkillType(s.to_string())),
        }
    }
}

/// Where a plugin-provided skill came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub plugin_name: String,
    pub marketplace: String,
    pub version: String,
    pub install_path: PathBuf,
    pub symlink_target: PathBuf,
    pub install_scope: String,
    /// The skill is symlinked from outside the plugin cache.
    pub is_dev: bool,
}

/// A normalized skill record produced by the discovery pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub platform: Platform,
    pub source_path: PathBuf,
    pub body: String,
    pub modified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(rename = "type")]
    pub skill_type: SkillType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_info: Option<PluginInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable_model_invocation: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub compatibility: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<String>,
}

impl Skill {
    /// A record with every optional field empty.
    pub fn new(name: impl Into<String>, platform: Platform, source_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            platform,
            source_path: source_path.into(),
            body: String::new(),
            modified_at: DateTime::<Utc>::default(),
            tools: Vec::new(),
            skill_type: SkillType::Skill,
            trigger: None,
            scope: None,
            metadata: BTreeMap::new(),
            plugin_info: None,
            license: None,
            disable_model_invocation: false,
            compatibility: BTreeMap::new(),
            scripts: Vec::new(),
            references: Vec::new(),
            assets: Vec::new(),
        }
    }

    /// Directory holding the source file.
    pub fn dir(&self) -> Option<&std::path::Path> {
        self.source_path.parent()
    }
}
