//! Error types for skillsync.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid input handed to the library by a caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The platform tag is not one of the recognized assistants.
    #[error("Unknown platform: {0} (expected claude-code, cursor or codex)")]
    UnknownPlatform(String),

    /// The scope tag is not one of the recognized scopes.
    #[error("Unknown scope: {0}")]
    UnknownScope(String),

    /// The skill type is neither `skill` nor `prompt`.
    #[error("Unknown skill type: {0} (expected skill or prompt)")]
    UnknownSkillType(String),
}

/// Errors that can occur when decoding a frontmatter block.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The YAML in the frontmatter is invalid.
    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// The frontmatter is not a YAML mapping.
    #[error("Frontmatter must be a YAML mapping")]
    NotAMapping,

    /// A frontmatter key is not a string.
    #[error("Frontmatter keys must be strings")]
    NonStringKey,
}

/// Reasons a skill name is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Skill name cannot be empty")]
    Empty,

    #[error("Skill name '{0}' has leading or trailing whitespace")]
    SurroundingWhitespace(String),

    #[error("Skill name '{0}' contains invalid characters (allowed: letters, digits, '-', '_', ':', '/')")]
    InvalidChars(String),
}

/// Errors for a single skill file. Parsers log these and move on.
#[derive(Debug, Error)]
pub enum SkillError {
    /// Failed to read or stat the file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The frontmatter could not be decoded.
    #[error("Invalid frontmatter in {path}: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// The derived or declared name failed validation.
    #[error("Invalid skill name in {path}: {source}")]
    InvalidName {
        path: PathBuf,
        #[source]
        source: NameError,
    },

    /// A frontmatter field holds a value outside its allowed set.
    #[error("Invalid value in {path}: {source}")]
    InvalidField {
        path: PathBuf,
        #[source]
        source: Error,
    },

    /// The Codex `config.toml` could not be decoded.
    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors that fail a whole parser root.
#[derive(Debug, Error)]
pub enum ParserError {
    /// The root exists but cannot be listed.
    #[error("Cannot read skill root {path}: {source}")]
    UnreadableRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur when loading the plugin manifest.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Failed to read plugin manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid plugin manifest {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by the backup store.
#[derive(Debug, Error)]
pub enum BackupError {
    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index file exists but is not valid JSON for the index schema.
    #[error("Backup index {path} is corrupt: {source}")]
    CorruptIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The index declares a schema version this build does not understand.
    #[error("Backup index {path} has unsupported version {version}")]
    UnsupportedIndexVersion { path: PathBuf, version: String },

    /// The index could not be serialized.
    #[error("Failed to serialize backup index: {0}")]
    Serialize(#[source] serde_json::Error),

    /// No entry with this id exists in the index.
    #[error("Backup not found: {0}")]
    NotFound(String),

    /// The index entry exists but its stored file does not.
    #[error("Backup file for {id} is missing: {path}")]
    MissingFile { id: String, path: PathBuf },

    /// The stored bytes no longer hash to the recorded value.
    #[error("Backup {id} failed integrity check: expected {expected}, found {actual}")]
    HashMismatch {
        id: String,
        expected: String,
        actual: String,
    },
}

/// Errors raised while building a [`crate::config::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the home directory")]
    NoHomeDir,
}
