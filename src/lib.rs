//! Discover, resolve and back up AI assistant skills for Claude Code, Cursor
//! and Codex.
//!
//! The pipeline: [`discovery`] finds candidate files, [`frontmatter`] splits
//! and decodes them, the platform parsers in [`parser`] turn them into
//! [`Skill`] records, and the [`resolver`] merges the records from every scope
//! under the precedence rules. The [`backup`] store keeps content-hashed
//! copies of skill files.

pub mod backup;
pub mod config;
pub mod discovery;
pub mod error;
pub mod frontmatter;
pub mod parser;
pub mod plugin;
pub mod resolver;
pub mod skill;
pub mod validation;

pub use backup::{BackupMetadata, BackupStats, BackupStore, CleanupOptions, CreateOptions};
pub use config::Config;
pub use discovery::{discover_files, display_path, find_repo_root};
pub use error::{BackupError, ConfigError, Error, NameError, ParseError, ParserError, PluginError, SkillError};
pub use parser::{parser_for, SkillParser};
pub use plugin::{PluginIndex, PluginResolver};
pub use resolver::{Resolver, ResolverOptions};
pub use skill::{Platform, PluginInfo, Scope, Skill, SkillType};
pub use validation::validate_name;
