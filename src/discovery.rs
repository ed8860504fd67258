//! Skill file discovery utilities.
//!
//! This module enumerates candidate files under a skill root from a set of glob
//! patterns, walking symlinked directories without looping, and locates the
//! repository root that anchors repo-scoped skills.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;
use walkdir::WalkDir;

use crate::skill::SKILL_FILE;

const RECURSIVE_MARKER: &str = "**/";

/// Find every regular file under `root` matching any of `patterns`.
///
/// A pattern is either a plain glob relative to `root` (`*.md`) or contains a
/// single `**/` segment (`**/SKILL.md`), in which case the tree below the prefix
/// is walked and files whose name matches the suffix are returned. A missing
/// root yields an empty result. Paths are absolute, deduplicated and sorted.
pub fn discover_files(root: &Path, patterns: &[&str]) -> Vec<PathBuf> {
    let root = absolute(root);
    if !root.is_dir() {
        return Vec::new();
    }

    let mut found = BTreeSet::new();
    for pattern in patterns {
        if let Some((prefix, suffix)) = pattern.split_once(RECURSIVE_MARKER) {
            found.extend(walk_matching(&root.join(prefix), suffix));
        } else {
            found.extend(glob_matching(&root, pattern));
        }
    }

    found.into_iter().collect()
}

fn glob_matching(root: &Path, pattern: &str) -> Vec<PathBuf> {
    let full = format!(
        "{}/{}",
        Pattern::escape(&root.to_string_lossy()),
        pattern
    );

    let Ok(paths) = glob::glob(&full) else {
        debug!("Ignoring invalid glob pattern {pattern:?}");
        return Vec::new();
    };

    paths
        .filter_map(Result::ok)
        .filter(|path| fs::metadata(path).map(|meta| meta.is_file()).unwrap_or(false))
        .collect()
}

/// Walk `start`, following directory symlinks, and return files whose basename
/// matches `suffix`. Each canonical directory is entered at most once, which
/// breaks symlink cycles without bounding depth.
fn walk_matching(start: &Path, suffix: &str) -> Vec<PathBuf> {
    let Ok(pattern) = Pattern::new(suffix) else {
        debug!("Ignoring invalid recursive pattern {suffix:?}");
        return Vec::new();
    };
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let mut visited: HashSet<PathBuf> = HashSet::new();
    let walker = WalkDir::new(start)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            match fs::canonicalize(entry.path()) {
                Ok(canonical) => visited.insert(canonical),
                Err(_) => false,
            }
        });

    let mut matches = Vec::new();
    for entry in walker {
        // Loop errors and unreadable entries are skipped silently.
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if pattern.matches_with(&name, options) {
            matches.push(entry.into_path());
        }
    }
    matches
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Find the repository root by walking up from `start`.
///
/// Returns the first ancestor that contains a `.git` entry. Both directories and
/// files count, so git worktrees are recognized.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let start = absolute(start);
    start
        .ancestors()
        .find(|dir| fs::symlink_metadata(dir.join(".git")).is_ok())
        .map(Path::to_path_buf)
}

/// Find the SKILL.md file in a directory.
///
/// Prefers uppercase `SKILL.md` over lowercase `skill.md`.
pub fn find_skill_md(skill_dir: &Path) -> Option<PathBuf> {
    for name in [SKILL_FILE, "skill.md"] {
        let path = skill_dir.join(name);
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

/// True when the file itself is a standard skill file (any case).
pub fn is_skill_md(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.eq_ignore_ascii_case(SKILL_FILE))
        .unwrap_or(false)
}

/// True when some directory between the file and `root` (inclusive) holds a
/// `SKILL.md`, meaning the standard layout owns that subtree.
pub fn owned_by_standard_skill(file: &Path, root: &Path) -> bool {
    let root = absolute(root);
    let Some(parent) = file.parent() else {
        return false;
    };

    for dir in parent.ancestors() {
        if find_skill_md(dir).is_some() {
            return true;
        }
        if dir == root {
            break;
        }
    }
    false
}

/// Extract the final component of a path as a string.
pub fn get_dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// File name without its extension.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Convert a path to a display-friendly relative path.
pub fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map(|rel| rel.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}
