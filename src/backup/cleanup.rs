//! Age and count based pruning.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::index::BackupMetadata;
use super::store::BackupStore;
use crate::error::BackupError;
use crate::skill::Platform;

/// Pruning rules, applied per `(platform, source_path)` group.
#[derive(Debug, Clone, Default)]
pub struct CleanupOptions {
    /// Delete entries created longer ago than this.
    pub max_age: Option<Duration>,
    /// Keep at most this many of the newest entries.
    pub max_count: Option<usize>,
    /// Never empty a group that had entries.
    pub keep_at_least_one: bool,
    /// Report what would be deleted without touching disk.
    pub dry_run: bool,
    /// Only consider groups for this platform.
    pub platform: Option<Platform>,
}

impl BackupStore {
    /// Delete expired backups and return them, newest first within each group.
    pub fn cleanup(&self, options: &CleanupOptions) -> Result<Vec<BackupMetadata>, BackupError> {
        self.cleanup_at(options, Utc::now())
    }

    pub(crate) fn cleanup_at(
        &self,
        options: &CleanupOptions,
        now: DateTime<Utc>,
    ) -> Result<Vec<BackupMetadata>, BackupError> {
        let mut index = self.load_index()?;
        let doomed = select_expired(index.entries(), options, now);

        if options.dry_run || doomed.is_empty() {
            return Ok(doomed);
        }
        self.remove_entries(&mut index, &doomed)?;
        info!("Removed {} expired backup(s)", doomed.len());
        Ok(doomed)
    }
}

fn select_expired<'a>(
    entries: impl Iterator<Item = &'a BackupMetadata>,
    options: &CleanupOptions,
    now: DateTime<Utc>,
) -> Vec<BackupMetadata> {
    let mut groups: BTreeMap<(Platform, PathBuf), Vec<&BackupMetadata>> = BTreeMap::new();
    for entry in entries {
        if options.platform.is_some_and(|p| p != entry.platform) {
            continue;
        }
        groups
            .entry((entry.platform, entry.source_path.clone()))
            .or_default()
            .push(entry);
    }

    let mut doomed = Vec::new();
    for mut group in groups.into_values() {
        group.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut marked: Vec<bool> = group
            .iter()
            .enumerate()
            .map(|(rank, entry)| {
                let too_old = options.max_age.is_some_and(|age| now - entry.created_at > age);
                let too_many = options.max_count.is_some_and(|max| rank >= max);
                too_old || too_many
            })
            .collect();

        if options.keep_at_least_one && marked.iter().all(|&m| m) {
            marked[0] = false;
        }

        doomed.extend(
            group
                .into_iter()
                .zip(marked)
                .filter_map(|(entry, marked)| marked.then(|| entry.clone())),
        );
    }
    doomed
}
