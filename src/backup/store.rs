use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::index::{BackupIndex, BackupMetadata};
use super::{create_private_dir, hash_file, io_err, remove_if_exists, sha256_hex, write_private_file};
use crate::config::Config;
use crate::error::BackupError;
use crate::skill::Platform;

const BACKUPS_DIR: &str = "backups";
const METADATA_DIR: &str = "metadata";
const INDEX_FILE: &str = "index.json";

/// Optional annotations recorded with a new backup.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Aggregate figures over the whole index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupStats {
    pub total_count: usize,
    pub total_size: u64,
    pub by_platform: BTreeMap<Platform, usize>,
    /// The Unix epoch when the index is empty.
    pub oldest: DateTime<Utc>,
    pub newest: DateTime<Utc>,
}

impl BackupStats {
    fn from_entries<'a>(entries: impl Iterator<Item = &'a BackupMetadata>) -> Self {
        let mut stats = Self {
            total_count: 0,
            total_size: 0,
            by_platform: BTreeMap::new(),
            oldest: DateTime::<Utc>::default(),
            newest: DateTime::<Utc>::default(),
        };
        for entry in entries {
            if stats.total_count == 0 || entry.created_at < stats.oldest {
                stats.oldest = entry.created_at;
            }
            if stats.total_count == 0 || entry.created_at > stats.newest {
                stats.newest = entry.created_at;
            }
            stats.total_count += 1;
            stats.total_size += entry.size;
            *stats.by_platform.entry(entry.platform).or_default() += 1;
        }
        stats
    }
}

/// Backup store rooted at a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupStore {
    base_dir: PathBuf,
}

impl BackupStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.data_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(METADATA_DIR).join(INDEX_FILE)
    }

    fn platform_dir(&self, platform: Platform) -> PathBuf {
        self.base_dir.join(BACKUPS_DIR).join(platform.as_str())
    }

    pub fn load_index(&self) -> Result<BackupIndex, BackupError> {
        BackupIndex::load(&self.index_path())
    }

    fn save_index(&self, index: &mut BackupIndex) -> Result<(), BackupError> {
        index.save(&self.index_path())
    }

    /// Copy one file into the store and record it.
    ///
    /// Two backups of identical content taken in the same second share an id;
    /// the later one replaces the earlier index entry.
    pub fn create(
        &self,
        source: &Path,
        platform: Platform,
        options: &CreateOptions,
    ) -> Result<BackupMetadata, BackupError> {
        let mut index = self.load_index()?;

        let source = std::path::absolute(source).map_err(io_err(source))?;
        let stat = fs::metadata(&source).map_err(io_err(&source))?;
        let content = fs::read(&source).map_err(io_err(&source))?;
        let hash = sha256_hex(&content);
        let created_at = Utc::now();
        let id = format!("{}-{}", created_at.format("%Y%m%d-%H%M%S"), &hash[..8]);

        let file_name = match source.extension() {
            Some(ext) => format!("{id}.{}", ext.to_string_lossy()),
            None => id.clone(),
        };
        let dir = self.platform_dir(platform);
        create_private_dir(&dir)?;
        let backup_path = dir.join(file_name);
        write_private_file(&backup_path, &content)?;

        let entry = BackupMetadata {
            id,
            modified_at: stat.modified().map(DateTime::<Utc>::from).unwrap_or(created_at),
            source_path: source,
            backup_path,
            platform,
            created_at,
            hash,
            size: content.len() as u64,
            description: options.description.clone(),
            metadata: options.metadata.clone(),
            tags: options.tags.clone(),
        };

        if index.insert(entry.clone()).is_some() {
            debug!("Backup {} replaced an entry with the same id", entry.id);
        }
        self.save_index(&mut index)?;
        info!("Backed up {} as {}", entry.source_path.display(), entry.id);
        Ok(entry)
    }

    /// Back up every regular file below `dir`. Stops at the first failure;
    /// files already stored stay indexed.
    pub fn create_dir(
        &self,
        dir: &Path,
        platform: Platform,
        options: &CreateOptions,
    ) -> Result<Vec<BackupMetadata>, BackupError> {
        let mut created = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(dir).to_path_buf();
                BackupError::Io {
                    path,
                    source: io::Error::from(err),
                }
            })?;
            if entry.file_type().is_file() {
                created.push(self.create(entry.path(), platform, options)?);
            }
        }
        Ok(created)
    }

    /// Every entry, newest first, optionally for one platform.
    pub fn list(&self, platform: Option<Platform>) -> Result<Vec<BackupMetadata>, BackupError> {
        let index = self.load_index()?;
        let entries = index
            .entries()
            .filter(|entry| platform.is_none_or(|p| entry.platform == p))
            .cloned()
            .collect();
        Ok(newest_first(entries))
    }

    /// Every backup taken of `source`, newest first.
    pub fn history(&self, source: &Path) -> Result<Vec<BackupMetadata>, BackupError> {
        let source = std::path::absolute(source).map_err(io_err(source))?;
        let index = self.load_index()?;
        let entries = index
            .entries()
            .filter(|entry| entry.source_path == source)
            .cloned()
            .collect();
        Ok(newest_first(entries))
    }

    pub fn get(&self, id: &str) -> Result<BackupMetadata, BackupError> {
        self.load_index()?
            .remove(id)
            .ok_or_else(|| BackupError::NotFound(id.to_string()))
    }

    /// Write the stored bytes for `id` to `target` after checking their hash.
    pub fn restore(&self, id: &str, target: &Path) -> Result<BackupMetadata, BackupError> {
        let entry = self.get(id)?;
        let content = fs::read(&entry.backup_path).map_err(|err| missing_or_io(&entry, err))?;
        check_hash(&entry, sha256_hex(&content))?;

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_private_dir(parent)?;
        }
        write_private_file(target, &content)?;
        info!("Restored {} to {}", entry.id, target.display());
        Ok(entry)
    }

    /// Remove the stored file (if still present) and its index entry.
    pub fn delete(&self, id: &str) -> Result<BackupMetadata, BackupError> {
        let mut index = self.load_index()?;
        let entry = index
            .remove(id)
            .ok_or_else(|| BackupError::NotFound(id.to_string()))?;
        remove_if_exists(&entry.backup_path)?;
        self.save_index(&mut index)?;
        Ok(entry)
    }

    /// Confirm the stored file exists and still hashes to the recorded value.
    pub fn verify(&self, id: &str) -> Result<BackupMetadata, BackupError> {
        let entry = self.get(id)?;
        let actual = hash_file(&entry.backup_path).map_err(|err| missing_or_io(&entry, err))?;
        check_hash(&entry, actual)?;
        Ok(entry)
    }

    pub fn stats(&self) -> Result<BackupStats, BackupError> {
        let index = self.load_index()?;
        Ok(BackupStats::from_entries(index.entries()))
    }

    pub(crate) fn remove_entries(
        &self,
        index: &mut BackupIndex,
        doomed: &[BackupMetadata],
    ) -> Result<(), BackupError> {
        for entry in doomed {
            remove_if_exists(&entry.backup_path)?;
            index.remove(&entry.id);
        }
        self.save_index(index)
    }
}

fn newest_first(mut entries: Vec<BackupMetadata>) -> Vec<BackupMetadata> {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries
}

fn missing_or_io(entry: &BackupMetadata, err: io::Error) -> BackupError {
    if err.kind() == io::ErrorKind::NotFound {
        BackupError::MissingFile {
            id: entry.id.clone(),
            path: entry.backup_path.clone(),
        }
    } else {
        io_err(&entry.backup_path)(err)
    }
}

fn check_hash(entry: &BackupMetadata, actual: String) -> Result<(), BackupError> {
    if actual == entry.hash {
        Ok(())
    } else {
        Err(BackupError::HashMismatch {
            id: entry.id.clone(),
            expected: entry.hash.clone(),
            actual,
        })
    }
}
