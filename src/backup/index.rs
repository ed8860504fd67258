use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{create_private_dir, io_err, write_private_file};
use crate::error::BackupError;
use crate::skill::Platform;

/// The only index schema this build reads or writes.
pub const INDEX_VERSION: &str = "1.0";

/// One stored copy of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub id: String,
    pub source_path: PathBuf,
    pub backup_path: PathBuf,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
    /// Modification time of the source when it was captured.
    pub modified_at: DateTime<Utc>,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub hash: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// The persisted `id -> metadata` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupIndex {
    pub version: String,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub backups: BTreeMap<String, BackupMetadata>,
}

impl Default for BackupIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION.to_string(),
            updated: DateTime::<Utc>::default(),
            backups: BTreeMap::new(),
        }
    }
}

#[derive(Deserialize)]
struct VersionHeader {
    version: String,
}

impl BackupIndex {
    /// Load the index at `path`. A missing file is an empty index; anything
    /// unreadable is an error and the file is left untouched.
    pub fn load(path: &Path) -> Result<Self, BackupError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(io_err(path)(err)),
        };

        let corrupt = |source| BackupError::CorruptIndex {
            path: path.to_path_buf(),
            source,
        };
        let header: VersionHeader = serde_json::from_slice(&bytes).map_err(corrupt)?;
        if header.version != INDEX_VERSION {
            return Err(BackupError::UnsupportedIndexVersion {
                path: path.to_path_buf(),
                version: header.version,
            });
        }
        serde_json::from_slice(&bytes).map_err(corrupt)
    }

    /// Stamp `updated` and replace the file at `path` via a temporary sibling.
    pub fn save(&mut self, path: &Path) -> Result<(), BackupError> {
        self.updated = Utc::now();
        let json = serde_json::to_vec_pretty(self).map_err(BackupError::Serialize)?;

        if let Some(parent) = path.parent() {
            create_private_dir(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        write_private_file(&tmp, &json)?;
        fs::rename(&tmp, path).map_err(io_err(path))
    }

    /// Insert or replace the entry with the same id.
    pub fn insert(&mut self, entry: BackupMetadata) -> Option<BackupMetadata> {
        self.backups.insert(entry.id.clone(), entry)
    }

    pub fn remove(&mut self, id: &str) -> Option<BackupMetadata> {
        self.backups.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&BackupMetadata> {
        self.backups.get(id)
    }

    pub fn len(&self) -> usize {
        self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &BackupMetadata> {
        self.backups.values()
    }
}
