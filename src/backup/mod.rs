//! Content-hashed backup store.
//!
//! Layout under the base directory:
//!
//! ```text
//! <base>/backups/<platform>/<id>.<ext>   stored copies (0640)
//! <base>/metadata/index.json             the index (0640)
//! ```
//!
//! Directories are created with mode `0750`. The index is rewritten after
//! every mutation and is never reset when it fails to load.

mod cleanup;
mod index;
mod store;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::BackupError;

pub use cleanup::CleanupOptions;
pub use index::{BackupIndex, BackupMetadata, INDEX_VERSION};
pub use store::{BackupStats, BackupStore, CreateOptions};

#[cfg(unix)]
const FILE_MODE: u32 = 0o640;
#[cfg(unix)]
const DIR_MODE: u32 = 0o750;

pub(crate) fn io_err(path: &Path) -> impl FnOnce(io::Error) -> BackupError {
    let path = path.to_path_buf();
    move |source| BackupError::Io { path, source }
}

/// Lowercase hex SHA-256 of `bytes`.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Stream a file through SHA-256.
pub(crate) fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

pub(crate) fn create_private_dir(path: &Path) -> Result<(), BackupError> {
    #[cfg(unix)]
    let result = {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(DIR_MODE).create(path)
    };
    #[cfg(not(unix))]
    let result = fs::create_dir_all(path);

    result.map_err(io_err(path))
}

/// Write `bytes` to `path`, leaving the file readable by owner and group only.
pub(crate) fn write_private_file(path: &Path, bytes: &[u8]) -> Result<(), BackupError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }

    let mut file = options.open(path).map_err(io_err(path))?;
    file.write_all(bytes).map_err(io_err(path))?;

    #[cfg(unix)]
    {
        // `mode` only applies when the file is created.
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(FILE_MODE))
            .map_err(io_err(path))?;
    }
    Ok(())
}

/// Remove a file, treating a missing file as already removed.
pub(crate) fn remove_if_exists(path: &Path) -> Result<(), BackupError> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(io_err(path)(err)),
        _ => Ok(()),
    }
}
