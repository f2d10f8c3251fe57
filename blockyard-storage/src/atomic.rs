use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::StorageError;
use crate::error::io_at;

pub(crate) const TMP_SUFFIX: &str = ".tmp";

fn tmp_path(path: &Path) -> Result<PathBuf, StorageError> {
    let no_name = || io::Error::new(io::ErrorKind::InvalidInput, "path has no file name");
    let mut name: OsString = path.file_name().ok_or_else(|| io_at(path)(no_name()))?.to_os_string();
    name.push(TMP_SUFFIX);
    Ok(path.with_file_name(name))
}

/// Replace `path` with `bytes` so readers see either the old file or the
/// new one, never a torn write: write a sibling temp file, fsync, rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_at(parent))?;
    }
    let tmp = tmp_path(path)?;

    let mut file = tokio::fs::File::create(&tmp).await.map_err(io_at(&tmp))?;
    file.write_all(bytes).await.map_err(io_at(&tmp))?;
    file.sync_all().await.map_err(io_at(&tmp))?;
    drop(file);

    tokio::fs::rename(&tmp, path).await.map_err(io_at(path))
}

/// Read a whole file, mapping "not found" to `None`.
pub(crate) async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_at(path)(e)),
    }
}
