use std::io;
use std::path::{Path, PathBuf};

use blockyard_anvil::AnvilError;
use blockyard_core::ChunkPos;
use thiserror::Error;

use crate::WorldFormat;

/// Errors from the persistence layer.
///
/// A chunk that was never saved is not an error: loads return `Ok(None)`.
/// `Corrupt` means bytes exist but cannot be trusted and must never be
/// mistaken for absence.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("chunk {pos} is corrupt: {reason}")]
    Corrupt { pos: ChunkPos, reason: String },
    #[error("world metadata at {} is corrupt: {reason}", path.display())]
    CorruptMeta { path: PathBuf, reason: String },
    #[error("failed to encode chunk {pos}: {reason}")]
    Encode { pos: ChunkPos, reason: String },
    #[error("world at {} is stored as `{found}` but `{expected}` was configured", path.display())]
    FormatMismatch {
        path: PathBuf,
        expected: WorldFormat,
        found: WorldFormat,
    },
    #[error(transparent)]
    Container(#[from] AnvilError),
}

impl StorageError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StorageError::Corrupt { .. } | StorageError::CorruptMeta { .. })
    }
}

/// Attach the path to a raw I/O error.
pub(crate) fn io_at(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io { path: path.to_path_buf(), source }
}

pub(crate) fn corrupt(pos: ChunkPos, reason: impl ToString) -> StorageError {
    StorageError::Corrupt { pos, reason: reason.to_string() }
}
