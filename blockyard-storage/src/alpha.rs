//! One gzip'd NBT file per chunk, spread over base-36 directories.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use blockyard_anvil::alpha::{chunk_path, parse_base36, parse_chunk_filename};
use blockyard_anvil::{gunzip, gzip};
use blockyard_core::{Chunk, ChunkPos};

use crate::atomic::{read_optional, write_atomic};
use crate::error::{corrupt, io_at};
use crate::nbt::{decode_chunk, encode_chunk};
use crate::{ChunkSerializer, StorageError, WorldFormat};

pub struct AlphaSerializer {
    root: PathBuf,
}

impl AlphaSerializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_of(&self, pos: ChunkPos) -> PathBuf {
        chunk_path(&self.root, pos)
    }
}

async fn subdirs(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut out = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(io_at(dir)(e)),
    };
    while let Some(entry) = entries.next_entry().await.map_err(io_at(dir))? {
        let name = entry.file_name();
        let is_bucket = name.to_str().and_then(parse_base36).is_some_and(|n| (0..64).contains(&n));
        if is_bucket && entry.file_type().await.map_err(io_at(dir))?.is_dir() {
            out.push(entry.path());
        }
    }
    Ok(out)
}

/// Whether `root` holds any alpha chunk files.
pub async fn has_chunks(root: &Path) -> Result<bool, StorageError> {
    Ok(!list(root, true).await?.is_empty())
}

async fn list(root: &Path, first_only: bool) -> Result<Vec<ChunkPos>, StorageError> {
    let mut out = Vec::new();
    for outer in subdirs(root).await? {
        for inner in subdirs(&outer).await? {
            let mut entries = tokio::fs::read_dir(&inner).await.map_err(io_at(&inner))?;
            while let Some(entry) = entries.next_entry().await.map_err(io_at(&inner))? {
                if let Some(pos) = entry.file_name().to_str().and_then(parse_chunk_filename) {
                    out.push(pos);
                    if first_only {
                        return Ok(out);
                    }
                }
            }
        }
    }
    out.sort();
    Ok(out)
}

#[async_trait]
impl ChunkSerializer for AlphaSerializer {
    fn name(&self) -> &'static str {
        "alpha"
    }

    fn format(&self) -> WorldFormat {
        WorldFormat::Alpha
    }

    fn root(&self) -> &Path {
        &self.root
    }

    async fn load_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>, StorageError> {
        let Some(compressed) = read_optional(&self.path_of(pos)).await? else {
            return Ok(None);
        };
        let nbt = gunzip(&compressed).map_err(|e| corrupt(pos, e))?;
        decode_chunk(pos, &nbt).map(Some)
    }

    async fn save_chunk(&self, chunk: &Chunk) -> Result<(), StorageError> {
        let compressed = gzip(&encode_chunk(chunk)?)?;
        write_atomic(&self.path_of(chunk.pos), &compressed).await
    }

    async fn list_chunks(&self) -> Result<Vec<ChunkPos>, StorageError> {
        list(&self.root, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockyard_core::blocks;

    fn chunk_at(pos: ChunkPos) -> Chunk {
        let mut chunk = Chunk::new(pos);
        chunk.fill_layer(0, blocks::BEDROCK);
        chunk.fill_layer(1, blocks::DIRT);
        chunk.regenerate();
        chunk.populated = true;
        chunk
    }

    #[tokio::test]
    async fn test_save_load_list() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = AlphaSerializer::new(dir.path());
        let positions = [ChunkPos::new(0, 0), ChunkPos::new(-13, 44), ChunkPos::new(64, -1)];

        for pos in positions {
            assert!(serializer.load_chunk(pos).await.unwrap().is_none());
            serializer.save_chunk(&chunk_at(pos)).await.unwrap();
        }
        for pos in positions {
            assert_eq!(serializer.load_chunk(pos).await.unwrap(), Some(chunk_at(pos)));
        }

        let mut expected = positions.to_vec();
        expected.sort();
        assert_eq!(serializer.list_chunks().await.unwrap(), expected);
        assert!(has_chunks(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_truncated_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = AlphaSerializer::new(dir.path());
        let pos = ChunkPos::new(3, 3);
        serializer.save_chunk(&chunk_at(pos)).await.unwrap();

        let path = serializer.path_of(pos);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let err = serializer.load_chunk(pos).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { pos: p, .. } if p == pos), "{err}");
    }

    #[tokio::test]
    async fn test_leftover_tmp_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = AlphaSerializer::new(dir.path());
        let pos = ChunkPos::new(1, 2);
        serializer.save_chunk(&chunk_at(pos)).await.unwrap();

        // A crash between write and rename leaves only the temp file behind.
        let mut tmp = serializer.path_of(pos).into_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, b"half written").unwrap();

        assert_eq!(serializer.load_chunk(pos).await.unwrap(), Some(chunk_at(pos)));
        assert_eq!(serializer.list_chunks().await.unwrap(), vec![pos]);
    }
}
