//! Region files: `<root>/region/r.<rx>.<rz>.mcr`, 32x32 chunks each.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use blockyard_anvil::region::chunk_to_local;
use blockyard_anvil::{RegionFile, RegionPos, compress_and_wrap_chunk, unwrap_and_decompress_chunk};
use blockyard_core::{Chunk, ChunkPos};
use parking_lot::Mutex;

use crate::atomic::{read_optional, write_atomic};
use crate::error::{corrupt, io_at};
use crate::nbt::{decode_chunk, encode_chunk, now_secs};
use crate::{ChunkSerializer, StorageError, WorldFormat};

pub const REGION_DIR: &str = "region";

pub struct BetaSerializer {
    root: PathBuf,
    /// Saves to the same region file are read-modify-write and must not interleave.
    region_locks: Mutex<HashMap<RegionPos, Arc<tokio::sync::Mutex<()>>>>,
}

impl BetaSerializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), region_locks: Mutex::new(HashMap::new()) }
    }

    pub fn region_path(&self, region: RegionPos) -> PathBuf {
        self.root.join(REGION_DIR).join(region.filename())
    }

    fn region_lock(&self, region: RegionPos) -> Arc<tokio::sync::Mutex<()>> {
        self.region_locks.lock().entry(region).or_default().clone()
    }

    /// Parse the region holding `pos`; a file that cannot be parsed makes
    /// every chunk in it corrupt.
    async fn read_region(&self, pos: ChunkPos) -> Result<Option<RegionFile>, StorageError> {
        let path = self.region_path(RegionPos::of_chunk(pos));
        match read_optional(&path).await? {
            Some(bytes) => RegionFile::parse(&bytes).map(Some).map_err(|e| corrupt(pos, e)),
            None => Ok(None),
        }
    }
}

async fn region_files(root: &Path) -> Result<Vec<(RegionPos, PathBuf)>, StorageError> {
    let dir = root.join(REGION_DIR);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_at(&dir)(e)),
    };
    let mut out = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_at(&dir))? {
        if let Some(region) = entry.file_name().to_str().and_then(RegionPos::from_filename) {
            out.push((region, entry.path()));
        }
    }
    Ok(out)
}

/// Whether `root` holds any region files.
pub async fn has_regions(root: &Path) -> Result<bool, StorageError> {
    Ok(!region_files(root).await?.is_empty())
}

#[async_trait]
impl ChunkSerializer for BetaSerializer {
    fn name(&self) -> &'static str {
        "beta"
    }

    fn format(&self) -> WorldFormat {
        WorldFormat::Beta
    }

    fn root(&self) -> &Path {
        &self.root
    }

    async fn load_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>, StorageError> {
        let Some(region) = self.read_region(pos).await? else {
            return Ok(None);
        };
        let Some(slot) = region.get(chunk_to_local(pos.x), chunk_to_local(pos.z)) else {
            return Ok(None);
        };
        let nbt = unwrap_and_decompress_chunk(&slot.blob).map_err(|e| corrupt(pos, e))?;
        decode_chunk(pos, &nbt).map(Some)
    }

    async fn save_chunk(&self, chunk: &Chunk) -> Result<(), StorageError> {
        let blob = compress_and_wrap_chunk(&encode_chunk(chunk)?)?;
        let region_pos = RegionPos::of_chunk(chunk.pos);

        let lock = self.region_lock(region_pos);
        let _guard = lock.lock().await;

        let mut region = self.read_region(chunk.pos).await?.unwrap_or_default();
        let (local_x, local_z) = (chunk_to_local(chunk.pos.x), chunk_to_local(chunk.pos.z));
        region.put(local_x, local_z, blob, now_secs() as u32);
        write_atomic(&self.region_path(region_pos), &region.to_bytes()?).await
    }

    async fn list_chunks(&self) -> Result<Vec<ChunkPos>, StorageError> {
        let mut out = Vec::new();
        for (region_pos, path) in region_files(&self.root).await? {
            let Some(bytes) = read_optional(&path).await? else { continue };
            match RegionFile::parse(&bytes) {
                Ok(region) => {
                    out.extend(region.occupied().map(|(x, z)| region_pos.local_to_world(x, z)))
                }
                Err(e) => log::warn!("Skipping unreadable region file {}: {}", path.display(), e),
            }
        }
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockyard_core::blocks;

    fn chunk_at(pos: ChunkPos, floor: u8) -> Chunk {
        let mut chunk = Chunk::new(pos);
        chunk.fill_layer(0, blocks::BEDROCK);
        chunk.fill_layer(1, floor);
        chunk.regenerate();
        chunk.populated = true;
        chunk
    }

    #[tokio::test]
    async fn test_region_roundtrip_keeps_neighbours() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = BetaSerializer::new(dir.path());
        let a = ChunkPos::new(0, 0);
        let b = ChunkPos::new(31, 5);
        let c = ChunkPos::new(-1, -1);

        serializer.save_chunk(&chunk_at(a, blocks::DIRT)).await.unwrap();
        serializer.save_chunk(&chunk_at(b, blocks::SAND)).await.unwrap();
        serializer.save_chunk(&chunk_at(c, blocks::GRAVEL)).await.unwrap();
        // Overwrite in place.
        serializer.save_chunk(&chunk_at(a, blocks::STONE)).await.unwrap();

        assert_eq!(serializer.load_chunk(a).await.unwrap(), Some(chunk_at(a, blocks::STONE)));
        assert_eq!(serializer.load_chunk(b).await.unwrap(), Some(chunk_at(b, blocks::SAND)));
        assert_eq!(serializer.load_chunk(c).await.unwrap(), Some(chunk_at(c, blocks::GRAVEL)));
        assert_eq!(serializer.load_chunk(ChunkPos::new(1, 0)).await.unwrap(), None);
        assert_eq!(serializer.load_chunk(ChunkPos::new(100, 100)).await.unwrap(), None);

        assert!(serializer.region_path(RegionPos::new(-1, -1)).exists());
        assert_eq!(serializer.list_chunks().await.unwrap(), vec![c, a, b]);
    }

    #[tokio::test]
    async fn test_concurrent_saves_same_region() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = Arc::new(BetaSerializer::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let serializer = serializer.clone();
            handles.push(tokio::spawn(async move {
                serializer.save_chunk(&chunk_at(ChunkPos::new(i, i), blocks::DIRT)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(serializer.list_chunks().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_corrupt_region_is_not_missing() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = BetaSerializer::new(dir.path());
        let pos = ChunkPos::new(2, 2);
        serializer.save_chunk(&chunk_at(pos, blocks::DIRT)).await.unwrap();

        let path = serializer.region_path(RegionPos::of_chunk(pos));
        let mut bytes = std::fs::read(&path).unwrap();
        // Damage the payload behind the header.
        for b in &mut bytes[8192 + 5..8192 + 40] {
            *b = 0xff;
        }
        std::fs::write(&path, &bytes).unwrap();

        let err = serializer.load_chunk(pos).await.unwrap_err();
        assert!(err.is_corrupt(), "{err}");
    }

    #[tokio::test]
    async fn test_unparseable_region_blocks_saves() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = BetaSerializer::new(dir.path());
        let path = serializer.region_path(RegionPos::new(0, 0));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not a region").unwrap();

        let pos = ChunkPos::new(4, 4);
        assert!(serializer.load_chunk(pos).await.unwrap_err().is_corrupt());
        // The damaged file is left alone rather than replaced by a one-chunk region.
        assert!(serializer.save_chunk(&chunk_at(pos, blocks::DIRT)).await.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"not a region");
    }
}
