//! Region file format (.mcr).
//!
//! Region files contain 32x32 chunks in a specific binary format:
//! - Bytes 0-4095: Location table (1024 entries × 4 bytes)
//! - Bytes 4096-8191: Timestamp table (1024 entries × 4 bytes)
//! - Bytes 8192+: Chunk payloads, each starting on a sector boundary

use blockyard_core::ChunkPos;

use crate::{AnvilError, HEADER_BYTES, MAX_SECTORS_PER_CHUNK, REGION_SIZE, SECTOR_BYTES};

const CHUNKS_PER_REGION: usize = (REGION_SIZE * REGION_SIZE) as usize;

/// Convert chunk coordinates to local region coordinates (0-31).
#[inline]
pub fn chunk_to_local(chunk_coord: i32) -> i32 {
    chunk_coord.rem_euclid(REGION_SIZE)
}

/// Convert chunk coordinates to region coordinates.
#[inline]
pub fn chunk_to_region(chunk_coord: i32) -> i32 {
    chunk_coord.div_euclid(REGION_SIZE)
}

/// Calculate linear index for a chunk within a region (0-1023).
#[inline]
pub fn local_to_index(local_x: i32, local_z: i32) -> usize {
    ((local_z & 31) * REGION_SIZE + (local_x & 31)) as usize
}

/// Calculate local coordinates from linear index.
#[inline]
pub fn index_to_local(index: usize) -> (i32, i32) {
    let local_x = (index % REGION_SIZE as usize) as i32;
    let local_z = (index / REGION_SIZE as usize) as i32;
    (local_x, local_z)
}

/// Region file coordinates (parsed from filename like "r.0.-1.mcr").
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn of_chunk(pos: ChunkPos) -> Self {
        Self::new(chunk_to_region(pos.x), chunk_to_region(pos.z))
    }

    /// Parse region position from filename (e.g., "r.0.-1.mcr").
    pub fn from_filename(name: &str) -> Option<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() == 4 && parts[0] == "r" && parts[3] == "mcr" {
            let x = parts[1].parse().ok()?;
            let z = parts[2].parse().ok()?;
            Some(Self { x, z })
        } else {
            None
        }
    }

    pub fn filename(&self) -> String {
        format!("r.{}.{}.mcr", self.x, self.z)
    }

    /// Convert local chunk coordinates to world chunk coordinates.
    pub fn local_to_world(&self, local_x: i32, local_z: i32) -> ChunkPos {
        ChunkPos::new(self.x * REGION_SIZE + local_x, self.z * REGION_SIZE + local_z)
    }
}

/// One occupied slot: the framed payload and its last-save timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSlot {
    pub timestamp: u32,
    pub blob: Vec<u8>,
}

/// A whole region file held in memory.
///
/// Saves rebuild the file from scratch and the caller swaps it in atomically,
/// so the sector layout is always compact and free of stale payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFile {
    slots: Vec<Option<RegionSlot>>,
}

impl Default for RegionFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionFile {
    pub fn new() -> Self {
        Self { slots: vec![None; CHUNKS_PER_REGION] }
    }

    /// Parse a region file. An empty buffer is an empty region.
    pub fn parse(bytes: &[u8]) -> Result<Self, AnvilError> {
        let mut region = Self::new();
        if bytes.is_empty() {
            return Ok(region);
        }
        if bytes.len() < HEADER_BYTES {
            return Err(AnvilError::Truncated(bytes.len()));
        }

        for index in 0..CHUNKS_PER_REGION {
            let entry = &bytes[index * 4..index * 4 + 4];
            let sector =
                ((entry[0] as usize) << 16) | ((entry[1] as usize) << 8) | entry[2] as usize;
            let count = entry[3] as usize;
            if sector == 0 && count == 0 {
                continue;
            }

            let start = sector * SECTOR_BYTES;
            let end = start + count * SECTOR_BYTES;
            if sector < 2 || count == 0 || start + 4 > bytes.len() {
                return Err(AnvilError::BadLocation { index, sector, count });
            }
            let header = [bytes[start], bytes[start + 1], bytes[start + 2], bytes[start + 3]];
            let length = u32::from_be_bytes(header) as usize;
            let blob_end = start + 4 + length;
            if blob_end > end.min(bytes.len()) {
                return Err(AnvilError::BadLocation { index, sector, count });
            }

            let ts = &bytes[SECTOR_BYTES + index * 4..SECTOR_BYTES + index * 4 + 4];
            region.slots[index] = Some(RegionSlot {
                timestamp: u32::from_be_bytes([ts[0], ts[1], ts[2], ts[3]]),
                blob: bytes[start..blob_end].to_vec(),
            });
        }
        Ok(region)
    }

    pub fn get(&self, local_x: i32, local_z: i32) -> Option<&RegionSlot> {
        self.slots[local_to_index(local_x, local_z)].as_ref()
    }

    pub fn put(&mut self, local_x: i32, local_z: i32, blob: Vec<u8>, timestamp: u32) {
        self.slots[local_to_index(local_x, local_z)] = Some(RegionSlot { timestamp, blob });
    }

    /// Local coordinates of every occupied slot.
    pub fn occupied(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| index_to_local(index))
    }

    /// Serialize with payloads packed back to back after the header.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AnvilError> {
        let mut out = vec![0u8; HEADER_BYTES];
        let mut next_sector = HEADER_BYTES / SECTOR_BYTES;

        for (index, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let sectors = slot.blob.len().div_ceil(SECTOR_BYTES);
            if sectors > MAX_SECTORS_PER_CHUNK {
                return Err(AnvilError::ChunkTooLarge(sectors));
            }

            // Minecraft stores: [Offset:3 bytes][Count:1 byte] (Big Endian)
            let loc = index * 4;
            out[loc] = ((next_sector >> 16) & 0xFF) as u8;
            out[loc + 1] = ((next_sector >> 8) & 0xFF) as u8;
            out[loc + 2] = (next_sector & 0xFF) as u8;
            out[loc + 3] = sectors as u8;
            out[SECTOR_BYTES + loc..SECTOR_BYTES + loc + 4]
                .copy_from_slice(&slot.timestamp.to_be_bytes());

            out.extend_from_slice(&slot.blob);
            out.resize((next_sector + sectors) * SECTOR_BYTES, 0);
            next_sector += sectors;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress_and_wrap_chunk;

    #[test]
    fn test_region_math() {
        assert_eq!(chunk_to_region(-1), -1);
        assert_eq!(chunk_to_local(-1), 31);
        assert_eq!(chunk_to_region(32), 1);
        assert_eq!(local_to_index(31, 0), 31);
        assert_eq!(local_to_index(0, 1), 32);
        for index in [0, 31, 32, 1023] {
            let (x, z) = index_to_local(index);
            assert_eq!(local_to_index(x, z), index);
        }
    }

    #[test]
    fn test_region_filename() {
        let pos = RegionPos::from_filename("r.0.-1.mcr").unwrap();
        assert_eq!(pos, RegionPos::new(0, -1));
        assert_eq!(pos.filename(), "r.0.-1.mcr");
        assert!(RegionPos::from_filename("r.0.-1.mca").is_none());
        assert_eq!(RegionPos::of_chunk(ChunkPos::new(-33, 5)), RegionPos::new(-2, 0));
        assert_eq!(RegionPos::new(-1, 0).local_to_world(31, 2), ChunkPos::new(-1, 2));
    }

    #[test]
    fn test_region_file_layout() {
        let mut region = RegionFile::new();
        let small = compress_and_wrap_chunk(b"small").unwrap();
        let large: Vec<u8> = (0..3 * SECTOR_BYTES).map(|i| (i % 251) as u8).collect();
        let mut large_blob = ((large.len() + 1) as u32).to_be_bytes().to_vec();
        large_blob.push(crate::compression::NONE);
        large_blob.extend_from_slice(&large);

        region.put(0, 0, small.clone(), 10);
        region.put(31, 31, large_blob.clone(), 20);

        let bytes = region.to_bytes().unwrap();
        assert_eq!(bytes.len() % SECTOR_BYTES, 0);
        // First chunk lives at sector 2, one sector long.
        assert_eq!(&bytes[0..4], &[0, 0, 2, 1]);
        // Second follows it directly and spans four sectors.
        assert_eq!(&bytes[1023 * 4..1024 * 4], &[0, 0, 3, 4]);

        let parsed = RegionFile::parse(&bytes).unwrap();
        assert_eq!(parsed, region);
        assert_eq!(parsed.occupied().collect::<Vec<_>>(), vec![(0, 0), (31, 31)]);
        assert_eq!(parsed.get(31, 31).map(|s| s.timestamp), Some(20));
    }

    #[test]
    fn test_parse_rejects_truncated() {
        let mut region = RegionFile::new();
        region.put(1, 0, compress_and_wrap_chunk(&[7; 100]).unwrap(), 0);
        let bytes = region.to_bytes().unwrap();

        assert!(matches!(RegionFile::parse(&bytes[..100]), Err(AnvilError::Truncated(100))));
        assert!(matches!(
            RegionFile::parse(&bytes[..HEADER_BYTES + 2]),
            Err(AnvilError::BadLocation { index: 1, .. })
        ));
        assert_eq!(RegionFile::parse(&[]).unwrap(), RegionFile::new());
    }
}
