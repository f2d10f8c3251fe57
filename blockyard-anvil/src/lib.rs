//! On-disk chunk containers.
//!
//! - `region`: region files holding 32x32 chunks in 4 KiB sectors.
//! - `alpha`: the older one-file-per-chunk directory layout.
//! - framing helpers shared by region payloads: `[length:4][type:1][data:N]`.

use std::io::{Read, Write};

use flate2::Compression as ZlibCompression;
use flate2::write::{GzEncoder, ZlibEncoder};
use thiserror::Error;

pub mod alpha;
pub mod region;

pub use region::{RegionFile, RegionPos};

pub const SECTOR_BYTES: usize = 4096; // minecraft uses 4096 bytes per sector
pub const HEADER_BYTES: usize = 8192; // location table + timestamp table

/// Number of chunks per region dimension.
pub const REGION_SIZE: i32 = 32;

/// A region location entry stores the sector count in one byte.
pub const MAX_SECTORS_PER_CHUNK: usize = 255;

/// Compression types used in region payloads.
pub mod compression {
    pub const GZIP: u8 = 1;
    pub const ZLIB: u8 = 2;
    pub const NONE: u8 = 3;
    pub const LZ4: u8 = 4;
}

#[derive(Debug, Error)]
pub enum AnvilError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chunk blob too short ({0} bytes)")]
    Truncated(usize),
    #[error("unknown compression type: {0}")]
    UnknownCompression(u8),
    #[error("region header entry {index} points outside the file (sector {sector}, count {count})")]
    BadLocation { index: usize, sector: usize, count: usize },
    #[error("chunk payload needs {0} sectors, at most 255 fit in a region entry")]
    ChunkTooLarge(usize),
}

pub fn gzip(data: &[u8]) -> Result<Vec<u8>, AnvilError> {
    let mut encoder = GzEncoder::new(Vec::new(), ZlibCompression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, AnvilError> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

/// Compress raw NBT with zlib and frame it as a region payload.
pub fn compress_and_wrap_chunk(nbt_data: &[u8]) -> Result<Vec<u8>, AnvilError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), ZlibCompression::default());
    encoder.write_all(nbt_data)?;
    let compressed = encoder.finish()?;

    let total_len = (compressed.len() + 1) as u32; // +1 byte for type
    let mut chunk_blob = Vec::with_capacity(5 + compressed.len());
    chunk_blob.extend_from_slice(&total_len.to_be_bytes());
    chunk_blob.push(compression::ZLIB);
    chunk_blob.extend_from_slice(&compressed);
    Ok(chunk_blob)
}

/// Unwrap and decompress a framed payload.
/// Supports GZip (1), ZLib (2), None (3), and LZ4 (4).
pub fn unwrap_and_decompress_chunk(chunk_blob: &[u8]) -> Result<Vec<u8>, AnvilError> {
    if chunk_blob.len() < 5 {
        return Err(AnvilError::Truncated(chunk_blob.len()));
    }

    let length =
        u32::from_be_bytes([chunk_blob[0], chunk_blob[1], chunk_blob[2], chunk_blob[3]]) as usize;
    if length == 0 || 4 + length > chunk_blob.len() {
        return Err(AnvilError::Truncated(chunk_blob.len()));
    }
    let compression_type = chunk_blob[4];
    let compressed_data = &chunk_blob[5..4 + length];

    let mut decompressed = Vec::new();
    match compression_type {
        compression::ZLIB => {
            flate2::read::ZlibDecoder::new(compressed_data).read_to_end(&mut decompressed)?;
        }
        compression::GZIP => {
            flate2::read::GzDecoder::new(compressed_data).read_to_end(&mut decompressed)?;
        }
        compression::NONE => decompressed.extend_from_slice(compressed_data),
        compression::LZ4 => {
            lz4_java_wrc::Lz4BlockInput::new(compressed_data).read_to_end(&mut decompressed)?;
        }
        other => return Err(AnvilError::UnknownCompression(other)),
    }
    Ok(decompressed)
}
