//! World metadata (`level.dat`): gzip'd NBT with a single `Data` compound.

use std::path::{Path, PathBuf};

use blockyard_anvil::{gunzip, gzip};
use blockyard_core::ChunkPos;
use serde::{Deserialize, Serialize};

use crate::atomic::{read_optional, write_atomic};
use crate::nbt::now_secs;
use crate::{StorageError, WorldFormat, alpha, beta};

pub const LEVEL_FILE: &str = "level.dat";

/// Everything a world needs to reopen identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldMeta {
    pub seed: u64,
    pub spawn: ChunkPos,
    pub format: WorldFormat,
    pub generators: Vec<String>,
    pub dig_hooks: Vec<String>,
    pub build_hooks: Vec<String>,
    pub cache_level: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct LevelRoot {
    #[serde(rename = "Data")]
    data: LevelData,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LevelData {
    random_seed: i64,
    spawn_x: i32,
    spawn_z: i32,
    format: String,
    generators: Vec<String>,
    dig_hooks: Vec<String>,
    build_hooks: Vec<String>,
    cache_level: i32,
    last_played: i64,
}

pub fn level_path(root: &Path) -> PathBuf {
    root.join(LEVEL_FILE)
}

fn corrupt_meta(path: &Path, reason: impl ToString) -> StorageError {
    StorageError::CorruptMeta { path: path.to_path_buf(), reason: reason.to_string() }
}

pub async fn read_level(root: &Path) -> Result<Option<WorldMeta>, StorageError> {
    let path = level_path(root);
    let Some(compressed) = read_optional(&path).await? else {
        return Ok(None);
    };
    let nbt = gunzip(&compressed).map_err(|e| corrupt_meta(&path, e))?;
    let data = fastnbt::from_bytes::<LevelRoot>(&nbt).map_err(|e| corrupt_meta(&path, e))?.data;
    let format = data
        .format
        .parse::<WorldFormat>()
        .map_err(|_| corrupt_meta(&path, format!("unknown format `{}`", data.format)))?;

    Ok(Some(WorldMeta {
        seed: data.random_seed as u64,
        spawn: ChunkPos::new(data.spawn_x, data.spawn_z),
        format,
        generators: data.generators,
        dig_hooks: data.dig_hooks,
        build_hooks: data.build_hooks,
        cache_level: data.cache_level.max(0) as usize,
    }))
}

pub async fn write_level(root: &Path, meta: &WorldMeta) -> Result<(), StorageError> {
    let path = level_path(root);
    let root = LevelRoot {
        data: LevelData {
            random_seed: meta.seed as i64,
            spawn_x: meta.spawn.x,
            spawn_z: meta.spawn.z,
            format: meta.format.to_string(),
            generators: meta.generators.clone(),
            dig_hooks: meta.dig_hooks.clone(),
            build_hooks: meta.build_hooks.clone(),
            cache_level: meta.cache_level.min(i32::MAX as usize) as i32,
            last_played: now_secs(),
        },
    };
    let nbt = fastnbt::to_bytes(&root).map_err(|e| corrupt_meta(&path, e))?;
    write_atomic(&path, &gzip(&nbt)?).await
}

/// Formats whose chunk files are present under `root`.
pub async fn detect_formats(root: &Path) -> Result<Vec<WorldFormat>, StorageError> {
    let mut found = Vec::new();
    if alpha::has_chunks(root).await? {
        found.push(WorldFormat::Alpha);
    }
    if beta::has_regions(root).await? {
        found.push(WorldFormat::Beta);
    }
    Ok(found)
}

/// Open (or create) the world metadata at `root` for the configured format.
///
/// A stored world keeps its seed, spawn and format; a format that differs
/// from the configured one, or chunk files of the other format, are fatal.
/// Stage and hook lists follow the configuration, and a change is recorded
/// back to `level.dat`.
pub async fn open_world(root: &Path, proposed: WorldMeta) -> Result<WorldMeta, StorageError> {
    tokio::fs::create_dir_all(root).await.map_err(crate::error::io_at(root))?;

    let stored = read_level(root).await?;
    if let Some(stored) = &stored {
        if stored.format != proposed.format {
            return Err(StorageError::FormatMismatch {
                path: root.to_path_buf(),
                expected: proposed.format,
                found: stored.format,
            });
        }
    }
    if let Some(found) = detect_formats(root).await?.into_iter().find(|f| *f != proposed.format) {
        return Err(StorageError::FormatMismatch {
            path: root.to_path_buf(),
            expected: proposed.format,
            found,
        });
    }

    let Some(stored) = stored else {
        log::info!(
            "Creating {} world at {} with seed {}",
            proposed.format,
            root.display(),
            proposed.seed
        );
        write_level(root, &proposed).await?;
        return Ok(proposed);
    };

    if stored.seed != proposed.seed {
        log::warn!(
            "Ignoring configured seed {}; world was created with seed {}",
            proposed.seed,
            stored.seed
        );
    }
    let merged = WorldMeta {
        generators: proposed.generators,
        dig_hooks: proposed.dig_hooks,
        build_hooks: proposed.build_hooks,
        cache_level: proposed.cache_level,
        ..stored.clone()
    };
    if merged != stored {
        if merged.generators != stored.generators {
            log::warn!(
                "Generator list changed from {:?} to {:?}; new chunks will not match old terrain",
                stored.generators,
                merged.generators
            );
        }
        write_level(root, &merged).await?;
    }
    Ok(merged)
}
