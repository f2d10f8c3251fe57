//! Alpha directory layout: one gzip'd NBT file per chunk.
//!
//! `<root>/<b36(x mod 64)>/<b36(z mod 64)>/c.<b36(x)>.<b36(z)>.dat`

use std::path::{Path, PathBuf};

use blockyard_core::ChunkPos;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Signed base-36 rendering, lowercase, `-` prefix for negatives.
pub fn base36(value: i32) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut n = value.unsigned_abs();
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if value < 0 {
        digits.push(b'-');
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

pub fn parse_base36(text: &str) -> Option<i32> {
    i32::from_str_radix(text, 36).ok()
}

pub fn chunk_filename(pos: ChunkPos) -> String {
    format!("c.{}.{}.dat", base36(pos.x), base36(pos.z))
}

pub fn chunk_path(root: &Path, pos: ChunkPos) -> PathBuf {
    root.join(base36(pos.x.rem_euclid(64)))
        .join(base36(pos.z.rem_euclid(64)))
        .join(chunk_filename(pos))
}

/// Parse `c.<x>.<z>.dat` back into a chunk position.
pub fn parse_chunk_filename(name: &str) -> Option<ChunkPos> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() == 4 && parts[0] == "c" && parts[3] == "dat" {
        Some(ChunkPos::new(parse_base36(parts[1])?, parse_base36(parts[2])?))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base36() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(-13), "-d");
        assert_eq!(parse_base36("-d"), Some(-13));
        assert_eq!(parse_base36(&base36(i32::MIN)), Some(i32::MIN));
    }

    #[test]
    fn test_chunk_path() {
        let path = chunk_path(Path::new("world"), ChunkPos::new(-13, 44));
        assert_eq!(path, Path::new("world").join("1f").join("18").join("c.-d.18.dat"));
        assert_eq!(parse_chunk_filename("c.-d.18.dat"), Some(ChunkPos::new(-13, 44)));
        assert_eq!(parse_chunk_filename("level.dat"), None);
    }
}
