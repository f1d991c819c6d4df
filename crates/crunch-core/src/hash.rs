//! Deterministic combining hash used for bitmap identity and build fingerprints.
//!
//! All integers are fed in little-endian order and strings are length-prefixed, so
//! the same inputs produce the same value on every platform and every run.

use crate::error::Result;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;
use xxhash_rust::xxh64::Xxh64;

/// Streaming xxh64 hasher (seed 0).
#[derive(Clone)]
pub struct ContentHasher {
    inner: Xxh64,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            inner: Xxh64::new(0),
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.inner.update(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.inner.update(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Length-prefixed so that `("ab", "c")` and `("a", "bc")` differ.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.inner.update(s.as_bytes());
    }

    pub fn finish(&self) -> u64 {
        self.inner.digest()
    }
}

/// Hash of `(width, height, pixel bytes in row-major order)`.
pub fn hash_pixels(width: u32, height: u32, pixels: &[u32]) -> u64 {
    let mut h = ContentHasher::new();
    h.write_u32(width);
    h.write_u32(height);
    for p in pixels {
        h.write_bytes(&p.to_le_bytes());
    }
    h.finish()
}

/// Content hash of a single file.
pub fn hash_file(path: &Path) -> Result<u64> {
    let bytes = fs::read(path)?;
    let mut h = ContentHasher::new();
    h.write_bytes(&bytes);
    Ok(h.finish())
}

/// Recursive hash of every file below `root`.
///
/// Entries are visited in sorted relative-path order and each file contributes its
/// relative path and its content hash, so renames and edits both change the result.
pub fn hash_dir(root: &Path) -> Result<u64> {
    let mut h = ContentHasher::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        h.write_str(&rel);
        h.write_u64(hash_file(entry.path())?);
    }
    Ok(h.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_are_length_prefixed() {
        let mut a = ContentHasher::new();
        a.write_str("ab");
        a.write_str("c");
        let mut b = ContentHasher::new();
        b.write_str("a");
        b.write_str("bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn pixel_hash_depends_on_shape() {
        let px = [0xFF00_00FFu32; 4];
        assert_ne!(hash_pixels(2, 2, &px), hash_pixels(4, 1, &px));
        assert_eq!(hash_pixels(2, 2, &px), hash_pixels(2, 2, &px));
    }
}
