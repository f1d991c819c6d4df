//! Staged output writing.
//!
//! Every artifact is first written to `<file>.tmp`. Only when all of them exist are
//! they renamed into place, so a failure while producing any artifact leaves the
//! previous outputs untouched. Uncommitted temps are removed on drop.

use crate::config::{ExportFormat, ExportFormats};
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Artifacts of one build, staged but not yet visible.
#[derive(Debug)]
pub struct OutputSet {
    staged: Vec<(PathBuf, PathBuf)>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self { staged: Vec::new() }
    }

    /// Stages `bytes` for `target`.
    pub fn stage_bytes(&mut self, target: &Path, bytes: &[u8]) -> Result<()> {
        self.stage_with(target, |tmp| Ok(fs::write(tmp, bytes)?))
    }

    /// Stages `target` by letting `write` produce the temp file.
    pub fn stage_with<F>(&mut self, target: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        if let Some(dir) = target.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = temp_path(target);
        if let Err(e) = write(&tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        debug!(path = %target.display(), "staged");
        self.staged.push((tmp, target.to_path_buf()));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Renames every staged file into place and returns the final paths.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let staged = std::mem::take(&mut self.staged);
        let mut written = Vec::with_capacity(staged.len());
        let mut iter = staged.into_iter();
        while let Some((tmp, target)) = iter.next() {
            if let Err(e) = fs::rename(&tmp, &target) {
                let _ = fs::remove_file(&tmp);
                for (rest, _) in iter {
                    let _ = fs::remove_file(rest);
                }
                return Err(e.into());
            }
            written.push(target);
        }
        Ok(written)
    }
}

impl Default for OutputSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for OutputSet {
    fn drop(&mut self) {
        for (tmp, _) in self.staged.drain(..) {
            if let Err(e) = fs::remove_file(&tmp) {
                warn!(path = %tmp.display(), error = %e, "failed to remove staged file");
            }
        }
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let mut s = target.as_os_str().to_os_string();
    s.push(".tmp");
    PathBuf::from(s)
}

/// `<prefix><suffix>` as a path, e.g. `out/atlas` + `0.png`.
pub fn prefixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

/// Removes outputs of earlier builds that the current build no longer produces:
/// page images numbered `page_count` and above, and metadata files for formats
/// not in `formats`. Returns the removed paths.
pub fn remove_stale(prefix: &Path, page_count: usize, formats: &ExportFormats) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for f in ExportFormat::ALL {
        if formats.contains(f) {
            continue;
        }
        let p = prefixed(prefix, &format!(".{}", f.extension()));
        if p.is_file() {
            fs::remove_file(&p)?;
            removed.push(p);
        }
    }

    let stem = prefix
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = match prefix.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.is_dir() {
        return Ok(removed);
    }
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(index) = page_index(&name, &stem) else {
            continue;
        };
        if index >= page_count {
            let p = entry.path();
            fs::remove_file(&p)?;
            removed.push(p);
        }
    }
    removed.sort();
    for p in &removed {
        debug!(path = %p.display(), "removed stale output");
    }
    Ok(removed)
}

/// `atlas12.png` with stem `atlas` → `Some(12)`.
fn page_index(file_name: &str, stem: &str) -> Option<usize> {
    let digits = file_name.strip_prefix(stem)?.strip_suffix(".png")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_index_parses_only_numbered_pages() {
        assert_eq!(page_index("atlas0.png", "atlas"), Some(0));
        assert_eq!(page_index("atlas12.png", "atlas"), Some(12));
        assert_eq!(page_index("atlas.png", "atlas"), None);
        assert_eq!(page_index("atlas_1.png", "atlas"), None);
        assert_eq!(page_index("atlas1.png.tmp", "atlas"), None);
        assert_eq!(page_index("other1.png", "atlas"), None);
    }
}
