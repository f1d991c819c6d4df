//! Build fingerprint gate.
//!
//! The fingerprint is the only state kept between runs. It is written after the
//! outputs have been committed, so a failed run always leaves the previous value in
//! place and the next run rebuilds.

use crate::config::CrunchConfig;
use crate::error::{CrunchError, Result};
use crate::hash::{hash_dir, hash_file, ContentHasher};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Combined hash of everything a build depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        u64::from_str_radix(s.trim(), 16).map(Fingerprint)
    }
}

/// Accumulates arguments and input content into a [`Fingerprint`].
///
/// Every call is order-sensitive; feed the same items in the same order to get
/// the same fingerprint.
#[derive(Clone, Default)]
pub struct FingerprintBuilder {
    hasher: ContentHasher,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one argument string.
    pub fn arg(&mut self, s: &str) -> &mut Self {
        self.hasher.write_str(s);
        self
    }

    /// Adds every option that affects the output. `force` does not.
    pub fn config(&mut self, cfg: &CrunchConfig) -> Result<&mut Self> {
        let mut canonical = cfg.clone();
        canonical.force = false;
        let text = serde_json::to_string(&canonical)
            .map_err(|e| CrunchError::Encode(format!("config fingerprint: {}", e)))?;
        self.hasher.write_str(&text);
        Ok(self)
    }

    /// Adds an input root: a file's content hash or a directory's recursive hash.
    pub fn input(&mut self, path: &Path) -> Result<&mut Self> {
        let h = if path.is_dir() {
            hash_dir(path)?
        } else {
            hash_file(path).map_err(|e| CrunchError::Input {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };
        self.hasher.write_str(&path.to_string_lossy());
        self.hasher.write_u64(h);
        Ok(self)
    }

    pub fn finish(&self) -> Fingerprint {
        Fingerprint(self.hasher.finish())
    }
}

/// Persisted fingerprint at `<output prefix>.hash`.
#[derive(Debug, Clone)]
pub struct BuildCache {
    path: PathBuf,
}

impl BuildCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file for an output prefix such as `out/atlas`.
    pub fn for_prefix(prefix: &Path) -> Self {
        let mut s = prefix.as_os_str().to_os_string();
        s.push(".hash");
        Self::new(s)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previously stored fingerprint. A missing or unreadable value means "no prior
    /// build" rather than an error.
    pub fn load(&self) -> Result<Option<Fingerprint>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match text.parse() {
            Ok(fp) => Ok(Some(fp)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unparsable fingerprint");
                Ok(None)
            }
        }
    }

    /// Writes the fingerprint through a temp file and rename.
    pub fn store(&self, fp: Fingerprint) -> Result<()> {
        let mut tmp = self.path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, fp.to_string())?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(path = %self.path.display(), %fp, "stored fingerprint");
        Ok(())
    }

    /// Forgets the stored fingerprint. Called before outputs are replaced, so an
    /// interrupted commit is never mistaken for an up-to-date build.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "cleared fingerprint");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// True when a rebuild can be skipped.
    pub fn is_fresh(&self, fp: Fingerprint, force: bool) -> Result<bool> {
        if force {
            return Ok(false);
        }
        Ok(self.load()? == Some(fp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_hex_roundtrip() {
        let fp = Fingerprint(0x0123_4567_89ab_cdef);
        assert_eq!(fp.to_string(), "0123456789abcdef");
        assert_eq!("0123456789abcdef\n".parse::<Fingerprint>().ok(), Some(fp));
    }

    #[test]
    fn force_does_not_change_fingerprint() {
        let a = CrunchConfig::default();
        let b = CrunchConfig {
            force: true,
            ..CrunchConfig::default()
        };
        let fa = FingerprintBuilder::new().config(&a).map(|f| f.finish()).ok();
        let fb = FingerprintBuilder::new().config(&b).map(|f| f.finish()).ok();
        assert!(fa.is_some());
        assert_eq!(fa, fb);
    }

    #[test]
    fn clearing_a_missing_fingerprint_is_fine() {
        let dir = std::env::temp_dir().join(format!("crunch-cache-clear-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let cache = BuildCache::new(dir.join("atlas.hash"));
        cache.clear().unwrap();
        cache.store(Fingerprint(7)).unwrap();
        assert_eq!(cache.load().unwrap(), Some(Fingerprint(7)));
        cache.clear().unwrap();
        assert_eq!(cache.load().unwrap(), None);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn prefix_gets_hash_extension() {
        let c = BuildCache::for_prefix(Path::new("out/atlas"));
        assert_eq!(c.path(), Path::new("out/atlas.hash"));
    }
}
