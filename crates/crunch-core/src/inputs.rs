use crate::error::{CrunchError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A discovered input image and the record name it will be exported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    /// Path relative to the input root, without extension, `/`-separated.
    pub name: String,
}

/// Splits a comma-separated input list, dropping empty entries.
pub fn split_inputs(list: &str) -> Vec<PathBuf> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Expands input roots into image files.
///
/// A root whose final component has an extension is taken as a single file named
/// after its stem. Any other root is a directory walked recursively for `.png`
/// files in sorted order.
pub fn collect_inputs(roots: &[PathBuf]) -> Result<Vec<InputFile>> {
    let mut out = Vec::new();
    for root in roots {
        if is_file_input(root) {
            if !root.is_file() {
                return Err(CrunchError::Input {
                    path: root.clone(),
                    reason: "file not found".into(),
                });
            }
            let name = root
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            out.push(InputFile {
                path: root.clone(),
                name,
            });
            continue;
        }

        if !root.is_dir() {
            return Err(CrunchError::Input {
                path: root.clone(),
                reason: "directory not found".into(),
            });
        }
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| CrunchError::Input {
                path: root.clone(),
                reason: e.to_string(),
            })?;
            let p = entry.path();
            if entry.file_type().is_file() && is_png(p) {
                out.push(InputFile {
                    path: p.to_path_buf(),
                    name: record_name(root, p),
                });
            }
        }
    }
    Ok(out)
}

fn is_file_input(p: &Path) -> bool {
    p.extension().is_some()
}

fn is_png(p: &Path) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// `root/chars/hero.png` → `chars/hero`.
fn record_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path).with_extension("");
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_relative_without_extension() {
        let root = Path::new("gfx");
        assert_eq!(record_name(root, Path::new("gfx/chars/hero.png")), "chars/hero");
        assert_eq!(record_name(root, Path::new("gfx/top.png")), "top");
    }

    #[test]
    fn input_list_is_comma_separated() {
        assert_eq!(
            split_inputs("a, b/c.png,,"),
            vec![PathBuf::from("a"), PathBuf::from("b/c.png")]
        );
    }
}
