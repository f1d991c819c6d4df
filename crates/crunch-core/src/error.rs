use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrunchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// Missing or corrupt source image.
    #[error("Failed to load input {}: {reason}", path.display())]
    Input { path: PathBuf, reason: String },
    /// Unreadable or malformed metadata/palette file.
    #[error("Failed to parse metadata file {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A record whose padded rectangle exceeds the page in every allowed orientation.
    #[error("Packing failed, could not fit bitmap '{name}' ({width}x{height}) into a {max_width}x{max_height} page")]
    Packing {
        name: String,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
    /// An opaque pixel whose RGB is not part of the default palette.
    #[error("Palette swap failed for '{name}': color 0x{color:06X} is not in the default palette")]
    Palette { name: String, color: u32 },
    #[error("Palette size mismatch: default has {default_len} colors, replacement has {replacement_len}")]
    PaletteSize {
        default_len: usize,
        replacement_len: usize,
    },
    /// Malformed per-record sizing or transform directive.
    #[error("Invalid directive: {0}")]
    Directive(String),
    #[error("Invalid atlas dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Nothing to pack")]
    Empty,
    #[error("Encoding error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, CrunchError>;
