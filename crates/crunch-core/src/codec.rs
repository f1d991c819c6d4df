use crate::error::{CrunchError, Result};
use image::{ImageFormat, RgbaImage};
use std::path::Path;

/// Decoded RGBA8 pixels (`[r, g, b, a]` per pixel, row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Raster codec used by the pipeline to read inputs and write page images.
pub trait RasterCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage>;
    fn encode(&self, path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<()>;
}

/// PNG codec backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl RasterCodec for ImageCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let img = image::open(path).map_err(|e| CrunchError::Input {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(DecodedImage {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    fn encode(&self, path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
        let img = RgbaImage::from_raw(width, height, rgba.to_vec()).ok_or_else(|| {
            CrunchError::Encode(format!(
                "{} bytes is not a {}x{} RGBA buffer",
                rgba.len(),
                width,
                height
            ))
        })?;
        img.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}
