//! Bitmap records: owned RGBA pixel buffers plus the frame metadata the exporters need.
//!
//! Pixels are stored as one `u32` per pixel laid out as `0xAABBGGRR`, which is the
//! little-endian reading of an `[r, g, b, a]` byte quad. Every constructor allocates
//! its own buffer; records never share pixel storage.

use crate::error::{CrunchError, Result};
use crate::hash::hash_pixels;
use crate::model::Rect;
use serde::{Deserialize, Serialize};
use tracing::warn;

const ALPHA_MASK: u32 = 0xFF00_0000;
const RGB_MASK: u32 = 0x00FF_FFFF;
const OPAQUE_WHITE: u32 = 0xFFFF_FFFF;

/// Post-process policy applied when a record is created from raw pixels.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadOptions {
    pub premultiply: bool,
    pub trim: bool,
}

impl LoadOptions {
    /// Keep pixels exactly as decoded.
    pub fn raw() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &crate::config::CrunchConfig) -> Self {
        Self {
            premultiply: cfg.premultiply,
            trim: cfg.trim,
        }
    }
}

/// An image record with its (possibly trimmed) pixels and original canvas frame.
#[derive(Debug, Clone)]
pub struct Bitmap {
    /// Path-like key used in exported metadata.
    pub name: String,
    width: u32,
    height: u32,
    frame_x: u32,
    frame_y: u32,
    frame_width: u32,
    frame_height: u32,
    pixels: Vec<u32>,
    hash: u64,
}

impl Bitmap {
    /// Blank (fully transparent) bitmap, used as a page canvas.
    pub fn blank(width: u32, height: u32) -> Self {
        let pixels = vec![0u32; width as usize * height as usize];
        let hash = hash_pixels(width, height, &pixels);
        Self {
            name: String::new(),
            width,
            height,
            frame_x: 0,
            frame_y: 0,
            frame_width: width,
            frame_height: height,
            pixels,
            hash,
        }
    }

    /// Builds a record from decoded RGBA8 bytes (`[r, g, b, a]` per pixel).
    pub fn from_rgba8(
        name: impl Into<String>,
        width: u32,
        height: u32,
        rgba: &[u8],
        opts: LoadOptions,
    ) -> Result<Self> {
        let name = name.into();
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(CrunchError::Input {
                path: name.into(),
                reason: format!(
                    "expected {} bytes for {}x{} RGBA, got {}",
                    expected,
                    width,
                    height,
                    rgba.len()
                ),
            });
        }
        let pixels = rgba
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self::post_process(name, width, height, pixels, opts))
    }

    /// Builds a record from packed `0xAABBGGRR` pixels.
    pub fn from_pixels(
        name: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u32>,
        opts: LoadOptions,
    ) -> Result<Self> {
        let name = name.into();
        if pixels.len() != width as usize * height as usize {
            return Err(CrunchError::Input {
                path: name.into(),
                reason: format!(
                    "expected {} pixels for {}x{}, got {}",
                    width as usize * height as usize,
                    width,
                    height,
                    pixels.len()
                ),
            });
        }
        Ok(Self::post_process(name, width, height, pixels, opts))
    }

    /// Copies the region `(x, y, width, height)` of `src` into a new record and
    /// applies `opts` exactly as loading would.
    pub fn extract(
        src: &Bitmap,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        name: impl Into<String>,
        opts: LoadOptions,
    ) -> Result<Self> {
        let name = name.into();
        let fits_x = x.checked_add(width).is_some_and(|r| r <= src.width);
        let fits_y = y.checked_add(height).is_some_and(|b| b <= src.height);
        if !fits_x || !fits_y {
            return Err(CrunchError::Directive(format!(
                "region {},{} {}x{} for '{}' is outside '{}' ({}x{})",
                x, y, width, height, name, src.name, src.width, src.height
            )));
        }
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for row in y..y + height {
            let start = (row * src.width + x) as usize;
            pixels.extend_from_slice(&src.pixels[start..start + width as usize]);
        }
        Ok(Self::post_process(name, width, height, pixels, opts))
    }

    fn post_process(
        name: String,
        w: u32,
        h: u32,
        mut pixels: Vec<u32>,
        opts: LoadOptions,
    ) -> Self {
        if opts.premultiply {
            for p in pixels.iter_mut() {
                *p = premultiply(*p);
            }
        }

        let bounds = if opts.trim {
            match opaque_bounds(w, h, &pixels) {
                Some(b) => b,
                None => {
                    warn!(name = %name, "image is completely transparent, keeping full canvas");
                    Rect::new(0, 0, w, h)
                }
            }
        } else {
            Rect::new(0, 0, w, h)
        };

        let pixels = if bounds.w == w && bounds.h == h {
            pixels
        } else {
            // `pixels` (the untrimmed buffer) is dropped at the end of this scope.
            let mut trimmed = Vec::with_capacity(bounds.w as usize * bounds.h as usize);
            for row in bounds.y..bounds.y + bounds.h {
                let start = (row * w + bounds.x) as usize;
                trimmed.extend_from_slice(&pixels[start..start + bounds.w as usize]);
            }
            trimmed
        };

        let hash = hash_pixels(bounds.w, bounds.h, &pixels);
        Self {
            name,
            width: bounds.w,
            height: bounds.h,
            frame_x: bounds.x,
            frame_y: bounds.y,
            frame_width: w,
            frame_height: h,
            pixels,
            hash,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }
    /// Offset of the stored pixels within the original canvas.
    #[inline]
    pub fn frame_x(&self) -> u32 {
        self.frame_x
    }
    #[inline]
    pub fn frame_y(&self) -> u32 {
        self.frame_y
    }
    /// Size of the original, untrimmed canvas.
    #[inline]
    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }
    #[inline]
    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }
    /// True if trimming removed any border.
    pub fn is_trimmed(&self) -> bool {
        self.width != self.frame_width || self.height != self.frame_height
    }
    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
    /// Combining hash of `(width, height, pixels)`.
    #[inline]
    pub fn content_hash(&self) -> u64 {
        self.hash
    }
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Pixel at `(x, y)`; panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Pixel bytes as `[r, g, b, a]` quads, ready for the codec.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_le_bytes()).collect()
    }

    /// Recomputes the content hash. Needed after compositing into this bitmap.
    pub fn rehash(&mut self) {
        self.hash = hash_pixels(self.width, self.height, &self.pixels);
    }

    /// Exact equality of size and every pixel byte. The hash is never trusted alone.
    pub fn content_eq(&self, other: &Bitmap) -> bool {
        self.width == other.width && self.height == other.height && self.pixels == other.pixels
    }

    /// Turns every non-transparent pixel opaque white and renames the record.
    pub fn mask(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
        for p in self.pixels.iter_mut() {
            if *p & ALPHA_MASK != 0 {
                *p = OPAQUE_WHITE;
            }
        }
        self.rehash();
    }

    /// Keeps only opaque pure-black pixels (a pre-rendered outline stroke) as
    /// opaque white; everything else becomes fully transparent.
    pub fn outline(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
        for p in self.pixels.iter_mut() {
            *p = if *p & ALPHA_MASK != 0 && *p & RGB_MASK == 0 {
                OPAQUE_WHITE
            } else {
                0
            };
        }
        self.rehash();
    }

    /// Remaps each opaque pixel's RGB from `default` to the entry at the same index
    /// in `replacement`, keeping alpha. Palette entries are conventional `0xRRGGBB`;
    /// any bits above the low 24 are ignored.
    ///
    /// The record is left untouched when any opaque pixel has no palette match.
    pub fn swap_palette(
        &mut self,
        new_name: impl Into<String>,
        default: &[u32],
        replacement: &[u32],
    ) -> Result<()> {
        if default.len() != replacement.len() {
            return Err(CrunchError::PaletteSize {
                default_len: default.len(),
                replacement_len: replacement.len(),
            });
        }
        let mut swapped = Vec::with_capacity(self.pixels.len());
        for &p in &self.pixels {
            let alpha = p & ALPHA_MASK;
            if alpha == 0 {
                swapped.push(p);
                continue;
            }
            let rgb = bgr_to_rgb(p & RGB_MASK);
            // Linear scan; palettes are a handful of colors.
            let idx = default
                .iter()
                .position(|&c| c & RGB_MASK == rgb)
                .ok_or_else(|| CrunchError::Palette {
                    name: self.name.clone(),
                    color: rgb,
                })?;
            swapped.push(alpha | bgr_to_rgb(replacement[idx] & RGB_MASK));
        }
        self.pixels = swapped;
        self.name = new_name.into();
        self.rehash();
        Ok(())
    }

    /// Writes `src` with its top-left at `(tx, ty)` and duplicates its edge pixels
    /// `pad` pixels outward (clamped sampling). Writes outside `self` are dropped.
    ///
    /// The destination hash is not refreshed; call [`Bitmap::rehash`] once compositing
    /// is done.
    pub fn copy_pixels(&mut self, src: &Bitmap, tx: u32, ty: u32, pad: u32) {
        if src.width == 0 || src.height == 0 {
            return;
        }
        let (sw, sh) = (src.width as i64, src.height as i64);
        let pad = pad as i64;
        for y in -pad..sh + pad {
            for x in -pad..sw + pad {
                let sx = x.clamp(0, sw - 1);
                let sy = y.clamp(0, sh - 1);
                let p = src.pixels[(sy * sw + sx) as usize];
                self.put(tx as i64 + x, ty as i64 + y, p);
            }
        }
    }

    /// Same as [`Bitmap::copy_pixels`] but writes `src` rotated 90° clockwise, so
    /// the written block is `src.height()` wide and `src.width()` tall.
    pub fn copy_pixels_rotated(&mut self, src: &Bitmap, tx: u32, ty: u32, pad: u32) {
        if src.width == 0 || src.height == 0 {
            return;
        }
        let (sw, sh) = (src.width as i64, src.height as i64);
        let pad = pad as i64;
        // destination block is sh wide, sw tall
        for y in -pad..sw + pad {
            for x in -pad..sh + pad {
                let dx = x.clamp(0, sh - 1);
                let dy = y.clamp(0, sw - 1);
                let sx = dy;
                let sy = sh - 1 - dx;
                let p = src.pixels[(sy * sw + sx) as usize];
                self.put(tx as i64 + x, ty as i64 + y, p);
            }
        }
    }

    #[inline]
    fn put(&mut self, x: i64, y: i64, p: u32) {
        if x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64 {
            self.pixels[(y as usize) * self.width as usize + x as usize] = p;
        }
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

impl Eq for Bitmap {}

/// Scales each color channel by `alpha / 255` with exact integer arithmetic.
pub fn premultiply(p: u32) -> u32 {
    let a = p >> 24;
    let r = (p & 0xFF) * a / 255;
    let g = ((p >> 8) & 0xFF) * a / 255;
    let b = ((p >> 16) & 0xFF) * a / 255;
    (a << 24) | (b << 16) | (g << 8) | r
}

/// Converts a packed `0x00BBGGRR` color to conventional `0x00RRGGBB`. Symmetric.
pub fn bgr_to_rgb(c: u32) -> u32 {
    ((c & 0xFF) << 16) | (c & 0xFF00) | ((c >> 16) & 0xFF)
}

/// Bounding box of pixels with alpha > 0, or `None` if all are transparent.
fn opaque_bounds(w: u32, h: u32, pixels: &[u32]) -> Option<Rect> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for y in 0..h {
        let row = &pixels[(y * w) as usize..((y + 1) * w) as usize];
        for (x, p) in row.iter().enumerate() {
            if p & ALPHA_MASK != 0 {
                let x = x as u32;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }
    if min_x == u32::MAX {
        return None;
    }
    Some(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}
