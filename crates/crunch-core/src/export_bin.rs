//! Binary layout writer.
//!
//! All integers are little-endian:
//!
//! ```text
//! [i16] page count
//!     [str] page name
//!     [i16] image count
//!         [str] image name
//!         [i16] x, y, width, height
//!         [i16] frame x, frame y, frame width, frame height   (trim only)
//!         [u8]  rotated                                         (rotation only)
//! ```
//!
//! `[str]` is a `u16` byte length followed by UTF-8 bytes.

use crate::error::{CrunchError, Result};
use crate::export::Atlas;

/// Serialize the atlas into the binary layout.
pub fn to_binary(atlas: &Atlas) -> Result<Vec<u8>> {
    let mut w = BinWriter::default();
    w.count(atlas.pages.len(), "page count")?;
    for page in &atlas.pages {
        w.string(&page.name)?;
        w.count(page.images.len(), "image count")?;
        for img in &page.images {
            w.string(&img.name)?;
            for (v, what) in [
                (img.x, "x"),
                (img.y, "y"),
                (img.width, "width"),
                (img.height, "height"),
            ] {
                w.short(v, what)?;
            }
            if atlas.trim {
                let f = img.frame.ok_or_else(|| {
                    CrunchError::Encode(format!("image '{}' is missing frame data", img.name))
                })?;
                for (v, what) in [
                    (f.x, "frame x"),
                    (f.y, "frame y"),
                    (f.width, "frame width"),
                    (f.height, "frame height"),
                ] {
                    w.short(v, what)?;
                }
            }
            if atlas.rotate {
                w.buf.push(u8::from(img.rotated.unwrap_or(false)));
            }
        }
    }
    Ok(w.buf)
}

#[derive(Default)]
struct BinWriter {
    buf: Vec<u8>,
}

impl BinWriter {
    fn short(&mut self, v: u32, what: &str) -> Result<()> {
        let v = i16::try_from(v)
            .map_err(|_| CrunchError::Encode(format!("{} {} does not fit in 16 bits", what, v)))?;
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn count(&mut self, n: usize, what: &str) -> Result<()> {
        let n = u32::try_from(n)
            .map_err(|_| CrunchError::Encode(format!("{} {} does not fit in 16 bits", what, n)))?;
        self.short(n, what)
    }

    fn string(&mut self, s: &str) -> Result<()> {
        let len = u16::try_from(s.len())
            .map_err(|_| CrunchError::Encode(format!("name too long: {} bytes", s.len())))?;
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }
}
