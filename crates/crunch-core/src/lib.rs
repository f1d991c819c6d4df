//! Core library for building texture atlases.
//!
//! - Records: [`Bitmap`] owns a pixel buffer with its trim frame and content hash;
//!   mask, outline and palette-swap transforms derive new sprites from it.
//! - Packing: MaxRects best-area-fit with padding, extrusion, optional rotation,
//!   exact-match dedup and multi-page overflow.
//! - Export: JSON, XML and a compact binary layout over one [`Atlas`] model.
//! - Builds: [`Crunch`] gates on a content fingerprint and commits page images,
//!   metadata and the new fingerprint only after everything was produced.
//!
//! Quick example:
//! ```ignore
//! use crunch_core::{BuildOutcome, BuildRequest, Crunch, CrunchConfig, ExportFormat};
//! # fn main() -> crunch_core::Result<()> {
//! let cfg = CrunchConfig::builder()
//!     .with_max_dimensions(1024, 1024)
//!     .trim(true)
//!     .dedup(true)
//!     .format(ExportFormat::Json)
//!     .build();
//! match Crunch::new(cfg, "out/atlas").run(&BuildRequest::new(["gfx"]))? {
//!     BuildOutcome::Unchanged(_) => println!("atlas is unchanged"),
//!     BuildOutcome::Built(report) => println!("{}", report.stats.summary()),
//! }
//! # Ok(()) }
//! ```

pub mod bitmap;
pub mod cache;
pub mod codec;
pub mod compositing;
pub mod config;
pub mod directives;
pub mod error;
pub mod export;
pub mod export_bin;
pub mod export_xml;
pub mod hash;
pub mod inputs;
pub mod model;
pub mod output;
pub mod packer;
pub mod pipeline;

pub use bitmap::{Bitmap, LoadOptions};
pub use cache::{BuildCache, Fingerprint, FingerprintBuilder};
pub use codec::{DecodedImage, ImageCodec, RasterCodec};
pub use compositing::compose_page;
pub use config::*;
pub use directives::{PaletteBook, PaletteGroup, SpriteDirective, SpriteMeta};
pub use error::*;
pub use export::*;
pub use export_bin::to_binary;
pub use export_xml::to_xml;
pub use model::*;
pub use packer::{BinPacker, MaxRectsPacker, Packer};
pub use pipeline::*;

/// Convenience prelude for common types and functions.
/// Importing `crunch_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::bitmap::{Bitmap, LoadOptions};
    pub use crate::config::{CrunchConfig, CrunchConfigBuilder, ExportFormat, ExportFormats};
    pub use crate::error::{CrunchError, Result};
    pub use crate::export::{to_json, Atlas};
    pub use crate::model::{AtlasPage, PackStats, Placement, Rect};
    pub use crate::pipeline::{
        pack_records, BuildOutcome, BuildReport, BuildRequest, Crunch, PackedAtlas, Progress,
    };
    pub use crate::{to_binary, to_xml, BinPacker};
}
