use crate::model::Placement;

pub mod bins;
pub mod maxrects;

pub use bins::BinPacker;
pub use maxrects::MaxRectsPacker;

/// A packer places rectangles into a single page.
///
/// Implementations must ensure that reserved slots (image plus padding/extrusion)
/// never overlap and stay inside the page. `pack` returns `None` if the rectangle
/// cannot be placed on the current page in any allowed orientation.
pub trait Packer {
    fn can_pack(&self, w: u32, h: u32) -> bool;
    fn pack(&mut self, record: usize, w: u32, h: u32) -> Option<Placement>;
}
