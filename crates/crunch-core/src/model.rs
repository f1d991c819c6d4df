use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge coordinate (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge coordinate (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if the interiors of `self` and `r` overlap.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.right() || r.x >= self.right() || self.y >= r.bottom() || r.y >= self.bottom())
    }
}

/// One record placed on a page.
///
/// Records are referenced by their index in the slice handed to the packer. When
/// dedup collapses identical images, every duplicate still gets its own placement
/// (so its name is exported) but shares `image`, position and orientation with the
/// record that owns the slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Placement {
    /// Record whose name and frame data this placement exports.
    pub record: usize,
    /// Record whose pixels occupy the slot; equals `record` unless this is a dedup alias.
    pub image: usize,
    /// Top-left of the image content on the page.
    pub x: u32,
    pub y: u32,
    /// Placed size (post-rotation).
    pub width: u32,
    pub height: u32,
    /// True if the image was rotated 90° clockwise when placed.
    pub rotated: bool,
}

impl Placement {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
    pub fn is_alias(&self) -> bool {
        self.record != self.image
    }
}

/// A finalized atlas page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtlasPage {
    pub index: usize,
    /// Tight bounding box of all reserved slots (never above the configured maximum).
    pub width: u32,
    pub height: u32,
    /// Placements ordered by record index.
    pub placements: Vec<Placement>,
}

impl AtlasPage {
    /// Placements that own their slot (dedup aliases skipped).
    pub fn slots(&self) -> impl Iterator<Item = &Placement> {
        self.placements.iter().filter(|p| !p.is_alias())
    }

    pub fn find(&self, record: usize) -> Option<&Placement> {
        self.placements.iter().find(|p| p.record == record)
    }
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackStats {
    /// Total number of pages in the atlas.
    pub num_pages: usize,
    /// Total number of exported images (dedup aliases included).
    pub num_images: usize,
    /// Number of distinct slots actually occupying page space.
    pub num_slots: usize,
    /// Total area of all pages (sum of width * height for each page).
    pub total_page_area: u64,
    /// Total area used by slot content (sum of placed width * height).
    pub used_area: u64,
    /// Occupancy ratio: used_area / total_page_area (0.0 to 1.0).
    pub occupancy: f64,
    /// Largest page dimensions.
    pub max_page_width: u32,
    pub max_page_height: u32,
    /// Number of rotated slots.
    pub num_rotated: usize,
    /// Number of images that share another image's slot.
    pub num_aliases: usize,
}

impl PackStats {
    /// Computes packing statistics for a set of pages.
    pub fn from_pages(pages: &[AtlasPage]) -> Self {
        let mut stats = PackStats {
            num_pages: pages.len(),
            num_images: 0,
            num_slots: 0,
            total_page_area: 0,
            used_area: 0,
            occupancy: 0.0,
            max_page_width: 0,
            max_page_height: 0,
            num_rotated: 0,
            num_aliases: 0,
        };
        for page in pages {
            stats.total_page_area += page.width as u64 * page.height as u64;
            stats.max_page_width = stats.max_page_width.max(page.width);
            stats.max_page_height = stats.max_page_height.max(page.height);
            for p in &page.placements {
                stats.num_images += 1;
                if p.is_alias() {
                    stats.num_aliases += 1;
                    continue;
                }
                stats.num_slots += 1;
                stats.used_area += p.rect().area();
                if p.rotated {
                    stats.num_rotated += 1;
                }
            }
        }
        if stats.total_page_area > 0 {
            stats.occupancy = stats.used_area as f64 / stats.total_page_area as f64;
        }
        stats
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Pages: {}, Images: {}, Slots: {}, Occupancy: {:.2}%, Rotated: {}, Aliases: {}",
            self.num_pages,
            self.num_images,
            self.num_slots,
            self.occupancy * 100.0,
            self.num_rotated,
            self.num_aliases,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_page_area.saturating_sub(self.used_area)
    }
}
