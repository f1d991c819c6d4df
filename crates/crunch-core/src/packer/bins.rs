use super::{MaxRectsPacker, Packer};
use crate::bitmap::Bitmap;
use crate::config::CrunchConfig;
use crate::error::{CrunchError, Result};
use crate::model::{AtlasPage, Placement};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// One slot to pack: the record that owns the pixels plus any byte-identical
/// records that will share its placement.
#[derive(Debug, Clone)]
struct SlotGroup {
    owner: usize,
    aliases: Vec<usize>,
}

/// Packs a whole record set into as few pages as the MaxRects heuristic manages.
pub struct BinPacker<'a> {
    config: &'a CrunchConfig,
}

impl<'a> BinPacker<'a> {
    pub fn new(config: &'a CrunchConfig) -> Self {
        Self { config }
    }

    /// Places every record and returns the finalized pages.
    ///
    /// Notes:
    /// - Records are packed largest area first, ties broken by name, so results are
    ///   deterministic for the same input.
    /// - A record that does not fit the current page is retried on the next one;
    ///   smaller records keep filling the current page meanwhile.
    /// - Fails before producing any page if a record cannot fit an empty page in any
    ///   allowed orientation.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn pack(&self, records: &[Bitmap]) -> Result<Vec<AtlasPage>> {
        let cfg = self.config;
        cfg.validate()?;
        if records.is_empty() {
            return Err(CrunchError::Empty);
        }

        let order = packing_order(records);
        let groups = if cfg.dedup {
            dedup_groups(records, &order)
        } else {
            order
                .iter()
                .map(|&owner| SlotGroup {
                    owner,
                    aliases: Vec::new(),
                })
                .collect()
        };

        let empty_page = MaxRectsPacker::new(cfg);
        for g in &groups {
            let r = &records[g.owner];
            if !empty_page.can_pack(r.width(), r.height()) {
                return Err(self.packing_error(r));
            }
        }

        let mut remaining: Vec<&SlotGroup> = groups.iter().collect();
        let mut pages: Vec<AtlasPage> = Vec::new();
        while !remaining.is_empty() {
            debug!(remaining = remaining.len(), page = pages.len(), "packing page");
            let mut packer = MaxRectsPacker::new(cfg);
            let mut placements: Vec<Placement> = Vec::new();
            remaining.retain(|g| {
                let r = &records[g.owner];
                match packer.pack(g.owner, r.width(), r.height()) {
                    Some(p) => {
                        placements.push(p);
                        placements.extend(g.aliases.iter().map(|&a| Placement { record: a, ..p }));
                        false
                    }
                    None => true,
                }
            });

            if placements.is_empty() {
                // A fresh page could not take the first remaining record.
                let r = &records[remaining[0].owner];
                return Err(self.packing_error(r));
            }

            let page = finalize_page(pages.len(), placements, cfg);
            info!(
                page = page.index,
                width = page.width,
                height = page.height,
                images = page.placements.len(),
                "finished page"
            );
            pages.push(page);
        }
        Ok(pages)
    }

    fn packing_error(&self, r: &Bitmap) -> CrunchError {
        CrunchError::Packing {
            name: r.name.clone(),
            width: r.width(),
            height: r.height(),
            max_width: self.config.max_width,
            max_height: self.config.max_height,
        }
    }
}

/// Record indices sorted by area descending, then name, then input position.
fn packing_order(records: &[Bitmap]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&records[a], &records[b]);
        rb.area()
            .cmp(&ra.area())
            .then_with(|| ra.name.cmp(&rb.name))
            .then_with(|| a.cmp(&b))
    });
    order
}

/// Groups byte-identical records. The content hash only narrows candidates; the
/// full buffer comparison decides, so a hash collision never merges two images.
fn dedup_groups(records: &[Bitmap], order: &[usize]) -> Vec<SlotGroup> {
    let mut groups: Vec<SlotGroup> = Vec::with_capacity(order.len());
    let mut by_hash: HashMap<u64, Vec<usize>> = HashMap::new();
    for &idx in order {
        let r = &records[idx];
        let candidates = by_hash.entry(r.content_hash()).or_default();
        let existing = candidates
            .iter()
            .copied()
            .find(|&gi| records[groups[gi].owner].content_eq(r));
        match existing {
            Some(gi) => {
                debug!(
                    name = %r.name,
                    same_as = %records[groups[gi].owner].name,
                    "duplicate image merged"
                );
                groups[gi].aliases.push(idx);
            }
            None => {
                candidates.push(groups.len());
                groups.push(SlotGroup {
                    owner: idx,
                    aliases: Vec::new(),
                });
            }
        }
    }
    groups
}

/// Orders placements by record index and shrinks the page to the pixels it covers
/// (content plus extrusion).
fn finalize_page(index: usize, mut placements: Vec<Placement>, cfg: &CrunchConfig) -> AtlasPage {
    placements.sort_by_key(|p| p.record);
    let mut width = 0u32;
    let mut height = 0u32;
    for p in &placements {
        width = width.max(p.x + p.width + cfg.extrude);
        height = height.max(p.y + p.height + cfg.extrude);
    }
    AtlasPage {
        index,
        width: width.min(cfg.max_width),
        height: height.min(cfg.max_height),
        placements,
    }
}
