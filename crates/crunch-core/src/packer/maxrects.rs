use super::Packer;
use crate::config::CrunchConfig;
use crate::model::{Placement, Rect};

/// Best-area-fit MaxRects packer for one page.
///
/// Free space is tracked as a list of maximal (possibly overlapping) free rectangles.
/// A placement splits every free rectangle it intersects into up to four remainders,
/// and rectangles contained in another free rectangle are pruned afterwards.
pub struct MaxRectsPacker {
    border: Rect,
    free: Vec<Rect>,
    overhead: u32,
    offset: u32,
    allow_rotation: bool,
}

/// Chosen free-rectangle position for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fit {
    slot: Rect,
    rotated: bool,
}

impl MaxRectsPacker {
    pub fn new(config: &CrunchConfig) -> Self {
        let border = Rect::new(0, 0, config.max_width, config.max_height);
        Self {
            border,
            free: vec![border],
            overhead: config.slot_overhead(),
            offset: config.extrude + config.padding / 2,
            allow_rotation: config.allow_rotation,
        }
    }

    fn place_rect(&mut self, node: &Rect) {
        // split all free rectangles that intersect with node
        let mut new_free: Vec<Rect> = Vec::with_capacity(self.free.len() + 4);
        for fr in self.free.iter() {
            if !fr.intersects(node) {
                new_free.push(*fr);
                continue;
            }
            // above
            if node.y > fr.y {
                new_free.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
            }
            // below
            if node.bottom() < fr.bottom() {
                new_free.push(Rect::new(fr.x, node.bottom(), fr.w, fr.bottom() - node.bottom()));
            }
            // left
            if node.x > fr.x {
                new_free.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
            }
            // right
            if node.right() < fr.right() {
                new_free.push(Rect::new(node.right(), fr.y, fr.right() - node.right(), fr.h));
            }
        }

        self.free = new_free;
        self.prune_free_list();
    }

    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let a = self.free[i];
            let mut remove_i = false;
            let mut j = i + 1;
            while j < self.free.len() {
                let b = self.free[j];
                // if a inside b
                if b.contains(&a) {
                    remove_i = true;
                    break;
                }
                // if b inside a
                if a.contains(&b) {
                    self.free.remove(j);
                    continue;
                }
                j += 1;
            }
            if remove_i {
                self.free.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// (leftover area, shorter leftover side); smaller is better.
    fn score(fr: &Rect, w: u32, h: u32) -> (u64, u32) {
        let area_fit = fr.area() - (w as u64 * h as u64);
        let short_fit = (fr.w - w).min(fr.h - h);
        (area_fit, short_fit)
    }

    fn find_position(&self, w: u32, h: u32) -> Option<Fit> {
        let mut best: Option<(Fit, ((u64, u32), bool, (u32, u32)))> = None;

        let mut consider = |fr: &Rect, w: u32, h: u32, rotated: bool| {
            // score, then unrotated before rotated, then smaller top side (y + h) and x
            let key = (Self::score(fr, w, h), rotated, (fr.y + h, fr.x));
            if best.as_ref().is_none_or(|(_, bk)| key < *bk) {
                best = Some((
                    Fit {
                        slot: Rect::new(fr.x, fr.y, w, h),
                        rotated,
                    },
                    key,
                ));
            }
        };

        for fr in &self.free {
            // normal
            if fr.w >= w && fr.h >= h {
                // perfect fit early-out
                if fr.w == w && fr.h == h {
                    return Some(Fit {
                        slot: Rect::new(fr.x, fr.y, w, h),
                        rotated: false,
                    });
                }
                consider(fr, w, h, false);
            }
            // rotated
            if self.allow_rotation && w != h && fr.w >= h && fr.h >= w {
                consider(fr, h, w, true);
            }
        }

        best.map(|(fit, _)| fit)
    }

    pub fn free_list_len(&self) -> usize {
        self.free.len()
    }
}

impl Packer for MaxRectsPacker {
    fn can_pack(&self, w: u32, h: u32) -> bool {
        self.find_position(w + self.overhead, h + self.overhead)
            .is_some()
    }

    fn pack(&mut self, record: usize, w: u32, h: u32) -> Option<Placement> {
        let fit = self.find_position(w + self.overhead, h + self.overhead)?;
        self.place_rect(&fit.slot);
        debug_assert!(self.border.contains(&fit.slot));
        // Report content in stored orientation (post-rotation width/height),
        // offset inside the reserved slot by extrude + half padding.
        let (pw, ph) = if fit.rotated { (h, w) } else { (w, h) };
        Some(Placement {
            record,
            image: record,
            x: fit.slot.x + self.offset,
            y: fit.slot.y + self.offset,
            width: pw,
            height: ph,
            rotated: fit.rotated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(rotate: bool) -> CrunchConfig {
        CrunchConfig::builder()
            .with_max_dimensions(64, 64)
            .padding(0)
            .allow_rotation(rotate)
            .build()
    }

    #[test]
    fn perfect_fit_fills_page() {
        let mut p = MaxRectsPacker::new(&cfg(false));
        let placed = p.pack(0, 64, 64).expect("fits");
        assert_eq!((placed.x, placed.y), (0, 0));
        assert!(!p.can_pack(1, 1));
    }

    #[test]
    fn rotation_used_only_when_needed() {
        let mut p = MaxRectsPacker::new(&cfg(true));
        // leaves a 64x16 strip at the bottom
        p.pack(0, 64, 48).expect("fits");
        let placed = p.pack(1, 16, 64).expect("fits rotated");
        assert!(placed.rotated);
        assert_eq!((placed.width, placed.height), (64, 16));
        assert_eq!(placed.y, 48);
    }

    #[test]
    fn square_is_never_rotated() {
        let mut p = MaxRectsPacker::new(&cfg(true));
        let placed = p.pack(0, 10, 10).expect("fits");
        assert!(!placed.rotated);
    }
}
