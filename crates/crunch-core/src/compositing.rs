use crate::bitmap::Bitmap;
use crate::config::CrunchConfig;
use crate::model::AtlasPage;

/// Renders a page: every slot's pixels are written once (dedup aliases share the
/// owner's pixels), rotated 90° clockwise where the packer rotated them, with edge
/// pixels extruded by `config.extrude`.
pub fn compose_page(page: &AtlasPage, records: &[Bitmap], config: &CrunchConfig) -> Bitmap {
    let mut canvas = Bitmap::blank(page.width, page.height);
    for p in page.slots() {
        let src = &records[p.image];
        if p.rotated {
            canvas.copy_pixels_rotated(src, p.x, p.y, config.extrude);
        } else {
            canvas.copy_pixels(src, p.x, p.y, config.extrude);
        }
    }
    canvas.rehash();
    canvas
}
