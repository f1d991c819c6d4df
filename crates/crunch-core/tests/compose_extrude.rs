use crunch_core::bitmap::{Bitmap, LoadOptions};
use crunch_core::compositing::compose_page;
use crunch_core::config::CrunchConfig;
use crunch_core::model::{AtlasPage, Placement};
use crunch_core::packer::BinPacker;

const A: u32 = 0xFF00_0001;
const B: u32 = 0xFF00_0002;
const C: u32 = 0xFF00_0003;
const D: u32 = 0xFF00_0004;

fn quad() -> Bitmap {
    Bitmap::from_pixels("q", 2, 2, vec![A, B, C, D], LoadOptions::raw()).unwrap()
}

#[test]
fn extrude_duplicates_edges() {
    let cfg = CrunchConfig::builder()
        .with_max_dimensions(64, 64)
        .padding(0)
        .extrude(1)
        .build();
    let records = vec![quad()];
    let pages = BinPacker::new(&cfg).pack(&records).unwrap();
    let page = &pages[0];
    let p = page.placements[0];
    assert_eq!((p.x, p.y), (1, 1));
    assert_eq!((page.width, page.height), (4, 4));

    let img = compose_page(page, &records, &cfg);
    let expected = [
        [A, A, B, B],
        [A, A, B, B],
        [C, C, D, D],
        [C, C, D, D],
    ];
    for (y, row) in expected.iter().enumerate() {
        for (x, &px) in row.iter().enumerate() {
            assert_eq!(img.pixel(x as u32, y as u32), px, "pixel ({x},{y})");
        }
    }
}

#[test]
fn rotated_copy_is_clockwise() {
    // 1 wide, 2 tall: A above B
    let src = Bitmap::from_pixels("col", 1, 2, vec![A, B], LoadOptions::raw()).unwrap();
    let page = AtlasPage {
        index: 0,
        width: 2,
        height: 1,
        placements: vec![Placement {
            record: 0,
            image: 0,
            x: 0,
            y: 0,
            width: 2,
            height: 1,
            rotated: true,
        }],
    };
    let cfg = CrunchConfig::builder().padding(0).build();
    let img = compose_page(&page, &[src], &cfg);
    assert_eq!(img.pixels(), &[B, A]);
}

#[test]
fn alias_slots_are_drawn_once() {
    let cfg = CrunchConfig::builder()
        .with_max_dimensions(64, 64)
        .padding(0)
        .dedup(true)
        .build();
    let mut other = quad();
    other.name = "q2".into();
    let records = vec![quad(), other];
    let pages = BinPacker::new(&cfg).pack(&records).unwrap();
    assert_eq!((pages[0].width, pages[0].height), (2, 2));
    let img = compose_page(&pages[0], &records, &cfg);
    assert_eq!(img.pixels(), &[A, B, C, D]);
}

#[test]
fn padding_keeps_neighbours_apart() {
    let cfg = CrunchConfig::builder()
        .with_max_dimensions(64, 64)
        .padding(2)
        .build();
    let records = vec![
        Bitmap::from_pixels("a", 4, 4, vec![A; 16], LoadOptions::raw()).unwrap(),
        Bitmap::from_pixels("b", 4, 4, vec![B; 16], LoadOptions::raw()).unwrap(),
    ];
    let pages = BinPacker::new(&cfg).pack(&records).unwrap();
    let img = compose_page(&pages[0], &records, &cfg);
    for p in &pages[0].placements {
        let want = if p.record == 0 { A } else { B };
        for y in p.y..p.y + p.height {
            for x in p.x..p.x + p.width {
                assert_eq!(img.pixel(x, y), want);
            }
        }
    }
    let transparent = img.pixels().iter().filter(|&&p| p == 0).count();
    let area = (img.width() * img.height()) as usize;
    assert_eq!(transparent, area - 32);
}
