use crunch_core::prelude::*;

fn solid(name: &str, w: u32, h: u32, px: u32) -> Bitmap {
    Bitmap::from_pixels(name, w, h, vec![px; (w * h) as usize], LoadOptions::raw())
        .expect("valid bitmap")
}

#[test]
fn test_pack_stats_basic() {
    let cfg = CrunchConfig::builder()
        .with_max_dimensions(256, 256)
        .padding(0)
        .build();

    // 4 textures of 64x64 each
    let records: Vec<Bitmap> = (0..4)
        .map(|i| solid(&format!("tex_{}", i), 64, 64, 0xFF00_0000 | i))
        .collect();
    let pages = BinPacker::new(&cfg).pack(&records).expect("packing should succeed");
    let stats = PackStats::from_pages(&pages);

    assert_eq!(stats.num_images, 4);
    assert_eq!(stats.num_slots, 4);
    assert_eq!(stats.num_pages, 1);
    assert_eq!(stats.used_area, 4 * 64 * 64);
    // tight pages: a 2x2 grid or a strip, either way fully used
    assert!((stats.occupancy - 1.0).abs() < f64::EPSILON, "Occupancy: {}", stats.occupancy);
    assert_eq!(stats.wasted_area(), 0);
    assert_eq!(stats.num_rotated, 0);
    assert_eq!(stats.num_aliases, 0);
}

#[test]
fn test_pack_stats_counts_aliases_and_rotation() {
    let cfg = CrunchConfig::builder()
        .with_max_dimensions(128, 64)
        .padding(0)
        .allow_rotation(true)
        .dedup(true)
        .build();

    let records = vec![
        solid("wide", 20, 100, 0xFF00_00FF),
        solid("dup_a", 8, 8, 0xFF00_FF00),
        solid("dup_b", 8, 8, 0xFF00_FF00),
    ];
    let pages = BinPacker::new(&cfg).pack(&records).expect("packing should succeed");
    let stats = PackStats::from_pages(&pages);

    assert_eq!(stats.num_images, 3);
    assert_eq!(stats.num_slots, 2);
    assert_eq!(stats.num_aliases, 1);
    assert_eq!(stats.num_rotated, 1);
    assert_eq!(stats.used_area, 20 * 100 + 64);
    assert!(stats.total_page_area >= stats.used_area);
    assert!(stats.max_page_width <= 128 && stats.max_page_height <= 64);

    let summary = stats.summary();
    assert!(summary.contains("Pages: 1"));
    assert!(summary.contains("Aliases: 1"));
}

#[test]
fn test_pack_stats_empty() {
    let stats = PackStats::from_pages(&[]);
    assert_eq!(stats.num_pages, 0);
    assert_eq!(stats.occupancy, 0.0);
    assert_eq!(stats.wasted_area(), 0);
}
