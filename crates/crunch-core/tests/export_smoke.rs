use crunch_core::bitmap::{Bitmap, LoadOptions};
use crunch_core::config::CrunchConfig;
use crunch_core::error::CrunchError;
use crunch_core::export::to_json;
use crunch_core::export_bin::to_binary;
use crunch_core::export_xml::to_xml;
use crunch_core::pipeline::pack_records;

fn records(trim: bool) -> Vec<Bitmap> {
    let opts = LoadOptions {
        premultiply: false,
        trim,
    };
    let mut px = vec![0u32; 64];
    for y in 2..6 {
        for x in 1..7 {
            px[y * 8 + x] = 0xFF00_00FF;
        }
    }
    vec![
        Bitmap::from_pixels("ui/button", 8, 8, px, opts).unwrap(),
        Bitmap::from_pixels("ui/icon", 3, 5, vec![0xFFFF_0000; 15], opts).unwrap(),
    ]
}

fn cfg(trim: bool, rotate: bool) -> CrunchConfig {
    CrunchConfig::builder()
        .with_max_dimensions(64, 64)
        .trim(trim)
        .allow_rotation(rotate)
        .build()
}

#[test]
fn json_fields_follow_run_options() {
    let c = cfg(true, true);
    let packed = pack_records(&records(true), &c, "atlas").unwrap();
    let v = to_json(&packed.atlas);
    let page = &v["textures"][0];
    assert_eq!(page["name"], "atlas0");
    assert!(page["width"].as_u64().unwrap() > 0);
    let images = page["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    for img in images {
        assert!(img.get("frame").is_some());
        assert!(img.get("rotated").is_some());
    }
    let button = images.iter().find(|i| i["name"] == "ui/button").unwrap();
    assert_eq!(button["width"], 6);
    assert_eq!(button["frame"]["x"], 1);
    assert_eq!(button["frame"]["y"], 2);
    assert_eq!(button["frame"]["width"], 8);

    let c = cfg(false, false);
    let packed = pack_records(&records(false), &c, "atlas").unwrap();
    let v = to_json(&packed.atlas);
    for img in v["textures"][0]["images"].as_array().unwrap() {
        assert!(img.get("frame").is_none());
        assert!(img.get("rotated").is_none());
    }
}

#[test]
fn xml_attributes_follow_run_options() {
    let packed = pack_records(&records(true), &cfg(true, false), "atlas").unwrap();
    let xml = to_xml(&packed.atlas);
    assert!(xml.starts_with("<atlas>"));
    assert!(xml.contains("<tex n=\"atlas0\""));
    assert!(xml.contains("n=\"ui/button\""));
    assert_eq!(xml.matches("fx=").count(), 2);
    assert!(!xml.contains(" r=\""));

    let packed = pack_records(&records(false), &cfg(false, true), "atlas").unwrap();
    let xml = to_xml(&packed.atlas);
    assert!(!xml.contains("fx="));
    assert_eq!(xml.matches(" r=\"").count(), 2);
}

fn read_i16(b: &[u8], at: &mut usize) -> i16 {
    let v = i16::from_le_bytes([b[*at], b[*at + 1]]);
    *at += 2;
    v
}

fn read_str(b: &[u8], at: &mut usize) -> String {
    let len = u16::from_le_bytes([b[*at], b[*at + 1]]) as usize;
    *at += 2;
    let s = String::from_utf8(b[*at..*at + len].to_vec()).unwrap();
    *at += len;
    s
}

#[test]
fn binary_layout_is_parseable() {
    for (trim, rotate) in [(false, false), (true, false), (false, true), (true, true)] {
        let packed = pack_records(&records(trim), &cfg(trim, rotate), "atlas").unwrap();
        let bin = to_binary(&packed.atlas).unwrap();
        let mut at = 0;
        assert_eq!(read_i16(&bin, &mut at), 1);
        assert_eq!(read_str(&bin, &mut at), "atlas0");
        let count = read_i16(&bin, &mut at);
        assert_eq!(count, 2);
        for img in &packed.atlas.pages[0].images {
            assert_eq!(read_str(&bin, &mut at), img.name);
            assert_eq!(read_i16(&bin, &mut at) as u32, img.x);
            assert_eq!(read_i16(&bin, &mut at) as u32, img.y);
            assert_eq!(read_i16(&bin, &mut at) as u32, img.width);
            assert_eq!(read_i16(&bin, &mut at) as u32, img.height);
            if trim {
                let f = img.frame.unwrap();
                assert_eq!(read_i16(&bin, &mut at) as u32, f.x);
                assert_eq!(read_i16(&bin, &mut at) as u32, f.y);
                assert_eq!(read_i16(&bin, &mut at) as u32, f.width);
                assert_eq!(read_i16(&bin, &mut at) as u32, f.height);
            }
            if rotate {
                assert_eq!(bin[at], u8::from(img.rotated.unwrap()));
                at += 1;
            }
        }
        assert_eq!(at, bin.len(), "trim={trim} rotate={rotate}");
    }
}

#[test]
fn binary_rejects_overlong_names() {
    let name = "n".repeat(70_000);
    let rec = Bitmap::from_pixels(name, 1, 1, vec![0xFF00_0000], LoadOptions::raw()).unwrap();
    let packed = pack_records(&[rec], &cfg(false, false), "atlas").unwrap();
    assert!(matches!(to_binary(&packed.atlas), Err(CrunchError::Encode(_))));
}
