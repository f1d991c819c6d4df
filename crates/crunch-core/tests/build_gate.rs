use crunch_core::config::{CrunchConfig, ExportFormat};
use crunch_core::pipeline::{BuildOutcome, BuildRequest, Crunch};
use image::{Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh directory under the system temp dir, removed on drop.
struct TempDir(PathBuf);

impl TempDir {
    fn new(tag: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "crunch-{}-{}-{}",
            tag,
            std::process::id(),
            n
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        TempDir(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn write_png(path: &Path, w: u32, h: u32, color: [u8; 4]) {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).unwrap();
    }
    RgbaImage::from_pixel(w, h, Rgba(color)).save(path).unwrap();
}

fn config() -> CrunchConfig {
    CrunchConfig::builder()
        .with_max_dimensions(64, 64)
        .trim(true)
        .dedup(true)
        .format(ExportFormat::Json)
        .format(ExportFormat::Xml)
        .build()
}

fn setup(tmp: &TempDir) -> (PathBuf, PathBuf) {
    let gfx = tmp.path().join("gfx");
    write_png(&gfx.join("a.png"), 8, 8, [255, 0, 0, 255]);
    write_png(&gfx.join("sub/b.png"), 4, 12, [0, 255, 0, 255]);
    let prefix = tmp.path().join("out").join("atlas");
    (gfx, prefix)
}

fn built(outcome: BuildOutcome) -> crunch_core::pipeline::BuildReport {
    match outcome {
        BuildOutcome::Built(r) => r,
        BuildOutcome::Unchanged(_) => panic!("expected a build"),
    }
}

#[test]
fn second_run_is_unchanged() {
    let tmp = TempDir::new("unchanged");
    let (gfx, prefix) = setup(&tmp);
    let crunch = Crunch::new(config(), &prefix);
    let req = BuildRequest::new([&gfx]);

    let report = built(crunch.run(&req).unwrap());
    assert_eq!(report.pages.len(), 1);
    assert!(report.atlas.find("a").is_some());
    assert!(report.atlas.find("sub/b").is_some());
    for ext in ["0.png", ".json", ".xml", ".hash"] {
        let p = PathBuf::from(format!("{}{}", prefix.display(), ext));
        assert!(p.is_file(), "missing {}", p.display());
    }
    let stored = crunch.cache().load().unwrap();
    assert_eq!(stored, Some(report.fingerprint));

    let json_before = fs::read(prefix.with_extension("json")).unwrap();
    let second = crunch.run(&req).unwrap();
    assert!(second.is_unchanged());
    assert_eq!(fs::read(prefix.with_extension("json")).unwrap(), json_before);
}

#[test]
fn changed_pixel_forces_repack() {
    let tmp = TempDir::new("changed");
    let (gfx, prefix) = setup(&tmp);
    let crunch = Crunch::new(config(), &prefix);
    let req = BuildRequest::new([&gfx]);
    let first = built(crunch.run(&req).unwrap());

    // one channel of one pixel differs
    let mut img = image::open(gfx.join("a.png")).unwrap().to_rgba8();
    img.put_pixel(3, 3, Rgba([254, 0, 0, 255]));
    img.save(gfx.join("a.png")).unwrap();

    let second = built(crunch.run(&req).unwrap());
    assert_ne!(first.fingerprint, second.fingerprint);
    assert_eq!(crunch.cache().load().unwrap(), Some(second.fingerprint));
}

#[test]
fn force_rebuilds_and_options_change_fingerprint() {
    let tmp = TempDir::new("force");
    let (gfx, prefix) = setup(&tmp);
    let req = BuildRequest::new([&gfx]);
    built(Crunch::new(config(), &prefix).run(&req).unwrap());

    let forced = CrunchConfig {
        force: true,
        ..config()
    };
    built(Crunch::new(forced, &prefix).run(&req).unwrap());

    let rotated = CrunchConfig {
        allow_rotation: true,
        ..config()
    };
    built(Crunch::new(rotated, &prefix).run(&req).unwrap());
}

#[test]
fn failed_run_keeps_previous_outputs_and_fingerprint() {
    let tmp = TempDir::new("failed");
    let (gfx, prefix) = setup(&tmp);
    let crunch = Crunch::new(config(), &prefix);
    let req = BuildRequest::new([&gfx]);
    let first = built(crunch.run(&req).unwrap());
    let page_before = fs::read(format!("{}0.png", prefix.display())).unwrap();

    // too large for a 64x64 page
    write_png(&gfx.join("huge.png"), 100, 100, [0, 0, 255, 255]);
    assert!(crunch.run(&req).is_err());
    assert_eq!(crunch.cache().load().unwrap(), Some(first.fingerprint));
    assert_eq!(fs::read(format!("{}0.png", prefix.display())).unwrap(), page_before);

    // a corrupt image is an input error, equally harmless
    fs::remove_file(gfx.join("huge.png")).unwrap();
    fs::write(gfx.join("broken.png"), b"not a png").unwrap();
    assert!(matches!(
        crunch.run(&req),
        Err(crunch_core::CrunchError::Input { .. })
    ));
    assert_eq!(crunch.cache().load().unwrap(), Some(first.fingerprint));

    let leftovers: Vec<_> = fs::read_dir(prefix.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn interrupted_commit_is_rebuilt_after_revert() {
    let tmp = TempDir::new("interrupted");
    let (gfx, prefix) = setup(&tmp);
    let crunch = Crunch::new(config(), &prefix);
    let req = BuildRequest::new([&gfx]);
    built(crunch.run(&req).unwrap());

    // new content, but the xml target cannot be replaced
    write_png(&gfx.join("a.png"), 8, 8, [0, 0, 255, 255]);
    let xml = prefix.with_extension("xml");
    fs::remove_file(&xml).unwrap();
    fs::create_dir_all(&xml).unwrap();
    assert!(crunch.run(&req).is_err());
    assert_eq!(crunch.cache().load().unwrap(), None);

    // back to the first build's inputs
    write_png(&gfx.join("a.png"), 8, 8, [255, 0, 0, 255]);
    fs::remove_dir_all(&xml).unwrap();
    let third = crunch.run(&req).unwrap();
    assert!(!third.is_unchanged());
    assert!(xml.is_file());
    let page = image::open(format!("{}0.png", prefix.display()))
        .unwrap()
        .to_rgba8();
    assert!(page.pixels().any(|p| *p == Rgba([255, 0, 0, 255])));
    assert!(!page.pixels().any(|p| *p == Rgba([0, 0, 255, 255])));
}

#[test]
fn stale_pages_and_formats_are_removed() {
    let tmp = TempDir::new("stale");
    let gfx = tmp.path().join("gfx");
    write_png(&gfx.join("one.png"), 60, 60, [255, 0, 0, 255]);
    write_png(&gfx.join("two.png"), 60, 60, [0, 255, 0, 255]);
    let prefix = tmp.path().join("atlas");
    let req = BuildRequest::new([&gfx]);
    let first = built(Crunch::new(config(), &prefix).run(&req).unwrap());
    assert_eq!(first.pages.len(), 2);
    let page1 = PathBuf::from(format!("{}1.png", prefix.display()));
    assert!(page1.is_file());

    fs::remove_file(gfx.join("two.png")).unwrap();
    let json_only = CrunchConfig::builder()
        .with_max_dimensions(64, 64)
        .trim(true)
        .dedup(true)
        .format(ExportFormat::Json)
        .build();
    let second = built(Crunch::new(json_only, &prefix).run(&req).unwrap());
    assert_eq!(second.pages.len(), 1);
    assert!(!page1.exists());
    assert!(!prefix.with_extension("xml").exists());
    assert!(prefix.with_extension("json").is_file());
}

#[test]
fn single_file_inputs_use_their_stem() {
    let tmp = TempDir::new("file");
    let file = tmp.path().join("ship.png");
    write_png(&file, 6, 6, [9, 9, 9, 255]);
    let prefix = tmp.path().join("atlas");
    let report = built(
        Crunch::new(config(), &prefix)
            .run(&BuildRequest::new([&file]))
            .unwrap(),
    );
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].name, "ship");
    assert_eq!(report.written.len(), 3);
}
