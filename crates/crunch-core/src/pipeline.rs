use crate::bitmap::{Bitmap, LoadOptions};
use crate::cache::{BuildCache, Fingerprint, FingerprintBuilder};
use crate::codec::{ImageCodec, RasterCodec};
use crate::compositing::compose_page;
use crate::config::{CrunchConfig, ExportFormat};
use crate::directives::{expand, PaletteBook, SpriteMeta};
use crate::error::{CrunchError, Result};
use crate::export::{page_name, to_json, Atlas};
use crate::export_bin::to_binary;
use crate::export_xml::to_xml;
use crate::inputs::collect_inputs;
use crate::model::{AtlasPage, PackStats};
use crate::output::{prefixed, remove_stale, OutputSet};
use crate::packer::BinPacker;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// What to build: input roots plus optional metadata files.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Files or directories; directories are walked for `.png` files.
    pub inputs: Vec<PathBuf>,
    /// Sprite directive file (see [`crate::directives`]).
    pub meta: Option<PathBuf>,
    /// Palette group file.
    pub palettes: Option<PathBuf>,
    /// Raw command-line arguments, folded into the fingerprint.
    pub args: Vec<String>,
}

impl BuildRequest {
    pub fn new(inputs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub enum BuildOutcome {
    /// Fingerprint matched the stored one; nothing was read or written.
    Unchanged(Fingerprint),
    Built(BuildReport),
}

impl BuildOutcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, BuildOutcome::Unchanged(_))
    }
}

/// Result of a full build.
#[derive(Debug)]
pub struct BuildReport {
    pub pages: Vec<AtlasPage>,
    pub records: Vec<Bitmap>,
    pub atlas: Atlas,
    pub stats: PackStats,
    pub fingerprint: Fingerprint,
    /// Files written by this build, in commit order.
    pub written: Vec<PathBuf>,
}

/// Observer for long-running steps. All methods default to no-ops.
pub trait Progress {
    fn start(&self, _stage: &str, _total: usize) {}
    fn advance(&self, _item: &str) {}
    fn finish(&self) {}
}

impl Progress for () {}

/// In-memory result of packing a record set.
#[derive(Debug)]
pub struct PackedAtlas {
    pub pages: Vec<AtlasPage>,
    /// Rendered page images, one per page.
    pub images: Vec<Bitmap>,
    pub atlas: Atlas,
}

/// Packs and renders `records` without touching the filesystem.
#[instrument(skip_all, fields(records = records.len()))]
pub fn pack_records(records: &[Bitmap], config: &CrunchConfig, prefix: &str) -> Result<PackedAtlas> {
    let pages = BinPacker::new(config).pack(records)?;
    let images = pages
        .iter()
        .map(|p| {
            let mut img = compose_page(p, records, config);
            img.name = page_name(prefix, p.index);
            img
        })
        .collect();
    let atlas = Atlas::new(prefix, &pages, records, config);
    Ok(PackedAtlas {
        pages,
        images,
        atlas,
    })
}

/// End-to-end atlas build for one output prefix.
///
/// Outputs are `<prefix><n>.png` per page plus `<prefix>.{xml,bin,json}` for each
/// requested format, and the fingerprint at `<prefix>.hash`.
pub struct Crunch<C = ImageCodec> {
    config: CrunchConfig,
    prefix: PathBuf,
    codec: C,
}

impl Crunch<ImageCodec> {
    pub fn new(config: CrunchConfig, prefix: impl Into<PathBuf>) -> Self {
        Self {
            config,
            prefix: prefix.into(),
            codec: ImageCodec,
        }
    }
}

impl<C: RasterCodec> Crunch<C> {
    /// Swaps the raster codec.
    pub fn with_codec<D: RasterCodec>(self, codec: D) -> Crunch<D> {
        Crunch {
            config: self.config,
            prefix: self.prefix,
            codec,
        }
    }

    pub fn config(&self) -> &CrunchConfig {
        &self.config
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn cache(&self) -> BuildCache {
        BuildCache::for_prefix(&self.prefix)
    }

    pub fn run(&self, request: &BuildRequest) -> Result<BuildOutcome> {
        self.run_with_progress(request, &())
    }

    /// Runs the build unless the fingerprint shows nothing changed.
    ///
    /// An error before the commit replaces no output and keeps the stored
    /// fingerprint. The fingerprint is removed before outputs are renamed into
    /// place and written back last, so a partial commit always rebuilds next time.
    #[instrument(skip_all, fields(prefix = %self.prefix.display()))]
    pub fn run_with_progress(
        &self,
        request: &BuildRequest,
        progress: &dyn Progress,
    ) -> Result<BuildOutcome> {
        let cfg = &self.config;
        cfg.validate()?;

        let fingerprint = self.fingerprint(request)?;
        let cache = self.cache();
        if cache.is_fresh(fingerprint, cfg.force)? {
            info!(prefix = %self.prefix.display(), "atlas is unchanged");
            return Ok(BuildOutcome::Unchanged(fingerprint));
        }

        let t0 = Instant::now();
        let sheets = self.load_sheets(request, progress)?;
        let meta = request.meta.as_deref().map(SpriteMeta::load).transpose()?;
        let palettes = request
            .palettes
            .as_deref()
            .map(PaletteBook::load)
            .transpose()?;
        let records = expand(
            &sheets,
            meta.as_ref(),
            palettes.as_ref(),
            LoadOptions::from_config(cfg),
        )?;
        drop(sheets);
        check_unique_names(&records)?;
        info!(records = records.len(), "loaded images");

        let stem = self
            .prefix
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let packed = pack_records(&records, cfg, &stem)?;

        let mut out = OutputSet::new();
        for (page, img) in packed.pages.iter().zip(&packed.images) {
            let target = prefixed(&self.prefix, &format!("{}.png", page.index));
            out.stage_with(&target, |tmp| {
                self.codec
                    .encode(tmp, img.width(), img.height(), &img.to_rgba8())
            })?;
        }
        for format in cfg.formats.iter() {
            let target = prefixed(&self.prefix, &format!(".{}", format.extension()));
            let bytes = match format {
                ExportFormat::Xml => to_xml(&packed.atlas).into_bytes(),
                ExportFormat::Binary => to_binary(&packed.atlas)?,
                ExportFormat::Json => serde_json::to_string_pretty(&to_json(&packed.atlas))
                    .map_err(|e| CrunchError::Encode(e.to_string()))?
                    .into_bytes(),
            };
            out.stage_bytes(&target, &bytes)?;
        }

        cache.clear()?;
        let written = out.commit()?;
        remove_stale(&self.prefix, packed.pages.len(), &cfg.formats)?;
        cache.store(fingerprint)?;

        let stats = PackStats::from_pages(&packed.pages);
        info!(
            pages = stats.num_pages,
            images = stats.num_images,
            occupancy = stats.occupancy,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "atlas written"
        );
        Ok(BuildOutcome::Built(BuildReport {
            pages: packed.pages,
            records,
            atlas: packed.atlas,
            stats,
            fingerprint,
            written,
        }))
    }

    /// Fingerprint of arguments, configuration and every input's content.
    pub fn fingerprint(&self, request: &BuildRequest) -> Result<Fingerprint> {
        let mut b = FingerprintBuilder::new();
        for a in &request.args {
            b.arg(a);
        }
        b.arg(&self.prefix.to_string_lossy());
        b.config(&self.config)?;
        for input in &request.inputs {
            b.input(input)?;
        }
        for file in [&request.meta, &request.palettes].into_iter().flatten() {
            b.input(file)?;
        }
        let fp = b.finish();
        debug!(%fp, "computed fingerprint");
        Ok(fp)
    }

    fn load_sheets(&self, request: &BuildRequest, progress: &dyn Progress) -> Result<Vec<Bitmap>> {
        let files = collect_inputs(&request.inputs)?;
        if files.is_empty() {
            return Err(CrunchError::Empty);
        }
        progress.start("loading", files.len());
        let mut sheets = Vec::with_capacity(files.len());
        for f in &files {
            progress.advance(&f.name);
            let decoded = self.codec.decode(&f.path)?;
            sheets.push(Bitmap::from_rgba8(
                f.name.clone(),
                decoded.width,
                decoded.height,
                &decoded.rgba,
                LoadOptions::raw(),
            )?);
        }
        progress.finish();
        Ok(sheets)
    }
}

fn check_unique_names(records: &[Bitmap]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for r in records {
        if !seen.insert(r.name.as_str()) {
            return Err(CrunchError::Input {
                path: PathBuf::from(&r.name),
                reason: "more than one image has this name".into(),
            });
        }
    }
    Ok(())
}
