use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use crunch_core::inputs::split_inputs;
use crunch_core::{
    BuildOutcome, BuildRequest, Crunch, CrunchConfig, ExportFormat, Progress, ALLOWED_PAGE_SIZES,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "crunch",
    about = "Pack PNG sprites into texture atlases, skipping the build when nothing changed",
    version,
    author
)]
struct Cli {
    // Input/Output
    /// Output path prefix, e.g. `bin/atlas` writes bin/atlas0.png, bin/atlas.xml, ...
    #[arg(help_heading = "Input/Output")]
    output: PathBuf,
    /// Comma-separated input files and directories
    #[arg(help_heading = "Input/Output")]
    inputs: String,
    /// Sprite directive file (flipbook slicing, mask/outline/palette generation)
    #[arg(long, help_heading = "Input/Output")]
    meta: Option<PathBuf>,
    /// Palette group file used by palette directives
    #[arg(long, help_heading = "Input/Output")]
    palettes: Option<PathBuf>,
    /// YAML config file path (overrides command-line options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,

    // Export
    /// Use default settings (-x -p -t -u)
    #[arg(short = 'd', long = "default", help_heading = "Export")]
    defaults: bool,
    /// Save the atlas data as a .xml file
    #[arg(short = 'x', long, help_heading = "Export")]
    xml: bool,
    /// Save the atlas data as a .bin file
    #[arg(short = 'b', long, help_heading = "Export")]
    binary: bool,
    /// Save the atlas data as a .json file
    #[arg(short = 'j', long, help_heading = "Export")]
    json: bool,
    /// Print the merged configuration and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "yaml", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,

    // Image Processing
    /// Premultiply the pixels of the bitmaps by their alpha channel
    #[arg(short = 'p', long, help_heading = "Image Processing")]
    premultiply: bool,
    /// Trim excess transparency off the bitmaps
    #[arg(short = 't', long, help_heading = "Image Processing")]
    trim: bool,
    /// Remove duplicate bitmaps from the atlas
    #[arg(short = 'u', long, help_heading = "Image Processing")]
    unique: bool,
    /// Enable rotating bitmaps 90 degrees clockwise when packing
    #[arg(short = 'r', long, help_heading = "Image Processing")]
    rotate: bool,
    /// Pixels duplicated outward around each bitmap
    #[arg(long, default_value_t = 0, help_heading = "Image Processing")]
    extrude: u32,

    // Layout
    /// Max atlas size (64, 128, 256, 512, 1024, 2048 or 4096)
    #[arg(short = 's', long, default_value_t = 4096, value_parser = parse_page_size, help_heading = "Layout")]
    size: u32,
    /// Padding between images (0 to 16)
    #[arg(long = "pad", default_value_t = 1, help_heading = "Layout")]
    padding: u32,

    // Logging/UX
    /// Ignore the stored hash and always repack
    #[arg(short = 'f', long, help_heading = "Logging/UX")]
    force: bool,
    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(short, long, default_value_t = false, help_heading = "Logging/UX")]
    quiet: bool,
    /// Hide the loading progress bar
    #[arg(long, default_value_t = false, help_heading = "Logging/UX")]
    no_progress: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);

    let cfg = build_config(&cli)?;
    if cli.print_config {
        match cli.print_config_format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&cfg)?),
            _ => println!("{}", serde_yaml::to_string(&cfg)?),
        }
        return Ok(());
    }

    let inputs = split_inputs(&cli.inputs);
    anyhow::ensure!(!inputs.is_empty(), "no inputs given");
    let mut request = BuildRequest::new(inputs);
    request.meta = cli.meta.clone();
    request.palettes = cli.palettes.clone();
    request.args = vec![cli.inputs.clone()];
    debug!(?request, ?cfg, "resolved build");

    let crunch = Crunch::new(cfg, &cli.output);
    let show_progress = !cli.no_progress && !cli.quiet;
    let result = if show_progress {
        let bar = BarProgress::new();
        crunch.run_with_progress(&request, &bar)
    } else {
        crunch.run(&request)
    };
    let outcome = result.with_context(|| format!("building atlas {}", cli.output.display()))?;

    match outcome {
        BuildOutcome::Unchanged(_) => {
            if !cli.quiet {
                println!("atlas is unchanged: {}", cli.output.display());
            }
        }
        BuildOutcome::Built(report) => {
            for path in &report.written {
                info!(path = %path.display(), "wrote");
            }
            info!("{}", report.stats.summary());
        }
    }
    Ok(())
}

/// Command-line options first, then the YAML file on top.
fn build_config(cli: &Cli) -> anyhow::Result<CrunchConfig> {
    let mut cfg = CrunchConfig::builder()
        .with_max_dimensions(cli.size, cli.size)
        .padding(cli.padding)
        .extrude(cli.extrude)
        .premultiply(cli.premultiply)
        .trim(cli.trim)
        .dedup(cli.unique)
        .allow_rotation(cli.rotate)
        .force(cli.force)
        .build();
    if cli.defaults {
        cfg = cfg.with_defaults();
    }
    for (on, format) in [
        (cli.xml, ExportFormat::Xml),
        (cli.binary, ExportFormat::Binary),
        (cli.json, ExportFormat::Json),
    ] {
        if on {
            cfg.formats.insert(format);
        }
    }

    if let Some(path) = &cli.config {
        let y = load_yaml(path)?;
        cfg = y.into_crunch_config(cfg)?;
    }
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

fn load_yaml(path: &Path) -> anyhow::Result<YamlConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

fn parse_page_size(s: &str) -> Result<u32, String> {
    let v: u32 = s.parse().map_err(|e| format!("{}", e))?;
    if ALLOWED_PAGE_SIZES.contains(&v) {
        Ok(v)
    } else {
        Err(format!("size must be one of {:?}", ALLOWED_PAGE_SIZES))
    }
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = tracing_level(quiet, verbose);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

fn tracing_level(quiet: bool, verbose: u8) -> String {
    if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    }
}

/// Loading progress shown on stderr.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::hidden();
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} {prefix} {pos}/{len} [{elapsed_precise}] {wide_msg}",
        ) {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl Progress for BarProgress {
    fn start(&self, stage: &str, total: usize) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_prefix(stage.to_string());
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn advance(&self, item: &str) {
        self.bar.set_message(item.to_string());
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct YamlConfig {
    max_width: Option<u32>,
    max_height: Option<u32>,
    padding: Option<u32>,
    extrude: Option<u32>,
    premultiply: Option<bool>,
    trim: Option<bool>,
    dedup: Option<bool>,
    allow_rotation: Option<bool>,
    formats: Option<Vec<String>>,
}

impl YamlConfig {
    fn into_crunch_config(self, mut cfg: CrunchConfig) -> anyhow::Result<CrunchConfig> {
        if let Some(v) = self.max_width {
            cfg.max_width = v;
        }
        if let Some(v) = self.max_height {
            cfg.max_height = v;
        }
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.extrude {
            cfg.extrude = v;
        }
        if let Some(v) = self.premultiply {
            cfg.premultiply = v;
        }
        if let Some(v) = self.trim {
            cfg.trim = v;
        }
        if let Some(v) = self.dedup {
            cfg.dedup = v;
        }
        if let Some(v) = self.allow_rotation {
            cfg.allow_rotation = v;
        }
        if let Some(list) = self.formats {
            cfg.formats = Default::default();
            for name in list {
                let f: ExportFormat = name
                    .parse()
                    .map_err(|_| anyhow::anyhow!("unknown export format: {}", name))?;
                cfg.formats.insert(f);
            }
        }
        Ok(cfg)
    }
}
