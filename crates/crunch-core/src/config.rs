use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Page sizes accepted for `max_width` / `max_height`.
pub const ALLOWED_PAGE_SIZES: [u32; 7] = [64, 128, 256, 512, 1024, 2048, 4096];

/// Largest accepted padding between placements.
pub const MAX_PADDING: u32 = 16;

/// Metadata formats written next to the page images.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xml,
    Binary,
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [Self::Xml, Self::Binary, Self::Json];

    /// File extension (without dot) used for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Binary => "bin",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" | "x" => Ok(Self::Xml),
            "bin" | "binary" | "b" => Ok(Self::Binary),
            "json" | "j" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// Set of requested metadata formats.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportFormats {
    #[serde(default)]
    pub xml: bool,
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub json: bool,
}

impl ExportFormats {
    pub fn contains(&self, format: ExportFormat) -> bool {
        match format {
            ExportFormat::Xml => self.xml,
            ExportFormat::Binary => self.binary,
            ExportFormat::Json => self.json,
        }
    }

    pub fn insert(&mut self, format: ExportFormat) {
        match format {
            ExportFormat::Xml => self.xml = true,
            ExportFormat::Binary => self.binary = true,
            ExportFormat::Json => self.json = true,
        }
    }

    /// Requested formats in a fixed order (xml, binary, json).
    pub fn iter(&self) -> impl Iterator<Item = ExportFormat> + '_ {
        ExportFormat::ALL
            .into_iter()
            .filter(|f| self.contains(*f))
    }
}

/// Immutable configuration for one atlas build.
///
/// One value is created up front and passed by reference to every stage; nothing
/// reads global option state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrunchConfig {
    /// Maximum page width in pixels.
    pub max_width: u32,
    /// Maximum page height in pixels.
    pub max_height: u32,
    /// Pixels reserved between placements.
    pub padding: u32,
    /// Edge pixels duplicated outward around each image (filtering bleed guard).
    #[serde(default)]
    pub extrude: u32,

    /// Scale color channels by alpha at load time.
    pub premultiply: bool,
    /// Crop transparent borders and record the frame offset.
    pub trim: bool,
    /// Collapse byte-identical images into one placement.
    pub dedup: bool,
    /// Allow 90° clockwise rotation when it fits better.
    pub allow_rotation: bool,

    /// Metadata formats to write.
    #[serde(default)]
    pub formats: ExportFormats,
    /// Ignore the stored fingerprint and always rebuild.
    #[serde(default)]
    pub force: bool,
}

impl Default for CrunchConfig {
    fn default() -> Self {
        Self {
            max_width: 4096,
            max_height: 4096,
            padding: 1,
            extrude: 0,
            premultiply: false,
            trim: false,
            dedup: false,
            allow_rotation: false,
            formats: ExportFormats::default(),
            force: false,
        }
    }
}

impl CrunchConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - Dimensions are zero or not one of [`ALLOWED_PAGE_SIZES`]
    /// - Padding exceeds [`MAX_PADDING`]
    /// - Padding plus extrusion would leave no usable page space
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::CrunchError;

        if self.max_width == 0 || self.max_height == 0 {
            return Err(CrunchError::InvalidDimensions {
                width: self.max_width,
                height: self.max_height,
            });
        }
        for dim in [self.max_width, self.max_height] {
            if !ALLOWED_PAGE_SIZES.contains(&dim) {
                return Err(CrunchError::InvalidConfig(format!(
                    "page size {} is not one of {:?}",
                    dim, ALLOWED_PAGE_SIZES
                )));
            }
        }
        if self.padding > MAX_PADDING {
            return Err(CrunchError::InvalidConfig(format!(
                "padding ({}) exceeds maximum of {}",
                self.padding, MAX_PADDING
            )));
        }
        let reserved = self.slot_overhead();
        if reserved >= self.max_width || reserved >= self.max_height {
            return Err(CrunchError::InvalidConfig(format!(
                "padding ({}) + extrude ({}) * 2 leaves no usable space in {}x{}",
                self.padding, self.extrude, self.max_width, self.max_height
            )));
        }
        Ok(())
    }

    /// Extra pixels added to each side length of an image to form its reserved slot.
    pub fn slot_overhead(&self) -> u32 {
        self.padding
            .saturating_add(self.extrude.saturating_mul(2))
    }

    /// Settings of the original `--default` switch: xml output, premultiply, trim, dedup.
    pub fn with_defaults(mut self) -> Self {
        self.formats.xml = true;
        self.premultiply = true;
        self.trim = true;
        self.dedup = true;
        self
    }

    /// Create a fluent builder for `CrunchConfig`.
    pub fn builder() -> CrunchConfigBuilder {
        CrunchConfigBuilder::new()
    }
}

/// Builder for `CrunchConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct CrunchConfigBuilder {
    cfg: CrunchConfig,
}

impl CrunchConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: CrunchConfig::default(),
        }
    }
    pub fn with_max_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.max_width = w;
        self.cfg.max_height = h;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn extrude(mut self, v: u32) -> Self {
        self.cfg.extrude = v;
        self
    }
    pub fn premultiply(mut self, v: bool) -> Self {
        self.cfg.premultiply = v;
        self
    }
    pub fn trim(mut self, v: bool) -> Self {
        self.cfg.trim = v;
        self
    }
    pub fn dedup(mut self, v: bool) -> Self {
        self.cfg.dedup = v;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.cfg.allow_rotation = v;
        self
    }
    pub fn format(mut self, f: ExportFormat) -> Self {
        self.cfg.formats.insert(f);
        self
    }
    pub fn force(mut self, v: bool) -> Self {
        self.cfg.force = v;
        self
    }
    pub fn build(self) -> CrunchConfig {
        self.cfg
    }
}
