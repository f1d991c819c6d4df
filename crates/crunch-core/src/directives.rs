//! Sprite metadata preprocessing.
//!
//! A metadata file tags textures with directives: slice a flipbook sheet into grid
//! frames, derive a mask or outline sprite, or generate palette-swapped variants.
//! [`expand`] turns decoded sheets plus these directives into the flat record list
//! the packer consumes; the packer never sees where a record came from.
//!
//! Sprite metadata JSON:
//!
//! ```json
//! { "sprites": [ { "name": "chars/hero", "frame_width": 16, "frame_height": 16,
//!                  "mask": true, "outline": false, "palettes": true } ] }
//! ```
//!
//! Palette JSON:
//!
//! ```json
//! { "groups": [ { "name": "hero", "textures": ["chars/hero"],
//!                 "default": ["#FF0000", "0x00FF00"],
//!                 "variants": { "blue": [255, "#FFFF00"] } } ] }
//! ```

use crate::bitmap::{Bitmap, LoadOptions};
use crate::error::{CrunchError, Result};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// Parsed sprite metadata file with a name → directive lookup built once at load.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawSpriteMeta")]
pub struct SpriteMeta {
    sprites: Vec<SpriteDirective>,
    by_name: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct RawSpriteMeta {
    #[serde(default)]
    sprites: Vec<SpriteDirective>,
}

impl From<RawSpriteMeta> for SpriteMeta {
    fn from(raw: RawSpriteMeta) -> Self {
        Self::new(raw.sprites)
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CrunchError::Input {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Per-texture directive. Textures without one pass through untouched.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SpriteDirective {
    pub name: String,
    /// Flipbook frame size; both zero means "not a flipbook".
    #[serde(default)]
    pub frame_width: u32,
    #[serde(default)]
    pub frame_height: u32,
    #[serde(default)]
    pub mask: bool,
    #[serde(default)]
    pub outline: bool,
    /// Generate one variant per palette of the texture's palette group.
    #[serde(default)]
    pub palettes: bool,
}

impl SpriteMeta {
    /// Indexes `sprites` by name. The first directive for a name wins.
    pub fn new(sprites: Vec<SpriteDirective>) -> Self {
        let mut by_name = HashMap::with_capacity(sprites.len());
        for (i, d) in sprites.iter().enumerate() {
            by_name.entry(d.name.clone()).or_insert(i);
        }
        Self { sprites, by_name }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = read_text(path)?;
        serde_json::from_str(&text).map_err(|source| CrunchError::Metadata {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn directive(&self, name: &str) -> Option<&SpriteDirective> {
        self.by_name.get(name).and_then(|&i| self.sprites.get(i))
    }

    pub fn sprites(&self) -> &[SpriteDirective] {
        &self.sprites
    }
}

impl SpriteDirective {
    /// Frame grid `(columns, rows)` for a `width x height` sheet, or `None` when
    /// the directive does not slice the sheet.
    pub fn frame_grid(&self, width: u32, height: u32) -> Result<Option<(u32, u32)>> {
        match (self.frame_width, self.frame_height) {
            (0, 0) => Ok(None),
            (0, _) | (_, 0) => Err(CrunchError::Directive(format!(
                "'{}': frame_width and frame_height must both be set or both be zero (got {}x{})",
                self.name, self.frame_width, self.frame_height
            ))),
            (fw, fh) if width % fw != 0 || height % fh != 0 => {
                Err(CrunchError::Directive(format!(
                    "'{}': frame size {}x{} does not evenly divide the {}x{} sheet",
                    self.name, fw, fh, width, height
                )))
            }
            (fw, fh) => Ok(Some((width / fw, height / fh))),
        }
    }
}

/// One palette group: the textures it applies to, their default palette and the
/// named replacement palettes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteGroup {
    pub name: String,
    pub textures: Vec<String>,
    /// `0xRRGGBB` entries.
    pub default: Vec<u32>,
    pub variants: BTreeMap<String, Vec<u32>>,
}

/// All palette groups plus a texture → group lookup built once at load.
#[derive(Debug, Clone, Default)]
pub struct PaletteBook {
    groups: Vec<PaletteGroup>,
    by_texture: HashMap<String, usize>,
}

impl PaletteBook {
    pub fn load(path: &Path) -> Result<Self> {
        let text = read_text(path)?;
        let raw: RawPaletteBook =
            serde_json::from_str(&text).map_err(|source| CrunchError::Metadata {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_groups(raw.groups)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawPaletteBook = serde_json::from_str(json).map_err(|source| {
            CrunchError::Metadata {
                path: "<palettes>".into(),
                source,
            }
        })?;
        Self::from_groups(raw.groups)
    }

    /// Validates palette lengths and indexes textures. A texture listed by two
    /// groups is rejected.
    pub fn from_groups(groups: Vec<PaletteGroup>) -> Result<Self> {
        let mut by_texture = HashMap::new();
        for (gi, g) in groups.iter().enumerate() {
            for (variant, colors) in &g.variants {
                if colors.len() != g.default.len() {
                    return Err(CrunchError::Directive(format!(
                        "palette group '{}': variant '{}' has {} colors, default has {}",
                        g.name,
                        variant,
                        colors.len(),
                        g.default.len()
                    )));
                }
            }
            for tex in &g.textures {
                if let Some(prev) = by_texture.insert(tex.clone(), gi) {
                    return Err(CrunchError::Directive(format!(
                        "texture '{}' is listed by palette groups '{}' and '{}'",
                        tex, groups[prev].name, g.name
                    )));
                }
            }
        }
        Ok(Self { groups, by_texture })
    }

    pub fn group_for(&self, texture: &str) -> Option<&PaletteGroup> {
        self.by_texture.get(texture).map(|&i| &self.groups[i])
    }

    pub fn groups(&self) -> &[PaletteGroup] {
        &self.groups
    }
}

#[derive(Deserialize)]
struct RawPaletteBook {
    #[serde(default)]
    groups: Vec<PaletteGroup>,
}

impl<'de> Deserialize<'de> for PaletteGroup {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RawGroup {
            name: String,
            #[serde(default)]
            textures: Vec<String>,
            default: Vec<RawColor>,
            #[serde(default)]
            variants: BTreeMap<String, Vec<RawColor>>,
        }

        let raw = RawGroup::deserialize(d)?;
        let convert = |colors: Vec<RawColor>| -> std::result::Result<Vec<u32>, D::Error> {
            colors
                .into_iter()
                .map(|c| c.to_rgb().map_err(serde::de::Error::custom))
                .collect()
        };
        let default = convert(raw.default)?;
        let variants = raw
            .variants
            .into_iter()
            .map(|(k, v)| convert(v).map(|v| (k, v)))
            .collect::<std::result::Result<_, _>>()?;
        Ok(PaletteGroup {
            name: raw.name,
            textures: raw.textures,
            default,
            variants,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColor {
    Int(u32),
    Text(String),
}

impl RawColor {
    fn to_rgb(&self) -> std::result::Result<u32, String> {
        let v = match self {
            RawColor::Int(v) => *v,
            RawColor::Text(s) => parse_color(s)?,
        };
        if v > 0x00FF_FFFF {
            return Err(format!("color 0x{:X} is wider than 24 bits", v));
        }
        Ok(v)
    }
}

/// Parses `0xRRGGBB` or `#RRGGBB`.
pub fn parse_color(s: &str) -> std::result::Result<u32, String> {
    let t = s.trim();
    let hex = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .or_else(|| t.strip_prefix('#'))
        .ok_or_else(|| format!("color '{}' must start with 0x or #", s))?;
    if hex.len() != 6 {
        return Err(format!("color '{}' must have six hex digits", s));
    }
    u32::from_str_radix(hex, 16).map_err(|e| format!("color '{}': {}", s, e))
}

/// Applies directives to decoded sheets and returns the flat record list.
///
/// `sheets` must hold raw pixels (no premultiply, no trim). Derived sprites are
/// computed from raw frames; `opts` is applied to every emitted record last.
/// Output order: each sheet's frames in row-major order, and after each frame its
/// mask, outline and palette variants (variants in name order).
pub fn expand(
    sheets: &[Bitmap],
    meta: Option<&SpriteMeta>,
    palettes: Option<&PaletteBook>,
    opts: LoadOptions,
) -> Result<Vec<Bitmap>> {
    let mut out = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let Some(directive) = meta.and_then(|m| m.directive(&sheet.name)) else {
            out.push(finish(sheet, sheet.name.clone(), opts)?);
            continue;
        };

        let group = if directive.palettes {
            let group = palettes.and_then(|p| p.group_for(&sheet.name)).ok_or_else(|| {
                CrunchError::Directive(format!(
                    "'{}' asks for palette variants but no palette group lists it",
                    sheet.name
                ))
            })?;
            Some(group)
        } else {
            None
        };

        let frames = match directive.frame_grid(sheet.width(), sheet.height())? {
            None => vec![sheet.clone()],
            Some((cols, rows)) => {
                debug!(name = %sheet.name, cols, rows, "slicing flipbook");
                let (fw, fh) = (directive.frame_width, directive.frame_height);
                let mut frames = Vec::with_capacity((cols * rows) as usize);
                for i in 0..cols * rows {
                    let (cx, cy) = (i % cols, i / cols);
                    frames.push(Bitmap::extract(
                        sheet,
                        cx * fw,
                        cy * fh,
                        fw,
                        fh,
                        format!("{}/{}", sheet.name, i),
                        LoadOptions::raw(),
                    )?);
                }
                frames
            }
        };

        for frame in &frames {
            out.push(finish(frame, frame.name.clone(), opts)?);
            if directive.mask {
                let mut m = frame.clone();
                m.mask(format!("{}_mask", frame.name));
                out.push(finish(&m, m.name.clone(), opts)?);
            }
            if directive.outline {
                let mut o = frame.clone();
                o.outline(format!("{}_outline", frame.name));
                out.push(finish(&o, o.name.clone(), opts)?);
            }
            if let Some(group) = group {
                for (variant, colors) in &group.variants {
                    let mut v = frame.clone();
                    v.swap_palette(format!("{}_{}", frame.name, variant), &group.default, colors)?;
                    out.push(finish(&v, v.name.clone(), opts)?);
                }
            }
        }
    }
    Ok(out)
}

/// Re-emits a raw record with the run's post-process policy applied.
fn finish(raw: &Bitmap, name: String, opts: LoadOptions) -> Result<Bitmap> {
    Bitmap::extract(raw, 0, 0, raw.width(), raw.height(), name, opts)
}
