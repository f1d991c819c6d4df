use crate::bitmap::Bitmap;
use crate::config::CrunchConfig;
use crate::model::AtlasPage;
use serde::Serialize;
use serde_json::{json, Value};

/// Export view of a finished atlas, shared by the JSON, XML and binary writers.
///
/// Field presence is decided once per run: `frame` exists on every image iff trim
/// was enabled, `rotated` iff rotation was enabled.
#[derive(Debug, Clone, Serialize)]
pub struct Atlas {
    #[serde(rename = "textures")]
    pub pages: Vec<PageLayout>,
    #[serde(skip)]
    pub trim: bool,
    #[serde(skip)]
    pub rotate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageLayout {
    #[serde(skip)]
    pub index: usize,
    /// `<prefix><index>`, also the page image file stem.
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub images: Vec<ImageLayout>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageLayout {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotated: Option<bool>,
}

/// Offset and size of the untrimmed canvas.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct FrameLayout {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Atlas {
    /// Builds the export view. Every placement becomes one image entry, so names
    /// merged by dedup all appear, sharing the same geometry.
    pub fn new(prefix: &str, pages: &[AtlasPage], records: &[Bitmap], cfg: &CrunchConfig) -> Self {
        let pages = pages
            .iter()
            .map(|page| {
                let images = page
                    .placements
                    .iter()
                    .map(|p| {
                        let r = &records[p.record];
                        ImageLayout {
                            name: r.name.clone(),
                            x: p.x,
                            y: p.y,
                            width: p.width,
                            height: p.height,
                            frame: cfg.trim.then(|| FrameLayout {
                                x: r.frame_x(),
                                y: r.frame_y(),
                                width: r.frame_width(),
                                height: r.frame_height(),
                            }),
                            rotated: cfg.allow_rotation.then_some(p.rotated),
                        }
                    })
                    .collect();
                PageLayout {
                    index: page.index,
                    name: page_name(prefix, page.index),
                    width: page.width,
                    height: page.height,
                    images,
                }
            })
            .collect();
        Self {
            pages,
            trim: cfg.trim,
            rotate: cfg.allow_rotation,
        }
    }

    /// Looks an image up by name across all pages.
    pub fn find(&self, name: &str) -> Option<(&PageLayout, &ImageLayout)> {
        self.pages
            .iter()
            .find_map(|p| p.images.iter().find(|i| i.name == name).map(|i| (p, i)))
    }
}

/// Page name (and image file stem) for page `index`.
pub fn page_name(prefix: &str, index: usize) -> String {
    format!("{}{}", prefix, index)
}

/// Serialize the atlas as `{ "textures": [ { name, width, height, images: [...] } ] }`.
pub fn to_json(atlas: &Atlas) -> Value {
    json!({ "textures": &atlas.pages })
}
