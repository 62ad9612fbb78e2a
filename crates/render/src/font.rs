//! Caption fonts.
//!
//! Compositing only needs per-glyph advances and coverage bitmaps, so fonts
//! sit behind [`CaptionFont`]. Production fonts are TrueType files loaded
//! with `fontdue`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::RenderError;

/// Caption font size in pixels.
pub const FONT_SIZE: f32 = 24.0;

const SYSTEM_REGULAR: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const SYSTEM_BOLD: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// A rasterized glyph. Offsets follow the usual baseline convention:
/// `xmin` from the pen position, `ymin` from the baseline to the bitmap's
/// bottom edge, positive upwards.
#[derive(Debug, Clone, Default)]
pub struct Glyph {
    pub xmin: i32,
    pub ymin: i32,
    pub width: usize,
    pub height: usize,
    pub advance: f32,
    /// Row-major coverage, `width * height` bytes.
    pub coverage: Vec<u8>,
}

pub trait CaptionFont: Send + Sync {
    /// Horizontal advance of `c` in pixels.
    fn advance(&self, c: char) -> f32;

    fn rasterize(&self, c: char) -> Glyph;

    /// Distance from a line's top to its baseline.
    fn ascent(&self) -> f32;
}

pub struct FontdueFont {
    font: fontdue::Font,
    px: f32,
}

impl FontdueFont {
    pub fn from_bytes(bytes: &[u8], px: f32) -> Result<Self, RenderError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self { font, px })
    }

    pub fn from_path(path: &Path, px: f32) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&bytes, px)
    }
}

impl CaptionFont for FontdueFont {
    fn advance(&self, c: char) -> f32 {
        self.font.metrics(c, self.px).advance_width
    }

    fn rasterize(&self, c: char) -> Glyph {
        let (metrics, coverage) = self.font.rasterize(c, self.px);
        Glyph {
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            width: metrics.width,
            height: metrics.height,
            advance: metrics.advance_width,
            coverage,
        }
    }

    fn ascent(&self) -> f32 {
        self.font
            .horizontal_line_metrics(self.px)
            .map_or(self.px, |m| m.ascent)
    }
}

/// Regular face for portrait captions, bold face for the landscape band.
#[derive(Clone)]
pub struct FontSet {
    pub regular: Arc<dyn CaptionFont>,
    pub bold: Arc<dyn CaptionFont>,
}

impl FontSet {
    pub fn new(regular: Arc<dyn CaptionFont>, bold: Arc<dyn CaptionFont>) -> Self {
        Self { regular, bold }
    }

    /// Load the configured paths, falling back to common system fonts.
    /// A missing bold face reuses the regular one. `None` when no regular
    /// face can be loaded.
    pub fn discover(regular: Option<&Path>, bold: Option<&Path>) -> Option<Self> {
        let regular = load_first(regular, SYSTEM_REGULAR)?;
        let bold = load_first(bold, SYSTEM_BOLD).unwrap_or_else(|| regular.clone());
        Some(Self { regular, bold })
    }
}

fn load_first(configured: Option<&Path>, system: &[&str]) -> Option<Arc<dyn CaptionFont>> {
    let candidates = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(system.iter().map(PathBuf::from));

    for path in candidates {
        if !path.exists() {
            continue;
        }
        match FontdueFont::from_path(&path, FONT_SIZE) {
            Ok(font) => {
                info!(path = %path.display(), "loaded caption font");
                return Some(Arc::new(font));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unusable font"),
        }
    }
    None
}
