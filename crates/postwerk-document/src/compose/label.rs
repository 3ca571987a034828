// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Code label — stamps the postcard code bottom-right on a light, semi-opaque
// box so it stays legible on any photo.

use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage, imageops};
use imageproc::drawing::{draw_text_mut, text_size};
use postwerk_core::error::PostwerkError;
use tracing::{debug, info, warn};

use super::glyphs;

/// Bold sans fonts commonly present on Linux, macOS and Windows hosts.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans-Bold.ttf",
    "/usr/local/share/fonts/DejaVuSans-Bold.ttf",
    "/Library/Fonts/DejaVuSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    r"C:\Windows\Fonts\DejaVuSans-Bold.ttf",
    r"C:\Windows\Fonts\arialbd.ttf",
];

const TEXT_COLOR: Rgb<u8> = Rgb([20, 20, 20]);

/// Font used for the code label.
pub enum LabelFont {
    /// A TrueType/OpenType font rendered through `imageproc`.
    Outline { font: FontVec, source: PathBuf },
    /// Built-in bitmap glyphs; always available.
    Bitmap,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline { source, .. } => f.debug_tuple("Outline").field(source).finish(),
            Self::Bitmap => f.write_str("Bitmap"),
        }
    }
}

impl LabelFont {
    /// Load the configured font, else the first system font found, else the
    /// built-in glyphs. Never fails.
    pub fn discover(configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            match Self::from_file(path) {
                Ok(font) => return font,
                Err(err) => warn!(error = %err, "configured label font unusable"),
            }
        }
        for candidate in SYSTEM_FONTS {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            match Self::from_file(path) {
                Ok(font) => return font,
                Err(err) => debug!(error = %err, "skipping system font"),
            }
        }
        warn!("no TrueType font found, using built-in label glyphs");
        Self::Bitmap
    }

    /// Load a TrueType/OpenType font file.
    pub fn from_file(path: &Path) -> Result<Self, PostwerkError> {
        let data = std::fs::read(path)
            .map_err(|err| PostwerkError::Font(format!("{}: {}", path.display(), err)))?;
        let font = FontVec::try_from_vec(data)
            .map_err(|err| PostwerkError::Font(format!("{}: {}", path.display(), err)))?;
        info!(path = %path.display(), "label font loaded");
        Ok(Self::Outline {
            font,
            source: path.to_path_buf(),
        })
    }

    /// Rendered size of `text` at `px` pixels as `(width, height)`.
    pub fn measure(&self, text: &str, px: f32) -> (u32, u32) {
        match self {
            Self::Outline { font, .. } => text_size(px, font, text),
            Self::Bitmap => glyphs::measure(text, px),
        }
    }

    fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, px: f32, text: &str) {
        match self {
            Self::Outline { font, .. } => draw_text_mut(canvas, TEXT_COLOR, x, y, px, font, text),
            Self::Bitmap => glyphs::draw(canvas, TEXT_COLOR, x, y, px, text),
        }
    }
}

/// Size and look of the label box for one layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    /// Glyph height in pixels.
    pub font_px: f32,
    /// Horizontal space between text and box edge.
    pub padding: u32,
    /// Distance from the box to the right and bottom canvas edges.
    pub inset: u32,
    /// Minimum box height.
    pub box_height: u32,
    /// Box opacity over the photo (255 = solid white).
    pub opacity: u8,
}

impl LabelStyle {
    /// Large label for the full-bleed layout.
    pub const FULL_BLEED: Self = Self {
        font_px: 72.0,
        padding: 30,
        inset: 30,
        box_height: 100,
        opacity: 230,
    };

    /// Smaller label sitting in the square layout's margin.
    pub const SQUARE: Self = Self {
        font_px: 46.0,
        padding: 24,
        inset: 30,
        box_height: 62,
        opacity: 210,
    };
}

/// Where the label box landed on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Stamp `text` bottom-right on `canvas`. The box is clamped to the canvas so
/// nothing is drawn outside it.
pub fn stamp(canvas: &mut RgbImage, text: &str, font: &LabelFont, style: &LabelStyle) -> LabelBox {
    let (cw, ch) = canvas.dimensions();
    let (tw, th) = font.measure(text, style.font_px);

    let right = cw.saturating_sub(style.inset);
    let bottom = ch.saturating_sub(style.inset);
    let width = (tw + 2 * style.padding).min(right);
    let height = style.box_height.max(th + style.padding).min(bottom);
    let label = LabelBox {
        x: right - width,
        y: bottom - height,
        width,
        height,
    };

    blend_white(canvas, &label, style.opacity);

    let text_x = label.x + width.saturating_sub(tw) / 2;
    let text_y = label.y + height.saturating_sub(th) / 2;
    font.draw(canvas, text_x as i32, text_y as i32, style.font_px, text);

    debug!(?label, text_w = tw, text_h = th, "code label stamped");
    label
}

/// Lay a white sheet of the given opacity over `area`.
fn blend_white(canvas: &mut RgbImage, area: &LabelBox, opacity: u8) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let under = imageops::crop_imm(canvas, area.x, area.y, area.width, area.height).to_image();
    let mut patch = DynamicImage::ImageRgb8(under).into_rgba8();
    let sheet = RgbaImage::from_pixel(area.width, area.height, Rgba([255, 255, 255, opacity]));
    imageops::overlay(&mut patch, &sheet, 0, 0);
    let patch = DynamicImage::ImageRgba8(patch).into_rgb8();
    imageops::replace(canvas, &patch, i64::from(area.x), i64::from(area.y));
}
