// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Composition module — maps a photo onto the fixed postcard canvas under an
// interchangeable layout strategy and stamps the code on it.

pub mod fullbleed;
pub mod glyphs;
pub mod label;
pub mod square;

use std::sync::Arc;

use image::RgbImage;
use postwerk_core::error::PostwerkError;
use postwerk_core::{AppConfig, CANVAS_HEIGHT, CANVAS_WIDTH, Code, Layout};
use tracing::{info, instrument};

use crate::image::processor::ImageProcessor;

pub use fullbleed::FullBleedLayout;
pub use label::{LabelBox, LabelFont, LabelStyle};
pub use square::{SquareLayout, SquarePlacement};

/// Pixel dimensions of the print canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// 7 x 5.5 in at 300 dpi.
    pub const POSTCARD: Self = Self {
        width: CANVAS_WIDTH,
        height: CANVAS_HEIGHT,
    };
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::POSTCARD
    }
}

/// One way of laying a photo out on the canvas.
///
/// `source` is already upright and RGB. Implementations must return an image
/// of exactly the canvas size.
pub trait LayoutStrategy: Send + Sync {
    fn layout(&self) -> Layout;

    fn canvas(&self) -> CanvasSize;

    fn compose(&self, source: &RgbImage, code: &Code) -> RgbImage;
}

/// Decodes captures and runs the configured layout strategy.
pub struct Composer {
    strategy: Box<dyn LayoutStrategy>,
}

impl Composer {
    pub fn new(strategy: Box<dyn LayoutStrategy>) -> Self {
        Self { strategy }
    }

    /// Build the composer for the deployment's layout, loading the label font
    /// once.
    pub fn from_config(config: &AppConfig) -> Result<Self, PostwerkError> {
        let font = Arc::new(LabelFont::discover(config.font_path.as_deref()));
        let strategy: Box<dyn LayoutStrategy> = match config.layout {
            Layout::FullBleed => Box::new(FullBleedLayout::new(CanvasSize::POSTCARD, font)),
            Layout::Square => Box::new(SquareLayout::new(
                CanvasSize::POSTCARD,
                config.square.margin_x,
                config.square.margin_y,
                config.square.anchor,
                font,
            )?),
        };
        info!(layout = ?strategy.layout(), "composer ready");
        Ok(Self::new(strategy))
    }

    pub fn layout(&self) -> Layout {
        self.strategy.layout()
    }

    /// Decode `data`, normalise orientation and colour, and compose it.
    #[instrument(skip(self, data), fields(code = %code, data_len = data.len()))]
    pub fn compose_bytes(&self, data: &[u8], code: &Code) -> Result<RgbImage, PostwerkError> {
        let source = ImageProcessor::from_bytes(data)?.into_rgb8();
        if source.width() == 0 || source.height() == 0 {
            return Err(PostwerkError::ImageError("image has no pixels".into()));
        }
        self.compose(&source, code)
    }

    /// Compose an already-decoded upright RGB image. A result that does not
    /// match the strategy's canvas is rejected rather than printed.
    pub fn compose(&self, source: &RgbImage, code: &Code) -> Result<RgbImage, PostwerkError> {
        let expected = self.strategy.canvas();
        let canvas = self.strategy.compose(source, code);
        if canvas.dimensions() != (expected.width, expected.height) {
            return Err(PostwerkError::ImageError(format!(
                "{:?} layout produced {}x{}, expected {}x{}",
                self.strategy.layout(),
                canvas.width(),
                canvas.height(),
                expected.width,
                expected.height
            )));
        }
        Ok(canvas)
    }
}
