// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Square layout — a square crop of the photo centred on a white canvas with a
// thin border.

use std::sync::Arc;

use image::{Rgb, RgbImage, imageops};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use postwerk_core::error::PostwerkError;
use postwerk_core::{Anchor, Code, Layout};
use tracing::{debug, instrument};

use super::label::{self, LabelFont, LabelStyle};
use super::{CanvasSize, LayoutStrategy};
use crate::image::processor::ImageProcessor;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const BORDER: Rgb<u8> = Rgb([230, 230, 230]);
const BORDER_WIDTH: u32 = 6;

/// Destination of the photo square on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquarePlacement {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

/// Largest square fitting inside the margins, centred on the canvas.
/// `None` when the margins leave no room.
pub fn square_placement(canvas: CanvasSize, margin_x: u32, margin_y: u32) -> Option<SquarePlacement> {
    let side = canvas
        .width
        .saturating_sub(margin_x.saturating_mul(2))
        .min(canvas.height.saturating_sub(margin_y.saturating_mul(2)));
    if side == 0 {
        return None;
    }
    Some(SquarePlacement {
        x: (canvas.width - side) / 2,
        y: (canvas.height - side) / 2,
        side,
    })
}

/// Square-crop the photo (biased by `anchor`), scale it into the margin box
/// and stamp the code with the small label.
pub struct SquareLayout {
    canvas: CanvasSize,
    placement: SquarePlacement,
    anchor: Anchor,
    font: Arc<LabelFont>,
    style: LabelStyle,
}

impl SquareLayout {
    pub fn new(
        canvas: CanvasSize,
        margin_x: u32,
        margin_y: u32,
        anchor: Anchor,
        font: Arc<LabelFont>,
    ) -> Result<Self, PostwerkError> {
        let placement = square_placement(canvas, margin_x, margin_y).ok_or_else(|| {
            PostwerkError::Config(format!(
                "square margins {margin_x}x{margin_y} leave no room on a {}x{} canvas",
                canvas.width, canvas.height
            ))
        })?;
        debug!(?placement, ?anchor, "square layout prepared");
        Ok(Self {
            canvas,
            placement,
            anchor,
            font,
            style: LabelStyle::SQUARE,
        })
    }
}

impl LayoutStrategy for SquareLayout {
    fn layout(&self) -> Layout {
        Layout::Square
    }

    fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    #[instrument(skip_all, fields(code = %code, src_w = source.width(), src_h = source.height()))]
    fn compose(&self, source: &RgbImage, code: &Code) -> RgbImage {
        let SquarePlacement { x, y, side } = self.placement;
        let mut canvas = RgbImage::from_pixel(self.canvas.width, self.canvas.height, BACKGROUND);

        let photo = ImageProcessor::from_rgb(source.clone())
            .square_crop(self.anchor)
            .resize_exact(side, side)
            .into_rgb8();
        imageops::replace(&mut canvas, &photo, i64::from(x), i64::from(y));

        draw_border(&mut canvas, self.placement);
        label::stamp(&mut canvas, code.as_str(), &self.font, &self.style);
        canvas
    }
}

/// Outline drawn on the inside edge of the pasted square.
fn draw_border(canvas: &mut RgbImage, placement: SquarePlacement) {
    let SquarePlacement { x, y, side } = placement;
    let w = BORDER_WIDTH.min(side);
    let (x, y) = (x as i32, y as i32);
    let far = side - w;
    draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(side, w), BORDER);
    draw_filled_rect_mut(canvas, Rect::at(x, y + far as i32).of_size(side, w), BORDER);
    draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(w, side), BORDER);
    draw_filled_rect_mut(canvas, Rect::at(x + far as i32, y).of_size(w, side), BORDER);
}
