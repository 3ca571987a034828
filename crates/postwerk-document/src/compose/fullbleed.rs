// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Full-bleed layout — the photo covers the whole canvas.

use std::sync::Arc;

use image::RgbImage;
use postwerk_core::{Code, Layout};
use tracing::instrument;

use super::label::{self, LabelFont, LabelStyle};
use super::{CanvasSize, LayoutStrategy};
use crate::image::processor::ImageProcessor;

/// Cover-scale the photo, centre-crop it to the canvas and stamp the code
/// with the large label.
pub struct FullBleedLayout {
    canvas: CanvasSize,
    font: Arc<LabelFont>,
    style: LabelStyle,
}

impl FullBleedLayout {
    pub fn new(canvas: CanvasSize, font: Arc<LabelFont>) -> Self {
        Self {
            canvas,
            font,
            style: LabelStyle::FULL_BLEED,
        }
    }
}

impl LayoutStrategy for FullBleedLayout {
    fn layout(&self) -> Layout {
        Layout::FullBleed
    }

    fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    #[instrument(skip_all, fields(code = %code, src_w = source.width(), src_h = source.height()))]
    fn compose(&self, source: &RgbImage, code: &Code) -> RgbImage {
        let mut canvas = ImageProcessor::from_rgb(source.clone())
            .cover(self.canvas.width, self.canvas.height)
            .into_rgb8();
        label::stamp(&mut canvas, code.as_str(), &self.font, &self.style);
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn layout(canvas: CanvasSize) -> FullBleedLayout {
        FullBleedLayout::new(canvas, Arc::new(LabelFont::Bitmap))
    }

    #[test]
    fn photo_reaches_every_edge() {
        // Solid red source: no white border may survive anywhere outside the
        // label box.
        let source = RgbImage::from_pixel(400, 300, Rgb([200, 0, 0]));
        let code = Code::parse("0badf00d").unwrap();
        let canvas = layout(CanvasSize::POSTCARD).compose(&source, &code);
        assert_eq!(canvas.dimensions(), (2100, 1650));
        for (x, y) in [(0, 0), (2099, 0), (0, 1649), (1000, 825), (2099, 800)] {
            let p = canvas.get_pixel(x, y).0;
            assert!(p[0] > 180 && p[1] < 30 && p[2] < 30, "pixel ({x},{y}) = {p:?}");
        }
    }

    #[test]
    fn crop_is_centred() {
        // Left half blue, right half green, on a source wider than the canvas
        // aspect; equal cropping keeps the seam at the canvas centre.
        let canvas_size = CanvasSize {
            width: 210,
            height: 165,
        };
        let source = RgbImage::from_fn(400, 300, |x, _| {
            if x < 200 { Rgb([0, 0, 255]) } else { Rgb([0, 255, 0]) }
        });
        let code = Code::parse("00000000").unwrap();
        let canvas = layout(canvas_size).compose(&source, &code);
        assert_eq!(canvas.dimensions(), (210, 165));
        assert!(canvas.get_pixel(100, 20).0[2] > 200);
        assert!(canvas.get_pixel(110, 20).0[1] > 200);
    }
}
