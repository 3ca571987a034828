// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode with EXIF orientation applied, flatten to RGB,
// cover-resize, square crop, grayscale, long-edge capping and JPEG encoding.
// Operates on in-memory images using the `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use postwerk_core::Anchor;
use postwerk_core::error::PostwerkError;
use tracing::{debug, info, instrument, warn};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// enabling method chaining:
///
/// ```ignore
/// let proof = ImageProcessor::from_bytes(&upload)?
///     .grayscale()
///     .fit_long_edge(1000)
///     .to_jpeg_bytes(60)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, ...) and apply the camera's EXIF
    /// orientation so that later geometry works on upright pixels.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, PostwerkError> {
        let mut decoder = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|err| PostwerkError::ImageError(format!("failed to sniff format: {}", err)))?
            .into_decoder()
            .map_err(|err| PostwerkError::ImageError(format!("failed to decode image: {}", err)))?;

        let orientation = decoder.orientation().unwrap_or_else(|err| {
            warn!(error = %err, "unreadable orientation metadata, assuming upright");
            Orientation::NoTransforms
        });

        let mut image = DynamicImage::from_decoder(decoder)
            .map_err(|err| PostwerkError::ImageError(format!("failed to decode image: {}", err)))?;
        image.apply_orientation(orientation);

        debug!(
            width = image.width(),
            height = image.height(),
            ?orientation,
            "Image decoded from bytes"
        );
        Ok(Self { image })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Wrap an RGB canvas.
    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            image: DynamicImage::ImageRgb8(image),
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and flatten to three-channel RGB (alpha dropped).
    pub fn into_rgb8(self) -> RgbImage {
        match self.image {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        }
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Uniformly scale so the image covers `width` x `height`, then crop the
    /// centre to exactly that size.
    #[instrument(skip(self))]
    pub fn cover(self, width: u32, height: u32) -> Self {
        let geometry = cover_geometry(self.width(), self.height(), width, height);
        info!(
            from_w = self.width(),
            from_h = self.height(),
            scaled_w = geometry.scaled_width,
            scaled_h = geometry.scaled_height,
            crop_x = geometry.crop_x,
            crop_y = geometry.crop_y,
            "Cover-scaling image"
        );
        let scaled = self.image.resize_exact(
            geometry.scaled_width,
            geometry.scaled_height,
            FilterType::Lanczos3,
        );
        Self {
            image: scaled.crop_imm(geometry.crop_x, geometry.crop_y, width, height),
        }
    }

    /// Take the largest square from the image, centred horizontally and
    /// positioned vertically by `anchor`.
    #[instrument(skip(self))]
    pub fn square_crop(self, anchor: Anchor) -> Self {
        let (left, top, side) = square_region(self.width(), self.height(), anchor);
        debug!(left, top, side, "Square crop");
        Self {
            image: self.image.crop_imm(left, top, side, side),
        }
    }

    /// Resize the image to exactly `width` x `height`, ignoring aspect ratio.
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        let resized = self.image.resize_exact(width, height, FilterType::Lanczos3);
        Self { image: resized }
    }

    /// Shrink so the longer edge is at most `max_edge`, preserving aspect
    /// ratio. Smaller images are left untouched.
    #[instrument(skip(self))]
    pub fn fit_long_edge(self, max_edge: u32) -> Self {
        if self.width().max(self.height()) <= max_edge {
            return self;
        }
        let resized = self.image.resize(max_edge, max_edge, FilterType::Lanczos3);
        debug!(
            new_w = resized.width(),
            new_h = resized.height(),
            "Long edge capped"
        );
        Self { image: resized }
    }

    /// Convert the image to grayscale (luma).
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        info!("Converting to grayscale");
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode as baseline JPEG with the given quality (1-100).
    ///
    /// Grayscale images are written as single-channel JPEG; everything else is
    /// flattened to RGB and written with 4:2:0 chroma subsampling.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, PostwerkError> {
        encode_jpeg(&self.image, quality)
    }
}

/// Encode any image as JPEG bytes.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, PostwerkError> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    let result = match image {
        DynamicImage::ImageLuma8(gray) => gray.write_with_encoder(encoder),
        other => other.to_rgb8().write_with_encoder(encoder),
    };
    result.map_err(|err| PostwerkError::ImageError(format!("JPEG encoding failed: {}", err)))?;
    Ok(buffer)
}

// -- Geometry -----------------------------------------------------------------

/// Outcome of cover scaling a source onto a target rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverGeometry {
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Pixels cropped from the left of the scaled image.
    pub crop_x: u32,
    /// Pixels cropped from the top of the scaled image.
    pub crop_y: u32,
}

/// Compute cover scaling with `scale = max(tw/w, th/h)`.
///
/// Integer arithmetic keeps the binding dimension exactly equal to the target
/// and the other one at least as large, so the crop always fits.
pub fn cover_geometry(width: u32, height: u32, target_w: u32, target_h: u32) -> CoverGeometry {
    let (w, h) = (u64::from(width.max(1)), u64::from(height.max(1)));
    let (tw, th) = (u64::from(target_w), u64::from(target_h));

    // tw/w >= th/h  <=>  tw*h >= th*w
    let (scaled_w, scaled_h) = if tw * h >= th * w {
        (tw, (h * tw / w).max(th))
    } else {
        ((w * th / h).max(tw), th)
    };

    CoverGeometry {
        scaled_width: scaled_w as u32,
        scaled_height: scaled_h as u32,
        crop_x: ((scaled_w - tw) / 2) as u32,
        crop_y: ((scaled_h - th) / 2) as u32,
    }
}

/// Largest square in a `width` x `height` image as `(left, top, side)`.
pub fn square_region(width: u32, height: u32, anchor: Anchor) -> (u32, u32, u32) {
    let side = width.min(height);
    let left = (width - side) / 2;
    let top = match anchor {
        Anchor::Top => 0,
        Anchor::Center => (height - side) / 2,
        Anchor::Bottom => height - side,
    };
    (left, top, side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, Rgba, RgbaImage};

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    /// Insert an APP1/Exif segment carrying `orientation` right after SOI.
    fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\x00\x2a\x00\x00\x00\x08"); // big-endian, IFD at 8
        tiff.extend_from_slice(&1u16.to_be_bytes()); // one entry
        tiff.extend_from_slice(&0x0112u16.to_be_bytes()); // Orientation
        tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
        tiff.extend_from_slice(&1u32.to_be_bytes()); // count
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_be_bytes()); // no next IFD

        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xff, 0xe1]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn cover_geometry_landscape_source() {
        // 4000x3000 onto 2100x1650: scale 0.55 -> 2200x1650, 50px each side.
        let g = cover_geometry(4000, 3000, 2100, 1650);
        assert_eq!(
            g,
            CoverGeometry {
                scaled_width: 2200,
                scaled_height: 1650,
                crop_x: 50,
                crop_y: 0,
            }
        );
    }

    #[test]
    fn cover_geometry_portrait_source() {
        let g = cover_geometry(1000, 2000, 2100, 1650);
        assert_eq!(g.scaled_width, 2100);
        assert_eq!(g.scaled_height, 4200);
        assert_eq!(g.crop_x, 0);
        assert_eq!(g.crop_y, (4200 - 1650) / 2);
    }

    #[test]
    fn cover_geometry_same_aspect_has_no_crop() {
        let g = cover_geometry(700, 550, 2100, 1650);
        assert_eq!((g.scaled_width, g.scaled_height), (2100, 1650));
        assert_eq!((g.crop_x, g.crop_y), (0, 0));
    }

    #[test]
    fn square_region_anchors() {
        assert_eq!(square_region(300, 500, Anchor::Top), (0, 0, 300));
        assert_eq!(square_region(300, 500, Anchor::Center), (0, 100, 300));
        assert_eq!(square_region(300, 500, Anchor::Bottom), (0, 200, 300));
        // Wider than tall: anchor has no vertical slack.
        assert_eq!(square_region(500, 300, Anchor::Bottom), (100, 0, 300));
    }

    #[test]
    fn cover_produces_exact_target() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([10, 20, 30])));
        let out = ImageProcessor::from_dynamic(img).cover(21, 16);
        assert_eq!((out.width(), out.height()), (21, 16));
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        assert!(matches!(
            ImageProcessor::from_bytes(b"definitely not an image"),
            Err(PostwerkError::ImageError(_))
        ));
    }

    #[test]
    fn from_bytes_applies_exif_rotation() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([200, 10, 10])));
        let jpeg = encode_jpeg(&img, 90).unwrap();
        // Orientation 6: stored sideways, displayed rotated 90 degrees clockwise.
        let rotated = with_exif_orientation(&jpeg, 6);
        let processor = ImageProcessor::from_bytes(&rotated).unwrap();
        assert_eq!((processor.width(), processor.height()), (20, 40));
    }

    #[test]
    fn into_rgb8_flattens_alpha() {
        let rgba = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 0]));
        let bytes = png_bytes(&DynamicImage::ImageRgba8(rgba));
        let rgb = ImageProcessor::from_bytes(&bytes).unwrap().into_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn fit_long_edge_only_shrinks() {
        let big = DynamicImage::ImageRgb8(RgbImage::new(2100, 1650));
        let out = ImageProcessor::from_dynamic(big).fit_long_edge(1000);
        assert_eq!(out.width(), 1000);
        assert!(out.height() <= 786 && out.height() >= 785);

        let small = DynamicImage::ImageRgb8(RgbImage::new(300, 200));
        let out = ImageProcessor::from_dynamic(small).fit_long_edge(1000);
        assert_eq!((out.width(), out.height()), (300, 200));
    }

    #[test]
    fn grayscale_jpeg_is_single_channel() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([0, 128, 255])));
        let bytes = ImageProcessor::from_dynamic(img)
            .grayscale()
            .to_jpeg_bytes(60)
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
    }
}
