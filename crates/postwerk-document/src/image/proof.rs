// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Email proof — the degraded raster attached to print-by-email messages.
// Mail-to-print services cap attachment sizes, so the canvas is sent as a
// small grayscale JPEG instead of the full-quality PDF.

use image::RgbImage;
use postwerk_core::error::PostwerkError;
use tracing::{debug, instrument};

use super::processor::ImageProcessor;

/// Longest edge of the emailed raster, in pixels.
pub const PROOF_MAX_EDGE: u32 = 1000;

/// JPEG quality of the emailed raster.
pub const PROOF_QUALITY: u8 = 60;

/// Grayscale, cap the long edge at [`PROOF_MAX_EDGE`] and encode as JPEG.
#[instrument(skip_all, fields(width = canvas.width(), height = canvas.height()))]
pub fn email_proof(canvas: &RgbImage) -> Result<Vec<u8>, PostwerkError> {
    let bytes = ImageProcessor::from_rgb(canvas.clone())
        .grayscale()
        .fit_long_edge(PROOF_MAX_EDGE)
        .to_jpeg_bytes(PROOF_QUALITY)?;
    debug!(bytes = bytes.len(), "Email proof encoded");
    Ok(bytes)
}
