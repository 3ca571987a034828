// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// postwerk-document — Image and document processing for the Postwerk
// capture-to-print pipeline.
//
// Composes uploaded photos onto the fixed 7 x 5.5 in postcard canvas (full-bleed
// or square layout, code label stamped bottom-right), renders the canvas as a
// one-page PDF, and produces the degraded raster used for print-by-email.

pub mod compose;
pub mod image;
pub mod pdf;

// Re-export the primary structs so callers can use `postwerk_document::Composer` etc.
pub use compose::{CanvasSize, Composer, LayoutStrategy};
pub use crate::image::processor::{ImageProcessor, encode_jpeg};
pub use crate::image::proof::email_proof;
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
