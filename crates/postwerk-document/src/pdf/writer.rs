// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — wrap a composed canvas in a single-page postcard PDF using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use std::io::Write;
use std::path::Path;

use image::RgbImage;
use postwerk_core::error::PostwerkError;
use postwerk_core::{PAGE_HEIGHT_IN, PAGE_WIDTH_IN, PRINT_DPI};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

const MM_PER_INCH: f32 = 25.4;
const PT_PER_INCH: f32 = 72.0;

/// Title recorded in the /Info dictionary of every rendered postcard.
const DOCUMENT_TITLE: &str = "Postwerk postcard";

/// Renders composed canvases as one-page PDFs with the image filling the
/// whole page, no margins.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    /// Page width in inches.
    width_in: f32,
    /// Page height in inches.
    height_in: f32,
    /// Resolution the canvas is placed at.
    dpi: f32,
}

impl PdfWriter {
    pub fn new(width_in: f32, height_in: f32, dpi: f32) -> Self {
        Self {
            width_in,
            height_in,
            dpi,
        }
    }

    /// 7 x 5.5 in page at 300 dpi.
    pub fn postcard() -> Self {
        Self::new(PAGE_WIDTH_IN, PAGE_HEIGHT_IN, PRINT_DPI)
    }

    /// Page size in PostScript points.
    pub fn page_size_pt(&self) -> (f32, f32) {
        (self.width_in * PT_PER_INCH, self.height_in * PT_PER_INCH)
    }

    /// Render `canvas` as the sole content of a single page.
    ///
    /// The image is stretched to the page on both axes; a canvas with the
    /// page's aspect ratio at the writer's dpi maps one-to-one.
    #[instrument(skip(self, canvas), fields(width = canvas.width(), height = canvas.height()))]
    pub fn render(&self, canvas: &RgbImage) -> Result<Vec<u8>, PostwerkError> {
        let (img_w, img_h) = canvas.dimensions();
        if img_w == 0 || img_h == 0 {
            return Err(PostwerkError::PdfError("cannot render an empty canvas".into()));
        }

        let raw = RawImage {
            pixels: RawImageData::U8(canvas.as_raw().clone()),
            width: img_w as usize,
            height: img_h as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        let xobject_id = doc.add_image(&raw);

        // Native size of the image at the target dpi, then scale to fill.
        let (page_w_pt, page_h_pt) = self.page_size_pt();
        let native_w_pt = img_w as f32 / self.dpi * PT_PER_INCH;
        let native_h_pt = img_h as f32 / self.dpi * PT_PER_INCH;
        let scale_x = page_w_pt / native_w_pt;
        let scale_y = page_h_pt / native_h_pt;

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                dpi: Some(self.dpi),
                rotate: None,
            },
        }];

        let page = PdfPage::new(
            Mm(self.width_in * MM_PER_INCH),
            Mm(self.height_in * MM_PER_INCH),
            ops,
        );
        doc.with_pages(vec![page]);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings");
            for warning in &warnings {
                debug!(?warning, "printpdf warning");
            }
        }

        debug!(scale_x, scale_y, bytes = output.len(), "Canvas placed on page");
        Ok(output)
    }

    /// Render and write to `path`. The file appears atomically: it is written
    /// to a temporary file in the same directory and then renamed.
    pub fn render_to_file(&self, canvas: &RgbImage, path: &Path) -> Result<(), PostwerkError> {
        let bytes = self.render(canvas)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|err| PostwerkError::Io(err.error))?;

        info!(path = %path.display(), bytes = bytes.len(), "Wrote postcard PDF");
        Ok(())
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::postcard()
    }
}
