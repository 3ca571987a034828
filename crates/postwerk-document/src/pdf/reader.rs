// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — inspect rendered postcard documents using the `lopdf` crate.

use std::path::Path;

use lopdf::{Document, ObjectId};
use postwerk_core::error::PostwerkError;
use tracing::{debug, info, instrument};

/// Read-only view of an existing PDF.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PostwerkError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            PostwerkError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self { document })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, PostwerkError> {
        let document = Document::load_mem(data).map_err(|err| {
            PostwerkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Size of page `page_number` (1-indexed) in points, from its MediaBox.
    /// An inherited MediaBox is looked up through the page tree.
    pub fn page_size_pt(&self, page_number: u32) -> Result<(f32, f32), PostwerkError> {
        let pages = self.document.get_pages();
        let page_id = *pages.get(&page_number).ok_or_else(|| {
            PostwerkError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })?;

        let media_box = self.media_box(page_id)?;
        if media_box.len() != 4 {
            return Err(PostwerkError::PdfError(format!(
                "MediaBox has {} entries",
                media_box.len()
            )));
        }
        Ok((
            (media_box[2] - media_box[0]).abs(),
            (media_box[3] - media_box[1]).abs(),
        ))
    }

    /// Size of page `page_number` (1-indexed) in inches.
    pub fn page_size_in(&self, page_number: u32) -> Result<(f32, f32), PostwerkError> {
        let (w, h) = self.page_size_pt(page_number)?;
        Ok((w / 72.0, h / 72.0))
    }

    fn media_box(&self, page_id: ObjectId) -> Result<Vec<f32>, PostwerkError> {
        let pdf_err = |err: lopdf::Error| PostwerkError::PdfError(err.to_string());

        let mut node = page_id;
        // Page trees are shallow; the bound only guards against cycles.
        for _ in 0..32 {
            let dict = self
                .document
                .get_object(node)
                .and_then(|object| object.as_dict())
                .map_err(pdf_err)?;

            if let Ok(values) = dict.get(b"MediaBox").and_then(|object| object.as_array()) {
                return values
                    .iter()
                    .map(|value| value.as_float().map_err(pdf_err))
                    .collect();
            }
            node = dict
                .get(b"Parent")
                .and_then(|object| object.as_reference())
                .map_err(|_| PostwerkError::PdfError("page has no MediaBox".into()))?;
        }
        Err(PostwerkError::PdfError("page tree too deep".into()))
    }
}
