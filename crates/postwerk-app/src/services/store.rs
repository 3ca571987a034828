// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture store — code-addressed files under the data directory:
//
//   uploads/<code>.jpg        original bytes as received
//   pdfs/<code>.pdf           rendered postcard
//   pdfs/<code>_print.jpg     composite preview
//
// Every write lands in a temporary file in the destination directory and is
// renamed into place, so readers never observe a partial file.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use image::RgbImage;
use postwerk_core::error::{PostwerkError, Result};
use postwerk_core::{AppConfig, Code};
use postwerk_document::encode_jpeg;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// JPEG quality of the stored composite preview.
pub const PREVIEW_QUALITY: u8 = 92;

/// Which artifacts exist for one code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredCapture {
    pub code: Code,
    pub original: PathBuf,
    pub preview: Option<PathBuf>,
    pub document: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CaptureStore {
    uploads: PathBuf,
    pdfs: PathBuf,
}

impl CaptureStore {
    /// Open the store for the configured data directory, creating the
    /// subdirectories if needed.
    pub fn open(config: &AppConfig) -> Result<Self> {
        let store = Self {
            uploads: config.uploads_dir(),
            pdfs: config.pdfs_dir(),
        };
        std::fs::create_dir_all(&store.uploads)?;
        std::fs::create_dir_all(&store.pdfs)?;
        info!(uploads = %store.uploads.display(), pdfs = %store.pdfs.display(), "capture store ready");
        Ok(store)
    }

    pub fn original_path(&self, code: &Code) -> PathBuf {
        self.uploads.join(format!("{code}.jpg"))
    }

    pub fn preview_path(&self, code: &Code) -> PathBuf {
        self.pdfs.join(format!("{code}_print.jpg"))
    }

    pub fn document_path(&self, code: &Code) -> PathBuf {
        self.pdfs.join(format!("{code}.pdf"))
    }

    /// Store the original capture. Identical content maps to the same file,
    /// so repeated saves are harmless.
    pub fn save_original(&self, code: &Code, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.original_path(code);
        write_atomic(&path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "original stored");
        Ok(path)
    }

    /// Store the composed canvas as a JPEG preview.
    pub fn save_preview(&self, code: &Code, canvas: &RgbImage) -> Result<PathBuf> {
        let bytes = encode_jpeg(&image::DynamicImage::ImageRgb8(canvas.clone()), PREVIEW_QUALITY)?;
        let path = self.preview_path(code);
        write_atomic(&path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "preview stored");
        Ok(path)
    }

    pub fn load_original(&self, code: &Code) -> Result<Vec<u8>> {
        match std::fs::read(self.original_path(code)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(PostwerkError::CaptureNotFound(code.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Artifacts stored for `code`; `CaptureNotFound` without an original.
    pub fn lookup(&self, code: &Code) -> Result<StoredCapture> {
        let original = self.original_path(code);
        if !original.is_file() {
            return Err(PostwerkError::CaptureNotFound(code.to_string()));
        }
        let existing = |path: PathBuf| path.is_file().then_some(path);
        Ok(StoredCapture {
            code: code.clone(),
            original,
            preview: existing(self.preview_path(code)),
            document: existing(self.document_path(code)),
        })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| PostwerkError::Config(format!("{} has no parent directory", path.display())))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| PostwerkError::Io(err.error))?;
    Ok(())
}
