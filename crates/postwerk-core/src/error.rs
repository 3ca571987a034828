// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Postwerk.

use thiserror::Error;

/// Top-level error type for all Postwerk operations.
#[derive(Debug, Error)]
pub enum PostwerkError {
    // -- Input errors --
    #[error("capture is empty")]
    EmptyCapture,

    #[error("invalid postcard code {0:?}: expected 8 lowercase hex digits")]
    InvalidCode(String),

    #[error("no capture stored for code {0}")]
    CaptureNotFound(String),

    // -- Composition / rendering errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("font could not be loaded: {0}")]
    Font(String),

    // -- Print dispatch errors --
    #[error("print utility not found: {0}")]
    PrintUtilityMissing(String),

    #[error("print utility exited with {status}")]
    PrintUtilityFailed { status: String },

    #[error("print-by-email is not configured (missing {0})")]
    EmailNotConfigured(&'static str),

    #[error("email provider rejected the message: {0}")]
    EmailProvider(String),

    // -- Remote upload errors --
    #[error("remote upload failed: {0}")]
    Upload(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Runtime / persistence --
    #[error("background task failed: {0}")]
    Task(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PostwerkError>;
