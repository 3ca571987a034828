// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Postwerk postcard pipeline.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PostwerkError;

/// Canvas width in pixels (7 in at 300 dpi).
pub const CANVAS_WIDTH: u32 = 2100;
/// Canvas height in pixels (5.5 in at 300 dpi).
pub const CANVAS_HEIGHT: u32 = 1650;
/// Resolution the canvas is laid out for.
pub const PRINT_DPI: f32 = 300.0;
/// Physical page width of a postcard document.
pub const PAGE_WIDTH_IN: f32 = 7.0;
/// Physical page height of a postcard document.
pub const PAGE_HEIGHT_IN: f32 = 5.5;

/// Length of a postcard code in hex characters.
pub const CODE_LEN: usize = 8;

/// Short content-derived identifier of a capture.
///
/// Always exactly [`CODE_LEN`] lowercase hex digits. Identical bytes map to
/// the identical code, so the code doubles as the file name of every
/// artifact derived from the capture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    /// Build a code from a digest that is already known to be valid hex.
    pub(crate) fn from_digest_hex(hex: String) -> Self {
        debug_assert_eq!(hex.len(), CODE_LEN);
        Self(hex)
    }

    /// Parse a code typed or pasted by a person. Surrounding whitespace is
    /// ignored and upper-case digits are folded to lower case.
    pub fn parse(raw: &str) -> Result<Self, PostwerkError> {
        let normalized = raw.trim().to_ascii_lowercase();
        let valid = normalized.len() == CODE_LEN
            && normalized.bytes().all(|b| b.is_ascii_hexdigit());
        if valid {
            Ok(Self(normalized))
        } else {
            Err(PostwerkError::InvalidCode(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Code {
    type Err = PostwerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Code {
    type Error = PostwerkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

/// Composition policy for the print canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Centred square crop with white margins and a thin border.
    #[default]
    Square,
    /// Cover-scaled photo filling the whole canvas.
    FullBleed,
}

impl FromStr for Layout {
    type Err = PostwerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "fullbleed" | "full-bleed" => Ok(Self::FullBleed),
            other => Err(PostwerkError::Config(format!("unknown layout {other:?}"))),
        }
    }
}

/// Where the square crop is taken from a portrait source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Top,
    #[default]
    Center,
    Bottom,
}

impl FromStr for Anchor {
    type Err = PostwerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" | "centre" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            other => Err(PostwerkError::Config(format!("unknown anchor {other:?}"))),
        }
    }
}

/// Print channel selected for the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrintMode {
    /// Log the intent and do nothing.
    #[default]
    Off,
    /// Hand the PDF to a local print utility.
    LocalPrint,
    /// Mail a compressed raster to a cloud printer's address.
    EmailPrint,
}

impl FromStr for PrintMode {
    type Err = PostwerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "" => Ok(Self::Off),
            "local-print" | "local" | "sumatra" => Ok(Self::LocalPrint),
            "email-print" | "email" | "eprint" => Ok(Self::EmailPrint),
            other => Err(PostwerkError::Config(format!("unknown print mode {other:?}"))),
        }
    }
}

/// What happened when a document was handed to the print channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "kebab-case")]
pub enum DispatchOutcome {
    /// Printing is switched off.
    Skipped,
    /// The selected channel lacks required settings.
    NotConfigured,
    /// The channel accepted the document.
    Printed,
    /// The channel failed; the capture itself is unaffected.
    Failed(String),
}

/// Terminal state of a remote upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Succeeded,
    Exhausted,
}

/// Result of a remote upload, observed only through logs and this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub code: Code,
    pub status: UploadStatus,
    /// Number of POST attempts made.
    pub attempts: u32,
    /// Public link, from the remote response or built from the base URL.
    pub view_url: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == UploadStatus::Succeeded
    }
}

/// Answer returned to whoever submitted a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOutcome {
    pub code: Code,
    pub view_url: Option<String>,
    /// True once the capture is stored and its document rendered; print and
    /// upload results never change it.
    pub ok: bool,
    pub print: DispatchOutcome,
    /// Whether a background upload was started.
    pub upload_started: bool,
}

/// Build the deterministic public link for a code.
pub fn view_url_for(base: &str, code: &Code) -> String {
    format!("{}/{}", base.trim_end_matches('/'), code)
}
