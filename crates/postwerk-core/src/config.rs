// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Built once at startup (defaults, then an optional JSON file, then
// environment overrides) and shared read-only afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PostwerkError, Result};
use crate::types::{Anchor, Layout, PrintMode};

/// Name of the optional config file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Deployment settings for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root for `uploads/` and `pdfs/`.
    pub data_dir: PathBuf,
    /// Composition policy for every capture.
    pub layout: Layout,
    /// Settings for the square layout.
    pub square: SquareConfig,
    /// TrueType font for the code label. System fonts are tried when unset.
    pub font_path: Option<PathBuf>,
    pub print: PrintConfig,
    pub upload: UploadConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            layout: Layout::Square,
            square: SquareConfig::default(),
            font_path: None,
            print: PrintConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

/// Margins and crop anchor for [`Layout::Square`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SquareConfig {
    /// Left/right margin in canvas pixels.
    pub margin_x: u32,
    /// Top/bottom margin in canvas pixels.
    pub margin_y: u32,
    pub anchor: Anchor,
}

impl Default for SquareConfig {
    fn default() -> Self {
        Self {
            margin_x: 120,
            margin_y: 120,
            anchor: Anchor::Center,
        }
    }
}

/// Print channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    pub mode: PrintMode,
    /// Local print utility (SumatraPDF by default).
    pub utility_path: PathBuf,
    /// Arguments placed before the document path.
    pub utility_args: Vec<String>,
    pub email: EmailConfig,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            mode: PrintMode::Off,
            utility_path: PathBuf::from(r"C:\Program Files\SumatraPDF\SumatraPDF.exe"),
            utility_args: vec![
                "-print-to-default".into(),
                "-print-settings".into(),
                "noscale".into(),
                "-silent".into(),
            ],
            email: EmailConfig::default(),
        }
    }
}

/// Print-by-email credentials. All three of sender, recipient and API key
/// must be present for the channel to be usable.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub sender: Option<String>,
    /// The printer's cloud email address.
    pub recipient: Option<String>,
    pub api_key: Option<String>,
    /// Mail API endpoint.
    pub endpoint: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: None,
            recipient: None,
            api_key: None,
            endpoint: "https://api.sendgrid.com/v3/mail/send".into(),
        }
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Remote viewing-service upload settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    /// Base of the public view link, e.g. `https://example.com/view_image`.
    pub view_base_url: Option<String>,
    /// Per-attempt timeout.
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Attempt `n` is followed by a pause of `2 * n` units.
    pub backoff_unit_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            view_base_url: None,
            timeout_secs: 60,
            max_attempts: 3,
            backoff_unit_ms: 1000,
        }
    }
}

impl UploadConfig {
    /// Endpoint and token, when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.endpoint.as_deref(), self.token.as_deref()) {
            (Some(endpoint), Some(token)) => Some((endpoint, token)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("view_base_url", &self.view_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_unit_ms", &self.backoff_unit_ms)
            .finish()
    }
}

impl AppConfig {
    /// Resolve the effective configuration.
    ///
    /// `explicit` names a JSON file that must exist. Without it,
    /// `config.json` in the (possibly env-overridden) data directory is used
    /// when present. Environment variables win over file values.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let data_dir = env("DATA_DIR").map(PathBuf::from).unwrap_or_else(default_data_dir);
                let candidate = data_dir.join(CONFIG_FILE);
                if candidate.is_file() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(env)?;
        config.validate()?;
        info!(
            data_dir = %config.data_dir.display(),
            layout = ?config.layout,
            print_mode = ?config.print.mode,
            upload = config.upload.credentials().is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        debug!(path = %path.display(), "config file read");
        Ok(config)
    }

    /// Apply `KEY=value` overrides from `lookup`. Empty values count as unset.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        if let Some(dir) = get("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(layout) = get("PRINT_LAYOUT") {
            self.layout = layout.parse()?;
        }
        if let Some(margin) = get("SQUARE_MARGIN_X") {
            self.square.margin_x = parse_pixels("SQUARE_MARGIN_X", &margin)?;
        }
        if let Some(margin) = get("SQUARE_MARGIN_Y") {
            self.square.margin_y = parse_pixels("SQUARE_MARGIN_Y", &margin)?;
        }
        if let Some(anchor) = get("SQUARE_ANCHOR") {
            self.square.anchor = anchor.parse()?;
        }
        if let Some(font) = get("FONT_PATH") {
            self.font_path = Some(PathBuf::from(font));
        }
        if let Some(mode) = get("AUTO_PRINT_MODE") {
            self.print.mode = mode.parse()?;
        }
        if let Some(path) = get("SUMATRA_PATH") {
            self.print.utility_path = PathBuf::from(path);
        }
        if let Some(v) = get("PRINTER_EMAIL") {
            self.print.email.recipient = Some(v);
        }
        if let Some(v) = get("SENDER_EMAIL") {
            self.print.email.sender = Some(v);
        }
        if let Some(v) = get("SENDGRID_API_KEY") {
            self.print.email.api_key = Some(v);
        }
        if let Some(v) = get("REMOTE_UPLOAD_URL") {
            self.upload.endpoint = Some(v);
        }
        if let Some(v) = get("REMOTE_UPLOAD_TOKEN") {
            self.upload.token = Some(v);
        }
        if let Some(v) = get("VIEW_BASE_URL") {
            self.upload.view_base_url = Some(v);
        }
        Ok(())
    }

    /// Reject settings that would make every capture fail.
    pub fn validate(&self) -> Result<()> {
        if self.upload.max_attempts == 0 {
            return Err(PostwerkError::Config("upload.max_attempts must be at least 1".into()));
        }
        if self.upload.timeout_secs == 0 {
            return Err(PostwerkError::Config("upload.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn pdfs_dir(&self) -> PathBuf {
        self.data_dir.join("pdfs")
    }

    /// Copy of the config with secrets blanked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let hide = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some("<redacted>".into());
            }
        };
        hide(&mut copy.print.email.api_key);
        hide(&mut copy.upload.token);
        copy
    }
}

fn parse_pixels(key: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| PostwerkError::Config(format!("{key} must be a pixel count, got {value:?}")))
}

/// Conventional per-user data directory for Postwerk.
pub fn default_data_dir() -> PathBuf {
    // Try XDG data dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("postwerk");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share").join("postwerk");
    }
    std::env::temp_dir().join("postwerk")
}
