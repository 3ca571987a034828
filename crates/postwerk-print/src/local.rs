// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local print channel — hands the rendered PDF to a command-line print
// utility (SumatraPDF on the kiosk machines).

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use postwerk_core::config::PrintConfig;
use postwerk_core::error::PostwerkError;
use tracing::{debug, info, instrument};

/// Exit state of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
}

/// Runs external programs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &Path, args: &[OsString]) -> Result<CommandStatus, PostwerkError>;
}

/// Spawns processes with `tokio::process`, output discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &Path, args: &[OsString]) -> Result<CommandStatus, PostwerkError> {
        let status = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => PostwerkError::PrintUtilityMissing(program.display().to_string()),
                _ => PostwerkError::Io(err),
            })?;
        Ok(CommandStatus {
            success: status.success(),
            code: status.code(),
        })
    }
}

/// Prints documents through the configured utility.
pub struct LocalPrinter {
    utility: PathBuf,
    args: Vec<String>,
    runner: Arc<dyn CommandRunner>,
}

impl LocalPrinter {
    pub fn new(utility: PathBuf, args: Vec<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            utility,
            args,
            runner,
        }
    }

    pub fn from_config(config: &PrintConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(config.utility_path.clone(), config.utility_args.clone(), runner)
    }

    /// Full argument list: configured flags followed by the document path.
    pub fn command_args(&self, document: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(OsString::from)
            .chain(std::iter::once(document.as_os_str().to_owned()))
            .collect()
    }

    /// Print `document`, waiting for the utility to exit.
    #[instrument(skip(self), fields(utility = %self.utility.display()))]
    pub async fn print(&self, document: &Path) -> Result<(), PostwerkError> {
        // A bare program name is resolved through PATH by the runner; only an
        // explicit path can be checked up front.
        if self.utility.components().count() > 1 && !self.utility.exists() {
            return Err(PostwerkError::PrintUtilityMissing(
                self.utility.display().to_string(),
            ));
        }

        let args = self.command_args(document);
        debug!(?args, "running print utility");
        let status = self.runner.run(&self.utility, &args).await?;
        if !status.success {
            return Err(PostwerkError::PrintUtilityFailed {
                status: status
                    .code
                    .map_or_else(|| "signal".to_string(), |code| format!("exit code {code}")),
            });
        }
        info!(document = %document.display(), "document sent to local printer");
        Ok(())
    }
}
