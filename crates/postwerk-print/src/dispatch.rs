// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print dispatcher — routes a rendered postcard to the configured print
// channel. The channel is resolved once from configuration; every dispatch
// yields a `DispatchOutcome` and never fails the capture.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use image::RgbImage;
use postwerk_core::config::{EmailConfig, PrintConfig};
use postwerk_core::error::PostwerkError;
use postwerk_core::{Code, DispatchOutcome, PrintMode};
use postwerk_document::email_proof;
use tracing::{info, instrument, warn};

use crate::email::{self, EmailPrinter, MailTransport, SendGridMailer};
use crate::local::{CommandRunner, LocalPrinter, ProcessRunner};

/// Everything a channel may need to print one postcard.
#[derive(Debug, Clone, Copy)]
pub struct PrintJob<'a> {
    pub code: &'a Code,
    /// Rendered PDF, used by local printing.
    pub document: &'a Path,
    /// Composed canvas, degraded for print-by-email.
    pub canvas: &'a RgbImage,
}

/// A print mode resolved against its settings.
pub enum PrintChannel {
    Off,
    Local(LocalPrinter),
    Email(EmailPrinter),
    /// Email printing was selected but the named setting is missing.
    EmailNotConfigured(&'static str),
}

impl PrintChannel {
    pub fn mode(&self) -> PrintMode {
        match self {
            Self::Off => PrintMode::Off,
            Self::Local(_) => PrintMode::LocalPrint,
            Self::Email(_) | Self::EmailNotConfigured(_) => PrintMode::EmailPrint,
        }
    }
}

pub struct PrintDispatcher {
    channel: PrintChannel,
}

impl PrintDispatcher {
    pub fn new(channel: PrintChannel) -> Self {
        Self { channel }
    }

    /// Resolve the configured mode using the real process runner and
    /// SendGrid.
    pub fn from_config(config: &PrintConfig, client: reqwest::Client) -> Self {
        Self::with_transports(config, Arc::new(ProcessRunner), |email, api_key| {
            Arc::new(SendGridMailer::new(client, email.endpoint.clone(), api_key))
        })
    }

    /// Resolve the configured mode with caller-supplied transports.
    /// `mailer` is only invoked when email printing is fully configured.
    pub fn with_transports(
        config: &PrintConfig,
        runner: Arc<dyn CommandRunner>,
        mailer: impl FnOnce(&EmailConfig, &str) -> Arc<dyn MailTransport>,
    ) -> Self {
        let channel = match config.mode {
            PrintMode::Off => PrintChannel::Off,
            PrintMode::LocalPrint => PrintChannel::Local(LocalPrinter::from_config(config, runner)),
            PrintMode::EmailPrint => match email::required(&config.email) {
                Ok((sender, recipient, api_key)) => PrintChannel::Email(EmailPrinter::new(
                    sender.to_string(),
                    recipient.to_string(),
                    mailer(&config.email, api_key),
                )),
                Err(err) => {
                    warn!(error = %err, "email printing selected but not configured");
                    PrintChannel::EmailNotConfigured(missing_setting(&err))
                }
            },
        };
        info!(mode = ?channel.mode(), "print dispatcher ready");
        Self::new(channel)
    }

    pub fn channel(&self) -> &PrintChannel {
        &self.channel
    }

    /// Print one postcard through the channel. Failures are logged and
    /// reported in the outcome.
    #[instrument(skip(self, job), fields(code = %job.code, mode = ?self.channel.mode()))]
    pub async fn dispatch(&self, job: PrintJob<'_>) -> DispatchOutcome {
        let outcome = match &self.channel {
            PrintChannel::Off => {
                info!("printing disabled, skipping");
                DispatchOutcome::Skipped
            }
            PrintChannel::EmailNotConfigured(missing) => {
                info!(missing, "email printing not configured, skipping");
                DispatchOutcome::NotConfigured
            }
            PrintChannel::Local(printer) => match printer.print(job.document).await {
                Ok(()) => DispatchOutcome::Printed,
                Err(err) => DispatchOutcome::Failed(err.to_string()),
            },
            PrintChannel::Email(printer) => match degrade(job.canvas).await {
                Ok(proof) => match printer.send(job.code, proof, Utc::now()).await {
                    Ok(()) => DispatchOutcome::Printed,
                    Err(err) => DispatchOutcome::Failed(err.to_string()),
                },
                Err(reason) => DispatchOutcome::Failed(reason),
            },
        };

        match &outcome {
            DispatchOutcome::Failed(reason) => warn!(%reason, "print dispatch failed"),
            other => info!(outcome = ?other, "print dispatch finished"),
        }
        outcome
    }
}

/// Build the email raster off the async workers.
async fn degrade(canvas: &RgbImage) -> Result<Vec<u8>, String> {
    let canvas = canvas.clone();
    match tokio::task::spawn_blocking(move || email_proof(&canvas)).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(err)) => Err(err.to_string()),
        Err(err) => Err(format!("email raster task failed: {err}")),
    }
}

fn missing_setting(err: &PostwerkError) -> &'static str {
    match err {
        PostwerkError::EmailNotConfigured(name) => *name,
        _ => "email settings",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::tests::RecordingTransport;
    use crate::local::tests::RecordingRunner;
    use image::Rgb;
    use postwerk_core::config::EmailConfig;

    struct Fixture {
        runner: Arc<RecordingRunner>,
        transport: Arc<RecordingTransport>,
        dispatcher: PrintDispatcher,
    }

    fn fixture(config: &PrintConfig, runner: RecordingRunner, transport: RecordingTransport) -> Fixture {
        let runner = Arc::new(runner);
        let transport = Arc::new(transport);
        let mail: Arc<dyn MailTransport> = transport.clone();
        let dispatcher = PrintDispatcher::with_transports(config, runner.clone(), move |_, _| mail);
        Fixture {
            runner,
            transport,
            dispatcher,
        }
    }

    fn email_config() -> EmailConfig {
        EmailConfig {
            sender: Some("kiosk@example.com".into()),
            recipient: Some("printer@example.com".into()),
            api_key: Some("SG.secret".into()),
            ..Default::default()
        }
    }

    fn canvas() -> RgbImage {
        RgbImage::from_pixel(2100, 1650, Rgb([200, 100, 50]))
    }

    #[tokio::test]
    async fn off_mode_makes_no_external_calls() {
        // Fully configured otherwise: only the mode keeps it quiet.
        let config = PrintConfig {
            mode: PrintMode::Off,
            email: email_config(),
            ..Default::default()
        };
        let f = fixture(&config, RecordingRunner::default(), RecordingTransport::default());
        let code = Code::parse("deadbeef").unwrap();
        let canvas = canvas();
        let outcome = f
            .dispatcher
            .dispatch(PrintJob {
                code: &code,
                document: Path::new("deadbeef.pdf"),
                canvas: &canvas,
            })
            .await;

        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert!(f.runner.calls.lock().unwrap().is_empty());
        assert!(f.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn email_without_credentials_is_not_configured() {
        let config = PrintConfig {
            mode: PrintMode::EmailPrint,
            email: EmailConfig {
                api_key: None,
                ..email_config()
            },
            ..Default::default()
        };
        let f = fixture(&config, RecordingRunner::default(), RecordingTransport::default());
        assert!(matches!(
            f.dispatcher.channel(),
            PrintChannel::EmailNotConfigured("api_key")
        ));

        let code = Code::parse("deadbeef").unwrap();
        let canvas = canvas();
        let outcome = f
            .dispatcher
            .dispatch(PrintJob {
                code: &code,
                document: Path::new("deadbeef.pdf"),
                canvas: &canvas,
            })
            .await;
        assert_eq!(outcome, DispatchOutcome::NotConfigured);
        assert!(f.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn email_sends_degraded_jpeg() {
        let config = PrintConfig {
            mode: PrintMode::EmailPrint,
            email: email_config(),
            ..Default::default()
        };
        let f = fixture(&config, RecordingRunner::default(), RecordingTransport::default());
        let code = Code::parse("0a1b2c3d").unwrap();
        let canvas = canvas();
        let outcome = f
            .dispatcher
            .dispatch(PrintJob {
                code: &code,
                document: Path::new("unused.pdf"),
                canvas: &canvas,
            })
            .await;
        assert_eq!(outcome, DispatchOutcome::Printed);

        let sent = f.transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachment_name, "postal_0a1b2c3d.jpg");
        let raster = image::load_from_memory(&sent[0].attachment).unwrap();
        assert_eq!(raster.color(), image::ColorType::L8);
        assert_eq!(raster.width(), 1000);
        assert!(f.runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_rejection_is_a_failed_outcome() {
        let config = PrintConfig {
            mode: PrintMode::EmailPrint,
            email: email_config(),
            ..Default::default()
        };
        let f = fixture(
            &config,
            RecordingRunner::default(),
            RecordingTransport {
                reject: true,
                ..Default::default()
            },
        );
        let code = Code::parse("0a1b2c3d").unwrap();
        let canvas = RgbImage::from_pixel(64, 48, Rgb([0, 0, 0]));
        let outcome = f
            .dispatcher
            .dispatch(PrintJob {
                code: &code,
                document: Path::new("unused.pdf"),
                canvas: &canvas,
            })
            .await;
        assert!(matches!(outcome, DispatchOutcome::Failed(reason) if reason.contains("401")));
    }

    #[tokio::test]
    async fn local_print_failure_does_not_escape() {
        let config = PrintConfig {
            mode: PrintMode::LocalPrint,
            utility_path: "/nonexistent/SumatraPDF.exe".into(),
            ..Default::default()
        };
        let f = fixture(&config, RecordingRunner::default(), RecordingTransport::default());
        let code = Code::parse("deadbeef").unwrap();
        let canvas = canvas();
        let outcome = f
            .dispatcher
            .dispatch(PrintJob {
                code: &code,
                document: Path::new("deadbeef.pdf"),
                canvas: &canvas,
            })
            .await;
        assert!(matches!(outcome, DispatchOutcome::Failed(_)));
        assert!(f.runner.calls.lock().unwrap().is_empty());
    }
}
