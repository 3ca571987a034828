// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print-by-email channel — mails a degraded raster of the postcard to the
// printer's cloud address through SendGrid's v3 mail API.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use postwerk_core::Code;
use postwerk_core::config::EmailConfig;
use postwerk_core::error::PostwerkError;
use serde::Serialize;
use tracing::{debug, info, instrument};

/// A message with one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment_type: String,
    pub attachment: Vec<u8>,
}

/// Delivers mail to a provider.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), PostwerkError>;
}

// -- SendGrid wire format -----------------------------------------------------

#[derive(Serialize)]
struct SendGridMessage<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
    attachments: [Attachment<'a>; 1],
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct Attachment<'a> {
    content: String,
    #[serde(rename = "type")]
    kind: &'a str,
    filename: &'a str,
    disposition: &'static str,
}

fn sendgrid_payload(mail: &OutgoingMail) -> SendGridMessage<'_> {
    SendGridMessage {
        personalizations: [Personalization {
            to: [Address {
                email: &mail.recipient,
            }],
        }],
        from: Address {
            email: &mail.sender,
        },
        subject: &mail.subject,
        content: [Content {
            kind: "text/plain",
            value: &mail.body,
        }],
        attachments: [Attachment {
            content: STANDARD.encode(&mail.attachment),
            kind: &mail.attachment_type,
            filename: &mail.attachment_name,
            disposition: "attachment",
        }],
    }
}

/// SendGrid v3 `mail/send` client.
pub struct SendGridMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SendGridMailer {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl MailTransport for SendGridMailer {
    #[instrument(skip_all, fields(subject = %mail.subject))]
    async fn send(&self, mail: &OutgoingMail) -> Result<(), PostwerkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&sendgrid_payload(mail))
            .send()
            .await
            .map_err(|err| PostwerkError::EmailProvider(err.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "SendGrid responded");
        // SendGrid answers 202 Accepted; 200 is tolerated.
        if status.as_u16() == 200 || status.as_u16() == 202 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(PostwerkError::EmailProvider(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )))
        }
    }
}

/// Fully configured print-by-email channel.
pub struct EmailPrinter {
    sender: String,
    recipient: String,
    transport: Arc<dyn MailTransport>,
}

impl EmailPrinter {
    pub fn new(sender: String, recipient: String, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            sender,
            recipient,
            transport,
        }
    }

    /// Mail `attachment` (a JPEG) for `code`.
    #[instrument(skip(self, attachment), fields(code = %code, bytes = attachment.len()))]
    pub async fn send(&self, code: &Code, attachment: Vec<u8>, now: DateTime<Utc>) -> Result<(), PostwerkError> {
        let mail = compose_mail(&self.sender, &self.recipient, code, attachment, now);
        self.transport.send(&mail).await?;
        info!(recipient = %self.recipient, "postcard emailed to printer");
        Ok(())
    }
}

/// Sender, recipient and API key, or the name of the first one missing.
pub fn required(config: &EmailConfig) -> Result<(&str, &str, &str), PostwerkError> {
    let sender = present(&config.sender).ok_or(PostwerkError::EmailNotConfigured("sender"))?;
    let recipient = present(&config.recipient).ok_or(PostwerkError::EmailNotConfigured("recipient"))?;
    let api_key = present(&config.api_key).ok_or(PostwerkError::EmailNotConfigured("api_key"))?;
    Ok((sender, recipient, api_key))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Message for one postcard: subject `Print <code> <HH:MM:SS>` (UTC), the
/// subject repeated as body, attachment `postal_<code>.jpg`.
pub fn compose_mail(
    sender: &str,
    recipient: &str,
    code: &Code,
    attachment: Vec<u8>,
    now: DateTime<Utc>,
) -> OutgoingMail {
    let subject = format!("Print {} {}", code, now.format("%H:%M:%S"));
    OutgoingMail {
        sender: sender.to_string(),
        recipient: recipient.to_string(),
        body: subject.clone(),
        subject,
        attachment_name: format!("postal_{code}.jpg"),
        attachment_type: "image/jpeg".to_string(),
        attachment,
    }
}
