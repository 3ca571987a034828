// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remote upload client — pushes the original capture to the public viewing
// service with bounded retries. Runs in the background; its only products
// are log lines and an `UploadOutcome`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use postwerk_core::config::UploadConfig;
use postwerk_core::error::PostwerkError;
use postwerk_core::{Code, UploadOutcome, UploadStatus, view_url_for};
use postwerk_document::ImageProcessor;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::retry::{self, RetryConfig, RetryDecision};

/// Quality of the JPEG actually sent.
pub const UPLOAD_JPEG_QUALITY: u8 = 85;

/// One POST to the viewing service.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub endpoint: String,
    pub token: String,
    pub code: Code,
    /// JPEG bytes for the `imagen` field.
    pub image: Vec<u8>,
    pub timeout: Duration,
}

/// Raw answer from the viewing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends upload requests over the wire.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn post(&self, request: &UploadRequest) -> Result<UploadResponse, PostwerkError>;
}

/// Multipart POST through `reqwest`: fields `imagen` (`<code>.jpg`,
/// `image/jpeg`), `codigo` and `source=browser`, bearer token, per-request
/// timeout.
#[derive(Debug, Clone)]
pub struct ReqwestUploadTransport {
    client: reqwest::Client,
}

impl ReqwestUploadTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UploadTransport for ReqwestUploadTransport {
    async fn post(&self, request: &UploadRequest) -> Result<UploadResponse, PostwerkError> {
        let image = Part::bytes(request.image.clone())
            .file_name(format!("{}.jpg", request.code))
            .mime_str("image/jpeg")
            .map_err(|err| PostwerkError::Upload(err.to_string()))?;
        let form = Form::new()
            .part("imagen", image)
            .text("codigo", request.code.to_string())
            .text("source", "browser");

        let response = self
            .client
            .post(&request.endpoint)
            .bearer_auth(&request.token)
            .timeout(request.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|err| PostwerkError::Upload(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| PostwerkError::Upload(err.to_string()))?;
        Ok(UploadResponse { status, body })
    }
}

#[derive(Deserialize)]
struct ViewLinks {
    view_url: Option<String>,
    url: Option<String>,
}

/// Uploads captures to the viewing service.
pub struct RemoteUploadClient {
    endpoint: String,
    token: String,
    view_base_url: Option<String>,
    timeout: Duration,
    retry: RetryConfig,
    transport: Arc<dyn UploadTransport>,
}

impl RemoteUploadClient {
    /// `None` unless both endpoint and token are configured.
    pub fn from_config(config: &UploadConfig, transport: Arc<dyn UploadTransport>) -> Option<Self> {
        let (endpoint, token) = config.credentials()?;
        Some(Self {
            endpoint: endpoint.to_string(),
            token: token.to_string(),
            view_base_url: config.view_base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryConfig::from(config),
            transport,
        })
    }

    /// Link reported before the upload finishes, if a base is configured.
    pub fn fallback_view_url(&self, code: &Code) -> Option<String> {
        self.view_base_url
            .as_deref()
            .map(|base| view_url_for(base, code))
    }

    /// Upload `original` for `code`. Never fails: transport errors and
    /// non-2xx answers are retried, then reported as `Exhausted`.
    #[instrument(skip(self, original), fields(code = %code, bytes = original.len()))]
    pub async fn upload(&self, code: Code, original: Vec<u8>) -> UploadOutcome {
        let image = prepare_payload(original).await;
        let request = UploadRequest {
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
            code: code.clone(),
            image,
            timeout: self.timeout,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.post(&request).await {
                Ok(response) if response.is_success() => {
                    let view_url = self.view_url_from(&response.body, &code);
                    info!(attempt, status = response.status, ?view_url, "remote upload succeeded");
                    return UploadOutcome {
                        code,
                        status: UploadStatus::Succeeded,
                        attempts: attempt,
                        view_url,
                    };
                }
                Ok(response) => warn!(
                    attempt,
                    status = response.status,
                    body = %snippet(&response.body),
                    "remote upload rejected"
                ),
                Err(err) => warn!(attempt, error = %err, "remote upload attempt failed"),
            }

            match retry::after_failure(attempt, &self.retry) {
                RetryDecision::RetryAfter(delay) => tokio::time::sleep(delay).await,
                RetryDecision::Exhausted => break,
            }
        }

        let view_url = self.fallback_view_url(&code);
        warn!(attempts = attempt, ?view_url, "remote upload gave up");
        UploadOutcome {
            code,
            status: UploadStatus::Exhausted,
            attempts: attempt,
            view_url,
        }
    }

    /// `view_url` from the JSON body, else `url`, else the fallback link.
    fn view_url_from(&self, body: &str, code: &Code) -> Option<String> {
        let links = serde_json::from_str::<ViewLinks>(body).ok();
        links
            .and_then(|links| links.view_url.or(links.url))
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.fallback_view_url(code))
    }
}

/// Re-encode as JPEG; send the original bytes if that fails.
async fn prepare_payload(original: Vec<u8>) -> Vec<u8> {
    let source = original.clone();
    let encoded = tokio::task::spawn_blocking(move || {
        ImageProcessor::from_bytes(&source)?.to_jpeg_bytes(UPLOAD_JPEG_QUALITY)
    })
    .await;
    match encoded {
        Ok(Ok(jpeg)) => {
            debug!(from = original.len(), to = jpeg.len(), "upload payload re-encoded");
            jpeg
        }
        Ok(Err(err)) => {
            debug!(error = %err, "re-encode failed, sending original bytes");
            original
        }
        Err(err) => {
            warn!(error = %err, "re-encode task failed, sending original bytes");
            original
        }
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::Responder;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` posts, then answers 200 with `body`.
    struct FlakyTransport {
        failures: u32,
        body: String,
        calls: AtomicU32,
        seen: Mutex<Vec<UploadRequest>>,
    }

    impl FlakyTransport {
        fn new(failures: u32, body: &str) -> Arc<Self> {
            Arc::new(Self {
                failures,
                body: body.to_string(),
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UploadTransport for FlakyTransport {
        async fn post(&self, request: &UploadRequest) -> Result<UploadResponse, PostwerkError> {
            self.seen.lock().unwrap().push(request.clone());
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                if n % 2 == 0 {
                    return Err(PostwerkError::Upload("connection reset".into()));
                }
                return Ok(UploadResponse {
                    status: 503,
                    body: "busy".into(),
                });
            }
            Ok(UploadResponse {
                status: 200,
                body: self.body.clone(),
            })
        }
    }

    fn config(view_base: Option<&str>) -> UploadConfig {
        UploadConfig {
            endpoint: Some("https://example.com/api/upload".into()),
            token: Some("secret".into()),
            view_base_url: view_base.map(str::to_string),
            ..Default::default()
        }
    }

    fn client(transport: Arc<FlakyTransport>, view_base: Option<&str>) -> RemoteUploadClient {
        RemoteUploadClient::from_config(&config(view_base), transport).unwrap()
    }

    #[test]
    fn needs_endpoint_and_token() {
        let transport = FlakyTransport::new(0, "");
        let mut cfg = config(None);
        cfg.token = None;
        assert!(RemoteUploadClient::from_config(&cfg, transport).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt() {
        let transport = FlakyTransport::new(2, r#"{"view_url":"https://example.com/v/abc"}"#);
        let client = client(transport.clone(), Some("https://example.com/view"));
        let code = Code::parse("deadbeef").unwrap();

        let started = tokio::time::Instant::now();
        let outcome = client.upload(code.clone(), b"not an image".to_vec()).await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(transport.calls(), 3);
        assert_eq!(outcome.view_url.as_deref(), Some("https://example.com/v/abc"));
        // 2 s after attempt 1, 4 s after attempt 2.
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_attempts() {
        let transport = FlakyTransport::new(u32::MAX, "");
        let client = client(transport.clone(), Some("https://example.com/view/"));
        let code = Code::parse("0badcafe").unwrap();

        let started = tokio::time::Instant::now();
        let outcome = client.upload(code, vec![1, 2, 3]).await;

        assert_eq!(outcome.status, UploadStatus::Exhausted);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(transport.calls(), 3);
        assert_eq!(
            outcome.view_url.as_deref(),
            Some("https://example.com/view/0badcafe")
        );
        // No pause after the last attempt.
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn response_url_fallbacks() {
        let code = Code::parse("12345678").unwrap();

        let transport = FlakyTransport::new(0, r#"{"url":"https://cdn.example.com/12345678.jpg"}"#);
        let outcome = client(transport, Some("https://example.com/view"))
            .upload(code.clone(), Vec::new())
            .await;
        assert_eq!(
            outcome.view_url.as_deref(),
            Some("https://cdn.example.com/12345678.jpg")
        );

        let transport = FlakyTransport::new(0, "<html>ok</html>");
        let outcome = client(transport, Some("https://example.com/view"))
            .upload(code.clone(), Vec::new())
            .await;
        assert_eq!(
            outcome.view_url.as_deref(),
            Some("https://example.com/view/12345678")
        );

        let transport = FlakyTransport::new(0, "{}");
        let outcome = client(transport, None).upload(code, Vec::new()).await;
        assert!(outcome.succeeded());
        assert_eq!(outcome.view_url, None);
    }

    #[tokio::test]
    async fn sends_reencoded_jpeg_with_credentials() {
        let png = {
            let img = image::RgbImage::from_pixel(40, 30, image::Rgb([9, 90, 200]));
            let mut buf = Vec::new();
            image::DynamicImage::ImageRgb8(img)
                .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
                .unwrap();
            buf
        };
        let transport = FlakyTransport::new(0, "{}");
        let code = Code::parse("aabbccdd").unwrap();
        client(transport.clone(), None).upload(code.clone(), png).await;

        let seen = transport.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.endpoint, "https://example.com/api/upload");
        assert_eq!(request.token, "secret");
        assert_eq!(request.code, code);
        assert_eq!(request.timeout, Duration::from_secs(60));
        assert_eq!(&request.image[..2], &[0xff, 0xd8]);
    }

    #[tokio::test]
    async fn undecodable_bytes_are_sent_as_is() {
        let transport = FlakyTransport::new(0, "{}");
        let code = Code::parse("aabbccdd").unwrap();
        client(transport.clone(), None)
            .upload(code, b"raw heic bytes".to_vec())
            .await;
        assert_eq!(transport.seen.lock().unwrap()[0].image, b"raw heic bytes");
    }

    fn http_client(url: &str, max_attempts: u32) -> RemoteUploadClient {
        let config = UploadConfig {
            endpoint: Some(url.to_string()),
            token: Some("tok".into()),
            max_attempts,
            backoff_unit_ms: 1,
            timeout_secs: 10,
            ..Default::default()
        };
        let transport = Arc::new(ReqwestUploadTransport::new(crate::loopback::direct_client()));
        RemoteUploadClient::from_config(&config, transport).unwrap()
    }

    #[tokio::test]
    async fn multipart_request_carries_bearer_and_fields() {
        let server = Responder::start(vec![(200, r#"{"view_url":"https://v/x"}"#)]).await;
        let code = Code::parse("deadbeef").unwrap();

        let outcome = http_client(&server.url, 3)
            .upload(code.clone(), b"not an image".to_vec())
            .await;
        assert_eq!(outcome.status, UploadStatus::Succeeded);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.view_url.as_deref(), Some("https://v/x"));

        let requests = server.requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.head.starts_with("POST /upload "));
        assert_eq!(request.header("authorization"), Some("Bearer tok"));
        assert!(request
            .header("content-type")
            .is_some_and(|v| v.starts_with("multipart/form-data; boundary=")));

        let body = request.body_text();
        assert!(body.contains(r#"name="imagen"; filename="deadbeef.jpg""#), "{body}");
        assert!(body.contains("Content-Type: image/jpeg\r\n\r\nnot an image"));
        assert!(body.contains("name=\"codigo\"\r\n\r\ndeadbeef\r\n"));
        assert!(body.contains("name=\"source\"\r\n\r\nbrowser\r\n"));
    }

    #[tokio::test]
    async fn server_error_over_http_is_retried() {
        let server = Responder::start(vec![(500, "boom"), (200, "{}")]).await;
        let outcome = http_client(&server.url, 3)
            .upload(Code::parse("0badf00d").unwrap(), vec![7; 16])
            .await;
        assert!(outcome.succeeded());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(server.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn non_2xx_answers_exhaust_the_attempts() {
        let server = Responder::start(vec![(503, "busy"), (500, "boom")]).await;
        let outcome = http_client(&server.url, 2)
            .upload(Code::parse("0badf00d").unwrap(), vec![7; 16])
            .await;
        assert_eq!(outcome.status, UploadStatus::Exhausted);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.view_url, None);
        assert_eq!(server.requests().await.len(), 2);
    }
}
