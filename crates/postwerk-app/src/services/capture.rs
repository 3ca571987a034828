// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture service — runs one upload through the whole pipeline: code, store,
// compose, render, print, and the background upload.
//
// Image work runs on the blocking pool. Print dispatch is awaited but can
// only produce an outcome, never an error. Uploads are spawned on a
// `TaskTracker` so the front end can wait for them before exiting.

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbImage;
use postwerk_core::error::{PostwerkError, Result};
use postwerk_core::{AppConfig, CaptureOutcome, Code, DispatchOutcome, derive_code};
use postwerk_document::{Composer, ImageProcessor, PdfWriter};
use postwerk_print::{PrintDispatcher, PrintJob, RemoteUploadClient, ReqwestUploadTransport};
use tokio_util::task::TaskTracker;
use tracing::{error, info, instrument, warn};

use super::store::{CaptureStore, StoredCapture};

/// JPEG quality of on-demand previews.
pub const PREVIEW_JPEG_QUALITY: u8 = 85;

/// Composed canvas plus where its PDF was written.
struct Rendered {
    canvas: RgbImage,
    document: PathBuf,
}

pub struct CaptureService {
    config: Arc<AppConfig>,
    store: CaptureStore,
    composer: Arc<Composer>,
    writer: PdfWriter,
    dispatcher: PrintDispatcher,
    uploader: Option<Arc<RemoteUploadClient>>,
    tracker: TaskTracker,
}

impl CaptureService {
    /// Wire up every component from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| PostwerkError::Config(format!("HTTP client: {err}")))?;

        let store = CaptureStore::open(&config)?;
        let composer = Composer::from_config(&config)?;
        let dispatcher = PrintDispatcher::from_config(&config.print, client.clone());
        let uploader = RemoteUploadClient::from_config(
            &config.upload,
            Arc::new(ReqwestUploadTransport::new(client)),
        );
        if uploader.is_none() {
            info!("remote upload not configured");
        }
        Ok(Self::new(Arc::new(config), store, composer, dispatcher, uploader))
    }

    pub fn new(
        config: Arc<AppConfig>,
        store: CaptureStore,
        composer: Composer,
        dispatcher: PrintDispatcher,
        uploader: Option<RemoteUploadClient>,
    ) -> Self {
        Self {
            config,
            store,
            composer: Arc::new(composer),
            writer: PdfWriter::postcard(),
            dispatcher,
            uploader: uploader.map(Arc::new),
            tracker: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &CaptureStore {
        &self.store
    }

    /// Process one capture.
    ///
    /// Fails only if the capture cannot be stored, composed or rendered; in
    /// that case nothing is printed or uploaded. Print and upload problems
    /// are logged and surface in the outcome.
    #[instrument(skip_all, fields(bytes = bytes.len()))]
    pub async fn capture(&self, bytes: Vec<u8>) -> Result<CaptureOutcome> {
        let code = derive_code(&bytes)?;
        info!(%code, "capture received");

        let rendered = self.store_and_render(code.clone(), bytes.clone()).await?;

        let print = self
            .dispatcher
            .dispatch(PrintJob {
                code: &code,
                document: &rendered.document,
                canvas: &rendered.canvas,
            })
            .await;

        let upload_started = self.spawn_upload(&code, bytes);
        let view_url = self
            .uploader
            .as_ref()
            .and_then(|uploader| uploader.fallback_view_url(&code));

        info!(%code, ?print, upload_started, "capture processed");
        Ok(CaptureOutcome {
            code,
            view_url,
            ok: true,
            print,
            upload_started,
        })
    }

    /// Recompose a stored capture and return it as JPEG.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn preview(&self, code: &Code) -> Result<Vec<u8>> {
        let original = self.store.load_original(code)?;
        let composer = self.composer.clone();
        let code = code.clone();
        run_blocking(move || {
            let canvas = composer.compose_bytes(&original, &code)?;
            ImageProcessor::from_rgb(canvas).to_jpeg_bytes(PREVIEW_JPEG_QUALITY)
        })
        .await
    }

    /// Recompose a stored capture and re-render its PDF.
    pub async fn render_document(&self, code: &Code) -> Result<PathBuf> {
        Ok(self.rerender(code).await?.document)
    }

    /// Re-render a stored capture and send it to the print channel again.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn reprint(&self, code: &Code) -> Result<DispatchOutcome> {
        let rendered = self.rerender(code).await?;
        Ok(self
            .dispatcher
            .dispatch(PrintJob {
                code,
                document: &rendered.document,
                canvas: &rendered.canvas,
            })
            .await)
    }

    /// Which artifacts exist for `code`.
    pub fn inspect(&self, code: &Code) -> Result<StoredCapture> {
        self.store.lookup(code)
    }

    /// Stop accepting uploads and wait for those in flight.
    pub async fn shutdown(&self) {
        self.tracker.close();
        if !self.tracker.is_empty() {
            info!(pending = self.tracker.len(), "waiting for uploads to finish");
        }
        self.tracker.wait().await;
    }

    async fn store_and_render(&self, code: Code, bytes: Vec<u8>) -> Result<Rendered> {
        let store = self.store.clone();
        let composer = self.composer.clone();
        let writer = self.writer.clone();
        run_blocking(move || {
            store.save_original(&code, &bytes)?;
            render(&store, &composer, &writer, &code, &bytes)
        })
        .await
    }

    async fn rerender(&self, code: &Code) -> Result<Rendered> {
        let original = self.store.load_original(code)?;
        let store = self.store.clone();
        let composer = self.composer.clone();
        let writer = self.writer.clone();
        let code = code.clone();
        run_blocking(move || render(&store, &composer, &writer, &code, &original)).await
    }

    fn spawn_upload(&self, code: &Code, bytes: Vec<u8>) -> bool {
        let Some(uploader) = self.uploader.clone() else {
            return false;
        };
        let code = code.clone();
        self.tracker.spawn(async move {
            let outcome = uploader.upload(code, bytes).await;
            if outcome.succeeded() {
                info!(code = %outcome.code, attempts = outcome.attempts, view_url = ?outcome.view_url, "upload finished");
            } else {
                warn!(code = %outcome.code, attempts = outcome.attempts, "upload exhausted");
            }
        });
        true
    }
}

/// Compose, save the preview and write the PDF.
fn render(
    store: &CaptureStore,
    composer: &Composer,
    writer: &PdfWriter,
    code: &Code,
    original: &[u8],
) -> Result<Rendered> {
    let canvas = composer.compose_bytes(original, code)?;
    store.save_preview(code, &canvas)?;
    let document = store.document_path(code);
    writer.render_to_file(&canvas, &document)?;
    Ok(Rendered { canvas, document })
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        error!(error = %err, "blocking task failed");
        PostwerkError::Task(err.to_string())
    })?
}
