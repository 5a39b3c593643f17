//! Text extraction from stored documents.
//!
//! PDFs use their embedded text layer when it is substantial, otherwise each
//! page image is OCR'd. Images are OCR'd directly. OCR needs per-language
//! model files; their absence is reported as `OcrNotConfigured` before any
//! work starts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{IngestError, OcrError, Result};
use crate::models::config::PdfConfig;
use crate::ocr::{LanguageFiles, PageRecognizer, RecognizerLoader};
use crate::pdf::PdfDocument;
use crate::repository::OcrLanguageProvider;

/// Image extensions accepted for direct OCR.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"];

/// Line placed between pages in [`ExtractedText::raw_text`].
pub const PAGE_SEPARATOR: &str = "\n\u{c}\n";

/// Text recovered from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub raw_text: String,
    /// `page_texts[i]` is page `i + 1`.
    pub page_texts: Vec<String>,
    pub is_ocr_used: bool,
}

impl ExtractedText {
    fn from_pages(page_texts: Vec<String>, is_ocr_used: bool) -> Self {
        Self {
            raw_text: page_texts.join(PAGE_SEPARATOR),
            page_texts,
            is_ocr_used,
        }
    }
}

/// Converts stored document bytes into text.
#[async_trait]
pub trait DocumentTextExtractor: Send + Sync {
    async fn extract(
        &self,
        stored_name: &str,
        extension: &str,
        content: Box<dyn AsyncRead + Send + Unpin>,
        cancel: &CancellationToken,
    ) -> Result<ExtractedText>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Image,
}

fn classify(extension: &str) -> Option<FileKind> {
    let extension = extension.trim().trim_start_matches('.').to_lowercase();
    if extension == "pdf" {
        Some(FileKind::Pdf)
    } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Some(FileKind::Image)
    } else {
        None
    }
}

/// One OCR request for a language worker.
struct OcrJob {
    kind: FileKind,
    bytes: Vec<u8>,
    max_pages: usize,
    cancel: CancellationToken,
    reply: oneshot::Sender<Result<Vec<String>>>,
}

/// Workers started so far, one OS thread per language.
///
/// A recognizer is created, used and dropped on its worker thread and never
/// crosses threads, so engines that are neither `Send` nor `Sync` are fine.
#[derive(Default)]
struct OcrWorkers {
    senders: Mutex<HashMap<String, mpsc::UnboundedSender<OcrJob>>>,
}

impl OcrWorkers {
    /// Queue `job` on the worker for `files.language`, starting it (again)
    /// when there is none or the previous one has stopped.
    fn submit(&self, loader: &Arc<dyn RecognizerLoader>, files: &LanguageFiles, mut job: OcrJob) -> Result<()> {
        let mut senders = self
            .senders
            .lock()
            .map_err(|_| OcrError::ModelLoad("OCR worker registry poisoned".to_string()))?;

        if let Some(sender) = senders.get(&files.language) {
            match sender.send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(returned)) => {
                    warn!("OCR worker for '{}' stopped, restarting", files.language);
                    job = returned;
                }
            }
        }

        let sender = spawn_worker(Arc::clone(loader), files.clone())?;
        sender
            .send(job)
            .map_err(|_| OcrError::Recognition("OCR worker stopped".to_string()))?;
        senders.insert(files.language.clone(), sender);
        Ok(())
    }
}

fn spawn_worker(loader: Arc<dyn RecognizerLoader>, files: LanguageFiles) -> Result<mpsc::UnboundedSender<OcrJob>> {
    let (sender, queue) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name(format!("ocr-{}", files.language))
        .spawn(move || run_worker(loader.as_ref(), &files, queue))
        .map_err(|e| OcrError::ModelLoad(format!("cannot start OCR worker: {}", e)))?;
    Ok(sender)
}

/// Worker loop. The engine is loaded on the first job and reused until every
/// sender is gone. A failed load is retried on the next job.
fn run_worker(loader: &dyn RecognizerLoader, files: &LanguageFiles, mut queue: mpsc::UnboundedReceiver<OcrJob>) {
    let mut engine: Option<Box<dyn PageRecognizer>> = None;

    while let Some(job) = queue.blocking_recv() {
        if job.cancel.is_cancelled() {
            let _ = job.reply.send(Err(IngestError::Cancelled));
            continue;
        }

        if engine.is_none() {
            match loader.load(files) {
                Ok(loaded) => engine = Some(loaded),
                Err(e) => {
                    let _ = job.reply.send(Err(e.into()));
                    continue;
                }
            }
        }
        let Some(recognizer) = engine.as_deref() else { continue };

        let result = recognize_pages(recognizer, &job);
        if job.reply.send(result).is_err() {
            debug!("OCR result dropped, caller went away");
        }
    }

    debug!("OCR worker for '{}' stopped", files.language);
}

fn recognize_pages(engine: &dyn PageRecognizer, job: &OcrJob) -> Result<Vec<String>> {
    match job.kind {
        FileKind::Image => {
            let image = image::load_from_memory(&job.bytes).map_err(|e| OcrError::InvalidImage(e.to_string()))?;
            Ok(vec![engine.recognize(&image)?])
        }
        FileKind::Pdf => {
            let pdf = PdfDocument::load(&job.bytes)?;
            let mut pages = pdf.page_count();
            if job.max_pages > 0 && pages as usize > job.max_pages {
                warn!("PDF has {} pages, processing the first {}", pages, job.max_pages);
                pages = job.max_pages as u32;
            }

            let mut texts = Vec::with_capacity(pages as usize);
            for page in 1..=pages {
                if job.cancel.is_cancelled() {
                    return Err(IngestError::Cancelled);
                }
                let image = pdf.page_image(page)?;
                texts.push(engine.recognize(&image)?);
                debug!("OCR'd page {}/{}", page, pages);
            }
            Ok(texts)
        }
    }
}

/// Extractor backed by a [`RecognizerLoader`] and local model files.
pub struct OcrTextExtractor {
    model_dir: PathBuf,
    language: Arc<dyn OcrLanguageProvider>,
    loader: Arc<dyn RecognizerLoader>,
    pdf: PdfConfig,
    workers: OcrWorkers,
}

impl OcrTextExtractor {
    pub fn new(
        model_dir: impl Into<PathBuf>,
        language: Arc<dyn OcrLanguageProvider>,
        loader: Arc<dyn RecognizerLoader>,
    ) -> Self {
        Self {
            model_dir: model_dir.into(),
            language,
            loader,
            pdf: PdfConfig::default(),
            workers: OcrWorkers::default(),
        }
    }

    pub fn with_pdf_config(mut self, pdf: PdfConfig) -> Self {
        self.pdf = pdf;
        self
    }

    fn language_files(&self) -> Result<LanguageFiles> {
        let language = self.language.ocr_language();
        let language = language.trim();
        if language.is_empty() {
            return Err(OcrError::LanguageDataMissing {
                language: String::new(),
                missing: "language preference".to_string(),
            }
            .into());
        }
        Ok(LanguageFiles::locate(&self.model_dir, language)?)
    }

    /// Run OCR on the language's worker thread, racing it against
    /// cancellation.
    async fn run_ocr(&self, kind: FileKind, bytes: Vec<u8>, cancel: &CancellationToken) -> Result<Vec<String>> {
        let files = self.language_files()?;

        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        let (reply, result) = oneshot::channel();
        let job = OcrJob {
            kind,
            bytes,
            max_pages: self.pdf.max_pages,
            cancel: cancel.clone(),
            reply,
        };
        self.workers.submit(&self.loader, &files, job)?;

        tokio::select! {
            _ = cancel.cancelled() => Err(IngestError::Cancelled),
            received = result => received.map_err(|_| OcrError::Recognition("OCR worker stopped".to_string()))?,
        }
    }

    /// Embedded text when configured and long enough to trust.
    fn embedded_pages(&self, bytes: &[u8]) -> Option<Vec<String>> {
        if !self.pdf.prefer_embedded_text {
            return None;
        }
        let pdf = match PdfDocument::load(bytes) {
            Ok(pdf) => pdf,
            Err(e) => {
                debug!("Embedded text unavailable: {}", e);
                return None;
            }
        };
        let pages = trim_pages(pdf.embedded_page_texts().ok()?);
        let length: usize = pages.iter().map(|p| p.chars().count()).sum();
        if length < self.pdf.min_text_length {
            debug!("Embedded text too short ({} chars), falling back to OCR", length);
            return None;
        }
        Some(pages)
    }
}

/// Trim each page, keeping blank pages so indices stay aligned.
fn trim_pages(pages: Vec<String>) -> Vec<String> {
    pages.into_iter().map(|p| p.trim().to_string()).collect()
}

#[async_trait]
impl DocumentTextExtractor for OcrTextExtractor {
    async fn extract(
        &self,
        stored_name: &str,
        extension: &str,
        mut content: Box<dyn AsyncRead + Send + Unpin>,
        cancel: &CancellationToken,
    ) -> Result<ExtractedText> {
        let kind = classify(extension).ok_or_else(|| IngestError::Unsupported(extension.to_string()))?;

        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes).await?;
        debug!("Extracting {} ({} bytes, {:?})", stored_name, bytes.len(), kind);

        if kind == FileKind::Pdf {
            if let Some(pages) = self.embedded_pages(&bytes) {
                info!("Using embedded text for {} ({} pages)", stored_name, pages.len());
                return Ok(ExtractedText::from_pages(pages, false));
            }
        }

        let pages = self.run_ocr(kind, bytes, cancel).await?;
        info!("OCR complete for {} ({} pages)", stored_name, pages.len());
        Ok(ExtractedText::from_pages(pages, true))
    }
}
