//! Error types for the scanledger-core library.

use scanledger_inference::InferenceError;
use thiserror::Error;

/// Main error type for ingestion operations.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Caller input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced document, category or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation conflicts with existing state (duplicate upload,
    /// reparsing a confirmed document).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Filesystem or repository fault.
    #[error("storage error: {0}")]
    Storage(String),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Language-model error from the inference layer.
    #[error("LLM error: {0}")]
    Inference(#[from] InferenceError),

    /// The operation needs the language model but it is switched off.
    #[error("this operation requires the language model to be enabled")]
    LlmRequired,

    /// File type the extraction adapter cannot handle.
    #[error("unsupported file type: {0}")]
    Unsupported(String),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

/// Coarse classification of [`IngestError`] for callers that map errors to
/// user-facing messages or exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    NotConfigured,
    NotSupported,
    OcrNotConfigured,
    OcrFailed,
    LlmFailed,
    LlmRequired,
    Storage,
    Cancelled,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Unsupported(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Ocr(OcrError::LanguageDataMissing { .. }) => ErrorKind::OcrNotConfigured,
            Self::Ocr(_) | Self::Pdf(_) => ErrorKind::OcrFailed,
            Self::Inference(e) => match e {
                InferenceError::NotConfigured(_) => ErrorKind::NotConfigured,
                InferenceError::NotSupported(_) => ErrorKind::NotSupported,
                _ => ErrorKind::LlmFailed,
            },
            Self::LlmRequired => ErrorKind::LlmRequired,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::NotFound(e.to_string())
        } else {
            IngestError::Storage(e.to_string())
        }
    }
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// No raster image could be recovered for a page.
    #[error("no image found on page {0}")]
    NoPageImage(u32),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Detection/recognition models or dictionary for a language are absent.
    #[error("OCR language data for '{language}' not installed (missing {missing})")]
    LanguageDataMissing { language: String, missing: String },

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The engine failed on an image.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image bytes could not be decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for the scanledger-core library.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let missing = IngestError::from(OcrError::LanguageDataMissing {
            language: "latin".to_string(),
            missing: "det.onnx".to_string(),
        });
        assert_eq!(missing.kind(), ErrorKind::OcrNotConfigured);

        assert_eq!(IngestError::from(OcrError::Recognition("x".into())).kind(), ErrorKind::OcrFailed);
        assert_eq!(IngestError::from(PdfError::NoPages).kind(), ErrorKind::OcrFailed);
        assert_eq!(IngestError::Unsupported("docx".into()).kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_inference_errors_normalize() {
        let kind = |e: InferenceError| IngestError::from(e).kind();
        assert_eq!(kind(InferenceError::NotConfigured("x".into())), ErrorKind::NotConfigured);
        assert_eq!(kind(InferenceError::NotSupported("x".into())), ErrorKind::NotSupported);
        assert_eq!(kind(InferenceError::Timeout(5)), ErrorKind::LlmFailed);
        assert_eq!(kind(InferenceError::Cancelled), ErrorKind::LlmFailed);
        assert_eq!(kind(InferenceError::Failed("HTTP 500".into())), ErrorKind::LlmFailed);
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = IngestError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = IngestError::from(std::io::Error::other("disk full"));
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
