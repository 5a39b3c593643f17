//! OCR capability: language data lookup and page recognition.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::{PureOcrEngine, PureOcrLoader};

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// Model files for one recognition language.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageFiles {
    pub language: String,
    pub detection: PathBuf,
    pub recognition: PathBuf,
    pub dictionary: PathBuf,
}

impl LanguageFiles {
    /// Paths for `language` under `model_dir`, whether or not they exist.
    pub fn expected(model_dir: &Path, language: &str) -> Self {
        Self {
            language: language.to_string(),
            detection: model_dir.join(OcrConfig::DETECTION_MODEL),
            recognition: model_dir.join(OcrConfig::recognition_model(language)),
            dictionary: model_dir.join(OcrConfig::dictionary(language)),
        }
    }

    /// Paths for `language`, failing with `LanguageDataMissing` when any
    /// file is absent.
    pub fn locate(model_dir: &Path, language: &str) -> Result<Self, OcrError> {
        let files = Self::expected(model_dir, language);
        let missing: Vec<String> = files
            .paths()
            .into_iter()
            .filter(|p| !p.is_file())
            .map(|p| p.file_name().map_or_else(|| p.display().to_string(), |n| n.to_string_lossy().into_owned()))
            .collect();

        if missing.is_empty() {
            Ok(files)
        } else {
            Err(OcrError::LanguageDataMissing {
                language: language.to_string(),
                missing: missing.join(", "),
            })
        }
    }

    pub fn paths(&self) -> [&Path; 3] {
        [&self.detection, &self.recognition, &self.dictionary]
    }
}

/// Turns one page image into text. Implementations are blocking and need
/// not be `Send`: each one lives on the thread that loaded it.
pub trait PageRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Builds a [`PageRecognizer`] for a language. Called on the thread that
/// will use the recognizer.
pub trait RecognizerLoader: Send + Sync {
    fn load(&self, files: &LanguageFiles) -> Result<Box<dyn PageRecognizer>, OcrError>;
}

/// A detected text region with its coordinates and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Quadrilateral corners (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],
    pub text: String,
    pub confidence: f32,
}

impl TextBox {
    /// Axis-aligned bounding rectangle (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }

    /// Sort top-to-bottom in 20px bands, then left-to-right.
    pub fn sort_by_reading_order(boxes: &mut [TextBox]) {
        boxes.sort_by(|a, b| {
            let (ax, ay, _, _) = a.rect();
            let (bx, by, _, _) = b.rect();
            let row_a = (ay / 20.0) as i32;
            let row_b = (by / 20.0) as i32;
            row_a
                .cmp(&row_b)
                .then_with(|| ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
        });
    }

    /// Join box texts one per line, merging boxes in the same band onto one
    /// line so amounts stay next to their labels.
    pub fn join_lines(boxes: &[TextBox]) -> String {
        let mut lines: Vec<(i32, Vec<&str>)> = Vec::new();
        for b in boxes {
            let text = b.text.trim();
            if text.is_empty() {
                continue;
            }
            let row = (b.rect().1 / 20.0) as i32;
            match lines.last_mut() {
                Some((last_row, parts)) if *last_row == row => parts.push(text),
                _ => lines.push((row, vec![text])),
            }
        }
        lines
            .into_iter()
            .map(|(_, parts)| parts.join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
