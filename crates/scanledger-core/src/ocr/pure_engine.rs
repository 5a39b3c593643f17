//! OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).

use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use super::{LanguageFiles, PageRecognizer, RecognizerLoader, TextBox};
use crate::error::OcrError;

/// Placeholder the recognizer emits for characters outside its dictionary.
const UNKNOWN_TOKEN: &str = "[UNK]";

/// A loaded detection + recognition pipeline for one language.
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    keep_unk: bool,
}

impl PureOcrEngine {
    pub fn load(files: &LanguageFiles, keep_unk: bool) -> Result<Self, OcrError> {
        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&files.detection)
            .rec_model_path(&files.recognition)
            .dictionary_path(&files.dictionary)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded OCR engine for '{}'", files.language);
        Ok(Self { engine, keep_unk })
    }

    /// Recognize text regions, sorted into reading order.
    pub fn text_boxes(&self, image: &DynamicImage) -> Result<Vec<TextBox>, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut boxes: Vec<TextBox> = results
            .iter()
            .map(|r| TextBox {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace(UNKNOWN_TOKEN, " ")
                },
                confidence: r.confidence,
            })
            .collect();
        TextBox::sort_by_reading_order(&mut boxes);

        debug!(
            "OCR on {}x{} image: {} text boxes in {}ms",
            width,
            height,
            boxes.len(),
            start.elapsed().as_millis()
        );
        Ok(boxes)
    }
}

impl PageRecognizer for PureOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        Ok(TextBox::join_lines(&self.text_boxes(image)?))
    }
}

/// Loads [`PureOcrEngine`]s from model files on disk.
#[derive(Debug, Clone, Default)]
pub struct PureOcrLoader {
    pub keep_unk: bool,
}

impl RecognizerLoader for PureOcrLoader {
    fn load(&self, files: &LanguageFiles) -> Result<Box<dyn PageRecognizer>, OcrError> {
        Ok(Box::new(PureOcrEngine::load(files, self.keep_unk)?))
    }
}

/// First four exterior points of the polygon as `[x1, y1, ..., x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
