//! PDF loading, embedded text and page images, using lopdf and pdf-extract.

mod images;

use image::{DynamicImage, GenericImageView};
use lopdf::Document;
use tracing::debug;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// A parsed PDF held in memory.
pub struct PdfDocument {
    document: Document,
    raw_data: Vec<u8>,
}

impl PdfDocument {
    /// Parse PDF bytes. Documents encrypted with an empty user password are
    /// decrypted transparently.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract reads bytes, so keep a decrypted copy for it.
            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(Self { document, raw_data })
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Text layer, one entry per page in page order. Pages without text
    /// yield empty strings.
    pub fn embedded_page_texts(&self) -> Result<Vec<String>> {
        pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    /// Raster image for a 1-based page.
    ///
    /// Scanned PDFs carry one full-page image per page; when a page holds
    /// several the largest wins. Pages without their own image fall back to
    /// the n-th image in the document, which covers producers that share
    /// resources across pages.
    pub fn page_image(&self, page: u32) -> Result<DynamicImage> {
        let pages = self.document.get_pages();
        let page_id = *pages.get(&page).ok_or(PdfError::NoPageImage(page))?;

        let largest = images::page_images(&self.document, page_id)
            .into_iter()
            .max_by_key(|img| {
                let (w, h) = img.dimensions();
                u64::from(w) * u64::from(h)
            });
        if let Some(image) = largest {
            return Ok(image);
        }

        debug!("No XObject images on page {}, scanning document", page);
        images::document_images(&self.document)
            .into_iter()
            .nth(page.saturating_sub(1) as usize)
            .ok_or(PdfError::NoPageImage(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Object, Stream, dictionary};
    use pretty_assertions::assert_eq;

    /// One page holding a 2x2 grayscale image.
    fn image_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8
            },
            vec![0, 255, 255, 0],
        );
        let image_id = doc.add_object(image);
        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! { "Im0" => image_id }
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"q 2 0 0 2 0 0 cm /Im0 Do Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 2.into(), 2.into()]
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_page_image_decodes_gray_xobject() {
        let pdf = PdfDocument::load(&image_pdf()).unwrap();
        assert_eq!(pdf.page_count(), 1);

        let image = pdf.page_image(1).unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.to_luma8().into_raw(), vec![0, 255, 255, 0]);
    }

    #[test]
    fn test_missing_page() {
        let pdf = PdfDocument::load(&image_pdf()).unwrap();
        assert!(matches!(pdf.page_image(3), Err(PdfError::NoPageImage(3))));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(PdfDocument::load(b"not a pdf"), Err(PdfError::Parse(_))));
    }
}
