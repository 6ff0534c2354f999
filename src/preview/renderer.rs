//! Page rasterization

use crate::error::{Error, Result};
use base64::Engine;
use pdfium_render::prelude::*;

/// Rendered page image data
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// Page number (1-indexed)
    pub page: u32,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Base64-encoded PNG image data
    pub data_base64: String,
    /// MIME type (always "image/png")
    pub mime_type: String,
}

/// Turns document bytes into page rasters.
///
/// Implementations are blocking; callers run them off the async executor.
pub trait PageRenderer {
    /// Number of pages in the document
    fn page_count(&self, data: &[u8]) -> Result<u32>;

    /// Rasterize one page (1-indexed) at `scale` times its native size
    fn render_page(&self, data: &[u8], page_number: u32, scale: f32) -> Result<RenderedPage>;
}

/// [`PageRenderer`] backed by the PDFium library
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    /// Directories searched for the PDFium shared library before the system path
    pub library_dirs: Vec<String>,
}

impl Default for PdfiumRenderer {
    fn default() -> Self {
        Self {
            library_dirs: vec!["./".to_string(), "/opt/pdfium/lib".to_string()],
        }
    }
}

impl PdfiumRenderer {
    fn bind(&self) -> Result<Pdfium> {
        for dir in &self.library_dirs {
            match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)) {
                Ok(bindings) => return Ok(Pdfium::new(bindings)),
                Err(e) => tracing::trace!(dir = %dir, error = %e, "PDFium not found"),
            }
        }
        let bindings = Pdfium::bind_to_system_library().map_err(|e| Error::Render {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;
        Ok(Pdfium::new(bindings))
    }
}

fn check_pdf_header(data: &[u8]) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::Render {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    Ok(())
}

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, data: &[u8]) -> Result<u32> {
        check_pdf_header(data)?;
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(|e| Error::Render {
                reason: format!("{}", e),
            })?;
        Ok(document.pages().len() as u32)
    }

    fn render_page(&self, data: &[u8], page_number: u32, scale: f32) -> Result<RenderedPage> {
        check_pdf_header(data)?;
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(|e| Error::Render {
                reason: format!("{}", e),
            })?;

        let pages = document.pages();
        let page_count = pages.len() as u32;
        if page_number < 1 || page_number > page_count {
            return Err(Error::Render {
                reason: format!("Page {} out of bounds (total: {})", page_number, page_count),
            });
        }

        let page = pages
            .get((page_number - 1) as u16)
            .map_err(|e| Error::Render {
                reason: format!("Failed to get page {}: {}", page_number, e),
            })?;

        let config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| Error::Render {
                reason: format!("Failed to render page {}: {}", page_number, e),
            })?;

        let dynamic_image = bitmap.as_image();
        let width = dynamic_image.width();
        let height = dynamic_image.height();

        // Encode as PNG
        let mut png_bytes = Vec::new();
        dynamic_image
            .write_to(
                &mut std::io::Cursor::new(&mut png_bytes),
                image::ImageFormat::Png,
            )
            .map_err(|e| Error::Render {
                reason: format!("Failed to encode page {} as PNG: {}", page_number, e),
            })?;

        Ok(RenderedPage {
            page: page_number,
            width,
            height,
            data_base64: base64::engine::general_purpose::STANDARD.encode(&png_bytes),
            mime_type: "image/png".to_string(),
        })
    }
}
