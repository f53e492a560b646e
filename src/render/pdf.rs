//! PDF first-page rasterization through pdfium.
//!
//! pdfium is a C library loaded at runtime, so a missing `libpdfium` is
//! discovered in [`activate`](Renderer::activate) and makes the renderer
//! unavailable rather than failing every PDF individually.

use super::{Capabilities, RenderError, Renderer};
use crate::uri::ResourceUri;
use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::{PdfRenderConfig, Pdfium};
use std::path::Path;

#[derive(Default)]
pub struct PdfRenderer {
    pdfium: Option<Pdfium>,
}

impl PdfRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn failed(e: impl std::fmt::Display) -> RenderError {
    RenderError::Failed(e.to_string())
}

impl Renderer for PdfRenderer {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FILE
    }

    fn activate(&mut self) -> Result<(), RenderError> {
        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| RenderError::Unavailable(format!("libpdfium: {e}")))?;
        self.pdfium = Some(Pdfium::new(bindings));
        Ok(())
    }

    fn supports(&self, uri: &ResourceUri) -> bool {
        uri.extension().is_some_and(|ext| ext == "pdf")
    }

    fn render_from_file(&self, path: &Path, size: (u32, u32)) -> Result<DynamicImage, RenderError> {
        let pdfium = self
            .pdfium
            .as_ref()
            .ok_or_else(|| RenderError::Unavailable("pdfium not activated".into()))?;

        let config = PdfRenderConfig::new()
            .set_target_width(size.0.min(i32::MAX as u32) as i32)
            .set_maximum_height(size.1.min(i32::MAX as u32) as i32);

        let document = pdfium.load_pdf_from_file(path, None).map_err(failed)?;
        let page = document.pages().first().map_err(failed)?;
        let bitmap = page.render_with_config(&config).map_err(failed)?;

        let (w, h) = (bitmap.width() as u32, bitmap.height() as u32);
        RgbaImage::from_raw(w, h, bitmap.as_rgba_bytes())
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| failed("bitmap size mismatch"))
    }
}
