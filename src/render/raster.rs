//! General image decoder backed by the `image` crate.
//!
//! Handles every raster format whose decoder is compiled in. File-only: the
//! renderer never fetches remote resources.

use super::{Capabilities, RenderError, Renderer};
use crate::uri::ResourceUri;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions paired with the decoder they need. Only entries whose decoder
/// is enabled in this build end up in [`supported_input_extensions`].
const RASTER_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
    ("ico", ImageFormat::Ico),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    RASTER_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

#[derive(Debug, Default)]
pub struct RasterRenderer;

impl RasterRenderer {
    pub fn new() -> Self {
        Self
    }
}

/// Decode an image, trusting the file's magic bytes over its extension.
fn load_image(path: &Path) -> Result<DynamicImage, RenderError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

impl Renderer for RasterRenderer {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FILE
    }

    fn supports(&self, uri: &ResourceUri) -> bool {
        uri.extension()
            .is_some_and(|ext| supported_input_extensions().contains(&ext.as_str()))
    }

    fn render_from_file(&self, path: &Path, _size: (u32, u32)) -> Result<DynamicImage, RenderError> {
        load_image(path)
    }
}
