//! SVG rasterization through resvg.
//!
//! The font database is the expensive part, so it is loaded in
//! [`activate`](Renderer::activate) rather than on construction. Documents
//! are drawn straight at the fitted target size instead of being rasterized
//! at their intrinsic size and scaled afterwards.

use super::{Capabilities, RenderError, Renderer};
use crate::imaging::calculations::fit_dimensions;
use crate::uri::ResourceUri;
use image::{DynamicImage, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, Options, Tree};
use std::path::Path;
use std::sync::Arc;

pub const SVG_EXTENSIONS: [&str; 2] = ["svg", "svgz"];

#[derive(Default)]
pub struct SvgRenderer {
    options: Options<'static>,
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// tiny-skia pixmaps are premultiplied; `image` wants straight alpha.
fn pixmap_to_rgba(pixmap: &Pixmap) -> Option<RgbaImage> {
    let data = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
}

impl Renderer for SvgRenderer {
    fn name(&self) -> &'static str {
        "svg"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FILE
    }

    fn activate(&mut self) -> Result<(), RenderError> {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        self.options.fontdb = Arc::new(fontdb);
        Ok(())
    }

    fn supports(&self, uri: &ResourceUri) -> bool {
        uri.extension()
            .is_some_and(|ext| SVG_EXTENSIONS.contains(&ext.as_str()))
    }

    fn render_from_file(&self, path: &Path, size: (u32, u32)) -> Result<DynamicImage, RenderError> {
        let data = std::fs::read(path)?;
        let tree = Tree::from_data(&data, &self.options)
            .map_err(|e| RenderError::Failed(format!("{}: {e}", path.display())))?;

        let intrinsic = tree.size();
        let natural = (
            intrinsic.width().ceil().max(1.0) as u32,
            intrinsic.height().ceil().max(1.0) as u32,
        );
        let (w, h) = fit_dimensions(natural, size);

        let mut pixmap = Pixmap::new(w, h)
            .ok_or_else(|| RenderError::Failed(format!("cannot allocate {w}x{h} pixmap")))?;
        let transform = Transform::from_scale(
            w as f32 / intrinsic.width(),
            h as f32 / intrinsic.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap_to_rgba(&pixmap)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| RenderError::Failed("pixmap size mismatch".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10">
        <rect x="0" y="0" width="20" height="10" fill="#ff0000"/>
    </svg>"##;

    fn write_svg(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("shape.svg");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn renders_at_fitted_target_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_svg(tmp.path(), SQUARE);

        let img = SvgRenderer::new()
            .render_from_file(&path, (128, 128))
            .unwrap()
            .to_rgba8();
        assert_eq!(img.dimensions(), (128, 64));
        assert_eq!(img.get_pixel(64, 32).0, [255, 0, 0, 255]);
    }

    #[test]
    fn output_is_straight_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_svg(
            tmp.path(),
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
                <rect width="10" height="10" fill="#ff0000" fill-opacity="0.5"/>
            </svg>"##,
        );

        let img = SvgRenderer::new()
            .render_from_file(&path, (10, 10))
            .unwrap()
            .to_rgba8();
        let px = img.get_pixel(5, 5).0;
        assert!(px[0] >= 250, "red was left premultiplied: {px:?}");
        assert!((120..=135).contains(&px[3]));
    }

    #[test]
    fn malformed_document_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_svg(tmp.path(), "<svg");
        assert!(matches!(
            SvgRenderer::new().render_from_file(&path, (10, 10)),
            Err(RenderError::Failed(_))
        ));
    }

    #[test]
    fn supports_svg_and_svgz_only() {
        let r = SvgRenderer::new();
        assert!(r.supports(&ResourceUri::parse("/tmp/a.svg").unwrap()));
        assert!(r.supports(&ResourceUri::parse("/tmp/a.SVGZ").unwrap()));
        assert!(!r.supports(&ResourceUri::parse("/tmp/a.png").unwrap()));
    }
}
