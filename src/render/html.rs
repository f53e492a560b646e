//! Webpage screenshots through a headless Chrome process.
//!
//! The browser is launched once in [`activate`](Renderer::activate) with a
//! large fixed window. Each render opens a tab, waits for navigation,
//! captures the viewport and trims the uniform border so short pages do not
//! end up as a sliver of content in a sea of white.
//!
//! URL-only: local `.html` files reach this renderer as `file://` URIs.

use super::{Capabilities, RenderError, Renderer};
use crate::imaging::trim_to_content;
use crate::uri::ResourceUri;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions};
use image::DynamicImage;
use tracing::debug;

/// Window size the page is laid out in before trimming.
pub const CANVAS: (u32, u32) = (2048, 2048);

const PAGE_EXTENSIONS: [&str; 3] = ["html", "htm", "xhtml"];

#[derive(Default)]
pub struct HtmlRenderer {
    browser: Option<Browser>,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn failed(e: impl std::fmt::Display) -> RenderError {
    RenderError::Failed(e.to_string())
}

impl Renderer for HtmlRenderer {
    fn name(&self) -> &'static str {
        "html"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::URL
    }

    fn activate(&mut self) -> Result<(), RenderError> {
        let browser = Browser::new(LaunchOptions {
            window_size: Some(CANVAS),
            ..Default::default()
        })
        .map_err(|e| RenderError::Unavailable(format!("chrome: {e}")))?;
        self.browser = Some(browser);
        Ok(())
    }

    fn supports(&self, uri: &ResourceUri) -> bool {
        match uri.scheme() {
            "http" | "https" => true,
            "file" => uri
                .extension()
                .is_some_and(|ext| PAGE_EXTENSIONS.contains(&ext.as_str())),
            _ => false,
        }
    }

    fn render_from_url(
        &self,
        uri: &ResourceUri,
        _size: (u32, u32),
    ) -> Result<DynamicImage, RenderError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| RenderError::Unavailable("chrome not activated".into()))?;

        let tab = browser.new_tab().map_err(failed)?;
        let captured = tab
            .navigate_to(uri.as_str())
            .and_then(|t| t.wait_until_navigated())
            .and_then(|t| t.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true));
        if let Err(e) = tab.close(true) {
            debug!(uri = %uri, error = %e, "could not close tab");
        }
        let png = captured.map_err(failed)?;

        let shot = image::load_from_memory(&png)?.to_rgba8();
        Ok(DynamicImage::ImageRgba8(trim_to_content(&shot)))
    }
}
