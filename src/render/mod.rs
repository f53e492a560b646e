//! Renderer trait, capability flags and the dispatching registry.
//!
//! A renderer turns a resource into a raw in-memory image. Every renderer
//! declares which entry points it has through [`Capabilities`]; the
//! [`Registry`] uses those flags (never runtime probing) to pick how to call
//! it:
//!
//! | Resource | `supports_file` | `supports_url` | Call |
//! |---|---|---|---|
//! | local file | yes | any | `render_from_file(path)` |
//! | local file | no | yes | `render_from_url(file://...)` |
//! | remote URL | any | yes | `render_from_url(uri)` |
//! | remote URL | yes | no | skipped |
//!
//! Renderers have a two-phase lifecycle. Construction is cheap and never
//! touches the backend; [`Renderer::activate`] establishes backend state (a
//! font database, a pdfium binding, a browser process) and runs at most once
//! per renderer, the first time it accepts a resource. Renderers that reject
//! a resource, or lack the entry point it needs, are passed over without
//! being activated. A renderer whose activation fails is marked
//! unavailable for the lifetime of the registry and skipped from then on.
//!
//! Dispatch walks the caller's priority order. The first renderer that
//! produces a non-empty image wins; a failure only moves on to the next
//! candidate.

use crate::uri::ResourceUri;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[cfg(feature = "html")]
pub mod html;
pub mod icons;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod raster;
#[cfg(feature = "svg")]
pub mod svg;

pub use icons::{IconCategory, IconRenderer, IconSet};
pub use raster::RasterRenderer;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("resource not supported")]
    Unsupported,
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("render failed: {0}")]
    Failed(String),
}

/// Which entry points a renderer implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_file: bool,
    pub supports_url: bool,
}

impl Capabilities {
    pub const FILE: Capabilities = Capabilities {
        supports_file: true,
        supports_url: false,
    };
    pub const URL: Capabilities = Capabilities {
        supports_file: false,
        supports_url: true,
    };
    pub const BOTH: Capabilities = Capabilities {
        supports_file: true,
        supports_url: true,
    };
}

/// A rendering backend.
///
/// Implementations override whichever of `render_from_file` /
/// `render_from_url` their [`Capabilities`] advertise; the defaults report
/// [`RenderError::Unsupported`].
pub trait Renderer: Send {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Establish backend state. Called once, before the first render.
    fn activate(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Cheap pre-check, usually by extension or scheme.
    fn supports(&self, uri: &ResourceUri) -> bool;

    fn render_from_file(&self, _path: &Path, _size: (u32, u32)) -> Result<DynamicImage, RenderError> {
        Err(RenderError::Unsupported)
    }

    fn render_from_url(
        &self,
        _uri: &ResourceUri,
        _size: (u32, u32),
    ) -> Result<DynamicImage, RenderError> {
        Err(RenderError::Unsupported)
    }
}

/// The built-in renderer slots, in default priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Raster,
    Svg,
    Pdf,
    Html,
    Icons,
}

impl RendererKind {
    pub const ALL: [RendererKind; 5] = [
        RendererKind::Raster,
        RendererKind::Svg,
        RendererKind::Pdf,
        RendererKind::Html,
        RendererKind::Icons,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RendererKind::Raster => "raster",
            RendererKind::Svg => "svg",
            RendererKind::Pdf => "pdf",
            RendererKind::Html => "html",
            RendererKind::Icons => "icons",
        }
    }

    /// Whether this build was compiled with the backend for this slot.
    pub fn compiled_in(self) -> bool {
        match self {
            RendererKind::Raster | RendererKind::Icons => true,
            RendererKind::Svg => cfg!(feature = "svg"),
            RendererKind::Pdf => cfg!(feature = "pdf"),
            RendererKind::Html => cfg!(feature = "html"),
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One render call: which resource, at what target size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub uri: ResourceUri,
    pub size: (u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Pending,
    Ready,
    Unavailable,
}

struct Slot {
    renderer: Box<dyn Renderer>,
    state: Activation,
}

/// Renderers keyed by slot, each activated at most once.
#[derive(Default)]
pub struct Registry {
    slots: BTreeMap<RendererKind, Slot>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.slots
                    .iter()
                    .map(|(kind, slot)| (kind, (slot.renderer.name(), slot.state))),
            )
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every backend compiled into this build. The icon renderer is only
    /// registered when an icon set is given.
    pub fn with_defaults(icons: Option<IconSet>) -> Self {
        let mut registry = Self::new();
        registry.register(RendererKind::Raster, Box::new(RasterRenderer::new()));
        #[cfg(feature = "svg")]
        registry.register(RendererKind::Svg, Box::new(svg::SvgRenderer::new()));
        #[cfg(feature = "pdf")]
        registry.register(RendererKind::Pdf, Box::new(pdf::PdfRenderer::new()));
        #[cfg(feature = "html")]
        registry.register(RendererKind::Html, Box::new(html::HtmlRenderer::new()));
        if let Some(set) = icons {
            registry.register(RendererKind::Icons, Box::new(IconRenderer::new(set)));
        }
        registry
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_renderer(mut self, kind: RendererKind, renderer: Box<dyn Renderer>) -> Self {
        self.register(kind, renderer);
        self
    }

    /// Put `renderer` in `kind`'s slot, replacing (and forgetting the
    /// activation state of) whatever was there.
    pub fn register(&mut self, kind: RendererKind, renderer: Box<dyn Renderer>) {
        self.slots.insert(
            kind,
            Slot {
                renderer,
                state: Activation::Pending,
            },
        );
    }

    pub fn is_registered(&self, kind: RendererKind) -> bool {
        self.slots.contains_key(&kind)
    }

    /// Activate `kind` if that has not been tried yet. Returns whether the
    /// renderer is usable.
    pub fn activate(&mut self, kind: RendererKind) -> bool {
        let Some(slot) = self.slots.get_mut(&kind) else {
            return false;
        };
        if slot.state == Activation::Pending {
            slot.state = match slot.renderer.activate() {
                Ok(()) => {
                    info!(renderer = slot.renderer.name(), "renderer activated");
                    Activation::Ready
                }
                Err(e) => {
                    warn!(renderer = slot.renderer.name(), error = %e, "renderer unavailable");
                    Activation::Unavailable
                }
            };
        }
        slot.state == Activation::Ready
    }

    /// Render `request` with the first renderer in `order` that succeeds.
    ///
    /// Returns the image and the slot that produced it. When nothing was
    /// even attempted the error is [`RenderError::Unsupported`]; otherwise
    /// it is the last renderer's error.
    pub fn render(
        &mut self,
        request: &RenderRequest,
        order: &[RendererKind],
    ) -> Result<(DynamicImage, RendererKind), RenderError> {
        let local = request.uri.local_path();
        let mut last_error = None;

        for &kind in order {
            let Some(slot) = self.slots.get(&kind) else {
                continue;
            };
            let renderer = &slot.renderer;
            let caps = renderer.capabilities();
            let by_file = local.is_some() && caps.supports_file;
            if !by_file && !caps.supports_url {
                continue;
            }
            if !renderer.supports(&request.uri) {
                debug!(renderer = renderer.name(), uri = %request.uri, "not supported");
                continue;
            }
            // Only a renderer that will actually be called gets activated.
            if !self.activate(kind) {
                continue;
            }
            let Some(slot) = self.slots.get(&kind) else {
                continue;
            };
            let renderer = &slot.renderer;

            let result = match &local {
                Some(path) if by_file => renderer.render_from_file(path, request.size),
                _ => renderer.render_from_url(&request.uri, request.size),
            };

            match result {
                Ok(img) if img.width() > 0 && img.height() > 0 => {
                    debug!(renderer = renderer.name(), uri = %request.uri, "rendered");
                    return Ok((img, kind));
                }
                Ok(_) => {
                    debug!(renderer = renderer.name(), uri = %request.uri, "empty image");
                    last_error = Some(RenderError::Failed(format!(
                        "{} produced an empty image",
                        renderer.name()
                    )));
                }
                Err(e) => {
                    debug!(renderer = renderer.name(), uri = %request.uri, error = %e, "render failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(RenderError::Unsupported))
    }
}
