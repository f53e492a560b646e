//! # nailclipper
//!
//! A thumbnail cache for local files and remote resources, following the
//! Freedesktop thumbnail convention. Ask for `(resource, size)`; get back the
//! path of a PNG preview, rendered on demand and reused until the source
//! changes.
//!
//! # Architecture
//!
//! ```text
//! input ─→ ResourceUri ─→ CacheLayout ─→ fresh?  ─→ Cached
//!                                     └→ render ─→ Transform ─→ PNG + provenance ─→ Generated
//!                                                └→ (all renderers failed) ─→ failure marker ─→ Failed
//! ```
//!
//! The cache is nothing but the filesystem: the path is derived from the MD5
//! of the normalized URI, and every artifact carries its own provenance in
//! PNG text chunks. There is no index to corrupt or rebuild.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`uri`] | Normalize paths and URLs into one canonical [`uri::ResourceUri`] |
//! | [`types`] | [`types::SizeClass`]: the four standard sizes and custom `WxH` |
//! | [`imaging`] | Pure pixel work: fit/fill/pad/stretch geometry, layers, masks |
//! | [`render`] | Renderer trait, capability dispatch, raster/SVG/PDF/HTML/icon backends |
//! | [`metadata`] | `Thumb::*` PNG text chunks: write on encode, read for refresh |
//! | [`refresh`] | When an existing artifact is stale |
//! | [`cache`] | Cache roots, path derivation, atomic writes, batch stats |
//! | [`compliance`] | Freedesktop compliance profiles, checked at construction |
//! | [`config`] | `config.toml` loading, merging, validation and presets |
//! | [`manager`] | [`manager::ThumbnailManager`]: the lookup state machine |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Render Failures Are Outcomes
//!
//! A resource nothing can render is a normal answer, not an error.
//! [`manager::ThumbnailManager::get_thumbnail`] returns
//! [`manager::Thumbnail::Failed`] and records a failure marker so the next
//! lookup does not pay for the same failed render again. `Err` is reserved
//! for a cache that cannot be written.
//!
//! ## Atomic Writes
//!
//! Artifacts are written to a temporary file next to their final path and
//! renamed into place. Concurrent lookups may render the same thumbnail
//! twice, but a reader never observes a half-written PNG.
//!
//! ## Lazy Backends
//!
//! Renderers are cheap to construct. Expensive state (a headless browser, a
//! pdfium binding, the system font database) is created by
//! [`render::Renderer::activate`] the first time the renderer is needed, at
//! most once. A backend that cannot start is skipped for the rest of the
//! manager's life.

pub mod cache;
pub mod compliance;
pub mod config;
pub mod imaging;
pub mod manager;
pub mod metadata;
pub mod output;
pub mod refresh;
pub mod render;
pub mod types;
pub mod uri;

#[cfg(test)]
pub(crate) mod test_helpers;
