//! Image processing: pure geometry plus the in-memory transform pipeline.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Geometry** | [`calculations`]: fit / fill / pad / stretch, upscale clamp |
//! | **Resize** | `image::imageops::resize` with the filter from [`select_filter`](calculations::select_filter) |
//! | **Crop / pad** | `imageops::crop_imm`, `imageops::overlay` on a transparent canvas |
//! | **Layers** | `imageops::overlay` (alpha blend) |
//! | **Mask** | per-pixel `min(alpha, mask)` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Serializable types describing a pipeline
//! - **Operations**: The [`Transform`] that runs a pipeline on pixels
//!
//! Nothing here touches the filesystem except [`Ground::load`].

pub mod calculations;
pub mod operations;
mod params;

pub use operations::{Ground, Transform, mask_channel, trim_to_content};
pub use params::{Color, Layer, ParseColorError, Resample, ResizeStyle};
