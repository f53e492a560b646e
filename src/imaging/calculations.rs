//! Pure calculation functions for thumbnail geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Dimensions are `(width, height)` tuples throughout. Every result is at
//! least 1×1 so callers never have to special-case degenerate sources.

use super::params::{Resample, ResizeStyle};
use image::imageops::FilterType;

/// Sources whose longer edge is below this are treated as pixel art / icons
/// when picking a filter automatically.
pub const NEAREST_NEIGHBOR_LIMIT: u32 = 128;

/// Where a resize lands: the size to scale the source to, then an optional
/// crop window inside that scaled image, then an optional canvas to center
/// the result on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    /// Dimensions to scale the source to.
    pub scaled: (u32, u32),
    /// `(x, y, width, height)` window taken from the scaled image.
    pub crop: Option<(u32, u32, u32, u32)>,
    /// Transparent canvas the result is centered on.
    pub canvas: Option<(u32, u32)>,
}

impl ResizePlan {
    /// Dimensions of the image this plan produces.
    pub fn output(&self) -> (u32, u32) {
        if let Some(canvas) = self.canvas {
            canvas
        } else if let Some((_, _, w, h)) = self.crop {
            (w, h)
        } else {
            self.scaled
        }
    }
}

/// `floor(a * b / c)` in 64-bit, never below 1.
fn scale_axis(a: u32, b: u32, c: u32) -> u32 {
    let v = u64::from(a) * u64::from(b) / u64::from(c.max(1));
    u32::try_from(v).unwrap_or(u32::MAX).max(1)
}

/// True when the width ratio `dw/iw` is the smaller (or equal) of the two.
fn width_limited(source: (u32, u32), target: (u32, u32)) -> bool {
    u64::from(target.0) * u64::from(source.1) <= u64::from(target.1) * u64::from(source.0)
}

/// Scale preserving aspect ratio so the image fits inside `target`.
///
/// Uses `min(dw/iw, dh/ih)`; the other axis may come out smaller than the
/// target.
///
/// # Examples
/// ```
/// # use nailclipper::imaging::calculations::fit_dimensions;
/// // 4:1 banner into a square → full width, quarter height
/// assert_eq!(fit_dimensions((1024, 256), (128, 128)), (128, 32));
/// ```
pub fn fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (iw, ih) = (source.0.max(1), source.1.max(1));
    let (dw, dh) = (target.0.max(1), target.1.max(1));
    if width_limited((iw, ih), (dw, dh)) {
        (dw, scale_axis(ih, dw, iw).min(dh))
    } else {
        (scale_axis(iw, dh, ih).min(dw), dh)
    }
}

/// Scale preserving aspect ratio so the image covers all of `target`.
///
/// Returns the scaled dimensions and the centered crop window of exactly
/// `target` inside them: `((scaled_w, scaled_h), (x, y))`.
pub fn fill_dimensions(source: (u32, u32), target: (u32, u32)) -> ((u32, u32), (u32, u32)) {
    let (iw, ih) = (source.0.max(1), source.1.max(1));
    let (dw, dh) = (target.0.max(1), target.1.max(1));
    let scaled = if width_limited((iw, ih), (dw, dh)) {
        (scale_axis(iw, dh, ih).max(dw), dh)
    } else {
        (dw, scale_axis(ih, dw, iw).max(dh))
    };
    let offset = ((scaled.0 - dw) / 2, (scaled.1 - dh) / 2);
    (scaled, offset)
}

/// Shrink `target` so that resizing never enlarges beyond the source's native
/// resolution.
///
/// Only applies when the source is no larger than the target on both axes.
/// The target keeps its aspect ratio and is scaled down by the factor the
/// given style would otherwise have enlarged the source by, so Fit and Pad
/// reproduce the source 1:1 and Fill crops a native-resolution window.
/// Stretch clamps each axis independently.
pub fn clamp_target(source: (u32, u32), target: (u32, u32), style: ResizeStyle) -> (u32, u32) {
    let (iw, ih) = (source.0.max(1), source.1.max(1));
    let (dw, dh) = (target.0.max(1), target.1.max(1));
    if iw > dw || ih > dh {
        return (dw, dh);
    }
    // Which axis the style's scale factor comes from
    let by_width = match style {
        ResizeStyle::Fit | ResizeStyle::Pad => width_limited((iw, ih), (dw, dh)),
        ResizeStyle::Fill => !width_limited((iw, ih), (dw, dh)),
        ResizeStyle::Stretch => return (dw.min(iw), dh.min(ih)),
    };
    if by_width {
        (iw, scale_axis(dh, iw, dw))
    } else {
        (scale_axis(dw, ih, dh), ih)
    }
}

/// Compute how a source of `source` dimensions becomes a `target` thumbnail.
pub fn plan_resize(
    source: (u32, u32),
    target: (u32, u32),
    style: ResizeStyle,
    upscale: bool,
) -> ResizePlan {
    let target = if upscale {
        (target.0.max(1), target.1.max(1))
    } else {
        clamp_target(source, target, style)
    };
    match style {
        ResizeStyle::Fit => ResizePlan {
            scaled: fit_dimensions(source, target),
            crop: None,
            canvas: None,
        },
        ResizeStyle::Fill => {
            let (scaled, (x, y)) = fill_dimensions(source, target);
            ResizePlan {
                scaled,
                crop: Some((x, y, target.0, target.1)),
                canvas: None,
            }
        }
        ResizeStyle::Stretch => ResizePlan {
            scaled: target,
            crop: None,
            canvas: None,
        },
        ResizeStyle::Pad => ResizePlan {
            scaled: fit_dimensions(source, target),
            crop: None,
            canvas: Some(target),
        },
    }
}

/// Offset that centers `inner` inside `outer`, floored.
///
/// Negative when `inner` is larger, which `image::imageops::overlay` clips.
pub fn center_offset(outer: (u32, u32), inner: (u32, u32)) -> (i64, i64) {
    (
        (outer.0 as i64 - inner.0 as i64).div_euclid(2),
        (outer.1 as i64 - inner.1 as i64).div_euclid(2),
    )
}

/// Pick the interpolation filter for a resize.
///
/// `Auto` uses nearest-neighbor for small sources when upscaling is allowed
/// (keeps icons and pixel art crisp) and bilinear otherwise.
pub fn select_filter(resample: Resample, source: (u32, u32), upscale: bool) -> FilterType {
    match resample {
        Resample::Auto => {
            if source.0.max(source.1) < NEAREST_NEIGHBOR_LIMIT && upscale {
                FilterType::Nearest
            } else {
                FilterType::Triangle
            }
        }
        Resample::Nearest => FilterType::Nearest,
        Resample::Bilinear => FilterType::Triangle,
        Resample::Bicubic => FilterType::CatmullRom,
        Resample::Lanczos => FilterType::Lanczos3,
    }
}
