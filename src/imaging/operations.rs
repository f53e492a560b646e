//! The transform pipeline.
//!
//! Turns one raw rendered image into a normalized thumbnail. Every step is a
//! pure function on an in-memory RGBA buffer:
//!
//! ```text
//! raw ─→ RGBA ─→ resize (plan_resize) ─→ over background ─→ under foreground ─→ mask
//! ```
//!
//! Layers are sized to the resized image. For Fit that is the fitted size;
//! for Fill, Stretch and Pad it is exactly the target. Image layers are
//! scaled with Fill so they always cover the whole result.
//!
//! The mask does not blend. Each output pixel keeps its colour and takes
//! `min(alpha, mask)` as its alpha, so a mask can only make things more
//! transparent.

use super::calculations::{center_offset, plan_resize, select_filter};
use super::params::{Color, Layer, Resample, ResizeStyle};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, ImageError, Luma, RgbaImage};
use std::path::Path;

/// A layer ready to composite: a colour or a decoded image.
#[derive(Debug, Clone)]
pub enum Ground {
    Color(Color),
    Image(RgbaImage),
}

impl Ground {
    /// Resolve a configured layer, decoding image files relative to `base`.
    pub fn load(layer: &Layer, base: &Path) -> Result<Self, ImageError> {
        match layer {
            Layer::Color(c) => Ok(Ground::Color(*c)),
            Layer::Image(path) => Ok(Ground::Image(image::open(base.join(path))?.to_rgba8())),
        }
    }

    /// Render this layer at exactly `size`, scaling image layers with the
    /// pipeline's resample mode.
    fn build(&self, size: (u32, u32), resample: Resample, upscale: bool) -> RgbaImage {
        match self {
            Ground::Color(c) => RgbaImage::from_pixel(size.0, size.1, c.rgba()),
            Ground::Image(img) => {
                fill_to(img, size, select_filter(resample, img.dimensions(), upscale))
            }
        }
    }

    fn is_noop(&self) -> bool {
        matches!(self, Ground::Color(c) if c.is_transparent())
    }
}

/// A fully resolved pipeline: everything needed to turn a raw image into a
/// thumbnail, with layer and mask images already decoded.
#[derive(Debug, Clone, Default)]
pub struct Transform {
    pub style: ResizeStyle,
    pub resample: Resample,
    pub upscale: bool,
    pub background: Option<Ground>,
    pub foreground: Option<Ground>,
    pub mask: Option<GrayImage>,
}

impl Transform {
    /// Run the whole pipeline for one target size.
    pub fn apply(&self, raw: DynamicImage, target: (u32, u32)) -> RgbaImage {
        let rgba = raw.to_rgba8();
        let mut img = self.resize(rgba, target);

        if let Some(bg) = self.background.as_ref().filter(|g| !g.is_noop()) {
            let mut canvas = bg.build(img.dimensions(), self.resample, self.upscale);
            let (x, y) = center_offset(canvas.dimensions(), img.dimensions());
            imageops::overlay(&mut canvas, &img, x, y);
            img = canvas;
        }

        if let Some(fg) = self.foreground.as_ref().filter(|g| !g.is_noop()) {
            let layer = fg.build(img.dimensions(), self.resample, self.upscale);
            let (x, y) = center_offset(img.dimensions(), layer.dimensions());
            imageops::overlay(&mut img, &layer, x, y);
        }

        if let Some(mask) = &self.mask {
            let filter = select_filter(self.resample, mask.dimensions(), self.upscale);
            apply_mask(&mut img, mask, filter);
        }

        img
    }

    /// Geometry step only: scale, then crop (Fill) or pad (Pad).
    pub fn resize(&self, rgba: RgbaImage, target: (u32, u32)) -> RgbaImage {
        let source = rgba.dimensions();
        let plan = plan_resize(source, target, self.style, self.upscale);
        let filter = select_filter(self.resample, source, self.upscale);

        let scaled = if plan.scaled == source {
            rgba
        } else {
            imageops::resize(&rgba, plan.scaled.0, plan.scaled.1, filter)
        };

        let cropped = match plan.crop {
            Some((x, y, w, h)) if (w, h) != scaled.dimensions() => {
                imageops::crop_imm(&scaled, x, y, w, h).to_image()
            }
            _ => scaled,
        };

        match plan.canvas {
            Some((w, h)) if (w, h) != cropped.dimensions() => {
                let mut canvas = RgbaImage::new(w, h);
                let (x, y) = center_offset((w, h), cropped.dimensions());
                imageops::overlay(&mut canvas, &cropped, x, y);
                canvas
            }
            _ => cropped,
        }
    }
}

/// Scale `img` to cover `size`, then center-crop to exactly `size`.
fn fill_to(img: &RgbaImage, size: (u32, u32), filter: FilterType) -> RgbaImage {
    if img.dimensions() == size {
        return img.clone();
    }
    let plan = plan_resize(img.dimensions(), size, ResizeStyle::Fill, true);
    let scaled = imageops::resize(img, plan.scaled.0, plan.scaled.1, filter);
    match plan.crop {
        Some((x, y, w, h)) => imageops::crop_imm(&scaled, x, y, w, h).to_image(),
        None => scaled,
    }
}

/// Extract the channel a mask image contributes: its alpha if it has one,
/// otherwise its luminance.
pub fn mask_channel(img: &DynamicImage) -> GrayImage {
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            Luma([rgba.get_pixel(x, y)[3]])
        })
    } else {
        img.to_luma8()
    }
}

/// Stretch `mask` to the image with `filter` and clamp every alpha to it.
pub fn apply_mask(img: &mut RgbaImage, mask: &GrayImage, filter: FilterType) {
    let resized;
    let mask = if mask.dimensions() == img.dimensions() {
        mask
    } else {
        resized = imageops::resize(mask, img.width(), img.height(), filter);
        &resized
    };
    for (x, y, px) in img.enumerate_pixels_mut() {
        px[3] = px[3].min(mask.get_pixel(x, y)[0]);
    }
}

/// Crop away a uniform border.
///
/// The top-left pixel is taken as the background; the result is the bounding
/// box of every pixel that differs from it. An image with no content is
/// returned unchanged.
pub fn trim_to_content(img: &RgbaImage) -> RgbaImage {
    let Some(&background) = img.pixels().next() else {
        return img.clone();
    };
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in img.enumerate_pixels() {
        if *px == background {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    match bounds {
        Some((x0, y0, x1, y1)) => img.view(x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image(),
        None => img.clone(),
    }
}
