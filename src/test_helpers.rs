//! Shared test utilities for the nailclipper test suite.
//!
//! Provides synthetic images, on-disk fixtures and a ready-to-use config
//! pointing at a temporary cache.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let photo = write_png(tmp.path(), "photo.png", 800, 600, [255, 0, 0, 255]);
//! let config = test_config(tmp.path());
//! ```

use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

use crate::config::ManagerConfig;

// =========================================================================
// Synthetic images
// =========================================================================

/// A `w`×`h` image filled with one colour.
pub fn solid_rgba(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba(rgba))
}

/// White disc inscribed in a black `w`×`h` square.
pub fn circle_mask(w: u32, h: u32) -> GrayImage {
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let r = cx.min(cy);
    GrayImage::from_fn(w, h, |x, y| {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        if dx * dx + dy * dy <= r * r {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

// =========================================================================
// On-disk fixtures
// =========================================================================

/// Write a solid PNG into `dir` and return its path.
pub fn write_png(dir: &Path, name: &str, w: u32, h: u32, rgba: [u8; 4]) -> PathBuf {
    let path = dir.join(name);
    solid_rgba(w, h, rgba).save(&path).unwrap();
    path
}

/// Write a solid RGB JPEG into `dir` and return its path.
pub fn write_jpeg(dir: &Path, name: &str, w: u32, h: u32, rgb: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_pixel(w, h, image::Rgb(rgb))
        .save(&path)
        .unwrap();
    path
}

/// Defaults with the cache rooted at `<dir>/cache`.
pub fn test_config(dir: &Path) -> ManagerConfig {
    ManagerConfig::in_dir(dir.join("cache"))
}
