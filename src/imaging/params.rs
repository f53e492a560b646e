//! Parameter types for the transform pipeline.
//!
//! These types describe *what* a pipeline should do, not *how*. They are what
//! the configuration file deserializes into, and what
//! [`operations`](super::operations) and [`calculations`](super::calculations)
//! consume.
//!
//! ## Types
//!
//! - [`ResizeStyle`]: how the source is fitted to the target (fit, fill, pad, stretch).
//! - [`Resample`]: interpolation filter, `auto` picks per source.
//! - [`Color`]: an RGBA colour parsed from `#rrggbb` / `#rrggbbaa`.
//! - [`Layer`]: a background or foreground, either a solid colour or an image file.

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How the source image is mapped onto the target rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeStyle {
    /// Preserve aspect ratio, fit inside the target. May be smaller on one axis.
    #[default]
    Fit,
    /// Preserve aspect ratio, cover the target, center-crop the overflow.
    Fill,
    /// Fit, then center on a transparent canvas of exactly the target size.
    Pad,
    /// Ignore aspect ratio, scale each axis to the target.
    Stretch,
}

/// Interpolation filter used when resizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resample {
    #[default]
    Auto,
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos,
}

/// Straight-alpha RGBA colour.
///
/// Written as `#rrggbb` (opaque) or `#rrggbbaa` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const TRANSPARENT: Color = Color([0, 0, 0, 0]);

    pub fn rgba(self) -> Rgba<u8> {
        Rgba(self.0)
    }

    pub fn is_transparent(self) -> bool {
        self.0[3] == 0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid colour '{0}': expected #rrggbb or #rrggbbaa")]
pub struct ParseColorError(String);

impl std::str::FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(err());
        }
        let mut out = [0, 0, 0, 255];
        for (i, slot) in out.iter_mut().enumerate().take(hex.len() / 2) {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| err())?;
        }
        Ok(Color(out))
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// A compositing layer as written in configuration.
///
/// ```toml
/// background = { color = "#ffffff" }
/// foreground = { image = "frame.png" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Color(Color),
    Image(PathBuf),
}

impl Default for Layer {
    fn default() -> Self {
        Layer::Color(Color::TRANSPARENT)
    }
}
