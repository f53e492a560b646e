//! Shared types used across the cache, the pipelines and the CLI.
//!
//! [`SizeClass`] is the only vocabulary type every layer agrees on: the
//! manager keys pipelines by it, the cache derives folders and filenames from
//! it, and the CLI parses it from `--size`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A requested thumbnail size.
///
/// The four standard classes come from the Freedesktop thumbnail convention
/// and are always square. Anything else is `Custom` and lives in its own
/// cache folder with the dimensions embedded in the filename.
///
/// Construct custom sizes with [`SizeClass::from_dimensions`] so a request for
/// `256x256` lands in the same place as [`SizeClass::Large`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum SizeClass {
    #[default]
    Normal,
    Large,
    XLarge,
    XXLarge,
    Custom { width: u32, height: u32 },
}

impl SizeClass {
    /// The standard classes, smallest first.
    pub const STANDARD: [SizeClass; 4] = [
        SizeClass::Normal,
        SizeClass::Large,
        SizeClass::XLarge,
        SizeClass::XXLarge,
    ];

    /// Map a `(width, height)` pair to a size class, folding standard squares
    /// onto their named variant.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::STANDARD
            .into_iter()
            .find(|s| s.dimensions() == (width, height))
            .unwrap_or(SizeClass::Custom { width, height })
    }

    /// Fold a hand-built `Custom` that matches a standard square onto the
    /// named class. Other values pass through.
    pub fn normalized(self) -> Self {
        match self {
            SizeClass::Custom { width, height } => Self::from_dimensions(width, height),
            standard => standard,
        }
    }

    /// Pixel dimensions `(width, height)` of this class.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            SizeClass::Normal => (128, 128),
            SizeClass::Large => (256, 256),
            SizeClass::XLarge => (512, 512),
            SizeClass::XXLarge => (1024, 1024),
            SizeClass::Custom { width, height } => (width, height),
        }
    }

    pub fn is_standard(self) -> bool {
        !matches!(self, SizeClass::Custom { .. })
    }

    /// Canonical folder name from the Freedesktop convention.
    pub fn standard_folder(self) -> &'static str {
        match self {
            SizeClass::Normal => "normal",
            SizeClass::Large => "large",
            SizeClass::XLarge => "x-large",
            SizeClass::XXLarge => "xx-large",
            SizeClass::Custom { .. } => "custom",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeClass::Custom { width, height } => write!(f, "{width}x{height}"),
            standard => f.write_str(standard.standard_folder()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid size '{0}': expected normal, large, x-large, xx-large or WIDTHxHEIGHT")]
pub struct ParseSizeError(String);

impl FromStr for SizeClass {
    type Err = ParseSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "normal" => return Ok(SizeClass::Normal),
            "large" => return Ok(SizeClass::Large),
            "x-large" | "xlarge" => return Ok(SizeClass::XLarge),
            "xx-large" | "xxlarge" => return Ok(SizeClass::XXLarge),
            _ => {}
        }
        let (w, h) = trimmed
            .split_once(['x', 'X'])
            .ok_or_else(|| ParseSizeError(s.to_string()))?;
        let width: u32 = w.parse().map_err(|_| ParseSizeError(s.to_string()))?;
        let height: u32 = h.parse().map_err(|_| ParseSizeError(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(ParseSizeError(s.to_string()));
        }
        Ok(SizeClass::from_dimensions(width, height))
    }
}

impl TryFrom<String> for SizeClass {
    type Error = ParseSizeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SizeClass> for String {
    fn from(value: SizeClass) -> Self {
        value.to_string()
    }
}
