//! Provenance embedded in thumbnail PNGs.
//!
//! The cache has no index or database: every artifact carries its own
//! provenance as PNG `tEXt` chunks, and those chunks are the only input the
//! [refresh policy](crate::refresh) has besides the live source file.
//!
//! | Key | Value | Written when |
//! |---|---|---|
//! | `Thumb::URI` | normalized source URI | always |
//! | `Thumb::MTime` | source mtime, seconds since the epoch with nanoseconds | local sources |
//! | `Thumb::MSize` | source size in bytes | local sources |
//! | `Thumb::Mimetype` | MIME type guessed from the extension | when guessable |
//! | `Software` | producing application | always |
//!
//! Readers also accept `Thumb::Size` as the byte size, since other
//! thumbnailers write that key, and pick up `zTXt` / `iTXt` variants of every
//! key.
//!
//! Other thumbnailers usually write `Thumb::MTime` as whole seconds. A
//! recorded [`Mtime`] remembers how many fractional digits it was written
//! with and is compared against the live file at that precision.

use crate::uri::ResourceUri;
use image::RgbaImage;
use serde::{Serialize, Serializer};
use std::fs::File;
use std::io::BufReader;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, UNIX_EPOCH};
use thiserror::Error;

pub const KEY_URI: &str = "Thumb::URI";
pub const KEY_MTIME: &str = "Thumb::MTime";
pub const KEY_MSIZE: &str = "Thumb::MSize";
pub const KEY_SIZE: &str = "Thumb::Size";
pub const KEY_MIMETYPE: &str = "Thumb::Mimetype";
pub const KEY_SOFTWARE: &str = "Software";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PNG decode error: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("PNG encode error: {0}")]
    Encode(#[from] png::EncodingError),
}

/// Where a cached artifact came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub uri: Option<String>,
    pub mtime: Option<Mtime>,
    pub size: Option<u64>,
    pub mimetype: Option<String>,
    pub software: Option<String>,
}

const NANOS_DIGITS: u32 = 9;

/// A source modification time as recorded in `Thumb::MTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mtime {
    pub secs: u64,
    /// Sub-second part, already truncated to `digits`.
    pub nanos: u32,
    /// Fractional digits the value was written with, 0 to 9.
    pub digits: u32,
}

impl Mtime {
    /// Whole seconds, as most thumbnailers write them.
    pub fn from_secs(secs: u64) -> Self {
        Self {
            secs,
            nanos: 0,
            digits: 0,
        }
    }

    /// Full nanosecond precision.
    pub fn from_duration(since_epoch: Duration) -> Self {
        Self {
            secs: since_epoch.as_secs(),
            nanos: since_epoch.subsec_nanos(),
            digits: NANOS_DIGITS,
        }
    }

    fn scale(&self) -> u32 {
        10u32.pow(NANOS_DIGITS - self.digits)
    }

    /// Whether `live` (time since the epoch) equals this value at the
    /// precision it was recorded with.
    pub fn matches(&self, live: Duration) -> bool {
        let scale = self.scale();
        self.secs == live.as_secs() && self.nanos / scale == live.subsec_nanos() / scale
    }
}

impl fmt::Display for Mtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.digits == 0 {
            write!(f, "{}", self.secs)
        } else {
            let width = self.digits as usize;
            write!(f, "{}.{:0width$}", self.secs, self.nanos / self.scale())
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid mtime: {0:?}")]
pub struct ParseMtimeError(String);

/// Decimal seconds: `1700000000` or `1700000000.25`. Digits beyond
/// nanoseconds are dropped.
impl FromStr for Mtime {
    type Err = ParseMtimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParseMtimeError(s.to_string());
        let (int, frac) = s.split_once('.').unwrap_or((s, ""));
        let secs = int.parse::<u64>().map_err(|_| invalid())?;
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let frac = &frac[..frac.len().min(NANOS_DIGITS as usize)];
        let digits = frac.len() as u32;
        let nanos = if frac.is_empty() {
            0
        } else {
            frac.parse::<u32>().map_err(|_| invalid())? * 10u32.pow(NANOS_DIGITS - digits)
        };
        Ok(Self {
            secs,
            nanos,
            digits,
        })
    }
}

/// Serialized as a JSON number of seconds.
impl Serialize for Mtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.nanos == 0 {
            serializer.serialize_u64(self.secs)
        } else {
            serializer.serialize_f64(self.secs as f64 + f64::from(self.nanos) / 1e9)
        }
    }
}

/// Live `(mtime since the epoch, byte size)` of a local file, `None` if it
/// cannot be stat'ed.
pub fn source_stat(path: &Path) -> Option<(Duration, u64)> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = meta.modified().ok()?.duration_since(UNIX_EPOCH).ok()?;
    Some((mtime, meta.len()))
}

impl Provenance {
    /// Snapshot provenance for `uri` right now.
    ///
    /// mtime and size are only recorded for local files that can be stat'ed.
    pub fn for_resource(uri: &ResourceUri, software: &str) -> Self {
        let stat = uri.local_path().and_then(|p| source_stat(&p));
        Self {
            uri: Some(uri.to_string()),
            mtime: stat.map(|(m, _)| Mtime::from_duration(m)),
            size: stat.map(|(_, s)| s),
            mimetype: uri.guess_mime(),
            software: Some(software.to_string()),
        }
    }

    fn chunks(&self) -> Vec<(&'static str, String)> {
        [
            (KEY_URI, self.uri.clone()),
            (KEY_MTIME, self.mtime.map(|v| v.to_string())),
            (KEY_MSIZE, self.size.map(|v| v.to_string())),
            (KEY_MIMETYPE, self.mimetype.clone()),
            (KEY_SOFTWARE, self.software.clone()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect()
    }

    fn set(&mut self, key: &str, value: String) {
        match key {
            KEY_URI => self.uri = Some(value),
            KEY_MTIME => self.mtime = value.parse().ok(),
            KEY_MSIZE => self.size = value.trim().parse().ok(),
            // Only when MSize has not already been seen
            KEY_SIZE if self.size.is_none() => self.size = value.trim().parse().ok(),
            KEY_MIMETYPE => self.mimetype = Some(value),
            KEY_SOFTWARE => self.software = Some(value),
            _ => {}
        }
    }
}

/// Encode `img` as an 8-bit RGBA PNG carrying `provenance` as text chunks.
pub fn encode_png(img: &RgbaImage, provenance: &Provenance) -> Result<Vec<u8>, MetadataError> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, img.width(), img.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        for (key, value) in provenance.chunks() {
            encoder.add_text_chunk(key.to_string(), value)?;
        }
        let mut writer = encoder.write_header()?;
        writer.write_image_data(img.as_raw())?;
        writer.finish()?;
    }
    Ok(buf)
}

/// Read the provenance chunks of a PNG on disk.
///
/// Only chunks before the image data are read, which is where every
/// thumbnailer writes them.
pub fn read_provenance(path: &Path) -> Result<Provenance, MetadataError> {
    let mut decoder = png::Decoder::new(BufReader::new(File::open(path)?));
    decoder.set_ignore_text_chunk(false);
    let reader = decoder.read_info()?;
    let info = reader.info();

    let mut provenance = Provenance::default();
    for chunk in &info.uncompressed_latin1_text {
        provenance.set(&chunk.keyword, chunk.text.clone());
    }
    for chunk in &info.compressed_latin1_text {
        if let Ok(text) = chunk.get_text() {
            provenance.set(&chunk.keyword, text);
        }
    }
    for chunk in &info.utf8_text {
        if let Ok(text) = chunk.get_text() {
            provenance.set(&chunk.keyword, text);
        }
    }
    Ok(provenance)
}
