//! Icon-lookup fallback.
//!
//! Maps a resource to a broad category (video, spreadsheet, archive, ...)
//! and returns the configured icon image for it. Categories come from the
//! extension table below; resources with an unknown extension fall back to
//! the top-level MIME type guessed by `mime_guess`.
//!
//! With a `fallback` icon configured the renderer accepts every resource,
//! which makes it a natural last entry in a renderer order.

use super::{Capabilities, RenderError, Renderer};
use crate::uri::ResourceUri;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconCategory {
    Spreadsheet,
    Model,
    Text,
    Document,
    #[serde(alias = "photo")]
    Image,
    Presentation,
    Archive,
    Audio,
    Video,
    Font,
    Executable,
    Script,
    Code,
    Shortcut,
}

/// Extension table, searched in order. An extension listed under several
/// categories belongs to the first.
const CATEGORY_EXTENSIONS: &[(IconCategory, &[&str])] = &[
    (
        IconCategory::Spreadsheet,
        &[
            "ods", "xls", "xlt", "xlw", "xlr", "xlsx", "xlsm", "xlsb", "xltx", "xltm", "csv",
            "tsv", "ics", "vcf",
        ],
    ),
    (
        IconCategory::Model,
        &["3ds", "f3d", "3mf", "smt", "stp", "step", "stl", "obj", "gcode", "scad"],
    ),
    (IconCategory::Text, &["txt", "md"]),
    (
        IconCategory::Document,
        &[
            "doc", "dot", "docx", "docm", "dotx", "dotm", "ebook", "log", "msg", "odt", "org",
            "pages", "pdf", "rtf", "rst", "tex", "wpd", "wps", "mobi", "epub", "azw", "azw1",
            "azw3", "azw4", "azw6", "cbr", "cbz", "xps",
        ],
    ),
    (
        IconCategory::Image,
        &[
            "3dm", "max", "avif", "bmp", "dds", "gif", "heic", "heif", "jpg", "jpeg", "jxl",
            "png", "psd", "xcf", "tga", "thm", "tif", "tiff", "ai", "eps", "ps", "svg", "dwg",
            "dxf", "gpx", "kml", "kmz", "webp",
        ],
    ),
    (
        IconCategory::Presentation,
        &["ppt", "pptx", "odp", "pptm", "potx", "potm", "ppsx", "ppsm"],
    ),
    (
        IconCategory::Archive,
        &[
            "7z", "a", "aar", "apk", "ar", "bz2", "br", "cab", "cpio", "deb", "dmg", "egg", "gz",
            "iso", "jar", "lha", "lz", "lz4", "lzma", "lzo", "mar", "pea", "rar", "rpm", "s7z",
            "shar", "tar", "tbz2", "tgz", "tlz", "txz", "war", "whl", "xpi", "zip", "zipx",
            "zst", "xz", "pak",
        ],
    ),
    (
        IconCategory::Audio,
        &[
            "aac", "aiff", "ape", "au", "flac", "gsm", "it", "m3u", "m4a", "mid", "mod", "mp3",
            "mpa", "ogg", "pls", "ra", "s3m", "sid", "wav", "wma", "xm",
        ],
    ),
    (
        IconCategory::Video,
        &[
            "3g2", "3gp", "aaf", "asf", "avchd", "avi", "car", "dav", "drc", "flv", "m2v",
            "m2ts", "m4p", "m4v", "mkv", "mng", "mov", "mp2", "mp4", "mpe", "mpeg", "mpg", "mpv",
            "mts", "mxf", "nsv", "ogv", "ogm", "ogx", "qt", "rm", "rmvb", "roq", "srt", "svi",
            "vob", "webm", "wmv", "xba", "yuv",
        ],
    ),
    (IconCategory::Font, &["eot", "otf", "ttf", "woff", "woff2"]),
    (IconCategory::Executable, &["exe", "msi", "bin", "app"]),
    (
        IconCategory::Script,
        &["bat", "bash", "csh", "fish", "zsh", "ksh", "sh"],
    ),
    (
        IconCategory::Code,
        &[
            "ada", "adb", "ads", "asm", "asp", "aspx", "bas", "c++", "c", "cbl", "cc", "class",
            "clj", "cob", "cpp", "cs", "cxx", "d", "diff", "dll", "e", "el", "f", "f77", "f90",
            "for", "fth", "ftn", "go", "groovy", "h", "hh", "hpp", "hs", "htm", "html", "hxx",
            "inc", "java", "js", "json", "jsp", "jsx", "kt", "kts", "lhs", "lisp", "lua", "m",
            "m4", "nim", "patch", "php", "php3", "php4", "php5", "phtml", "pl", "po", "pp",
            "prql", "py", "ps1", "psd1", "psm1", "ps1xml", "psc1", "pssc", "psrc", "r", "rb",
            "rs", "s", "scala", "sql", "swg", "swift", "toml", "ts", "v", "vb", "vcxproj", "wll",
            "xcodeproj", "xml", "xll", "yaml", "yml", "zig",
        ],
    ),
    (
        IconCategory::Shortcut,
        &["url", "lnk", "desktop", "webloc"],
    ),
];

impl IconCategory {
    pub fn for_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        CATEGORY_EXTENSIONS
            .iter()
            .find(|(_, exts)| exts.contains(&ext.as_str()))
            .map(|(cat, _)| *cat)
    }

    /// Coarse mapping from a MIME essence like `video/x-matroska`.
    pub fn for_mime(mime: &str) -> Option<Self> {
        let (top, sub) = mime.split_once('/')?;
        match top {
            "image" => Some(IconCategory::Image),
            "audio" => Some(IconCategory::Audio),
            "video" => Some(IconCategory::Video),
            "font" => Some(IconCategory::Font),
            "text" => Some(IconCategory::Text),
            "model" => Some(IconCategory::Model),
            "application" if sub.contains("zip") || sub.contains("compressed") => {
                Some(IconCategory::Archive)
            }
            _ => None,
        }
    }

    /// Category of a resource: extension table first, then MIME guess.
    pub fn of(uri: &ResourceUri) -> Option<Self> {
        uri.extension()
            .and_then(|ext| Self::for_extension(&ext))
            .or_else(|| uri.guess_mime().and_then(|m| Self::for_mime(&m)))
    }
}

impl fmt::Display for IconCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Icon images per category, as configured in `[icons]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IconSet {
    /// Used when no category matches. Makes the renderer accept everything.
    pub fallback: Option<PathBuf>,
    pub categories: BTreeMap<IconCategory, PathBuf>,
}

impl IconSet {
    pub fn is_empty(&self) -> bool {
        self.fallback.is_none() && self.categories.is_empty()
    }

    /// Resolve relative icon paths against `base`.
    pub fn rebase(mut self, base: &Path) -> Self {
        self.fallback = self.fallback.map(|p| base.join(p));
        for path in self.categories.values_mut() {
            *path = base.join(&*path);
        }
        self
    }

    /// The icon file for `uri`, if any.
    pub fn icon_for(&self, uri: &ResourceUri) -> Option<&Path> {
        IconCategory::of(uri)
            .and_then(|cat| self.categories.get(&cat))
            .or(self.fallback.as_ref())
            .map(PathBuf::as_path)
    }
}

#[derive(Debug)]
pub struct IconRenderer {
    set: IconSet,
}

impl IconRenderer {
    pub fn new(set: IconSet) -> Self {
        Self { set }
    }

    fn render(&self, uri: &ResourceUri) -> Result<DynamicImage, RenderError> {
        let icon = self.set.icon_for(uri).ok_or(RenderError::Unsupported)?;
        Ok(image::open(icon)?)
    }
}

impl Renderer for IconRenderer {
    fn name(&self) -> &'static str {
        "icons"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::BOTH
    }

    fn supports(&self, uri: &ResourceUri) -> bool {
        self.set.icon_for(uri).is_some()
    }

    fn render_from_file(&self, path: &Path, _size: (u32, u32)) -> Result<DynamicImage, RenderError> {
        let uri = ResourceUri::from_path(path).map_err(|e| RenderError::Failed(e.to_string()))?;
        self.render(&uri)
    }

    fn render_from_url(&self, uri: &ResourceUri, _size: (u32, u32)) -> Result<DynamicImage, RenderError> {
        self.render(uri)
    }
}
