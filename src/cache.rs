//! Cache locations, key derivation and artifact writes.
//!
//! # Layout
//!
//! The cache key is the lowercase hex MD5 of the normalized URI string. It
//! does not include the size: the size picks the folder instead.
//!
//! ```text
//! <root>/normal/<md5>.png               128×128
//! <root>/large/<md5>.png                256×256
//! <root>/x-large/<md5>.png              512×512
//! <root>/xx-large/<md5>.png             1024×1024
//! <root>/custom/(300x200)<md5>.png      any other size
//! <root>/fail/<app>-<version>/<md5>.png failure markers
//! ```
//!
//! Folder names are configurable (see [`SizeFolders`]); the layout above is
//! the default and the Freedesktop convention.
//!
//! ## Non-standard artifacts
//!
//! When the root is the shared Freedesktop directory, artifacts the
//! convention does not define (custom sizes, non-`file` URIs) are routed to a
//! second root so other desktop applications never see them.
//!
//! ## Writes
//!
//! Artifacts are written to a temporary file in the destination directory and
//! renamed into place, so a concurrent reader sees either the old file or the
//! new one, never a torn write. An existing directory is not an error.
//! On Unix new directories are created `0700` and files `0600`, matching the
//! privacy rules of the Freedesktop convention.

use crate::types::SizeClass;
use crate::uri::ResourceUri;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;

/// Sub-folder of the root holding failure markers.
pub const FAIL_FOLDER: &str = "fail";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("no {0} cache directory on this platform")]
    NoCacheDir(&'static str),
}

/// Lowercase hex MD5 of the URI string: the content address of every
/// artifact derived from it.
pub fn uri_hash(uri: &ResourceUri) -> String {
    format!("{:x}", Md5::digest(uri.as_str().as_bytes()))
}

// ============================================================================
// Cache roots
// ============================================================================

/// Where the cache lives.
///
/// ```toml
/// cache_dir = "freedesktop"
/// cache_dir = { path = "/var/cache/previews" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheDir {
    /// Same as `Application`.
    #[default]
    Auto,
    /// The shared desktop thumbnail cache.
    Freedesktop,
    /// A private per-application cache.
    Application,
    /// A temporary directory removed when the manager is dropped.
    Temp,
    Path(PathBuf),
}

/// A resolved cache root. Keeps a temporary directory alive for as long as
/// any clone of the root exists.
#[derive(Debug, Clone)]
pub struct CacheRoot {
    path: PathBuf,
    _temp: Option<Arc<TempDir>>,
}

impl CacheRoot {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheDir {
    pub fn is_freedesktop(&self) -> bool {
        matches!(self, CacheDir::Freedesktop)
    }

    /// Resolve to a concrete directory. Nothing is created on disk except
    /// for `Temp`.
    pub fn open(&self, app_name: &str) -> Result<CacheRoot, CacheError> {
        let path = match self {
            CacheDir::Freedesktop => freedesktop_dir().ok_or(CacheError::NoCacheDir("freedesktop"))?,
            CacheDir::Auto | CacheDir::Application => {
                application_dir(app_name).ok_or(CacheError::NoCacheDir("application"))?
            }
            CacheDir::Path(p) => p.clone(),
            CacheDir::Temp => {
                let temp = tempfile::Builder::new()
                    .prefix(&format!("{app_name}-thumbnails-"))
                    .tempdir()?;
                return Ok(CacheRoot {
                    path: temp.path().to_path_buf(),
                    _temp: Some(Arc::new(temp)),
                });
            }
        };
        Ok(CacheRoot { path, _temp: None })
    }
}

/// `$XDG_CACHE_HOME/thumbnails`, else `~/.cache/thumbnails`.
#[cfg(not(windows))]
pub fn freedesktop_dir() -> Option<PathBuf> {
    freedesktop_base(std::env::var_os("XDG_CACHE_HOME"), dirs::home_dir())
}

/// `%LOCALAPPDATA%\cache\thumbnails`.
#[cfg(windows)]
pub fn freedesktop_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("cache").join("thumbnails"))
}

/// Relative or empty `XDG_CACHE_HOME` values are ignored, as the XDG base
/// directory rules require.
pub fn freedesktop_base(xdg_cache_home: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    let xdg = xdg_cache_home
        .map(PathBuf::from)
        .filter(|p| p.is_absolute());
    match xdg {
        Some(base) => Some(base.join("thumbnails")),
        None => home.map(|h| h.join(".cache").join("thumbnails")),
    }
}

/// `<platform cache dir>/<app_name>/thumbnails`.
pub fn application_dir(app_name: &str) -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join(app_name).join("thumbnails"))
}

// ============================================================================
// Layout
// ============================================================================

/// Sub-folder name per size class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct SizeFolders {
    pub normal: String,
    pub large: String,
    pub x_large: String,
    pub xx_large: String,
    pub custom: String,
}

impl Default for SizeFolders {
    fn default() -> Self {
        Self {
            normal: "normal".into(),
            large: "large".into(),
            x_large: "x-large".into(),
            xx_large: "xx-large".into(),
            custom: "custom".into(),
        }
    }
}

impl SizeFolders {
    pub fn folder(&self, size: SizeClass) -> &str {
        match size {
            SizeClass::Normal => &self.normal,
            SizeClass::Large => &self.large,
            SizeClass::XLarge => &self.x_large,
            SizeClass::XXLarge => &self.xx_large,
            SizeClass::Custom { .. } => &self.custom,
        }
    }
}

/// Maps `(uri, size)` to paths. Pure: never touches the filesystem.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    pub root: PathBuf,
    /// Root for artifacts outside the Freedesktop convention, when they must
    /// be kept out of `root`.
    pub nonstandard_root: Option<PathBuf>,
    pub folders: SizeFolders,
    /// Failure-marker sub-folder, `<app_name>-<app_version>`.
    pub fail_scope: String,
}

impl CacheLayout {
    fn root_for(&self, uri: &ResourceUri, size: Option<SizeClass>) -> &Path {
        let nonstandard = !uri.is_local() || size.is_some_and(|s| !s.is_standard());
        match &self.nonstandard_root {
            Some(alt) if nonstandard => alt,
            _ => &self.root,
        }
    }

    /// Where the artifact for `(uri, size)` lives.
    pub fn thumbnail_path(&self, uri: &ResourceUri, size: SizeClass) -> PathBuf {
        let size = size.normalized();
        let hash = uri_hash(uri);
        let name = match size {
            SizeClass::Custom { width, height } => format!("({width}x{height}){hash}.png"),
            _ => format!("{hash}.png"),
        };
        self.root_for(uri, Some(size))
            .join(self.folders.folder(size))
            .join(name)
    }

    /// Where the failure marker for `uri` lives. Markers are per resource,
    /// shared by every size.
    pub fn failure_path(&self, uri: &ResourceUri) -> PathBuf {
        self.root_for(uri, None)
            .join(FAIL_FOLDER)
            .join(&self.fail_scope)
            .join(format!("{}.png", uri_hash(uri)))
    }
}

// ============================================================================
// Writes
// ============================================================================

/// Create `dir` and its parents, accepting directories that already exist.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    match builder.create(dir) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        other => other,
    }
}

/// Write `bytes` to `path` atomically: temp file in the same directory,
/// then rename over the destination.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    ensure_dir(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".nailclipper-")
        .suffix(".png.part")
        .tempfile_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(())
}

/// Remove `path` if it exists. Returns whether something was removed.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Summary of a batch of lookups.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub generated: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn generate(&mut self) {
        self.generated += 1;
    }

    pub fn fail(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.generated + self.failed
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed > 0 {
            write!(
                f,
                "{} cached, {} generated, {} failed ({} total)",
                self.hits,
                self.generated,
                self.failed,
                self.total()
            )
        } else if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.generated,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.generated)
        }
    }
}
