//! Resource identifiers.
//!
//! Every lookup starts by turning whatever the caller handed us (a relative
//! path, an absolute path, a `file://` URI or a remote URL) into a single
//! normalized [`ResourceUri`]. The cache key is the MD5 of that string, so two
//! spellings of the same file must normalize to byte-identical URIs:
//!
//! ```text
//! photos/../photos/cat.jpg   ─┐
//! /home/me/photos/cat.jpg    ─┼─→ file:///home/me/photos/cat.jpg
//! file:///home/me/photos/cat.jpg ─┘
//! ```
//!
//! Existing paths are canonicalized (symlinks resolved). Paths that do not
//! exist yet are made absolute against the working directory and cleaned
//! lexically (`.` dropped, `..` popped).
//!
//! Files found by walking a directory stay [`PathBuf`]s until they become
//! URIs, so names that are not valid UTF-8 are percent-encoded byte for byte
//! instead of being replaced with U+FFFD.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum UriError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("cannot express path as a file URI: {0}")]
    InvalidPath(PathBuf),
    #[error("empty resource identifier")]
    Empty,
}

/// A normalized, absolute resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri {
    url: Url,
}

impl ResourceUri {
    /// Normalize a user-supplied identifier.
    ///
    /// Anything with a scheme longer than one character is treated as a URL
    /// (single-letter "schemes" are Windows drive letters). Everything else is
    /// a local path.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(UriError::Empty);
        }
        match Url::parse(input) {
            Ok(url) if url.scheme().len() > 1 => {
                if url.scheme() == "file" {
                    let path = url
                        .to_file_path()
                        .map_err(|_| UriError::InvalidPath(PathBuf::from(input)))?;
                    Self::from_path(&path)
                } else {
                    Ok(Self { url })
                }
            }
            _ => Self::from_path(Path::new(input)),
        }
    }

    /// Build a `file` URI from a local path, resolving it to an absolute one.
    pub fn from_path(path: &Path) -> Result<Self, UriError> {
        let absolute = match std::fs::canonicalize(path) {
            Ok(p) => p,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                normalize_lexically(&std::path::absolute(path)?)
            }
            Err(e) => return Err(e.into()),
        };
        let url =
            Url::from_file_path(&absolute).map_err(|_| UriError::InvalidPath(absolute.clone()))?;
        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn is_local(&self) -> bool {
        self.url.scheme() == "file"
    }

    /// The filesystem path for `file` URIs, `None` for remote resources.
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.is_local() {
            self.url.to_file_path().ok()
        } else {
            None
        }
    }

    /// Lowercased extension of the last path segment, without the dot.
    ///
    /// Works for remote URLs too (`https://x/y/page.HTML` → `html`), which is
    /// what extension-based renderer selection needs.
    pub fn extension(&self) -> Option<String> {
        let last = self.url.path_segments()?.next_back()?;
        let (stem, ext) = last.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Best-effort MIME type guessed from the extension.
    pub fn guess_mime(&self) -> Option<String> {
        let ext = self.extension()?;
        mime_guess::from_ext(&ext)
            .first()
            .map(|m| m.essence_str().to_string())
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// One lookup target: typed by the user, or found below a directory they named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A path, `file://` URI or URL as given.
    Arg(String),
    /// A file found while walking a directory.
    Walked(PathBuf),
}

impl Input {
    /// Human-readable name for reports.
    pub fn label(&self) -> String {
        match self {
            Input::Arg(s) => s.clone(),
            Input::Walked(p) => p.display().to_string(),
        }
    }

    pub fn to_uri(&self) -> Result<ResourceUri, UriError> {
        match self {
            Input::Arg(s) => ResourceUri::parse(s),
            Input::Walked(p) => ResourceUri::from_path(p),
        }
    }
}

/// Directories become the files below them (sorted) when `recursive` is set.
/// Everything else passes through untouched.
pub fn expand_inputs(inputs: &[String], recursive: bool) -> Vec<Input> {
    let mut expanded = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if recursive && path.is_dir() {
            let mut files: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(walkdir::DirEntry::into_path)
                .collect();
            files.sort();
            expanded.extend(files.into_iter().map(Input::Walked));
        } else {
            expanded.push(Input::Arg(input.clone()));
        }
    }
    expanded
}

/// Drop `.` components and resolve `..` against the preceding component.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
