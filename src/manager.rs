//! The thumbnail manager.
//!
//! Ties the other modules together. One [`ThumbnailManager`] owns a resolved
//! cache layout, one ready [`Transform`] per configured size class plus the
//! default, and the renderer [`Registry`].
//!
//! ## Lookup
//!
//! ```text
//! get_thumbnail(input, size)
//!   │ normalize input → ResourceUri
//!   │ derive <root>/<folder>/<md5>.png
//!   ├─ artifact exists and refresh policy says fresh ──→ Cached
//!   ├─ failure marker exists ─────────────────────────→ PreviouslyFailed
//!   │ render (first renderer that succeeds) → transform → PNG + provenance
//!   ├─ ok:  atomic write of the artifact ─────────────→ Generated
//!   └─ err: atomic write of a 1×1 failure marker ─────→ Failed
//! ```
//!
//! Render failures are outcomes, not errors: `Err` is reserved for problems
//! with the cache itself (unwritable directories, unencodable images).
//!
//! ## Failure markers
//!
//! Markers are per resource, shared by all sizes, and scoped by
//! `<app_name>-<app_version>` so another application's failures never hide
//! resources from this one. They never expire on their own; use
//! [`ThumbnailManager::clear_failure`].
//!
//! ## Sharing
//!
//! Lookups take `&self`. The registry sits behind a mutex because renderers
//! hold backend state (a browser process, a PDF library binding) that must
//! not be driven from two threads at once.

use crate::cache::{self, CacheError, CacheLayout, CacheRoot, CacheStats};
use crate::compliance::ComplianceError;
use crate::config::{ConfigError, ManagerConfig};
use crate::imaging::Transform;
use crate::metadata::{MetadataError, Provenance, encode_png};
use crate::refresh::Freshness;
use crate::render::{Registry, RenderRequest};
use crate::types::SizeClass;
use crate::uri::{ResourceUri, UriError};
use image::RgbaImage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid resource: {0}")]
    Uri(#[from] UriError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Compliance(#[from] ComplianceError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Outcome of one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    /// An existing, fresh artifact.
    Cached(PathBuf),
    /// Rendered and written by this call.
    Generated(PathBuf),
    /// Every renderer failed or none accepted the resource. A failure marker
    /// was written.
    Failed,
    /// A failure marker from an earlier attempt suppressed rendering.
    PreviouslyFailed,
}

impl Thumbnail {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Thumbnail::Cached(p) | Thumbnail::Generated(p) => Some(p),
            Thumbnail::Failed | Thumbnail::PreviouslyFailed => None,
        }
    }

    pub fn tally(&self, stats: &mut CacheStats) {
        match self {
            Thumbnail::Cached(_) => stats.hit(),
            Thumbnail::Generated(_) => stats.generate(),
            Thumbnail::Failed | Thumbnail::PreviouslyFailed => stats.fail(),
        }
    }
}

pub struct ThumbnailManager {
    config: ManagerConfig,
    layout: CacheLayout,
    // Keeps temporary roots alive.
    _roots: Vec<CacheRoot>,
    default_transform: Transform,
    transforms: BTreeMap<SizeClass, Transform>,
    registry: Mutex<Registry>,
}

impl std::fmt::Debug for ThumbnailManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailManager")
            .field("layout", &self.layout)
            .field("sizes", &self.transforms.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ThumbnailManager {
    /// Build a manager with every renderer compiled into this build.
    pub fn new(config: ManagerConfig) -> Result<Self, ManagerError> {
        let icons = config.icon_set();
        let registry = Registry::with_defaults((!icons.is_empty()).then_some(icons));
        Self::with_registry(config, registry)
    }

    /// Build a manager around a caller-supplied registry.
    ///
    /// Validates the configuration, runs its compliance profile, resolves the
    /// cache roots and decodes every layer and mask image. Any failure here
    /// is fatal: there is no partially configured manager.
    pub fn with_registry(config: ManagerConfig, registry: Registry) -> Result<Self, ManagerError> {
        config.validate()?;
        config.compliance.check(&config)?;

        let root = config.cache_dir.open(&config.app_name)?;
        let nonstandard = if config.cache_dir.is_freedesktop() {
            Some(config.nonstandard_cache_dir.open(&config.app_name)?)
        } else {
            None
        };
        Self::from_roots(config, registry, root, nonstandard)
    }

    /// Finish construction around resolved cache roots. `nonstandard`, when
    /// present, receives the artifacts the shared convention does not define.
    fn from_roots(
        config: ManagerConfig,
        registry: Registry,
        root: CacheRoot,
        nonstandard: Option<CacheRoot>,
    ) -> Result<Self, ManagerError> {
        let default_transform = config.default.build(&config.base_dir)?;
        let transforms = config
            .sizes
            .iter()
            .map(|(size, pipeline)| Ok((*size, pipeline.build(&config.base_dir)?)))
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        let layout = CacheLayout {
            root: root.path().to_path_buf(),
            nonstandard_root: nonstandard.as_ref().map(|r| r.path().to_path_buf()),
            folders: config.folders.clone(),
            fail_scope: config.fail_scope(),
        };
        info!(root = %layout.root.display(), "thumbnail cache ready");

        Ok(Self {
            config,
            layout,
            _roots: std::iter::once(root).chain(nonstandard).collect(),
            default_transform,
            transforms,
            registry: Mutex::new(registry),
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn cache_root(&self) -> &Path {
        &self.layout.root
    }

    /// Where the artifact for `(input, size)` lives, whether or not it exists.
    pub fn thumbnail_path(&self, input: &str, size: SizeClass) -> Result<PathBuf, ManagerError> {
        let uri = ResourceUri::parse(input)?;
        Ok(self.layout.thumbnail_path(&uri, size))
    }

    /// Where the failure marker for `input` lives, whether or not it exists.
    pub fn failure_path(&self, input: &str) -> Result<PathBuf, ManagerError> {
        let uri = ResourceUri::parse(input)?;
        Ok(self.layout.failure_path(&uri))
    }

    /// Remove the failure marker for `input`. Returns whether there was one.
    pub fn clear_failure(&self, input: &str) -> Result<bool, ManagerError> {
        let path = self.failure_path(input)?;
        let removed = cache::remove_if_exists(&path)?;
        if removed {
            info!(input, "failure marker cleared");
        }
        Ok(removed)
    }

    /// Return the thumbnail for `input` at `size`, rendering it if needed.
    pub fn get_thumbnail(&self, input: &str, size: SizeClass) -> Result<Thumbnail, ManagerError> {
        let uri = ResourceUri::parse(input)?;
        self.thumbnail_for(&uri, size)
    }

    /// [`get_thumbnail`](Self::get_thumbnail) for an already normalized URI.
    pub fn thumbnail_for(
        &self,
        uri: &ResourceUri,
        size: SizeClass,
    ) -> Result<Thumbnail, ManagerError> {
        let size = size.normalized();
        let path = self.layout.thumbnail_path(uri, size);

        let existed = path.exists();
        if existed {
            match self.config.refresh.evaluate(&path, uri, SystemTime::now()) {
                Freshness::Stale => debug!(%uri, %size, "artifact is stale"),
                Freshness::Fresh | Freshness::NotApplicable => {
                    debug!(%uri, %size, "cache hit");
                    return Ok(Thumbnail::Cached(path));
                }
            }
        }

        let marker = self.layout.failure_path(uri);
        if marker.exists() {
            debug!(%uri, "previously failed");
            return Ok(Thumbnail::PreviouslyFailed);
        }

        let target = self.config.target_for(size);
        let pipeline = self.config.pipeline_for(size);
        let transform = self.transforms.get(&size).unwrap_or(&self.default_transform);
        // Snapshot before rendering so a source modified mid-render is
        // picked up as stale next time.
        let provenance = Provenance::for_resource(uri, &self.config.software());

        let request = RenderRequest {
            uri: uri.clone(),
            size: target,
        };
        let rendered = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .render(&request, &pipeline.renderers);

        match rendered {
            Ok((raw, kind)) => {
                let img = transform.apply(raw, target);
                cache::write_atomic(&path, &encode_png(&img, &provenance)?)?;
                info!(%uri, %size, renderer = %kind, "thumbnail generated");
                Ok(Thumbnail::Generated(path))
            }
            Err(e) => {
                warn!(%uri, %size, error = %e, "no thumbnail produced");
                let blank = RgbaImage::new(1, 1);
                cache::write_atomic(&marker, &encode_png(&blank, &provenance)?)?;
                if existed {
                    cache::remove_if_exists(&path)?;
                }
                Ok(Thumbnail::Failed)
            }
        }
    }
}
