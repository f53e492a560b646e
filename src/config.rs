//! Manager configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Configuration is
//! layered: stock defaults are serialized to a TOML table, the user file is
//! merged on top, and every `[sizes.*]` pipeline inherits from `[default]`
//! before the result is deserialized and validated.
//!
//! ## Config File Location
//!
//! `nailclipper` reads `$XDG_CONFIG_HOME/nailclipper/config.toml` (see
//! [`default_config_path`]) unless `--config` names another file. A missing
//! file means stock defaults. Relative paths inside the file (layer images,
//! masks, icons) resolve against the file's directory.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! app_name = "nailclipper"
//! cache_dir = "auto"              # auto | freedesktop | application | temp | { path = "..." }
//! nonstandard_cache_dir = "auto"
//! refresh = "auto"                # auto | freedesktop | never | { interval = { days = 10 } }
//! compliance = "none"             # none | freedesktop | freedesktop-strict
//!
//! [folders]
//! normal = "normal"
//! large = "large"
//! x-large = "x-large"
//! xx-large = "xx-large"
//! custom = "custom"
//!
//! [default]
//! resize_style = "fit"            # fit | fill | pad | stretch
//! resample = "auto"               # auto | nearest | bilinear | bicubic | lanczos
//! upscale = true
//! renderers = ["raster", "svg", "pdf", "html", "icons"]
//!
//! [sizes.large]                    # normal | large | x-large | xx-large | WxH
//! resize_style = "pad"
//! background = { color = "#ffffffff" }
//!
//! [icons]
//! fallback = "icons/blank.png"
//! ```
//!
//! ## Pipeline Inheritance
//!
//! A `[sizes.X]` table only lists what differs from `[default]`. Inheritance
//! is one level deep: a key set in `[sizes.X]` replaces the default's value
//! entirely, so a size can swap a colour background for an image one.
//!
//! Unknown keys are rejected to catch typos early.

use crate::cache::{CacheDir, FAIL_FOLDER, SizeFolders};
use crate::compliance::Compliance;
use crate::imaging::{Ground, Layer, Resample, ResizeStyle, Transform, mask_channel};
use crate::refresh::RefreshPolicy;
use crate::render::{IconSet, RendererKind};
use crate::types::SizeClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("cannot load {}: {source}", path.display())]
    Layer {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Everything a [`ThumbnailManager`](crate::manager::ThumbnailManager) needs.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// First half of the failure-marker scope and of the `Software` chunk.
    pub app_name: String,
    /// Second half of the failure-marker scope.
    pub app_version: String,
    pub cache_dir: CacheDir,
    /// Root for custom sizes and non-`file` URIs when `cache_dir` is the
    /// shared Freedesktop cache. Ignored otherwise.
    pub nonstandard_cache_dir: CacheDir,
    pub refresh: RefreshPolicy,
    pub compliance: Compliance,
    pub folders: SizeFolders,
    /// Pipeline for size classes without their own entry in `sizes`.
    pub default: PipelineConfig,
    pub sizes: BTreeMap<SizeClass, PipelineConfig>,
    pub icons: IconSet,
    /// Directory relative paths resolve against. Set by [`load_config`].
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            cache_dir: CacheDir::Auto,
            nonstandard_cache_dir: CacheDir::Auto,
            refresh: RefreshPolicy::Auto,
            compliance: Compliance::None,
            folders: SizeFolders::default(),
            default: PipelineConfig::default(),
            sizes: BTreeMap::new(),
            icons: IconSet::default(),
            base_dir: PathBuf::new(),
        }
    }
}

/// One resize/composite pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub resize_style: ResizeStyle,
    pub resample: Resample,
    /// Allow enlarging sources smaller than the target.
    pub upscale: bool,
    pub background: Option<Layer>,
    pub foreground: Option<Layer>,
    /// Greyscale or alpha image limiting the output's opacity.
    pub mask: Option<PathBuf>,
    /// Explicit `[width, height]` target. Defaults to the size class.
    pub size: Option<[u32; 2]>,
    /// Renderers to try, in order.
    pub renderers: Vec<RendererKind>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resize_style: ResizeStyle::Fit,
            resample: Resample::Auto,
            upscale: true,
            background: None,
            foreground: None,
            mask: None,
            size: None,
            renderers: RendererKind::ALL.to_vec(),
        }
    }
}

impl PipelineConfig {
    /// Decode layer and mask images and produce a ready [`Transform`].
    pub fn build(&self, base: &Path) -> Result<Transform, ConfigError> {
        let mask = match &self.mask {
            Some(path) => {
                let path = base.join(path);
                let img = image::open(&path).map_err(|source| ConfigError::Layer { path, source })?;
                Some(mask_channel(&img))
            }
            None => None,
        };
        Ok(Transform {
            style: self.resize_style,
            resample: self.resample,
            upscale: self.upscale,
            background: load_layer(self.background.as_ref(), base)?,
            foreground: load_layer(self.foreground.as_ref(), base)?,
            mask,
        })
    }
}

fn load_layer(layer: Option<&Layer>, base: &Path) -> Result<Option<Ground>, ConfigError> {
    let Some(layer) = layer else {
        return Ok(None);
    };
    Ground::load(layer, base)
        .map(Some)
        .map_err(|source| ConfigError::Layer {
            path: match layer {
                Layer::Image(p) => base.join(p),
                Layer::Color(_) => PathBuf::new(),
            },
            source,
        })
}

impl ManagerConfig {
    /// Shared Freedesktop cache, Freedesktop refresh, checked against the
    /// Freedesktop profile.
    pub fn freedesktop() -> Self {
        Self {
            cache_dir: CacheDir::Freedesktop,
            refresh: RefreshPolicy::Freedesktop,
            compliance: Compliance::Freedesktop,
            ..Self::default()
        }
    }

    /// Defaults with the cache at an explicit directory.
    pub fn in_dir(path: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: CacheDir::Path(path.into()),
            ..Self::default()
        }
    }

    /// The pipeline configured for `size`, or `[default]`.
    pub fn pipeline_for(&self, size: SizeClass) -> &PipelineConfig {
        self.sizes.get(&size).unwrap_or(&self.default)
    }

    /// Pixel target for `size`: the pipeline's explicit size, else the class.
    pub fn target_for(&self, size: SizeClass) -> (u32, u32) {
        match self.pipeline_for(size).size {
            Some([w, h]) => (w, h),
            None => size.dimensions(),
        }
    }

    /// Failure-marker folder, `<app_name>-<app_version>`.
    pub fn fail_scope(&self) -> String {
        format!("{}-{}", self.app_name, self.app_version)
    }

    /// Value of the `Software` chunk.
    pub fn software(&self) -> String {
        format!("{} {}", self.app_name, self.app_version)
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Icon set with paths resolved against the config directory.
    pub fn icon_set(&self) -> IconSet {
        self.icons.clone().rebase(&self.base_dir)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        for (key, value) in [("app_name", &self.app_name), ("app_version", &self.app_version)] {
            if value.contains(['/', '\\']) {
                return invalid(format!("{key} must not contain path separators"));
            }
        }
        if self.app_name.is_empty() {
            return invalid("app_name must not be empty".into());
        }

        let mut seen: Vec<&str> = Vec::new();
        for size in SizeClass::STANDARD.into_iter().chain([SizeClass::Custom {
            width: 1,
            height: 1,
        }]) {
            let folder = self.folders.folder(size);
            if folder.is_empty() || folder.contains(['/', '\\']) || folder == ".." {
                return invalid(format!("folders: '{folder}' is not a plain folder name"));
            }
            if folder == FAIL_FOLDER {
                return invalid(format!("folders: '{FAIL_FOLDER}' is reserved for failure markers"));
            }
            if seen.contains(&folder) {
                return invalid(format!("folders: '{folder}' is used twice"));
            }
            seen.push(folder);
        }

        if let RefreshPolicy::Interval { days: 0 } = self.refresh {
            return invalid("refresh.interval.days must be at least 1".into());
        }

        let pipelines = std::iter::once(("default".to_string(), &self.default))
            .chain(self.sizes.iter().map(|(s, p)| (format!("sizes.{s}"), p)));
        for (name, pipeline) in pipelines {
            if matches!(pipeline.size, Some([0, _] | [_, 0])) {
                return invalid(format!("{name}.size must be non-zero"));
            }
            if pipeline.renderers.is_empty() {
                return invalid(format!("{name}.renderers must not be empty"));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ManagerConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Fill every `[sizes.X]` table with the `[default]` keys it does not set.
fn inherit_default(mut value: toml::Value) -> toml::Value {
    let Some(table) = value.as_table_mut() else {
        return value;
    };
    let Some(default) = table.get("default").and_then(toml::Value::as_table).cloned() else {
        return value;
    };
    if let Some(toml::Value::Table(sizes)) = table.get_mut("sizes") {
        for (_, pipeline) in sizes.iter_mut() {
            if let toml::Value::Table(own) = pipeline {
                let mut merged = default.clone();
                merged.extend(std::mem::take(own));
                *own = merged;
            }
        }
    }
    value
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ManagerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ManagerConfig = inherit_default(merged).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. Relative paths resolve against the file's
/// directory.
pub fn load_config(path: &Path) -> Result<ManagerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    let mut config = resolve_config(base, overlay)?;
    config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(config)
}

/// `<config dir>/nailclipper/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(env!("CARGO_PKG_NAME")).join("config.toml"))
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# nailclipper Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.
# Relative paths resolve against the directory holding this file.

# Identity used for the failure-marker folder (fail/<app_name>-<app_version>)
# and the Software text chunk. app_version defaults to the program version.
app_name = "nailclipper"
# app_version = "0.3.0"

# Where thumbnails are stored:
#   "auto"         same as "application"
#   "freedesktop"  the shared desktop cache ($XDG_CACHE_HOME/thumbnails)
#   "application"  <user cache dir>/<app_name>/thumbnails
#   "temp"         a temporary directory removed on exit
#   { path = "/some/dir" }
cache_dir = "auto"

# When cache_dir is "freedesktop", custom sizes and non-file URIs are kept
# out of the shared cache and stored here instead.
nonstandard_cache_dir = "auto"

# When an existing thumbnail is regenerated:
#   "freedesktop"  when the source file's mtime or size changed
#   "auto"         freedesktop for local files, 30-day interval otherwise
#   "never"
#   { interval = { days = 10 } }
refresh = "auto"

# Refuse to start unless the configuration follows a profile:
#   "none", "freedesktop", "freedesktop-strict"
compliance = "none"

# ---------------------------------------------------------------------------
# Cache sub-folders per size class
# ---------------------------------------------------------------------------
[folders]
normal = "normal"       # 128x128
large = "large"         # 256x256
x-large = "x-large"     # 512x512
xx-large = "xx-large"   # 1024x1024
custom = "custom"       # any other size, (WxH) prefixed filenames

# ---------------------------------------------------------------------------
# Default pipeline (used by every size without its own [sizes.*] table)
# ---------------------------------------------------------------------------
[default]
# "fit"     scale to fit inside the target, keep aspect ratio
# "fill"    scale to cover the target, crop the overflow from the center
# "pad"     fit, then center on a transparent canvas of exactly the target
# "stretch" scale each axis independently
resize_style = "fit"

# "auto" picks nearest for small sources being enlarged, smooth otherwise.
resample = "auto"

# Enlarge sources smaller than the target.
upscale = true

# Renderers to try, in order. Missing ones are skipped.
renderers = ["raster", "svg", "pdf", "html", "icons"]

# Layers composited under/over the resized image:
# background = { color = "#ffffffff" }
# foreground = { image = "overlay.png" }

# Greyscale or alpha image limiting the thumbnail's opacity.
# mask = "rounded.png"

# Explicit [width, height] target instead of the size class dimensions.
# size = [200, 150]

# ---------------------------------------------------------------------------
# Per-size pipelines (inherit every key not set from [default])
# ---------------------------------------------------------------------------
# [sizes.large]
# resize_style = "pad"
#
# [sizes."300x200"]
# resize_style = "fill"

# ---------------------------------------------------------------------------
# Icon fallback renderer
# ---------------------------------------------------------------------------
[icons]
# Used for anything no category matches. Makes the icon renderer accept
# every resource.
# fallback = "icons/blank.png"

# [icons.categories]
# video = "icons/video.png"
# audio = "icons/audio.png"
# document = "icons/document.png"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Color;
    use crate::test_helpers::{circle_mask, write_png};
    use tempfile::TempDir;

    fn parse(text: &str) -> Result<ManagerConfig, ConfigError> {
        let overlay: toml::Value = toml::from_str(text)?;
        resolve_config(stock_defaults_value()?, Some(overlay))
    }

    #[test]
    fn default_config_values() {
        let config = ManagerConfig::default();
        assert_eq!(config.app_name, "nailclipper");
        assert_eq!(config.app_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.cache_dir, CacheDir::Auto);
        assert_eq!(config.refresh, RefreshPolicy::Auto);
        assert_eq!(config.compliance, Compliance::None);
        assert_eq!(config.default.resize_style, ResizeStyle::Fit);
        assert!(config.default.upscale);
        assert_eq!(config.default.renderers, RendererKind::ALL.to_vec());
        assert!(config.sizes.is_empty());
    }

    #[test]
    fn fail_scope_and_software() {
        let mut config = ManagerConfig::default();
        config.app_name = "viewer".into();
        config.app_version = "2.1".into();
        assert_eq!(config.fail_scope(), "viewer-2.1");
        assert_eq!(config.software(), "viewer 2.1");
    }

    // =========================================================================
    // Presets
    // =========================================================================

    #[test]
    fn freedesktop_preset() {
        let config = ManagerConfig::freedesktop();
        assert_eq!(config.cache_dir, CacheDir::Freedesktop);
        assert_eq!(config.refresh, RefreshPolicy::Freedesktop);
        assert_eq!(config.compliance, Compliance::Freedesktop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn in_dir_preset() {
        let config = ManagerConfig::in_dir("/tmp/thumbs");
        assert_eq!(config.cache_dir, CacheDir::Path("/tmp/thumbs".into()));
        assert_eq!(config.refresh, RefreshPolicy::Auto);
    }

    // =========================================================================
    // Size pipelines
    // =========================================================================

    #[test]
    fn unmapped_size_uses_default_pipeline() {
        let config = parse(
            r#"
[default]
resize_style = "fill"
"#,
        )
        .unwrap();
        assert_eq!(
            config.pipeline_for(SizeClass::Large).resize_style,
            ResizeStyle::Fill
        );
        assert_eq!(config.target_for(SizeClass::Large), (256, 256));
    }

    #[test]
    fn size_pipeline_inherits_from_default() {
        let config = parse(
            r#"
[default]
resample = "lanczos"
upscale = false

[sizes.large]
resize_style = "pad"
"#,
        )
        .unwrap();
        let large = config.pipeline_for(SizeClass::Large);
        assert_eq!(large.resize_style, ResizeStyle::Pad);
        assert_eq!(large.resample, Resample::Lanczos);
        assert!(!large.upscale);
        // Other classes untouched
        assert_eq!(
            config.pipeline_for(SizeClass::Normal).resize_style,
            ResizeStyle::Fit
        );
    }

    #[test]
    fn size_pipeline_replaces_layer_wholesale() {
        let config = parse(
            r##"
[default]
background = { color = "#ffffffff" }

[sizes.normal]
background = { image = "paper.png" }
"##,
        )
        .unwrap();
        assert_eq!(
            config.pipeline_for(SizeClass::Normal).background,
            Some(Layer::Image("paper.png".into()))
        );
        assert_eq!(
            config.default.background,
            Some(Layer::Color(Color([255, 255, 255, 255])))
        );
    }

    #[test]
    fn custom_size_keys_parse() {
        let config = parse(
            r#"
[sizes."300x200"]
resize_style = "fill"
"#,
        )
        .unwrap();
        let custom = SizeClass::Custom {
            width: 300,
            height: 200,
        };
        assert_eq!(config.pipeline_for(custom).resize_style, ResizeStyle::Fill);
        assert_eq!(config.target_for(custom), (300, 200));
    }

    #[test]
    fn explicit_size_beats_size_class() {
        let config = parse(
            r#"
[sizes.normal]
size = [100, 50]
"#,
        )
        .unwrap();
        assert_eq!(config.target_for(SizeClass::Normal), (100, 50));
    }

    #[test]
    fn interval_refresh_parses() {
        let config = parse(r#"refresh = { interval = { days = 3 } }"#).unwrap();
        assert_eq!(config.refresh, RefreshPolicy::Interval { days: 3 });
    }

    #[test]
    fn path_cache_dir_parses() {
        let config = parse(r#"cache_dir = { path = "/var/thumbs" }"#).unwrap();
        assert_eq!(config.cache_dir, CacheDir::Path("/var/thumbs".into()));
    }

    // =========================================================================
    // Building transforms
    // =========================================================================

    #[test]
    fn build_loads_mask_and_layers() {
        let tmp = TempDir::new().unwrap();
        circle_mask(16, 16).save(tmp.path().join("mask.png")).unwrap();
        write_png(tmp.path(), "paper.png", 4, 4, [10, 20, 30, 255]);

        let pipeline = PipelineConfig {
            mask: Some("mask.png".into()),
            background: Some(Layer::Image("paper.png".into())),
            foreground: Some(Layer::Color(Color::TRANSPARENT)),
            ..PipelineConfig::default()
        };
        let transform = pipeline.build(tmp.path()).unwrap();
        assert_eq!(transform.mask.as_ref().map(|m| m.dimensions()), Some((16, 16)));
        assert!(matches!(transform.background, Some(Ground::Image(_))));
        assert!(matches!(transform.foreground, Some(Ground::Color(_))));
    }

    #[test]
    fn build_missing_mask_is_layer_error() {
        let tmp = TempDir::new().unwrap();
        let pipeline = PipelineConfig {
            mask: Some("nope.png".into()),
            ..PipelineConfig::default()
        };
        match pipeline.build(tmp.path()) {
            Err(ConfigError::Layer { path, .. }) => assert_eq!(path, tmp.path().join("nope.png")),
            other => panic!("expected layer error, got {other:?}"),
        }
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config.default, PipelineConfig::default());
        assert_eq!(config.base_dir, tmp.path());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
app_name = "viewer"
refresh = "never"

[folders]
custom = "odd"
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.app_name, "viewer");
        assert_eq!(config.refresh, RefreshPolicy::Never);
        assert_eq!(config.folders.custom, "odd");
        // Unspecified values should be defaults
        assert_eq!(config.folders.normal, "normal");
        assert_eq!(config.app_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn load_config_resolves_paths_against_file_dir() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[icons]
fallback = "blank.png"
"#,
        )
        .unwrap();
        let config = load_config(&config_path).unwrap();
        assert_eq!(
            config.icon_set().fallback,
            Some(tmp.path().join("blank.png"))
        );
        assert_eq!(
            config.resolve_path(Path::new("mask.png")),
            tmp.path().join("mask.png")
        );
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let result = load_config(&config_path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"app_name = "a""#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"app_name = "b""#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("app_name").unwrap().as_str(), Some("b"));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[default]
resize_style = "fit"
upscale = true
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[default]
upscale = false
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let default = merged.get("default").unwrap();
        assert_eq!(default.get("upscale").unwrap().as_bool(), Some(false));
        // resize_style preserved from base
        assert_eq!(default.get("resize_style").unwrap().as_str(), Some("fit"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str(r#"renderers = ["raster", "svg"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"renderers = ["icons"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("renderers").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn inherit_default_does_not_touch_default() {
        let value: toml::Value = toml::from_str(
            r#"
[default]
upscale = false
[sizes.large]
resize_style = "pad"
"#,
        )
        .unwrap();
        let value = inherit_default(value);
        assert!(value.get("default").unwrap().get("resize_style").is_none());
        let large = value.get("sizes").unwrap().get("large").unwrap();
        assert_eq!(large.get("upscale").unwrap().as_bool(), Some(false));
        assert_eq!(large.get("resize_style").unwrap().as_str(), Some("pad"));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let err = parse(
            r#"
[default]
resize_stlye = "fill"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(parse("[defaults]\nupscale = true").is_err());
    }

    #[test]
    fn unknown_size_class_rejected() {
        assert!(parse("[sizes.huge]\nupscale = true").is_err());
    }

    #[test]
    fn unknown_enum_value_rejected() {
        assert!(parse(r#"refresh = "sometimes""#).is_err());
        assert!(parse("[default]\nrenderers = [\"magic\"]").is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(ManagerConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_separator_in_app_name() {
        let mut config = ManagerConfig::default();
        config.app_name = "a/b".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_duplicate_folders() {
        let mut config = ManagerConfig::default();
        config.folders.large = "normal".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("used twice"));
    }

    #[test]
    fn validate_rejects_fail_folder() {
        let mut config = ManagerConfig::default();
        config.folders.custom = "fail".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_size_and_interval() {
        let mut config = ManagerConfig::default();
        config.default.size = Some([0, 10]);
        assert!(config.validate().is_err());

        let mut config = ManagerConfig::default();
        config.refresh = RefreshPolicy::Interval { days: 0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_renderers() {
        let result = parse("[sizes.large]\nrenderers = []");
        match result {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("sizes.large")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    // =========================================================================
    // stock_config_toml / stock_defaults_value tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let content = stock_config_toml();
        let _: toml::Value = toml::from_str(content).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config = parse(stock_config_toml()).unwrap();
        assert_eq!(config, ManagerConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        for key in ["app_name", "cache_dir", "refresh", "folders", "default", "icons"] {
            assert!(val.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn preset_survives_toml_roundtrip() {
        let value = toml::Value::try_from(ManagerConfig::freedesktop()).unwrap();
        let config = resolve_config(value, None).unwrap();
        assert_eq!(config, ManagerConfig::freedesktop());
    }
}
