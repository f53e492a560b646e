//! CLI output formatting.
//!
//! Output is **resource-first**: every lookup leads with what was asked for
//! (the input as typed and the size), with the cache path shown as indented
//! context. Logs go to stderr; everything here goes to stdout.
//!
//! # Output Format
//!
//! ## get
//!
//! ```text
//! photos/cat.jpg (normal)
//!     generated: /home/me/.cache/nailclipper/thumbnails/normal/1f0e….png
//! https://example.com/ (large)
//!     failed
//!
//! Cache: 3 cached, 1 generated, 1 failed (5 total)
//! ```
//!
//! ## check-config
//!
//! ```text
//! Cache: /home/me/.cache/nailclipper/thumbnails
//! Refresh: auto
//! Compliance: none
//! Pipelines
//!     default: fit, upscale, renderers raster → svg → icons
//!     large (256x256): pad, background, renderers raster
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>` or
//! `String`) for testability and, where the command prints more than one
//! line, a `print_*` wrapper that writes to stdout. Format functions are
//! pure: no I/O, no side effects.

use crate::config::{ManagerConfig, PipelineConfig};
use crate::imaging::ResizeStyle;
use crate::manager::Thumbnail;
use crate::metadata::Provenance;
use crate::refresh::RefreshPolicy;
use crate::types::SizeClass;
use serde::Serialize;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// get / path / clear-failure
// ============================================================================

/// Format one lookup as a header plus an indented status line.
pub fn format_thumbnail(input: &str, size: SizeClass, outcome: &Thumbnail) -> Vec<String> {
    let status = match outcome {
        Thumbnail::Cached(p) => format!("cached: {}", p.display()),
        Thumbnail::Generated(p) => format!("generated: {}", p.display()),
        Thumbnail::Failed => "failed".to_string(),
        Thumbnail::PreviouslyFailed => "failed earlier (see clear-failure)".to_string(),
    };
    vec![format!("{input} ({size})"), format!("{}{status}", indent(1))]
}

pub fn print_thumbnail(input: &str, size: SizeClass, outcome: &Thumbnail) {
    for line in format_thumbnail(input, size, outcome) {
        println!("{}", line);
    }
}

pub fn format_clear_failure(input: &str, removed: bool) -> String {
    if removed {
        format!("{input}: failure marker removed")
    } else {
        format!("{input}: no failure marker")
    }
}

// ============================================================================
// info
// ============================================================================

#[derive(Serialize)]
struct Info<'a> {
    path: &'a Path,
    #[serde(flatten)]
    provenance: &'a Provenance,
}

/// Pretty JSON of a thumbnail's provenance.
pub fn format_info(path: &Path, provenance: &Provenance) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Info { path, provenance })
}

// ============================================================================
// check-config
// ============================================================================

fn pipeline_summary(pipeline: &PipelineConfig) -> String {
    let style = match pipeline.resize_style {
        ResizeStyle::Fit => "fit",
        ResizeStyle::Fill => "fill",
        ResizeStyle::Pad => "pad",
        ResizeStyle::Stretch => "stretch",
    };
    let mut parts = vec![style.to_string()];
    if pipeline.upscale {
        parts.push("upscale".into());
    }
    if pipeline.background.is_some() {
        parts.push("background".into());
    }
    if pipeline.foreground.is_some() {
        parts.push("foreground".into());
    }
    if pipeline.mask.is_some() {
        parts.push("mask".into());
    }
    let order: Vec<&str> = pipeline.renderers.iter().map(|r| r.as_str()).collect();
    parts.push(format!("renderers {}", order.join(" \u{2192} ")));
    parts.join(", ")
}

/// Summarize a resolved configuration and where its cache lives.
pub fn format_config_check(config: &ManagerConfig, cache_root: &Path) -> Vec<String> {
    let refresh = match config.refresh {
        RefreshPolicy::Freedesktop => "freedesktop".to_string(),
        RefreshPolicy::Interval { days } => format!("every {days} days"),
        RefreshPolicy::Auto => "auto".to_string(),
        RefreshPolicy::Never => "never".to_string(),
    };
    let mut lines = vec![
        format!("Cache: {}", cache_root.display()),
        format!("Refresh: {refresh}"),
        format!("Compliance: {}", config.compliance),
        "Pipelines".to_string(),
        format!("{}default: {}", indent(1), pipeline_summary(&config.default)),
    ];
    for (size, pipeline) in &config.sizes {
        let (w, h) = config.target_for(*size);
        lines.push(format!(
            "{}{size} ({w}x{h}): {}",
            indent(1),
            pipeline_summary(pipeline)
        ));
    }
    lines
}

pub fn print_config_check(config: &ManagerConfig, cache_root: &Path) {
    for line in format_config_check(config, cache_root) {
        println!("{}", line);
    }
}
