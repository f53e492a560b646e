//! Compliance profiles.
//!
//! A profile is a pure predicate over a fully resolved [`ManagerConfig`],
//! evaluated once when a manager is built. The first violated rule is
//! reported with the offending field.
//!
//! | Rule | `freedesktop` | `freedesktop-strict` |
//! |---|---|---|
//! | cache dir is the shared Freedesktop cache | ✓ | ✓ |
//! | standard folders are `normal` / `large` / `x-large` / `xx-large` | ✓ | ✓ |
//! | failure scope is `<app>-<version>` | ✓ | ✓ |
//! | refresh is `freedesktop` or `auto` | ✓ | ✓ |
//! | pipelines use fit or pad, no mask, no foreground | ✓ | ✓ |
//! | explicit sizes on standard classes match the class | ✓ | ✓ |
//! | no background (or a fully transparent colour) | | ✓ |
//! | style is fit, resample is auto, upscale on | | ✓ |

use crate::cache::SizeFolders;
use crate::config::{ManagerConfig, PipelineConfig};
use crate::imaging::{Layer, Resample, ResizeStyle};
use crate::refresh::RefreshPolicy;
use crate::types::SizeClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compliance {
    #[default]
    None,
    Freedesktop,
    FreedesktopStrict,
}

impl fmt::Display for Compliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compliance::None => "none",
            Compliance::Freedesktop => "freedesktop",
            Compliance::FreedesktopStrict => "freedesktop-strict",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("configuration is not {profile} compliant: {field}: {reason}")]
pub struct ComplianceError {
    pub profile: Compliance,
    pub field: String,
    pub reason: String,
}

impl Compliance {
    /// Check `config` against this profile.
    pub fn check(self, config: &ManagerConfig) -> Result<(), ComplianceError> {
        if self == Compliance::None {
            return Ok(());
        }
        let fail = |field: &str, reason: &str| ComplianceError {
            profile: self,
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if !config.cache_dir.is_freedesktop() {
            return Err(fail("cache_dir", "must be \"freedesktop\""));
        }

        let stock = SizeFolders::default();
        for size in SizeClass::STANDARD {
            if config.folders.folder(size) != stock.folder(size) {
                return Err(fail(
                    &format!("folders.{}", stock.folder(size)),
                    &format!("must be \"{}\"", stock.folder(size)),
                ));
            }
        }

        if config.app_name.is_empty() || config.app_version.is_empty() {
            return Err(fail(
                "app_name",
                "failure scope must be <name>-<version> with both parts non-empty",
            ));
        }

        if !matches!(
            config.refresh,
            RefreshPolicy::Freedesktop | RefreshPolicy::Auto
        ) {
            return Err(fail("refresh", "must be \"freedesktop\" or \"auto\""));
        }

        let pipelines = std::iter::once(("default".to_string(), None, &config.default)).chain(
            config
                .sizes
                .iter()
                .map(|(size, p)| (format!("sizes.{size}"), Some(*size), p)),
        );
        for (name, size, pipeline) in pipelines {
            self.check_pipeline(pipeline, size)
                .map_err(|(key, reason)| fail(&format!("{name}.{key}"), reason))?;
        }

        Ok(())
    }

    fn check_pipeline(
        self,
        p: &PipelineConfig,
        size: Option<SizeClass>,
    ) -> Result<(), (&'static str, &'static str)> {
        if !matches!(p.resize_style, ResizeStyle::Fit | ResizeStyle::Pad) {
            return Err(("resize_style", "must be fit or pad"));
        }
        if p.mask.is_some() {
            return Err(("mask", "masks are not allowed"));
        }
        if p.foreground.is_some() {
            return Err(("foreground", "foreground layers are not allowed"));
        }
        if let (Some(size), Some([w, h])) = (size.filter(|s| s.is_standard()), p.size) {
            if (w, h) != size.dimensions() {
                return Err(("size", "must match the size class dimensions"));
            }
        }

        if self == Compliance::FreedesktopStrict {
            match &p.background {
                None => {}
                Some(Layer::Color(c)) if c.is_transparent() => {}
                Some(_) => return Err(("background", "must be absent or fully transparent")),
            }
            if p.resize_style != ResizeStyle::Fit {
                return Err(("resize_style", "must be fit"));
            }
            if p.resample != Resample::Auto {
                return Err(("resample", "must be auto"));
            }
            if !p.upscale {
                return Err(("upscale", "must be enabled"));
            }
        }
        Ok(())
    }
}
