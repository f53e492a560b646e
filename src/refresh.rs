//! Staleness decisions for existing artifacts.
//!
//! Policies are only consulted when an artifact already exists; a missing
//! artifact always means "generate". The decision uses nothing but the
//! artifact's embedded [provenance](crate::metadata), the artifact's own
//! mtime and the live source file.
//!
//! | Policy | Local file | Remote resource |
//! |---|---|---|
//! | `freedesktop` | stale when recorded mtime/size differ from the source | not applicable (kept) |
//! | `interval` | stale once the artifact is older than N days | same |
//! | `auto` | like `freedesktop` | like `interval`, 30 days |
//! | `never` | fresh | fresh |

use crate::metadata::{read_provenance, source_stat};
use crate::uri::ResourceUri;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::debug;

pub const DEFAULT_INTERVAL_DAYS: u32 = 10;
pub const AUTO_REMOTE_INTERVAL_DAYS: u32 = 30;

const DAY: u64 = 24 * 60 * 60;

fn default_days() -> u32 {
    DEFAULT_INTERVAL_DAYS
}

/// When an existing artifact should be regenerated.
///
/// ```toml
/// refresh = "freedesktop"
/// refresh = { interval = { days = 7 } }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPolicy {
    Freedesktop,
    Interval {
        #[serde(default = "default_days")]
        days: u32,
    },
    #[default]
    Auto,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    /// The policy has nothing to say about this resource. Treated as fresh.
    NotApplicable,
}

impl Freshness {
    pub fn is_stale(self) -> bool {
        self == Freshness::Stale
    }
}

impl RefreshPolicy {
    /// Judge the artifact at `artifact` for the source `uri` at time `now`.
    pub fn evaluate(&self, artifact: &Path, uri: &ResourceUri, now: SystemTime) -> Freshness {
        match *self {
            RefreshPolicy::Freedesktop => freedesktop(artifact, uri),
            RefreshPolicy::Interval { days } => interval(artifact, days, now),
            RefreshPolicy::Auto if uri.is_local() => freedesktop(artifact, uri),
            RefreshPolicy::Auto => interval(artifact, AUTO_REMOTE_INTERVAL_DAYS, now),
            RefreshPolicy::Never => Freshness::Fresh,
        }
    }
}

fn freedesktop(artifact: &Path, uri: &ResourceUri) -> Freshness {
    let Some(source) = uri.local_path() else {
        return Freshness::NotApplicable;
    };
    let recorded = match read_provenance(artifact) {
        Ok(p) => p,
        Err(e) => {
            debug!(artifact = %artifact.display(), error = %e, "unreadable artifact");
            return Freshness::Stale;
        }
    };
    let (Some(mtime), Some((live_mtime, live_size))) = (recorded.mtime, source_stat(&source))
    else {
        return Freshness::Stale;
    };
    if !mtime.matches(live_mtime) || recorded.size.is_some_and(|s| s != live_size) {
        return Freshness::Stale;
    }
    Freshness::Fresh
}

fn interval(artifact: &Path, days: u32, now: SystemTime) -> Freshness {
    let modified = match std::fs::metadata(artifact).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return Freshness::Stale,
    };
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    if age > Duration::from_secs(u64::from(days) * DAY) {
        Freshness::Stale
    } else {
        Freshness::Fresh
    }
}
