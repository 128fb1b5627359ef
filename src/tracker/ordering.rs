//! Position repair for tracker version lists.
//!
//! A new version is created at the end of the list. Repair moves it directly
//! after its predecessor (the largest smaller version of the same kind), or to
//! the front when it has none.
//!
//! Names are read as semantic versions first (`1.2.0`, `v1.2.0-rc.1`) and as
//! dotted numbers second (`2024.3`, `1.2.0.4`). Versions of different kinds
//! are never compared with each other.

use crate::error::{ReleaseError, Result};
use crate::tracker::{IssueTracker, TrackerVersion, VersionPosition};
use crate::ui::Output;
use log::debug;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionKey {
    Semantic(semver::Version),
    Numeric(Vec<u64>),
}

impl VersionKey {
    fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);

        if let Ok(version) = semver::Version::parse(bare) {
            return Some(VersionKey::Semantic(version));
        }

        let parts: Option<Vec<u64>> = bare.split('.').map(|p| p.parse().ok()).collect();
        parts
            .filter(|parts| !parts.is_empty())
            .map(VersionKey::Numeric)
    }

    /// `None` across kinds
    fn compare(&self, other: &VersionKey) -> Option<Ordering> {
        match (self, other) {
            (VersionKey::Semantic(a), VersionKey::Semantic(b)) => Some(a.cmp(b)),
            (VersionKey::Numeric(a), VersionKey::Numeric(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// The move that puts `id` in place, or `None` when it already is.
///
/// Fails when `id` is not in `versions` or its name parses as neither kind.
pub fn plan_position(versions: &[TrackerVersion], id: &str) -> Result<Option<VersionPosition>> {
    let index = versions
        .iter()
        .position(|v| v.id == id)
        .ok_or_else(|| ReleaseError::tracker(format!("no version with id {}", id)))?;
    let target = &versions[index];
    let key = VersionKey::parse(&target.name).ok_or_else(|| {
        ReleaseError::validation(format!(
            "version name '{}' is neither semantic nor dotted numeric",
            target.name
        ))
    })?;

    let mut predecessor: Option<(&TrackerVersion, VersionKey)> = None;
    for candidate in versions.iter().filter(|v| v.id != id) {
        let Some(candidate_key) = VersionKey::parse(&candidate.name) else {
            continue;
        };
        if candidate_key.compare(&key) != Some(Ordering::Less) {
            continue;
        }
        let closer = match &predecessor {
            Some((_, best)) => candidate_key.compare(best) == Some(Ordering::Greater),
            None => true,
        };
        if closer {
            predecessor = Some((candidate, candidate_key));
        }
    }

    let placed = match &predecessor {
        Some((previous, _)) => index > 0 && versions[index - 1].id == previous.id,
        None => index == 0,
    };
    if placed {
        return Ok(None);
    }

    Ok(Some(match predecessor {
        Some((previous, _)) => VersionPosition::After(previous.id.clone()),
        None => VersionPosition::First,
    }))
}

/// Move version `id` into order, warning instead of failing on odd names
pub fn repair_position(tracker: &dyn IssueTracker, output: &dyn Output, id: &str) -> Result<()> {
    let versions = tracker.versions()?;
    let plan = match plan_position(&versions, id) {
        Ok(plan) => plan,
        Err(ReleaseError::Validation(message)) => {
            output.warning(&format!("Leaving version position unchanged: {}", message));
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    match plan {
        Some(position) => tracker.move_version(id, &position),
        None => {
            debug!("tracker version {} already in place", id);
            Ok(())
        }
    }
}
