use crate::domain::SemanticVersion;
use crate::error::{ReleaseError, Result};
use crate::tracker::ordering::repair_position;
use crate::tracker::{IssueFilter, IssueTracker, TrackerVersion};
use crate::ui::Output;
use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use log::{debug, info};
use regex::Regex;
use std::sync::OnceLock;

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("number regex is valid"))
}

/// The first `weekday` strictly after `date`
pub fn next_weekday_after(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let from = date.weekday().num_days_from_monday();
    let to = weekday.num_days_from_monday();
    let mut days = (7 + to - from) % 7;
    if days == 0 {
        days = 7;
    }
    date + Days::new(u64::from(days))
}

/// Numeric components of a version name, in order of appearance
fn numeric_components(name: &str) -> Vec<u64> {
    number_regex()
        .find_iter(name)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// `name` with numeric component `index` incremented and later ones zeroed
fn increment_component(name: &str, index: usize) -> Result<String> {
    let count = number_regex().find_iter(name).count();
    if index >= count {
        return Err(ReleaseError::validation(format!(
            "'{}' has no numeric component {}",
            name, index
        )));
    }

    let mut position = 0;
    let mut failed = None;
    let updated = number_regex().replace_all(name, |caps: &regex::Captures<'_>| {
        let current = position;
        position += 1;
        let text = &caps[0];
        if current < index {
            text.to_string()
        } else if current == index {
            match text.parse::<u64>().map(|value| value.checked_add(1)) {
                Ok(Some(value)) => value.to_string(),
                Ok(None) => {
                    failed = Some(format!("component '{}' of '{}' cannot be incremented", text, name));
                    text.to_string()
                }
                Err(e) => {
                    failed = Some(e.to_string());
                    text.to_string()
                }
            }
        } else {
            "0".to_string()
        }
    });

    match failed {
        Some(message) => Err(ReleaseError::validation(message)),
        None => Ok(updated.into_owned()),
    }
}

/// Version lifecycle operations on top of an [IssueTracker]
pub struct VersionSync<'a> {
    tracker: &'a dyn IssueTracker,
    output: &'a dyn Output,
    today: NaiveDate,
}

impl<'a> VersionSync<'a> {
    pub fn new(tracker: &'a dyn IssueTracker, output: &'a dyn Output) -> Self {
        VersionSync {
            tracker,
            output,
            today: Local::now().date_naive(),
        }
    }

    /// Use a fixed date instead of the local date
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Create a version and move it into order
    pub fn create_version(
        &self,
        name: &str,
        release_date: Option<NaiveDate>,
    ) -> Result<TrackerVersion> {
        let created = self.tracker.create_version(name, release_date)?;
        repair_position(self.tracker, self.output, &created.id)?;
        Ok(created)
    }

    /// Create the version following the highest one matching `pattern`.
    ///
    /// The highest match is chosen by numeric components, then by name. The
    /// new release date is the first `weekday` after the highest match's
    /// release date (or after today when it has none).
    pub fn create_subsequent_version(
        &self,
        pattern: &str,
        component: usize,
        weekday: Weekday,
    ) -> Result<TrackerVersion> {
        let regex = Regex::new(pattern)
            .map_err(|e| ReleaseError::validation(format!("invalid pattern '{}': {}", pattern, e)))?;

        let versions = self.tracker.versions()?;
        let highest = versions
            .iter()
            .filter(|v| regex.is_match(&v.name))
            .max_by(|a, b| {
                numeric_components(&a.name)
                    .cmp(&numeric_components(&b.name))
                    .then_with(|| a.name.cmp(&b.name))
            })
            .ok_or_else(|| {
                ReleaseError::tracker(format!("no version matches pattern '{}'", pattern))
            })?;

        let name = increment_component(&highest.name, component)?;
        let date = next_weekday_after(highest.release_date.unwrap_or(self.today), weekday);
        info!("next version after '{}' is '{}' ({})", highest.name, name, date);
        self.create_version(&name, Some(date))
    }

    /// Mark `id` released today, moving its unresolved issues to
    /// `move_unresolved_to` unless that is `id` itself.
    pub fn release_version(&self, id: &str, move_unresolved_to: Option<&str>) -> Result<()> {
        self.tracker.release_version(id, self.today)?;
        if let Some(target) = move_unresolved_to.filter(|target| *target != id) {
            let unresolved = self.tracker.issues(id, IssueFilter::Unresolved)?;
            self.tracker.move_issues(&unresolved, id, target)?;
        }
        Ok(())
    }

    /// Release `id` and fold every older unreleased version into it.
    ///
    /// For each other unreleased, non-archived version whose name parses and
    /// orders below `id` (excluding `next_id`): closed issues move to `id`,
    /// open issues move to `next_id`, and the version is deleted.
    pub fn release_version_and_squash_unreleased(&self, id: &str, next_id: &str) -> Result<()> {
        let versions = self.tracker.versions()?;
        let released = versions
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| ReleaseError::tracker(format!("no version with id {}", id)))?;
        let released_version = released.semantic().ok_or_else(|| {
            ReleaseError::validation(format!("'{}' is not a semantic version", released.name))
        })?;

        self.release_version(id, None)?;

        for version in &versions {
            if version.id == id || version.id == next_id || version.released || version.archived
            {
                continue;
            }
            let Some(parsed) = version.semantic() else {
                continue;
            };
            if parsed >= released_version {
                continue;
            }

            debug!("squashing '{}' into '{}'", version.name, released.name);
            let closed = self.tracker.issues(&version.id, IssueFilter::Closed)?;
            self.tracker.move_issues(&closed, &version.id, id)?;
            let open = self.tracker.issues(&version.id, IssueFilter::Open)?;
            self.tracker.move_issues(&open, &version.id, next_id)?;
            self.tracker.delete_version(&version.id)?;
            self.output
                .status(&format!("Squashed tracker version {}", version.name));
        }
        Ok(())
    }

    /// The tracker version for `version`, created when missing
    pub fn ensure_version(&self, version: &SemanticVersion) -> Result<TrackerVersion> {
        let existing = self
            .tracker
            .versions()?
            .into_iter()
            .find(|v| v.semantic().as_ref() == Some(version));
        match existing {
            Some(found) => Ok(found),
            None => self.create_version(&version.to_string(), None),
        }
    }

    /// Record a release of `version` in the tracker.
    ///
    /// A full version is released and older unreleased versions are squashed
    /// into it, with open work going to `next`. A pre-release is released and
    /// its unresolved issues move to the full version it leads up to.
    pub fn sync_release(&self, version: &SemanticVersion, next: &SemanticVersion) -> Result<()> {
        let current = self.ensure_version(version)?;

        if version.is_pre_release() {
            let full = self.ensure_version(&version.current_full_version())?;
            self.release_version(&current.id, Some(&full.id))?;
        } else {
            let following = self.ensure_version(next)?;
            self.release_version_and_squash_unreleased(&current.id, &following.id)?;
        }

        self.output
            .success(&format!("Released tracker version {}", version));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::MockTracker;
    use crate::ui::RecordingOutput;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_weekday_is_strictly_after() {
        // 2024-03-04 is a Monday
        assert_eq!(next_weekday_after(date(2024, 3, 4), Weekday::Mon), date(2024, 3, 11));
        assert_eq!(next_weekday_after(date(2024, 3, 4), Weekday::Wed), date(2024, 3, 6));
        assert_eq!(next_weekday_after(date(2024, 3, 8), Weekday::Mon), date(2024, 3, 11));
    }

    #[test]
    fn test_increment_component() {
        assert_eq!(increment_component("1.4.2", 1).unwrap(), "1.5.0");
        assert_eq!(increment_component("Sprint 2024.9", 1).unwrap(), "Sprint 2024.10");
        assert_eq!(increment_component("1.4.2", 0).unwrap(), "2.0.0");
        assert!(increment_component("1.4", 2).is_err());
    }

    #[test]
    fn test_increment_component_at_u64_max_fails() {
        let name = format!("1.{}.0", u64::MAX);
        let err = increment_component(&name, 1).unwrap_err();
        assert!(matches!(err, ReleaseError::Validation(_)));
        assert_eq!(increment_component(&name, 0).unwrap(), "2.0.0");
    }

    #[test]
    fn test_squash_with_one_newer_unrelated_version() {
        let tracker = MockTracker::new();
        let old_a = tracker.add_version("1.0.1");
        let old_b = tracker.add_version("1.0.2");
        let old_rc = tracker.add_version("1.1.0-rc.1");
        let released = tracker.add_version("1.1.0");
        let next = tracker.add_version("1.2.0");
        let newer = tracker.add_version("2.0.0");
        let shipped = tracker.add_version_with("0.9.0", Some(date(2023, 1, 1)), true, false);

        tracker.add_issue("REL-1", &old_a, true, true);
        tracker.add_issue("REL-2", &old_a, false, false);
        tracker.add_issue("REL-3", &old_b, true, true);
        tracker.add_issue("REL-4", &newer, false, false);
        tracker.add_issue("REL-5", &old_rc, true, true);
        tracker.add_issue("REL-6", &old_rc, false, false);

        let output = RecordingOutput::new();
        VersionSync::new(&tracker, &output)
            .with_today(date(2024, 5, 1))
            .release_version_and_squash_unreleased(&released, &next)
            .unwrap();

        assert_eq!(
            tracker.version_names(),
            vec!["1.1.0", "1.2.0", "2.0.0", "0.9.0"]
        );
        let released_version = tracker.version(&released).unwrap();
        assert!(released_version.released);
        assert_eq!(released_version.release_date, Some(date(2024, 5, 1)));

        assert_eq!(tracker.issue_version("REL-1"), Some(released.clone()));
        assert_eq!(tracker.issue_version("REL-2"), Some(next.clone()));
        assert_eq!(tracker.issue_version("REL-3"), Some(released.clone()));
        assert_eq!(tracker.issue_version("REL-4"), Some(newer.clone()));
        assert_eq!(tracker.issue_version("REL-5"), Some(released.clone()));
        assert_eq!(tracker.issue_version("REL-6"), Some(next.clone()));
        assert!(tracker.version(&old_rc).is_none());
        assert!(tracker.version(&newer).is_some());
        assert!(tracker.version(&shipped).is_some());
    }

    #[test]
    fn test_release_moves_unresolved_unless_same_id() {
        let tracker = MockTracker::new();
        let rc = tracker.add_version("1.0.0-rc.1");
        let full = tracker.add_version("1.0.0");
        tracker.add_issue("REL-1", &rc, false, false);
        tracker.add_issue("REL-2", &rc, true, false);
        let output = RecordingOutput::new();
        let sync = VersionSync::new(&tracker, &output);

        sync.release_version(&rc, Some(&rc)).unwrap();
        assert_eq!(tracker.issue_version("REL-1"), Some(rc.clone()));

        sync.release_version(&rc, Some(&full)).unwrap();
        assert_eq!(tracker.issue_version("REL-1"), Some(full));
        assert_eq!(tracker.issue_version("REL-2"), Some(rc));
    }

    #[test]
    fn test_create_subsequent_version() {
        let tracker = MockTracker::new();
        tracker.add_version_with("Sprint 2024.8", Some(date(2024, 3, 4)), true, false);
        tracker.add_version_with("Sprint 2024.10", Some(date(2024, 4, 1)), false, false);
        tracker.add_version("1.0.0");
        let output = RecordingOutput::new();

        let created = VersionSync::new(&tracker, &output)
            .create_subsequent_version(r"^Sprint ", 1, Weekday::Mon)
            .unwrap();

        assert_eq!(created.name, "Sprint 2024.11");
        assert_eq!(created.release_date, Some(date(2024, 4, 8)));
    }

    #[test]
    fn test_create_subsequent_version_without_match() {
        let tracker = MockTracker::new();
        tracker.add_version("1.0.0");
        let output = RecordingOutput::new();
        let err = VersionSync::new(&tracker, &output)
            .create_subsequent_version(r"^Sprint ", 1, Weekday::Mon)
            .unwrap_err();
        assert!(err.to_string().contains("no version matches"));
    }

    #[test]
    fn test_sync_pre_release_creates_and_moves() {
        let tracker = MockTracker::new();
        tracker.add_version("0.9.0");
        let output = RecordingOutput::new();
        let sync = VersionSync::new(&tracker, &output);

        let rc = SemanticVersion::parse("1.0.0-rc.1").unwrap();
        sync.sync_release(&rc, &rc.current_full_version()).unwrap();

        assert_eq!(tracker.version_names(), vec!["0.9.0", "1.0.0-rc.1", "1.0.0"]);
        let released: Vec<bool> = tracker
            .versions()
            .unwrap()
            .iter()
            .map(|v| v.released)
            .collect();
        assert_eq!(released, vec![false, true, false]);
        assert!(output.contains("Released tracker version 1.0.0-rc.1"));
    }
}
