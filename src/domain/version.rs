use crate::domain::prerelease::{PreRelease, Stage};
use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-(alpha|beta|rc)\.(\d+))?$")
            .expect("version regex is valid")
    })
}

/// Largest component a parsed version may carry, so that every builder can
/// bump it at least once
pub const MAX_COMPONENT: u32 = u32::MAX - 1;

/// Semantic version representation
///
/// `MAJOR.MINOR.PATCH` with an optional `-{alpha|beta|rc}.N` suffix. A full
/// release (no pre-release) orders above every pre-release of the same
/// `MAJOR.MINOR.PATCH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre: Option<PreRelease>,
}

impl SemanticVersion {
    /// Create a full (non pre-release) version
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        SemanticVersion {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Create a pre-release version
    pub fn with_stage(major: u32, minor: u32, patch: u32, stage: Stage, counter: u32) -> Self {
        SemanticVersion {
            major,
            minor,
            patch,
            pre: Some(PreRelease::new(stage, counter)),
        }
    }

    /// Parse `1.2.3` or `1.2.3-beta.4`
    pub fn parse(input: &str) -> Result<Self> {
        let captures = version_regex()
            .captures(input)
            .ok_or_else(|| ReleaseError::format(input))?;

        let number = |idx: usize| -> Result<u32> {
            let value = captures[idx]
                .parse::<u32>()
                .map_err(|_| ReleaseError::format(input))?;
            if value > MAX_COMPONENT {
                return Err(ReleaseError::validation(format!(
                    "'{}' has a component too large to bump",
                    input
                )));
            }
            Ok(value)
        };

        let pre = match (captures.get(4), captures.get(5)) {
            (Some(stage), Some(_)) => Some(PreRelease::new(stage.as_str().parse()?, number(5)?)),
            _ => None,
        };

        Ok(SemanticVersion {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre,
        })
    }

    /// Parse a tag name, tolerating the `v` prefix used by release tags
    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::parse(tag.strip_prefix('v').unwrap_or(tag))
    }

    /// Tag name for this version (`v1.2.3-rc.1`)
    pub fn tag_name(&self) -> String {
        format!("v{}", self)
    }

    pub fn stage(&self) -> Option<Stage> {
        self.pre.map(|p| p.stage)
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some()
    }

    /// Strip the pre-release part
    pub fn current_full_version(&self) -> Self {
        Self::new(self.major, self.minor, self.patch)
    }

    pub fn next_patch(&self) -> Self {
        Self::new(self.major, self.minor, bump(self.patch))
    }

    pub fn next_minor(&self) -> Self {
        Self::new(self.major, bump(self.minor), 0)
    }

    pub fn next_major(&self) -> Self {
        Self::new(bump(self.major), 0, 0)
    }

    pub fn next_patch_with_alpha(&self) -> Self {
        self.next_patch().starting(Stage::Alpha)
    }

    pub fn next_patch_with_beta(&self) -> Self {
        self.next_patch().starting(Stage::Beta)
    }

    pub fn next_minor_with_alpha(&self) -> Self {
        self.next_minor().starting(Stage::Alpha)
    }

    pub fn next_minor_with_beta(&self) -> Self {
        self.next_minor().starting(Stage::Beta)
    }

    pub fn next_major_with_alpha(&self) -> Self {
        self.next_major().starting(Stage::Alpha)
    }

    pub fn next_major_with_beta(&self) -> Self {
        self.next_major().starting(Stage::Beta)
    }

    /// Same `MAJOR.MINOR.PATCH`, given stage, counter 1
    pub fn starting(&self, stage: Stage) -> Self {
        SemanticVersion {
            pre: Some(PreRelease::first(stage)),
            ..*self
        }
    }

    /// Same stage, counter + 1. `None` for a full version.
    pub fn next_pre_release_counter(&self) -> Option<Self> {
        self.pre.map(|p| SemanticVersion {
            pre: Some(p.increment()),
            ..*self
        })
    }

    /// alpha -> beta.1 -> rc.1. `None` for rc and for full versions.
    pub fn next_stage(&self) -> Option<Self> {
        let next = self.pre?.stage.next()?;
        Some(self.starting(next))
    }

    /// rc.N -> rc.N+1, anything else -> rc.1 of the same `MAJOR.MINOR.PATCH`
    pub fn next_rc(&self) -> Self {
        match self.pre {
            Some(p) if p.stage == Stage::Rc => SemanticVersion {
                pre: Some(p.increment()),
                ..*self
            },
            _ => self.starting(Stage::Rc),
        }
    }

    /// `true` when both versions share `MAJOR.MINOR.PATCH`
    pub fn same_line(&self, other: &SemanticVersion) -> bool {
        self.major == other.major && self.minor == other.minor && self.patch == other.patch
    }
}

/// Components of a parsed version never exceed [MAX_COMPONENT], so this is
/// exact for one bump; it saturates rather than wrap beyond that
fn bump(component: u32) -> u32 {
    component.saturating_add(1)
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for SemanticVersion {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[test]
    fn test_version_parse() {
        let version = v("1.2.3");
        assert_eq!(version, SemanticVersion::new(1, 2, 3));
    }

    #[test]
    fn test_version_parse_with_stage() {
        assert_eq!(
            v("1.2.3-beta.4"),
            SemanticVersion::with_stage(1, 2, 3, Stage::Beta, 4)
        );
    }

    #[test]
    fn test_version_parse_rejects_invalid() {
        for input in ["help", "1.2.3.4", "1.2.3-invalid.4", "1.2", "v1.2.3", "1.2.3-rc", ""] {
            let err = SemanticVersion::parse(input).unwrap_err();
            assert!(
                err.to_string().starts_with("invalid format"),
                "unexpected error for '{}': {}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_version_from_tag() {
        assert_eq!(SemanticVersion::from_tag("v1.0.0").unwrap(), v("1.0.0"));
        assert_eq!(SemanticVersion::from_tag("2.1.0-rc.2").unwrap(), v("2.1.0-rc.2"));
        assert!(SemanticVersion::from_tag("release-1").is_err());
    }

    #[test]
    fn test_round_trip() {
        let base = v("1.3.5-alpha.1");
        let built = [
            base,
            base.current_full_version(),
            base.next_patch(),
            base.next_minor_with_beta(),
            base.next_major_with_alpha(),
            base.next_stage().unwrap(),
            base.next_pre_release_counter().unwrap(),
            base.next_rc(),
        ];
        for version in built {
            assert_eq!(SemanticVersion::parse(&version.to_string()).unwrap(), version);
        }
    }

    #[test]
    fn test_full_release_greater_than_any_stage() {
        assert!(v("1.0.0") > v("1.0.0-rc.99"));
        assert!(v("1.0.0") > v("1.0.0-alpha.1"));
        assert!(v("1.0.0-rc.1") > v("0.9.9"));
    }

    #[test]
    fn test_stage_ordering_ignores_counter_across_stages() {
        assert!(v("1.0.0-alpha.5") < v("1.0.0-beta.1"));
        assert!(v("1.0.0-beta.5") < v("1.0.0-rc.1"));
        assert!(v("1.0.0-beta.1") < v("1.0.0-beta.2"));
    }

    #[test]
    fn test_component_ordering() {
        assert!(v("1.2.3") < v("1.2.4"));
        assert!(v("1.2.9") < v("1.3.0"));
        assert!(v("1.9.9") < v("2.0.0-alpha.1"));
    }

    #[test]
    fn test_builders() {
        let base = v("1.3.5");
        assert_eq!(base.next_patch(), v("1.3.6"));
        assert_eq!(base.next_minor(), v("1.4.0"));
        assert_eq!(base.next_major(), v("2.0.0"));
        assert_eq!(base.next_minor_with_alpha(), v("1.4.0-alpha.1"));
        assert_eq!(base.next_major_with_beta(), v("2.0.0-beta.1"));
        assert_eq!(base.next_patch_with_alpha(), v("1.3.6-alpha.1"));
        assert_eq!(base.next_pre_release_counter(), None);
        assert_eq!(base.next_stage(), None);
        assert_eq!(base.next_rc(), v("1.3.5-rc.1"));
    }

    #[test]
    fn test_staged_builders() {
        let alpha = v("1.3.5-alpha.2");
        assert_eq!(alpha.next_pre_release_counter(), Some(v("1.3.5-alpha.3")));
        assert_eq!(alpha.next_stage(), Some(v("1.3.5-beta.1")));
        assert_eq!(alpha.current_full_version(), v("1.3.5"));
        assert_eq!(alpha.next_patch(), v("1.3.6"));
        assert_eq!(v("1.3.5-rc.2").next_stage(), None);
        assert_eq!(v("1.3.5-rc.2").next_rc(), v("1.3.5-rc.3"));
    }

    #[test]
    fn test_unbumpable_component_is_rejected() {
        for input in ["4294967295.0.0", "1.4294967295.0", "1.0.4294967295", "1.0.0-rc.4294967295"] {
            let err = SemanticVersion::parse(input).unwrap_err();
            assert!(matches!(err, ReleaseError::Validation(_)), "{}", input);
        }
        assert!(SemanticVersion::parse("4294967296.0.0").is_err());
    }

    #[test]
    fn test_largest_component_bumps_once() {
        let top = SemanticVersion::new(MAX_COMPONENT, MAX_COMPONENT, MAX_COMPONENT);
        assert_eq!(top.next_major().major, u32::MAX);
        assert_eq!(top.next_minor().minor, u32::MAX);
        assert_eq!(top.next_patch().patch, u32::MAX);
        let rc = SemanticVersion::with_stage(1, 0, 0, Stage::Rc, MAX_COMPONENT);
        assert_eq!(rc.next_rc().pre.unwrap().counter, u32::MAX);
    }

    #[test]
    fn test_tag_name() {
        assert_eq!(v("1.0.0-rc.1").tag_name(), "v1.0.0-rc.1");
    }
}
