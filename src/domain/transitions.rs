//! Candidate version menus
//!
//! These are the legal next versions offered to the user for each branch
//! context. The order of each list is the order of the menu, and the first
//! entry becomes the default selection, so it is part of the contract.

use crate::domain::prerelease::{PreRelease, Stage};
use crate::domain::version::SemanticVersion;

/// Candidates when cutting a release from the mainline, given the latest
/// version `v` released from it.
pub fn next_possible_versions_develop(
    v: &SemanticVersion,
    exclude_pre_release: bool,
) -> Vec<SemanticVersion> {
    let full = v.current_full_version();
    let major_tail = [
        v.next_major_with_alpha(),
        v.next_major_with_beta(),
        v.next_major(),
    ];

    match (v.pre, exclude_pre_release) {
        (Some(_), true) => vec![full, v.next_major()],
        (Some(pre), false) => {
            let mut candidates = Vec::with_capacity(6);
            match pre.stage {
                Stage::Alpha => {
                    candidates.extend(v.next_pre_release_counter());
                    candidates.extend(v.next_stage());
                }
                Stage::Beta => candidates.extend(v.next_pre_release_counter()),
                Stage::Rc => {}
            }
            candidates.push(full);
            candidates.extend(major_tail);
            candidates
        }
        (None, true) => vec![v.next_minor(), v.next_major()],
        (None, false) => {
            let mut candidates = vec![
                v.next_minor_with_alpha(),
                v.next_minor_with_beta(),
                v.next_minor(),
            ];
            candidates.extend(major_tail);
            candidates
        }
    }
}

/// Candidates for continuing a patch line after `v`.
pub fn next_possible_versions_hotfix(v: &SemanticVersion) -> Vec<SemanticVersion> {
    match v.pre {
        Some(pre) => match pre.stage {
            Stage::Alpha => vec![
                bump_counter(v, pre),
                v.starting(Stage::Beta),
                v.next_patch(),
            ],
            Stage::Beta | Stage::Rc => vec![
                bump_counter(v, pre),
                v.next_patch(),
            ],
        },
        None => vec![
            v.next_patch_with_alpha(),
            v.next_patch_with_beta(),
            v.next_patch(),
        ],
    }
}

/// Candidates for the current hotfix target (no patch bump).
pub fn current_possible_versions_hotfix(v: &SemanticVersion) -> Vec<SemanticVersion> {
    let full = v.current_full_version();
    match v.pre {
        Some(pre) => match pre.stage {
            Stage::Alpha => vec![
                bump_counter(v, pre),
                v.starting(Stage::Beta),
                full,
            ],
            Stage::Beta | Stage::Rc => vec![
                bump_counter(v, pre),
                full,
            ],
        },
        None => vec![v.starting(Stage::Alpha), v.starting(Stage::Beta), full],
    }
}

fn bump_counter(v: &SemanticVersion, pre: PreRelease) -> SemanticVersion {
    SemanticVersion {
        pre: Some(pre.increment()),
        ..*v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    fn vs(list: &[&str]) -> Vec<SemanticVersion> {
        list.iter().map(|s| v(s)).collect()
    }

    fn sorted(mut list: Vec<SemanticVersion>) -> Vec<SemanticVersion> {
        list.sort();
        list
    }

    #[test]
    fn test_menus_at_largest_component_do_not_overflow() {
        let top = v("4294967294.4294967294.4294967294");
        let develop = next_possible_versions_develop(&top, false);
        assert!(develop.contains(&SemanticVersion::new(u32::MAX, 0, 0)));
        let hotfix = next_possible_versions_hotfix(&top);
        assert_eq!(hotfix.last(), Some(&top.next_patch()));
        assert!(SemanticVersion::parse("4294967295.0.0").is_err());
    }

    #[test]
    fn test_develop_from_alpha() {
        let result = next_possible_versions_develop(&v("1.3.5-alpha.1"), false);
        assert_eq!(
            sorted(result.clone()),
            sorted(vs(&[
                "1.3.5",
                "2.0.0",
                "2.0.0-alpha.1",
                "2.0.0-beta.1",
                "1.3.5-alpha.2",
                "1.3.5-beta.1"
            ]))
        );
        assert_eq!(
            result,
            vs(&[
                "1.3.5-alpha.2",
                "1.3.5-beta.1",
                "1.3.5",
                "2.0.0-alpha.1",
                "2.0.0-beta.1",
                "2.0.0"
            ])
        );
    }

    #[test]
    fn test_develop_from_beta() {
        assert_eq!(
            next_possible_versions_develop(&v("1.3.5-beta.2"), false),
            vs(&["1.3.5-beta.3", "1.3.5", "2.0.0-alpha.1", "2.0.0-beta.1", "2.0.0"])
        );
    }

    #[test]
    fn test_develop_from_rc() {
        assert_eq!(
            next_possible_versions_develop(&v("1.3.5-rc.1"), false),
            vs(&["1.3.5", "2.0.0-alpha.1", "2.0.0-beta.1", "2.0.0"])
        );
    }

    #[test]
    fn test_develop_staged_excluding_pre_release() {
        assert_eq!(
            next_possible_versions_develop(&v("1.3.5-beta.2"), true),
            vs(&["1.3.5", "2.0.0"])
        );
    }

    #[test]
    fn test_develop_full() {
        assert_eq!(
            next_possible_versions_develop(&v("1.3.5"), false),
            vs(&[
                "1.4.0-alpha.1",
                "1.4.0-beta.1",
                "1.4.0",
                "2.0.0-alpha.1",
                "2.0.0-beta.1",
                "2.0.0"
            ])
        );
        assert_eq!(
            next_possible_versions_develop(&v("1.3.5"), true),
            vs(&["1.4.0", "2.0.0"])
        );
    }

    #[test]
    fn test_hotfix_next_from_full() {
        assert_eq!(
            next_possible_versions_hotfix(&v("1.3.5")),
            vs(&["1.3.6-alpha.1", "1.3.6-beta.1", "1.3.6"])
        );
    }

    #[test]
    fn test_hotfix_next_from_stages() {
        assert_eq!(
            next_possible_versions_hotfix(&v("1.3.5-alpha.2")),
            vs(&["1.3.5-alpha.3", "1.3.5-beta.1", "1.3.6"])
        );
        assert_eq!(
            next_possible_versions_hotfix(&v("1.3.5-beta.1")),
            vs(&["1.3.5-beta.2", "1.3.6"])
        );
        assert_eq!(
            next_possible_versions_hotfix(&v("1.3.5-rc.4")),
            vs(&["1.3.5-rc.5", "1.3.6"])
        );
    }

    #[test]
    fn test_hotfix_current() {
        assert_eq!(
            current_possible_versions_hotfix(&v("1.3.5")),
            vs(&["1.3.5-alpha.1", "1.3.5-beta.1", "1.3.5"])
        );
        assert_eq!(
            current_possible_versions_hotfix(&v("1.3.5-alpha.1")),
            vs(&["1.3.5-alpha.2", "1.3.5-beta.1", "1.3.5"])
        );
        assert_eq!(
            current_possible_versions_hotfix(&v("1.3.5-beta.3")),
            vs(&["1.3.5-beta.4", "1.3.5"])
        );
        assert_eq!(
            current_possible_versions_hotfix(&v("1.3.5-rc.1")),
            vs(&["1.3.5-rc.2", "1.3.5"])
        );
    }
}
