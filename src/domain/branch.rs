use crate::domain::version::SemanticVersion;
use std::fmt;

pub const RELEASE_PREFIX: &str = "release/v";
pub const HOTFIX_PREFIX: &str = "hotfix/v";
pub const PRERELEASE_PREFIX: &str = "prerelease/v";
pub const SUPPORT_PREFIX: &str = "support/v";

/// Long-lived branch names; configurable, defaulting to git-flow's
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNames {
    pub develop: String,
    pub master: String,
}

impl Default for BranchNames {
    fn default() -> Self {
        BranchNames {
            develop: "develop".to_string(),
            master: "master".to_string(),
        }
    }
}

/// What kind of branch the repository is currently on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchKind {
    Develop,
    Master,
    Release(SemanticVersion),
    Hotfix(SemanticVersion),
    PreRelease(SemanticVersion),
    Support { major: u32, minor: u32 },
    Unknown(String),
}

impl BranchKind {
    /// Classify a branch name
    ///
    /// A versioned prefix followed by something that is not a version
    /// (`release/vnext`) is `Unknown`.
    pub fn classify(name: &str, names: &BranchNames) -> Self {
        if name == names.develop {
            return BranchKind::Develop;
        }
        if name == names.master {
            return BranchKind::Master;
        }

        let versioned = |prefix: &str| {
            name.strip_prefix(prefix)
                .and_then(|rest| SemanticVersion::parse(rest).ok())
        };

        if let Some(version) = versioned(RELEASE_PREFIX) {
            return BranchKind::Release(version);
        }
        if let Some(version) = versioned(HOTFIX_PREFIX) {
            return BranchKind::Hotfix(version);
        }
        if let Some(version) = versioned(PRERELEASE_PREFIX) {
            return BranchKind::PreRelease(version);
        }
        if let Some((major, minor)) = name
            .strip_prefix(SUPPORT_PREFIX)
            .and_then(parse_major_minor)
        {
            return BranchKind::Support { major, minor };
        }

        BranchKind::Unknown(name.to_string())
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchKind::Develop => write!(f, "develop"),
            BranchKind::Master => write!(f, "master"),
            BranchKind::Release(v) => write!(f, "release {}", v),
            BranchKind::Hotfix(v) => write!(f, "hotfix {}", v),
            BranchKind::PreRelease(v) => write!(f, "pre-release {}", v),
            BranchKind::Support { major, minor } => write!(f, "support {}.{}", major, minor),
            BranchKind::Unknown(name) => write!(f, "unknown branch '{}'", name),
        }
    }
}

fn parse_major_minor(s: &str) -> Option<(u32, u32)> {
    let (major, minor) = s.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

pub fn release_branch(version: &SemanticVersion) -> String {
    format!("{}{}", RELEASE_PREFIX, version)
}

pub fn hotfix_branch(version: &SemanticVersion) -> String {
    format!("{}{}", HOTFIX_PREFIX, version)
}

pub fn prerelease_branch(version: &SemanticVersion) -> String {
    format!("{}{}", PRERELEASE_PREFIX, version)
}

pub fn support_branch(major: u32, minor: u32) -> String {
    format!("{}{}.{}", SUPPORT_PREFIX, major, minor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str) -> BranchKind {
        BranchKind::classify(name, &BranchNames::default())
    }

    #[test]
    fn test_long_lived_branches() {
        assert_eq!(classify("develop"), BranchKind::Develop);
        assert_eq!(classify("master"), BranchKind::Master);
    }

    #[test]
    fn test_versioned_branches() {
        assert_eq!(
            classify("release/v1.2.0"),
            BranchKind::Release(SemanticVersion::new(1, 2, 0))
        );
        assert_eq!(
            classify("hotfix/v1.2.1"),
            BranchKind::Hotfix(SemanticVersion::new(1, 2, 1))
        );
        assert_eq!(
            classify("prerelease/v1.3.0-beta.2"),
            BranchKind::PreRelease(SemanticVersion::parse("1.3.0-beta.2").unwrap())
        );
        assert_eq!(
            classify("support/v1.2"),
            BranchKind::Support { major: 1, minor: 2 }
        );
    }

    #[test]
    fn test_unknown_branches() {
        assert_eq!(
            classify("feature/login"),
            BranchKind::Unknown("feature/login".to_string())
        );
        assert!(matches!(classify("release/vnext"), BranchKind::Unknown(_)));
        assert!(matches!(classify("support/v1"), BranchKind::Unknown(_)));
        assert!(matches!(classify("main"), BranchKind::Unknown(_)));
    }

    #[test]
    fn test_custom_long_lived_names() {
        let names = BranchNames {
            develop: "dev".to_string(),
            master: "main".to_string(),
        };
        assert_eq!(BranchKind::classify("dev", &names), BranchKind::Develop);
        assert_eq!(BranchKind::classify("main", &names), BranchKind::Master);
        assert!(matches!(
            BranchKind::classify("develop", &names),
            BranchKind::Unknown(_)
        ));
    }

    #[test]
    fn test_branch_name_builders() {
        let v = SemanticVersion::parse("1.2.0-rc.1").unwrap();
        assert_eq!(release_branch(&SemanticVersion::new(1, 2, 0)), "release/v1.2.0");
        assert_eq!(prerelease_branch(&v), "prerelease/v1.2.0-rc.1");
        assert_eq!(hotfix_branch(&SemanticVersion::new(1, 2, 1)), "hotfix/v1.2.1");
        assert_eq!(support_branch(1, 2), "support/v1.2");
    }
}
