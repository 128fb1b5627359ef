//! Domain logic - pure release rules independent of git operations

pub mod branch;
pub mod prerelease;
pub mod transitions;
pub mod version;

pub use branch::{BranchKind, BranchNames};
pub use prerelease::{PreRelease, Stage};
pub use transitions::{
    current_possible_versions_hotfix, next_possible_versions_develop,
    next_possible_versions_hotfix,
};
pub use version::{SemanticVersion, MAX_COMPONENT};
