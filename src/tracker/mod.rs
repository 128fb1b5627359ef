//! Issue tracker integration.
//!
//! The [IssueTracker] trait abstracts the version and issue operations a
//! release needs so the lifecycle logic in [sync] runs the same against the
//! REST client in [jira] and the in-memory [mock::MockTracker].
//!
//! - `auth` - bounded credential retry loop
//! - `ordering` - position repair for version lists
//! - `sync` - release, squash and subsequent-version logic

pub mod auth;
pub mod jira;
pub mod mock;
pub mod ordering;
pub mod sync;

pub use auth::{authenticate, Credentials, MAX_ATTEMPTS};
pub use jira::JiraTracker;
pub use mock::MockTracker;
pub use sync::VersionSync;

use crate::domain::SemanticVersion;
use crate::error::Result;
use chrono::NaiveDate;

/// A version as the tracker knows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerVersion {
    pub id: String,
    pub name: String,
    pub release_date: Option<NaiveDate>,
    pub released: bool,
    pub archived: bool,
}

impl TrackerVersion {
    /// The semantic version named by this tracker version, `v` prefix allowed
    pub fn semantic(&self) -> Option<SemanticVersion> {
        SemanticVersion::from_tag(&self.name).ok()
    }
}

/// Where to move a version within the project's version list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPosition {
    First,
    /// Directly after the version with this id
    After(String),
}

/// Which issues of a version to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueFilter {
    /// No resolution set
    Unresolved,
    /// Not in a done/closed status
    Open,
    Closed,
}

/// Version and issue operations against one tracker project
///
/// The project is fixed when the implementation is constructed.
pub trait IssueTracker {
    /// All versions of the project, in the tracker's display order
    fn versions(&self) -> Result<Vec<TrackerVersion>>;

    fn create_version(&self, name: &str, release_date: Option<NaiveDate>)
        -> Result<TrackerVersion>;

    /// Mark a version released on `date`
    fn release_version(&self, id: &str, date: NaiveDate) -> Result<()>;

    fn delete_version(&self, id: &str) -> Result<()>;

    fn move_version(&self, id: &str, position: &VersionPosition) -> Result<()>;

    /// Keys of the issues whose fix version is `version_id`
    fn issues(&self, version_id: &str, filter: IssueFilter) -> Result<Vec<String>>;

    /// Replace fix version `from_id` with `to_id` on each issue
    fn move_issues(&self, keys: &[String], from_id: &str, to_id: &str) -> Result<()>;

    /// `Ok(false)` when the tracker rejects the credentials
    fn check_credentials(&self) -> Result<bool>;
}
