use crate::error::{ReleaseError, Result};
use crate::tracker::{IssueFilter, IssueTracker, TrackerVersion, VersionPosition};
use chrono::NaiveDate;
use std::cell::RefCell;

#[derive(Debug, Clone)]
struct MockIssue {
    key: String,
    version_id: String,
    resolved: bool,
    closed: bool,
}

/// In-memory tracker for tests
///
/// Versions keep their list order so position moves are observable; every
/// mutating call is recorded in an operation log.
pub struct MockTracker {
    versions: RefCell<Vec<TrackerVersion>>,
    issues: RefCell<Vec<MockIssue>>,
    accepts_credentials: bool,
    next_id: RefCell<u32>,
    operations: RefCell<Vec<String>>,
}

impl MockTracker {
    pub fn new() -> Self {
        MockTracker {
            versions: RefCell::new(Vec::new()),
            issues: RefCell::new(Vec::new()),
            accepts_credentials: true,
            next_id: RefCell::new(100),
            operations: RefCell::new(Vec::new()),
        }
    }

    /// Tracker that rejects every credential check
    pub fn rejecting() -> Self {
        MockTracker {
            accepts_credentials: false,
            ..Self::new()
        }
    }

    /// Append an unreleased version; returns its id
    pub fn add_version(&self, name: &str) -> String {
        self.add_version_with(name, None, false, false)
    }

    pub fn add_version_with(
        &self,
        name: &str,
        release_date: Option<NaiveDate>,
        released: bool,
        archived: bool,
    ) -> String {
        let id = self.allocate_id();
        self.versions.borrow_mut().push(TrackerVersion {
            id: id.clone(),
            name: name.to_string(),
            release_date,
            released,
            archived,
        });
        id
    }

    /// Add an issue to `version_id`; closed issues count as resolved
    pub fn add_issue(&self, key: &str, version_id: &str, resolved: bool, closed: bool) {
        self.issues.borrow_mut().push(MockIssue {
            key: key.to_string(),
            version_id: version_id.to_string(),
            resolved: resolved || closed,
            closed,
        });
    }

    pub fn version(&self, id: &str) -> Option<TrackerVersion> {
        self.versions.borrow().iter().find(|v| v.id == id).cloned()
    }

    pub fn version_names(&self) -> Vec<String> {
        self.versions.borrow().iter().map(|v| v.name.clone()).collect()
    }

    /// Version id an issue is currently fixed in
    pub fn issue_version(&self, key: &str) -> Option<String> {
        self.issues
            .borrow()
            .iter()
            .find(|issue| issue.key == key)
            .map(|issue| issue.version_id.clone())
    }

    pub fn operations(&self) -> Vec<String> {
        self.operations.borrow().clone()
    }

    fn allocate_id(&self) -> String {
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        next.to_string()
    }

    fn record(&self, operation: String) {
        self.operations.borrow_mut().push(operation);
    }

    fn position_of(&self, id: &str) -> Result<usize> {
        self.versions
            .borrow()
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| ReleaseError::tracker(format!("no version with id {}", id)))
    }
}

impl Default for MockTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueTracker for MockTracker {
    fn versions(&self) -> Result<Vec<TrackerVersion>> {
        Ok(self.versions.borrow().clone())
    }

    fn create_version(
        &self,
        name: &str,
        release_date: Option<NaiveDate>,
    ) -> Result<TrackerVersion> {
        let id = self.add_version_with(name, release_date, false, false);
        self.record(format!("create {}", name));
        self.version(&id)
            .ok_or_else(|| ReleaseError::tracker(format!("version {} vanished", id)))
    }

    fn release_version(&self, id: &str, date: NaiveDate) -> Result<()> {
        let index = self.position_of(id)?;
        let mut versions = self.versions.borrow_mut();
        versions[index].released = true;
        versions[index].release_date = Some(date);
        let name = versions[index].name.clone();
        drop(versions);
        self.record(format!("release {}", name));
        Ok(())
    }

    fn delete_version(&self, id: &str) -> Result<()> {
        let index = self.position_of(id)?;
        let removed = self.versions.borrow_mut().remove(index);
        self.record(format!("delete {}", removed.name));
        Ok(())
    }

    fn move_version(&self, id: &str, position: &VersionPosition) -> Result<()> {
        let index = self.position_of(id)?;
        let version = self.versions.borrow_mut().remove(index);
        let name = version.name.clone();
        match position {
            VersionPosition::First => {
                self.versions.borrow_mut().insert(0, version);
                self.record(format!("move {} first", name));
            }
            VersionPosition::After(other) => {
                let target = self.position_of(other)?;
                let other_name = self.versions.borrow()[target].name.clone();
                self.versions.borrow_mut().insert(target + 1, version);
                self.record(format!("move {} after {}", name, other_name));
            }
        }
        Ok(())
    }

    fn issues(&self, version_id: &str, filter: IssueFilter) -> Result<Vec<String>> {
        Ok(self
            .issues
            .borrow()
            .iter()
            .filter(|issue| issue.version_id == version_id)
            .filter(|issue| match filter {
                IssueFilter::Unresolved => !issue.resolved,
                IssueFilter::Open => !issue.closed,
                IssueFilter::Closed => issue.closed,
            })
            .map(|issue| issue.key.clone())
            .collect())
    }

    fn move_issues(&self, keys: &[String], from_id: &str, to_id: &str) -> Result<()> {
        for issue in self.issues.borrow_mut().iter_mut() {
            if issue.version_id == from_id && keys.contains(&issue.key) {
                issue.version_id = to_id.to_string();
            }
        }
        if !keys.is_empty() {
            self.record(format!("move issues {} -> {}", from_id, to_id));
        }
        Ok(())
    }

    fn check_credentials(&self) -> Result<bool> {
        self.record("check credentials".to_string());
        Ok(self.accepts_credentials)
    }
}
