use crate::error::{ReleaseError, Result};
use crate::git::{BranchHeads, GitRepository, MergeFavor};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

#[derive(Debug, Default)]
struct MockState {
    current: String,
    /// branch -> branch or commit it was created from
    branches: BTreeMap<String, Option<String>>,
    /// branch -> tags reachable from its tip
    reachable: HashMap<String, BTreeSet<String>>,
    tags: BTreeSet<String>,
    commits: BTreeSet<String>,
    remotes: Vec<String>,
    heads: HashMap<(String, String), BranchHeads>,
    /// branch -> message of its last commit
    messages: HashMap<String, String>,
    clean: bool,
    workdir: Option<PathBuf>,
    next_commit: u32,
    operations: Vec<String>,
}

/// Mock repository for testing without actual git operations
///
/// Tracks branches, tags and reachability in memory and records every
/// mutating call in an operation log (`checkout develop`,
/// `merge release/v1.0.0 -> master Theirs [VERSION]`, `tag v1.0.0`,
/// `push origin master v1.0.0`, ...).
pub struct MockRepository {
    state: RefCell<MockState>,
}

impl MockRepository {
    /// Create a mock with `develop` and `master` and `develop` checked out
    pub fn new() -> Self {
        let mut state = MockState {
            current: "develop".to_string(),
            clean: true,
            ..MockState::default()
        };
        state.branches.insert("develop".to_string(), None);
        state.branches.insert("master".to_string(), None);
        MockRepository {
            state: RefCell::new(state),
        }
    }

    /// Add a branch created from `origin`
    pub fn add_branch(&mut self, name: impl Into<String>, origin: Option<&str>) {
        let name = name.into();
        let state = self.state.get_mut();
        let inherited = origin
            .and_then(|o| state.reachable.get(o).cloned())
            .unwrap_or_default();
        state.reachable.insert(name.clone(), inherited);
        state.branches.insert(name, origin.map(str::to_string));
    }

    /// Add a tag reachable from `branch`
    pub fn add_tag(&mut self, name: impl Into<String>, branch: &str) {
        let name = name.into();
        let state = self.state.get_mut();
        state
            .reachable
            .entry(branch.to_string())
            .or_default()
            .insert(name.clone());
        state.tags.insert(name);
    }

    pub fn add_commit(&mut self, hash: impl Into<String>) {
        self.state.get_mut().commits.insert(hash.into());
    }

    pub fn add_remote(&mut self, name: impl Into<String>) {
        self.state.get_mut().remotes.push(name.into());
    }

    pub fn set_branch_heads(&mut self, remote: &str, branch: &str, heads: BranchHeads) {
        self.state
            .get_mut()
            .heads
            .insert((remote.to_string(), branch.to_string()), heads);
    }

    pub fn set_current_branch(&mut self, name: impl Into<String>) {
        self.state.get_mut().current = name.into();
    }

    pub fn set_clean(&mut self, clean: bool) {
        self.state.get_mut().clean = clean;
    }

    pub fn set_workdir(&mut self, path: impl Into<PathBuf>) {
        self.state.get_mut().workdir = Some(path.into());
    }

    /// Mutating calls in the order they were made
    pub fn operations(&self) -> Vec<String> {
        self.state.borrow().operations.clone()
    }

    fn record(&self, operation: String) {
        self.state.borrow_mut().operations.push(operation);
    }

    fn require_branch(&self, name: &str) -> Result<()> {
        if self.state.borrow().branches.contains_key(name) {
            Ok(())
        } else {
            Err(ReleaseError::precondition(format!(
                "Cannot find branch '{}'",
                name
            )))
        }
    }

    fn new_commit(&self) -> String {
        let mut state = self.state.borrow_mut();
        state.next_commit += 1;
        let hash = format!("{:040x}", state.next_commit);
        state.commits.insert(hash.clone());
        hash
    }

    /// `true` if `ancestor` appears in the creation chain of `branch`
    fn descends_from(&self, branch: &str, ancestor: &str) -> bool {
        let state = self.state.borrow();
        let mut cursor = state.branches.get(branch).cloned().flatten();
        while let Some(origin) = cursor {
            if origin == ancestor {
                return true;
            }
            cursor = state.branches.get(&origin).cloned().flatten();
        }
        false
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl GitRepository for MockRepository {
    fn current_branch(&self) -> Result<String> {
        Ok(self.state.borrow().current.clone())
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.borrow().branches.contains_key(name))
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.borrow().tags.contains(name))
    }

    fn tags(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().tags.iter().cloned().collect())
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().branches.keys().cloned().collect())
    }

    fn reachable_tags(&self, branch: &str) -> Result<Vec<String>> {
        self.require_branch(branch)?;
        Ok(self
            .state
            .borrow()
            .reachable
            .get(branch)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn resolve_commit(&self, rev: &str) -> Result<Option<String>> {
        let state = self.state.borrow();
        if state.branches.contains_key(rev) {
            return Ok(Some(rev.to_string()));
        }
        Ok(state.commits.iter().find(|c| c.starts_with(rev)).cloned())
    }

    fn list_remotes(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().remotes.clone())
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        self.record(format!("fetch {}", remote));
        Ok(())
    }

    fn branch_heads(&self, remote: &str, branch: &str) -> Result<Option<BranchHeads>> {
        self.require_branch(branch)?;
        Ok(self
            .state
            .borrow()
            .heads
            .get(&(remote.to_string(), branch.to_string()))
            .copied())
    }

    fn is_working_directory_clean(&self) -> Result<bool> {
        Ok(self.state.borrow().clean)
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.require_branch(branch)?;
        self.state.borrow_mut().current = branch.to_string();
        self.record(format!("checkout {}", branch));
        Ok(())
    }

    fn checkout_new_branch(&self, name: &str, start_point: &str) -> Result<()> {
        self.create_branch(name, start_point)?;
        self.checkout(name)
    }

    fn create_branch(&self, name: &str, start_point: &str) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            if state.branches.contains_key(name) {
                return Err(ReleaseError::precondition(format!(
                    "Branch '{}' already exists",
                    name
                )));
            }
            let inherited = state.reachable.get(start_point).cloned().unwrap_or_default();
            state.reachable.insert(name.to_string(), inherited);
            state
                .branches
                .insert(name.to_string(), Some(start_point.to_string()));
        }
        self.record(format!("branch {} from {}", name, start_point));
        Ok(())
    }

    fn commit_all(&self, message: &str) -> Result<String> {
        let hash = self.new_commit();
        let mut state = self.state.borrow_mut();
        let branch = state.current.clone();
        state.clean = true;
        state.messages.insert(branch.clone(), message.to_string());
        state
            .operations
            .push(format!("commit {}: {}", branch, message));
        Ok(hash)
    }

    fn head_message(&self) -> Result<String> {
        let state = self.state.borrow();
        Ok(state
            .messages
            .get(&state.current)
            .cloned()
            .unwrap_or_default())
    }

    fn merge_with_ignore_list(
        &self,
        source: &str,
        target: &str,
        ignore: &[String],
        favor: MergeFavor,
    ) -> Result<String> {
        self.require_branch(source)?;
        self.checkout(target)?;
        {
            let mut state = self.state.borrow_mut();
            let source_tags = state.reachable.get(source).cloned().unwrap_or_default();
            state
                .reachable
                .entry(target.to_string())
                .or_default()
                .extend(source_tags);
            state
                .messages
                .insert(target.to_string(), format!("Merge branch '{}' into {}", source, target));
        }
        self.record(format!(
            "merge {} -> {} {:?} [{}]",
            source,
            target,
            favor,
            ignore.join(", ")
        ));
        Ok(self.new_commit())
    }

    fn create_tag(&self, name: &str, _message: &str) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            if !state.tags.insert(name.to_string()) {
                return Err(ReleaseError::precondition(format!(
                    "Cannot create tag '{}': already exists",
                    name
                )));
            }
            let branch = state.current.clone();
            state
                .reachable
                .entry(branch)
                .or_default()
                .insert(name.to_string());
        }
        self.record(format!("tag {}", name));
        Ok(())
    }

    fn push(&self, remote: &str, branch: &str, tag: Option<&str>) -> Result<()> {
        let operation = match tag {
            Some(tag) => format!("push {} {} {}", remote, branch, tag),
            None => format!("push {} {}", remote, branch),
        };
        self.record(operation);
        Ok(())
    }

    fn nearest_ancestor_branches(&self, candidates: &[String]) -> Result<Vec<String>> {
        let current = self.current_branch()?;
        let ancestors: Vec<&String> = candidates
            .iter()
            .filter(|c| self.descends_from(&current, c))
            .collect();

        Ok(ancestors
            .iter()
            .filter(|c| {
                !ancestors
                    .iter()
                    .any(|other| other != *c && self.descends_from(other, c))
            })
            .map(|c| c.to_string())
            .collect())
    }

    fn workdir(&self) -> Result<PathBuf> {
        self.state
            .borrow()
            .workdir
            .clone()
            .ok_or_else(|| ReleaseError::precondition("repository has no working directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_tracks_tags_through_merges() {
        let mut repo = MockRepository::new();
        repo.add_tag("v1.0.0", "master");
        repo.add_branch("release/v1.1.0", Some("develop"));

        repo.checkout("release/v1.1.0").unwrap();
        repo.create_tag("v1.1.0", "Version 1.1.0").unwrap();
        repo.merge_with_ignore_list("release/v1.1.0", "master", &[], MergeFavor::Theirs)
            .unwrap();

        assert_eq!(repo.current_branch().unwrap(), "master");
        assert_eq!(repo.reachable_tags("master").unwrap(), vec!["v1.0.0", "v1.1.0"]);
        assert!(repo.reachable_tags("develop").unwrap().is_empty());
        assert_eq!(
            repo.operations(),
            vec![
                "checkout release/v1.1.0",
                "tag v1.1.0",
                "checkout master",
                "merge release/v1.1.0 -> master Theirs []",
            ]
        );
    }

    #[test]
    fn test_mock_nearest_ancestor_uses_creation_chain() {
        let mut repo = MockRepository::new();
        repo.add_branch("release/v1.0.0", Some("develop"));
        repo.add_branch("prerelease/v1.0.0-rc.1", Some("release/v1.0.0"));
        repo.set_current_branch("prerelease/v1.0.0-rc.1");

        let candidates = vec!["develop".to_string(), "release/v1.0.0".to_string()];
        assert_eq!(
            repo.nearest_ancestor_branches(&candidates).unwrap(),
            vec!["release/v1.0.0"]
        );
    }

    #[test]
    fn test_mock_duplicate_tag_fails() {
        let mut repo = MockRepository::new();
        repo.add_tag("v1.0.0", "master");
        assert!(repo.create_tag("v1.0.0", "again").is_err());
    }
}
