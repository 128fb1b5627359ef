//! Git operations abstraction layer
//!
//! This module provides a trait-based abstraction over the Git operations a
//! release needs, allowing for multiple implementations including a real
//! repository and an in-memory mock for testing.
//!
//! # Overview
//!
//! The primary abstraction is the [GitRepository] trait. The concrete
//! implementations include:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: A mock implementation for testing
//!
//! Release policy (which branches get merged where, which ignore list
//! applies, what order pushes happen in) lives in [crate::release]; this
//! layer only performs the operations.

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;
use git2::Oid;
use std::path::PathBuf;

/// Which side wins a content conflict during a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeFavor {
    /// The branch being merged into
    Ours,
    /// The branch being merged
    Theirs,
}

/// Local tip, remote-tracking tip and their merge-base for one branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchHeads {
    pub local: Oid,
    pub remote: Oid,
    pub merge_base: Oid,
}

/// How a local branch relates to its remote counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    UpToDate,
    /// Local is an ancestor of remote; a pull is required
    Behind,
    /// Remote is an ancestor of local; a push will publish the difference
    Ahead,
    Diverged,
}

impl BranchHeads {
    pub fn sync_state(&self) -> SyncState {
        if self.local == self.remote {
            SyncState::UpToDate
        } else if self.local == self.merge_base {
            SyncState::Behind
        } else if self.remote == self.merge_base {
            SyncState::Ahead
        } else {
            SyncState::Diverged
        }
    }
}

/// Git operations used by the release state machine
///
/// All methods are blocking and complete before returning. Branch arguments
/// are short local branch names (`develop`, `release/v1.2.0`).
pub trait GitRepository {
    /// Name of the checked-out branch; fails when HEAD is detached or unborn
    fn current_branch(&self) -> Result<String>;

    fn branch_exists(&self, name: &str) -> Result<bool>;

    fn tag_exists(&self, name: &str) -> Result<bool>;

    /// All tag names
    fn tags(&self) -> Result<Vec<String>>;

    /// Local branch names
    fn list_branches(&self) -> Result<Vec<String>>;

    /// Tags whose commit is reachable from the tip of `branch`
    fn reachable_tags(&self, branch: &str) -> Result<Vec<String>>;

    /// Full hash of the commit `rev` names, or `None` if it names no commit
    fn resolve_commit(&self, rev: &str) -> Result<Option<String>>;

    /// Remote names, "origin" first
    fn list_remotes(&self) -> Result<Vec<String>>;

    /// Refresh remote-tracking branches and tags from `remote`
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Heads for `branch` against `remote`; `None` if the remote lacks it
    fn branch_heads(&self, remote: &str, branch: &str) -> Result<Option<BranchHeads>>;

    /// No staged, unstaged or untracked changes
    fn is_working_directory_clean(&self) -> Result<bool>;

    fn checkout(&self, branch: &str) -> Result<()>;

    /// Create `name` at `start_point` and check it out
    fn checkout_new_branch(&self, name: &str, start_point: &str) -> Result<()>;

    /// Create `name` at `start_point` without checking it out
    fn create_branch(&self, name: &str, start_point: &str) -> Result<()>;

    /// Stage every change (additions, modifications, deletions) and commit
    fn commit_all(&self, message: &str) -> Result<String>;

    /// Message of the commit HEAD points at
    fn head_message(&self) -> Result<String>;

    /// Merge `source` into `target` as a merge commit, discarding changes to
    /// paths matching `ignore` and settling conflicts in favour of `favor`.
    /// Leaves `target` checked out. Returns the resulting head of `target`.
    fn merge_with_ignore_list(
        &self,
        source: &str,
        target: &str,
        ignore: &[String],
        favor: MergeFavor,
    ) -> Result<String>;

    /// Annotated tag at HEAD
    fn create_tag(&self, name: &str, message: &str) -> Result<()>;

    /// Push `branch` (and `tag`, when given) to `remote`
    fn push(&self, remote: &str, branch: &str, tag: Option<&str>) -> Result<()>;

    /// Of `candidates`, the branches whose tip is an ancestor of HEAD and is
    /// not itself an ancestor of another such tip
    fn nearest_ancestor_branches(&self, candidates: &[String]) -> Result<Vec<String>>;

    /// Root of the working tree
    fn workdir(&self) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(byte: u8) -> Oid {
        Oid::from_bytes(&[byte; 20]).unwrap()
    }

    fn heads(local: u8, remote: u8, merge_base: u8) -> BranchHeads {
        BranchHeads {
            local: oid(local),
            remote: oid(remote),
            merge_base: oid(merge_base),
        }
    }

    #[test]
    fn test_same_tip_is_up_to_date() {
        assert_eq!(heads(1, 1, 1).sync_state(), SyncState::UpToDate);
    }

    #[test]
    fn test_local_at_merge_base_is_behind() {
        assert_eq!(heads(1, 2, 1).sync_state(), SyncState::Behind);
    }

    #[test]
    fn test_remote_at_merge_base_is_ahead() {
        assert_eq!(heads(2, 1, 1).sync_state(), SyncState::Ahead);
    }

    #[test]
    fn test_neither_at_merge_base_is_diverged() {
        assert_eq!(heads(2, 3, 1).sync_state(), SyncState::Diverged);
    }
}
