//! Preconditions every mutating flow checks, in this order:
//! clean working tree, branches up to date with every remote, tag unused.

use crate::error::{ReleaseError, Result};
use crate::git::SyncState;
use crate::release::Session;
use log::debug;

/// Commit pending changes on confirmation, fail otherwise
pub fn ensure_clean(session: &Session<'_>) -> Result<()> {
    if session.repo.is_working_directory_clean()? {
        return Ok(());
    }

    session
        .output
        .warning("The working directory has uncommitted changes");
    if session
        .prompter
        .confirm("Commit pending changes before continuing?", false)?
    {
        session.repo.commit_all("Commit pending changes.")?;
        session.output.success("Committed pending changes");
        Ok(())
    } else {
        Err(ReleaseError::precondition(
            "working directory has uncommitted changes",
        ))
    }
}

/// Fail unless each of `branches` is equal to or ahead of every remote
pub fn ensure_up_to_date(session: &Session<'_>, branches: &[&str]) -> Result<()> {
    for remote in session.remotes()? {
        session.repo.fetch(&remote)?;

        for branch in branches {
            let Some(heads) = session.repo.branch_heads(&remote, branch)? else {
                debug!("'{}' is not on '{}'", branch, remote);
                continue;
            };
            match heads.sync_state() {
                SyncState::UpToDate | SyncState::Ahead => {}
                SyncState::Behind => {
                    return Err(ReleaseError::precondition(format!(
                        "'{}' is behind '{}/{}'; need to pull",
                        branch, remote, branch
                    )))
                }
                SyncState::Diverged => {
                    return Err(ReleaseError::precondition(format!(
                        "'{}' and '{}/{}' have diverged, need to rebase",
                        branch, remote, branch
                    )))
                }
            }
        }
    }
    Ok(())
}

pub fn ensure_tag_absent(session: &Session<'_>, tag: &str) -> Result<()> {
    if session.repo.tag_exists(tag)? {
        return Err(ReleaseError::precondition(format!(
            "tag '{}' already exists",
            tag
        )));
    }
    Ok(())
}

/// Clean tree, then up-to-date `branches` (those that exist locally)
pub fn check_branches(session: &Session<'_>, branches: &[&str]) -> Result<()> {
    ensure_clean(session)?;

    let mut existing = Vec::with_capacity(branches.len());
    for branch in branches {
        if session.repo.branch_exists(branch)? {
            existing.push(*branch);
        }
    }
    ensure_up_to_date(session, &existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::{BranchHeads, MockRepository};
    use crate::metadata::MetadataUpdater;
    use crate::release::ReleaseContext;
    use crate::ui::{LinePrompter, RecordingOutput};
    use git2::Oid;
    use std::io::{self, Cursor};

    fn oid(byte: u8) -> Oid {
        Oid::from_bytes(&[byte; 20]).unwrap()
    }

    fn with_session<T>(
        repo: &MockRepository,
        input: &str,
        body: impl FnOnce(&Session<'_>) -> T,
    ) -> T {
        let prompter = LinePrompter::new(Cursor::new(input.as_bytes().to_vec()), io::sink());
        let output = RecordingOutput::new();
        let config = Config::default();
        let metadata = MetadataUpdater::new(config.metadata.clone());
        let session = Session {
            repo,
            prompter: &prompter,
            output: &output,
            config: &config,
            metadata: &metadata,
            tracker: None,
            context: ReleaseContext::default(),
        };
        body(&session)
    }

    #[test]
    fn test_dirty_tree_declined_is_precondition_error() {
        let mut repo = MockRepository::new();
        repo.set_clean(false);
        let err = with_session(&repo, "n\n", ensure_clean).unwrap_err();
        assert!(matches!(err, ReleaseError::Precondition(_)));
        assert!(repo.operations().is_empty());
    }

    #[test]
    fn test_dirty_tree_accepted_commits() {
        let mut repo = MockRepository::new();
        repo.set_clean(false);
        with_session(&repo, "y\n", ensure_clean).unwrap();
        assert_eq!(repo.operations(), vec!["commit develop: Commit pending changes."]);
    }

    #[test]
    fn test_up_to_date_classification_per_remote() {
        let mut repo = MockRepository::new();
        repo.add_remote("origin");
        repo.add_remote("mirror");
        repo.set_branch_heads(
            "origin",
            "develop",
            BranchHeads { local: oid(2), remote: oid(1), merge_base: oid(1) },
        );
        with_session(&repo, "", |s| ensure_up_to_date(s, &["develop"])).unwrap();

        repo.set_branch_heads(
            "mirror",
            "develop",
            BranchHeads { local: oid(1), remote: oid(2), merge_base: oid(1) },
        );
        let err = with_session(&repo, "", |s| ensure_up_to_date(s, &["develop"])).unwrap_err();
        assert!(err.to_string().contains("need to pull"));

        repo.set_branch_heads(
            "mirror",
            "develop",
            BranchHeads { local: oid(3), remote: oid(2), merge_base: oid(1) },
        );
        let err = with_session(&repo, "", |s| ensure_up_to_date(s, &["develop"])).unwrap_err();
        assert!(err.to_string().contains("diverged, need to rebase"));
    }

    #[test]
    fn test_existing_tag_is_precondition_error() {
        let mut repo = MockRepository::new();
        repo.add_tag("v1.0.0", "master");
        let err = with_session(&repo, "", |s| ensure_tag_absent(s, "v1.0.0")).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        with_session(&repo, "", |s| ensure_tag_absent(s, "v1.1.0")).unwrap();
    }
}
