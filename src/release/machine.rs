use crate::domain::BranchKind;
use crate::error::{ReleaseError, Result};
use crate::release::driver::{self, ReleasePlan, Session, Step};
use crate::release::flows::{
    self, close_hotfix_steps, close_release_steps, publish, stable_branch_for,
};
use crate::release::push;

fn classify_current(session: &Session<'_>) -> Result<(String, BranchKind)> {
    let current = session.repo.current_branch()?;
    let kind = BranchKind::classify(&current, &session.names());
    Ok((current, kind))
}

fn existing_tag(session: &Session<'_>, tag: String) -> Result<Option<String>> {
    Ok(session.repo.tag_exists(&tag)?.then_some(tag))
}

/// Start (or, with `start_release_phase`, only open) a release from the
/// current branch.
///
/// # Errors
///
/// - `Validation` when `commit_hash` names no commit
/// - `InvalidState` when the current branch cannot start a release
/// - any precondition, git, tool or tracker failure along the flow
pub fn start_release(session: &Session<'_>) -> Result<()> {
    if let Some(hash) = &session.context.commit_hash {
        if session.repo.resolve_commit(hash)?.is_none() {
            return Err(ReleaseError::validation(format!(
                "'{}' is not a valid commit",
                hash
            )));
        }
    }

    let (current, kind) = classify_current(session)?;
    let mut plan = ReleasePlan::default();

    let steps = match kind {
        BranchKind::Develop | BranchKind::Master => {
            vec![Step::CheckMainline, Step::ChooseDevelopVersion]
        }
        BranchKind::Release(version) => {
            plan.version = Some(version);
            plan.branch = Some(current.clone());
            vec![Step::CheckCurrent, Step::ChooseReleaseCandidate]
        }
        BranchKind::Hotfix(version) => {
            plan.version = Some(version);
            plan.branch = Some(current.clone());
            if session.context.start_release_phase {
                let mut steps = vec![Step::CheckCurrent, Step::ChooseNextHotfix, Step::CreateHotfixBranch];
                steps.extend(publish(session, &[Step::PushNewBranches]));
                steps
            } else {
                vec![Step::CheckCurrent, Step::ChooseHotfixVersion]
            }
        }
        other => {
            return Err(ReleaseError::invalid_state(format!(
                "cannot start a release from {}",
                other
            )))
        }
    };

    session
        .output
        .status(&format!("Starting release from '{}'", current));
    driver::run(session, &mut plan, steps, flows::execute)
}

/// Finish the release the current branch belongs to.
///
/// A prerelease branch is tagged (if the tag is still missing) and merged back
/// into its ancestor; a release branch is closed into master and develop. A
/// hotfix branch gets its version commit unless HEAD already is one, then
/// closes on its stable branch.
pub fn continue_release(session: &Session<'_>) -> Result<()> {
    let (current, kind) = classify_current(session)?;
    let mut plan = ReleasePlan {
        branch: Some(current.clone()),
        ..ReleasePlan::default()
    };

    let steps = match kind {
        BranchKind::PreRelease(version) => {
            plan.version = Some(version);
            plan.next = Some(version.current_full_version());
            let mut steps = vec![
                Step::CheckCurrent,
                Step::TagRelease,
                Step::ResolveAncestor,
                Step::MergeIntoAncestor,
            ];
            steps.extend(publish(session, &[Step::PushPreRelease, Step::SyncTracker]));
            steps
        }
        BranchKind::Release(version) => {
            plan.version = Some(version);
            plan.next = Some(version.next_minor());
            let mut steps = vec![Step::CheckMainline, Step::CheckCurrent];
            steps.extend(close_release_steps(session));
            steps
        }
        BranchKind::Hotfix(version) => {
            let version = version.current_full_version();
            plan.version = Some(version);
            plan.next = Some(version.next_patch());
            plan.stable = Some(stable_branch_for(session, &version)?);
            let mut steps = vec![Step::CheckCurrent, Step::CheckStable, Step::UpdateMetadata];
            steps.extend(close_hotfix_steps(session, &plan));
            steps
        }
        other => {
            return Err(ReleaseError::invalid_state(format!(
                "cannot continue a release from {}",
                other
            )))
        }
    };

    session
        .output
        .status(&format!("Continuing release on '{}'", current));
    driver::run(session, &mut plan, steps, flows::execute)
}

/// Re-run the push matching the current branch kind
pub fn push_remote_repositories(session: &Session<'_>) -> Result<()> {
    let (current, kind) = classify_current(session)?;
    let names = session.names();

    match kind {
        BranchKind::Release(version) => {
            let tag = existing_tag(session, version.tag_name())?;
            push::push_master_release(session, &current, tag.as_deref())
        }
        BranchKind::PreRelease(version) => {
            let tag = existing_tag(session, version.tag_name())?;
            push::push_pre_release(session, &current, tag.as_deref(), None)
        }
        BranchKind::Hotfix(version) => {
            let stable = stable_branch_for(session, &version)?;
            let tag = existing_tag(session, version.tag_name())?;
            push::push_patch_release(session, &current, &stable, tag.as_deref())
        }
        BranchKind::Develop | BranchKind::Master => {
            push::push_branches(session, &[names.develop.as_str(), names.master.as_str()])
        }
        other => Err(ReleaseError::invalid_state(format!(
            "nothing to push from {}",
            other
        ))),
    }
}
