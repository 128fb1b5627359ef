use crate::config::IgnoreList;
use crate::domain::branch::{
    hotfix_branch, prerelease_branch, release_branch, support_branch, HOTFIX_PREFIX,
    RELEASE_PREFIX,
};
use crate::domain::{
    current_possible_versions_hotfix, next_possible_versions_develop,
    next_possible_versions_hotfix, SemanticVersion,
};
use crate::error::{ReleaseError, Result};
use crate::git::MergeFavor;
use crate::release::driver::{metadata_message, ReleasePlan, Session, Step, StepResult};
use crate::release::{guards, push};
use log::info;

/// Steps that publish a release; dropped entirely under `no_push`
pub fn publish(session: &Session<'_>, steps: &[Step]) -> Vec<Step> {
    if session.context.no_push {
        Vec::new()
    } else {
        steps.to_vec()
    }
}

/// Fork a prerelease branch, tag it and publish it
pub fn pre_release_steps(session: &Session<'_>) -> Vec<Step> {
    let mut steps = vec![Step::CreatePreReleaseBranch, Step::PausePoint, Step::TagRelease];
    steps.extend(publish(session, &[Step::PushPreRelease, Step::SyncTracker]));
    steps
}

/// Merge a release branch into master and develop and publish it
pub fn close_release_steps(session: &Session<'_>) -> Vec<Step> {
    let mut steps = vec![Step::CloseRelease];
    steps.extend(publish(session, &[Step::PushMasterRelease, Step::SyncTracker]));
    steps
}

/// Merge a hotfix into its stable branch (and develop) and publish it
pub fn close_hotfix_steps(session: &Session<'_>, plan: &ReleasePlan) -> Vec<Step> {
    let mut steps = vec![Step::CloseHotfix];
    steps.extend(publish(session, &[Step::PushPatchRelease, Step::SyncTracker]));
    if plan.stable.as_deref() == Some(session.names().master.as_str()) {
        steps.push(Step::OfferSupportBranch);
    }
    steps
}

fn version_of(plan: &ReleasePlan) -> Result<SemanticVersion> {
    plan.version
        .ok_or_else(|| ReleaseError::invalid_state("no version chosen"))
}

fn branch_of(plan: &ReleasePlan) -> Result<String> {
    plan.branch
        .clone()
        .ok_or_else(|| ReleaseError::invalid_state("no release branch selected"))
}

fn choose_version(
    session: &Session<'_>,
    prompt: &str,
    candidates: &[SemanticVersion],
) -> Result<SemanticVersion> {
    let options: Vec<String> = candidates.iter().map(ToString::to_string).collect();
    let index = session.prompter.choose(prompt, &options)?;
    candidates
        .get(index)
        .copied()
        .ok_or_else(|| ReleaseError::validation(format!("no option at position {}", index + 1)))
}

/// Latest version released from the mainline; 0.0.0 before the first release
fn latest_mainline_version(session: &Session<'_>) -> Result<SemanticVersion> {
    let names = session.names();
    let mut tags = session.repo.reachable_tags(&names.develop)?;
    if session.repo.branch_exists(&names.master)? {
        tags.extend(session.repo.reachable_tags(&names.master)?);
    }
    Ok(session
        .latest_version(&tags, |_| true)
        .unwrap_or_else(|| SemanticVersion::new(0, 0, 0)))
}

/// Latest tag on the patch line of `version`, or `version` itself
fn latest_on_line(session: &Session<'_>, version: &SemanticVersion) -> Result<SemanticVersion> {
    let tags = session.repo.tags()?;
    Ok(session
        .latest_version(&tags, |tagged| tagged.same_line(version))
        .unwrap_or(*version))
}

/// `support/vM.m` when it exists, master otherwise
pub(crate) fn stable_branch_for(session: &Session<'_>, version: &SemanticVersion) -> Result<String> {
    let support = support_branch(version.major, version.minor);
    if session.repo.branch_exists(&support)? {
        Ok(support)
    } else {
        Ok(session.names().master)
    }
}

fn resolve_ancestor(session: &Session<'_>, current: &str) -> Result<String> {
    if let Some(ancestor) = &session.context.ancestor {
        if !session.repo.branch_exists(ancestor)? {
            return Err(ReleaseError::precondition(format!(
                "ancestor branch '{}' does not exist",
                ancestor
            )));
        }
        return Ok(ancestor.clone());
    }

    let develop = session.names().develop;
    let candidates: Vec<String> = session
        .repo
        .list_branches()?
        .into_iter()
        .filter(|name| name != current)
        .filter(|name| {
            name == &develop || name.starts_with(RELEASE_PREFIX) || name.starts_with(HOTFIX_PREFIX)
        })
        .collect();

    let mut nearest = session.repo.nearest_ancestor_branches(&candidates)?;
    match nearest.len() {
        1 => Ok(nearest.remove(0)),
        0 => Err(ReleaseError::precondition(format!(
            "no ancestor branch found for '{}'; pass --ancestor",
            current
        ))),
        _ => Err(ReleaseError::precondition(format!(
            "ancestor of '{}' is ambiguous ({}); pass --ancestor",
            current,
            nearest.join(", ")
        ))),
    }
}

/// Run one step against the session, updating the plan
pub fn execute(session: &Session<'_>, plan: &mut ReleasePlan, step: Step) -> Result<StepResult> {
    let repo = session.repo;
    let names = session.names();

    match step {
        Step::CheckMainline => {
            guards::check_branches(session, &[names.develop.as_str(), names.master.as_str()])?;
        }

        Step::CheckCurrent => {
            let current = repo.current_branch()?;
            guards::check_branches(session, &[current.as_str()])?;
        }

        Step::CheckStable => {
            let stable = plan
                .stable
                .clone()
                .ok_or_else(|| ReleaseError::invalid_state("no stable branch selected"))?;
            guards::check_branches(session, &[stable.as_str()])?;
        }

        Step::ChooseDevelopVersion => {
            let latest = latest_mainline_version(session)?;
            let candidates = next_possible_versions_develop(&latest, false);
            let version = choose_version(session, "Select the version to release", &candidates)?;
            guards::ensure_tag_absent(session, &version.tag_name())?;

            plan.version = Some(version);
            plan.source = Some(
                session
                    .context
                    .commit_hash
                    .clone()
                    .unwrap_or_else(|| names.develop.clone()),
            );

            if version.is_pre_release() {
                return Ok(StepResult::Continue(pre_release_steps(session)));
            }

            let mut steps = vec![Step::ChooseNextMainline, Step::CreateReleaseBranch, Step::BumpDevelop];
            if session.context.start_release_phase {
                steps.extend(publish(session, &[Step::PushNewBranches]));
            } else {
                steps.push(Step::PausePoint);
                steps.extend(close_release_steps(session));
            }
            return Ok(StepResult::Continue(steps));
        }

        Step::ChooseNextMainline => {
            let version = version_of(plan)?;
            let candidates = next_possible_versions_develop(&version, true);
            plan.next = Some(choose_version(
                session,
                "Select the next development version",
                &candidates,
            )?);
        }

        Step::CreateReleaseBranch => {
            let version = version_of(plan)?;
            let branch = release_branch(&version);
            if repo.branch_exists(&branch)? {
                return Err(ReleaseError::precondition(format!(
                    "branch '{}' already exists",
                    branch
                )));
            }
            let source = plan.source.clone().unwrap_or_else(|| names.develop.clone());
            repo.checkout_new_branch(&branch, &source)?;
            session.output.success(&format!("Created '{}' from '{}'", branch, source));
            session.commit_metadata(&version)?;
            plan.branch = Some(branch);
        }

        Step::BumpDevelop => {
            let next = plan
                .next
                .ok_or_else(|| ReleaseError::invalid_state("no next development version"))?;
            repo.checkout(&names.develop)?;
            session.commit_metadata(&next)?;
        }

        Step::ChooseReleaseCandidate => {
            let current = repo.current_branch()?;
            let version = version_of(plan)?;
            let mut candidate = version.next_rc();
            while repo.tag_exists(&candidate.tag_name())? {
                if candidate.pre.map_or(false, |p| p.counter == u32::MAX) {
                    return Err(ReleaseError::validation(format!(
                        "no release candidate number left after '{}'",
                        candidate
                    )));
                }
                candidate = candidate.next_rc();
            }

            let choice = choose_version(
                session,
                "Release to manufacturing or cut a release candidate?",
                &[version, candidate],
            )?;
            guards::ensure_tag_absent(session, &choice.tag_name())?;

            plan.version = Some(choice);
            plan.source = Some(current.clone());
            if choice.is_pre_release() {
                return Ok(StepResult::Continue(pre_release_steps(session)));
            }

            plan.branch = Some(current);
            plan.next = Some(choice.next_minor());
            let mut steps = vec![Step::UpdateMetadata, Step::PausePoint];
            steps.extend(close_release_steps(session));
            return Ok(StepResult::Continue(steps));
        }

        Step::ChooseHotfixVersion => {
            let current = repo.current_branch()?;
            let latest = latest_on_line(session, &version_of(plan)?)?;
            let candidates = current_possible_versions_hotfix(&latest);
            let choice = choose_version(session, "Select the hotfix version", &candidates)?;
            guards::ensure_tag_absent(session, &choice.tag_name())?;

            plan.version = Some(choice);
            plan.source = Some(current.clone());
            if choice.is_pre_release() {
                return Ok(StepResult::Continue(pre_release_steps(session)));
            }

            plan.stable = Some(stable_branch_for(session, &choice)?);
            plan.branch = Some(current);
            plan.next = Some(choice.next_patch());

            let mut steps = vec![Step::CheckStable, Step::UpdateMetadata, Step::PausePoint];
            steps.extend(close_hotfix_steps(session, plan));
            return Ok(StepResult::Continue(steps));
        }

        Step::ChooseNextHotfix => {
            let latest = latest_on_line(session, &version_of(plan)?)?;
            let candidates = next_possible_versions_hotfix(&latest);
            let choice = choose_version(session, "Select the next hotfix version", &candidates)?;
            let stable = stable_branch_for(session, &choice)?;
            guards::check_branches(session, &[stable.as_str()])?;

            plan.version = Some(choice);
            plan.stable = Some(stable);
        }

        Step::CreateHotfixBranch => {
            let version = version_of(plan)?;
            let stable = plan
                .stable
                .clone()
                .ok_or_else(|| ReleaseError::invalid_state("no stable branch selected"))?;
            let branch = hotfix_branch(&version.current_full_version());
            if repo.branch_exists(&branch)? {
                return Err(ReleaseError::precondition(format!(
                    "branch '{}' already exists",
                    branch
                )));
            }
            repo.checkout_new_branch(&branch, &stable)?;
            session.output.success(&format!("Created '{}' from '{}'", branch, stable));
            session.commit_metadata(&version)?;
            plan.branch = Some(branch);
        }

        Step::CreatePreReleaseBranch => {
            let version = version_of(plan)?;
            let source = plan
                .source
                .clone()
                .ok_or_else(|| ReleaseError::invalid_state("no source for the pre-release"))?;
            let branch = prerelease_branch(&version);
            if repo.branch_exists(&branch)? {
                return Err(ReleaseError::precondition(format!(
                    "branch '{}' already exists",
                    branch
                )));
            }
            repo.checkout_new_branch(&branch, &source)?;
            session.output.success(&format!("Created '{}' from '{}'", branch, source));
            session.commit_metadata(&version)?;
            plan.branch = Some(branch);
            plan.next = Some(version.current_full_version());
        }

        Step::UpdateMetadata => {
            let branch = branch_of(plan)?;
            let version = version_of(plan)?;
            repo.checkout(&branch)?;
            if repo.head_message()?.trim_end() == metadata_message(&version) {
                session
                    .output
                    .status(&format!("'{}' already records version {}", branch, version));
            } else {
                session.commit_metadata(&version)?;
            }
        }

        Step::PausePoint => {
            if session.context.pause_for_commit {
                let branch = branch_of(plan)?;
                repo.checkout(&branch)?;
                session.output.status(&format!(
                    "Paused on '{}'. Amend the version commit, then run close-version.",
                    branch
                ));
                return Ok(StepResult::Stop);
            }
        }

        Step::TagRelease => {
            let version = version_of(plan)?;
            let tag = version.tag_name();
            repo.checkout(&branch_of(plan)?)?;
            if repo.tag_exists(&tag)? {
                info!("'{}' already tagged", tag);
            } else {
                repo.create_tag(&tag, &format!("Version {}", version))?;
                session.output.success(&format!("Tagged '{}'", tag));
            }
        }

        Step::CloseRelease => {
            let version = version_of(plan)?;
            let release = branch_of(plan)?;
            let tag = version.tag_name();
            guards::ensure_tag_absent(session, &tag)?;

            session.merge(&release, &names.master, IgnoreList::TagStableMerge, MergeFavor::Theirs)?;
            repo.create_tag(&tag, &format!("Version {}", version))?;
            session.output.success(&format!("Tagged '{}' on '{}'", tag, names.master));
            session.merge(&release, &names.develop, IgnoreList::DevelopStableMerge, MergeFavor::Ours)?;
            session.output.success(&format!("Closed release {}", version));
        }

        Step::CloseHotfix => {
            let version = version_of(plan)?;
            let hotfix = branch_of(plan)?;
            let stable = plan
                .stable
                .clone()
                .ok_or_else(|| ReleaseError::invalid_state("no stable branch selected"))?;
            let tag = version.tag_name();
            guards::ensure_tag_absent(session, &tag)?;

            session.merge(&hotfix, &stable, IgnoreList::TagStableMerge, MergeFavor::Theirs)?;
            repo.create_tag(&tag, &format!("Version {}", version))?;
            session.output.success(&format!("Tagged '{}' on '{}'", tag, stable));
            if stable == names.master {
                session.merge(&hotfix, &names.develop, IgnoreList::DevelopStableMerge, MergeFavor::Ours)?;
            }
            session.output.success(&format!("Closed hotfix {}", version));
        }

        Step::ResolveAncestor => {
            let current = branch_of(plan)?;
            let ancestor = resolve_ancestor(session, &current)?;
            guards::ensure_up_to_date(session, &[ancestor.as_str()])?;
            session
                .output
                .status(&format!("'{}' folds back into '{}'", current, ancestor));
            plan.ancestor = Some(ancestor);
        }

        Step::MergeIntoAncestor => {
            let prerelease = branch_of(plan)?;
            let ancestor = plan
                .ancestor
                .clone()
                .ok_or_else(|| ReleaseError::invalid_state("no ancestor resolved"))?;
            session.merge(&prerelease, &ancestor, IgnoreList::PreReleaseMerge, MergeFavor::Ours)?;
        }

        Step::PushMasterRelease => {
            let tag = version_of(plan)?.tag_name();
            push::push_master_release(session, &branch_of(plan)?, Some(&tag))?;
        }

        Step::PushPreRelease => {
            let tag = version_of(plan)?.tag_name();
            push::push_pre_release(session, &branch_of(plan)?, Some(&tag), plan.ancestor.as_deref())?;
        }

        Step::PushPatchRelease => {
            let tag = version_of(plan)?.tag_name();
            let stable = plan
                .stable
                .clone()
                .ok_or_else(|| ReleaseError::invalid_state("no stable branch selected"))?;
            push::push_patch_release(session, &branch_of(plan)?, &stable, Some(&tag))?;
        }

        Step::PushNewBranches => {
            let branch = branch_of(plan)?;
            if branch.starts_with(RELEASE_PREFIX) {
                push::push_branches(session, &[branch.as_str(), names.develop.as_str()])?;
            } else {
                push::push_branches(session, &[branch.as_str()])?;
            }
        }

        Step::SyncTracker => {
            let version = version_of(plan)?;
            let next = plan.next.unwrap_or_else(|| version.next_minor());
            session.sync_tracker(&version, &next)?;
        }

        Step::OfferSupportBranch => {
            push::offer_support_branch(session, &version_of(plan)?)?;
        }
    }

    Ok(StepResult::Continue(Vec::new()))
}
