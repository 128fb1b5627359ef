use crate::config::{Config, IgnoreList};
use crate::domain::{BranchNames, SemanticVersion};
use crate::error::Result;
use crate::git::{GitRepository, MergeFavor};
use crate::metadata::MetadataUpdater;
use crate::tracker::{IssueTracker, VersionSync};
use crate::ui::{Output, Prompter};
use log::debug;
use std::collections::VecDeque;

/// Options for one invocation, fixed before any step runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseContext {
    /// Branch to merge a pre-release back into, instead of inferring it
    pub ancestor: Option<String>,
    /// Commit to fork new release branches from, instead of develop's tip
    pub commit_hash: Option<String>,
    pub no_push: bool,
    /// Stop after the version commits so the user can amend them
    pub pause_for_commit: bool,
    /// Only open the next branch; do not complete a release
    pub start_release_phase: bool,
}

/// Everything a flow talks to
pub struct Session<'a> {
    pub repo: &'a dyn GitRepository,
    pub prompter: &'a dyn Prompter,
    pub output: &'a dyn Output,
    pub config: &'a Config,
    pub metadata: &'a MetadataUpdater,
    pub tracker: Option<&'a dyn IssueTracker>,
    pub context: ReleaseContext,
}

impl<'a> Session<'a> {
    pub fn names(&self) -> BranchNames {
        self.config.branches.names()
    }

    /// Configured remotes, or every remote of the repository
    pub fn remotes(&self) -> Result<Vec<String>> {
        if self.config.remotes.is_empty() {
            self.repo.list_remotes()
        } else {
            Ok(self.config.remotes.clone())
        }
    }

    /// Write `version` into the working tree and commit it on the current branch
    pub fn commit_metadata(&self, version: &SemanticVersion) -> Result<()> {
        if self.metadata.is_configured() {
            self.metadata.update(&self.repo.workdir()?, version)?;
        }
        let branch = self.repo.current_branch()?;
        self.repo.commit_all(&metadata_message(version))?;
        self.output
            .success(&format!("Updated metadata to {} on '{}'", version, branch));
        Ok(())
    }

    pub fn merge(
        &self,
        source: &str,
        target: &str,
        list: IgnoreList,
        favor: MergeFavor,
    ) -> Result<()> {
        let patterns = self.config.ignore.patterns(list);
        self.output
            .status(&format!("Merging '{}' into '{}'", source, target));
        self.repo
            .merge_with_ignore_list(source, target, patterns, favor)?;
        Ok(())
    }

    /// Latest version tag among `tags`, optionally restricted to `filter`
    pub fn latest_version<F>(&self, tags: &[String], filter: F) -> Option<SemanticVersion>
    where
        F: Fn(&SemanticVersion) -> bool,
    {
        tags.iter()
            .filter_map(|tag| SemanticVersion::from_tag(tag).ok())
            .filter(|version| filter(version))
            .max()
    }

    /// Release `version` in the tracker when one is configured
    pub fn sync_tracker(&self, version: &SemanticVersion, next: &SemanticVersion) -> Result<()> {
        match self.tracker {
            Some(tracker) => VersionSync::new(tracker, self.output).sync_release(version, next),
            None => {
                debug!("no tracker configured; skipping sync of {}", version);
                Ok(())
            }
        }
    }
}

/// Message of the commit recording `version` in the working tree
pub fn metadata_message(version: &SemanticVersion) -> String {
    format!("Update metadata to version '{}'.", version)
}

/// State threaded through the steps of one flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleasePlan {
    /// The version being released
    pub version: Option<SemanticVersion>,
    /// Next mainline (or patch) version, for develop and the tracker
    pub next: Option<SemanticVersion>,
    /// Branch or commit new branches fork from
    pub source: Option<String>,
    /// Release, prerelease or hotfix branch being worked on
    pub branch: Option<String>,
    /// Branch a pre-release folds back into
    pub ancestor: Option<String>,
    /// master or a support branch a hotfix closes on
    pub stable: Option<String>,
}

/// One unit of work in a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Clean tree and up-to-date develop and master
    CheckMainline,
    /// Clean tree and up-to-date current branch
    CheckCurrent,
    /// Up-to-date stable branch a hotfix closes on
    CheckStable,
    ChooseDevelopVersion,
    ChooseNextMainline,
    CreateReleaseBranch,
    BumpDevelop,
    ChooseReleaseCandidate,
    ChooseHotfixVersion,
    ChooseNextHotfix,
    CreateHotfixBranch,
    CreatePreReleaseBranch,
    /// Metadata commit for the plan's version on the plan's branch
    UpdateMetadata,
    /// Stop here when pausing for commit
    PausePoint,
    TagRelease,
    CloseRelease,
    CloseHotfix,
    ResolveAncestor,
    MergeIntoAncestor,
    PushMasterRelease,
    PushPreRelease,
    PushPatchRelease,
    PushNewBranches,
    SyncTracker,
    OfferSupportBranch,
}

pub enum StepResult {
    /// Run these steps next, ahead of the rest of the queue
    Continue(Vec<Step>),
    Stop,
}

/// Run `steps` in order until the queue drains or a step stops.
pub fn run<F>(session: &Session<'_>, plan: &mut ReleasePlan, steps: Vec<Step>, mut execute: F) -> Result<()>
where
    F: FnMut(&Session<'_>, &mut ReleasePlan, Step) -> Result<StepResult>,
{
    let mut queue: VecDeque<Step> = steps.into();

    while let Some(step) = queue.pop_front() {
        debug!("running step {:?}", step);
        match execute(session, plan, step)? {
            StepResult::Continue(follow_up) => {
                for next in follow_up.into_iter().rev() {
                    queue.push_front(next);
                }
            }
            StepResult::Stop => {
                debug!("stopped after {:?}", step);
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;
    use crate::ui::{LinePrompter, RecordingOutput};
    use std::io::{self, Cursor};

    #[test]
    fn test_follow_up_steps_run_before_queue() {
        let repo = MockRepository::new();
        let prompter = LinePrompter::new(Cursor::new(Vec::new()), io::sink());
        let output = RecordingOutput::new();
        let config = Config::default();
        let metadata = MetadataUpdater::new(config.metadata.clone());
        let session = Session {
            repo: &repo,
            prompter: &prompter,
            output: &output,
            config: &config,
            metadata: &metadata,
            tracker: None,
            context: ReleaseContext::default(),
        };

        let mut seen = Vec::new();
        let mut plan = ReleasePlan::default();
        run(
            &session,
            &mut plan,
            vec![Step::CheckCurrent, Step::PausePoint, Step::TagRelease],
            |_, _, step| {
                seen.push(step);
                Ok(match step {
                    Step::CheckCurrent => StepResult::Continue(vec![Step::UpdateMetadata, Step::SyncTracker]),
                    Step::PausePoint => StepResult::Stop,
                    _ => StepResult::Continue(vec![]),
                })
            },
        )
        .unwrap();

        assert_eq!(
            seen,
            vec![
                Step::CheckCurrent,
                Step::UpdateMetadata,
                Step::SyncTracker,
                Step::PausePoint
            ]
        );
    }
}
