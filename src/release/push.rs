use crate::domain::branch::{hotfix_branch, support_branch};
use crate::domain::SemanticVersion;
use crate::error::{ReleaseError, Result};
use crate::release::guards::ensure_up_to_date;
use crate::release::Session;

/// Push one branch (and tag) to every remote
fn push_group(session: &Session<'_>, remotes: &[String], branch: &str, tag: Option<&str>) -> Result<()> {
    for remote in remotes {
        session.repo.push(remote, branch, tag)?;
    }
    match tag {
        Some(tag) => session
            .output
            .success(&format!("Pushed '{}' and tag '{}'", branch, tag)),
        None => session.output.success(&format!("Pushed '{}'", branch)),
    }
    Ok(())
}

/// Verify `branches` are up to date, then push each group in order.
///
/// Every group reaches all remotes before the next group starts.
fn push_groups(session: &Session<'_>, groups: &[(&str, Option<&str>)]) -> Result<()> {
    let remotes = session.remotes()?;
    if remotes.is_empty() {
        session.output.warning("No remotes configured; nothing pushed");
        return Ok(());
    }

    let branches: Vec<&str> = groups.iter().map(|(branch, _)| *branch).collect();
    ensure_up_to_date(session, &branches)?;

    for (branch, tag) in groups {
        push_group(session, &remotes, branch, *tag)?;
    }
    Ok(())
}

/// Release branch, then master with the tag, then develop
pub fn push_master_release(session: &Session<'_>, release: &str, tag: Option<&str>) -> Result<()> {
    if !session.repo.branch_exists(release)? {
        return Err(ReleaseError::precondition(format!(
            "release branch '{}' does not exist",
            release
        )));
    }
    let names = session.names();
    push_groups(
        session,
        &[
            (release, None),
            (names.master.as_str(), tag),
            (names.develop.as_str(), None),
        ],
    )
}

/// Prerelease branch with its tag, then the branch it was merged into
pub fn push_pre_release(
    session: &Session<'_>,
    prerelease: &str,
    tag: Option<&str>,
    ancestor: Option<&str>,
) -> Result<()> {
    let mut groups = vec![(prerelease, tag)];
    if let Some(ancestor) = ancestor {
        groups.push((ancestor, None));
    }
    push_groups(session, &groups)
}

/// Hotfix branch, then the stable branch with the tag, then develop when the
/// stable branch is master
pub fn push_patch_release(
    session: &Session<'_>,
    hotfix: &str,
    stable: &str,
    tag: Option<&str>,
) -> Result<()> {
    let names = session.names();
    let mut groups = vec![(hotfix, None), (stable, tag)];
    if stable == names.master {
        groups.push((names.develop.as_str(), None));
    }
    push_groups(session, &groups)
}

/// Push newly opened branches, in order
pub fn push_branches(session: &Session<'_>, branches: &[&str]) -> Result<()> {
    let groups: Vec<(&str, Option<&str>)> = branches.iter().map(|b| (*b, None)).collect();
    push_groups(session, &groups)
}

/// Offer `support/vM.m` and `hotfix/vM.m.0` at the tag of `version`.
///
/// Declining is a no-op. Branches that already exist are left alone.
pub fn offer_support_branch(session: &Session<'_>, version: &SemanticVersion) -> Result<()> {
    let support = support_branch(version.major, version.minor);
    let hotfix = hotfix_branch(&SemanticVersion::new(version.major, version.minor, 0));

    if session.repo.branch_exists(&support)? {
        session
            .output
            .status(&format!("Support branch '{}' already exists", support));
        return Ok(());
    }
    if !session
        .prompter
        .confirm(&format!("Create support branch '{}'?", support), false)?
    {
        return Ok(());
    }

    let tag = version.tag_name();
    session.repo.create_branch(&support, &tag)?;
    session
        .output
        .success(&format!("Created '{}' at '{}'", support, tag));
    if !session.repo.branch_exists(&hotfix)? {
        session.repo.create_branch(&hotfix, &tag)?;
        session
            .output
            .success(&format!("Created '{}' at '{}'", hotfix, tag));
    }
    Ok(())
}
