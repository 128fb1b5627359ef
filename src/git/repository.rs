use crate::error::{ReleaseError, Result};
use crate::git::{BranchHeads, MergeFavor};
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Commit, FileFavor, IndexAddOption, MergeOptions, ObjectType, Oid, Pathspec,
    PathspecFlags, Repository as Git2Repo, StatusOptions, Tree,
};
use log::{debug, info};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    fn branch_commit(&self, branch_name: &str) -> Result<Commit<'_>> {
        let branch = self
            .repo
            .find_branch(branch_name, BranchType::Local)
            .map_err(|e| {
                ReleaseError::precondition(format!("Cannot find branch '{}': {}", branch_name, e))
            })?;

        Ok(branch.into_reference().peel_to_commit()?)
    }

    fn head_commit(&self) -> Result<Commit<'_>> {
        Ok(self.repo.head()?.peel_to_commit()?)
    }

    fn write_worktree_file(&self, path: &str, content: Option<&[u8]>) -> Result<()> {
        let full_path = self.workdir_path()?.join(path);
        match content {
            Some(bytes) => {
                if let Some(parent) = full_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&full_path, bytes)?;
            }
            None => {
                if full_path.exists() {
                    fs::remove_file(&full_path)?;
                }
            }
        }
        Ok(())
    }

    fn workdir_path(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| ReleaseError::precondition("repository has no working directory"))
    }

    /// Put `path` back to its content in `tree` (or remove it when the tree
    /// lacks it), in both the index and the working tree.
    fn restore_path(&self, index: &mut git2::Index, tree: &Tree<'_>, path: &str) -> Result<()> {
        let blob = match tree.get_path(Path::new(path)) {
            Ok(entry) if entry.kind() == Some(ObjectType::Blob) => {
                Some(self.repo.find_blob(entry.id())?)
            }
            _ => None,
        };

        match blob {
            Some(blob) => {
                self.write_worktree_file(path, Some(blob.content()))?;
                index.add_path(Path::new(path))?;
            }
            None => {
                self.write_worktree_file(path, None)?;
                index.remove_path(Path::new(path))?;
            }
        }
        Ok(())
    }

    fn discard_ignored_paths(
        &self,
        index: &mut git2::Index,
        target_tree: &Tree<'_>,
        patterns: &[String],
    ) -> Result<()> {
        if patterns.is_empty() {
            return Ok(());
        }

        let pathspec = Pathspec::new(patterns.iter().map(String::as_str))?;
        let mut paths = BTreeSet::new();

        let in_tree = pathspec.match_tree(target_tree, PathspecFlags::DEFAULT)?;
        paths.extend(in_tree.entries().map(|p| String::from_utf8_lossy(p).into_owned()));

        let in_index = pathspec.match_index(index, PathspecFlags::DEFAULT)?;
        paths.extend(in_index.entries().map(|p| String::from_utf8_lossy(p).into_owned()));

        for path in paths {
            debug!("discarding merged changes to '{}'", path);
            self.restore_path(index, target_tree, &path)?;
        }
        Ok(())
    }

    fn resolve_conflicts(&self, index: &mut git2::Index, favor: MergeFavor) -> Result<()> {
        if !index.has_conflicts() {
            return Ok(());
        }

        let conflicts = index
            .conflicts()?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for conflict in conflicts {
            let path = [&conflict.our, &conflict.their, &conflict.ancestor]
                .into_iter()
                .flatten()
                .next()
                .map(|entry| String::from_utf8_lossy(&entry.path).into_owned());
            let Some(path) = path else { continue };

            let chosen = match favor {
                MergeFavor::Ours => conflict.our,
                MergeFavor::Theirs => conflict.their,
            };
            debug!("resolving conflict in '{}' with {:?}", path, favor);

            match chosen {
                Some(entry) => {
                    let blob = self.repo.find_blob(entry.id)?;
                    self.write_worktree_file(&path, Some(blob.content()))?;
                    index.add_path(Path::new(&path))?;
                }
                None => {
                    self.write_worktree_file(&path, None)?;
                    index.remove_path(Path::new(&path))?;
                }
            }
        }
        Ok(())
    }

    fn remote_callbacks<'a>() -> git2::RemoteCallbacks<'a> {
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(|_url, username_from_url, allowed_types| {
            let username = username_from_url.unwrap_or("git");
            if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                if let Some(home) = dirs::home_dir() {
                    for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let path = home.join(".ssh").join(key);
                        if path.exists() {
                            if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                                return Ok(cred);
                            }
                        }
                    }
                }

                if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }
            }

            git2::Cred::default()
        });
        callbacks
    }
}

impl super::GitRepository for Git2Repository {
    fn current_branch(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| ReleaseError::precondition(format!("No current branch: {}", e)))?;

        if !head.is_branch() {
            return Err(ReleaseError::precondition(
                "No current branch: HEAD is detached",
            ));
        }

        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| ReleaseError::precondition("No current branch: invalid branch name"))
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        match self.repo.find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        match self.repo.find_reference(&format!("refs/tags/{}", name)) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn tags(&self) -> Result<Vec<String>> {
        Ok(self
            .repo
            .tag_names(None)?
            .iter()
            .flatten()
            .map(str::to_string)
            .collect())
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn reachable_tags(&self, branch: &str) -> Result<Vec<String>> {
        let tip = self.branch_commit(branch)?.id();
        let mut reachable = Vec::new();

        for tag_name in self.repo.tag_names(None)?.iter().flatten() {
            let reference = self.repo.find_reference(&format!("refs/tags/{}", tag_name))?;
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };
            if commit.id() == tip || self.repo.graph_descendant_of(tip, commit.id())? {
                reachable.push(tag_name.to_string());
            }
        }
        Ok(reachable)
    }

    fn resolve_commit(&self, rev: &str) -> Result<Option<String>> {
        let commit = self
            .repo
            .revparse_single(rev)
            .and_then(|object| object.peel_to_commit());
        Ok(commit.ok().map(|c| c.id().to_string()))
    }

    fn list_remotes(&self) -> Result<Vec<String>> {
        let mut remotes: Vec<String> = self
            .repo
            .remotes()?
            .iter()
            .flatten()
            .map(str::to_string)
            .collect();

        // "origin" first, the rest alphabetically
        remotes.sort_by(|a, b| {
            if a == "origin" {
                std::cmp::Ordering::Less
            } else if b == "origin" {
                std::cmp::Ordering::Greater
            } else {
                a.cmp(b)
            }
        });
        Ok(remotes)
    }

    fn fetch(&self, remote_name: &str) -> Result<()> {
        let mut remote = self.repo.find_remote(remote_name).map_err(|e| {
            ReleaseError::precondition(format!("Remote '{}' not found: {}", remote_name, e))
        })?;

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(Self::remote_callbacks());

        let refspec_heads = format!("+refs/heads/*:refs/remotes/{}/*", remote_name);
        let refspecs = [refspec_heads.as_str(), "+refs/tags/*:refs/tags/*"];
        info!("fetching from '{}'", remote_name);
        remote.fetch(&refspecs, Some(&mut fetch_options), None)?;
        Ok(())
    }

    fn branch_heads(&self, remote: &str, branch: &str) -> Result<Option<BranchHeads>> {
        let local = self.branch_commit(branch)?.id();
        let remote_ref = format!("refs/remotes/{}/{}", remote, branch);

        let remote_oid = match self.repo.find_reference(&remote_ref) {
            Ok(reference) => reference.peel_to_commit()?.id(),
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let merge_base = self.repo.merge_base(local, remote_oid)?;
        Ok(Some(BranchHeads {
            local,
            remote: remote_oid,
            merge_base,
        }))
    }

    fn is_working_directory_clean(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(true).include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses.is_empty())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        let refname = format!("refs/heads/{}", branch);
        let target = self.repo.revparse_single(&refname)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        self.repo.checkout_tree(&target, Some(&mut checkout))?;
        self.repo.set_head(&refname)?;
        debug!("checked out '{}'", branch);
        Ok(())
    }

    fn checkout_new_branch(&self, name: &str, start_point: &str) -> Result<()> {
        self.create_branch(name, start_point)?;
        self.checkout(name)
    }

    fn create_branch(&self, name: &str, start_point: &str) -> Result<()> {
        let commit = self.repo.revparse_single(start_point)?.peel_to_commit()?;
        self.repo.branch(name, &commit, false)?;
        info!("created branch '{}' at {}", name, commit.id());
        Ok(())
    }

    fn commit_all(&self, message: &str) -> Result<String> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let signature = self.repo.signature()?;
        let parent = self.head_commit()?;
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])?;
        info!("committed {}: {}", oid, message);
        Ok(oid.to_string())
    }

    fn head_message(&self) -> Result<String> {
        Ok(self.head_commit()?.message().unwrap_or_default().to_string())
    }

    fn merge_with_ignore_list(
        &self,
        source: &str,
        target: &str,
        ignore: &[String],
        favor: MergeFavor,
    ) -> Result<String> {
        self.checkout(target)?;
        let target_commit = self.branch_commit(target)?;
        let source_commit = self.branch_commit(source)?;
        let annotated = self.repo.find_annotated_commit(source_commit.id())?;

        let (analysis, _) = self.repo.merge_analysis(&[&annotated])?;
        if analysis.is_up_to_date() {
            info!("'{}' already contains '{}'", target, source);
            return Ok(target_commit.id().to_string());
        }

        let mut merge_options = MergeOptions::new();
        merge_options.file_favor(match favor {
            MergeFavor::Ours => FileFavor::Ours,
            MergeFavor::Theirs => FileFavor::Theirs,
        });
        let mut checkout = CheckoutBuilder::new();
        checkout.safe().allow_conflicts(true).conflict_style_merge(true);
        self.repo
            .merge(&[&annotated], Some(&mut merge_options), Some(&mut checkout))?;

        let mut index = self.repo.index()?;
        self.discard_ignored_paths(&mut index, &target_commit.tree()?, ignore)?;
        self.resolve_conflicts(&mut index, favor)?;
        index.write()?;

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let signature = self.repo.signature()?;
        let message = format!("Merge branch '{}' into {}", source, target);
        let oid: Oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&target_commit, &source_commit],
        )?;
        self.repo.cleanup_state()?;

        info!("merged '{}' into '{}' as {}", source, target, oid);
        Ok(oid.to_string())
    }

    fn create_tag(&self, name: &str, message: &str) -> Result<()> {
        let head = self.head_commit()?;
        let signature = self.repo.signature()?;
        self.repo
            .tag(name, head.as_object(), &signature, message, false)
            .map_err(|e| ReleaseError::precondition(format!("Cannot create tag '{}': {}", name, e)))?;
        info!("tagged {} as '{}'", head.id(), name);
        Ok(())
    }

    fn push(&self, remote_name: &str, branch: &str, tag: Option<&str>) -> Result<()> {
        let mut remote = self.repo.find_remote(remote_name).map_err(|e| {
            ReleaseError::precondition(format!("Remote '{}' not found: {}", remote_name, e))
        })?;

        let mut refspecs = vec![format!("refs/heads/{0}:refs/heads/{0}", branch)];
        if let Some(tag) = tag {
            refspecs.push(format!("refs/tags/{0}:refs/tags/{0}", tag));
        }

        let mut callbacks = Self::remote_callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });
        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        info!("pushing {:?} to '{}'", refspecs, remote_name);
        remote.push(&refspecs, Some(&mut push_options))?;
        Ok(())
    }

    fn nearest_ancestor_branches(&self, candidates: &[String]) -> Result<Vec<String>> {
        let head = self.head_commit()?.id();

        let mut ancestors = Vec::new();
        for name in candidates {
            let tip = self.branch_commit(name)?.id();
            if tip == head || self.repo.graph_descendant_of(head, tip)? {
                ancestors.push((name.clone(), tip));
            }
        }

        let mut nearest = Vec::new();
        for (name, tip) in &ancestors {
            let mut shadowed = false;
            for (_, other) in &ancestors {
                if other != tip && self.repo.graph_descendant_of(*other, *tip)? {
                    shadowed = true;
                    break;
                }
            }
            if !shadowed {
                nearest.push(name.clone());
            }
        }
        Ok(nearest)
    }

    fn workdir(&self) -> Result<PathBuf> {
        self.workdir_path()
    }
}
