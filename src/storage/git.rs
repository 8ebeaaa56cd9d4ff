//! Git adapter: commits rendered files into local working copies

use std::fs;
use std::path::{Component, Path, PathBuf};

use git2::{Commit, Oid, Repository, Signature};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::core::{FileUpdates, GitCommit, GitCommitId, GitRepo, GitRepoId};
use crate::deployments::ports::GitPort;
use crate::deployments::renderer::{merge_section, section_name};
use crate::error::{PackmindError, Result};

pub const DEFAULT_AUTHOR_NAME: &str = "Packmind";
pub const DEFAULT_AUTHOR_EMAIL: &str = "packmind@localhost";

/// Open a repository, initializing it (and its directory) when missing.
pub fn open_or_init(path: impl AsRef<Path>) -> Result<Repository> {
    let path = path.as_ref();
    fs::create_dir_all(path)?;
    let repo = match Repository::open(path) {
        Ok(repo) => repo,
        Err(_) => Repository::init(path)?,
    };
    Ok(repo)
}

/// [`GitPort`] over repositories checked out on the local filesystem.
///
/// Commits land on whatever branch `HEAD` points at. Writes are serialized
/// so two publishes never interleave in one working copy.
pub struct GitArchive {
    repositories: Vec<GitRepo>,
    author_name: String,
    author_email: String,
    write_lock: Mutex<()>,
}

impl GitArchive {
    #[must_use]
    pub fn new(repositories: Vec<GitRepo>) -> Self {
        Self {
            repositories,
            author_name: DEFAULT_AUTHOR_NAME.to_string(),
            author_email: DEFAULT_AUTHOR_EMAIL.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = name.into();
        self.author_email = email.into();
        self
    }

    #[must_use]
    pub fn repositories(&self) -> &[GitRepo] {
        &self.repositories
    }

    fn open_working_copy(repo: &GitRepo) -> Result<Repository> {
        let path = repo.local_path.as_ref().ok_or_else(|| {
            PackmindError::Git(format!(
                "Repository {} has no local path configured",
                repo.full_name()
            ))
        })?;
        let working_copy = Repository::open(path)?;
        if working_copy.is_bare() {
            return Err(PackmindError::Git(format!(
                "Repository {} at {} is bare",
                repo.full_name(),
                path.display()
            )));
        }
        Ok(working_copy)
    }

    fn write_files(
        workdir: &Path,
        updates: &FileUpdates,
        snapshots: &mut Vec<Snapshot>,
    ) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut written = Vec::with_capacity(updates.create_or_update.len());
        for file in &updates.create_or_update {
            let relative = checked_path(&file.path)?;
            let absolute = workdir.join(&relative);
            let previous = if absolute.is_file() {
                Some(fs::read(&absolute)?)
            } else {
                None
            };
            let content = match &previous {
                Some(bytes) if section_name(&file.content).is_some() => {
                    merge_section(&String::from_utf8_lossy(bytes), &file.content)
                }
                _ => file.content.clone(),
            };
            snapshots.push(Snapshot {
                relative: relative.clone(),
                previous,
            });
            if let Some(parent) = absolute.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&absolute, content)?;
            written.push(relative);
        }

        let mut removed = Vec::with_capacity(updates.delete.len());
        for file in &updates.delete {
            let relative = checked_path(&file.path)?;
            let absolute = workdir.join(&relative);
            if absolute.is_file() {
                snapshots.push(Snapshot {
                    relative: relative.clone(),
                    previous: Some(fs::read(&absolute)?),
                });
                fs::remove_file(&absolute)?;
            }
            removed.push(relative);
        }
        Ok((written, removed))
    }

    /// Stage the touched paths and commit them on `HEAD`. The on-disk index is
    /// only written once the commit exists.
    fn stage_and_commit(
        &self,
        working_copy: &Repository,
        parent: Option<&Commit<'_>>,
        written: &[PathBuf],
        removed: &[PathBuf],
        message: &str,
    ) -> Result<Oid> {
        let mut index = working_copy.index()?;
        for path in written {
            index.add_path(path)?;
        }
        for path in removed {
            if index.get_path(path, 0).is_some() {
                index.remove_path(path)?;
            }
        }
        let tree_id = index.write_tree()?;
        let tree = working_copy.find_tree(tree_id)?;

        let unchanged = match parent {
            Some(commit) => commit.tree_id() == tree_id,
            None => tree.is_empty(),
        };
        if unchanged {
            return Err(PackmindError::NoChangesDetected);
        }

        let signature = Signature::now(&self.author_name, &self.author_email)?;
        let parents: Vec<&Commit<'_>> = parent.into_iter().collect();
        let oid = working_copy.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        if let Err(err) = index.write() {
            warn!(sha = %oid, error = %err, "Committed but could not write the index");
        }
        Ok(oid)
    }

    /// Put the working copy and index back the way they were before a failed publish.
    fn roll_back(working_copy: &Repository, workdir: &Path, snapshots: &[Snapshot]) {
        for snapshot in snapshots.iter().rev() {
            let absolute = workdir.join(&snapshot.relative);
            let restored = match &snapshot.previous {
                Some(bytes) => fs::write(&absolute, bytes),
                None => match fs::remove_file(&absolute) {
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    other => other,
                },
            };
            if let Err(err) = restored {
                warn!(
                    path = %snapshot.relative.display(),
                    error = %err,
                    "Could not restore working copy file"
                );
            }
        }
        if let Err(err) = working_copy.index().and_then(|mut index| index.read(true)) {
            warn!(error = %err, "Could not reload the index");
        }
    }
}

/// A working copy file as it was before a publish touched it.
struct Snapshot {
    relative: PathBuf,
    previous: Option<Vec<u8>>,
}

impl GitPort for GitArchive {
    fn get_repository_by_id(&self, id: &GitRepoId) -> Result<Option<GitRepo>> {
        Ok(self.repositories.iter().find(|r| &r.id == id).cloned())
    }

    fn commit_to_git(
        &self,
        repo: &GitRepo,
        updates: &FileUpdates,
        message: &str,
    ) -> Result<GitCommit> {
        let _guard = self.write_lock.lock();
        let working_copy = Self::open_working_copy(repo)?;
        let workdir = working_copy
            .workdir()
            .ok_or_else(|| {
                PackmindError::Git(format!("{} has no working directory", repo.full_name()))
            })?
            .to_path_buf();

        let head = working_copy.head().ok();
        if let Some(branch) = head.as_ref().and_then(|h| h.shorthand()) {
            if branch != repo.branch {
                warn!(
                    repository = %repo.full_name(),
                    expected = %repo.branch,
                    checked_out = branch,
                    "Committing on the checked out branch"
                );
            }
        }
        let parent: Option<Commit<'_>> = head.and_then(|h| h.peel_to_commit().ok());

        let mut snapshots = Vec::new();
        let committed = Self::write_files(&workdir, updates, &mut snapshots).and_then(
            |(written, removed)| {
                let oid =
                    self.stage_and_commit(&working_copy, parent.as_ref(), &written, &removed, message)?;
                Ok((oid, written.len(), removed.len()))
            },
        );
        let (oid, files, deleted) = match committed {
            Ok(done) => done,
            Err(err) => {
                Self::roll_back(&working_copy, &workdir, &snapshots);
                if err.is_no_changes() {
                    debug!(repository = %repo.full_name(), "Tree unchanged, nothing to commit");
                } else {
                    warn!(
                        repository = %repo.full_name(),
                        error = %err,
                        restored = snapshots.len(),
                        "Commit failed, working copy restored"
                    );
                }
                return Err(err);
            }
        };

        info!(
            repository = %repo.full_name(),
            sha = %oid,
            files,
            deleted,
            "Committed deployment"
        );
        Ok(GitCommit {
            id: GitCommitId::new(),
            sha: oid.to_string(),
            message: message.to_string(),
            author: format!("{} <{}>", self.author_name, self.author_email),
            url: format!("file://{}", workdir.display()),
        })
    }
}

/// Reject paths that would escape the working copy.
fn checked_path(path: &str) -> Result<PathBuf> {
    let requested = Path::new(path);
    let escapes = requested
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    let relative: PathBuf = requested
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    if escapes || relative.as_os_str().is_empty() {
        return Err(PackmindError::Git(format!(
            "Refusing to write outside the repository: {path}"
        )));
    }
    Ok(relative)
}
