use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WorkingCopyError {
    #[error("could not run `git {command}`: {source}")]
    Spawn { command: String, source: std::io::Error },
    #[error("`git {command}` failed: {output}")]
    CommandFailed { command: String, output: String },
}

/// Local clone the intake artifacts are committed into.
#[async_trait]
pub trait WorkingCopy: Send + Sync {
    fn root(&self) -> &Path;

    /// Paths with uncommitted changes, tracked or untracked, relative to the root.
    async fn changed_paths(&self) -> Result<Vec<String>, WorkingCopyError>;

    /// Checks out `branch` and pulls it from `remote`.
    async fn sync_branch(&self, remote: &str, branch: &str) -> Result<(), WorkingCopyError>;

    async fn stage(&self, paths: &[PathBuf]) -> Result<(), WorkingCopyError>;

    /// Commits the index. An index identical to `HEAD` is not an error and
    /// produces no commit.
    async fn commit(&self, message: &str) -> Result<(), WorkingCopyError>;

    async fn push(&self, remote: &str, branch: &str) -> Result<(), WorkingCopyError>;
}

pub struct GitWorkingCopy {
    root: PathBuf,
}

impl GitWorkingCopy {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn run_git<I, S>(&self, args: I) -> Result<String, WorkingCopyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let (command, output) = self.spawn_git(args).await?;
        if !output.status.success() {
            return Err(command_failed(command, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn spawn_git<I, S>(&self, args: I) -> Result<(String, Output), WorkingCopyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect::<Vec<_>>();
        let command = args.iter().map(|arg| arg.to_string_lossy()).collect::<Vec<_>>().join(" ");
        debug!(%command, root = %self.root.display(), "running git");

        let output = Command::new("git")
            .args(&args)
            .current_dir(&self.root)
            .output()
            .await
            .map_err(|source| WorkingCopyError::Spawn { command: command.clone(), source })?;
        Ok((command, output))
    }

    /// `git diff --cached --quiet` exits 1 when the index differs from `HEAD`.
    async fn has_staged_changes(&self) -> Result<bool, WorkingCopyError> {
        let (command, output) = self.spawn_git(["diff", "--cached", "--quiet"]).await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(command_failed(command, &output)),
        }
    }
}

/// git reports some failures, such as "nothing to commit", on stdout only.
fn command_failed(command: String, output: &Output) -> WorkingCopyError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let output = if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    };
    WorkingCopyError::CommandFailed { command, output }
}

#[async_trait]
impl WorkingCopy for GitWorkingCopy {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn changed_paths(&self) -> Result<Vec<String>, WorkingCopyError> {
        let status =
            self.run_git(["status", "--porcelain=v1", "-z", "--untracked-files=all"]).await?;
        Ok(parse_porcelain(&status))
    }

    async fn sync_branch(&self, remote: &str, branch: &str) -> Result<(), WorkingCopyError> {
        self.run_git(["checkout", branch]).await?;
        self.run_git(["pull", remote, branch]).await?;
        Ok(())
    }

    async fn stage(&self, paths: &[PathBuf]) -> Result<(), WorkingCopyError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec![PathBuf::from("add"), PathBuf::from("--")];
        args.extend(paths.iter().cloned());
        self.run_git(args).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<(), WorkingCopyError> {
        if !self.has_staged_changes().await? {
            debug!(root = %self.root.display(), "index matches HEAD, nothing to commit");
            return Ok(());
        }
        self.run_git(["commit", "-m", message]).await?;
        Ok(())
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<(), WorkingCopyError> {
        self.run_git(["push", remote, branch]).await?;
        Ok(())
    }
}

/// Extracts paths from `git status --porcelain=v1 -z` output. Paths are
/// unquoted; renames and copies report the destination and skip the source
/// entry that follows.
pub fn parse_porcelain(status: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut entries = status.split('\0').filter(|entry| !entry.is_empty());
    while let Some(entry) = entries.next() {
        let Some(path) = entry.get(3..).filter(|path| !path.is_empty()) else {
            continue;
        };
        if entry.starts_with(['R', 'C']) {
            entries.next();
        }
        paths.push(path.to_string());
    }
    paths
}

/// Throwaway repositories for tests that need real git behaviour.
#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;
    use std::process::Command as StdCommand;

    use tempfile::TempDir;

    pub fn git_available() -> bool {
        StdCommand::new("git").arg("--version").output().is_ok_and(|out| out.status.success())
    }

    pub fn git(dir: &Path, args: &[&str]) {
        let output =
            StdCommand::new("git").args(args).current_dir(dir).output().expect("spawn git");
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    /// A bare `origin` plus a clone with `dev` checked out, tracked and pushed.
    /// The clone lives at `work` inside the returned directory.
    pub fn remote_with_clone() -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        git(dir.path(), &["init", "--quiet", "--bare", "origin.git"]);
        git(dir.path(), &["clone", "--quiet", "origin.git", "work"]);

        let work = dir.path().join("work");
        git(&work, &["config", "user.email", "intake@example.com"]);
        git(&work, &["config", "user.name", "Intake"]);
        git(&work, &["config", "commit.gpgsign", "false"]);
        git(&work, &["checkout", "--quiet", "-b", "dev"]);
        std::fs::write(work.join("README.md"), "metadata\n").expect("readme");
        git(&work, &["add", "README.md"]);
        git(&work, &["commit", "--quiet", "-m", "Initial commit"]);
        git(&work, &["push", "--quiet", "-u", "origin", "dev"]);
        dir
    }

    pub fn commit_count(work: &Path) -> usize {
        let output = StdCommand::new("git")
            .args(["rev-list", "--count", "HEAD"])
            .current_dir(work)
            .output()
            .expect("rev-list");
        String::from_utf8_lossy(&output.stdout).trim().parse().expect("commit count")
    }
}
