//! In-memory stand-ins for the working copy and the pull-request API, used by
//! this crate's tests and by the runtime tests upstream.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::github::{NewPullRequest, PullRequest, PullRequestApi, PullRequestError};
use crate::workspace::{WorkingCopy, WorkingCopyError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared record of the operations a [`RecordingWorkingCopy`] performed.
#[derive(Clone, Default)]
pub struct WorkingCopyLog(Arc<Mutex<Vec<String>>>);

impl WorkingCopyLog {
    pub fn entries(&self) -> Vec<String> {
        lock(&self.0).clone()
    }

    fn push(&self, entry: String) {
        lock(&self.0).push(entry);
    }
}

/// Working copy that writes into a real directory but only records git operations.
pub struct RecordingWorkingCopy {
    root: PathBuf,
    changes: Vec<String>,
    failure: Mutex<Option<(&'static str, WorkingCopyError)>>,
    log: WorkingCopyLog,
}

impl RecordingWorkingCopy {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            changes: Vec::new(),
            failure: Mutex::new(None),
            log: WorkingCopyLog::default(),
        }
    }

    pub fn with_changes(mut self, changes: Vec<String>) -> Self {
        self.changes = changes;
        self
    }

    /// Fails the first operation named `operation` (`status`, `sync`, `stage`,
    /// `commit` or `push`) with `error`.
    pub fn failing_on(self, operation: &'static str, error: WorkingCopyError) -> Self {
        *lock(&self.failure) = Some((operation, error));
        self
    }

    pub fn log(&self) -> WorkingCopyLog {
        self.log.clone()
    }

    fn record(&self, operation: &'static str, entry: String) -> Result<(), WorkingCopyError> {
        let mut failure = lock(&self.failure);
        if failure.as_ref().is_some_and(|(failing, _)| *failing == operation) {
            if let Some((_, error)) = failure.take() {
                return Err(error);
            }
        }
        self.log.push(entry);
        Ok(())
    }
}

#[async_trait]
impl WorkingCopy for RecordingWorkingCopy {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn changed_paths(&self) -> Result<Vec<String>, WorkingCopyError> {
        self.record("status", "status".to_string())?;
        Ok(self.changes.clone())
    }

    async fn sync_branch(&self, remote: &str, branch: &str) -> Result<(), WorkingCopyError> {
        self.record("sync", format!("sync {remote} {branch}"))
    }

    async fn stage(&self, paths: &[PathBuf]) -> Result<(), WorkingCopyError> {
        let paths = paths.iter().map(|path| path.display().to_string()).collect::<Vec<_>>();
        self.record("stage", format!("stage {}", paths.join(" ")))
    }

    async fn commit(&self, message: &str) -> Result<(), WorkingCopyError> {
        self.record("commit", format!("commit {message}"))
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<(), WorkingCopyError> {
        self.record("push", format!("push {remote} {branch}"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PullRequestCall {
    Create(NewPullRequest),
    Close { number: u64, comment: String },
    Comment { number: u64, body: String },
}

/// Pull-request API answering from queued results. With nothing queued,
/// creates succeed with sequential numbers and close/comment succeed.
#[derive(Default)]
pub struct ScriptedPullRequests {
    creates: Mutex<VecDeque<Result<PullRequest, PullRequestError>>>,
    closes: Mutex<VecDeque<Result<(), PullRequestError>>>,
    comments: Mutex<VecDeque<Result<(), PullRequestError>>>,
    calls: Mutex<Vec<PullRequestCall>>,
}

impl ScriptedPullRequests {
    pub fn push_create(&self, result: Result<PullRequest, PullRequestError>) {
        lock(&self.creates).push_back(result);
    }

    pub fn push_close(&self, result: Result<(), PullRequestError>) {
        lock(&self.closes).push_back(result);
    }

    pub fn push_comment(&self, result: Result<(), PullRequestError>) {
        lock(&self.comments).push_back(result);
    }

    pub fn calls(&self) -> Vec<PullRequestCall> {
        lock(&self.calls).clone()
    }

    fn created_so_far(&self) -> u64 {
        let calls = lock(&self.calls);
        calls.iter().filter(|call| matches!(call, PullRequestCall::Create(_))).count() as u64
    }
}

#[async_trait]
impl PullRequestApi for ScriptedPullRequests {
    async fn create_pull_request(
        &self,
        request: &NewPullRequest,
    ) -> Result<PullRequest, PullRequestError> {
        lock(&self.calls).push(PullRequestCall::Create(request.clone()));
        let scripted = lock(&self.creates).pop_front();
        scripted.unwrap_or_else(|| {
            let number = self.created_so_far();
            Ok(PullRequest {
                number,
                url: format!("https://github.test/pull/{number}"),
                title: request.title.clone(),
            })
        })
    }

    async fn close_pull_request(&self, number: u64, comment: &str) -> Result<(), PullRequestError> {
        lock(&self.calls)
            .push(PullRequestCall::Close { number, comment: comment.to_string() });
        lock(&self.closes).pop_front().unwrap_or(Ok(()))
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<(), PullRequestError> {
        lock(&self.calls).push(PullRequestCall::Comment { number, body: body.to_string() });
        lock(&self.comments).pop_front().unwrap_or(Ok(()))
    }
}
