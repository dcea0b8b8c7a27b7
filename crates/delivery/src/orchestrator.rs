use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use intake_core::config::{GitHubConfig, RepositoryConfig};
use intake_core::domain::session::{PrConflict, ResourceBatch, ResourceCounts};

use crate::artifacts::{artifact_paths, write_artifacts, ArtifactError};
use crate::github::{NewPullRequest, PullRequestApi, PullRequestError};
use crate::workspace::{WorkingCopy, WorkingCopyError};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Repository has uncommitted changes: {}", .paths.join(", "))]
    RepositoryState { paths: Vec<String> },
    #[error("no resources to deliver")]
    EmptyBatch,
    #[error(transparent)]
    WorkingCopy(#[from] WorkingCopyError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    PullRequest(#[from] PullRequestError),
}

#[derive(Debug)]
pub enum DeliveryOutcome {
    Success { url: String, number: u64 },
    PrExists(PrConflict),
    Failed(DeliveryError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverySettings {
    pub output_dir: String,
    pub remote: String,
    pub branch: String,
    pub base_branch: String,
    /// `owner:branch` or bare branch used as the pull request head.
    pub head: String,
}

impl DeliverySettings {
    pub fn from_config(repository: &RepositoryConfig, github: &GitHubConfig) -> Self {
        Self {
            output_dir: repository.output_dir.trim_end_matches('/').to_string(),
            remote: repository.remote.clone(),
            branch: repository.branch.clone(),
            base_branch: github.base_branch.clone(),
            head: github.pull_request_head(&repository.branch),
        }
    }

    fn owns_path(&self, path: &str) -> bool {
        path == self.output_dir || path.starts_with(&format!("{}/", self.output_dir))
    }
}

/// Turns a batch of validated resources into a pushed commit and a pull request.
pub struct PrOrchestrator {
    working_copy: Mutex<Box<dyn WorkingCopy>>,
    pull_requests: Arc<dyn PullRequestApi>,
    settings: DeliverySettings,
}

impl PrOrchestrator {
    pub fn new(
        working_copy: Box<dyn WorkingCopy>,
        pull_requests: Arc<dyn PullRequestApi>,
        settings: DeliverySettings,
    ) -> Self {
        Self { working_copy: Mutex::new(working_copy), pull_requests, settings }
    }

    pub fn pull_requests(&self) -> &Arc<dyn PullRequestApi> {
        &self.pull_requests
    }

    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    /// Runs one submission. Submissions are serialized on the working copy and
    /// side effects already performed are not rolled back on failure.
    pub async fn submit(&self, resources: &ResourceBatch, title: &str) -> DeliveryOutcome {
        let counts = resources.counts();
        match self.deliver(resources, title, counts).await {
            Ok((url, number)) => {
                info!(
                    event_name = "delivery.pull_request.created",
                    pr_number = number,
                    %url,
                    "pull request opened"
                );
                DeliveryOutcome::Success { url, number }
            }
            Err(DeliveryError::PullRequest(PullRequestError::AlreadyExists {
                number,
                url,
                title,
            })) => {
                info!(
                    event_name = "delivery.pull_request.exists",
                    pr_number = number,
                    %url,
                    "pull request already open"
                );
                DeliveryOutcome::PrExists(PrConflict::new(number, url, title, counts))
            }
            Err(error) => {
                warn!(event_name = "delivery.failed", error = %error, "delivery failed");
                DeliveryOutcome::Failed(error)
            }
        }
    }

    async fn deliver(
        &self,
        resources: &ResourceBatch,
        title: &str,
        counts: ResourceCounts,
    ) -> Result<(String, u64), DeliveryError> {
        if resources.is_empty() {
            return Err(DeliveryError::EmptyBatch);
        }
        artifact_paths(&self.settings.output_dir, resources)?;

        let working_copy = self.working_copy.lock().await;

        let foreign = working_copy
            .changed_paths()
            .await?
            .into_iter()
            .filter(|path| !self.settings.owns_path(path))
            .collect::<Vec<_>>();
        if !foreign.is_empty() {
            return Err(DeliveryError::RepositoryState { paths: foreign });
        }

        working_copy.sync_branch(&self.settings.remote, &self.settings.branch).await?;

        let written =
            write_artifacts(working_copy.root(), &self.settings.output_dir, resources).await?;
        working_copy.stage(&written).await?;
        working_copy.commit(&commit_message(title, counts)).await?;
        working_copy.push(&self.settings.remote, &self.settings.branch).await?;
        info!(
            event_name = "delivery.branch.pushed",
            branch = %self.settings.branch,
            files = written.len(),
            "intake artifacts pushed"
        );
        drop(working_copy);

        let created = self
            .pull_requests
            .create_pull_request(&NewPullRequest {
                title: title.to_string(),
                body: pull_request_body(counts),
                head: self.settings.head.clone(),
                base: self.settings.base_branch.clone(),
            })
            .await?;
        Ok((created.url, created.number))
    }
}

/// Title, blank line, then one line per non-empty resource type.
pub fn commit_message(title: &str, counts: ResourceCounts) -> String {
    let added = [
        (counts.glue_dbs, "Glue Database(s)"),
        (counts.s3_buckets, "S3 Bucket(s)"),
        (counts.iam_roles, "IAM Role(s)"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("- Added {count} {label}"))
    .collect::<Vec<_>>();

    if added.is_empty() {
        title.to_string()
    } else {
        format!("{title}\n\n{}", added.join("\n"))
    }
}

pub fn pull_request_body(counts: ResourceCounts) -> String {
    format!(
        "## Resources\n\n- {} Glue DB(s)\n- {} S3 Bucket(s)\n- {} IAM Role(s)",
        counts.glue_dbs, counts.s3_buckets, counts.iam_roles
    )
}
