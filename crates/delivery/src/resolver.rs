use std::sync::Arc;

use tracing::{info, warn};

use intake_core::domain::session::{PrConflict, ResourceBatch, ResourceCounts};
use intake_core::intake::ConflictChoice;

use crate::github::PullRequestError;
use crate::orchestrator::{DeliveryOutcome, PrOrchestrator};

pub const CLOSE_COMMENT: &str = "🔒 Closing this PR to create a new one.\n\n\
                                 A fresh PR will be created with the updated resources.";

#[derive(Debug)]
pub enum Resolution {
    /// Resources are on the existing pull request's branch; the comment is best effort.
    Appended { conflict: PrConflict, comment_posted: bool },
    Replaced { closed: u64, url: String, number: u64, counts: ResourceCounts },
    CloseFailed { number: u64, error: PullRequestError },
    /// The old pull request is closed but no new one could be opened.
    ReplacementFailed { closed: u64, reason: String },
}

pub struct ConflictResolver {
    orchestrator: Arc<PrOrchestrator>,
}

impl ConflictResolver {
    pub fn new(orchestrator: Arc<PrOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn resolve(
        &self,
        choice: ConflictChoice,
        conflict: &PrConflict,
        resources: &ResourceBatch,
        pending_title: &str,
    ) -> Resolution {
        match choice {
            ConflictChoice::AppendToExisting => self.append(conflict).await,
            ConflictChoice::ReplaceExisting => self.replace(conflict, resources, pending_title).await,
        }
    }

    async fn append(&self, conflict: &PrConflict) -> Resolution {
        let comment = append_comment(conflict);
        let comment_posted =
            match self.orchestrator.pull_requests().add_comment(conflict.pr_number, &comment).await {
                Ok(()) => true,
                Err(error) => {
                    warn!(
                        event_name = "conflict.append.comment_failed",
                        pr_number = conflict.pr_number,
                        error = %error,
                        "could not comment on existing pull request"
                    );
                    false
                }
            };
        info!(event_name = "conflict.appended", pr_number = conflict.pr_number, comment_posted);
        Resolution::Appended { conflict: conflict.clone(), comment_posted }
    }

    async fn replace(
        &self,
        conflict: &PrConflict,
        resources: &ResourceBatch,
        pending_title: &str,
    ) -> Resolution {
        let closed = conflict.pr_number;
        if let Err(error) =
            self.orchestrator.pull_requests().close_pull_request(closed, CLOSE_COMMENT).await
        {
            warn!(event_name = "conflict.replace.close_failed", pr_number = closed, error = %error);
            return Resolution::CloseFailed { number: closed, error };
        }
        info!(event_name = "conflict.replace.closed", pr_number = closed);

        match self.orchestrator.submit(resources, pending_title).await {
            DeliveryOutcome::Success { url, number } => {
                Resolution::Replaced { closed, url, number, counts: resources.counts() }
            }
            DeliveryOutcome::PrExists(still_open) => Resolution::ReplacementFailed {
                closed,
                reason: format!(
                    "a pull request is still open for this branch: #{} {}",
                    still_open.pr_number, still_open.pr_url
                ),
            },
            DeliveryOutcome::Failed(error) => {
                Resolution::ReplacementFailed { closed, reason: error.to_string() }
            }
        }
    }
}

pub fn append_comment(conflict: &PrConflict) -> String {
    format!(
        "## 🔄 New Resources Added\n\n\
         Additional resources have been added via MIW Data Platform Assistant:\n\n\
         - **{} Glue Database(s)**\n\
         - **{} S3 Bucket(s)**\n\
         - **{} IAM Role(s)**\n\n\
         Please review the latest commits.",
        conflict.glue_count, conflict.s3_count, conflict.iam_count
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use crate::github::PullRequestApi;

    use intake_core::domain::resource::{ResourceRecord, ResourceType};
    use intake_core::domain::session::{PrConflict, ResourceBatch, ResourceCounts};
    use intake_core::intake::ConflictChoice;
    use tempfile::TempDir;

    use crate::fixtures::{PullRequestCall, RecordingWorkingCopy, ScriptedPullRequests};
    use crate::github::PullRequestError;
    use crate::orchestrator::{DeliveryOutcome, DeliverySettings, PrOrchestrator};
    use crate::resolver::{ConflictResolver, Resolution, CLOSE_COMMENT};
    use crate::workspace::testing::{commit_count, git_available, remote_with_clone};
    use crate::workspace::GitWorkingCopy;

    fn settings() -> DeliverySettings {
        DeliverySettings {
            output_dir: "intake_configs".to_string(),
            remote: "origin".to_string(),
            branch: "dev".to_string(),
            base_branch: "dev".to_string(),
            head: "bot:dev".to_string(),
        }
    }

    fn resolver(dir: &TempDir, pull_requests: Arc<ScriptedPullRequests>) -> ConflictResolver {
        ConflictResolver::new(Arc::new(PrOrchestrator::new(
            Box::new(RecordingWorkingCopy::new(dir.path())),
            pull_requests,
            settings(),
        )))
    }

    fn conflict() -> PrConflict {
        PrConflict::new(
            7,
            "https://github.test/pull/7".to_string(),
            "Existing".to_string(),
            ResourceCounts { glue_dbs: 0, s3_buckets: 1, iam_roles: 0 },
        )
    }

    fn batch() -> ResourceBatch {
        let mut batch = ResourceBatch::default();
        batch.push(ResourceRecord {
            resource_type: ResourceType::S3Bucket,
            fields: [("bucket_name", "landing")].into_iter().collect(),
        });
        batch
    }

    #[tokio::test]
    async fn append_posts_one_comment_and_never_creates() {
        let dir = TempDir::new().expect("tempdir");
        let pull_requests = Arc::new(ScriptedPullRequests::default());

        let resolution = resolver(&dir, Arc::clone(&pull_requests))
            .resolve(ConflictChoice::AppendToExisting, &conflict(), &batch(), "Add landing bucket")
            .await;

        assert!(matches!(resolution, Resolution::Appended { comment_posted: true, .. }));
        let calls = pull_requests.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            PullRequestCall::Comment { number: 7, body } if body.contains("**1 S3 Bucket(s)**")
        ));
    }

    #[tokio::test]
    async fn append_comment_failure_still_counts_as_delivered() {
        let dir = TempDir::new().expect("tempdir");
        let pull_requests = Arc::new(ScriptedPullRequests::default());
        pull_requests.push_comment(Err(PullRequestError::Api {
            status: 403,
            message: "Resource not accessible".to_string(),
        }));

        let resolution = resolver(&dir, pull_requests)
            .resolve(ConflictChoice::AppendToExisting, &conflict(), &batch(), "Add landing bucket")
            .await;

        assert!(matches!(resolution, Resolution::Appended { comment_posted: false, .. }));
    }

    #[tokio::test]
    async fn replace_closes_then_resubmits_pending_title() {
        let dir = TempDir::new().expect("tempdir");
        let pull_requests = Arc::new(ScriptedPullRequests::default());

        let resolution = resolver(&dir, Arc::clone(&pull_requests))
            .resolve(ConflictChoice::ReplaceExisting, &conflict(), &batch(), "Add landing bucket")
            .await;

        match resolution {
            Resolution::Replaced { closed, number, counts, .. } => {
                assert_eq!(closed, 7);
                assert_eq!(number, 1);
                assert_eq!(counts.s3_buckets, 1);
            }
            other => panic!("expected replacement, got {other:?}"),
        }
        let calls = pull_requests.calls();
        assert_eq!(
            calls[0],
            PullRequestCall::Close { number: 7, comment: CLOSE_COMMENT.to_string() }
        );
        assert!(matches!(&calls[1], PullRequestCall::Create(request) if request.title == "Add landing bucket"));
    }

    #[tokio::test]
    async fn close_failure_skips_resubmission() {
        let dir = TempDir::new().expect("tempdir");
        let pull_requests = Arc::new(ScriptedPullRequests::default());
        pull_requests.push_close(Err(PullRequestError::Api {
            status: 404,
            message: "Not Found".to_string(),
        }));

        let resolution = resolver(&dir, Arc::clone(&pull_requests))
            .resolve(ConflictChoice::ReplaceExisting, &conflict(), &batch(), "Add landing bucket")
            .await;

        assert!(matches!(resolution, Resolution::CloseFailed { number: 7, .. }));
        assert_eq!(pull_requests.calls().len(), 1);
    }

    #[tokio::test]
    async fn second_conflict_after_close_is_a_replacement_failure() {
        let dir = TempDir::new().expect("tempdir");
        let pull_requests = Arc::new(ScriptedPullRequests::default());
        pull_requests.push_create(Err(PullRequestError::AlreadyExists {
            number: 8,
            url: "https://github.test/pull/8".to_string(),
            title: "Another".to_string(),
        }));

        let resolution = resolver(&dir, pull_requests)
            .resolve(ConflictChoice::ReplaceExisting, &conflict(), &batch(), "Add landing bucket")
            .await;

        match resolution {
            Resolution::ReplacementFailed { closed, reason } => {
                assert_eq!(closed, 7);
                assert!(reason.contains("#8"));
            }
            other => panic!("expected replacement failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn replace_against_real_git_reopens_with_already_pushed_resources() {
        if !git_available() {
            return;
        }
        let dir = remote_with_clone();
        let work = dir.path().join("work");
        let pull_requests = Arc::new(ScriptedPullRequests::default());
        pull_requests.push_create(Err(PullRequestError::AlreadyExists {
            number: 7,
            url: "https://github.test/pull/7".to_string(),
            title: "Existing".to_string(),
        }));
        let orchestrator = Arc::new(PrOrchestrator::new(
            Box::new(GitWorkingCopy::new(&work)),
            Arc::clone(&pull_requests) as Arc<dyn PullRequestApi>,
            settings(),
        ));

        let conflict = match orchestrator.submit(&batch(), "Add landing bucket").await {
            DeliveryOutcome::PrExists(conflict) => conflict,
            other => panic!("expected conflict, got {other:?}"),
        };
        let resolution = ConflictResolver::new(Arc::clone(&orchestrator))
            .resolve(ConflictChoice::ReplaceExisting, &conflict, &batch(), "Add landing bucket")
            .await;

        match resolution {
            Resolution::Replaced { closed, number, .. } => {
                assert_eq!(closed, 7);
                assert_eq!(number, 2);
            }
            other => panic!("expected replacement, got {other:?}"),
        }
        assert_eq!(commit_count(&work), 2);
        assert!(work.join("intake_configs/s3_buckets/landing.yaml").exists());
    }
}
