pub mod artifacts;
pub mod fixtures;
pub mod github;
pub mod orchestrator;
pub mod resolver;
pub mod workspace;

pub use artifacts::{parse_artifact, render_artifact, write_artifacts, ArtifactError};
pub use github::{GitHubClient, NewPullRequest, PullRequest, PullRequestApi, PullRequestError};
pub use orchestrator::{DeliveryError, DeliveryOutcome, DeliverySettings, PrOrchestrator};
pub use resolver::{ConflictResolver, Resolution};
pub use workspace::{GitWorkingCopy, WorkingCopy, WorkingCopyError};
