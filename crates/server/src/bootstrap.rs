use std::sync::Arc;

use intake_agent::{GroqClient, IntakeRuntime};
use intake_core::config::{AppConfig, ConfigError, LoadOptions};
use intake_delivery::{
    DeliverySettings, GitHubClient, GitWorkingCopy, PrOrchestrator, PullRequestError,
};
use intake_store::InMemorySessionStore;
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<IntakeRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("LLM client setup failed: {0:#}")]
    Oracle(#[source] anyhow::Error),
    #[error("GitHub client setup failed: {0}")]
    PullRequests(#[source] PullRequestError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        repository_root = %config.repository.root.display(),
        "starting application bootstrap"
    );

    if !config.llm.has_api_key() {
        warn!(event_name = "system.bootstrap.llm_key_missing", "LLM API key is not configured");
    }
    if !config.github.has_token() || !config.github.has_repo() {
        warn!(
            event_name = "system.bootstrap.github_incomplete",
            token = config.github.has_token(),
            repo = config.github.has_repo(),
            "GitHub credentials are incomplete; pull requests will fail"
        );
    }

    let oracle = GroqClient::new(&config.llm).map_err(BootstrapError::Oracle)?;
    let pull_requests =
        GitHubClient::new(&config.github).map_err(BootstrapError::PullRequests)?;
    let orchestrator = PrOrchestrator::new(
        Box::new(GitWorkingCopy::new(config.repository.root.clone())),
        Arc::new(pull_requests),
        DeliverySettings::from_config(&config.repository, &config.github),
    );

    let runtime = IntakeRuntime::new(
        Arc::new(InMemorySessionStore::default()),
        Arc::new(oracle),
        Arc::new(orchestrator),
    );
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        model = %config.llm.model,
        base_branch = %config.github.base_branch,
        "intake runtime initialized"
    );

    Ok(Application { config, runtime: Arc::new(runtime) })
}

#[cfg(test)]
mod tests {
    use intake_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_succeeds_without_credentials() {
        let dir = tempfile::TempDir::new().expect("tempdir");

        let app = bootstrap(LoadOptions {
            config_path: Some(dir.path().join("missing.toml")),
            overrides: ConfigOverrides {
                repository_root: Some(dir.path().to_path_buf()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should not require credentials");

        assert_eq!(app.config.repository.root, dir.path());
        let summary = app.runtime.session_summary(&Default::default()).await.expect("summary");
        assert_eq!(summary.resources.total(), 0);
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_overrides() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                log_level: Some("chatty".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("logging.level"));
    }
}
