use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use intake_core::config::GitHubConfig;

const USER_AGENT: &str = concat!("intake-assistant/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Error)]
pub enum PullRequestError {
    #[error("GitHub credentials are not configured: {0}")]
    MissingCredentials(&'static str),
    #[error("a pull request already exists: #{number} {url}")]
    AlreadyExists { number: u64, url: String, title: String },
    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("GitHub API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected GitHub API response: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(rename = "html_url")]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// Pull-request operations on the hosting service.
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    /// Opens a pull request. An open pull request for the same head and base
    /// is reported as [`PullRequestError::AlreadyExists`].
    async fn create_pull_request(
        &self,
        request: &NewPullRequest,
    ) -> Result<PullRequest, PullRequestError>;

    /// Comments on the pull request, then closes it.
    async fn close_pull_request(&self, number: u64, comment: &str) -> Result<(), PullRequestError>;

    async fn add_comment(&self, number: u64, body: &str) -> Result<(), PullRequestError>;
}

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    repo: Option<String>,
    token: Option<SecretString>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, PullRequestError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            repo: config.repo.clone().filter(|repo| !repo.trim().is_empty()),
            token: config.token.clone(),
        })
    }

    fn credentials(&self) -> Result<(&str, &str), PullRequestError> {
        let token = self
            .token
            .as_ref()
            .map(|token| token.expose_secret())
            .filter(|token| !token.trim().is_empty())
            .ok_or(PullRequestError::MissingCredentials("token"))?;
        let repo = self.repo.as_deref().ok_or(PullRequestError::MissingCredentials("repo"))?;
        Ok((token, repo))
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, PullRequestError> {
        let (token, repo) = self.credentials()?;
        let url = format!("{}/repos/{repo}{path}", self.base_url);
        debug!(%url, %method, "github request");
        Ok(self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {token}"))
            .header("X-GitHub-Api-Version", API_VERSION))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, PullRequestError> {
        let response = request.send().await?;
        let status = response.status();
        let body_text = response.text().await?;

        if !status.is_success() {
            return Err(PullRequestError::Api {
                status: status.as_u16(),
                message: error_message(&body_text),
            });
        }

        if body_text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body_text).map_err(|error| PullRequestError::Decode(error.to_string()))
    }

    async fn find_open_pull_request(
        &self,
        head: &str,
        base: &str,
    ) -> Result<Option<PullRequest>, PullRequestError> {
        let head = self.qualified_head(head);
        let request = self
            .request(reqwest::Method::GET, "/pulls")?
            .query(&[("state", "open"), ("head", head.as_str()), ("base", base)]);
        let value = self.send(request).await?;
        let open: Vec<PullRequest> = serde_json::from_value(value)
            .map_err(|error| PullRequestError::Decode(error.to_string()))?;
        Ok(open.into_iter().next())
    }

    /// GitHub filters pull requests by `owner:branch`; bare branches belong to
    /// the target repository's owner.
    fn qualified_head(&self, head: &str) -> String {
        if head.contains(':') {
            return head.to_string();
        }
        match self.repo.as_deref().and_then(|repo| repo.split_once('/')) {
            Some((owner, _)) => format!("{owner}:{head}"),
            None => head.to_string(),
        }
    }
}

#[async_trait]
impl PullRequestApi for GitHubClient {
    async fn create_pull_request(
        &self,
        request: &NewPullRequest,
    ) -> Result<PullRequest, PullRequestError> {
        let builder = self.request(reqwest::Method::POST, "/pulls")?.json(request);
        match self.send(builder).await {
            Ok(value) => serde_json::from_value(value)
                .map_err(|error| PullRequestError::Decode(error.to_string())),
            Err(PullRequestError::Api { status: 422, message })
                if message.to_ascii_lowercase().contains("already exists") =>
            {
                match self.find_open_pull_request(&request.head, &request.base).await? {
                    Some(existing) => Err(PullRequestError::AlreadyExists {
                        number: existing.number,
                        url: existing.url,
                        title: existing.title,
                    }),
                    None => {
                        warn!(head = %request.head, "duplicate pull request reported but none is open");
                        Err(PullRequestError::Api { status: 422, message })
                    }
                }
            }
            Err(error) => Err(error),
        }
    }

    async fn close_pull_request(&self, number: u64, comment: &str) -> Result<(), PullRequestError> {
        self.add_comment(number, comment).await?;
        let request = self
            .request(reqwest::Method::PATCH, &format!("/pulls/{number}"))?
            .json(&json!({ "state": "closed" }));
        self.send(request).await?;
        Ok(())
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<(), PullRequestError> {
        let request = self
            .request(reqwest::Method::POST, &format!("/issues/{number}/comments"))?
            .json(&json!({ "body": body }));
        self.send(request).await?;
        Ok(())
    }
}

/// Top-level `message` plus any nested `errors[].message`, or the raw body.
fn error_message(body_text: &str) -> String {
    let Ok(body) = serde_json::from_str::<Value>(body_text) else {
        return body_text.to_string();
    };
    let mut parts = Vec::new();
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        parts.push(message.to_string());
    }
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        parts.extend(
            errors
                .iter()
                .filter_map(|error| error.get("message").and_then(Value::as_str))
                .map(ToString::to_string),
        );
    }
    if parts.is_empty() {
        body_text.to_string()
    } else {
        parts.join(": ")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::{patch, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use intake_core::config::GitHubConfig;

    use crate::github::{
        error_message, GitHubClient, NewPullRequest, PullRequestApi, PullRequestError,
    };

    #[derive(Clone, Default)]
    struct FakeGitHub {
        calls: Arc<Mutex<Vec<String>>>,
        duplicate: bool,
    }

    impl FakeGitHub {
        fn record(&self, call: String) {
            self.calls.lock().expect("calls lock").push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    async fn create_pull(
        State(fake): State<FakeGitHub>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        fake.record(format!("create {}", body["head"].as_str().unwrap_or_default()));
        if fake.duplicate {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "message": "Validation Failed",
                    "errors": [{ "message": "A pull request already exists for bot:dev." }]
                })),
            );
        }
        (
            StatusCode::CREATED,
            Json(json!({
                "number": 42,
                "html_url": "https://github.test/org/repo/pull/42",
                "title": body["title"],
            })),
        )
    }

    async fn list_pulls(
        State(fake): State<FakeGitHub>,
        Query(query): Query<Vec<(String, String)>>,
    ) -> Json<Value> {
        let head = query
            .iter()
            .find(|(key, _)| key == "head")
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        fake.record(format!("list {head}"));
        Json(json!([{
            "number": 7,
            "html_url": "https://github.test/org/repo/pull/7",
            "title": "Existing intake PR"
        }]))
    }

    async fn comment(
        State(fake): State<FakeGitHub>,
        Path(number): Path<u64>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        fake.record(format!("comment {number} {}", body["body"].as_str().unwrap_or_default()));
        (StatusCode::CREATED, Json(json!({ "id": 1 })))
    }

    async fn update_pull(
        State(fake): State<FakeGitHub>,
        Path(number): Path<u64>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        fake.record(format!("update {number} {}", body["state"].as_str().unwrap_or_default()));
        Json(json!({ "number": number, "html_url": "https://github.test/x", "state": "closed" }))
    }

    async fn spawn_fake(fake: FakeGitHub) -> String {
        let app = Router::new()
            .route("/repos/org/repo/pulls", post(create_pull).get(list_pulls))
            .route("/repos/org/repo/pulls/{number}", patch(update_pull))
            .route("/repos/org/repo/issues/{number}/comments", post(comment))
            .with_state(fake);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn config(api_base_url: String) -> GitHubConfig {
        GitHubConfig {
            token: Some("ghp-test".to_string().into()),
            repo: Some("org/repo".to_string()),
            fork_owner: Some("bot".to_string()),
            api_base_url,
            base_branch: "dev".to_string(),
            timeout_secs: 5,
        }
    }

    fn new_pull_request() -> NewPullRequest {
        NewPullRequest {
            title: "Add sales analytics resources".to_string(),
            body: "## Resources".to_string(),
            head: "bot:dev".to_string(),
            base: "dev".to_string(),
        }
    }

    #[tokio::test]
    async fn create_returns_number_and_url() {
        let fake = FakeGitHub::default();
        let client = GitHubClient::new(&config(spawn_fake(fake.clone()).await)).expect("client");

        let created = client.create_pull_request(&new_pull_request()).await.expect("created");

        assert_eq!(created.number, 42);
        assert_eq!(created.url, "https://github.test/org/repo/pull/42");
        assert_eq!(fake.calls(), vec!["create bot:dev"]);
    }

    #[tokio::test]
    async fn duplicate_create_looks_up_the_open_pull_request() {
        let fake = FakeGitHub { duplicate: true, ..FakeGitHub::default() };
        let client = GitHubClient::new(&config(spawn_fake(fake.clone()).await)).expect("client");

        let error = client.create_pull_request(&new_pull_request()).await.expect_err("conflict");

        match error {
            PullRequestError::AlreadyExists { number, url, title } => {
                assert_eq!(number, 7);
                assert_eq!(url, "https://github.test/org/repo/pull/7");
                assert_eq!(title, "Existing intake PR");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(fake.calls(), vec!["create bot:dev", "list bot:dev"]);
    }

    #[tokio::test]
    async fn close_comments_then_closes() {
        let fake = FakeGitHub::default();
        let client = GitHubClient::new(&config(spawn_fake(fake.clone()).await)).expect("client");

        client.close_pull_request(7, "closing").await.expect("closed");

        assert_eq!(fake.calls(), vec!["comment 7 closing", "update 7 closed"]);
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let mut settings = config("http://127.0.0.1:9".to_string());
        settings.token = None;
        let client = GitHubClient::new(&settings).expect("client");

        let error = client.add_comment(1, "hello").await.expect_err("no token");

        assert!(matches!(error, PullRequestError::MissingCredentials("token")));
    }

    #[test]
    fn bare_head_is_qualified_with_repository_owner() {
        let mut settings = config("https://api.github.test".to_string());
        settings.fork_owner = None;
        let client = GitHubClient::new(&settings).expect("client");

        assert_eq!(client.qualified_head("dev"), "org:dev");
        assert_eq!(client.qualified_head("bot:dev"), "bot:dev");
    }

    #[test]
    fn error_message_joins_nested_messages() {
        let body = r#"{"message":"Validation Failed","errors":[{"message":"A pull request already exists for bot:dev."}]}"#;
        assert_eq!(
            error_message(body),
            "Validation Failed: A pull request already exists for bot:dev."
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
