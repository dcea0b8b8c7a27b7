use axum::{extract::State, routing::get, Json, Router};
use intake_core::config::AppConfig;
use serde::Serialize;

/// Credential presence only; values are never reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub llm: bool,
    pub github: bool,
    pub username: bool,
}

impl HealthResponse {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            status: "healthy",
            llm: config.llm.has_api_key(),
            github: config.github.has_token(),
            username: config.github.has_fork_owner(),
        }
    }
}

pub fn router(config: &AppConfig) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthResponse::from_config(config))
}

pub async fn health(State(report): State<HealthResponse>) -> Json<HealthResponse> {
    Json(report)
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, Json};
    use intake_core::config::AppConfig;

    use crate::health::{health, HealthResponse};

    #[tokio::test]
    async fn health_reports_missing_credentials_as_false() {
        let config = AppConfig::default();

        let Json(payload) = health(State(HealthResponse::from_config(&config))).await;

        assert_eq!(
            payload,
            HealthResponse { status: "healthy", llm: false, github: false, username: false }
        );
    }

    #[tokio::test]
    async fn health_reports_configured_credentials() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("gsk-test".to_string().into());
        config.github.token = Some("ghp-test".to_string().into());
        config.github.fork_owner = Some("bot".to_string());

        let Json(payload) = health(State(HealthResponse::from_config(&config))).await;

        assert!(payload.llm && payload.github && payload.username);
        assert_eq!(serde_json::to_value(payload).expect("json")["status"], "healthy");
    }
}
