use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "intake.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub github: GitHubConfig,
    pub repository: RepositoryConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GitHubConfig {
    pub token: Option<SecretString>,
    /// `owner/name` of the repository pull requests are opened against.
    pub repo: Option<String>,
    /// Account that pushes the branch; used as the `owner:` prefix of the PR head.
    pub fork_owner: Option<String>,
    pub api_base_url: String,
    pub base_branch: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RepositoryConfig {
    pub root: PathBuf,
    pub remote: String,
    pub branch: String,
    pub output_dir: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub github_api_base_url: Option<String>,
    pub repository_root: Option<PathBuf>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.groq.com/openai/v1".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
                temperature: 0.1,
                timeout_secs: 30,
            },
            github: GitHubConfig {
                token: None,
                repo: None,
                fork_owner: None,
                api_base_url: "https://api.github.com".to_string(),
                base_branch: "dev".to_string(),
                timeout_secs: 30,
            },
            repository: RepositoryConfig {
                root: PathBuf::from("."),
                remote: "origin".to_string(),
                branch: "dev".to_string(),
                output_dir: "intake_configs".to_string(),
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 8000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    pub fn has_api_key(&self) -> bool {
        has_secret(self.api_key.as_ref())
    }
}

impl GitHubConfig {
    pub fn has_token(&self) -> bool {
        has_secret(self.token.as_ref())
    }

    pub fn has_repo(&self) -> bool {
        self.repo.as_deref().is_some_and(|repo| !repo.trim().is_empty())
    }

    pub fn has_fork_owner(&self) -> bool {
        self.fork_owner.as_deref().is_some_and(|owner| !owner.trim().is_empty())
    }

    /// Head reference for pull requests opened from `branch`.
    pub fn pull_request_head(&self, branch: &str) -> String {
        match self.fork_owner.as_deref().map(str::trim).filter(|owner| !owner.is_empty()) {
            Some(owner) => format!("{owner}:{branch}"),
            None => branch.to_string(),
        }
    }
}

fn has_secret(secret: Option<&SecretString>) -> bool {
    secret.is_some_and(|value| !value.expose_secret().trim().is_empty())
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(github) = patch.github {
            if let Some(github_token_value) = github.token {
                self.github.token = Some(secret_value(github_token_value));
            }
            if let Some(repo) = github.repo {
                self.github.repo = Some(repo);
            }
            if let Some(fork_owner) = github.fork_owner {
                self.github.fork_owner = Some(fork_owner);
            }
            if let Some(api_base_url) = github.api_base_url {
                self.github.api_base_url = api_base_url;
            }
            if let Some(base_branch) = github.base_branch {
                self.github.base_branch = base_branch;
            }
            if let Some(timeout_secs) = github.timeout_secs {
                self.github.timeout_secs = timeout_secs;
            }
        }

        if let Some(repository) = patch.repository {
            if let Some(root) = repository.root {
                self.repository.root = root;
            }
            if let Some(remote) = repository.remote {
                self.repository.remote = remote;
            }
            if let Some(branch) = repository.branch {
                self.repository.branch = branch;
            }
            if let Some(output_dir) = repository.output_dir {
                self.repository.output_dir = output_dir;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("INTAKE_LLM_API_KEY").or_else(|| read_env("GROQ_API_KEY")) {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("INTAKE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("INTAKE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("INTAKE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("INTAKE_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("INTAKE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("INTAKE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) =
            read_env("INTAKE_GITHUB_TOKEN").or_else(|| read_env("GITHUB_TOKEN1"))
        {
            self.github.token = Some(secret_value(value));
        }
        if let Some(value) = read_env("INTAKE_GITHUB_REPO").or_else(|| read_env("REPO_NAME")) {
            self.github.repo = Some(value);
        }
        if let Some(value) =
            read_env("INTAKE_GITHUB_FORK_OWNER").or_else(|| read_env("GITHUB_USERNAME"))
        {
            self.github.fork_owner = Some(value);
        }
        if let Some(value) = read_env("INTAKE_GITHUB_API_BASE_URL") {
            self.github.api_base_url = value;
        }
        if let Some(value) = read_env("INTAKE_GITHUB_BASE_BRANCH") {
            self.github.base_branch = value;
        }
        if let Some(value) = read_env("INTAKE_GITHUB_TIMEOUT_SECS") {
            self.github.timeout_secs = parse_u64("INTAKE_GITHUB_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("INTAKE_REPOSITORY_ROOT") {
            self.repository.root = PathBuf::from(value);
        }
        if let Some(value) = read_env("INTAKE_REPOSITORY_REMOTE") {
            self.repository.remote = value;
        }
        if let Some(value) = read_env("INTAKE_REPOSITORY_BRANCH") {
            self.repository.branch = value;
        }
        if let Some(value) = read_env("INTAKE_REPOSITORY_OUTPUT_DIR") {
            self.repository.output_dir = value;
        }

        if let Some(value) = read_env("INTAKE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("INTAKE_SERVER_PORT") {
            self.server.port = parse_u16("INTAKE_SERVER_PORT", &value)?;
        }

        let log_level = read_env("INTAKE_LOGGING_LEVEL").or_else(|| read_env("INTAKE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("INTAKE_LOGGING_FORMAT").or_else(|| read_env("INTAKE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(github_api_base_url) = overrides.github_api_base_url {
            self.github.api_base_url = github_api_base_url;
        }
        if let Some(repository_root) = overrides.repository_root {
            self.repository.root = repository_root;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_github(&self.github)?;
        validate_repository(&self.repository)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    validate_http_url("llm.base_url", &llm.base_url)
}

fn validate_github(github: &GitHubConfig) -> Result<(), ConfigError> {
    if github.timeout_secs == 0 || github.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "github.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if let Some(repo) = github.repo.as_deref().filter(|repo| !repo.trim().is_empty()) {
        let well_formed = repo
            .split_once('/')
            .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
        if !well_formed {
            return Err(ConfigError::Validation(format!(
                "github.repo must look like `owner/name`, got `{repo}`"
            )));
        }
    }

    if github.base_branch.trim().is_empty() {
        return Err(ConfigError::Validation("github.base_branch must not be empty".to_string()));
    }

    validate_http_url("github.api_base_url", &github.api_base_url)
}

fn validate_repository(repository: &RepositoryConfig) -> Result<(), ConfigError> {
    if repository.branch.trim().is_empty() || repository.remote.trim().is_empty() {
        return Err(ConfigError::Validation(
            "repository.branch and repository.remote must not be empty".to_string(),
        ));
    }

    let output_dir = repository.output_dir.trim();
    if output_dir.is_empty()
        || output_dir.starts_with('/')
        || output_dir.split('/').any(|segment| segment == "..")
    {
        return Err(ConfigError::Validation(
            "repository.output_dir must be a relative path inside the repository".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{key} must start with http:// or https://")))
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    github: Option<GitHubPatch>,
    repository: Option<RepositoryPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GitHubPatch {
    token: Option<String>,
    repo: Option<String>,
    fork_owner: Option<String>,
    api_base_url: Option<String>,
    base_branch: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RepositoryPatch {
    root: Option<PathBuf>,
    remote: Option<String>,
    branch: Option<String>,
    output_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
