use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt};

use thiserror::Error;
use url::Url;

/// Environment variable holding the application identifier (optional upstream).
pub const ENV_APP_ID: &str = "TFL_APP_ID";
/// Environment variable holding the application key (required).
pub const ENV_APP_KEY: &str = "TFL_APP_KEY";
/// Disruption listing endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.tfl.gov.uk/Road/all/Disruption";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is not present")]
    MissingEnvVar(String),

    #[error("Environment variable {name} is not valid unicode")]
    InvalidEnvVar { name: String },

    #[error("Invalid endpoint URL {url}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// The pre-issued credential pair presented on every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: Option<String>,
    pub app_key: String,
}

impl Credentials {
    /// Fails with [`ConfigError::MissingEnvVar`] when the key is blank.
    pub fn new(app_id: Option<String>, app_key: impl Into<String>) -> Result<Self, ConfigError> {
        let app_key = app_key.into().trim().to_string();
        if app_key.is_empty() {
            return Err(ConfigError::MissingEnvVar(ENV_APP_KEY.to_string()));
        }
        let app_id = app_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        Ok(Self { app_id, app_key })
    }

    /// Reads `TFL_APP_ID` / `TFL_APP_KEY` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_key = read_var(ENV_APP_KEY)?
            .ok_or_else(|| ConfigError::MissingEnvVar(ENV_APP_KEY.to_string()))?;
        let app_id = read_var(ENV_APP_ID)?;
        Self::new(app_id, app_key)
    }
}

// The key never reaches logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_key", &"<redacted>")
            .finish()
    }
}

fn read_var(name: &str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidEnvVar {
            name: name.to_string(),
        }),
    }
}

/// Everything a pipeline run needs, passed explicitly into each component.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub credentials: Credentials,
    pub endpoint: Url,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Attempt ceiling for ordinary failures; also bounds rate-limited retries.
    pub max_retries: u32,
    /// Fixed wait after an HTTP 429.
    pub rate_limit_cooldown: Duration,
    /// Directory holding the latest snapshots and the `data/` archive root.
    pub work_dir: PathBuf,
    /// Extra file names (rendered artifacts) copied into each archive entry when present.
    pub archive_artifacts: Vec<String>,
}

impl PipelineConfig {
    pub fn new(credentials: Credentials, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            credentials,
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("DEFAULT_ENDPOINT is an absolute URL"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            work_dir: work_dir.into(),
            archive_artifacts: Vec::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ConfigError> {
        self.endpoint = Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            url: endpoint.to_string(),
            source,
        })?;
        Ok(self)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_rate_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.rate_limit_cooldown = cooldown;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_archive_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.archive_artifacts = artifacts;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PipelineConfig
    Endpoint: {},
    App id: {},
    Request timeout: {}s,
    Max retries: {},
    Rate limit cooldown: {}s,
    Work dir: {},
    Archive artifacts: {:?}
",
            self.endpoint,
            self.credentials.app_id.as_deref().unwrap_or("<none>"),
            self.request_timeout.as_secs(),
            self.max_retries,
            self.rate_limit_cooldown.as_secs(),
            self.work_dir.display(),
            self.archive_artifacts
        )
    }
}
