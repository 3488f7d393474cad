//! Pipeline configuration.
//!
//! Loaded once at process start from an optional YAML file, falling back to
//! the built-in deployment defaults. Environment variables then override:
//!
//! - `BOARDROOM_<PROVIDER>_MODEL`: model of one provider (`meta-llama` reads
//!   `BOARDROOM_META_LLAMA_MODEL`)
//! - `BOARDROOM_STAGE_<NAME>_ADDR`: `host:port` of one stage agent
//! - `BOARDROOM_COORDINATOR_ADDR`: coordinator listen address
//!
//! API keys are never part of the file; each provider names the environment
//! variable holding its key.
//!
//! ## Example
//!
//! ```yaml
//! providers:
//!   - id: cerebras
//!     kind: openai_chat
//!     endpoint: https://api.cerebras.ai/v1
//!     model: llama-3.3-70b
//!     api_key_env: CEREBRAS_API_KEY
//!     timeout: 90s
//! stages:
//!   - name: concept
//!     address: 127.0.0.1:8001
//!     path: /develop-concept
//!     timeout: 2m
//!     strict: true
//! cache:
//!   max_entries: 1000
//!   ttl: 1h
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use boardroom_core::StageKind;

use crate::coordinator::StageEndpoint;
use crate::providers::{LlmProvider, ProviderCause, ProviderConfig, ProviderError, ProviderKind, ProviderRegistry};

/// Serde helper for human-readable durations (`"90s"`, `"2m"`).
pub mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

/// Errors from loading or applying configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no provider has a usable credential; set at least one of: {0}")]
    NoProviders(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("stage '{0}' is configured more than once")]
    DuplicateStage(String),

    #[error("stage '{0}' is not configured")]
    MissingStage(String),

    #[error("invalid address '{address}' for {owner}")]
    InvalidAddress { owner: String, address: String },

    #[error("pipeline has no stages")]
    NoStages,

    #[error(
        "stage '{stage}' times out after {}s but the provider chain may take {}s; \
         lower provider timeouts or raise the stage timeout",
        .stage_timeout.as_secs(),
        .chain_timeout.as_secs()
    )]
    TimeoutBudget {
        stage: String,
        stage_timeout: Duration,
        chain_timeout: Duration,
    },

    #[error("could not build HTTP client: {0}")]
    Http(String),
}

/// One stage agent as seen by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,

    /// `host:port` the stage agent listens on
    pub address: String,

    /// POST path of the stage operation
    pub path: String,

    /// Bound on one coordinator call, including the stage's own fallbacks
    #[serde(with = "duration_str", default = "default_stage_timeout")]
    pub timeout: Duration,

    /// Abort the run when this stage answers with fallback data
    #[serde(default)]
    pub strict: bool,

    /// Upstream stages whose output this stage receives; all when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
}

fn default_stage_timeout() -> Duration {
    Duration::from_secs(120)
}

impl StageConfig {
    /// Default entry for one of the built-in stages.
    pub fn for_stage(kind: StageKind) -> Self {
        Self {
            name: kind.name().to_string(),
            address: format!("127.0.0.1:{}", kind.default_port()),
            path: kind.path().to_string(),
            timeout: kind.default_timeout(),
            strict: false,
            inputs: Some(kind.inputs().iter().map(|k| k.name().to_string()).collect()),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr(&self.address, &format!("stage '{}'", self.name))
    }

    pub fn url(&self) -> String {
        format!("http://{}/{}", self.address, self.path.trim_start_matches('/'))
    }

    pub fn endpoint(&self) -> StageEndpoint {
        StageEndpoint {
            name: self.name.clone(),
            url: self.url(),
            timeout: self.timeout,
            strict: self.strict,
            inputs: self.inputs.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub listen: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8008".to_string(),
        }
    }
}

impl CoordinatorConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr(&self.listen, "coordinator")
    }
}

/// Completion cache settings. Absent means no cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: u64,

    #[serde(with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Complete configuration of providers, stages and the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fallback chain, in priority order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Stages, in execution order
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            stages: default_stages(),
            coordinator: CoordinatorConfig::default(),
            cache: None,
        }
    }
}

/// Cerebras first, then Meta Llama on Hugging Face, then ASI:One.
///
/// The timeouts sum to less than the shortest stage timeout, so a stage
/// whose whole chain stalls still answers with its fallback in time.
fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(
            "cerebras",
            ProviderKind::OpenaiChat,
            "https://api.cerebras.ai/v1",
            "llama-3.3-70b",
            "CEREBRAS_API_KEY",
        )
        .with_timeout(Duration::from_secs(25)),
        ProviderConfig::new(
            "meta-llama",
            ProviderKind::Huggingface,
            "https://api-inference.huggingface.co",
            "meta-llama/Llama-3.1-8B-Instruct",
            "HUGGINGFACE_API_KEY",
        )
        .with_timeout(Duration::from_secs(25)),
        ProviderConfig::new(
            "asi-one",
            ProviderKind::OpenaiChat,
            "https://api.asi1.ai/v1",
            "asi1-mini",
            "ASI_ONE_API_KEY",
        )
        .with_timeout(Duration::from_secs(30)),
    ]
}

fn default_stages() -> Vec<StageConfig> {
    StageKind::ALL.iter().map(|k| StageConfig::for_stage(*k)).collect()
}

fn parse_addr(address: &str, owner: &str) -> Result<SocketAddr, ConfigError> {
    address.parse().map_err(|_| ConfigError::InvalidAddress {
        owner: owner.to_string(),
        address: address.to_string(),
    })
}

/// `meta-llama` -> `META_LLAMA`
fn env_key(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

impl PipelineConfig {
    /// Load from `path` (or defaults) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply `BOARDROOM_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: String| lookup(&key).filter(|v| !v.trim().is_empty());

        for provider in &mut self.providers {
            if let Some(model) = get(format!("BOARDROOM_{}_MODEL", env_key(&provider.id))) {
                tracing::debug!(provider = %provider.id, model = %model, "Model overridden from environment");
                provider.model = model;
            }
        }
        for stage in &mut self.stages {
            if let Some(address) = get(format!("BOARDROOM_STAGE_{}_ADDR", env_key(&stage.name))) {
                tracing::debug!(stage = %stage.name, address = %address, "Address overridden from environment");
                stage.address = address;
            }
        }
        if let Some(listen) = get("BOARDROOM_COORDINATOR_ADDR".to_string()) {
            self.coordinator.listen = listen;
        }
    }

    /// Structural checks that need no network or credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        let mut seen = std::collections::BTreeSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name.as_str()) {
                return Err(ConfigError::DuplicateStage(stage.name.clone()));
            }
            stage.socket_addr()?;
        }
        self.coordinator.socket_addr()?;
        self.check_timeout_budget()
    }

    /// Worst case of one chain completion: every provider runs to its timeout.
    pub fn chain_timeout(&self) -> Duration {
        self.providers.iter().map(|p| p.timeout).sum()
    }

    /// Every stage must outlast its provider chain, or the coordinator gives
    /// up on the stage before the stage can fall back.
    fn check_timeout_budget(&self) -> Result<(), ConfigError> {
        let chain_timeout = self.chain_timeout();
        match self.stages.iter().find(|s| s.timeout <= chain_timeout) {
            Some(stage) => Err(ConfigError::TimeoutBudget {
                stage: stage.name.clone(),
                stage_timeout: stage.timeout,
                chain_timeout,
            }),
            None => Ok(()),
        }
    }

    pub fn stage(&self, name: &str) -> Result<&StageConfig, ConfigError> {
        self.stages
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::MissingStage(name.to_string()))
    }

    /// Coordinator endpoints, in execution order.
    pub fn endpoints(&self) -> Vec<StageEndpoint> {
        self.stages.iter().map(StageConfig::endpoint).collect()
    }

    /// Resolve the fallback chain, skipping providers without a credential.
    pub fn build_providers(
        &self,
        registry: &ProviderRegistry,
    ) -> Result<Vec<Arc<dyn LlmProvider>>, ConfigError> {
        let mut providers = Vec::with_capacity(self.providers.len());
        for config in &self.providers {
            match registry.create(config) {
                Ok(provider) => {
                    tracing::info!(provider = %config.id, kind = %config.kind, model = %config.model, "Provider ready");
                    providers.push(provider);
                }
                Err(e) if matches!(e.cause, ProviderCause::NotConfigured(_)) => {
                    tracing::warn!(provider = %config.id, error = %e, "Skipping provider");
                }
                Err(e) => return Err(e.into()),
            }
        }
        if providers.is_empty() {
            let keys: Vec<&str> = self.providers.iter().map(|p| p.api_key_env.as_str()).collect();
            return Err(ConfigError::NoProviders(keys.join(", ")));
        }
        Ok(providers)
    }
}
