//! Configuration types for city-directory
//!
//! Every collaborator receives its settings explicitly: the provider client is
//! built from a [`ProviderConfig`], the content store from a [`StorageConfig`]
//! and the orchestrator from a [`PipelineConfig`]. Nothing is held in
//! process-wide state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the provider API key
pub const API_KEY_ENV: &str = "PERPLEXITY_API_KEY";
/// Environment variable overriding the provider endpoint
pub const API_URL_ENV: &str = "PERPLEXITY_API_URL";
/// Environment variable overriding the provider model
pub const MODEL_ENV: &str = "PERPLEXITY_MODEL";

/// Main configuration
///
/// Groups the three sub-configs. Loadable from JSON with every field optional
/// except the provider API key, which is only required once a real provider
/// client is built.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Content store location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Provider endpoint, credential and sampling parameters
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Orchestrator behavior (pacing, idempotency, storage layout)
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| crate::error::file_context(path, e))?;
        let config: Config = serde_json::from_str(&raw)?;
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Validate every sub-config, including the provider credential
    pub fn validate(&self) -> Result<()> {
        self.provider.validate()?;
        self.pipeline.validate()
    }
}

/// Content store configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the filesystem-backed store (default: "./output")
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// Provider client configuration
///
/// Passed to [`PerplexityClient::new`](crate::provider::PerplexityClient::new).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Chat completions endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer credential (required to build a real client)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name (default: "sonar-reasoning-pro")
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (default: 0.2)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Nucleus sampling (default: 0.9)
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Presence penalty (default: 0.0)
    #[serde(default)]
    pub presence_penalty: f64,

    /// Frequency penalty (default: 1.0)
    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f64,

    /// Search recency window sent with every request (default: "year")
    #[serde(default = "default_search_recency")]
    pub search_recency_filter: String,

    /// Whole-request timeout (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Query type, used as the cache path component (default: "antique_appraiser")
    #[serde(default = "default_query_type")]
    pub query_type: String,

    /// Write each (query, result) pair to the content store (default: true)
    #[serde(default = "default_true")]
    pub cache_results: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            presence_penalty: 0.0,
            frequency_penalty: default_frequency_penalty(),
            search_recency_filter: default_search_recency(),
            timeout: default_request_timeout(),
            query_type: default_query_type(),
            cache_results: true,
        }
    }
}

impl ProviderConfig {
    /// Build a provider config from the environment
    ///
    /// Reads [`API_KEY_ENV`] and the optional [`API_URL_ENV`] / [`MODEL_ENV`]
    /// overrides; every other field keeps its default.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config(format!("{API_KEY_ENV} is not set"), "provider.api_key"))?;

        let mut config = Self {
            api_key: Some(api_key),
            ..Self::default()
        };
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api_url = url;
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            config.model = model;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that the endpoint parses and a credential is present
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_url)
            .map_err(|e| Error::config(format!("invalid API URL: {e}"), "provider.api_url"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(
                format!("unsupported URL scheme: {}", url.scheme()),
                "provider.api_url",
            ));
        }
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(Error::config("API key is required", "provider.api_key")),
        }
        if self.query_type.is_empty() || self.query_type.contains('/') {
            return Err(Error::config(
                "query type must be a single path segment",
                "provider.query_type",
            ));
        }
        Ok(())
    }
}

/// Orchestrator configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum wait between entities that consumed a provider call (default: 3 seconds)
    #[serde(default = "default_inter_call_delay", with = "duration_millis_serde")]
    pub inter_call_delay: Duration,

    /// Skip entities whose output already exists (default: true)
    #[serde(default = "default_true")]
    pub skip_existing: bool,

    /// Prefix of per-entity records: `{entity_prefix}/{slug}.json`
    #[serde(default = "default_entity_prefix")]
    pub entity_prefix: String,

    /// Prefix of region-grouped records: `{region_prefix}/{region}/{slug}.json`
    #[serde(default = "default_region_prefix")]
    pub region_prefix: String,

    /// Also write each new record under the region-grouped prefix (default: false)
    #[serde(default)]
    pub mirror_to_region: bool,

    /// Prefix under which run reports are written (default: "reports")
    #[serde(default = "default_report_prefix")]
    pub report_prefix: String,

    /// Write the small summary blob next to the full report (default: true)
    #[serde(default = "default_true")]
    pub write_summary: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_call_delay: default_inter_call_delay(),
            skip_existing: true,
            entity_prefix: default_entity_prefix(),
            region_prefix: default_region_prefix(),
            mirror_to_region: false,
            report_prefix: default_report_prefix(),
            write_summary: true,
        }
    }
}

impl PipelineConfig {
    /// Check that every storage prefix is a usable relative key
    pub fn validate(&self) -> Result<()> {
        for (key, prefix) in [
            ("pipeline.entity_prefix", &self.entity_prefix),
            ("pipeline.region_prefix", &self.region_prefix),
            ("pipeline.report_prefix", &self.report_prefix),
        ] {
            if prefix.is_empty() {
                return Err(Error::config("prefix must not be empty", key));
            }
            if prefix.starts_with('/') || prefix.ends_with('/') {
                return Err(Error::config(
                    "prefix must not start or end with '/'",
                    key,
                ));
            }
            if prefix.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
                return Err(Error::config(
                    "prefix must not contain empty, '.' or '..' segments",
                    key,
                ));
            }
        }
        Ok(())
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./output")
}

fn default_api_url() -> String {
    "https://api.perplexity.ai/chat/completions".to_string()
}

fn default_model() -> String {
    "sonar-reasoning-pro".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_top_p() -> f64 {
    0.9
}

fn default_frequency_penalty() -> f64 {
    1.0
}

fn default_search_recency() -> String {
    "year".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_query_type() -> String {
    "antique_appraiser".to_string()
}

fn default_true() -> bool {
    true
}

fn default_inter_call_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_entity_prefix() -> String {
    "antique-appraisers/cities".to_string()
}

fn default_region_prefix() -> String {
    "antique-appraisers-Global".to_string()
}

fn default_report_prefix() -> String {
    "reports".to_string()
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, for sub-second pacing)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
