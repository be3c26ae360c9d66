//! Test configuration helpers for wiring clients and pipelines to mock servers

use city_directory::config::{PipelineConfig, ProviderConfig};
use std::time::Duration;

/// API key the mock provider expects
pub const TEST_API_KEY: &str = "test-key";

/// Provider config pointing at a mock server's chat completions endpoint
pub fn provider_config(server_uri: &str) -> ProviderConfig {
    ProviderConfig {
        api_url: format!("{server_uri}/chat/completions"),
        api_key: Some(TEST_API_KEY.to_string()),
        timeout: Duration::from_secs(5),
        ..ProviderConfig::default()
    }
}

/// Pipeline config without pacing, for tests that do not measure it
pub fn fast_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        inter_call_delay: Duration::ZERO,
        ..PipelineConfig::default()
    }
}

/// Whether live provider credentials are available (loads `.env` first)
pub fn has_live_credentials() -> bool {
    dotenvy::dotenv().ok();
    std::env::var(city_directory::config::API_KEY_ENV)
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}
