//! External text provider
//!
//! The orchestrator only needs one call: "produce unstructured text for this
//! entity". That call is the [`DataSource`] trait; [`PerplexityClient`] is the
//! production implementation speaking the provider's chat completions API.
//!
//! Clients never retry and never sleep. Pacing between calls is the
//! orchestrator's job.

mod perplexity;
mod prompt;

pub use perplexity::{PerplexityClient, cache_path_for};
pub use prompt::build_prompt;

use crate::error::FetchError;
use async_trait::async_trait;

/// Source of unstructured text for one entity
///
/// # Errors
///
/// Implementations map their failures onto [`FetchError`]:
/// - [`FetchError::Unauthorized`] - bad credential
/// - [`FetchError::RateLimited`] - provider-side throttling
/// - [`FetchError::Provider`] - any other provider-reported failure
/// - [`FetchError::Transport`] - network failure or timeout
/// - [`FetchError::EmptyResponse`] - the provider answered with no content
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch raw, non-empty text for `(name, region)`
    async fn fetch(&self, name: &str, region: &str) -> Result<String, FetchError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
