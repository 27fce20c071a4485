//! Backend client factory
//!
//! Resolves the API key and builds a [`GeminiProvider`]. A missing key is the
//! one hard configuration failure; it is reported before any request is made.

use crate::error::{self, Result};
use crate::provider::{GeminiProvider, ProviderConfig};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Pick the API key: an explicit non-empty key wins over the environment.
pub fn resolve_api_key(explicit: Option<&str>, env_value: Option<String>) -> Result<String> {
    if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    env_value
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| error::missing_api_key(API_KEY_ENV).with_operation("client::resolve_api_key"))
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Build a Gemini client from an optional explicit key, falling back to
/// `GOOGLE_API_KEY`.
pub fn get_client(api_key: Option<&str>) -> Result<GeminiProvider> {
    get_client_with_lookup(api_key, process_env)
}

/// Like [`get_client`], with `lookup` standing in for the process environment.
pub fn get_client_with_lookup(
    api_key: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<GeminiProvider> {
    let key = resolve_api_key(api_key, lookup(API_KEY_ENV))?;
    get_client_with_config_lookup(ProviderConfig::gemini(key), lookup)
}

/// Build a Gemini client from a full configuration. The key inside the
/// configuration may be absent, in which case the environment is consulted.
pub fn get_client_with_config(config: ProviderConfig) -> Result<GeminiProvider> {
    get_client_with_config_lookup(config, process_env)
}

pub fn get_client_with_config_lookup(
    mut config: ProviderConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<GeminiProvider> {
    let key = resolve_api_key(config.api_key.as_deref(), lookup(API_KEY_ENV))?;
    config.api_key = Some(key);

    let provider = GeminiProvider::new(config)
        .map_err(|e| error::provider_failed(e, "client::get_client"))?;
    tracing::debug!("backend client ready");
    Ok(provider)
}
