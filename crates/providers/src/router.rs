//! Provider selection from configuration.

use std::sync::Arc;

use sitewright_config::AppConfig;
use sitewright_core::error::ProviderError;
use sitewright_core::provider::Provider;
use tracing::info;

use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider: Arc<dyn Provider> = match config.provider.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(&config.host)?),
        "openai" => Arc::new(OpenAiCompatProvider::new(
            "openai",
            openai_base_url(&config.host),
            config.api_key.clone().unwrap_or_default(),
        )?),
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown provider '{other}'"
            )));
        }
    };
    info!(
        provider = provider.name(),
        host = %config.host,
        model = %config.model,
        "Model provider ready"
    );
    Ok(provider)
}

/// OpenAI-compatible servers live under `/v1`; accept the host with or
/// without it.
fn openai_base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.ends_with("/v1") {
        host.to_string()
    } else {
        format!("{host}/v1")
    }
}
