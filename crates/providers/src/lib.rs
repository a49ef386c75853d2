//! Model service clients for sitewright.
//!
//! All providers implement the `sitewright_core::Provider` trait and return
//! the reply body unparsed; [`build_from_config`] picks one from settings.

pub mod ollama;
pub mod openai_compat;
pub mod router;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;

use sitewright_core::error::ProviderError;

/// Map a non-success HTTP status to a provider error.
pub(crate) fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        404 => ProviderError::ModelNotFound(body),
        408 | 504 => ProviderError::Timeout(body),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(status_error(401, String::new()), ProviderError::AuthenticationFailed(_)));
        assert!(matches!(
            status_error(404, "model 'x' not found".into()),
            ProviderError::ModelNotFound(_)
        ));
        assert!(matches!(
            status_error(500, "boom".into()),
            ProviderError::ApiError { status_code: 500, .. }
        ));
    }
}
