//! Ollama native chat provider (`POST {host}/api/chat`).
//!
//! Ollama delivers tool-call arguments as JSON objects and expects them back
//! the same way. The whole reply body is handed to the caller as `raw`.

use async_trait::async_trait;
use serde::Serialize;
use sitewright_core::error::ProviderError;
use sitewright_core::message::{Message, Role};
use sitewright_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use tracing::{debug, trace, warn};

use crate::{http_client, status_error, transport_error};

const REQUEST_TIMEOUT_SECS: u64 = 600;

pub struct OllamaProvider {
    host: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(host: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            host: host.into().trim_end_matches('/').to_string(),
            client: http_client(REQUEST_TIMEOUT_SECS)?,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: role_str(&m.role),
                content: &m.content,
                name: m.name.as_deref(),
                tool_call_id: m.tool_call_id.as_deref(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|tc| ApiToolCall {
                        id: &tc.id,
                        function: ApiFunction {
                            name: &tc.name,
                            arguments: &tc.arguments,
                        },
                    })
                    .collect(),
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": false,
            "options": { "temperature": request.temperature },
        });
        if !request.tools.is_empty() {
            body["tools"] = request.tools.iter().map(|t| t.to_function_schema()).collect();
        }
        if let Some(max_tokens) = request.max_tokens {
            body["options"]["num_predict"] = serde_json::json!(max_tokens);
        }
        body
    }
}

pub(crate) fn role_str(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.host);
        let body = Self::build_body(&request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat request to Ollama"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(status_error(status, error_body));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| {
                ProviderError::MalformedResponse(format!("Failed to parse response: {e}"))
            })?;
        trace!(body = %raw, "Ollama reply");

        let usage = match (raw["prompt_eval_count"].as_u64(), raw["eval_count"].as_u64()) {
            (Some(prompt), Some(completion)) => Some(Usage {
                prompt_tokens: prompt as u32,
                completion_tokens: completion as u32,
                total_tokens: (prompt + completion) as u32,
            }),
            _ => None,
        };
        let model = raw["model"].as_str().unwrap_or(&request.model).to_string();

        Ok(ProviderResponse { raw, usage, model })
    }
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiToolCall<'a> {
    id: &'a str,
    function: ApiFunction<'a>,
}

#[derive(Debug, Serialize)]
struct ApiFunction<'a> {
    name: &'a str,
    arguments: &'a serde_json::Value,
}
