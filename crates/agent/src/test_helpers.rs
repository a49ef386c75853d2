//! Shared test doubles for the agent loop.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};
use sitewright_core::error::{ProviderError, RetrievalError};
use sitewright_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use sitewright_core::retrieval::{Retriever, SearchResults, StyleSample, TemplateHit};

/// A provider that returns a sequence of scripted replies and records every
/// request it receives. Panics if called more times than it has replies.
pub struct ScriptedProvider {
    replies: Vec<Value>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Value>) -> Self {
        Self {
            replies,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        let model = request.model.clone();
        requests.push(request);

        let Some(raw) = self.replies.get(index).cloned() else {
            panic!(
                "ScriptedProvider: no more replies (call #{index}, have {})",
                self.replies.len()
            );
        };
        Ok(ProviderResponse {
            raw,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }
}

/// A provider whose every call fails at the transport level.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// An Ollama-shaped reply with plain text only.
pub fn text_reply(text: &str) -> Value {
    json!({"message": {"role": "assistant", "content": text}, "done": true})
}

/// An Ollama-shaped reply carrying structured tool calls.
pub fn tool_reply(calls: Vec<Value>) -> Value {
    json!({"message": {"role": "assistant", "content": "", "tool_calls": calls}, "done": true})
}

/// A retriever with canned results.
#[derive(Default)]
pub struct FixedRetriever {
    pub templates: Vec<TemplateHit>,
    pub styles: Vec<StyleSample>,
    pub chunks: SearchResults,
}

#[async_trait]
impl Retriever for FixedRetriever {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search_templates(
        &self,
        _query: &str,
        k: usize,
    ) -> Result<Vec<TemplateHit>, RetrievalError> {
        Ok(self.templates.iter().take(k).cloned().collect())
    }

    async fn fetch_style_samples(
        &self,
        _template: &str,
        limit: usize,
    ) -> Result<Vec<StyleSample>, RetrievalError> {
        Ok(self.styles.iter().take(limit).cloned().collect())
    }

    async fn search(
        &self,
        _query: &str,
        _k: usize,
        _include_metadata: bool,
    ) -> Result<SearchResults, RetrievalError> {
        Ok(self.chunks.clone())
    }
}

/// A retriever whose every query fails.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    fn name(&self) -> &str {
        "failing"
    }

    async fn search_templates(
        &self,
        _query: &str,
        _k: usize,
    ) -> Result<Vec<TemplateHit>, RetrievalError> {
        Err(RetrievalError::Unavailable("index offline".into()))
    }

    async fn fetch_style_samples(
        &self,
        _template: &str,
        _limit: usize,
    ) -> Result<Vec<StyleSample>, RetrievalError> {
        Err(RetrievalError::Unavailable("index offline".into()))
    }

    async fn search(
        &self,
        _query: &str,
        _k: usize,
        _include_metadata: bool,
    ) -> Result<SearchResults, RetrievalError> {
        Err(RetrievalError::QueryFailed("timeout".into()))
    }
}
