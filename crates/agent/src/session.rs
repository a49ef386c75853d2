//! Building sessions from configuration.
//!
//! The provider, tool registry, retriever, and system prompt are built once
//! and shared. Each call to [`SessionFactory::session`] hands out a
//! [`BuilderAgent`] with a fresh conversation of its own.

use std::sync::Arc;

use sitewright_config::AppConfig;
use sitewright_core::error::Error;
use sitewright_core::provider::Provider;
use sitewright_core::retrieval::Retriever;
use sitewright_core::tool::ToolRegistry;
use sitewright_retrieval::{NoopRetriever, TemplateIndex};
use sitewright_security::Sandbox;
use sitewright_tools::{SiteFs, site_registry};
use tracing::{info, warn};

use crate::grounding::GroundingSettings;
use crate::loop_runner::{AgentSettings, BuilderAgent};

/// Per-request adjustments a caller may ask for.
#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    pub model: Option<String>,
    pub host: Option<String>,
    pub debug: bool,
}

pub struct SessionFactory {
    config: AppConfig,
    provider: Arc<dyn Provider>,
    site: Arc<SiteFs>,
    tools: Arc<ToolRegistry>,
    retriever: Arc<dyn Retriever>,
    system_prompt: String,
}

impl SessionFactory {
    /// Build everything a session needs from `config`.
    pub fn from_config(config: AppConfig) -> Result<Self, Error> {
        let sandbox = Sandbox::new(config.project_root()).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        let site = Arc::new(SiteFs::new(sandbox, config.workspace.output_dir.clone()));
        let provider = sitewright_providers::router::build_from_config(&config)?;
        let retriever = open_retriever(&config);
        let system_prompt = config.load_system_prompt();

        Ok(Self {
            tools: Arc::new(site_registry(site.clone())),
            config,
            provider,
            site,
            retriever,
            system_prompt,
        })
    }

    /// Replace the model provider.
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = provider;
        self
    }

    /// Replace the retrieval backend.
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn site(&self) -> &Arc<SiteFs> {
        &self.site
    }

    pub fn retriever_name(&self) -> &str {
        self.retriever.name()
    }

    pub fn settings(&self) -> AgentSettings {
        let retrieval = &self.config.retrieval;
        AgentSettings {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: None,
            max_iterations: self.config.agent.max_iterations,
            retrieval_k: self.config.agent.retrieval_k,
            grounding: GroundingSettings {
                template_candidates: retrieval.template_candidates,
                style_samples: retrieval.style_samples,
                style_sample_chars: retrieval.style_sample_chars,
                chunk_chars: retrieval.chunk_chars,
            },
            log_responses: false,
        }
    }

    /// A new session using the configured model and host.
    pub fn session(&self) -> BuilderAgent {
        BuilderAgent::new(
            self.provider.clone(),
            self.tools.clone(),
            self.retriever.clone(),
            self.system_prompt.clone(),
            self.settings(),
        )
    }

    /// A new session with per-request overrides. A different host means a
    /// provider of its own.
    pub fn session_with(&self, overrides: &SessionOverrides) -> Result<BuilderAgent, Error> {
        let provider = match overrides.host.as_deref() {
            Some(host) if host != self.config.host => {
                let mut config = self.config.clone();
                config.host = host.to_string();
                sitewright_providers::router::build_from_config(&config)?
            }
            _ => self.provider.clone(),
        };

        let mut settings = self.settings().with_response_logging(overrides.debug);
        if let Some(model) = overrides.model.as_deref().filter(|m| !m.is_empty()) {
            settings.model = model.to_string();
        }

        Ok(BuilderAgent::new(
            provider,
            self.tools.clone(),
            self.retriever.clone(),
            self.system_prompt.clone(),
            settings,
        ))
    }
}

/// The configured retriever. A missing or unreadable index disables
/// grounding instead of failing startup.
fn open_retriever(config: &AppConfig) -> Arc<dyn Retriever> {
    match config.retrieval.backend.as_str() {
        "index" => {
            let path = config.project_path(&config.retrieval.index_path);
            match TemplateIndex::load(&path) {
                Ok(index) => {
                    info!(path = %path.display(), chunks = index.len(), "Template index loaded");
                    Arc::new(index)
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Template index unavailable, grounding disabled"
                    );
                    Arc::new(NoopRetriever)
                }
            }
        }
        _ => Arc::new(NoopRetriever),
    }
}
