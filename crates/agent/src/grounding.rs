//! Retrieval grounding.
//!
//! Before the first model turn of a request, the injector asks the retriever
//! for template suggestions, CSS samples from the best template, and general
//! component chunks. It then replaces the conversation's grounding message
//! with the result. Every sub-query fails soft: an error just means that
//! section is left out.

use std::sync::Arc;

use sitewright_core::message::Conversation;
use sitewright_core::retrieval::{Retriever, StyleSample, TemplateHit};
use tracing::{debug, warn};

const TEMPLATE_HEADER: &str = "--- Template suggestions (by description distance) ---";
const CHUNK_HEADER: &str = "--- Retrieved component chunks ---";

/// Limits applied while building a grounding snippet.
#[derive(Debug, Clone)]
pub struct GroundingSettings {
    pub template_candidates: usize,
    pub style_samples: usize,
    pub style_sample_chars: usize,
    pub chunk_chars: usize,
}

impl Default for GroundingSettings {
    fn default() -> Self {
        Self {
            template_candidates: 3,
            style_samples: 3,
            style_sample_chars: 420,
            chunk_chars: 600,
        }
    }
}

/// A built snippet plus how many sections went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub text: String,
    pub sections: usize,
}

pub struct GroundingInjector {
    retriever: Arc<dyn Retriever>,
    settings: GroundingSettings,
}

impl GroundingInjector {
    pub fn new(retriever: Arc<dyn Retriever>, settings: GroundingSettings) -> Self {
        Self { retriever, settings }
    }

    /// Build the snippet for `query`, or `None` when every section is empty.
    pub async fn build_snippet(&self, query: &str, k: usize) -> Option<Snippet> {
        let mut parts: Vec<String> = Vec::new();
        let mut sections = 0;

        let templates = self.template_hits(query).await;
        if let Some(top) = templates.first() {
            sections += 1;
            parts.push(TEMPLATE_HEADER.to_string());
            parts.extend(templates.iter().map(format_template_hit));

            let samples = self.style_samples(&top.template).await;
            if !samples.is_empty() {
                sections += 1;
                parts.push(format!("CSS samples from {} (trimmed):", top.template));
                parts.extend(samples.iter().enumerate().map(|(i, sample)| {
                    let text = truncate_chars(&sample.text, self.settings.style_sample_chars);
                    format!("[CSS {}] {}", i + 1, text.replace('\n', " "))
                }));
            }
        }

        let chunks = match self.retriever.search(query, k, true).await {
            Ok(results) => results.hits(),
            Err(e) => {
                warn!(retriever = self.retriever.name(), error = %e, "Chunk search failed");
                Vec::new()
            }
        };
        if !chunks.is_empty() {
            sections += 1;
            parts.push(CHUNK_HEADER.to_string());
            parts.extend(chunks.iter().take(k).enumerate().map(|(i, hit)| {
                format!(
                    "[{}] {} :: {}",
                    i + 1,
                    hit.label,
                    truncate_chars(&hit.text, self.settings.chunk_chars)
                )
            }));
        }

        if parts.is_empty() {
            return None;
        }

        let mut text = parts.join("\n\n");
        text.push('\n');
        Some(Snippet { text, sections })
    }

    /// Refresh the grounding message for `query`. When nothing was found the
    /// conversation is left untouched and `None` comes back.
    pub async fn inject(
        &self,
        conversation: &mut Conversation,
        query: &str,
        k: usize,
    ) -> Option<Snippet> {
        let snippet = self.build_snippet(query, k).await?;
        conversation.replace_retrieval_context(snippet.text.clone());
        debug!(
            conversation_id = %conversation.id(),
            sections = snippet.sections,
            chars = snippet.text.len(),
            "Injected grounding context"
        );
        Some(snippet)
    }

    async fn template_hits(&self, query: &str) -> Vec<TemplateHit> {
        self.retriever
            .search_templates(query, self.settings.template_candidates)
            .await
            .unwrap_or_else(|e| {
                warn!(retriever = self.retriever.name(), error = %e, "Template search failed");
                Vec::new()
            })
    }

    async fn style_samples(&self, template: &str) -> Vec<StyleSample> {
        if template.is_empty() {
            return Vec::new();
        }
        self.retriever
            .fetch_style_samples(template, self.settings.style_samples)
            .await
            .unwrap_or_else(|e| {
                warn!(template, error = %e, "Style sample lookup failed");
                Vec::new()
            })
    }
}

fn format_template_hit(hit: &TemplateHit) -> String {
    let distance = hit
        .distance
        .map_or_else(|| "n/a".to_string(), |d| format!("{d:.3}"));
    format!("{}: {} (dist={distance})", hit.template, hit.description)
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
