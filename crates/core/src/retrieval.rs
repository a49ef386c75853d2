//! Retriever trait: the search capability used to ground the model.
//!
//! Backends only have to answer three queries. Indexing and similarity
//! scoring are entirely their business; callers see ranked records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// A template ranked by how well its description matches the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateHit {
    pub template: String,
    pub description: String,
    /// Lower is closer; `None` when the backend cannot score
    #[serde(default)]
    pub distance: Option<f64>,
}

/// A representative stylesheet excerpt from one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSample {
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// General search results, one inner list per query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub documents: Vec<Vec<String>>,
    #[serde(default)]
    pub metadatas: Vec<Vec<Option<serde_json::Map<String, serde_json::Value>>>>,
    #[serde(default)]
    pub distances: Vec<Vec<f64>>,
}

/// One flattened record from [`SearchResults`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    /// Originating template or source file, empty when unknown
    pub label: String,
    pub text: String,
    pub distance: Option<f64>,
}

impl SearchResults {
    /// Flatten the first result set, labelling each document by its
    /// `template` metadata, falling back to `source`.
    pub fn hits(&self) -> Vec<RetrievalHit> {
        let Some(docs) = self.documents.first() else {
            return Vec::new();
        };
        let metas = self.metadatas.first();
        let distances = self.distances.first();

        docs.iter()
            .enumerate()
            .map(|(i, text)| {
                let meta = metas.and_then(|m| m.get(i)).and_then(|m| m.as_ref());
                let label = meta
                    .and_then(|m| {
                        ["template", "source"]
                            .iter()
                            .find_map(|key| m.get(*key).and_then(|v| v.as_str()))
                    })
                    .unwrap_or_default()
                    .to_string();
                RetrievalHit {
                    label,
                    text: text.clone(),
                    distance: distances.and_then(|d| d.get(i)).copied(),
                }
            })
            .collect()
    }
}

/// A search backend. Any call may fail; callers decide how to degrade.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Up to `k` templates ordered by description distance.
    async fn search_templates(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<TemplateHit>, RetrievalError>;

    /// Up to `limit` style samples belonging to `template`.
    async fn fetch_style_samples(
        &self,
        template: &str,
        limit: usize,
    ) -> Result<Vec<StyleSample>, RetrievalError>;

    /// Up to `k` general content chunks for `query`.
    async fn search(
        &self,
        query: &str,
        k: usize,
        include_metadata: bool,
    ) -> Result<SearchResults, RetrievalError>;
}
