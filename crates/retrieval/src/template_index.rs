//! Template index: the chunk file produced by the template indexer, held in
//! memory and ranked lexically.
//!
//! File format: a JSON array of
//! `{id, text, metadata: {template, type, description, source, chunk_index}}`
//! where `type` is `description`, `html`, or `css`.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitewright_core::error::RetrievalError;
use sitewright_core::retrieval::{Retriever, SearchResults, StyleSample, TemplateHit};
use tracing::debug;

use crate::lexical::{TermVector, cosine_similarity, term_vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Description,
    Html,
    Css,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub template: String,
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

struct Indexed {
    chunk: Chunk,
    terms: TermVector,
}

pub struct TemplateIndex {
    entries: Vec<Indexed>,
}

impl TemplateIndex {
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let entries = chunks
            .into_iter()
            .map(|chunk| {
                let terms = term_vector(&chunk.text);
                Indexed { chunk, terms }
            })
            .collect();
        Self { entries }
    }

    /// Load the chunk file. A missing file is `Unavailable`; unparseable JSON
    /// is `CorruptIndex`.
    pub fn load(path: &Path) -> Result<Self, RetrievalError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::Unavailable(format!("{}: {e}", path.display()))
        })?;
        let chunks: Vec<Chunk> = serde_json::from_str(&content)
            .map_err(|e| RetrievalError::CorruptIndex(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), count = chunks.len(), "Template index loaded");
        Ok(Self::from_chunks(chunks))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries matching `filter`, best first, as (distance, entry).
    fn rank<'a>(
        &'a self,
        query: &str,
        filter: impl Fn(&Chunk) -> bool,
    ) -> Vec<(f64, &'a Chunk)> {
        let q = term_vector(query);
        let mut scored: Vec<(f64, &Chunk)> = self
            .entries
            .iter()
            .filter(|e| filter(&e.chunk))
            .map(|e| (1.0 - cosine_similarity(&q, &e.terms) as f64, &e.chunk))
            .collect();
        // stable: ties keep file order
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored
    }
}

#[async_trait]
impl Retriever for TemplateIndex {
    fn name(&self) -> &str {
        "index"
    }

    async fn search_templates(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<TemplateHit>, RetrievalError> {
        Ok(self
            .rank(query, |c| c.metadata.kind == ChunkKind::Description)
            .into_iter()
            .take(k)
            .map(|(distance, chunk)| TemplateHit {
                template: chunk.metadata.template.clone(),
                description: if chunk.metadata.description.is_empty() {
                    chunk.text.clone()
                } else {
                    chunk.metadata.description.clone()
                },
                distance: Some(distance),
            })
            .collect())
    }

    async fn fetch_style_samples(
        &self,
        template: &str,
        limit: usize,
    ) -> Result<Vec<StyleSample>, RetrievalError> {
        let mut css: Vec<&Chunk> = self
            .entries
            .iter()
            .map(|e| &e.chunk)
            .filter(|c| c.metadata.kind == ChunkKind::Css && c.metadata.template == template)
            .collect();
        css.sort_by_key(|c| c.metadata.chunk_index);

        css.into_iter()
            .take(limit)
            .map(|c| {
                let metadata = serde_json::to_value(&c.metadata)
                    .map_err(|e| RetrievalError::QueryFailed(e.to_string()))?;
                Ok(StyleSample {
                    text: c.text.clone(),
                    metadata: metadata.as_object().cloned().unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        include_metadata: bool,
    ) -> Result<SearchResults, RetrievalError> {
        let ranked: Vec<_> = self.rank(query, |_| true).into_iter().take(k).collect();

        let documents = ranked.iter().map(|(_, c)| c.text.clone()).collect();
        let distances = ranked.iter().map(|(d, _)| *d).collect();
        let metadatas = if include_metadata {
            let metas = ranked
                .iter()
                .map(|(_, c)| {
                    serde_json::to_value(&c.metadata)
                        .ok()
                        .and_then(|v| v.as_object().cloned())
                })
                .collect();
            vec![metas]
        } else {
            Vec::new()
        };

        Ok(SearchResults {
            documents: vec![documents],
            metadatas,
            distances: vec![distances],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn chunk(template: &str, kind: ChunkKind, idx: usize, text: &str) -> Chunk {
        Chunk {
            id: format!("{template}::{idx}"),
            text: text.into(),
            metadata: ChunkMetadata {
                template: template.into(),
                kind,
                description: String::new(),
                source: Some(format!("{template}/file")),
                chunk_index: idx,
            },
        }
    }

    fn index() -> TemplateIndex {
        TemplateIndex::from_chunks(vec![
            chunk(
                "resume",
                ChunkKind::Description,
                0,
                "Resume CV timeline with skills and experience",
            ),
            chunk("shop", ChunkKind::Description, 0, "Storefront homepage showing product cards"),
            chunk("shop", ChunkKind::Css, 1, ".card-product { border: 0 }"),
            chunk("shop", ChunkKind::Css, 0, ".navbar-shop { color: red }"),
            chunk("shop", ChunkKind::Html, 0, "<div class=\"card\">product</div>"),
        ])
    }

    #[tokio::test]
    async fn templates_rank_by_description_distance() {
        let hits = index().search_templates("an online shop with product cards", 3).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].template, "shop");
        assert_eq!(hits[0].description, "Storefront homepage showing product cards");
        assert!(hits[0].distance.unwrap() < hits[1].distance.unwrap());
    }

    #[tokio::test]
    async fn style_samples_follow_chunk_order() {
        let samples = index().fetch_style_samples("shop", 3).await.unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples[0].text.contains("navbar-shop"));
        assert_eq!(samples[0].metadata["type"], "css");
        assert!(index().fetch_style_samples("resume", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_respects_k_and_metadata_flag() {
        let idx = index();
        let with_meta = idx.search("product card", 2, true).await.unwrap();
        assert_eq!(with_meta.documents[0].len(), 2);
        assert_eq!(with_meta.metadatas[0].len(), 2);
        assert_eq!(with_meta.hits()[0].label, "shop");

        let without = idx.search("product card", 2, false).await.unwrap();
        assert!(without.metadatas.is_empty());
    }

    #[test]
    fn load_reports_missing_and_corrupt_files() {
        let missing = TemplateIndex::load(Path::new("/no/such/templates.json"));
        assert!(matches!(missing, Err(RetrievalError::Unavailable(_))));

        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{not json").unwrap();
        assert!(matches!(TemplateIndex::load(f.path()), Err(RetrievalError::CorruptIndex(_))));
    }

    #[test]
    fn load_reads_chunk_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"[{{"id":"blog::description","text":"Blog post layout",
                "metadata":{{"template":"blog","type":"description","description":"Blog post layout"}}}}]"#
        )
        .unwrap();
        let idx = TemplateIndex::load(f.path()).unwrap();
        assert_eq!(idx.len(), 1);
    }
}
