//! No-op retriever: disables grounding entirely.

use async_trait::async_trait;
use sitewright_core::error::RetrievalError;
use sitewright_core::retrieval::{Retriever, SearchResults, StyleSample, TemplateHit};

/// A retriever that never finds anything.
pub struct NoopRetriever;

#[async_trait]
impl Retriever for NoopRetriever {
    fn name(&self) -> &str {
        "none"
    }

    async fn search_templates(
        &self,
        _query: &str,
        _k: usize,
    ) -> Result<Vec<TemplateHit>, RetrievalError> {
        Ok(Vec::new())
    }

    async fn fetch_style_samples(
        &self,
        _template: &str,
        _limit: usize,
    ) -> Result<Vec<StyleSample>, RetrievalError> {
        Ok(Vec::new())
    }

    async fn search(
        &self,
        _query: &str,
        _k: usize,
        _include_metadata: bool,
    ) -> Result<SearchResults, RetrievalError> {
        Ok(SearchResults::default())
    }
}
