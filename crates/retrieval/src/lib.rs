//! Retrieval backends for sitewright.
//!
//! - [`NoopRetriever`]: grounding disabled
//! - [`TemplateIndex`]: a local index over the template chunk file, ranked
//!   by term-vector cosine similarity

pub mod lexical;
pub mod noop;
pub mod template_index;

pub use lexical::{cosine_similarity, term_vector};
pub use noop::NoopRetriever;
pub use template_index::{Chunk, ChunkKind, ChunkMetadata, TemplateIndex};
