//! # sitewright core
//!
//! Domain types, traits, and error definitions for the sitewright agent.
//! Every subsystem (model provider, tool, retrieval backend) is a trait here;
//! implementations live in their own crates and depend inward on this one.
//!
//! The conversation log in [`message`] owns the rules for what gets appended,
//! replaced, or pruned between model turns.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod tool;

pub use error::{Error, ProviderError, Result, RetrievalError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, RETRIEVAL_CONTEXT_NAME, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use retrieval::{Retriever, RetrievalHit, SearchResults, StyleSample, TemplateHit};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
