//! The sitewright agent loop.
//!
//! One request runs as:
//!
//! 1. **Append** the caller's request to the conversation
//! 2. **Ground** it with retrieved templates, styles, and component chunks
//! 3. **Send** the conversation and the tool schema to the model
//! 4. **Normalize** whatever tool calls the reply carries, structured or embedded
//! 5. **Execute** them in order, append one tool message each, go back to 3
//! 6. **Return** the first reply without tool calls as the final answer
//!
//! A loop guard bounds the number of round trips per request.

pub mod grounding;
pub mod loop_runner;
pub mod normalizer;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use grounding::{GroundingInjector, GroundingSettings, Snippet};
pub use loop_runner::{AgentSettings, AskOutcome, BuilderAgent, STALLED_MESSAGE};
pub use normalizer::{CallSource, NormalizedTurn, normalize};
pub use session::{SessionFactory, SessionOverrides};
