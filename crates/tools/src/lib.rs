//! File tools for sitewright.
//!
//! The agent can do exactly three things to the world: write a file, read a
//! file, and list files. All three go through one [`SiteFs`], which confines
//! them to the project root.

pub mod list_files;
pub mod read_file;
pub mod site_fs;
pub mod write_file;

use std::sync::Arc;

use sitewright_core::error::ToolError;
use sitewright_core::tool::ToolRegistry;

pub use site_fs::{ReadOutcome, SiteFs, SiteFsError, WriteReceipt};

/// Build the registry advertised to the model, in schema order.
pub fn site_registry(fs: Arc<SiteFs>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(write_file::WriteFileTool::new(fs.clone())));
    registry.register(Box::new(read_file::ReadFileTool::new(fs.clone())));
    registry.register(Box::new(list_files::ListFilesTool::new(fs)));
    registry
}

fn into_tool_error(tool_name: &str, err: SiteFsError) -> ToolError {
    match err {
        SiteFsError::Sandbox(e) => ToolError::SandboxViolation(e.to_string()),
        io @ SiteFsError::Io { .. } => ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: io.to_string(),
        },
    }
}
