//! `read_file`: read a project file back to the model.

use std::sync::Arc;

use async_trait::async_trait;
use sitewright_core::error::ToolError;
use sitewright_core::tool::{Tool, ToolResult};

use crate::site_fs::{ReadOutcome, SiteFs};

pub struct ReadFileTool {
    fs: Arc<SiteFs>,
}

impl ReadFileTool {
    pub fn new(fs: Arc<SiteFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Paths are relative to the project root, e.g. site/index.html."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("missing path".into()))?;

        let outcome = self
            .fs
            .read_file(path)
            .await
            .map_err(|e| super::into_tool_error("read_file", e))?;
        match outcome {
            ReadOutcome::Content(content) => Ok(ToolResult {
                call_id: String::new(),
                success: true,
                output: content,
                data: None,
            }),
            ReadOutcome::NotFound(target) => {
                tracing::debug!(path = %target.display(), "File not found");
                Ok(ToolResult {
                    call_id: String::new(),
                    success: false,
                    output: format!("ERROR: file not found: {path}"),
                    data: None,
                })
            }
        }
    }
}
