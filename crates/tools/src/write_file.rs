//! `write_file`: create or replace a file under the site output directory.

use std::sync::Arc;

use async_trait::async_trait;
use sitewright_core::error::ToolError;
use sitewright_core::tool::{Tool, ToolResult};

use crate::site_fs::SiteFs;

pub struct WriteFileTool {
    fs: Arc<SiteFs>,
}

impl WriteFileTool {
    pub fn new(fs: Arc<SiteFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write a file of the generated website. Paths are relative to the site directory. \
         Creates the file if it doesn't exist, overwrites if it does."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, e.g. index.html or css/styles.css"
                },
                "content": {
                    "type": "string",
                    "description": "The full file content"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("missing path".into()))?;

        let content = match &arguments["content"] {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        let receipt = self
            .fs
            .write_file(path, &content)
            .await
            .map_err(|e| super::into_tool_error("write_file", e))?;
        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: receipt.to_string(),
            data: None,
        })
    }
}
