//! `list_files`: enumerate project files so the model can see what exists.

use std::sync::Arc;

use async_trait::async_trait;
use sitewright_core::error::ToolError;
use sitewright_core::tool::{Tool, ToolResult};

use crate::site_fs::SiteFs;

pub struct ListFilesTool {
    fs: Arc<SiteFs>,
}

impl ListFilesTool {
    pub fn new(fs: Arc<SiteFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List every file in the project, as paths relative to the project root."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "base": {
                    "type": "string",
                    "description": "Optional directory to list instead of the whole project"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let base = arguments["base"].as_str().filter(|b| !b.is_empty());
        let files = self
            .fs
            .list_files(base)
            .await
            .map_err(|e| super::into_tool_error("list_files", e))?;

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format!("{} files", files.len()),
            data: Some(serde_json::json!(files)),
        })
    }
}
