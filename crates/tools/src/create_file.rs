//! File creation tool — write content to a new file.
//!
//! Only invoked when the user explicitly asks to save or create a file;
//! the tool description tells the model so.

use aika_core::error::ToolError;
use aika_core::tool::{Tool, ToolResult};
use async_trait::async_trait;

pub struct CreateFileTool;

impl CreateFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CreateFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Create a new file and write content to it. Use when the user explicitly asks \
         to save or create a file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "The filename to create, e.g., 'main.py', 'notes.txt'."
                },
                "content": {
                    "type": "string",
                    "description": "The complete content to write into the file."
                }
            },
            "required": ["filename", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let filename = arguments["filename"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'filename' argument".into()))?;

        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        if std::path::Path::new(filename).is_dir() {
            return Ok(ToolResult::failure(format!(
                "Error: '{filename}' is a directory."
            )));
        }

        match tokio::fs::write(filename, content).await {
            Ok(()) => Ok(ToolResult::ok(format!(
                "Successfully created the file '{filename}'."
            ))),
            Err(e) => Ok(ToolResult::failure(format!("Error creating file: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definition() {
        let tool = CreateFileTool::new();
        assert_eq!(tool.name(), "create_file");
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["filename", "content"]));
    }

    #[tokio::test]
    async fn write_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("notes.txt");

        let tool = CreateFileTool::new();
        let result = tool
            .execute(serde_json::json!({
                "filename": file_path.to_str().unwrap(),
                "content": "Hello from test!"
            }))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.contains("Successfully created"));

        let content = std::fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, "Hello from test!");
    }

    #[tokio::test]
    async fn directory_target_is_refused() {
        let dir = tempfile::tempdir().unwrap();

        let tool = CreateFileTool::new();
        let result = tool
            .execute(serde_json::json!({
                "filename": dir.path().to_str().unwrap(),
                "content": "anything"
            }))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.output.contains("is a directory"));
    }

    #[tokio::test]
    async fn repeat_write_is_a_noop_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("repeat.txt");

        let tool = CreateFileTool::new();
        let args = serde_json::json!({
            "filename": file_path.to_str().unwrap(),
            "content": "same content"
        });
        let first = tool.execute(args.clone()).await.unwrap();
        let second = tool.execute(args).await.unwrap();

        assert!(first.success && second.success);
        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "same content");
    }

    #[tokio::test]
    async fn missing_filename_argument() {
        let tool = CreateFileTool::new();
        let result = tool.execute(serde_json::json!({ "content": "hello" })).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_content_argument() {
        let tool = CreateFileTool::new();
        let result = tool
            .execute(serde_json::json!({ "filename": "/tmp/test.txt" }))
            .await;
        assert!(result.is_err());
    }
}
