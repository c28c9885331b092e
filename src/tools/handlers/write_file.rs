// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Write file tool handler.
//!
//! Writes content to a file, creating directories as needed.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::error::ToolError;
use crate::tools::invocation::{ConfirmationDetails, ToolKind};
use crate::tools::parse_arguments;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::types::{InputSchema, ToolDefinition};

/// Handler for the `write_file` tool.
pub struct WriteFileHandler;

/// Arguments for the write_file tool.
#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    /// Absolute path to the file to write.
    file_path: String,

    /// Content to write to the file.
    content: String,
}

#[async_trait]
impl ToolHandler for WriteFileHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("write_file", "Write content to a file (creates file if it doesn't exist)")
            .with_schema(
                InputSchema::new()
                    .with_property("file_path", serde_json::json!({
                        "type": "string",
                        "description": "The absolute path to the file to write"
                    }))
                    .with_property("content", serde_json::json!({
                        "type": "string",
                        "description": "The content to write to the file"
                    }))
                    .with_required(vec!["file_path".to_string(), "content".to_string()]),
            )
    }

    fn is_mutating(&self) -> bool {
        true
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Edit
    }

    fn maybe_confirmation_details(&self, input: &serde_json::Value) -> Option<ConfirmationDetails> {
        let file_path = input.get("file_path")?.as_str()?.to_string();
        Some(ConfirmationDetails::Edit { file_path })
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, input), fields(path, bytes, created)))]
    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: WriteFileArgs = parse_arguments(&input)?;

        // Record span fields (only with telemetry)
        #[cfg(feature = "telemetry")]
        {
            let span = tracing::Span::current();
            span.record("path", &args.file_path);
            span.record("bytes", args.content.len());
        }

        let path = PathBuf::from(&args.file_path);

        if !path.is_absolute() {
            return Err(ToolError::InvalidInput(
                "file_path must be an absolute path".to_string(),
            ));
        }

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    ToolError::IoError(format!("Failed to create parent directories: {e}"))
                })?;
            }
        }

        // Check if file exists (for output message)
        let existed = path.exists();

        // Write the file
        fs::write(&path, &args.content).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ToolError::PermissionDenied(path.display().to_string())
            } else {
                ToolError::IoError(format!("Failed to write file: {e}"))
            }
        })?;

        let action = if existed { "Updated" } else { "Created" };
        let lines = args.content.lines().count();
        let bytes = args.content.len();

        // Record whether file was created or updated (only with telemetry)
        #[cfg(feature = "telemetry")]
        {
            tracing::Span::current().record("created", !existed);
            debug!(path = %path.display(), bytes, lines, created = !existed, "File write complete");
        }

        Ok(ToolOutput::success(format!(
            "{action} {path} ({lines} lines, {bytes} bytes)",
            path = path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_file_new() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("new_file.txt");

        let handler = WriteFileHandler;
        let result = handler
            .execute(serde_json::json!({
                "file_path": file.to_str().unwrap(),
                "content": "Hello, world!"
            }))
            .await
            .unwrap();

        assert!(result.is_success());
        assert!(result.content().contains("Created"));
        assert!(file.exists());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "Hello, world!");
    }

    #[tokio::test]
    async fn test_write_file_overwrite() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("existing.txt");
        std::fs::write(&file, "old content").unwrap();

        let handler = WriteFileHandler;
        let result = handler
            .execute(serde_json::json!({
                "file_path": file.to_str().unwrap(),
                "content": "new content"
            }))
            .await
            .unwrap();

        assert!(result.is_success());
        assert!(result.content().contains("Updated"));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "new content");
    }

    #[tokio::test]
    async fn test_write_file_creates_dirs() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("nested").join("dir").join("file.txt");

        let handler = WriteFileHandler;
        let result = handler
            .execute(serde_json::json!({
                "file_path": file.to_str().unwrap(),
                "content": "content"
            }))
            .await
            .unwrap();

        assert!(result.is_success());
        assert!(file.exists());
    }

    #[tokio::test]
    async fn test_write_file_relative_path_rejected() {
        let handler = WriteFileHandler;
        let result = handler
            .execute(serde_json::json!({
                "file_path": "relative/path.txt",
                "content": "content"
            }))
            .await;

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_write_file_permission_denied() {
        // Create a read-only directory
        let temp = tempdir().unwrap();
        let ro_dir = temp.path().join("readonly");
        std::fs::create_dir(&ro_dir).unwrap();
        
        // Make directory read-only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&ro_dir, std::fs::Permissions::from_mode(0o555)).unwrap();
        }
        
        let file = ro_dir.join("test.txt");
        
        let handler = WriteFileHandler;
        let result = handler
            .execute(serde_json::json!({
                "file_path": file.to_str().unwrap(),
                "content": "test content"
            }))
            .await;

        // Should fail due to permissions
        assert!(result.is_err());
        
        #[cfg(unix)]
        {
            assert!(matches!(result.unwrap_err(), ToolError::PermissionDenied(_)));
        }
        
        // Restore permissions for cleanup
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&ro_dir, std::fs::Permissions::from_mode(0o755));
        }
    }

    #[tokio::test]
    async fn test_write_file_invalid_path() {
        // Try to write to an invalid path (non-existent parent that can't be created)
        // On Unix, /proc/nonexistent is a good test case
        let handler = WriteFileHandler;
        let result = handler
            .execute(serde_json::json!({
                "file_path": "/proc/nonexistent_dir/test.txt",
                "content": "test"
            }))
            .await;

        assert!(result.is_err());
        // Could be IoError or PermissionDenied depending on the system
    }
}
