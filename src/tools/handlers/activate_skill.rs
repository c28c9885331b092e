// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Activate-skill tool handler.
//!
//! Loads a packaged skill's instructions from `.aq/skills/<name>/SKILL.md`
//! and returns them as the tool result so the model can follow them in
//! place of its default approach. Skill *names* are discovered the same
//! way [`crate::tui::prompt_assembler::PromptAssembler`] discovers them
//! (`.aq/skills.json`, `AGENTS.md`); this handler is what turns a
//! discovered name into its actual content on demand.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ToolError;
use crate::tools::invocation::ToolKind;
use crate::tools::parse_arguments;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::types::{InputSchema, ToolDefinition};

/// Handler for the `activate_skill` tool.
pub struct ActivateSkillHandler;

/// Arguments for the activate_skill tool.
#[derive(Debug, Deserialize)]
struct ActivateSkillArgs {
    /// Name of the skill to activate, matching a directory under
    /// `.aq/skills/`.
    skill_name: String,
}

#[async_trait]
impl ToolHandler for ActivateSkillHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("activate_skill", "Load a packaged skill's instructions by name")
            .with_schema(
                InputSchema::new()
                    .with_property("skill_name", serde_json::json!({
                        "type": "string",
                        "description": "Name of the skill to activate"
                    }))
                    .with_required(vec!["skill_name".to_string()]),
            )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Plan
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: ActivateSkillArgs = parse_arguments(&input)?;

        if args.skill_name.contains("..") || args.skill_name.contains('/') {
            return Err(ToolError::InvalidInput(format!(
                "invalid skill name: {}",
                args.skill_name
            )));
        }

        let cwd = std::env::current_dir()
            .map_err(|e| ToolError::IoError(format!("failed to read current directory: {e}")))?;
        let path = cwd.join(".aq").join("skills").join(&args.skill_name).join("SKILL.md");

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::FileNotFound(format!("no such skill: {}", args.skill_name))
            } else {
                ToolError::IoError(format!("failed to read skill: {e}"))
            }
        })?;

        Ok(ToolOutput::success(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn execute_loads_skill_content() {
        let temp = tempdir().unwrap();
        let skill_dir = temp.path().join(".aq").join("skills").join("reviewer");
        fs::create_dir_all(&skill_dir).unwrap();
        fs::write(skill_dir.join("SKILL.md"), "Review the diff for bugs.").unwrap();

        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp.path()).unwrap();

        let handler = ActivateSkillHandler;
        let result = handler
            .execute(serde_json::json!({"skill_name": "reviewer"}))
            .await
            .unwrap();

        std::env::set_current_dir(original).unwrap();

        assert!(result.content().contains("Review the diff"));
    }

    #[tokio::test]
    async fn execute_rejects_path_traversal() {
        let handler = ActivateSkillHandler;
        let result = handler
            .execute(serde_json::json!({"skill_name": "../../etc"}))
            .await;
        assert!(result.is_err());
    }
}
