// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Ask-user tool handler.
//!
//! Asks the person at the keyboard a free-text question. The interesting
//! behavior — publishing an [`crate::bus::AskUserRequest`] and blocking on
//! the matching response — happens in [`crate::agent::scheduler::Scheduler`],
//! which intercepts calls to this tool before the normal auto/confirm
//! partition (the handler itself has no bus access: the registry that owns
//! it is constructed once and shared across runs, while the bus is
//! per-run). `execute` here only runs for callers that dispatch straight
//! through the registry without going through the scheduler (e.g. the
//! legacy synchronous confirmation path), where no interactive answer is
//! available.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ToolError;
use crate::tools::invocation::ToolKind;
use crate::tools::parse_arguments;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::types::{InputSchema, ToolDefinition};

/// Handler for the `ask_user` tool.
pub struct AskUserHandler;

/// Arguments for the ask_user tool.
#[derive(Debug, Deserialize)]
struct AskUserArgs {
    /// The question to put to the user.
    question: String,
}

#[async_trait]
impl ToolHandler for AskUserHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("ask_user", "Ask the user a free-text question and wait for their reply")
            .with_schema(
                InputSchema::new()
                    .with_property("question", serde_json::json!({
                        "type": "string",
                        "description": "The question to ask the user"
                    }))
                    .with_required(vec!["question".to_string()]),
            )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Communicate
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: AskUserArgs = parse_arguments(&input)?;
        Err(ToolError::ExecutionFailed(format!(
            "ask_user requires the bus-driven scheduler to reach a user; no one answered: {}",
            args.question
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn definition_has_question_schema() {
        let handler = AskUserHandler;
        let def = handler.definition();
        assert_eq!(def.name, "ask_user");
    }

    #[tokio::test]
    async fn execute_without_scheduler_errors() {
        let handler = AskUserHandler;
        let result = handler.execute(serde_json::json!({"question": "which file?"})).await;
        assert!(result.is_err());
    }
}
