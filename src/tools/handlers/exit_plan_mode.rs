// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Exit-plan-mode tool handler.
//!
//! The model calls this once it has proposed a plan and wants to leave the
//! read-only plan-mode tool subset and start making changes. The handler
//! itself only validates and echoes the plan back as the tool result; the
//! actual state flip happens in [`crate::agent::Agent::chat`], which
//! inspects each turn's tool calls for a successful `exit_plan_mode` call
//! and calls `set_plan_mode(false)` afterward (the handler has no mutable
//! access to agent state, same constraint as `ask_user`).

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ToolError;
use crate::tools::invocation::ToolKind;
use crate::tools::parse_arguments;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::types::{InputSchema, ToolDefinition};

/// Handler for the `exit_plan_mode` tool.
pub struct ExitPlanModeHandler;

/// Arguments for the exit_plan_mode tool.
#[derive(Debug, Deserialize)]
struct ExitPlanModeArgs {
    /// A short summary of the plan being proposed for approval.
    #[serde(default)]
    plan: String,
}

#[async_trait]
impl ToolHandler for ExitPlanModeHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "exit_plan_mode",
            "Leave plan mode once a plan has been proposed, unlocking the full tool set",
        )
        .with_schema(
            InputSchema::new().with_property(
                "plan",
                serde_json::json!({
                    "type": "string",
                    "description": "Summary of the plan being proposed"
                }),
            ),
        )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Plan
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: ExitPlanModeArgs = parse_arguments(&input)?;
        if args.plan.is_empty() {
            Ok(ToolOutput::success("Exiting plan mode."))
        } else {
            Ok(ToolOutput::success(format!("Exiting plan mode. Plan:\n{}", args.plan)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_without_plan_succeeds() {
        let handler = ExitPlanModeHandler;
        let result = handler.execute(serde_json::json!({})).await.unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn execute_echoes_plan() {
        let handler = ExitPlanModeHandler;
        let result = handler
            .execute(serde_json::json!({"plan": "Refactor the parser."}))
            .await
            .unwrap();
        assert!(result.content().contains("Refactor the parser."));
    }
}
