// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool system for aq.
//!
//! This module provides the infrastructure for defining and executing tools
//! that the AI model can call to interact with the filesystem, run commands,
//! and perform other operations.
//!
//! # Architecture
//!
//! The tool system follows these patterns (inspired by codex-rs):
//!
//! - [`ToolHandler`] trait - Core abstraction for tool implementations
//! - [`ToolRegistry`] - Maps tool names to handlers, dispatches calls
//! - Individual handlers in the [`handlers`] module
//!
//! # Example
//!
//! ```rust,ignore
//! use aq::tools::{ToolRegistry, ToolOutput};
//!
//! // Create registry with default tools
//! let registry = ToolRegistry::with_defaults();
//!
//! // Execute a tool
//! let output = registry.dispatch("read_file", json!({"file_path": "/path/to/file"})).await?;
//! ```

pub mod command_risk;
pub mod handlers;
pub mod invocation;
pub mod registry;

pub use command_risk::{classify_command, CommandRisk};
pub use handlers::*;
pub use invocation::{ConfirmationDetails, ToolKind};
pub use registry::{DispatchResult, ToolHandler, ToolOutput, ToolRegistry, ToolRegistryBuilder};

use serde::Deserialize;
use crate::error::ToolError;

/// Parse JSON arguments into a typed struct.
///
/// This is a helper function for tool handlers to deserialize their input.
pub fn parse_arguments<T>(arguments: &serde_json::Value) -> Result<T, ToolError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(arguments.clone())
        .map_err(|err| ToolError::InvalidInput(format!("Failed to parse arguments: {err}")))
}

/// Telemetry preview limits for log output.
pub const TELEMETRY_PREVIEW_MAX_BYTES: usize = 2 * 1024; // 2 KiB
pub const TELEMETRY_PREVIEW_MAX_LINES: usize = 64;

/// Default limit for file reading operations.
pub const DEFAULT_READ_LIMIT: usize = 2000;

/// Maximum line length before truncation.
pub const MAX_LINE_LENGTH: usize = 2000;

/// Default timeout for command execution in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000; // 2 minutes

/// Maximum timeout for command execution in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 600_000; // 10 minutes

/// Truncate text to a maximum byte length, respecting UTF-8 boundaries.
pub fn truncate_text(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }

    // Find the last valid char boundary within max_bytes
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    if end == 0 {
        return String::new();
    }

    format!("{}... [truncated]", &text[..end])
}

/// Truncate output by lines, keeping first and last portions.
pub fn truncate_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let total = lines.len();

    if total <= max_lines {
        return output.to_string();
    }

    // Keep first half and last half
    let keep = max_lines / 2;
    let first_part: Vec<&str> = lines.iter().take(keep).copied().collect();
    let last_part: Vec<&str> = lines.iter().skip(total - keep).copied().collect();
    let omitted = total - max_lines;

    format!(
        "{}\n\n... [{omitted} lines omitted] ...\n\n{}",
        first_part.join("\n"),
        last_part.join("\n")
    )
}
