// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! aq - an AI coding agent embedded in your terminal.
//!
//! Type `@` at the shell prompt; it takes over the line, collects context,
//! and hands the turn to the agent loop.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Core type definitions (Message, ToolDefinition, ProviderResponse, etc.)
//! - [`error`] - Error types and result aliases
//! - [`config`] - Configuration loading and merging
//! - [`providers`] - AI provider implementations (Anthropic, OpenAI, Ollama)
//! - [`telemetry`] - Tracing, metrics, and observability infrastructure
//! - [`tools`] - Tool handlers and registry
//! - [`agent`] - Core agentic orchestration loop: scheduler, loop detector, plan mode
//! - [`bus`] - Pub/sub and correlated request/response channels for confirmations and user prompts
//! - [`session`] - Session persistence, context windowing, and token compression
//! - [`tui`] - Terminal input state machine, context collector, prompt assembler, REPL
//!
//! # Example
//!
//! ```rust,ignore
//! use aq::config::{load_config, CliOptions};
//! use aq::types::Message;
//!
//! // Load configuration
//! let config = load_config(".", CliOptions::default())?;
//!
//! // Create a message
//! let msg = Message::user("Hello!");
//! ```

pub mod agent;
pub mod bus;
pub mod completion;
pub mod config;
pub mod error;
pub mod providers;
pub mod session;
pub mod telemetry;
pub mod tools;
pub mod tui;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{AgentError, ConfigError, ProviderError, Result, ToolError};
pub use providers::{
    create_provider, create_provider_from_env,
    anthropic, openai, ollama, ollama_at,
    AnthropicProvider, OpenAIProvider, ProviderType,
};
pub use types::{
    // Message types
    ContentBlock, Message, MessageContent, Role,
    // Tool types
    ToolCall, ToolDefinition, ToolResult,
    // Provider types
    BoxedProvider, ModelInfo, Provider, ProviderConfig, ProviderResponse, SharedProvider,
    StopReason, StreamEvent, TokenUsage,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        // Verify key types are accessible
        let _msg = Message::user("test");
        let _response = ProviderResponse::empty();
    }
}
