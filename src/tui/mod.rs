// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Terminal User Interface for aq.
//!
//! This module provides the line-oriented terminal REPL ([`terminal_ui`])
//! that drives interactive conversations with AI models, plus the pieces it
//! composes: application state ([`app`]), slash commands ([`commands`]),
//! the `@`-trigger byte-level input state machine and paste handling
//! ([`input`]), the terminal-output context buffer ([`context_collector`]),
//! system prompt assembly ([`prompt_assembler`]), and markdown streaming
//! ([`streaming`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use aq::tui::terminal_ui::run_terminal_repl;
//!
//! run_terminal_repl(&config, auto_approve, debug_mode).await?;
//! ```

pub mod app;
pub mod commands;
pub mod context_collector;
pub mod input;
pub mod prompt_assembler;
pub mod streaming;
pub mod terminal_ui;

pub use app::{App, AppMode, Message as ChatMessage, build_system_prompt_from_config};
pub use input::{EnhancedInput, KeyCode, KeyEvent, KeyModifiers, ModifierEncoding, SmartInput};
pub use streaming::{MarkdownStreamCollector, StreamController, StreamState, StreamStatus};

#[cfg(test)]
mod tests {
    #[test]
    fn test_module_exports() {
        // Verify key types are accessible
    }
}
