// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Agent module - Core agentic orchestration.
//!
//! The agent orchestrates the conversation between the user, model, and tools.
//! It implements the agentic loop: send message -> receive response -> execute tools -> repeat.
//!
//! # Example
//!
//! ```rust,ignore
//! use aq::agent::{Agent, AgentConfig, AgentOptions, AgentCallbacks};
//! use aq::tools::ToolRegistry;
//! use aq::providers::anthropic;
//! use std::sync::Arc;
//!
//! // Create provider and tool registry
//! let provider = anthropic("claude-sonnet-4-20250514")?;
//! let registry = Arc::new(ToolRegistry::with_defaults());
//!
//! // Create agent
//! let mut agent = Agent::new(AgentOptions {
//!     provider,
//!     tool_registry: registry,
//!     system_prompt: Some("You are a helpful assistant.".to_string()),
//!     config: AgentConfig::default(),
//!     callbacks: AgentCallbacks::default(),
//! });
//!
//! // Chat
//! let response = agent.chat("Hello!").await?;
//! println!("{}", response);
//! ```

mod types;

pub mod path_approval;
pub mod scheduler;

pub use path_approval::PathApprovalTracker;
pub use scheduler::{Scheduler, ScheduledOutcome, ToolCallStatus};
pub use types::{
    AgentCallbacks, AgentConfig, AgentOptions, AgentState,
    ConfirmationResult, ToolConfirmation,
    TurnStats, TurnToolCall,
    DESTRUCTIVE_TOOLS,
};

/// Tools exposed to the model while plan mode is active: read-only
/// inspection plus the planning tool itself, never file mutation or shell
/// execution.
pub const PLAN_MODE_TOOLS: &[&str] = &[
    "glob",
    "grep_search",
    "read_file",
    "list_directory",
    "google_web_search",
    "ask_user",
    "activate_skill",
    "exit_plan_mode",
];

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::bus::RunBus;
use crate::error::{AgentError, Result};
use crate::types::{
    BoxedProvider, ContentBlock, Message, Role, StreamEvent,
    ToolCall, ToolDefinition, ToolResult,
};
use crate::tools::ToolRegistry;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// The Agent orchestrates the conversation between the user, model, and tools.
pub struct Agent {
    /// AI provider.
    provider: BoxedProvider,
    /// Tool registry.
    tool_registry: Arc<ToolRegistry>,
    /// System prompt.
    system_prompt: String,
    /// Configuration.
    config: AgentConfig,
    /// Event callbacks.
    callbacks: AgentCallbacks,
    /// Internal state.
    state: AgentState,
    /// Confirmation/ask-user message bus shared with the UI layer.
    bus: Arc<RunBus>,
    /// Session-scoped "always allow outside cwd" grant.
    path_approval: Arc<PathApprovalTracker>,
    /// Working directory tool calls are resolved against for path approval.
    cwd: std::path::PathBuf,
}

impl Agent {
    /// Create a new agent with the given options.
    pub fn new(options: AgentOptions) -> Self {
        let system_prompt = options.system_prompt.unwrap_or_else(|| {
            "You are a helpful AI assistant.".to_string()
        });

        Self {
            provider: options.provider,
            tool_registry: options.tool_registry,
            system_prompt,
            config: options.config,
            callbacks: options.callbacks,
            state: AgentState::default(),
            bus: Arc::new(RunBus::new()),
            path_approval: Arc::new(PathApprovalTracker::new()),
            cwd: std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from(".")),
        }
    }

    /// The message bus other components (TUI confirmation prompts, ask-user
    /// dialogs) use to answer requests raised while this agent is running.
    pub fn bus(&self) -> Arc<RunBus> {
        Arc::clone(&self.bus)
    }

    /// The session's path-approval grant, shared with the scheduler.
    pub fn path_approval(&self) -> Arc<PathApprovalTracker> {
        Arc::clone(&self.path_approval)
    }

    /// Override the working directory tool calls are resolved against for
    /// out-of-cwd path approval (defaults to the process's current directory).
    pub fn set_cwd(&mut self, cwd: std::path::PathBuf) {
        self.cwd = cwd;
    }

    /// Get the current conversation messages.
    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    /// Get a mutable reference to the messages (for loading sessions).
    pub fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.state.messages
    }

    /// Clear the conversation history.
    pub fn clear(&mut self) {
        self.state = AgentState::default();
    }

    /// Get the system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Set the system prompt.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Get the conversation summary if available.
    pub fn conversation_summary(&self) -> Option<&str> {
        self.state.conversation_summary.as_deref()
    }

    /// Get the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.state.messages.len()
    }

    /// Force context compaction to reduce token usage.
    /// Returns the number of messages that were summarized.
    pub fn compact_context(&mut self) -> usize {
        let msg_count_before = self.state.messages.len();
        self.compact_context_internal();
        msg_count_before.saturating_sub(self.state.messages.len())
    }

    /// Internal implementation of context compaction.
    fn compact_context_internal(&mut self) {
        // Notify that compaction is starting
        if let Some(ref on_compaction) = self.callbacks.on_compaction {
            on_compaction(true);
        }

        let keep_recent = 10; // Keep the last N messages intact
        let msg_count = self.state.messages.len();

        if msg_count <= keep_recent {
            // Not enough messages to compact
            if let Some(ref on_compaction) = self.callbacks.on_compaction {
                on_compaction(false);
            }
            return;
        }

        // Split messages: older ones to summarize, recent ones to keep
        let split_at = msg_count - keep_recent;
        let older_messages: Vec<Message> = self.state.messages.drain(..split_at).collect();

        // Build a simple summary from older messages by extracting text content
        let mut summary_parts: Vec<String> = Vec::new();
        for msg in &older_messages {
            let role = match msg.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::System => "System",
            };
            let text = match &msg.content {
                crate::types::MessageContent::Text(s) => s.clone(),
                crate::types::MessageContent::Blocks(blocks) => {
                    blocks.iter()
                        .filter_map(|b| b.text.as_ref())
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(" ")
                }
            };
            if !text.is_empty() {
                summary_parts.push(format!("{}: {}", role, Self::truncate_str(&text, 200)));
            }
        }

        // Build combined summary, truncating to ~2000 chars
        let new_summary = Self::truncate_str(&summary_parts.join("\n"), 2000);

        // Prepend existing summary if there is one
        if let Some(ref existing) = self.state.conversation_summary {
            let combined = format!("{}\n\n{}", existing, new_summary);
            self.state.conversation_summary = Some(Self::truncate_str(&combined, 4000));
        } else {
            self.state.conversation_summary = Some(new_summary);
        }

        // Recalculate running_char_count from remaining messages
        self.state.running_char_count = self.state.messages.iter()
            .map(|m| self.message_char_count(m))
            .sum();

        tracing::info!(
            "Context compacted: removed {} messages, {} remaining",
            split_at,
            self.state.messages.len()
        );

        // Notify that compaction is complete
        if let Some(ref on_compaction) = self.callbacks.on_compaction {
            on_compaction(false);
        }
    }

    /// Get tool definitions if tools are enabled and supported, restricted to
    /// the read-only [`PLAN_MODE_TOOLS`] subset while plan mode is active.
    fn get_tool_definitions(&self) -> Option<Vec<ToolDefinition>> {
        if !self.config.use_tools || !self.provider.supports_tool_use() {
            return None;
        }
        if self.state.plan_mode {
            Some(self.tool_registry.definitions_filtered(PLAN_MODE_TOOLS))
        } else {
            Some(self.tool_registry.definitions())
        }
    }

    /// Whether the agent is currently restricted to the plan-mode tool subset.
    pub fn plan_mode(&self) -> bool {
        self.state.plan_mode
    }

    /// Enter or leave plan mode.
    pub fn set_plan_mode(&mut self, enabled: bool) {
        self.state.plan_mode = enabled;
    }

    /// Number of consecutive identical call signatures that mark a loop.
    const LOOP_DETECTION_THRESHOLD: usize = 4;
    /// Size of the sliding window of recent call signatures to retain.
    const LOOP_DETECTION_WINDOW: usize = Self::LOOP_DETECTION_THRESHOLD * 2;
    /// Hard cap on turns regardless of `config.max_iterations`.
    const HARD_TURN_CAP: usize = 100;

    /// Record this turn's call signatures and report whether the last
    /// `LOOP_DETECTION_THRESHOLD` are all identical (a stuck tool-call loop).
    fn detect_loop(&mut self, tool_calls: &[ToolCall]) -> bool {
        let signature = tool_calls
            .iter()
            .map(|c| format!("{}:{}", c.name, c.input))
            .collect::<Vec<_>>()
            .join("|");

        self.state.recent_call_signatures.push_back(signature);
        while self.state.recent_call_signatures.len() > Self::LOOP_DETECTION_WINDOW {
            self.state.recent_call_signatures.pop_front();
        }

        let window = &self.state.recent_call_signatures;
        if window.len() < Self::LOOP_DETECTION_THRESHOLD {
            return false;
        }
        let last_n: Vec<&String> = window.iter().rev().take(Self::LOOP_DETECTION_THRESHOLD).collect();
        last_n.windows(2).all(|w| w[0] == w[1])
    }

    /// Build the system context including any conversation summary.
    fn build_system_context(&self) -> String {
        let mut context = self.system_prompt.clone();

        if let Some(ref summary) = self.state.conversation_summary {
            context.push_str("\n\n## Previous Conversation Summary\n");
            context.push_str(summary);
        }

        context
    }

    /// Estimate the current token count of all messages.
    /// Uses the standard approximation of ~4 characters per token.
    /// Leverages `running_char_count` to avoid re-serializing every message each iteration.
    fn estimate_tokens(&self) -> usize {
        let mut total_chars: usize = self.state.running_char_count;

        // Add system prompt + summary (not cached — these are cheap to measure)
        total_chars += self.system_prompt.len();
        if let Some(ref summary) = self.state.conversation_summary {
            total_chars += summary.len();
        }

        total_chars / 4
    }

    /// Count the characters in a message's content.
    fn message_char_count(&self, msg: &Message) -> usize {
        match &msg.content {
            crate::types::MessageContent::Text(s) => s.len(),
            crate::types::MessageContent::Blocks(blocks) => {
                blocks.iter().map(|b| {
                    let mut n = 0;
                    if let Some(ref t) = b.text { n += t.len(); }
                    if let Some(ref name) = b.name { n += name.len(); }
                    if let Some(ref input) = b.input {
                        n += input.to_string().len();
                    }
                    if let Some(ref content) = b.content { n += content.len(); }
                    n
                }).sum()
            }
        }
    }

    /// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
    /// Safe for multi-byte UTF-8 (truncates at char boundary).
    fn truncate_str(s: &str, max_chars: usize) -> String {
        if s.chars().count() <= max_chars {
            s.to_string()
        } else {
            let truncated: String = s.chars().take(max_chars).collect();
            format!("{}...", truncated)
        }
    }

    /// Process tool calls from a response through the scheduler: calls the
    /// handlers themselves judge safe run in parallel, calls that need a
    /// human decision go through [`RunBus::request_confirmation`] one at a
    /// time. `on_confirm`, when set, is consulted first as a synchronous
    /// override (used by the CLI's inline rustyline prompt); otherwise the
    /// scheduler blocks on the bus, which the TUI answers asynchronously.
    async fn process_tool_calls(
        &self,
        tool_calls: &[ToolCall],
        turn_stats: &mut TurnStats,
        cancel_rx: &watch::Receiver<bool>,
    ) -> std::result::Result<(Vec<ToolResult>, bool), AgentError> {
        if let Some(ref on_confirm) = self.callbacks.on_confirm {
            return self
                .process_tool_calls_sync(tool_calls, turn_stats, on_confirm.as_ref())
                .await;
        }

        let scheduler = Scheduler::new(
            Arc::clone(&self.tool_registry),
            Arc::clone(&self.bus),
            Arc::clone(&self.path_approval),
            self.cwd.clone(),
        );

        let outcomes = scheduler
            .run(tool_calls, &self.config, cancel_rx)
            .await
            .map_err(AgentError::Scheduler)?;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut has_error = false;

        for outcome in outcomes {
            if let Some(ref on_tool_call) = self.callbacks.on_tool_call {
                if let Some(call) = tool_calls.iter().find(|c| c.id == outcome.call_id) {
                    on_tool_call(&call.id, &call.name, &call.input);
                }
            }
            if let Some(ref on_tool_result) = self.callbacks.on_tool_result {
                on_tool_result(
                    &outcome.result.tool_use_id,
                    &outcome.stat.name,
                    &outcome.result.content,
                    outcome.stat.is_error,
                );
            }

            turn_stats.tool_call_count += 1;
            if outcome.stat.is_error {
                has_error = true;
            }
            turn_stats.tool_calls.push(outcome.stat);
            results.push(outcome.result);
        }

        Ok((results, has_error))
    }

    /// Legacy synchronous confirmation path, preserved for callers that
    /// still supply `AgentCallbacks::on_confirm` (a blocking prompt on the
    /// calling thread) instead of answering through the bus.
    async fn process_tool_calls_sync(
        &self,
        tool_calls: &[ToolCall],
        turn_stats: &mut TurnStats,
        on_confirm: &(dyn Fn(ToolConfirmation) -> ConfirmationResult + Send + Sync),
    ) -> std::result::Result<(Vec<ToolResult>, bool), AgentError> {
        let mut results = Vec::with_capacity(tool_calls.len());
        let mut aborted = false;
        let mut has_error = false;

        for tool_call in tool_calls {
            let is_builtin_dangerous = DESTRUCTIVE_TOOLS.contains(&tool_call.name.as_str());
            let needs_builtin_confirm =
                is_builtin_dangerous && !self.config.should_auto_approve(&tool_call.name);
            let pattern_match = if !self.config.dangerous_patterns.is_empty() {
                self.config.matches_dangerous_pattern(&tool_call.input.to_string())
            } else {
                None
            };

            if needs_builtin_confirm || pattern_match.is_some() {
                let confirmation = ToolConfirmation {
                    tool_name: tool_call.name.clone(),
                    input: tool_call.input.clone(),
                    is_dangerous: is_builtin_dangerous || pattern_match.is_some(),
                    danger_reason: pattern_match.map(|p| format!("Matches dangerous pattern: {p}")),
                };
                match on_confirm(confirmation) {
                    ConfirmationResult::Approve => {}
                    ConfirmationResult::Deny => {
                        results.push(ToolResult {
                            tool_use_id: tool_call.id.clone(),
                            content: "User denied this operation. Please try a different approach.".to_string(),
                            is_error: Some(true),
                        });
                        has_error = true;
                        continue;
                    }
                    ConfirmationResult::Abort => {
                        results.push(ToolResult {
                            tool_use_id: tool_call.id.clone(),
                            content: "User aborted the operation.".to_string(),
                            is_error: Some(true),
                        });
                        aborted = true;
                        break;
                    }
                }
            }

            if let Some(ref on_tool_call) = self.callbacks.on_tool_call {
                on_tool_call(&tool_call.id, &tool_call.name, &tool_call.input);
            }

            let start = Instant::now();
            let result = self
                .tool_registry
                .dispatch(&tool_call.name, tool_call.input.clone())
                .await;
            let duration_ms = start.elapsed().as_millis() as u64;

            #[cfg(feature = "telemetry")]
            if let Ok(ref dr) = result {
                GLOBAL_METRICS.record_tool(&tool_call.name, dr.duration, dr.is_error);
            }

            let tool_result = match result {
                Ok(dr) => ToolResult {
                    tool_use_id: tool_call.id.clone(),
                    content: dr.output.content().to_string(),
                    is_error: if dr.is_error { Some(true) } else { None },
                },
                Err(e) => ToolResult {
                    tool_use_id: tool_call.id.clone(),
                    content: format!("Error: {e}"),
                    is_error: Some(true),
                },
            };

            let is_err = tool_result.is_error.unwrap_or(false);
            if let Some(ref on_tool_result) = self.callbacks.on_tool_result {
                on_tool_result(&tool_call.id, &tool_call.name, &tool_result.content, is_err);
            }

            turn_stats.tool_call_count += 1;
            turn_stats.tool_calls.push(TurnToolCall {
                name: tool_call.name.clone(),
                duration_ms,
                is_error: is_err,
            });
            if is_err {
                has_error = true;
            }
            results.push(tool_result);
        }

        if aborted {
            Err(AgentError::UserCancelled)
        } else {
            Ok((results, has_error))
        }
    }

    /// Add tool results to the message history.
    fn add_tool_results(&mut self, results: Vec<ToolResult>) {
        let content: Vec<ContentBlock> = results
            .into_iter()
            .map(|r| ContentBlock::tool_result(&r.tool_use_id, &r.content, r.is_error.unwrap_or(false)))
            .collect();

        let msg = Message {
            role: Role::User,
            content: crate::types::MessageContent::Blocks(content),
        };
        self.state.running_char_count += self.message_char_count(&msg);
        self.state.messages.push(msg);
    }

    /// The main agentic loop.
    ///
    /// Takes a user message, sends it to the model, handles any tool calls,
    /// and returns the final text response.
    pub async fn chat(&mut self, user_message: &str) -> Result<String> {
        self.chat_with_cancel_internal(user_message, None).await
    }

    /// The main agentic loop with a cancellation signal.
    ///
    /// If `cancel_rx` is triggered, the request short-circuits with
    /// `AgentError::UserCancelled`.
    pub async fn chat_with_cancel(
        &mut self,
        user_message: &str,
        cancel_rx: watch::Receiver<bool>,
    ) -> Result<String> {
        self.chat_with_cancel_internal(user_message, Some(cancel_rx)).await
    }

    async fn chat_with_cancel_internal(
        &mut self,
        user_message: &str,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> Result<String> {
        let mut cancel_rx = cancel_rx;
        let start_time = Instant::now();
        let max_duration = Duration::from_millis(self.config.max_turn_duration_ms);

        // Initialize turn stats
        let mut turn_stats = TurnStats::default();

        // Add user message to history
        let user_msg = Message::user(user_message);
        self.state.running_char_count += self.message_char_count(&user_msg);
        self.state.messages.push(user_msg);

        // Reset iteration state
        self.state.current_iteration = 0;
        self.state.consecutive_errors = 0;

        let mut final_response = String::new();

        // Main loop
        loop {
            if let Some(rx) = cancel_rx.as_ref() {
                if *rx.borrow() {
                    return Err(AgentError::UserCancelled.into());
                }
            }

            self.state.current_iteration += 1;

            // Check iteration limit
            if self.state.current_iteration > self.config.max_iterations {
                final_response.push_str("\n\n(Reached iteration limit, stopping)");
                break;
            }

            // Hard cap regardless of configuration, applied silently.
            if self.state.current_iteration > Self::HARD_TURN_CAP {
                break;
            }

            // Check time limit
            if start_time.elapsed() > max_duration {
                final_response.push_str("\n\n(Reached time limit, stopping)");
                break;
            }

            // Before any turn past the first, see if the history has grown
            // large enough to warrant compression.
            if self.state.current_iteration > 1 {
                let token_limit = self.provider.context_window() as u64;
                let result = crate::session::compress(
                    &self.state.messages,
                    self.provider.as_ref(),
                    self.state.last_prompt_tokens,
                    token_limit,
                )
                .await;

                if result.status == crate::session::CompressionStatus::Compressed {
                    self.state.messages = result.messages;
                    self.state.running_char_count = self
                        .state
                        .messages
                        .iter()
                        .map(|m| self.message_char_count(m))
                        .sum();
                    self.state.last_prompt_tokens = Some(result.new_tokens);
                    tracing::info!(
                        "Context compressed: {} -> {} estimated tokens",
                        result.original_tokens,
                        result.new_tokens
                    );
                    if let Some(ref on_compaction) = self.callbacks.on_compaction {
                        on_compaction(false);
                    }
                }
            }

            // Build request parameters
            let tools = self.get_tool_definitions();
            let system_context = self.build_system_context();

            // Clone callbacks for the streaming closure (Arc clones are cheap)
            let on_text = self.callbacks.on_text.clone();
            let on_stream_event = self.callbacks.on_stream_event.clone();

            // Call the provider with streaming, retrying transient failures
            // (rate limits, network blips) with linear backoff.
            if let Some(rx) = cancel_rx.as_ref() {
                if *rx.borrow() {
                    return Err(AgentError::UserCancelled.into());
                }
            }
            let response = crate::providers::stream_chat_with_retry(
                self.provider.as_ref(),
                &self.state.messages,
                tools.as_deref(),
                Some(&system_context),
                Box::new(move |event| {
                    // Forward raw stream events
                    if let Some(ref cb) = on_stream_event {
                        cb(&event);
                    }
                    // Fire on_text for text deltas
                    if let StreamEvent::TextDelta(ref text) = event {
                        if let Some(ref cb) = on_text {
                            cb(text);
                        }
                    }
                }),
                cancel_rx.as_mut(),
            )
            .await;
            let response = match response {
                Ok(response) => response,
                Err(err) => {
                    if cancel_rx.as_ref().is_some_and(|rx| *rx.borrow()) {
                        return Err(AgentError::UserCancelled.into());
                    }
                    return Err(err.into());
                }
            };

            // Update token stats
            if let Some(ref usage) = response.usage {
                turn_stats.input_tokens += usage.input_tokens as u64;
                turn_stats.output_tokens += usage.output_tokens as u64;
                turn_stats.total_tokens = turn_stats.input_tokens + turn_stats.output_tokens;
                self.state.last_prompt_tokens = Some(usage.input_tokens as u64);
            }

            // Store final response text
            if !response.content.is_empty() {
                final_response = response.content.clone();
            }

            // Build assistant message
            let mut assistant_blocks: Vec<ContentBlock> = Vec::new();

            if !response.content.is_empty() {
                assistant_blocks.push(ContentBlock::text(&response.content));
            }

            for tc in &response.tool_calls {
                assistant_blocks.push(ContentBlock::tool_use(&tc.id, &tc.name, tc.input.clone()));
            }

            if !assistant_blocks.is_empty() {
                let assistant_msg = Message {
                    role: Role::Assistant,
                    content: crate::types::MessageContent::Blocks(assistant_blocks),
                };
                self.state.running_char_count += self.message_char_count(&assistant_msg);
                self.state.messages.push(assistant_msg);
            }

            // If no tool calls, we're done
            if response.tool_calls.is_empty() {
                break;
            }

            if self.detect_loop(&response.tool_calls) {
                final_response.push_str("\n\n(Stopped: the same tool call repeated too many times)");
                break;
            }

            // Process tool calls
            let tool_result = if let Some(rx) = cancel_rx.as_mut() {
                if *rx.borrow() {
                    return Err(AgentError::UserCancelled.into());
                }
                let rx_snapshot = rx.clone();
                tokio::select! {
                    res = self.process_tool_calls(&response.tool_calls, &mut turn_stats, &rx_snapshot) => res,
                    _ = rx.changed() => {
                        if *rx.borrow() {
                            return Err(AgentError::UserCancelled.into());
                        }
                        continue;
                    }
                }
            } else {
                let (_never_tx, never_rx) = watch::channel(false);
                self.process_tool_calls(&response.tool_calls, &mut turn_stats, &never_rx).await
            };

            match tool_result {
                Ok((results, has_error)) => {
                    if self.state.plan_mode {
                        let exited = response
                            .tool_calls
                            .iter()
                            .any(|tc| tc.name == "exit_plan_mode")
                            && results.iter().any(|r| r.is_error != Some(true));
                        if exited {
                            self.set_plan_mode(false);
                        }
                    }

                    // Add tool results to history
                    self.add_tool_results(results);

                    // Track consecutive errors
                    if has_error {
                        self.state.consecutive_errors += 1;
                        if self.state.consecutive_errors >= self.config.max_consecutive_errors {
                            final_response.push_str("\n\n(Stopping due to repeated errors)");
                            break;
                        }
                    } else {
                        self.state.consecutive_errors = 0;
                    }
                }
                Err(AgentError::UserCancelled) => {
                    final_response.push_str("\n\n(Operation aborted by user)");
                    break;
                }
                Err(e) => {
                    return Err(e.into());
                }
            }
        }

        // Calculate duration
        turn_stats.duration_ms = start_time.elapsed().as_millis() as u64;

        // Record telemetry
        #[cfg(feature = "telemetry")]
        {
            GLOBAL_METRICS.record_operation("agent.chat", start_time.elapsed());
            GLOBAL_METRICS.record_tokens(turn_stats.input_tokens, turn_stats.output_tokens);
        }

        // Notify turn complete
        if let Some(ref on_turn_complete) = self.callbacks.on_turn_complete {
            on_turn_complete(&turn_stats);
        }

        Ok(final_response)
    }

    /// Chat with streaming output.
    ///
    /// Alias for `chat()` - streaming is now built into the main chat loop
    /// via `provider.stream_chat()`.
    pub async fn stream_chat(&mut self, user_message: &str) -> Result<String> {
        self.chat(user_message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::watch;
    use tokio::time::Duration;

    use crate::error::ProviderError;
    use crate::types::{Provider, ProviderResponse};

    #[test]
    fn test_agent_config_default() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.max_consecutive_errors, 3);
        assert!(config.use_tools);
    }

    #[test]
    fn test_agent_config_auto_approve() {
        let mut config = AgentConfig::default();

        // Not auto-approved by default
        assert!(!config.should_auto_approve("bash"));

        // Add to auto-approve list
        config.auto_approve_tools.push("bash".to_string());
        assert!(config.should_auto_approve("bash"));

        // Auto-approve all
        config.auto_approve_all = true;
        assert!(config.should_auto_approve("any_tool"));
    }

    #[test]
    fn test_agent_config_requires_confirmation() {
        let config = AgentConfig::default();

        // Destructive tools require confirmation
        assert!(config.requires_confirmation("bash"));
        assert!(config.requires_confirmation("write_file"));
        assert!(config.requires_confirmation("edit_file"));

        // Non-destructive tools don't
        assert!(!config.requires_confirmation("read_file"));
        assert!(!config.requires_confirmation("glob"));
    }

    #[test]
    fn test_turn_stats_default() {
        let stats = TurnStats::default();
        assert_eq!(stats.tool_call_count, 0);
        assert_eq!(stats.input_tokens, 0);
        assert_eq!(stats.output_tokens, 0);
    }

    #[test]
    fn test_confirmation_result() {
        assert_eq!(ConfirmationResult::Approve, ConfirmationResult::Approve);
        assert_ne!(ConfirmationResult::Approve, ConfirmationResult::Deny);
    }

    #[test]
    fn test_truncate_str_short() {
        assert_eq!(Agent::truncate_str("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_str_exact() {
        assert_eq!(Agent::truncate_str("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_str_long() {
        let result = Agent::truncate_str("hello world", 5);
        assert_eq!(result, "hello...");
    }

    #[test]
    fn test_truncate_str_multibyte() {
        // "café" is 5 bytes but 4 chars — should not panic
        let result = Agent::truncate_str("café!", 4);
        assert_eq!(result, "café...");
    }

    #[test]
    fn test_truncate_str_emoji() {
        // Emoji are multi-byte — slicing at byte boundary would panic
        let input = "hello 🌍 world";
        let result = Agent::truncate_str(input, 7);
        assert!(result.ends_with("..."));
        assert!(!result.contains("world"));
    }

    #[test]
    fn test_agent_state_default_running_char_count() {
        let state = AgentState::default();
        assert_eq!(state.running_char_count, 0);
    }

    #[test]
    fn test_dangerous_pattern_match() {
        let mut config = AgentConfig::default();
        config.dangerous_patterns = vec![
            r"rm\s+-rf".to_string(),
            r"sudo\s+".to_string(),
        ];

        assert_eq!(
            config.matches_dangerous_pattern("rm -rf /"),
            Some(r"rm\s+-rf".to_string())
        );
        assert_eq!(
            config.matches_dangerous_pattern("sudo apt install"),
            Some(r"sudo\s+".to_string())
        );
        assert_eq!(
            config.matches_dangerous_pattern("echo hello"),
            None,
        );
    }

    #[test]
    fn test_dangerous_pattern_empty() {
        let config = AgentConfig::default();
        assert!(config.dangerous_patterns.is_empty());
        assert_eq!(config.matches_dangerous_pattern("rm -rf /"), None);
    }

    #[test]
    fn test_dangerous_pattern_invalid_regex_skipped() {
        let mut config = AgentConfig::default();
        config.dangerous_patterns = vec![
            "[invalid".to_string(),  // bad regex
            r"rm\s+-rf".to_string(), // valid
        ];

        // Should skip the invalid pattern gracefully and still match the valid one
        assert_eq!(
            config.matches_dangerous_pattern("rm -rf /"),
            Some(r"rm\s+-rf".to_string())
        );
        // Invalid pattern should not cause a panic
        assert_eq!(config.matches_dangerous_pattern("hello"), None);
    }

    struct SlowProvider {
        delay: Duration,
    }

    #[async_trait]
    impl Provider for SlowProvider {
        async fn chat(
            &self,
            _messages: &[Message],
            _tools: Option<&[ToolDefinition]>,
            _system_prompt: Option<&str>,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.stream_chat(_messages, _tools, _system_prompt, Box::new(|_| {}))
                .await
        }

        async fn stream_chat(
            &self,
            _messages: &[Message],
            _tools: Option<&[ToolDefinition]>,
            _system_prompt: Option<&str>,
            on_event: Box<dyn Fn(StreamEvent) + Send + Sync>,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            on_event(StreamEvent::TextDelta("partial".to_string()));
            tokio::time::sleep(self.delay).await;
            Ok(ProviderResponse::text("done"))
        }

        fn supports_tool_use(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow-model"
        }
    }

    #[tokio::test]
    async fn test_chat_with_cancel_returns_user_cancelled() {
        let provider: BoxedProvider = Box::new(SlowProvider {
            delay: Duration::from_millis(200),
        });
        let registry = Arc::new(ToolRegistry::with_defaults());
        let mut agent = Agent::new(AgentOptions {
            provider,
            tool_registry: registry,
            system_prompt: None,
            config: AgentConfig::default(),
            callbacks: AgentCallbacks::default(),
        });

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(true);
        });

        let result = agent.chat_with_cancel("hello", rx).await;
        let err = result.unwrap_err();
        let cancelled = err
            .downcast_ref::<AgentError>()
            .is_some_and(|e| matches!(e, AgentError::UserCancelled));
        assert!(cancelled);
    }
}
