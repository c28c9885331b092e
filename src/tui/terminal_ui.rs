// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Terminal-style UI for aq.
//!
//! This module provides a traditional terminal interface (like a shell REPL)
//! instead of a full-screen TUI. It behaves like a normal terminal with:
//! - Scrollable history (you can scroll up to see previous output)
//! - Standard line input with visible typing
//! - No alternate screen mode
//! - Normal terminal behavior

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Instant;

use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    ExecutableCommand,
};

use crate::agent::{AgentCallbacks, AgentConfig, AgentOptions, TurnStats};
use crate::bus::{AskUserResponseEnvelope, ConfirmationOutcome, RunBus, ToolConfirmationResponseEnvelope};
use crate::config::ResolvedConfig;
use crate::providers::create_provider_from_config;
use crate::tools::invocation::ConfirmationDetails;
use crate::tools::ToolRegistry;
use crate::tui::context_collector::ContextCollector;
use crate::tui::input::{Action, ConfirmKind, TerminalStateMachine};
use crate::tui::prompt_assembler::{AssemblyContext, PromptAssembler};

use super::app::App;
use super::commands::{execute_async_command, handle_command, CommandResult};

/// Run the terminal-style REPL.
pub async fn run_terminal_repl(
    config: &ResolvedConfig,
    auto_approve: bool,
    debug_mode: bool,
) -> anyhow::Result<()> {
    // Print welcome banner
    print_welcome(config)?;
    
    if debug_mode {
        println!("⚙  Debug mode enabled - tool calls will be shown");
        println!();
    }
    
    // Create app state
    let mut app = TerminalApp::new(config.clone(), auto_approve, debug_mode).await?;
    
    // Main loop
    loop {
        // Get input from user with visible prompt
        let input = get_input_with_prompt()?;
        
        if input.trim().is_empty() {
            continue;
        }
        
        let trimmed = input.trim();
        
        // Handle commands
        if trimmed.starts_with('/') {
            match handle_command(&mut app.app, trimmed) {
                CommandResult::Ok => {
                    // Check for debug toggle command
                    if trimmed == "/debug" {
                        app.debug_mode = !app.debug_mode;
                        if app.debug_mode {
                            println!("⚙  Debug mode enabled - tool calls will be shown");
                        } else {
                            println!("⚙  Debug mode disabled");
                        }
                        continue;
                    }
                    
                    // Check if we should exit
                    if app.app.should_quit {
                        println!("Goodbye!");
                        break;
                    }
                }
                CommandResult::Async(cmd) => {
                    // Execute async command and handle result
                    match execute_async_command(&mut app.app, cmd).await {
                        CommandResult::Ok => {
                            if app.app.should_quit {
                                println!("Goodbye!");
                                break;
                            }
                        }
                        CommandResult::Error(msg) => {
                            eprintln!("Error: {}", msg);
                        }
                        _ => {}
                    }
                }
                CommandResult::Prompt(prompt) => {
                    // Send prompt to AI
                    if let Err(e) = app.send_message(&prompt).await {
                        eprintln!("Error: {}", e);
                    }
                }
                CommandResult::Error(msg) => {
                    eprintln!("Error: {}", msg);
                }
            }
        } else if let Some(rest) = trimmed.strip_prefix('@') {
            // The `@` trigger: hand the line to the agent with the full
            // assembled system prompt (terminal context, discovered
            // skills/sub-agents, plan-mode-aware sections) instead of the
            // plain fallback preamble.
            let rest = rest.trim_start();
            if let Err(e) = app.send_message_with_assembled_prompt(rest).await {
                eprintln!("Error: {}", e);
            }
        } else {
            // Regular chat message
            if let Err(e) = app.send_message(trimmed).await {
                eprintln!("Error: {}", e);
            }
        }
    }

    Ok(())
}

/// Get input with a prompt, handling visible typing
fn get_input_with_prompt() -> anyhow::Result<String> {
    use std::io::{self, Write};
    
    // Print prompt
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Cyan))?;
    stdout.execute(Print("› "))?;
    stdout.execute(ResetColor)?;
    stdout.flush()?;
    
    // Read line - this shows visible typing
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    
    Ok(input)
}

/// Terminal app wrapper.
pub struct TerminalApp {
    pub app: App,
    pub config: ResolvedConfig,
    pub tool_registry: Arc<ToolRegistry>,
    pub debug_mode: bool,
    /// Buffers everything printed to the terminal this session, ANSI-free,
    /// so an `@`-triggered turn can hand the agent a `<terminal_context>`
    /// block of recent activity.
    context: ContextCollector,
}

impl TerminalApp {
    pub async fn new(config: ResolvedConfig, auto_approve: bool, debug_mode: bool) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let mut app = App::with_project_path(&cwd);

        app.set_config(config.clone());
        app.set_auto_approve(auto_approve);

        let tool_registry = Arc::new(ToolRegistry::with_defaults());
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "sh".to_string());

        Ok(Self {
            app,
            config,
            tool_registry,
            debug_mode,
            context: ContextCollector::new(cwd.display().to_string(), shell),
        })
    }

    /// Send `content` to the agent using the plain fallback system prompt.
    pub async fn send_message(&mut self, content: &str) -> anyhow::Result<()> {
        self.run_turn(content, None).await
    }

    /// Send `content` to the agent using the fully assembled system prompt
    /// (terminal context, discovered sub-agents/skills, plan-mode-aware
    /// sections) — the real entry point for the `@`-trigger.
    pub async fn send_message_with_assembled_prompt(&mut self, content: &str) -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let tool_names = self.tool_registry.tool_names();
        let terminal_context = self.context.to_prompt_string(50);
        let ctx = AssemblyContext {
            config: Some(&self.config),
            terminal_context: Some(&terminal_context),
            ..AssemblyContext::new(Some(&self.config), &cwd, &tool_names)
        };
        let system_prompt = PromptAssembler::assemble(&ctx);
        self.run_turn(content, Some(system_prompt)).await
    }

    async fn run_turn(
        &mut self,
        content: &str,
        system_prompt: Option<String>,
    ) -> anyhow::Result<()> {
        // Print user message with prefix
        print_user_message(content);
        self.context.push_output(&format!("> {}\n", content));

        // Create provider fresh each time (can't clone it)
        let provider = create_provider_from_config(&self.config)?;

        // Setup agent callbacks for streaming
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<StreamEvent>();

        // Clone content for the spawned task
        let content_owned = content.to_string();

        let callbacks = if self.debug_mode {
            AgentCallbacks {
                on_text: Some(Arc::new({
                    let tx = tx.clone();
                    move |text: &str| {
                        let _ = tx.send(StreamEvent::Text(text.to_string()));
                    }
                })),
                on_tool_call: Some(Arc::new({
                    let tx = tx.clone();
                    move |_id: &str, name: &str, input: &serde_json::Value| {
                        let _ = tx.send(StreamEvent::ToolStart(name.to_string(), input.clone()));
                    }
                })),
                on_tool_result: Some(Arc::new({
                    let tx = tx.clone();
                    move |_id: &str, _name: &str, result: &str, is_error: bool| {
                        let _ = tx.send(StreamEvent::ToolResult(result.to_string(), is_error));
                    }
                })),
                on_turn_complete: Some(Arc::new({
                    let tx = tx.clone();
                    move |stats: &TurnStats| {
                        let _ = tx.send(StreamEvent::TurnComplete(stats.clone()));
                    }
                })),
                ..Default::default()
            }
        } else {
            AgentCallbacks {
                on_text: Some(Arc::new({
                    let tx = tx.clone();
                    move |text: &str| {
                        let _ = tx.send(StreamEvent::Text(text.to_string()));
                    }
                })),
                on_tool_call: None,
                on_tool_result: None,
                on_turn_complete: Some(Arc::new({
                    let tx = tx.clone();
                    move |stats: &TurnStats| {
                        let _ = tx.send(StreamEvent::TurnComplete(stats.clone()));
                    }
                })),
                ..Default::default()
            }
        };
        
        // Create agent config
        let agent_config = AgentConfig {
            use_tools: true,
            auto_approve_all: self.app.auto_approve_all(),
            ..Default::default()
        };

        // Create agent
        let mut agent = crate::agent::Agent::new(AgentOptions {
            provider,
            tool_registry: self.tool_registry.clone(),
            system_prompt,
            config: agent_config,
            callbacks,
        });

        // The scheduler blocks on the bus for tool confirmations and
        // ask_user prompts; drive those prompts from a background task so
        // the turn never deadlocks (see `drive_bus_prompts`).
        let bus = agent.bus();
        let bus_task = tokio::spawn(drive_bus_prompts(bus));

        // Run chat in background with owned content
        let chat_handle = tokio::spawn(async move {
            agent.chat(&content_owned).await
        });

        // Print assistant prefix
        print_assistant_start();

        // Stream output
        let mut stdout = io::stdout();
        let start_time = Instant::now();
        let mut in_tool_call = false;

        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Text(text) => {
                    if in_tool_call {
                        println!();
                        print_assistant_start();
                        in_tool_call = false;
                    }
                    print!("{}", text);
                    stdout.flush()?;
                    self.context.push_output(&text);
                }
                StreamEvent::ToolStart(name, _input) => {
                    in_tool_call = true;
                    println!();
                    print_tool_start(&name);
                    self.context.push_output(&format!("\nRunning: {}\n", name));
                }
                StreamEvent::ToolResult(result, is_error) => {
                    // Show result in debug mode
                    print_tool_result(&result, is_error);
                    self.context.push_output(&result);
                }
                StreamEvent::TurnComplete(_stats) => {
                    break;
                }
            }
        }

        // Wait for chat to complete
        let _ = chat_handle.await?;
        self.context.flush_partial();
        bus_task.abort();

        // Print elapsed time
        let elapsed = start_time.elapsed();
        if elapsed.as_secs() > 0 {
            print_elapsed(elapsed.as_secs_f64());
        }

        println!(); // Final newline

        Ok(())
    }
}

/// Answers `ToolConfirmationRequest`/`AskUserRequest` events published on
/// `bus` by prompting the user for a single keypress (confirmations) or a
/// line of input (ask_user), driven through [`TerminalStateMachine`] so the
/// raw bytes read from stdin go through the same state transitions a
/// full-screen UI would use. Runs until the bus's broadcast channels close
/// (the agent, and with it its `RunBus`, has been dropped) or the caller
/// aborts the task.
async fn drive_bus_prompts(bus: Arc<RunBus>) {
    let mut confirm_rx = bus.confirmations.subscribe();
    let mut ask_rx = bus.asks.subscribe();
    loop {
        tokio::select! {
            res = confirm_rx.recv() => {
                match res {
                    Ok(ToolConfirmationResponseEnvelope::Request(req)) => {
                        let outcome = prompt_confirmation(&req.details).await;
                        bus.answer_confirmation(req.call_id, outcome);
                    }
                    Ok(ToolConfirmationResponseEnvelope::Response(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                }
            }
            res = ask_rx.recv() => {
                match res {
                    Ok(AskUserResponseEnvelope::Request(req)) => {
                        let answer = prompt_ask_user(&req.question).await;
                        bus.answer_ask_user(req.call_id, answer);
                    }
                    Ok(AskUserResponseEnvelope::Response(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                }
            }
        }
    }
}

/// Prints a confirmation prompt and blocks (off the async executor, via
/// `spawn_blocking`) reading raw bytes in terminal raw mode until
/// `TerminalStateMachine` resolves an `Action::Confirm`.
async fn prompt_confirmation(details: &ConfirmationDetails) -> ConfirmationOutcome {
    let kind = match details {
        ConfirmationDetails::PathAccess { .. } => ConfirmKind::PathAccess,
        ConfirmationDetails::Exec { .. } | ConfirmationDetails::Edit { .. } => ConfirmKind::Simple,
    };

    println!();
    println!("⚠ {}: {}", details.title(), details.describe());
    match kind {
        ConfirmKind::PathAccess => println!("[Enter] proceed once   [y] proceed always   [Ctrl+C] cancel"),
        ConfirmKind::Simple => println!("[Enter] proceed once   [Ctrl+C] cancel"),
    }
    let _ = io::stdout().flush();

    tokio::task::spawn_blocking(move || read_confirmation_blocking(kind))
        .await
        .unwrap_or(ConfirmationOutcome::Cancel)
}

fn read_confirmation_blocking(kind: ConfirmKind) -> ConfirmationOutcome {
    let mut machine = TerminalStateMachine::new();
    machine.enter_confirming(kind);
    if crossterm::terminal::enable_raw_mode().is_err() {
        return ConfirmationOutcome::Cancel;
    }
    let mut buf = [0u8; 1];
    let outcome = loop {
        if io::stdin().read_exact(&mut buf).is_err() {
            break ConfirmationOutcome::Cancel;
        }
        let actions = machine.feed(buf[0]);
        if let Some(outcome) = actions.into_iter().find_map(|a| match a {
            Action::Confirm(outcome) => Some(outcome),
            _ => None,
        }) {
            break outcome;
        }
    };
    let _ = crossterm::terminal::disable_raw_mode();
    outcome
}

/// Prints an ask_user prompt and blocks reading a raw-mode line, echoing
/// keystrokes as `TerminalStateMachine` reports them.
async fn prompt_ask_user(question: &str) -> String {
    println!();
    println!("❓ {}", question);
    let _ = io::stdout().flush();

    tokio::task::spawn_blocking(read_ask_user_blocking)
        .await
        .unwrap_or_default()
}

fn read_ask_user_blocking() -> String {
    let mut machine = TerminalStateMachine::new();
    machine.enter_asking();
    if crossterm::terminal::enable_raw_mode().is_err() {
        return String::new();
    }
    let mut buf = [0u8; 1];
    let answer = loop {
        if io::stdin().read_exact(&mut buf).is_err() {
            break String::new();
        }
        let mut submitted = None;
        for action in machine.feed(buf[0]) {
            match action {
                Action::SubmitAsk(answer) => submitted = Some(answer),
                Action::EchoLocal(bytes) => {
                    let _ = io::stdout().write_all(&bytes);
                    let _ = io::stdout().flush();
                }
                Action::EraseEcho => {
                    let _ = io::stdout().write_all(b"\x08 \x08");
                    let _ = io::stdout().flush();
                }
                _ => {}
            }
        }
        if let Some(answer) = submitted {
            break answer;
        }
    };
    let _ = crossterm::terminal::disable_raw_mode();
    answer
}

#[derive(Debug)]
enum StreamEvent {
    Text(String),
    ToolStart(String, serde_json::Value),
    ToolResult(String, bool),
    TurnComplete(TurnStats),
}

fn print_welcome(config: &ResolvedConfig) -> anyhow::Result<()> {
    use std::io::{self, Write};
    
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Cyan))?;
    stdout.execute(Print("╭─────────────────────────────────────╮\n"))?;
    stdout.execute(Print("│        aq - AI Coding Agent     │\n"))?;
    stdout.execute(Print("╰─────────────────────────────────────╯\n"))?;
    stdout.execute(ResetColor)?;
    
    writeln!(stdout, "Model: {}", config.provider)?;
    if let Some(ref model) = config.model {
        writeln!(stdout, "  → {}", model)?;
    }
    writeln!(stdout)?;
    writeln!(stdout, "Type /help for commands, /debug to toggle tool visibility, or just start chatting!")?;
    writeln!(stdout)?;
    stdout.flush()?;
    
    Ok(())
}

fn print_user_message(content: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
    use crossterm::ExecutableCommand;
    use std::io::{self, Write};
    
    let mut stdout = io::stdout();
    let _ = stdout.execute(SetForegroundColor(Color::Cyan));
    let _ = stdout.execute(Print("› "));
    let _ = stdout.execute(ResetColor);
    let _ = stdout.execute(Print(content));
    let _ = stdout.execute(Print("\n"));
    let _ = stdout.flush();
}

fn print_assistant_start() {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
    use crossterm::ExecutableCommand;
    use std::io::{self, Write};
    
    let mut stdout = io::stdout();
    let _ = stdout.execute(SetForegroundColor(Color::Grey));
    let _ = stdout.execute(Print("• "));
    let _ = stdout.execute(ResetColor);
    let _ = stdout.flush();
}

fn print_tool_start(name: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
    use crossterm::ExecutableCommand;
    use std::io::{self, Write};
    
    let mut stdout = io::stdout();
    let _ = stdout.execute(SetForegroundColor(Color::Yellow));
    let _ = stdout.execute(Print(format!("◐ Running: {}...", name)));
    let _ = stdout.execute(ResetColor);
    let _ = stdout.flush();
}

fn print_tool_result(result: &str, is_error: bool) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
    use crossterm::ExecutableCommand;
    use std::io::{self, Write};
    
    let mut stdout = io::stdout();
    
    // Truncate very long results
    let display_result = if result.len() > 500 {
        format!("{}... [truncated {} more chars]", &result[..500], result.len() - 500)
    } else {
        result.to_string()
    };
    
    // Format as indented JSON if possible
    let formatted = if let Ok(json) = serde_json::from_str::<serde_json::Value>(result) {
        serde_json::to_string_pretty(&json).unwrap_or_else(|_| display_result)
    } else {
        display_result
    };
    
    println!();
    
    if is_error {
        let _ = stdout.execute(SetForegroundColor(Color::Red));
        let _ = stdout.execute(Print("✗ Failed:\n"));
    } else {
        let _ = stdout.execute(SetForegroundColor(Color::Green));
        let _ = stdout.execute(Print("✓ Result:\n"));
    }
    let _ = stdout.execute(ResetColor);
    
    // Print indented result
    for line in formatted.lines() {
        let _ = stdout.execute(Print(format!("  {}\n", line)));
    }
    let _ = stdout.flush();
}

fn print_elapsed(seconds: f64) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
    use crossterm::ExecutableCommand;
    use std::io::{self, Write};
    
    let mut stdout = io::stdout();
    let _ = stdout.execute(SetForegroundColor(Color::DarkGrey));
    let _ = stdout.execute(Print(format!(" ({:.1}s)", seconds)));
    let _ = stdout.execute(ResetColor);
    let _ = stdout.flush();
}
