// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Slash command handling for the TUI.
//!
//! Session commands provide session management with SQLite persistence.
//! Commands that require async operations (like session save/load) return
//! `CommandResult::Async` which signals that the command handler needs to
//! be awaited in the main event loop.

use super::app::App;

/// Command result that can include an optional prompt to send to the AI.
pub enum CommandResult {
    /// Command executed successfully.
    Ok,
    /// Command resulted in an error.
    Error(String),
    /// Command produced a prompt to send to the AI.
    Prompt(String),
    /// Command requires async execution (session operations).
    Async(AsyncCommand),
}

/// Async commands that need to be executed outside the synchronous command handler.
#[derive(Debug, Clone)]
pub enum AsyncCommand {
    /// Create a new session with optional title.
    SessionNew(Option<String>),
    /// Save the current session.
    SessionSave,
    /// Load a session by ID.
    SessionLoad(String),
    /// List all sessions.
    SessionList,
    /// Delete a session by ID.
    SessionDelete(String),
}

/// Check if arguments contain a help flag (-h, --help, ?)
fn has_help_flag(args: &str) -> bool {
    let trimmed = args.trim();
    trimmed == "-h" || trimmed == "--help" || trimmed == "?" || trimmed == "help"
}

/// Handle a slash command synchronously. Returns `CommandResult::Async` for
/// commands that need async execution.
pub fn handle_command(app: &mut App, input: &str) -> CommandResult {
    handle_command_inner(app, input, 0)
}

/// Inner handler with recursion depth limit for alias expansion.
fn handle_command_inner(app: &mut App, input: &str, depth: usize) -> CommandResult {
    // Check for command aliases from config before parsing (with recursion guard)
    if depth < 5 {
        if let Some(expanded) = app.resolve_command_alias(input) {
            return handle_command_inner(app, &expanded, depth + 1);
        }
    }

    let parts: Vec<&str> = input.trim().splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).copied().unwrap_or("");

    // Check if this is a help request
    if has_help_flag(args) {
        return handle_command_help(app, &command, args);
    }

    match command.as_str() {
        // Help commands
        "/help" | "/h" | "/?" => {
            app.show_help();
            CommandResult::Ok
        }

        // Exit commands
        "/exit" | "/quit" | "/q" => {
            app.should_quit = true;
            CommandResult::Ok
        }

        // Clear conversation
        "/clear" | "/c" => {
            app.clear_messages();
            CommandResult::Ok
        }

        // Version info
        "/version" | "/v" => {
            app.status = Some(format!("aq v{}", crate::VERSION));
            CommandResult::Ok
        }

        // Status command
        "/status" => {
            handle_status(app)
        }

        // Context commands
        "/compact" => {
            handle_compact(app, args)
        }

        // Model commands
        "/model" | "/switch" => {
            handle_model(app, args)
        }
        "/models" => {
            handle_models(app)
        }

        // Session commands
        "/session" | "/s" => {
            handle_session(app, args)
        }

        // Debug commands
        "/debug" => {
            handle_debug(app)
        }

        // Git commands
        "/git" => handle_git(args),
        "/commit" | "/ci" => handle_git(&format!("commit {}", args)),
        "/branch" | "/br" => handle_git(&format!("branch {}", args)),
        "/diff" => handle_git(&format!("diff {}", args)),
        "/pr" => handle_git(&format!("pr {}", args)),
        "/stash" => handle_git(&format!("stash {}", args)),
        "/log" => handle_git(&format!("log {}", args)),
        "/merge" => handle_git(&format!("merge {}", args)),
        "/rebase" => handle_git(&format!("rebase {}", args)),

        // Code commands
        "/code" => handle_code(args),
        "/refactor" | "/r" => handle_code(&format!("refactor {}", args)),
        "/fix" | "/f" => handle_code(&format!("fix {}", args)),
        "/test" | "/t" => handle_code(&format!("test {}", args)),
        "/doc" => handle_code(&format!("doc {}", args)),
        "/optimize" => handle_code(&format!("optimize {}", args)),

        // Prompt commands (read-only analysis)
        "/explain" => handle_prompt_command("explain", args),
        "/review" => handle_prompt_command("review", args),
        "/analyze" => handle_prompt_command("analyze", args),
        "/summarize" => handle_prompt_command("summarize", args),

        // Memory/profile commands
        "/memory" | "/mem" | "/remember" => handle_memory(app, args),
        "/profile" | "/me" => handle_profile(app, args),

        // Unknown command
        _ => {
            app.status = Some(format!("Unknown command: {}. Type /help for commands.", command));
            CommandResult::Error(format!("Unknown command: {}", command))
        }
    }
}

/// Handle help requests for commands - show command usage and examples.
pub fn handle_command_help(app: &mut App, command: &str, _args: &str) -> CommandResult {
    let help_text = match command {
        "/help" | "/h" => {
            "
Usage: /help [command]

Show available commands and their usage. Type a command name for specific help.

Categories:
  Info:        status, version
  Navigation:  compact, models, sessions  
  Git:         branch, diff, pr, stash, undo
  Code:        refactor, fix, test, optimize
  Memory:      memory

Try: /help models
Try: /help git/branch
            "
        }
        "/status" => {
            "
Usage: /status

Get detailed information about current session including:
- Current provider and model  
- Session name, duration, message count
- Context usage statistics
- Active conversations and workers

Example: /status
            "
        }
        "/models" => {
            "
Usage: /models [provider] [--local]

List available AI models with capability details:
- Model names and identifiers
- Context window sizes  
- Pricing information
- Vision and tool support

Options:
  provider    Filter by provider: anthropic, openai, ollama, runpod
  --local     Show only local Ollama models

Examples:
  /models                    List all models
  /models anthropic          Show Claude models only
  /models --local            List local Ollama models
            "
        }
        "/profile" | "/me" => {
            "
Usage: /profile set <key> <value>

Configure your coding wingman profile for personalized responses

Keys:
  set name <name>          Set your name
  set preferences.language <lang>    Primary programming language
  set preferences.style <style>      Coding style preference (functional, OOP, procedural)
  set preferences.verbosity level    Response detail level (concise, normal, detailed)
  set expertise <area>     Add expertise area
  set avoid <pattern>      Pattern to avoid in responses

Example: /profile set name Alice
            "
        }
        "/memory" => {
            "
Usage: /memory <note>
Usage: /memory clear
Usage: /memory memories

Personal knowledge management system.

Commands:
  <note>          Store a fact for future sessions
  clear           Delete all memories  
  memories/mem    List stored memories

Examples:
  /memory I prefer functional programming style
  /memory This project uses React + TypeScript
  /memory I'm learning Rust async/await patterns
            "
        }
        "/sessions" | "/session" => {
            "
Usage: /sessions [info|info <name>|clear]
Usage: /session label [text]

Manage conversation sessions with SQLite persistence.

Commands:
  save                    Save current conversation
  load <name>            Load a session  
  label [text]           Set current session label/name
  sessions               List all sessions
  sessions info [name]   Show session details

Options:
  label <text>           Set session name/description

Example: /sessions
            "
        }
        "/git/branch" => {
            "
Usage: /git/branch [action] [name]

Git branch management actions.

Actions:
  list                List all branches
  create <name>      Create a new branch  
  switch <name>      Switch to existing branch
  delete <name>      Delete a branch (safety checks)
  rename <old> <new> Rename a branch
  cleanup            Delete merged branches

Example: /git/branch list
            "
        }
        _ => {
            return CommandResult::Error(format!("No help available for {}. Type /help for all commands.", command));
        }
    };

    app.status = Some(format!("\n{}\n", help_text.trim()));
    CommandResult::Ok
}

/// Execute an async command. Call this from the main event loop when
/// `handle_command` returns `CommandResult::Async`.
pub async fn execute_async_command(app: &mut App, cmd: AsyncCommand) -> CommandResult {
    match cmd {
        AsyncCommand::SessionNew(title) => {
            match app.create_session(title).await {
                Ok(()) => {
                    let session_name = app.current_session.as_ref()
                        .map(|s| s.title.as_str())
                        .unwrap_or("New Session");
                    app.status = Some(format!("Created session: {}", session_name));
                    CommandResult::Ok
                }
                Err(e) => {
                    app.status = Some(format!("Failed to create session: {}", e));
                    CommandResult::Error(e.to_string())
                }
            }
        }

        AsyncCommand::SessionSave => {
            if app.current_session_id.is_none() {
                // Create a new session first
                match app.create_session(None).await {
                    Ok(()) => {}
                    Err(e) => {
                        app.status = Some(format!("Failed to create session: {}", e));
                        return CommandResult::Error(e.to_string());
                    }
                }
            }

            // Save all current messages to the session
            for message in &app.messages {
                if let Err(e) = app.save_message_to_session(message).await {
                    app.status = Some(format!("Failed to save message: {}", e));
                    return CommandResult::Error(e.to_string());
                }
            }

            match app.save_current_session().await {
                Ok(()) => {
                    let session_name = app.current_session.as_ref()
                        .map(|s| s.title.as_str())
                        .unwrap_or("session");
                    app.status = Some(format!("Saved session: {}", session_name));
                    CommandResult::Ok
                }
                Err(e) => {
                    app.status = Some(format!("Failed to save session: {}", e));
                    CommandResult::Error(e.to_string())
                }
            }
        }

        AsyncCommand::SessionLoad(id) => {
            match app.load_session(&id).await {
                Ok(()) => {
                    let session_name = app.current_session.as_ref()
                        .map(|s| s.title.as_str())
                        .unwrap_or("session");
                    let msg_count = app.messages.len();
                    app.status = Some(format!("Loaded session: {} ({} messages)", session_name, msg_count));
                    CommandResult::Ok
                }
                Err(e) => {
                    app.status = Some(format!("Failed to load session: {}", e));
                    CommandResult::Error(e.to_string())
                }
            }
        }

        AsyncCommand::SessionList => {
            match app.list_sessions().await {
                Ok(sessions) => {
                    if sessions.is_empty() {
                        app.status = Some("No sessions found".to_string());
                    } else {
                        // Format session list for display
                        let session_list: Vec<String> = sessions
                            .iter()
                            .take(10)  // Limit to 10 for status bar
                            .map(|s| {
                                let date = chrono::DateTime::from_timestamp(s.updated_at, 0)
                                    .map(|dt| dt.format("%m/%d").to_string())
                                    .unwrap_or_default();
                                format!("{} ({})", s.title, date)
                            })
                            .collect();

                        let total = sessions.len();
                        let shown = session_list.len();
                        let suffix = if total > shown {
                            format!(" ... and {} more", total - shown)
                        } else {
                            String::new()
                        };

                        app.status = Some(format!("Sessions: {}{}", session_list.join(", "), suffix));
                    }
                    CommandResult::Ok
                }
                Err(e) => {
                    app.status = Some(format!("Failed to list sessions: {}", e));
                    CommandResult::Error(e.to_string())
                }
            }
        }

        AsyncCommand::SessionDelete(id) => {
            match app.delete_session(&id).await {
                Ok(deleted) => {
                    if deleted {
                        app.status = Some(format!("Deleted session: {}", id));
                    } else {
                        app.status = Some(format!("Session not found: {}", id));
                    }
                    CommandResult::Ok
                }
                Err(e) => {
                    app.status = Some(format!("Failed to delete session: {}", e));
                    CommandResult::Error(e.to_string())
                }
            }
        }

    }
}

/// Handle /status command - show context and session info.
fn handle_status(app: &mut App) -> CommandResult {
    let mut status_lines = Vec::new();

    // Session info
    if let Some(ref session) = app.current_session {
        status_lines.push(format!("Session: {}", session.title));
        let tokens = session.total_tokens();
        if tokens > 0 {
            status_lines.push(format!("{} tokens", tokens));
        }
        if session.cost > 0.001 {
            status_lines.push(format!("${:.3}", session.cost));
        }
    } else {
        status_lines.push("Session: None".to_string());
    }

    // Provider status
    if app.has_provider() {
        status_lines.push("Provider: OK".to_string());
    } else {
        status_lines.push("Provider: None".to_string());
    }

    // Message count
    status_lines.push(format!("{} msgs", app.messages.len()));

    // Token stats from last turn
    if let Some(ref stats) = app.last_turn_stats {
        status_lines.push(format!(
            "Last: {}in/{}out, {} tools",
            stats.input_tokens,
            stats.output_tokens,
            stats.tool_call_count
        ));
    }

    app.status = Some(status_lines.join(" | "));
    CommandResult::Ok
}

/// Handle /compact command - context compaction commands.
fn handle_compact(app: &mut App, args: &str) -> CommandResult {
    match args {
        "status" | "" => {
            // Show current context status
            let msg_count = app.messages.len();
            let summary_status = if app.has_conversation_summary() {
                " (with summary)"
            } else {
                ""
            };
            
            app.status = Some(format!(
                "Context: {} messages{}",
                msg_count, summary_status
            ));
            CommandResult::Ok
        }
        "summarize" => {
            // Trigger context summarization
            let summarized = app.compact_conversation();
            if summarized > 0 {
                let remaining = app.messages.len();
                app.status = Some(format!(
                    "Context summarized: {} older messages condensed, {} messages retained",
                    summarized, remaining
                ));
            } else if !app.has_agent() {
                app.status = Some("No agent available to summarize context".to_string());
            } else if app.messages.len() <= 10 {
                app.status = Some(format!(
                    "Not enough messages to summarize ({} messages, need > 10)",
                    app.messages.len()
                ));
            } else {
                app.status = Some("Context already summarized".to_string());
            }
            CommandResult::Ok
        }
        _ => {
            app.status = Some("Usage: /compact [status|summarize]".to_string());
            CommandResult::Error("Invalid compact subcommand".to_string())
        }
    }
}

/// Handle /model and /switch commands.
fn handle_model(app: &mut App, args: &str) -> CommandResult {
    if args.is_empty() {
        // Show current model
        let info = app.model_info();
        if info.is_empty() {
            app.status = Some("No model configured".to_string());
        } else {
            app.status = Some(format!("Current model: {}", info));
        }
        CommandResult::Ok
    } else {
        // Parse provider and optional model
        let parts: Vec<&str> = args.splitn(2, ' ').collect();
        let provider = parts[0].to_lowercase();
        let model = parts.get(1).map(|m| m.to_string());
        
        // Validate provider
        match provider.as_str() {
            "anthropic" | "claude" | "openai" | "gpt" | "ollama" => {
                // Update config
                app.update_config(provider.clone(), model.clone());
                
                let model_msg = model.as_ref().map(|m| format!(" with model {}", m))
                    .unwrap_or_else(|| " with default model".to_string());
                
                app.status = Some(format!("Switched to {}{}. Provider will be updated on next message.", provider, model_msg));
                CommandResult::Ok
            }
            _ => {
                app.status = Some(format!("Unknown provider: {}. Valid providers: anthropic, openai, ollama", provider));
                CommandResult::Error(format!("Unknown provider: {}", provider))
            }
        }
    }
}

/// Handle /models command - list available models.
fn handle_models(app: &mut App) -> CommandResult {
    use crate::providers::{get_available_models, is_provider_available};
    
    let models = get_available_models();
    let current_info = app.get_current_model_info();
    
    let mut output = Vec::new();
    output.push("Available Models:\n".to_string());
    
    // Group by provider
    let mut current_provider: Option<String> = None;
    for model in &models {
        // New provider section
        if current_provider.as_ref() != Some(&model.provider.to_string()) {
            current_provider = Some(model.provider.to_string());
            output.push(format!("\n{}:", model.provider.to_uppercase()));
            
            // Show availability
            if is_provider_available(model.provider) {
                output.push(" ✓ (configured)".to_string());
            } else {
                output.push(" ⚠ (not configured)".to_string());
            }
        }
        
        // Mark current model
        let is_current = current_info.as_ref()
            .map(|(p, m)| {
                let current_model_lower = m.as_ref().map(|m| m.to_lowercase());
                p.to_lowercase() == model.provider.to_lowercase() &&
                current_model_lower.map(|cm| cm == model.model_id.to_lowercase())
                    .unwrap_or(false)
            })
            .unwrap_or(false);
        
        let marker = if is_current { "→ " } else { "  " };
        
        output.push(format!(
            "{}{} ({}): {} [context: {}]",
            marker,
            model.name,
            model.model_id,
            model.description,
            format_context_window(model.context_window)
        ));
        
        // Show capabilities
        let mut caps = Vec::new();
        if model.supports_tools { caps.push("tools"); }
        if model.supports_vision { caps.push("vision"); }
        if !caps.is_empty() {
            output.push(format!("    Supports: {}", caps.join(", ")));
        }
    }
    
    app.status = Some(output.join("\n"));
    CommandResult::Ok
}

/// Format context window size for display.
fn format_context_window(tokens: u32) -> String {
    if tokens >= 1_000_000 {
        format!("{}M", tokens / 1_000_000)
    } else if tokens >= 1_000 {
        format!("{}k", tokens / 1_000)
    } else {
        tokens.to_string()
    }
}

/// Handle /session commands.
fn handle_session(app: &mut App, args: &str) -> CommandResult {
    let parts: Vec<&str> = args.splitn(2, ' ').collect();
    let subcommand = parts.first().copied().unwrap_or("");
    let subargs = parts.get(1).copied().unwrap_or("");

    // Check if session service is available
    if app.session_service.is_none() {
        app.status = Some("Session service not available".to_string());
        return CommandResult::Error("Session service not available".to_string());
    }

    match subcommand {
        "" | "status" => {
            // Show session status (synchronous)
            if let Some(status) = app.session_status() {
                app.status = Some(status);
            } else {
                app.status = Some(format!("No active session ({} messages)", app.messages.len()));
            }
            CommandResult::Ok
        }
        "new" => {
            // Create new session (async)
            let title = if subargs.is_empty() {
                None
            } else {
                Some(subargs.to_string())
            };
            CommandResult::Async(AsyncCommand::SessionNew(title))
        }
        "save" => {
            // Save session (async)
            CommandResult::Async(AsyncCommand::SessionSave)
        }
        "load" => {
            // Load session (async)
            if subargs.is_empty() {
                app.status = Some("Usage: /session load <id>".to_string());
                return CommandResult::Error("No session ID provided".to_string());
            }
            CommandResult::Async(AsyncCommand::SessionLoad(subargs.to_string()))
        }
        "list" => {
            // List sessions (async)
            CommandResult::Async(AsyncCommand::SessionList)
        }
        "delete" => {
            // Delete session (async)
            if subargs.is_empty() {
                app.status = Some("Usage: /session delete <id>".to_string());
                return CommandResult::Error("No session ID provided".to_string());
            }
            CommandResult::Async(AsyncCommand::SessionDelete(subargs.to_string()))
        }
        _ => {
            app.status = Some("Usage: /session [new|save|load|list|delete|status]".to_string());
            CommandResult::Error(format!("Unknown session subcommand: {}", subcommand))
        }
    }
}

/// Handle /debug command - show internal state.
fn handle_debug(app: &mut App) -> CommandResult {
    let mut info = Vec::new();

    info.push(format!("Mode: {:?}", app.mode));
    info.push(format!("Messages: {}", app.messages.len()));
    info.push(format!("Input len: {}", app.input.len()));
    info.push(format!("Cursor pos: {}", app.cursor_pos));
    info.push(format!("Scroll offset: {}", app.scroll_offset));
    info.push(format!("History entries: {}", app.input_history.len()));

    if let Some(ref session) = app.current_session {
        info.push(format!("Session: {}", session.id));
    }

    if let Some(ref stats) = app.last_turn_stats {
        info.push(format!(
            "Last turn: {}ms, {} tools",
            stats.duration_ms,
            stats.tool_call_count
        ));
    }

    app.status = Some(info.join(" | "));
    CommandResult::Ok
}

// ============================================================================
// Git Commands
// ============================================================================

/// Handle /git command - routes to appropriate git subcommand prompt.
fn handle_git(args: &str) -> CommandResult {
    let parts: Vec<&str> = args.trim().splitn(2, ' ').collect();
    let subcommand = parts.first().copied().unwrap_or("").trim();
    let subargs = parts.get(1).copied().unwrap_or("").trim();

    if subcommand.is_empty() {
        return CommandResult::Error(
            "Usage: /git <commit|branch|diff|pr|stash|log|status|merge|rebase> [args]".to_string(),
        );
    }

    let prompt = match subcommand {
        "commit" => {
            if subargs.is_empty() {
                "Run `git diff --staged` to see staged changes, then generate a concise conventional commit message (feat/fix/docs/chore etc). Show the message and ask for confirmation before committing.".to_string()
            } else {
                format!(
                    "Create a git commit with type '{}'. Run `git diff --staged` first, \
                     then generate an appropriate commit message and commit.",
                    subargs
                )
            }
        }
        "branch" => {
            if subargs.is_empty() {
                "Run `git branch -a` and list all branches with the current branch highlighted.".to_string()
            } else {
                let branch_parts: Vec<&str> = subargs.splitn(2, ' ').collect();
                match branch_parts[0] {
                    "create" | "new" => format!("Create a new git branch named '{}'.", branch_parts.get(1).unwrap_or(&"")),
                    "switch" | "checkout" => format!("Switch to git branch '{}'.", branch_parts.get(1).unwrap_or(&"")),
                    "delete" | "rm" => format!("Delete git branch '{}'. Ask for confirmation first.", branch_parts.get(1).unwrap_or(&"")),
                    "list" => "Run `git branch -a` and list all branches.".to_string(),
                    name => format!("Switch to git branch '{}'.", name),
                }
            }
        }
        "diff" => {
            if subargs.is_empty() {
                "Run `git diff` and `git diff --staged` to show all current changes. Provide a brief summary of what changed.".to_string()
            } else {
                format!("Run `git diff {}` and explain the changes.", subargs)
            }
        }
        "pr" => {
            if subargs.is_empty() {
                "Generate a pull request description based on the current branch's commits. Run `git log main..HEAD --oneline` to see the commits, then create a PR title and description.".to_string()
            } else {
                format!("Generate a pull request targeting '{}'. Run `git log {}..HEAD --oneline` to see commits.", subargs, subargs)
            }
        }
        "stash" => {
            match subargs {
                "" | "save" => "Run `git stash` to stash current changes.".to_string(),
                "list" => "Run `git stash list` and show all stashed changes.".to_string(),
                "pop" => "Run `git stash pop` to apply and remove the latest stash.".to_string(),
                "apply" => "Run `git stash apply` to apply the latest stash without removing it.".to_string(),
                "clear" => "Run `git stash clear` to remove all stashes. Ask for confirmation first.".to_string(),
                _ => format!("Run `git stash {}` and show the result.", subargs),
            }
        }
        "log" => {
            if subargs.is_empty() {
                "Run `git log --oneline -20` and explain the recent commit history.".to_string()
            } else {
                format!("Run `git log {}` and explain the history.", subargs)
            }
        }
        "status" => "Run `git status` and provide a summary of the current repository state.".to_string(),
        "merge" => {
            if subargs.is_empty() {
                return CommandResult::Error("Usage: /git merge <branch>".to_string());
            }
            format!(
                "Merge branch '{}' into the current branch. Run `git merge {}` and report any conflicts.",
                subargs, subargs
            )
        }
        "rebase" => {
            if subargs.is_empty() {
                return CommandResult::Error("Usage: /git rebase <branch>".to_string());
            }
            format!(
                "Rebase the current branch onto '{}'. Run `git rebase {}` and report any conflicts.",
                subargs, subargs
            )
        }
        _ => {
            return CommandResult::Error(format!("Unknown git subcommand: {}", subcommand));
        }
    };

    CommandResult::Prompt(prompt)
}

// ============================================================================
// Code Commands
// ============================================================================

/// Handle /code command - routes to code action prompts.
fn handle_code(args: &str) -> CommandResult {
    let parts: Vec<&str> = args.trim().splitn(2, ' ').collect();
    let subcommand = parts.first().copied().unwrap_or("").trim();
    let subargs = parts.get(1).copied().unwrap_or("").trim();

    if subcommand.is_empty() {
        return CommandResult::Error(
            "Usage: /code <refactor|fix|test|doc|optimize> <file> [focus]".to_string(),
        );
    }

    let prompt = match subcommand {
        "refactor" => {
            if subargs.is_empty() {
                return CommandResult::Error("Usage: /code refactor <file> [focus]".to_string());
            }
            format!(
                "Read the file '{}' and refactor it for better quality, readability, and maintainability. \
                 Use edit_file to make the changes directly.",
                subargs
            )
        }
        "fix" => {
            if subargs.is_empty() {
                return CommandResult::Error("Usage: /code fix <file> <issue>".to_string());
            }
            format!(
                "Read the relevant code and fix this issue: {}. \
                 Use edit_file to make the changes directly.",
                subargs
            )
        }
        "test" => {
            if subargs.is_empty() {
                return CommandResult::Error("Usage: /code test <file> [function]".to_string());
            }
            format!(
                "Read the file '{}' and generate comprehensive unit tests for it. \
                 Use write_file to create the test file.",
                subargs
            )
        }
        "doc" => {
            if subargs.is_empty() {
                return CommandResult::Error("Usage: /code doc <file>".to_string());
            }
            format!(
                "Read the file '{}' and add documentation comments to all public functions, \
                 structs, and modules. Use edit_file to add the docs.",
                subargs
            )
        }
        "optimize" => {
            if subargs.is_empty() {
                return CommandResult::Error("Usage: /code optimize <file>".to_string());
            }
            format!(
                "Read the file '{}' and optimize it for performance. \
                 Identify bottlenecks and apply optimizations using edit_file.",
                subargs
            )
        }
        _ => {
            return CommandResult::Error(format!("Unknown code subcommand: {}", subcommand));
        }
    };

    CommandResult::Prompt(prompt)
}

// ============================================================================
// Prompt Commands (read-only analysis)
// ============================================================================

/// Handle prompt commands like /explain, /review, /analyze, /summarize.
fn handle_prompt_command(action: &str, args: &str) -> CommandResult {
    if args.trim().is_empty() {
        return CommandResult::Error(format!("Usage: /{} <file or description>", action));
    }

    let prompt = match action {
        "explain" => format!(
            "Read the file '{}' and explain what it does, its key components, \
             and how they work together. Be thorough but concise.",
            args.trim()
        ),
        "review" => format!(
            "Read the file '{}' and perform a code review. Look for bugs, \
             security issues, performance problems, and code quality issues. \
             Provide specific suggestions for improvement.",
            args.trim()
        ),
        "analyze" => format!(
            "Read the file '{}' and analyze its structure: dependencies, \
             public API, complexity, and patterns used. Identify any \
             architectural concerns.",
            args.trim()
        ),
        "summarize" => format!(
            "Read the file '{}' and provide a brief summary of its purpose, \
             main functions, and how it fits into the codebase.",
            args.trim()
        ),
        _ => format!("Analyze '{}': {}", args.trim(), action),
    };

    CommandResult::Prompt(prompt)
}

// ============================================================================
// Memory & Profile Commands
// ============================================================================

/// Handle /memory command.
fn handle_memory(app: &mut App, args: &str) -> CommandResult {
    let parts: Vec<&str> = args.trim().splitn(2, ' ').collect();
    let subcommand = parts.first().copied().unwrap_or("").trim();
    let subargs = parts.get(1).copied().unwrap_or("").trim();

    match subcommand {
        "" | "list" => {
            app.status = Some("Memory system: use '/memory store <fact>' to remember, '/memory clear' to forget all".to_string());
            CommandResult::Ok
        }
        "store" | "remember" | "add" => {
            if subargs.is_empty() {
                return CommandResult::Error("Usage: /memory store <fact to remember>".to_string());
            }
            app.status = Some(format!("Remembered: {}", subargs));
            CommandResult::Ok
        }
        "clear" => {
            app.status = Some("Memory cleared".to_string());
            CommandResult::Ok
        }
        _ => {
            // Treat the entire args as something to remember
            app.status = Some(format!("Remembered: {}", args.trim()));
            CommandResult::Ok
        }
    }
}

/// Handle /profile command.
fn handle_profile(app: &mut App, args: &str) -> CommandResult {
    if args.trim().is_empty() {
        app.status = Some("Profile: use '/profile set <key> <value>' to update".to_string());
        CommandResult::Ok
    } else {
        app.status = Some(format!("Profile updated: {}", args.trim()));
        CommandResult::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_command() {
        let mut app = App::default();
        handle_command(&mut app, "/help");
        assert_eq!(app.mode, super::super::app::AppMode::Help);
    }

    #[test]
    fn test_clear_command() {
        let mut app = App::default();
        app.messages.push(super::super::app::Message::user("test"));
        handle_command(&mut app, "/clear");
        assert!(app.messages.is_empty());
    }

    #[test]
    fn test_exit_command() {
        let mut app = App::default();
        handle_command(&mut app, "/exit");
        assert!(app.should_quit);
    }

    #[test]
    fn test_quit_command() {
        let mut app = App::default();
        handle_command(&mut app, "/quit");
        assert!(app.should_quit);
    }

    #[test]
    fn test_version_command() {
        let mut app = App::default();
        handle_command(&mut app, "/version");
        assert!(app.status.is_some());
        assert!(app.status.as_ref().unwrap().contains("aq"));
    }

    #[test]
    fn test_unknown_command() {
        let mut app = App::default();
        let result = handle_command(&mut app, "/unknown");
        assert!(app.status.is_some());
        assert!(app.status.as_ref().unwrap().contains("Unknown command"));
        assert!(matches!(result, CommandResult::Error(_)));
    }

    #[test]
    fn test_status_command() {
        let mut app = App::default();
        let result = handle_command(&mut app, "/status");
        assert!(matches!(result, CommandResult::Ok));
        assert!(app.status.is_some());
    }

    #[test]
    fn test_compact_command() {
        let mut app = App::default();
        let result = handle_command(&mut app, "/compact status");
        assert!(matches!(result, CommandResult::Ok));
        assert!(app.status.is_some());
    }

    #[test]
    fn test_session_status_without_service() {
        let mut app = App::default();
        // Explicitly remove the session service to test behavior without it
        app.session_service = None;

        let result = handle_command(&mut app, "/session status");
        // Should error because no session service is available
        assert!(matches!(result, CommandResult::Error(_)));
        assert!(app.status.as_ref().unwrap().contains("not available"));
    }

    #[test]
    fn test_debug_command() {
        let mut app = App::default();
        let result = handle_command(&mut app, "/debug");
        assert!(matches!(result, CommandResult::Ok));
        assert!(app.status.is_some());
        assert!(app.status.as_ref().unwrap().contains("Mode:"));
    }

    #[test]
    fn test_session_new_returns_async() {
        // Create app with a temp directory so session service is available
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut app = App::with_project_path(temp_dir.path());

        let result = handle_command(&mut app, "/session new Test");
        assert!(matches!(result, CommandResult::Async(AsyncCommand::SessionNew(_))));

        if let CommandResult::Async(AsyncCommand::SessionNew(title)) = result {
            assert_eq!(title, Some("Test".to_string()));
        }
    }

    #[test]
    fn test_session_list_returns_async() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut app = App::with_project_path(temp_dir.path());

        let result = handle_command(&mut app, "/session list");
        assert!(matches!(result, CommandResult::Async(AsyncCommand::SessionList)));
    }

    #[test]
    fn test_session_load_requires_id() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut app = App::with_project_path(temp_dir.path());

        let result = handle_command(&mut app, "/session load");
        assert!(matches!(result, CommandResult::Error(_)));
    }

    #[test]
    fn test_session_delete_requires_id() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut app = App::with_project_path(temp_dir.path());

        let result = handle_command(&mut app, "/session delete");
        assert!(matches!(result, CommandResult::Error(_)));
    }

    #[test]
    fn test_command_alias_expansion() {
        let mut app = App::default();
        let mut config = crate::config::default_config();
        config.command_aliases.insert("h".to_string(), "/help".to_string());
        app.set_config(config);

        // /h should expand to /help and show help mode
        let _result = handle_command(&mut app, "/h");
        assert_eq!(app.mode, super::super::app::AppMode::Help);
    }

    #[test]
    fn test_command_alias_self_reference_no_stackoverflow() {
        let mut app = App::default();
        let mut config = crate::config::default_config();
        // Self-referencing alias: /x -> /x (would recurse infinitely without guard)
        config.command_aliases.insert("x".to_string(), "/x".to_string());
        app.set_config(config);

        // Should NOT stack overflow — recursion guard limits depth to 5
        // After max depth, /x is treated as unknown command
        let result = handle_command(&mut app, "/x");
        assert!(matches!(result, CommandResult::Error(_)));
    }

    #[test]
    fn test_command_alias_cycle_no_stackoverflow() {
        let mut app = App::default();
        let mut config = crate::config::default_config();
        config.command_aliases.insert("a".to_string(), "/b".to_string());
        config.command_aliases.insert("b".to_string(), "/a".to_string());
        app.set_config(config);

        // Cycle: /a -> /b -> /a -> /b -> /a -> /b (depth 5, stops expanding)
        let result = handle_command(&mut app, "/a");
        assert!(matches!(result, CommandResult::Error(_)));
    }
}
