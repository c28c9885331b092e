// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Buffers stripped terminal output and formats it for prompt assembly.
//!
//! Grounded on `session::context`'s existing token-budget windowing (which
//! tracks *conversation* history); this component tracks raw *terminal*
//! activity instead, bounded by line count rather than tokens, and is
//! consulted by the prompt assembler (C13) for `<terminal_context>`.

use once_cell::sync::Lazy;
use regex::Regex;

const MAX_LINES: usize = 100;

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b(\[[0-9;?]*[a-zA-Z]|\][^\x07]*\x07|[()][A-Za-z0-9])").unwrap());

/// Strips ANSI escape sequences (CSI, OSC, charset-select) from a byte chunk.
pub fn strip_ansi(input: &str) -> String {
    ANSI_ESCAPE.replace_all(input, "").replace('\r', "")
}

/// One completed line of terminal activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLine {
    pub text: String,
}

/// A slice of output returned by `get_output_since`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSince {
    pub text: String,
    pub new_checkpoint: usize,
}

/// Bounded, ANSI-free buffer of recent terminal output.
pub struct ContextCollector {
    lines: Vec<ActivityLine>,
    /// Count of lines ever pushed (monotonic), used as the checkpoint space.
    total_pushed: usize,
    partial: String,
    cwd: String,
    shell: String,
}

impl ContextCollector {
    pub fn new(cwd: impl Into<String>, shell: impl Into<String>) -> Self {
        Self {
            lines: Vec::new(),
            total_pushed: 0,
            partial: String::new(),
            cwd: cwd.into(),
            shell: shell.into(),
        }
    }

    /// Current checkpoint: the index to later pass to `get_output_since`.
    pub fn checkpoint(&self) -> usize {
        self.total_pushed
    }

    /// Push a chunk of raw (possibly ANSI-laden) output, splitting it into
    /// completed lines and buffering any trailing partial line.
    pub fn push_output(&mut self, bytes: &str) {
        let cleaned = strip_ansi(bytes);
        self.partial.push_str(&cleaned);
        while let Some(idx) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=idx).collect();
            let line = line.trim_end_matches('\n').to_string();
            self.push_line(line);
        }
    }

    /// Flush any buffered partial line as a completed line (e.g. at a
    /// checkpoint boundary where the shell hasn't yet emitted a newline).
    pub fn flush_partial(&mut self) {
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            self.push_line(line);
        }
    }

    fn push_line(&mut self, text: String) {
        self.lines.push(ActivityLine { text });
        self.total_pushed += 1;
        if self.lines.len() > MAX_LINES {
            let overflow = self.lines.len() - MAX_LINES;
            self.lines.drain(0..overflow);
        }
    }

    /// Lines produced since `checkpoint`, plus a checkpoint to pass next.
    pub fn get_output_since(&self, checkpoint: usize) -> OutputSince {
        let dropped = self.total_pushed.saturating_sub(self.lines.len());
        let start = checkpoint.saturating_sub(dropped).min(self.lines.len());
        let text = self.lines[start..]
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        OutputSince {
            text,
            new_checkpoint: self.total_pushed,
        }
    }

    /// Render a `<terminal_context>` block with cwd, shell, and the last
    /// `max_blocks` lines of raw tail (no block tracker is attached in this
    /// build, so blocks always fall back to the raw-tail form).
    pub fn to_prompt_string(&self, max_blocks: usize) -> String {
        let tail: Vec<&str> = self
            .lines
            .iter()
            .rev()
            .take(max_blocks)
            .rev()
            .map(|l| l.text.as_str())
            .collect();
        format!(
            "<terminal_context>\ncwd: {}\nshell: {}\n{}\n</terminal_context>",
            self.cwd,
            self.shell,
            tail.join("\n")
        )
    }
}
