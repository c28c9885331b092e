// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-session terminal input state machine.
//!
//! Sits between the raw terminal byte stream and the rest of the session,
//! arbitrating between shell passthrough and agent capture. States:
//! `Normal`, `Pending`, `Capturing`, `AgentStreaming`, `AgentConfirming`,
//! `AgentExecuting`, `AgentAsking`.
//!
//! Grounded on `tui::input::enhanced::EnhancedInput`'s escape-sequence
//! parsing idiom (regex-driven CSI/OSC matching, a typed `KeyCode` result),
//! generalized here into an explicit tagged-union state with a single
//! `feed` entry point instead of a one-shot `parse_key_sequence` call.

use std::collections::HashMap;

use crate::bus::ConfirmationOutcome;

const TRIGGER_BYTE: u8 = b'@';
const CTRL_C: u8 = 0x03;
const CTRL_V: u8 = 0x16;
const ESC: u8 = 0x1b;
const BACKSPACE: u8 = 0x7f;
const BACKSPACE_ALT: u8 = 0x08;
const CR: u8 = b'\r';
const LF: u8 = b'\n';

const PASTE_LINE_THRESHOLD: usize = 5;
const PASTE_CHAR_THRESHOLD: usize = 500;
const BRACKETED_PASTE_START: &[u8] = b"\x1b[200~";
const BRACKETED_PASTE_END: &[u8] = b"\x1b[201~";

/// States of the per-session byte pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// Bytes pass straight through; watches for `@` at line start.
    Normal,
    /// `@` was just typed; deciding whether it starts a capture.
    Pending,
    /// Accumulating a natural-language prompt for the agent.
    Capturing,
    /// The agent is streaming a response; only Ctrl+C is honored.
    AgentStreaming,
    /// A tool call is awaiting confirmation; reads a single key.
    AgentConfirming,
    /// A tool call is executing; only Ctrl+C is honored.
    AgentExecuting,
    /// An `ask_user` request is awaiting a line of input.
    AgentAsking,
}

/// Side effects the state machine asks the caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Forward these bytes to the underlying shell/line-editor untouched.
    Forward(Vec<u8>),
    /// Echo these bytes locally (e.g. a colored `@`) without forwarding.
    EchoLocal(Vec<u8>),
    /// Erase the most recent local echo (the user backed out of Pending).
    EraseEcho,
    /// A captured prompt is complete; hand it to the agent.
    SubmitQuery(String),
    /// The user aborted an in-progress capture (Ctrl+C / Escape).
    AbortCapture,
    /// Abort the in-flight agent turn (Ctrl+C during Streaming/Executing).
    Abort,
    /// A confirmation prompt was resolved.
    Confirm(ConfirmationOutcome),
    /// An `ask_user` prompt was resolved with this line (possibly empty).
    SubmitAsk(String),
}

/// Whether the pending confirmation's details permit "always allow".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    /// A plain exec/edit confirmation: only Enter (once) or Ctrl+C (cancel).
    Simple,
    /// A path-access confirmation: 'y'/'Y' also grants ProceedAlways.
    PathAccess,
}

/// Byte-level input state machine for one interactive session.
pub struct TerminalStateMachine {
    state: InputState,
    at_line_start: bool,
    capture_buffer: String,
    visible_buffer: String,
    ask_buffer: String,
    confirm_kind: ConfirmKind,
    paste_accumulator: Option<Vec<u8>>,
    paste_escape_match: usize,
    paste_placeholders: HashMap<String, String>,
    paste_counter: usize,
}

impl TerminalStateMachine {
    pub fn new() -> Self {
        Self {
            state: InputState::Normal,
            at_line_start: true,
            capture_buffer: String::new(),
            visible_buffer: String::new(),
            ask_buffer: String::new(),
            confirm_kind: ConfirmKind::Simple,
            paste_accumulator: None,
            paste_escape_match: 0,
            paste_placeholders: HashMap::new(),
            paste_counter: 0,
        }
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    /// Substitutes placeholders (`[Pasted Text: N lines]`) back into full
    /// text before the captured query is sent to the agent.
    pub fn expand_placeholders(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (placeholder, full) in &self.paste_placeholders {
            out = out.replace(placeholder.as_str(), full.as_str());
        }
        out
    }

    /// Transition into `AgentStreaming` once a captured query has been
    /// handed off to the agent loop.
    pub fn enter_streaming(&mut self) {
        self.state = InputState::AgentStreaming;
    }

    /// Transition into `AgentExecuting` while the scheduler runs a tool.
    pub fn enter_executing(&mut self) {
        self.state = InputState::AgentExecuting;
    }

    /// Transition into `AgentConfirming`, awaiting a single keypress.
    pub fn enter_confirming(&mut self, kind: ConfirmKind) {
        self.confirm_kind = kind;
        self.state = InputState::AgentConfirming;
    }

    /// Transition into `AgentAsking`, awaiting a line of input.
    pub fn enter_asking(&mut self) {
        self.ask_buffer.clear();
        self.state = InputState::AgentAsking;
    }

    /// Return to `Normal` once a turn fully completes.
    pub fn finish_turn(&mut self) {
        self.state = InputState::Normal;
        self.at_line_start = true;
    }

    /// Feed one raw byte and collect the actions it produces.
    pub fn feed(&mut self, byte: u8) -> Vec<Action> {
        // Bracketed-paste markers are recognized before anything else so an
        // embedded CR inside a paste never submits a capture early.
        if let Some(actions) = self.feed_paste_marker(byte) {
            return actions;
        }
        if let Some(acc) = self.paste_accumulator.as_mut() {
            acc.push(byte);
            return Vec::new();
        }

        match self.state {
            InputState::Normal => self.feed_normal(byte),
            InputState::Pending => self.feed_pending(byte),
            InputState::Capturing => self.feed_capturing(byte),
            InputState::AgentStreaming | InputState::AgentExecuting => self.feed_busy(byte),
            InputState::AgentConfirming => self.feed_confirming(byte),
            InputState::AgentAsking => self.feed_asking(byte),
        }
    }

    fn feed_paste_marker(&mut self, byte: u8) -> Option<Vec<Action>> {
        // Only Capturing/AgentAsking accept pastes; elsewhere a stray CSI
        // sequence just passes through byte-by-byte.
        if !matches!(self.state, InputState::Capturing | InputState::AgentAsking) {
            return None;
        }
        let marker = if self.paste_accumulator.is_none() {
            BRACKETED_PASTE_START
        } else {
            BRACKETED_PASTE_END
        };
        if byte == marker[self.paste_escape_match] {
            self.paste_escape_match += 1;
            if self.paste_escape_match == marker.len() {
                self.paste_escape_match = 0;
                if self.paste_accumulator.is_none() {
                    self.paste_accumulator = Some(Vec::new());
                } else {
                    let raw = self.paste_accumulator.take().unwrap();
                    let text = String::from_utf8_lossy(&raw).replace('\r', "\n");
                    return Some(self.append_paste(&text));
                }
            }
            return Some(Vec::new());
        }
        self.paste_escape_match = 0;
        None
    }

    fn append_paste(&mut self, text: &str) -> Vec<Action> {
        let line_count = text.lines().count();
        let needs_collapse =
            line_count > PASTE_LINE_THRESHOLD || text.chars().count() > PASTE_CHAR_THRESHOLD;
        if needs_collapse {
            self.paste_counter += 1;
            let placeholder = if line_count > 1 {
                format!("[Pasted Text: {} lines]", line_count)
            } else {
                format!("[Pasted Text: {} chars]", text.chars().count())
            };
            let placeholder = self.dedupe_placeholder(placeholder);
            self.paste_placeholders
                .insert(placeholder.clone(), text.to_string());
            self.push_target_buffer(&placeholder);
            vec![Action::EchoLocal(placeholder.into_bytes())]
        } else {
            self.push_target_buffer(text);
            vec![Action::EchoLocal(text.as_bytes().to_vec())]
        }
    }

    fn dedupe_placeholder(&self, base: String) -> String {
        if !self.paste_placeholders.contains_key(&base) {
            return base;
        }
        let mut k = 2;
        loop {
            let candidate = format!("{} #{}", base, k);
            if !self.paste_placeholders.contains_key(&candidate) {
                return candidate;
            }
            k += 1;
        }
    }

    fn push_target_buffer(&mut self, s: &str) {
        match self.state {
            InputState::AgentAsking => self.ask_buffer.push_str(s),
            _ => self.capture_buffer.push_str(s),
        }
    }

    fn feed_normal(&mut self, byte: u8) -> Vec<Action> {
        if byte == TRIGGER_BYTE && self.at_line_start {
            self.state = InputState::Pending;
            return vec![Action::EchoLocal(vec![TRIGGER_BYTE])];
        }
        self.at_line_start = byte == CR || byte == LF;
        vec![Action::Forward(vec![byte])]
    }

    fn feed_pending(&mut self, byte: u8) -> Vec<Action> {
        match byte {
            b' ' => {
                self.state = InputState::Capturing;
                self.capture_buffer.clear();
                self.visible_buffer.clear();
                vec![Action::EchoLocal(vec![b' '])]
            }
            BACKSPACE | BACKSPACE_ALT => {
                self.state = InputState::Normal;
                self.at_line_start = true;
                vec![Action::EraseEcho]
            }
            CTRL_V => {
                self.state = InputState::Capturing;
                self.capture_buffer.clear();
                self.visible_buffer.clear();
                vec![Action::EchoLocal(b" ".to_vec())]
            }
            other => {
                self.state = InputState::Normal;
                self.at_line_start = other == CR || other == LF;
                vec![Action::EraseEcho, Action::Forward(vec![TRIGGER_BYTE, other])]
            }
        }
    }

    fn feed_capturing(&mut self, byte: u8) -> Vec<Action> {
        match byte {
            CR | LF => {
                let submitted = self.expand_placeholders(&self.capture_buffer);
                self.capture_buffer.clear();
                self.paste_placeholders.clear();
                vec![Action::SubmitQuery(submitted)]
            }
            BACKSPACE | BACKSPACE_ALT => {
                self.capture_buffer.pop();
                vec![Action::EraseEcho]
            }
            CTRL_C | ESC => {
                self.capture_buffer.clear();
                self.paste_placeholders.clear();
                self.state = InputState::Normal;
                self.at_line_start = true;
                vec![Action::AbortCapture]
            }
            printable => {
                self.capture_buffer.push(printable as char);
                vec![Action::EchoLocal(vec![printable])]
            }
        }
    }

    fn feed_busy(&mut self, byte: u8) -> Vec<Action> {
        if byte == CTRL_C {
            vec![Action::Abort]
        } else {
            Vec::new()
        }
    }

    fn feed_confirming(&mut self, byte: u8) -> Vec<Action> {
        match byte {
            CR | LF => {
                self.state = InputState::Normal;
                vec![Action::Confirm(ConfirmationOutcome::ProceedOnce)]
            }
            b'y' | b'Y' if self.confirm_kind == ConfirmKind::PathAccess => {
                self.state = InputState::Normal;
                vec![Action::Confirm(ConfirmationOutcome::ProceedAlways)]
            }
            CTRL_C => {
                self.state = InputState::Normal;
                vec![Action::Confirm(ConfirmationOutcome::Cancel)]
            }
            _ => Vec::new(),
        }
    }

    fn feed_asking(&mut self, byte: u8) -> Vec<Action> {
        match byte {
            CR | LF => {
                let answer = self.ask_buffer.clone();
                self.ask_buffer.clear();
                self.state = InputState::Normal;
                vec![Action::SubmitAsk(answer)]
            }
            CTRL_C => {
                self.ask_buffer.clear();
                self.state = InputState::Normal;
                vec![Action::SubmitAsk(String::new())]
            }
            BACKSPACE | BACKSPACE_ALT => {
                self.ask_buffer.pop();
                vec![Action::EraseEcho]
            }
            printable => {
                self.ask_buffer.push(printable as char);
                vec![Action::EchoLocal(vec![printable])]
            }
        }
    }
}

impl Default for TerminalStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_str(m: &mut TerminalStateMachine, s: &str) -> Vec<Action> {
        let mut actions = Vec::new();
        for b in s.bytes() {
            actions.extend(m.feed(b));
        }
        actions
    }

    #[test]
    fn at_line_start_trigger_enters_pending() {
        let mut m = TerminalStateMachine::new();
        m.feed(b'@');
        assert_eq!(m.state(), InputState::Pending);
    }

    #[test]
    fn trigger_mid_line_passes_through() {
        let mut m = TerminalStateMachine::new();
        m.feed(b'l');
        assert_eq!(m.state(), InputState::Normal);
        let actions = m.feed(b'@');
        assert_eq!(actions, vec![Action::Forward(vec![b'@'])]);
        assert_eq!(m.state(), InputState::Normal);
    }

    #[test]
    fn space_after_pending_starts_capture() {
        let mut m = TerminalStateMachine::new();
        m.feed(b'@');
        m.feed(b' ');
        assert_eq!(m.state(), InputState::Capturing);
    }

    #[test]
    fn backspace_in_pending_returns_to_normal() {
        let mut m = TerminalStateMachine::new();
        m.feed(b'@');
        let actions = m.feed(BACKSPACE);
        assert_eq!(actions, vec![Action::EraseEcho]);
        assert_eq!(m.state(), InputState::Normal);
    }

    #[test]
    fn enter_submits_captured_query() {
        let mut m = TerminalStateMachine::new();
        m.feed(b'@');
        m.feed(b' ');
        let actions = feed_str(&mut m, "fix the bug\r");
        assert_eq!(
            actions.last(),
            Some(&Action::SubmitQuery("fix the bug".to_string()))
        );
    }

    #[test]
    fn ctrl_c_aborts_capture() {
        let mut m = TerminalStateMachine::new();
        m.feed(b'@');
        m.feed(b' ');
        feed_str(&mut m, "partial");
        let actions = m.feed(CTRL_C);
        assert_eq!(actions, vec![Action::AbortCapture]);
        assert_eq!(m.state(), InputState::Normal);
    }

    #[test]
    fn ctrl_c_aborts_agent_streaming() {
        let mut m = TerminalStateMachine::new();
        m.enter_streaming();
        let actions = m.feed(CTRL_C);
        assert_eq!(actions, vec![Action::Abort]);
    }

    #[test]
    fn other_bytes_ignored_while_streaming() {
        let mut m = TerminalStateMachine::new();
        m.enter_streaming();
        assert!(m.feed(b'x').is_empty());
    }

    #[test]
    fn confirming_enter_proceeds_once() {
        let mut m = TerminalStateMachine::new();
        m.enter_confirming(ConfirmKind::Simple);
        let actions = m.feed(CR);
        assert_eq!(
            actions,
            vec![Action::Confirm(ConfirmationOutcome::ProceedOnce)]
        );
    }

    #[test]
    fn confirming_y_only_grants_always_for_path_access() {
        let mut m = TerminalStateMachine::new();
        m.enter_confirming(ConfirmKind::Simple);
        assert!(m.feed(b'y').is_empty());
        assert_eq!(m.state(), InputState::AgentConfirming);

        let mut m2 = TerminalStateMachine::new();
        m2.enter_confirming(ConfirmKind::PathAccess);
        let actions = m2.feed(b'y');
        assert_eq!(
            actions,
            vec![Action::Confirm(ConfirmationOutcome::ProceedAlways)]
        );
    }

    #[test]
    fn confirming_ctrl_c_cancels() {
        let mut m = TerminalStateMachine::new();
        m.enter_confirming(ConfirmKind::Simple);
        let actions = m.feed(CTRL_C);
        assert_eq!(actions, vec![Action::Confirm(ConfirmationOutcome::Cancel)]);
    }

    #[test]
    fn asking_reads_a_line() {
        let mut m = TerminalStateMachine::new();
        m.enter_asking();
        let actions = feed_str(&mut m, "yes please\r");
        assert_eq!(
            actions.last(),
            Some(&Action::SubmitAsk("yes please".to_string()))
        );
    }

    #[test]
    fn asking_ctrl_c_submits_empty() {
        let mut m = TerminalStateMachine::new();
        m.enter_asking();
        feed_str(&mut m, "partial");
        let actions = m.feed(CTRL_C);
        assert_eq!(actions, vec![Action::SubmitAsk(String::new())]);
    }

    #[test]
    fn long_paste_collapses_to_placeholder() {
        let mut m = TerminalStateMachine::new();
        m.feed(b'@');
        m.feed(b' ');
        for b in BRACKETED_PASTE_START {
            m.feed(*b);
        }
        let body: String = (0..10).map(|i| format!("line {}\r", i)).collect();
        for b in body.bytes() {
            m.feed(b);
        }
        let actions = {
            let mut acts = Vec::new();
            for b in BRACKETED_PASTE_END {
                acts.extend(m.feed(*b));
            }
            acts
        };
        assert!(matches!(actions.as_slice(), [Action::EchoLocal(_)]));
        assert_eq!(m.capture_buffer.contains("[Pasted Text: 10 lines]"), true);
    }

    #[test]
    fn embedded_cr_inside_paste_does_not_submit() {
        let mut m = TerminalStateMachine::new();
        m.feed(b'@');
        m.feed(b' ');
        for b in BRACKETED_PASTE_START {
            m.feed(*b);
        }
        // A short paste containing a CR must not trigger SubmitQuery.
        let actions = m.feed(CR);
        assert!(actions.is_empty());
        assert_eq!(m.state(), InputState::Capturing);
    }
}
