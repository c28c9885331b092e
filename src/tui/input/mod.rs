// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Terminal input handling: enhanced keyboard protocol support plus the
//! byte-level state machine that arbitrates passthrough vs. agent capture.

pub mod enhanced;
pub mod state_machine;

pub use enhanced::{
    detect_terminal_capabilities, EnhancedInput, KeyCode, KeyEvent, KeyModifiers, ModifierEncoding,
    SmartInput, TerminalCapabilities,
};
pub use state_machine::{Action, ConfirmKind, InputState, TerminalStateMachine};
