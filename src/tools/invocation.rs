// Copyright 2026 The Aq Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The tool invocation contract: a uniform shape every tool presents to the
//! scheduler regardless of what it actually does.
//!
//! A tool call moves through four stages: **Build** (parse + validate raw
//! JSON arguments into a bound invocation), **Describe** (a human-readable
//! one-liner for UI/telemetry), **Confirm** (a pure inspection of whether
//! this particular invocation needs the user's sign-off, and why), and
//! **Execute**. `maybe_confirmation_details` is deliberately side-effect
//! free — the scheduler calls it before deciding whether to even ask, so a
//! tool that did I/O there would run twice for every confirmed call.

use serde::{Deserialize, Serialize};

/// Coarse classification of what a tool does, independent of its name.
/// Used by plan-mode gating (only a fixed read-only subset of kinds is
/// allowed) and by telemetry dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Read,
    Edit,
    Delete,
    Move,
    Search,
    Execute,
    Think,
    Fetch,
    Communicate,
    Plan,
    Other,
}

/// The structured reason a tool invocation needs user approval before it
/// runs. Each variant is also the scheduler's routing key: `PathAccess` is
/// the only kind that can be satisfied once-and-for-all by the session's
/// path-approval tracker (see [`crate::agent::path_approval`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfirmationDetails {
    /// Running a shell command.
    Exec { command: String },
    /// Creating, overwriting, or patching a file.
    Edit { file_path: String },
    /// Reading or writing a path outside the current working directory.
    PathAccess { resolved_path: String },
}

impl ConfirmationDetails {
    /// Short title suitable for a confirmation prompt header.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Exec { .. } => "Run command",
            Self::Edit { .. } => "Edit file",
            Self::PathAccess { .. } => "Access path outside workspace",
        }
    }

    /// One-line description of exactly what is being confirmed.
    pub fn describe(&self) -> String {
        match self {
            Self::Exec { command } => format!("Run: {command}"),
            Self::Edit { file_path } => format!("Edit: {file_path}"),
            Self::PathAccess { resolved_path } => format!("Access: {resolved_path}"),
        }
    }

    /// Only `PathAccess` confirmations can be satisfied permanently by
    /// `ProceedAlways` (see [`crate::bus::ConfirmationOutcome`]); `Exec` and
    /// `Edit` always re-prompt because each command/file is distinct.
    pub fn supports_always(&self) -> bool {
        matches!(self, Self::PathAccess { .. })
    }
}
