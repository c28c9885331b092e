// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool call scheduler.
//!
//! Partitions a batch of tool calls from one model turn into calls that can
//! run immediately and calls that need the user's sign-off first, then runs
//! each group through its own state machine:
//!
//! `Validating -> Scheduled -> (AwaitingApproval ->) Executing -> (Success | Error | Cancelled)`
//!
//! Auto-approved calls run concurrently; calls awaiting approval run one at
//! a time so prompts never overlap.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::agent::path_approval::PathApprovalTracker;
use crate::agent::types::{AgentConfig, TurnToolCall};
use crate::bus::{ConfirmationOutcome, RunBus};
use crate::error::SchedulerError;
use crate::tools::{ConfirmationDetails, ToolRegistry};
use crate::types::{ToolCall, ToolResult};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Lifecycle of a single scheduled tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallStatus {
    Validating,
    Scheduled,
    AwaitingApproval,
    Executing,
    Success,
    Error,
    Cancelled,
}

/// A tool call plus its terminal outcome, as produced by [`Scheduler::run`].
#[derive(Debug)]
pub struct ScheduledOutcome {
    pub call_id: String,
    pub status: ToolCallStatus,
    pub result: ToolResult,
    pub stat: TurnToolCall,
}

/// Schedules and runs a batch of tool calls for one model turn.
pub struct Scheduler {
    registry: Arc<ToolRegistry>,
    bus: Arc<RunBus>,
    path_approval: Arc<PathApprovalTracker>,
    cwd: PathBuf,
}

impl Scheduler {
    pub fn new(
        registry: Arc<ToolRegistry>,
        bus: Arc<RunBus>,
        path_approval: Arc<PathApprovalTracker>,
        cwd: PathBuf,
    ) -> Self {
        Self {
            registry,
            bus,
            path_approval,
            cwd,
        }
    }

    /// Decide whether `call` needs a confirmation prompt, consulting both
    /// the handler's own judgment and the session-wide path approval grant.
    fn needs_confirmation(
        &self,
        call: &ToolCall,
        config: &AgentConfig,
    ) -> Option<ConfirmationDetails> {
        if config.should_auto_approve(&call.name) {
            return None;
        }

        let handler = self.registry.get(&call.name)?;
        let details = handler.maybe_confirmation_details(&call.input)?;

        if let ConfirmationDetails::PathAccess { resolved_path } = &details {
            if !self
                .path_approval
                .needs_confirmation(Path::new(resolved_path), &self.cwd)
            {
                return None;
            }
        }

        Some(details)
    }

    /// Validate and run every call in `calls`, honoring `cancel` as a
    /// cooperative abort signal checked between steps. Order of results
    /// matches the order of `calls`.
    ///
    /// Never returns `Err`: a pre-batch cancel or a panicked tool task
    /// surfaces as a `Cancelled`/`Error` outcome on the affected call(s)
    /// rather than aborting the whole batch, so callers can always trust
    /// the completed-calls list as the single source of truth for what
    /// happened to each call.
    pub async fn run(
        &self,
        calls: &[ToolCall],
        config: &AgentConfig,
        cancel: &tokio::sync::watch::Receiver<bool>,
    ) -> Result<Vec<ScheduledOutcome>, SchedulerError> {
        // Stage A: validate + partition. `ask_user` calls are routed through
        // the bus instead of the registry: the handler itself has no bus
        // access (see `handlers::ask_user`), so this is the one place that
        // actually resolves them.
        let mut auto_calls: Vec<&ToolCall> = Vec::new();
        let mut confirm_calls: Vec<(&ToolCall, ConfirmationDetails)> = Vec::new();
        let mut ask_calls: Vec<&ToolCall> = Vec::new();

        for call in calls {
            if call.name == "ask_user" {
                ask_calls.push(call);
            } else {
                match self.needs_confirmation(call, config) {
                    None => auto_calls.push(call),
                    Some(details) => confirm_calls.push((call, details)),
                }
            }
        }

        let mut outcomes = Vec::with_capacity(calls.len());

        // Stage B: auto-approved calls run in parallel, each as its own task.
        if *cancel.borrow() {
            for call in calls {
                outcomes.push(self.cancelled(call));
            }
            outcomes.sort_by_key(|o| calls.iter().position(|c| c.id == o.call_id).unwrap_or(usize::MAX));
            return Ok(outcomes);
        }
        let handles: Vec<_> = auto_calls
            .iter()
            .map(|call| {
                let registry = Arc::clone(&self.registry);
                let call = (*call).clone();
                (call.id.clone(), call.name.clone(), tokio::spawn(async move { Self::execute_owned(registry, call).await }))
            })
            .collect();
        for (call_id, call_name, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(join_err) => outcomes.push(ScheduledOutcome {
                    call_id: call_id.clone(),
                    status: ToolCallStatus::Error,
                    result: ToolResult {
                        tool_use_id: call_id,
                        content: format!("Error: tool task panicked: {join_err}"),
                        is_error: Some(true),
                    },
                    stat: TurnToolCall {
                        name: call_name,
                        duration_ms: 0,
                        is_error: true,
                    },
                }),
            }
        }

        // Stage C: confirm-required calls run sequentially, one prompt at a time,
        // racing each prompt against `cancel` so Ctrl+C unblocks a stuck confirm.
        for (call, details) in confirm_calls {
            if *cancel.borrow() {
                outcomes.push(self.cancelled(call));
                continue;
            }

            let supports_always = details.supports_always();
            let mut cancel_rx = cancel.clone();
            let outcome = tokio::select! {
                outcome = self.bus.request_confirmation(&call.id, details.clone()) => outcome,
                _ = async {
                    while !*cancel_rx.borrow() {
                        if cancel_rx.changed().await.is_err() {
                            break;
                        }
                    }
                } => ConfirmationOutcome::Cancel,
            };

            match outcome {
                ConfirmationOutcome::Cancel => {
                    outcomes.push(self.denied(call));
                }
                ConfirmationOutcome::ProceedOnce => {
                    outcomes.push(self.execute(call).await);
                }
                ConfirmationOutcome::ProceedAlways => {
                    if supports_always {
                        if let ConfirmationDetails::PathAccess { .. } = details {
                            self.path_approval.grant_always();
                        }
                    }
                    outcomes.push(self.execute(call).await);
                }
            }
        }

        // Stage D: ask_user calls, resolved through the bus the same way
        // confirmations are, also racing `cancel`.
        for call in ask_calls {
            if *cancel.borrow() {
                outcomes.push(self.cancelled(call));
                continue;
            }

            let question = call
                .input
                .get("question")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let mut cancel_rx = cancel.clone();
            let answer = tokio::select! {
                answer = self.bus.request_ask_user(&call.id, &question) => Some(answer),
                _ = async {
                    while !*cancel_rx.borrow() {
                        if cancel_rx.changed().await.is_err() {
                            break;
                        }
                    }
                } => None,
            };

            match answer {
                Some(answer) => outcomes.push(ScheduledOutcome {
                    call_id: call.id.clone(),
                    status: ToolCallStatus::Success,
                    result: ToolResult {
                        tool_use_id: call.id.clone(),
                        content: answer,
                        is_error: None,
                    },
                    stat: TurnToolCall {
                        name: call.name.clone(),
                        duration_ms: 0,
                        is_error: false,
                    },
                }),
                None => outcomes.push(self.cancelled(call)),
            }
        }

        // Preserve the caller's original ordering of `calls`.
        outcomes.sort_by_key(|o| calls.iter().position(|c| c.id == o.call_id).unwrap_or(usize::MAX));

        Ok(outcomes)
    }

    async fn execute(&self, call: &ToolCall) -> ScheduledOutcome {
        Self::execute_owned(Arc::clone(&self.registry), call.clone()).await
    }

    async fn execute_owned(registry: Arc<ToolRegistry>, call: ToolCall) -> ScheduledOutcome {
        let call = &call;
        let start = Instant::now();
        let dispatch_result = registry.dispatch(&call.name, call.input.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (status, result, is_error) = match dispatch_result {
            Ok(dr) => {
                #[cfg(feature = "telemetry")]
                GLOBAL_METRICS.record_tool(&call.name, dr.duration, dr.is_error);

                let status = if dr.is_error {
                    ToolCallStatus::Error
                } else {
                    ToolCallStatus::Success
                };
                (
                    status,
                    ToolResult {
                        tool_use_id: call.id.clone(),
                        content: dr.output.content().to_string(),
                        is_error: if dr.is_error { Some(true) } else { None },
                    },
                    dr.is_error,
                )
            }
            Err(e) => (
                ToolCallStatus::Error,
                ToolResult {
                    tool_use_id: call.id.clone(),
                    content: format!("Error: {e}"),
                    is_error: Some(true),
                },
                true,
            ),
        };

        ScheduledOutcome {
            call_id: call.id.clone(),
            status,
            result,
            stat: TurnToolCall {
                name: call.name.clone(),
                duration_ms,
                is_error,
            },
        }
    }

    fn denied(&self, call: &ToolCall) -> ScheduledOutcome {
        ScheduledOutcome {
            call_id: call.id.clone(),
            status: ToolCallStatus::Cancelled,
            result: ToolResult {
                tool_use_id: call.id.clone(),
                content: "User denied this operation. Please try a different approach.".to_string(),
                is_error: Some(true),
            },
            stat: TurnToolCall {
                name: call.name.clone(),
                duration_ms: 0,
                is_error: true,
            },
        }
    }

    fn cancelled(&self, call: &ToolCall) -> ScheduledOutcome {
        ScheduledOutcome {
            call_id: call.id.clone(),
            status: ToolCallStatus::Cancelled,
            result: ToolResult {
                tool_use_id: call.id.clone(),
                content: "User aborted the operation.".to_string(),
                is_error: Some(true),
            },
            stat: TurnToolCall {
                name: call.name.clone(),
                duration_ms: 0,
                is_error: true,
            },
        }
    }
}
