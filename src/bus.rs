// Copyright 2026 The Aq Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Message bus: typed publish/subscribe plus one-shot request/response by
//! correlation id.
//!
//! A single bus is owned by one agent run (see [`crate::agent::Agent`]). It
//! decouples the scheduler and agent loop from whatever is driving the UI —
//! the full-screen TUI, the terminal passthrough state machine, or a
//! non-interactive CLI run — by letting each side `emit`/`on` events without
//! knowing about the other's concrete type.
//!
//! `wait_for` is built directly on a map of oneshot senders keyed by
//! correlation id rather than a predicate scan over a subscriber list: the
//! caller that emits a request already knows the id it's waiting on, so the
//! response side only has to look up that one slot instead of re-evaluating
//! a predicate against every event that flows past.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::{broadcast, oneshot};

/// Anything that can travel over the bus. Events are cloned to every
/// subscriber, so payloads should be cheap to clone (small structs, `Arc`-wrapped
/// bodies for anything larger).
pub trait BusEvent: Clone + Send + Sync + 'static {
    /// Stable name for this event's kind, used only for tracing.
    fn kind(&self) -> &'static str;
}

/// Request/response pairing key. Tool confirmations and ask-user prompts are
/// correlated by the originating tool call's id.
pub type CorrelationId = String;

struct Waiters<T> {
    pending: Mutex<HashMap<CorrelationId, oneshot::Sender<T>>>,
}

impl<T> Default for Waiters<T> {
    fn default() -> Self {
        Self { pending: Mutex::new(HashMap::new()) }
    }
}

/// A single-process pub/sub channel, generic over the event payload type.
///
/// Each distinct event type used by a run gets its own `Bus<T>` instance;
/// `Agent` holds one for tool confirmations and one for ask-user prompts.
/// `emit` never blocks: `tokio::sync::broadcast` drops the event for
/// subscribers that are lagging rather than stalling the publisher.
pub struct Bus<T: Clone + Send + 'static> {
    tx: broadcast::Sender<T>,
    waiters: Waiters<T>,
    destroyed: std::sync::atomic::AtomicBool,
}

impl<T: Clone + Send + 'static> Bus<T> {
    /// Create a bus with the given broadcast buffer capacity (how many
    /// events a slow subscriber can lag behind before old ones are dropped).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            waiters: Waiters::default(),
            destroyed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Subscribe to all future events. Dropping the returned receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers and to any `wait_for`
    /// call whose predicate it satisfies. A no-op after `destroy`.
    pub fn emit(&self, event: T)
    where
        T: HasCorrelation,
    {
        if self.destroyed.load(std::sync::atomic::Ordering::Acquire) {
            return;
        }
        if let Some(id) = event.correlation_id() {
            let mut pending = self.waiters.pending.lock().unwrap();
            if let Some(sender) = pending.remove(id) {
                let _ = sender.send(event.clone());
            }
        }
        // Fan-out to subscribers is best-effort: no subscribers is not an error.
        let _ = self.tx.send(event);
    }

    /// Register interest in the single response correlated with `id`,
    /// returning a future that resolves when `emit` is called with a
    /// matching correlation id, or `None` if the bus is destroyed first.
    pub async fn wait_for(&self, id: impl Into<CorrelationId>) -> Option<T> {
        let id = id.into();
        if self.destroyed.load(std::sync::atomic::Ordering::Acquire) {
            return None;
        }
        let (sender, receiver) = oneshot::channel();
        self.waiters.pending.lock().unwrap().insert(id, sender);
        receiver.await.ok()
    }

    /// Close the bus. Outstanding `wait_for` calls resolve to `None`;
    /// further `emit`/`wait_for` calls are no-ops.
    pub fn destroy(&self) {
        self.destroyed.store(true, std::sync::atomic::Ordering::Release);
        self.waiters.pending.lock().unwrap().clear();
    }
}

/// Events that carry a correlation id can be resolved by `wait_for`.
pub trait HasCorrelation {
    fn correlation_id(&self) -> Option<&str>;
}

/// A request to confirm a tool invocation, published by the scheduler and
/// answered by whichever UI layer is attached (TUI confirm prompt, terminal
/// state machine's AgentConfirming state, or an auto-responder in
/// non-interactive mode).
#[derive(Debug, Clone)]
pub struct ToolConfirmationRequest {
    pub call_id: String,
    pub details: crate::tools::invocation::ConfirmationDetails,
}

impl HasCorrelation for ToolConfirmationRequest {
    fn correlation_id(&self) -> Option<&str> {
        Some(&self.call_id)
    }
}

/// The resolved answer to a [`ToolConfirmationRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfirmationResponse {
    pub call_id: String,
    pub outcome: ConfirmationOutcome,
}

impl HasCorrelation for ToolConfirmationResponse {
    fn correlation_id(&self) -> Option<&str> {
        Some(&self.call_id)
    }
}

/// Outcome of a tool confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    ProceedOnce,
    ProceedAlways,
    Cancel,
}

/// A request that the model wants free-text input from the user (the
/// `ask_user` tool), published the same way as tool confirmations.
#[derive(Debug, Clone)]
pub struct AskUserRequest {
    pub call_id: String,
    pub question: String,
}

impl HasCorrelation for AskUserRequest {
    fn correlation_id(&self) -> Option<&str> {
        Some(&self.call_id)
    }
}

/// The user's answer to an [`AskUserRequest`].
#[derive(Debug, Clone)]
pub struct AskUserResponse {
    pub call_id: String,
    pub answer: String,
}

impl HasCorrelation for AskUserResponse {
    fn correlation_id(&self) -> Option<&str> {
        Some(&self.call_id)
    }
}

/// The pair of buses an agent run needs: one for tool confirmations, one for
/// ask-user prompts. Bundled together so `Agent` can own and destroy both
/// with a single call.
pub struct RunBus {
    pub confirmations: Bus<ToolConfirmationResponseEnvelope>,
    pub asks: Bus<AskUserResponseEnvelope>,
}

/// Envelope so `ToolConfirmationRequest` (outbound) and
/// `ToolConfirmationResponse` (inbound) can share one typed bus while still
/// letting subscribers and `wait_for` distinguish direction.
#[derive(Debug, Clone)]
pub enum ToolConfirmationResponseEnvelope {
    Request(ToolConfirmationRequest),
    Response(ToolConfirmationResponse),
}

impl HasCorrelation for ToolConfirmationResponseEnvelope {
    fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::Request(r) => r.correlation_id(),
            Self::Response(r) => r.correlation_id(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AskUserResponseEnvelope {
    Request(AskUserRequest),
    Response(AskUserResponse),
}

impl HasCorrelation for AskUserResponseEnvelope {
    fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::Request(r) => r.correlation_id(),
            Self::Response(r) => r.correlation_id(),
        }
    }
}

impl Default for RunBus {
    fn default() -> Self {
        Self {
            confirmations: Bus::new(32),
            asks: Bus::new(32),
        }
    }
}

impl RunBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a confirmation request and await the matching response.
    /// Returns `Cancel` if the bus was destroyed (e.g. the run was aborted)
    /// before an answer arrived.
    pub async fn request_confirmation(
        &self,
        call_id: &str,
        details: crate::tools::invocation::ConfirmationDetails,
    ) -> ConfirmationOutcome {
        self.confirmations.emit(ToolConfirmationResponseEnvelope::Request(ToolConfirmationRequest {
            call_id: call_id.to_string(),
            details,
        }));
        match self.confirmations.wait_for(call_id.to_string()).await {
            Some(ToolConfirmationResponseEnvelope::Response(r)) => r.outcome,
            _ => ConfirmationOutcome::Cancel,
        }
    }

    /// Answer an outstanding confirmation request. Called by whichever UI
    /// layer owns the prompt (TUI key handler, terminal state machine).
    pub fn answer_confirmation(&self, call_id: impl Into<String>, outcome: ConfirmationOutcome) {
        self.confirmations.emit(ToolConfirmationResponseEnvelope::Response(ToolConfirmationResponse {
            call_id: call_id.into(),
            outcome,
        }));
    }

    pub async fn request_ask_user(&self, call_id: &str, question: &str) -> String {
        self.asks.emit(AskUserResponseEnvelope::Request(AskUserRequest {
            call_id: call_id.to_string(),
            question: question.to_string(),
        }));
        match self.asks.wait_for(call_id.to_string()).await {
            Some(AskUserResponseEnvelope::Response(r)) => r.answer,
            _ => String::new(),
        }
    }

    pub fn answer_ask_user(&self, call_id: impl Into<String>, answer: impl Into<String>) {
        self.asks.emit(AskUserResponseEnvelope::Response(AskUserResponse {
            call_id: call_id.into(),
            answer: answer.into(),
        }));
    }

    /// Tear down both buses. Any in-flight `wait_for` resolves to a Cancel
    /// outcome / empty answer.
    pub fn destroy(&self) {
        self.confirmations.destroy();
        self.asks.destroy();
    }
}

/// Type-erased wrapper kept around in case a future event kind needs to be
/// stored generically (e.g. a debug event log). Not used on the hot path.
#[allow(dead_code)]
pub(crate) fn as_any(value: &dyn Any) -> &dyn Any {
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::invocation::ConfirmationDetails;

    #[tokio::test]
    async fn confirmation_round_trip() {
        let bus = RunBus::new();
        let call_id = "call-1".to_string();

        let waiter = {
            let bus_ref = &bus;
            let id = call_id.clone();
            async move {
                bus_ref
                    .request_confirmation(&id, ConfirmationDetails::Exec { command: "ls".into() })
                    .await
            }
        };

        let (outcome, _) = tokio::join!(waiter, async {
            // Give the request a tick to publish before answering.
            tokio::task::yield_now().await;
            bus.answer_confirmation(call_id.clone(), ConfirmationOutcome::ProceedOnce);
        });

        assert_eq!(outcome, ConfirmationOutcome::ProceedOnce);
    }

    #[tokio::test]
    async fn destroy_resolves_pending_waits_as_cancel() {
        let bus = RunBus::new();
        let call_id = "call-2".to_string();

        let waiter = bus.request_confirmation(&call_id, ConfirmationDetails::Edit { file_path: "a.rs".into() });
        let (outcome, _) = tokio::join!(waiter, async {
            tokio::task::yield_now().await;
            bus.destroy();
        });
        assert_eq!(outcome, ConfirmationOutcome::Cancel);
    }

    #[tokio::test]
    async fn ask_user_round_trip() {
        let bus = RunBus::new();
        let call_id = "ask-1".to_string();
        let waiter = bus.request_ask_user(&call_id, "which file?");
        let (answer, _) = tokio::join!(waiter, async {
            tokio::task::yield_now().await;
            bus.answer_ask_user(call_id.clone(), "main.rs");
        });
        assert_eq!(answer, "main.rs");
    }
}
