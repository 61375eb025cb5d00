//! Cross-request tool-call history and the stuck heuristic.
//!
//! The history outlives any single run: it is owned by whatever hosts the
//! agent (the interactive session) and passed by reference into each run.
//! Only successful dispatches are recorded; only an explicit `reset` clears
//! it. The per-request transcript, by contrast, is rebuilt from scratch on
//! every request.

use questkeeper_core::tool::ToolCall;
use tracing::warn;

/// How many trailing same-name calls count as stuck.
const STUCK_WINDOW: usize = 3;

/// The ordered record of successfully dispatched tool calls.
#[derive(Debug, Default)]
pub struct ToolCallHistory {
    calls: Vec<ToolCall>,
}

impl ToolCallHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successfully dispatched call.
    pub fn record(&mut self, call: ToolCall) {
        self.calls.push(call);
    }

    /// Clear the history (the interactive `reset` command).
    pub fn reset(&mut self) {
        self.calls.clear();
    }

    /// The recorded calls, oldest first.
    pub fn calls(&self) -> &[ToolCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// The stuck heuristic: the last three recorded calls name the same tool.
    ///
    /// Arguments are ignored, so the same tool legitimately called three
    /// times for different entities is a false positive, and alternating
    /// between two looping tools is a false negative — accepted tradeoffs
    /// for simplicity. Fewer than three entries never trigger.
    pub fn is_stuck(&self) -> bool {
        if self.calls.len() < STUCK_WINDOW {
            return false;
        }

        let last = &self.calls[self.calls.len() - STUCK_WINDOW..];
        let all_same = last.iter().all(|call| call.name == last[0].name);

        if all_same {
            warn!(tool = %last[0].name, "Same tool called {STUCK_WINDOW} times in a row");
        }

        all_same
    }
}
