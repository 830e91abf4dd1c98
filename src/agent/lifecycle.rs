//! Query lifecycle
//!
//! `Received → Interpreting → {NeedsInfo | Failed | Executing}`,
//! `Executing → {Failed | Rendering}`, `Rendering → Succeeded`.
//! One pass per query; no state is revisited.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    Received,
    Interpreting,
    NeedsInfo,
    Executing,
    Rendering,
    Succeeded,
    Failed,
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryState::NeedsInfo | QueryState::Succeeded | QueryState::Failed
        )
    }

    pub fn can_transition_to(&self, next: QueryState) -> bool {
        use QueryState::*;
        matches!(
            (self, next),
            (Received, Interpreting)
                | (Received, Failed)
                | (Interpreting, NeedsInfo)
                | (Interpreting, Failed)
                | (Interpreting, Executing)
                | (Executing, Failed)
                | (Executing, Rendering)
                | (Rendering, Succeeded)
        )
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryState::Received => "received",
            QueryState::Interpreting => "interpreting",
            QueryState::NeedsInfo => "needs_info",
            QueryState::Executing => "executing",
            QueryState::Rendering => "rendering",
            QueryState::Succeeded => "succeeded",
            QueryState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the state of one query
#[derive(Debug)]
pub struct QueryLifecycle {
    state: QueryState,
}

impl QueryLifecycle {
    pub fn new() -> Self {
        Self {
            state: QueryState::Received,
        }
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Move to the next state. Invalid transitions are a programming error:
    /// they panic in debug builds and are logged and ignored otherwise.
    pub fn advance(&mut self, next: QueryState) {
        if !self.state.can_transition_to(next) {
            debug_assert!(false, "invalid query transition {} -> {}", self.state, next);
            tracing::warn!(from = %self.state, to = %next, "Ignoring invalid query transition");
            return;
        }
        tracing::debug!(from = %self.state, to = %next, "Query state transition");
        self.state = next;
    }
}

impl Default for QueryLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_path() {
        let mut lifecycle = QueryLifecycle::new();
        for next in [
            QueryState::Interpreting,
            QueryState::Executing,
            QueryState::Rendering,
            QueryState::Succeeded,
        ] {
            lifecycle.advance(next);
        }
        assert_eq!(lifecycle.state(), QueryState::Succeeded);
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in [
            QueryState::NeedsInfo,
            QueryState::Succeeded,
            QueryState::Failed,
        ] {
            for next in [
                QueryState::Received,
                QueryState::Interpreting,
                QueryState::Executing,
                QueryState::Rendering,
                QueryState::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_rendering_cannot_fail() {
        assert!(!QueryState::Rendering.can_transition_to(QueryState::Failed));
        assert!(!QueryState::Interpreting.can_transition_to(QueryState::Rendering));
    }
}
