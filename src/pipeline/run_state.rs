// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Per-stage run state and coalescing
//!
//! Every trigger bumps the stage's generation. Runs of the same stage are
//! serialized on the stage cache lock, and a run that is no longer the
//! latest generation stops before writing, so overlapping triggers
//! collapse into the most recent one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::cache::StageCache;
use crate::pipeline::Stage;

/// Lifecycle of a stage run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    /// A newer trigger arrived before this run could write
    Superseded,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Superseded | Self::Failed)
    }

    /// Idle → Running → terminal, and any terminal state may start again
    pub fn can_transition(&self, next: RunState) -> bool {
        match (self, next) {
            (Self::Idle, Self::Running) => true,
            (Self::Running, next) => next.is_terminal(),
            (from, Self::Running) => from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Superseded => "superseded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything the orchestrator keeps per stage
pub struct StageSlot {
    pub stage: Stage,
    generation: AtomicU64,
    state: Mutex<RunState>,
    /// Held for the whole run
    pub cache: tokio::sync::Mutex<StageCache>,
}

impl StageSlot {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            generation: AtomicU64::new(0),
            state: Mutex::new(RunState::Idle),
            cache: tokio::sync::Mutex::new(StageCache::new()),
        }
    }

    /// Register a new trigger and return its generation
    pub fn request(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move to `next`; returns false and leaves the state alone when the
    /// transition is not allowed
    pub fn transition(&self, next: RunState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.can_transition(next) {
            tracing::debug!(stage = %self.stage.name, from = %*state, to = %next, "ignored state change");
            return false;
        }
        tracing::debug!(stage = %self.stage.name, from = %*state, to = %next, "state change");
        *state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TransformStep;

    fn slot() -> StageSlot {
        StageSlot::new(Stage::new("css", "src", vec!["*".into()], "dist", vec![TransformStep::RawCopy]))
    }

    #[test]
    fn test_transitions() {
        assert!(RunState::Idle.can_transition(RunState::Running));
        assert!(RunState::Running.can_transition(RunState::Superseded));
        assert!(RunState::Failed.can_transition(RunState::Running));
        assert!(!RunState::Idle.can_transition(RunState::Completed));
        assert!(!RunState::Running.can_transition(RunState::Idle));
        assert!(!RunState::Completed.can_transition(RunState::Failed));
    }

    #[test]
    fn test_latest_generation_wins() {
        let slot = slot();
        let first = slot.request();
        let second = slot.request();

        assert!(!slot.is_latest(first));
        assert!(slot.is_latest(second));
    }

    #[test]
    fn test_slot_rejects_invalid_transition() {
        let slot = slot();
        assert!(!slot.transition(RunState::Completed));
        assert_eq!(slot.state(), RunState::Idle);

        assert!(slot.transition(RunState::Running));
        assert!(slot.transition(RunState::Completed));
        assert_eq!(slot.state(), RunState::Completed);
    }
}
