//! Search progress and result types.

use serde::{Deserialize, Serialize};

/// What happened to the move made in one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// Distance decreased; the move was kept.
    Improved,
    /// Distance unchanged; the move was kept and counted as a stall.
    Stalled,
    /// Distance increased; the move was reverted.
    Rejected,
}

/// Progress snapshot reported after every iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProgress {
    /// Iteration that just completed (0-based).
    pub iteration: usize,
    /// Neighborhood size used by the move.
    pub neighborhood: usize,
    /// Distance of the move.
    pub candidate_distance: f64,
    /// Distance of the current network after acceptance or revert.
    pub distance: f64,
    /// Consecutive stalls after the move.
    pub stalls: usize,
    /// Acceptance decision.
    pub outcome: MoveOutcome,
}

/// Reason the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Distance reached the minimization target.
    TargetReached,
    /// Iteration budget exhausted.
    MaxIterations,
    /// Neighborhood would exceed the network size.
    NeighborhoodExhausted,
    /// Cancelled through the shared flag.
    Cancelled,
}

/// Statistics from a completed search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Iterations executed.
    pub iterations: usize,
    /// Evaluations performed, including the initial one.
    pub evaluations: usize,
    /// Moves that lowered the distance.
    pub improved: usize,
    /// Moves accepted at equal distance.
    pub stalled: usize,
    /// Moves reverted.
    pub rejected: usize,
    /// Largest neighborhood used.
    pub max_neighborhood: usize,
    /// Wall time.
    pub elapsed_seconds: f64,
    /// Why the search stopped.
    pub stop_reason: StopReason,
}

/// Distance trace of a search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHistory {
    /// Current distance after each iteration.
    pub distance: Vec<f64>,
    /// Neighborhood size of each iteration.
    pub neighborhood: Vec<usize>,
}
