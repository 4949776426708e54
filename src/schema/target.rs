//! Target expression structure (TES) supplied by the caller.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Tolerance used when checking that transition rows are stochastic.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Desired attractor transition structure.
///
/// `transitions[i][j]` is the probability of moving from attractor `attractors[i]`
/// to attractor `attractors[j]`. The search treats the value as an opaque comparand;
/// only the distance metric looks inside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetStructure {
    /// Attractor identifiers.
    pub attractors: Vec<String>,
    /// Row-stochastic transition relation over `attractors`.
    pub transitions: Vec<Vec<f64>>,
}

impl TargetStructure {
    /// Create a target with generated labels `a0, a1, ...`.
    pub fn from_transitions(transitions: Vec<Vec<f64>>) -> Self {
        let attractors = (0..transitions.len()).map(|i| format!("a{}", i)).collect();
        Self {
            attractors,
            transitions,
        }
    }

    /// Number of target attractors.
    pub fn len(&self) -> usize {
        self.attractors.len()
    }

    /// Whether the target has no attractors.
    pub fn is_empty(&self) -> bool {
        self.attractors.is_empty()
    }

    /// Check the shape contract of the target.
    pub fn validate(&self) -> Result<(), ComparisonError> {
        let dim = self.attractors.len();
        if self.transitions.len() != dim {
            return Err(ComparisonError::LabelMismatch {
                labels: dim,
                rows: self.transitions.len(),
            });
        }

        let mut seen = HashSet::new();
        for label in &self.attractors {
            if !seen.insert(label.as_str()) {
                return Err(ComparisonError::DuplicateLabel(label.clone()));
            }
        }

        for (i, row) in self.transitions.iter().enumerate() {
            check_row(i, row, dim)?;
        }
        Ok(())
    }
}

/// Check one row of a transition relation: right width, probabilities, stochastic (or empty).
pub(crate) fn check_row(index: usize, row: &[f64], dim: usize) -> Result<(), ComparisonError> {
    if row.len() != dim {
        return Err(ComparisonError::NotSquare {
            row: index,
            len: row.len(),
            expected: dim,
        });
    }
    if let Some(&value) = row
        .iter()
        .find(|v| !v.is_finite() || **v < 0.0 || **v > 1.0)
    {
        return Err(ComparisonError::InvalidProbability { row: index, value });
    }
    let sum: f64 = row.iter().sum();
    if sum != 0.0 && (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
        return Err(ComparisonError::NotStochastic { row: index, sum });
    }
    Ok(())
}

/// Incompatible or malformed structures handed to a distance metric.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComparisonError {
    #[error("Target has {labels} attractor labels but {rows} transition rows")]
    LabelMismatch { labels: usize, rows: usize },
    #[error("Attractor label `{0}` is used more than once")]
    DuplicateLabel(String),
    #[error("Row {row} has {len} entries, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("Row {row} contains {value}, which is not a probability")]
    InvalidProbability { row: usize, value: f64 },
    #[error("Row {row} sums to {sum} instead of 1")]
    NotStochastic { row: usize, sum: f64 },
    #[error("Invalid threshold set: {0}")]
    InvalidThresholds(String),
    #[error("Distance evaluated to {0}")]
    NotFinite(f64),
}
