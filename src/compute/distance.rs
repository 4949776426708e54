//! Structural distances between a computed attractor structure and a target.

use super::tes::tes_profile;
use super::{AttractorAnalysis, TransitionMatrix};
use crate::schema::{ComparisonError, MetricConfig, TargetStructure};

/// A non-negative distance that is zero when both structures are equivalent.
pub trait DistanceMetric {
    fn distance(
        &self,
        analysis: &AttractorAnalysis,
        target: &TargetStructure,
    ) -> Result<f64, ComparisonError>;
}

fn finite(distance: f64) -> Result<f64, ComparisonError> {
    if distance.is_finite() {
        Ok(distance)
    } else {
        Err(ComparisonError::NotFinite(distance))
    }
}

/// Positional L1 distance between transition matrices plus the attractor count
/// difference. Missing rows and columns count as zero.
///
/// Depends on attractor discovery order; use [`TesDistance`] when that order is
/// not meaningful.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixDistance;

impl DistanceMetric for MatrixDistance {
    fn distance(
        &self,
        analysis: &AttractorAnalysis,
        target: &TargetStructure,
    ) -> Result<f64, ComparisonError> {
        target.validate()?;
        let atm = &analysis.atm;
        let dim = atm.dim().max(target.len());

        let mut total = atm.dim().abs_diff(target.len()) as f64;
        for i in 0..dim {
            for j in 0..dim {
                let expected = target
                    .transitions
                    .get(i)
                    .and_then(|row| row.get(j))
                    .copied()
                    .unwrap_or(0.0);
                total += (atm.get(i, j) - expected).abs();
            }
        }
        finite(total)
    }
}

/// Compares threshold ergodic set profiles at several thresholds.
///
/// For each threshold both matrices are reduced to the sizes of their TESs, largest
/// first. A level contributes the TES count difference plus the element-wise size
/// difference, so the distance does not depend on attractor order.
///
/// Levels are compared independently. Which set at one threshold contains which set
/// at the next is not compared, so two structures whose sets nest differently can
/// still be at distance zero.
#[derive(Debug, Clone, PartialEq)]
pub struct TesDistance {
    thresholds: Vec<f64>,
}

impl TesDistance {
    pub fn new(thresholds: Vec<f64>) -> Result<Self, ComparisonError> {
        if thresholds.is_empty() {
            return Err(ComparisonError::InvalidThresholds(
                "at least one threshold is required".into(),
            ));
        }
        if let Some(t) = thresholds.iter().find(|t| !(0.0..=1.0).contains(*t)) {
            return Err(ComparisonError::InvalidThresholds(format!(
                "{} is not in [0, 1]",
                t
            )));
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    fn level_distance(a: &[usize], b: &[usize]) -> usize {
        let sizes: usize = (0..a.len().max(b.len()))
            .map(|i| {
                let x = a.get(i).copied().unwrap_or(0);
                let y = b.get(i).copied().unwrap_or(0);
                x.abs_diff(y)
            })
            .sum();
        a.len().abs_diff(b.len()) + sizes
    }
}

impl DistanceMetric for TesDistance {
    fn distance(
        &self,
        analysis: &AttractorAnalysis,
        target: &TargetStructure,
    ) -> Result<f64, ComparisonError> {
        target.validate()?;
        let expected = TransitionMatrix::from_rows(target.transitions.clone())?;

        let total: usize = self
            .thresholds
            .iter()
            .map(|&t| {
                Self::level_distance(&tes_profile(&analysis.atm, t), &tes_profile(&expected, t))
            })
            .sum();
        finite(total as f64)
    }
}

/// Metric selected by configuration.
#[derive(Debug, Clone)]
pub enum Metric {
    Matrix(MatrixDistance),
    Tes(TesDistance),
}

impl Metric {
    pub fn from_config(config: &MetricConfig) -> Result<Self, ComparisonError> {
        Ok(match config {
            MetricConfig::Matrix => Self::Matrix(MatrixDistance),
            MetricConfig::Tes { thresholds } => Self::Tes(TesDistance::new(thresholds.clone())?),
        })
    }
}

impl DistanceMetric for Metric {
    fn distance(
        &self,
        analysis: &AttractorAnalysis,
        target: &TargetStructure,
    ) -> Result<f64, ComparisonError> {
        match self {
            Self::Matrix(metric) => metric.distance(analysis, target),
            Self::Tes(metric) => metric.distance(analysis, target),
        }
    }
}
