//! Pluggable evaluation and scrambling strategies for the search engine.

use log::warn;

use super::SearchError;
use super::mutation::MutationOperator;
use crate::compute::{
    AttractorAnalysis, AttractorAnalyzer, BooleanNetwork, DistanceMetric, Flip, Metric,
};
use crate::schema::{
    ComparisonError, ConfigError, ExperimentConfig, TargetStructure, TransitionModel,
};

/// Scores a network; lower is better.
pub trait Evaluator {
    fn evaluate(&mut self, network: &BooleanNetwork) -> Result<f64, SearchError>;
}

impl<F> Evaluator for F
where
    F: FnMut(&BooleanNetwork) -> Result<f64, SearchError>,
{
    fn evaluate(&mut self, network: &BooleanNetwork) -> Result<f64, SearchError> {
        self(network)
    }
}

/// Applies a random move of `count` edits to a network.
pub trait Scrambler {
    /// Apply the move and return the edits that were made, so they can be undone.
    ///
    /// Entries edited by `history` (the previous move) are avoided.
    fn scramble(
        &mut self,
        network: &mut BooleanNetwork,
        count: usize,
        history: &[Flip],
    ) -> Result<Vec<Flip>, SearchError>;
}

impl Scrambler for MutationOperator {
    fn scramble(
        &mut self,
        network: &mut BooleanNetwork,
        count: usize,
        history: &[Flip],
    ) -> Result<Vec<Flip>, SearchError> {
        let excluded = network.inputs().clone();
        let flips = match self.generate_flips(network, count, &excluded, history) {
            Ok(flips) => flips,
            // Too few entries outside the previous move: allow revisiting them.
            Err(ConfigError::InsufficientEntries { .. }) if !history.is_empty() => {
                self.generate_flips(network, count, &excluded, &[])?
            }
            Err(err) => return Err(err.into()),
        };
        network.apply_all(&flips)?;
        Ok(flips)
    }
}

/// Distance between a network's attractor structure and a target.
pub struct AttractorDistance<M = Metric> {
    analyzer: AttractorAnalyzer,
    metric: M,
    target: TargetStructure,
    last_analysis: Option<AttractorAnalysis>,
}

impl<M: DistanceMetric> AttractorDistance<M> {
    /// Create an evaluator, rejecting malformed targets up front.
    pub fn new(
        analyzer: AttractorAnalyzer,
        metric: M,
        target: TargetStructure,
    ) -> Result<Self, ComparisonError> {
        target.validate()?;
        Ok(Self {
            analyzer,
            metric,
            target,
            last_analysis: None,
        })
    }

    pub fn target(&self) -> &TargetStructure {
        &self.target
    }

    /// Analysis behind the most recent evaluation.
    pub fn last_analysis(&self) -> Option<&AttractorAnalysis> {
        self.last_analysis.as_ref()
    }
}

impl AttractorDistance<Metric> {
    /// Analyzer, metric and target taken from an experiment record.
    pub fn from_config(config: &ExperimentConfig) -> Result<Self, SearchError> {
        let crosses = config.target.transitions.iter().enumerate().any(|(i, row)| {
            row.iter().enumerate().any(|(j, &p)| i != j && p > 0.0)
        });
        if crosses && config.analysis.transition == TransitionModel::Retransition {
            warn!(
                "Target has transitions between attractors; the retransition model only \
                 produces them for probabilistic networks."
            );
        }
        let analyzer = AttractorAnalyzer::new(config.analysis.clone())?;
        let metric = Metric::from_config(&config.metric)?;
        Ok(Self::new(analyzer, metric, config.target.clone())?)
    }
}

impl<M: DistanceMetric> Evaluator for AttractorDistance<M> {
    fn evaluate(&mut self, network: &BooleanNetwork) -> Result<f64, SearchError> {
        let analysis = self.analyzer.analyze(network)?;
        let distance = self.metric.distance(&analysis, &self.target)?;
        self.last_analysis = Some(analysis);
        Ok(distance)
    }
}
