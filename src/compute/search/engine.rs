//! Variable neighborhood stochastic descent over truth table edits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info, trace};

use super::SearchError;
use super::mutation::{MutationOperator, invert};
use super::strategy::{Evaluator, Scrambler};
use crate::compute::{BooleanNetwork, Flip};
use crate::schema::{
    ComparisonError, ConfigError, MoveOutcome, SearchConfig, SearchHistory, SearchProgress,
    SearchStats, StopReason,
};

/// Final state of a search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Best network found (the current network when the search stopped).
    pub network: BooleanNetwork,
    /// Its distance to the target.
    pub distance: f64,
    pub stats: SearchStats,
    pub history: SearchHistory,
}

/// Minimizes an evaluator's score by repeatedly editing a network.
///
/// Each iteration applies a move of `k` random edits. A worse move is undone, an
/// equal move is kept and counted as a stall, a better move is kept and resets the
/// neighborhood to `k = 1`. After `max_stalls` consecutive stalls the neighborhood
/// grows by one; the search ends once it would exceed the number of nodes.
pub struct SearchEngine<E, S = MutationOperator> {
    config: SearchConfig,
    network: BooleanNetwork,
    evaluator: E,
    scrambler: S,
    cancelled: Arc<AtomicBool>,
}

impl<E: Evaluator> SearchEngine<E, MutationOperator> {
    /// Create an engine using the default mutation operator.
    pub fn new(
        config: SearchConfig,
        network: BooleanNetwork,
        evaluator: E,
    ) -> Result<Self, ConfigError> {
        let scrambler = MutationOperator::from_config(&config);
        Self::with_scrambler(config, network, evaluator, scrambler)
    }
}

impl<E: Evaluator, S: Scrambler> SearchEngine<E, S> {
    /// Create an engine with a custom scrambling strategy.
    pub fn with_scrambler(
        config: SearchConfig,
        network: BooleanNetwork,
        evaluator: E,
        scrambler: S,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            network,
            evaluator,
            scrambler,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current network.
    pub fn network(&self) -> &BooleanNetwork {
        &self.network
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn into_network(self) -> BooleanNetwork {
        self.network
    }

    fn should_stop(&self, iteration: usize, distance: f64) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }
        if distance <= self.config.min_target {
            return Some(StopReason::TargetReached);
        }
        if iteration >= self.config.max_iters {
            return Some(StopReason::MaxIterations);
        }
        None
    }

    fn evaluate(&mut self) -> Result<f64, SearchError> {
        let distance = self.evaluator.evaluate(&self.network)?;
        if distance.is_finite() {
            Ok(distance)
        } else {
            Err(ComparisonError::NotFinite(distance).into())
        }
    }

    /// Evaluate `flips` (already applied), undoing them if evaluation fails.
    fn evaluate_move(&mut self, flips: &[Flip]) -> Result<f64, SearchError> {
        match self.evaluate() {
            Ok(distance) => Ok(distance),
            Err(err) => {
                self.network.apply_all(&invert(flips))?;
                Err(err)
            }
        }
    }

    /// Run the search, reporting progress after every iteration.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<SearchOutcome, SearchError>
    where
        F: FnMut(&SearchProgress, &BooleanNetwork),
    {
        let start_time = Instant::now();
        let n = self.network.len();

        let mut distance = self.evaluate()?;
        let mut evaluations = 1;
        let mut k = 1;
        let mut stalls = 0;
        let mut iteration = 0;
        let mut previous: Vec<Flip> = Vec::new();
        let mut history = SearchHistory::default();
        let (mut improved, mut stalled, mut rejected) = (0, 0, 0);
        let mut max_neighborhood = 0;

        info!("Starting search: N = {}, initial distance = {}", n, distance);

        let stop_reason = loop {
            if let Some(reason) = self.should_stop(iteration, distance) {
                break reason;
            }

            if Some(stalls) == self.config.max_stalls {
                stalls = 0;
                k += 1;
                debug!("Neighborhood grows to k = {}", k);
                if k > n {
                    break StopReason::NeighborhoodExhausted;
                }
            }

            let flips = match self.scrambler.scramble(&mut self.network, k, &previous) {
                Ok(flips) => flips,
                Err(SearchError::Config(ConfigError::InsufficientEntries { .. })) => {
                    break StopReason::NeighborhoodExhausted;
                }
                Err(err) => return Err(err),
            };
            trace!("Iteration {}: applied {:?}", iteration, flips);

            let candidate = self.evaluate_move(&flips)?;
            evaluations += 1;

            let outcome = if candidate > distance {
                self.network.apply_all(&invert(&flips))?;
                rejected += 1;
                MoveOutcome::Rejected
            } else if candidate == distance {
                stalls += 1;
                stalled += 1;
                MoveOutcome::Stalled
            } else {
                distance = candidate;
                stalls = 0;
                k = 1;
                improved += 1;
                MoveOutcome::Improved
            };

            max_neighborhood = max_neighborhood.max(flips.len());
            history.distance.push(distance);
            history.neighborhood.push(flips.len());

            debug!(
                "Iteration {}: k = {}, candidate = {}, distance = {}, {:?}",
                iteration,
                flips.len(),
                candidate,
                distance,
                outcome
            );

            let progress = SearchProgress {
                iteration,
                neighborhood: flips.len(),
                candidate_distance: candidate,
                distance,
                stalls,
                outcome,
            };
            callback(&progress, &self.network);

            previous = flips;
            iteration += 1;
        };

        let elapsed_seconds = start_time.elapsed().as_secs_f64();
        info!(
            "Search stopped after {} iterations ({:?}): distance = {}",
            iteration, stop_reason, distance
        );

        Ok(SearchOutcome {
            network: self.network.clone(),
            distance,
            stats: SearchStats {
                iterations: iteration,
                evaluations,
                improved,
                stalled,
                rejected,
                max_neighborhood,
                elapsed_seconds,
                stop_reason,
            },
            history,
        })
    }

    /// Run the search (blocking).
    pub fn run(&mut self) -> Result<SearchOutcome, SearchError> {
        self.run_with_callback(|_, _| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::network::tests::two_cycle_network;
    use crate::compute::search::AttractorDistance;
    use crate::compute::{AttractorAnalyzer, MatrixDistance, NetworkGenerator};
    use crate::schema::{AnalysisConfig, GeneratorConfig, TargetStructure};
    use crate::test_utils::init_logger;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    fn config(max_iters: usize, max_stalls: Option<usize>) -> SearchConfig {
        SearchConfig {
            max_iters,
            max_stalls,
            min_target: 0.0,
            perturbation: 0.1,
            random_seed: Some(17),
        }
    }

    fn network(n: usize, seed: u64) -> BooleanNetwork {
        NetworkGenerator::new(GeneratorConfig {
            n,
            k: 2,
            inputs: 1,
            outputs: 1,
            random_seed: Some(seed),
            ..Default::default()
        })
        .unwrap()
        .generate()
        .unwrap()
    }

    fn constant(distance: f64) -> impl FnMut(&BooleanNetwork) -> Result<f64, SearchError> {
        move |_| Ok(distance)
    }

    /// Evaluator replaying a fixed sequence of distances.
    fn scripted(distances: &[f64]) -> impl FnMut(&BooleanNetwork) -> Result<f64, SearchError> {
        let mut queue: VecDeque<f64> = distances.iter().copied().collect();
        move |_| Ok(queue.pop_front().unwrap_or(f64::MAX))
    }

    #[test]
    fn test_converged_network_unchanged() {
        init_logger();
        let bn = two_cycle_network();
        let mut engine =
            SearchEngine::new(config(100, Some(1)), bn.clone(), scripted(&[0.0])).unwrap();
        let outcome = engine.run().unwrap();

        assert_eq!(outcome.stats.iterations, 0);
        assert_eq!(outcome.stats.evaluations, 1);
        assert_eq!(outcome.stats.stop_reason, StopReason::TargetReached);
        assert_eq!(outcome.network, bn);
    }

    #[test]
    fn test_stagnation_grows_neighborhood() {
        init_logger();
        // Two equal moves with max_stalls = 2: the third move uses k = 2.
        let mut engine = SearchEngine::new(
            config(3, Some(2)),
            network(6, 1),
            scripted(&[5.0, 5.0, 5.0, 5.0]),
        )
        .unwrap();
        let outcome = engine.run().unwrap();
        assert_eq!(outcome.history.neighborhood, vec![1, 1, 2]);
        assert_eq!(outcome.stats.stalled, 3);

        // One equal move with max_stalls = 1: the second move uses k = 2.
        let mut engine = SearchEngine::new(
            config(2, Some(1)),
            network(6, 1),
            scripted(&[5.0, 5.0, 5.0]),
        )
        .unwrap();
        let outcome = engine.run().unwrap();
        assert_eq!(outcome.history.neighborhood, vec![1, 2]);
    }

    #[test]
    fn test_improvement_resets_neighborhood() {
        let mut engine = SearchEngine::new(
            config(4, Some(1)),
            network(6, 2),
            scripted(&[5.0, 5.0, 4.0, 4.0, 4.0]),
        )
        .unwrap();
        let outcome = engine.run().unwrap();
        assert_eq!(outcome.history.neighborhood, vec![1, 2, 1, 2]);
        assert_eq!(outcome.history.distance, vec![5.0, 4.0, 4.0, 4.0]);
        assert_eq!(outcome.stats.improved, 1);
    }

    #[test]
    fn test_worse_move_is_reverted() {
        let bn = network(6, 3);
        let mut engine =
            SearchEngine::new(config(1, Some(1)), bn.clone(), scripted(&[2.0, 3.0])).unwrap();
        let outcome = engine.run().unwrap();
        assert_eq!(outcome.stats.rejected, 1);
        assert_eq!(outcome.distance, 2.0);
        assert_eq!(outcome.network, bn);
    }

    #[test]
    fn test_unlimited_stalls_keep_single_flips() {
        let mut engine = SearchEngine::new(config(20, None), network(6, 4), constant(1.0)).unwrap();
        let outcome = engine.run().unwrap();
        assert!(outcome.history.neighborhood.iter().all(|&k| k == 1));
        assert_eq!(outcome.stats.stop_reason, StopReason::MaxIterations);
    }

    #[test]
    fn test_neighborhood_never_exceeds_network_size() {
        init_logger();
        let bn = network(4, 5);
        let mut engine = SearchEngine::new(config(1000, Some(1)), bn, constant(1.0)).unwrap();
        let outcome = engine.run().unwrap();

        assert_eq!(outcome.stats.stop_reason, StopReason::NeighborhoodExhausted);
        assert!(outcome.history.neighborhood.iter().all(|&k| k <= 4));
        assert_eq!(outcome.stats.max_neighborhood, 4);
    }

    #[test]
    fn test_cancellation() {
        let mut engine =
            SearchEngine::new(config(100, Some(1)), network(6, 6), scripted(&[1.0])).unwrap();
        engine.cancel_handle().store(true, Ordering::Relaxed);
        let outcome = engine.run().unwrap();
        assert_eq!(outcome.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(outcome.stats.iterations, 0);
    }

    #[test]
    fn test_cancel_from_callback_completes_move() {
        let mut engine =
            SearchEngine::new(config(100, Some(1)), network(6, 6), constant(1.0)).unwrap();
        let cancel = engine.cancel_handle();
        let outcome = engine
            .run_with_callback(|progress, _| {
                if progress.iteration == 2 {
                    cancel.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();
        assert_eq!(outcome.stats.iterations, 3);
        assert_eq!(outcome.stats.evaluations, 4);
    }

    #[test]
    fn test_evaluation_error_reverts_move() {
        let bn = network(6, 7);
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let evaluator = move |_: &BooleanNetwork| {
            *counter.borrow_mut() += 1;
            if *counter.borrow() == 1 {
                Ok(1.0)
            } else {
                Err(SearchError::Comparison(ComparisonError::NotFinite(f64::NAN)))
            }
        };
        let mut engine = SearchEngine::new(config(10, Some(1)), bn.clone(), evaluator).unwrap();
        assert!(engine.run().is_err());
        assert_eq!(engine.network(), &bn);
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn test_non_finite_distance_rejected() {
        let mut engine =
            SearchEngine::new(config(10, Some(1)), network(6, 8), scripted(&[1.0, f64::NAN]))
                .unwrap();
        assert!(matches!(
            engine.run(),
            Err(SearchError::Comparison(ComparisonError::NotFinite(_)))
        ));
    }

    #[test]
    fn test_fixed_seed_reproducible() {
        let run = || {
            let bn = network(8, 9);
            let target = TargetStructure::from_transitions(vec![vec![1.0]]);
            let analyzer = AttractorAnalyzer::new(AnalysisConfig {
                random_seed: Some(1),
                ..Default::default()
            })
            .unwrap();
            let evaluator = AttractorDistance::new(analyzer, MatrixDistance, target).unwrap();
            let mut engine = SearchEngine::new(config(40, Some(2)), bn, evaluator).unwrap();
            engine.run().unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.network, b.network);
        assert_eq!(a.history.distance, b.history.distance);
        assert_eq!(a.history.neighborhood, b.history.neighborhood);
    }

    #[test]
    fn test_search_never_increases_distance() {
        init_logger();
        let bn = network(8, 10);
        let target = TargetStructure::from_transitions(vec![vec![1.0]]);
        let analyzer = AttractorAnalyzer::new(AnalysisConfig {
            random_seed: Some(2),
            ..Default::default()
        })
        .unwrap();
        let evaluator = AttractorDistance::new(analyzer, MatrixDistance, target).unwrap();
        let mut engine = SearchEngine::new(config(60, Some(3)), bn, evaluator).unwrap();
        let inputs = engine.network().inputs().clone();
        let original = engine.network().clone();

        let outcome = engine.run().unwrap();
        assert!(outcome.history.distance.windows(2).all(|w| w[1] <= w[0]));
        for &id in &inputs {
            assert_eq!(outcome.network.node(id), original.node(id));
        }
    }
}
