//! Attractor detection and attractor transition matrix (ATM) construction.
//!
//! Attractors are found by walking the state-transition function from a set of seed
//! states. Every walk records its visited states in a map keyed by state value, so a
//! cycle is detected by a single lookup: the suffix of the trajectory starting at the
//! first repeated state is the attractor, the prefix belongs to its basin.
//!
//! Seed walks are independent and run in parallel; their results are merged in seed
//! order so attractor indices follow discovery order and do not depend on scheduling.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{BooleanNetwork, State};
use crate::schema::{
    AnalysisConfig, ComparisonError, ConfigError, MAX_EXHAUSTIVE_NODES, ProbabilisticPolicy,
    SeedPolicy, TargetStructure, TransitionModel, check_row,
};

/// Spreads per-seed RNG streams derived from one analysis seed.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// A cycle of states closed under one synchronous step.
///
/// States are kept in update order, rotated so the smallest state comes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attractor {
    states: Vec<State>,
}

impl Attractor {
    fn from_cycle(mut states: Vec<State>) -> Self {
        if let Some(start) = states
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
        {
            states.rotate_left(start);
        }
        Self { states }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Cycle length; 1 for a fixed point.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_fixed_point(&self) -> bool {
        self.states.len() == 1
    }

    pub fn contains(&self, state: &State) -> bool {
        self.states.contains(state)
    }

    /// Rotation-invariant identity: the sorted set of member states.
    fn key(&self) -> Vec<State> {
        let mut key = self.states.clone();
        key.sort();
        key.dedup();
        key
    }
}

/// Square, row-stochastic matrix over attractors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    rows: Vec<Vec<f64>>,
}

impl TransitionMatrix {
    /// Build a matrix from rows, checking it is square with stochastic (or empty) rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ComparisonError> {
        let dim = rows.len();
        for (i, row) in rows.iter().enumerate() {
            check_row(i, row, dim)?;
        }
        Ok(Self { rows })
    }

    /// Number of attractors (rows and columns).
    pub fn dim(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.rows
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row_sum(&self, index: usize) -> f64 {
        self.rows[index].iter().sum()
    }

    /// Whether every row sums to one within `tolerance`.
    pub fn is_row_stochastic(&self, tolerance: f64) -> bool {
        (0..self.dim()).all(|i| (self.row_sum(i) - 1.0).abs() <= tolerance)
    }
}

impl From<TransitionMatrix> for Vec<Vec<f64>> {
    fn from(matrix: TransitionMatrix) -> Self {
        matrix.rows
    }
}

/// A seed walk that did not close a cycle within the iteration cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedBasin {
    /// State the walk started from.
    pub seed: State,
    /// Steps taken before giving up.
    pub steps: usize,
}

/// Result of one attractor analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttractorAnalysis {
    /// Attractors in discovery order.
    pub attractors: Vec<Attractor>,
    /// Transitions between `attractors`.
    pub atm: TransitionMatrix,
    /// Walks whose contribution was left out of the ATM.
    pub unresolved: Vec<UnresolvedBasin>,
    /// Number of seed states explored.
    pub seeds_explored: usize,
}

impl AttractorAnalysis {
    /// Render this structure as a target, labelling attractors `a0, a1, ...`.
    pub fn to_target(&self) -> TargetStructure {
        TargetStructure::from_analysis(self)
    }

    /// Index of the attractor containing `state`, if any.
    pub fn attractor_of(&self, state: &State) -> Option<usize> {
        self.attractors.iter().position(|a| a.contains(state))
    }
}

impl TargetStructure {
    /// Target reproducing a computed attractor structure.
    pub fn from_analysis(analysis: &AttractorAnalysis) -> Self {
        Self::from_transitions(analysis.atm.rows.clone())
    }
}

/// How successor states are produced during a walk.
#[derive(Debug, Clone, Copy)]
enum Dynamics {
    /// Deterministic network, or probabilistic network collapsed to its projection.
    Projected,
    /// Probabilistic network sampled `runs` times per walk origin.
    Sampled { runs: usize },
}

impl Dynamics {
    fn runs(&self) -> usize {
        match *self {
            Self::Projected => 1,
            Self::Sampled { runs } => runs,
        }
    }
}

/// Outcome of a single walk: the closed cycle, or the step count at the cap.
type Walk = Result<Vec<State>, usize>;

/// Walk from `start` until a state recurs or `cap` steps have been taken.
fn walk_to_cycle(
    network: &BooleanNetwork,
    start: State,
    cap: usize,
    dynamics: Dynamics,
    rng: &mut StdRng,
) -> Walk {
    let mut visited: HashMap<State, usize> = HashMap::new();
    let mut trajectory: Vec<State> = Vec::new();
    let mut current = start;

    for _ in 0..=cap {
        if let Some(&first) = visited.get(&current) {
            return Ok(trajectory.split_off(first));
        }
        let next = match dynamics {
            Dynamics::Projected => network.step_projected(&current),
            Dynamics::Sampled { .. } => network.step(&current, rng),
        };
        visited.insert(current.clone(), trajectory.len());
        trajectory.push(current);
        current = next;
    }

    Err(cap)
}

/// Walk every origin `runs` times in parallel, keeping origin order.
fn walk_all(
    network: &BooleanNetwork,
    origins: &[State],
    cap: usize,
    dynamics: Dynamics,
    base_seed: u64,
) -> Vec<Vec<Walk>> {
    origins
        .par_iter()
        .enumerate()
        .map(|(i, origin)| {
            let mut rng =
                StdRng::seed_from_u64(base_seed.wrapping_add((i as u64).wrapping_mul(SEED_STRIDE)));
            (0..dynamics.runs())
                .map(|_| walk_to_cycle(network, origin.clone(), cap, dynamics, &mut rng))
                .collect()
        })
        .collect()
}

/// Credit every resolved walk from `origins` to `row`; the rest are unresolved.
fn accumulate(
    row: usize,
    origins: Vec<State>,
    walks: Vec<Vec<Walk>>,
    registry: &mut Registry,
    weights: &mut Weights,
    unresolved: &mut Vec<UnresolvedBasin>,
) {
    for (origin, runs) in origins.into_iter().zip(walks) {
        for run in runs {
            match run {
                Ok(cycle) => {
                    let target = registry.register(cycle);
                    weights.add(row, target, 1.0);
                }
                Err(steps) => unresolved.push(UnresolvedBasin {
                    seed: origin.clone(),
                    steps,
                }),
            }
        }
    }
}

/// Structural deduplication of discovered cycles.
#[derive(Default)]
struct Registry {
    index: HashMap<Vec<State>, usize>,
    attractors: Vec<Attractor>,
}

impl Registry {
    fn register(&mut self, cycle: Vec<State>) -> usize {
        let attractor = Attractor::from_cycle(cycle);
        let key = attractor.key();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.attractors.len();
        self.index.insert(key, id);
        self.attractors.push(attractor);
        id
    }

    fn len(&self) -> usize {
        self.attractors.len()
    }
}

/// Accumulated transition weights; rows grow as attractors are discovered.
#[derive(Default)]
struct Weights {
    rows: Vec<Vec<f64>>,
}

impl Weights {
    fn add(&mut self, from: usize, to: usize, weight: f64) {
        if self.rows.len() <= from {
            self.rows.resize_with(from + 1, Vec::new);
        }
        let row = &mut self.rows[from];
        if row.len() <= to {
            row.resize(to + 1, 0.0);
        }
        row[to] += weight;
    }

    fn has_weight(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .is_some_and(|weights| weights.iter().any(|&w| w > 0.0))
    }

    /// Pad to `dim x dim` and normalize rows. Rows without weight stay zero.
    fn into_matrix(mut self, dim: usize) -> TransitionMatrix {
        self.rows.resize_with(dim, Vec::new);
        for row in self.rows.iter_mut() {
            row.resize(dim, 0.0);
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                row.iter_mut().for_each(|w| *w /= total);
            }
        }
        TransitionMatrix { rows: self.rows }
    }
}

/// Computes attractors and the attractor transition matrix of a network.
pub struct AttractorAnalyzer {
    config: AnalysisConfig,
    rng: StdRng,
}

impl AttractorAnalyzer {
    /// Create an analyzer, validating its configuration.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.random_seed.unwrap_or_else(rand::random);
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze `network` from the configured seed set.
    pub fn analyze(&mut self, network: &BooleanNetwork) -> Result<AttractorAnalysis, ConfigError> {
        let n = network.len();
        let seeds: Vec<State> = match self.config.seeds {
            SeedPolicy::Exhaustive => {
                if n > MAX_EXHAUSTIVE_NODES {
                    return Err(ConfigError::StateSpaceTooLarge {
                        nodes: n,
                        limit: MAX_EXHAUSTIVE_NODES,
                    });
                }
                (0..1u64 << n).map(|i| State::from_index(n, i)).collect()
            }
            SeedPolicy::Sampled { count } => (0..count)
                .map(|_| State::random(n, &mut self.rng))
                .collect(),
        };
        self.analyze_from(network, &seeds)
    }

    /// Analyze `network` from explicit seed states.
    pub fn analyze_from(
        &mut self,
        network: &BooleanNetwork,
        seeds: &[State],
    ) -> Result<AttractorAnalysis, ConfigError> {
        let n = network.len();
        if let Some(seed) = seeds.iter().find(|s| s.len() != n) {
            return Err(ConfigError::InvalidAnalysis(format!(
                "seed {} has {} bits, network has {} nodes",
                seed,
                seed.len(),
                n
            )));
        }

        let dynamics = self.dynamics(network)?;
        let cap = self.iteration_cap(n, seeds);
        let base_seed = self.rng.next_u64();

        let mut registry = Registry::default();
        let mut unresolved = Vec::new();

        let walks = walk_all(network, seeds, cap, dynamics, base_seed);
        let mut weights = Weights::default();
        for (seed, runs) in seeds.iter().zip(walks) {
            let mut runs = runs.into_iter();
            // The first walk places the seed in a basin; every walk is one unit of weight.
            let source = match runs.next() {
                Some(Ok(cycle)) => registry.register(cycle),
                Some(Err(steps)) => {
                    unresolved.push(UnresolvedBasin {
                        seed: seed.clone(),
                        steps,
                    });
                    continue;
                }
                None => continue,
            };
            weights.add(source, source, 1.0);
            for run in runs {
                match run {
                    Ok(cycle) => {
                        let target = registry.register(cycle);
                        weights.add(source, target, 1.0);
                    }
                    Err(steps) => unresolved.push(UnresolvedBasin {
                        seed: seed.clone(),
                        steps,
                    }),
                }
            }
        }

        match self.config.transition {
            TransitionModel::Retransition => self.close_retransitions(
                network,
                &mut registry,
                &mut weights,
                &mut unresolved,
                cap,
                dynamics,
            ),
            TransitionModel::Perturbation => {
                weights = self.perturbation_weights(
                    network,
                    &mut registry,
                    &mut unresolved,
                    cap,
                    dynamics,
                );
            }
        }

        if let Some(first) = unresolved.first() {
            warn!(
                "{} walks did not close a cycle within {} steps (first seed {}); weight omitted.",
                unresolved.len(),
                first.steps,
                first.seed
            );
        }

        let atm = weights.into_matrix(registry.len());
        debug!(
            "Analyzed {} seeds: {} attractors, {} unresolved walks.",
            seeds.len(),
            registry.len(),
            unresolved.len()
        );

        Ok(AttractorAnalysis {
            attractors: registry.attractors,
            atm,
            unresolved,
            seeds_explored: seeds.len(),
        })
    }

    fn dynamics(&self, network: &BooleanNetwork) -> Result<Dynamics, ConfigError> {
        if network.is_deterministic() {
            return Ok(Dynamics::Projected);
        }
        match self.config.probabilistic {
            ProbabilisticPolicy::RequireDeterministic => Err(ConfigError::ProbabilisticNetwork),
            ProbabilisticPolicy::Project => Ok(Dynamics::Projected),
            ProbabilisticPolicy::MonteCarlo { runs } => Ok(Dynamics::Sampled { runs }),
        }
    }

    /// `2^N` when the seeds cover the state space (every walk must close a cycle),
    /// otherwise the configured cap, never above `2^N`.
    fn iteration_cap(&self, n: usize, seeds: &[State]) -> usize {
        if n >= usize::BITS as usize - 1 {
            return self.config.max_steps;
        }
        let space = 1usize << n;
        let covering =
            seeds.len() >= space && seeds.iter().collect::<HashSet<_>>().len() == space;
        if covering {
            space
        } else {
            self.config.max_steps.min(space)
        }
    }

    /// Walk from the states of every attractor that no seed basin leads to (found only
    /// by later Monte Carlo runs) so each one gets a row, until no new attractor appears.
    fn close_retransitions(
        &mut self,
        network: &BooleanNetwork,
        registry: &mut Registry,
        weights: &mut Weights,
        unresolved: &mut Vec<UnresolvedBasin>,
        cap: usize,
        dynamics: Dynamics,
    ) {
        let mut row = 0;
        while row < registry.len() {
            if !weights.has_weight(row) {
                let origins = registry.attractors[row].states().to_vec();
                let walks = walk_all(network, &origins, cap, dynamics, self.rng.next_u64());
                accumulate(row, origins, walks, registry, weights, unresolved);
            }
            row += 1;
        }
    }

    /// Perturb every bit of every attractor state, appending newly reached attractors
    /// to the worklist until it closes.
    fn perturbation_weights(
        &mut self,
        network: &BooleanNetwork,
        registry: &mut Registry,
        unresolved: &mut Vec<UnresolvedBasin>,
        cap: usize,
        dynamics: Dynamics,
    ) -> Weights {
        let mut weights = Weights::default();
        let mut row = 0;
        while row < registry.len() {
            let origins: Vec<State> = registry.attractors[row]
                .states()
                .iter()
                .flat_map(|state| {
                    (0..network.len()).map(move |node| {
                        let mut perturbed = state.clone();
                        perturbed.flip(node);
                        perturbed
                    })
                })
                .collect();

            let walks = walk_all(network, &origins, cap, dynamics, self.rng.next_u64());
            accumulate(row, origins, walks, registry, &mut weights, unresolved);
            row += 1;
        }
        weights
    }
}
