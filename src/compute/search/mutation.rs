//! Truth table mutation: drawing and inverting flip batches.

use std::collections::BTreeSet;

use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::compute::{BooleanNetwork, Flip};
use crate::schema::{ConfigError, SearchConfig};

/// Attempts at a Gaussian move before falling back to inverting the projection.
const MAX_PERTURBATION_DRAWS: usize = 64;

/// Draws random truth table edits.
pub struct MutationOperator {
    rng: StdRng,
    perturbation: f64,
}

impl MutationOperator {
    /// Create from a seed and the Gaussian strength used for probabilistic entries.
    pub fn new(seed: u64, perturbation: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            perturbation,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        let seed = config.random_seed.unwrap_or_else(rand::random);
        Self::new(seed, config.perturbation)
    }

    /// `(node, entry)` pairs that may be flipped.
    pub fn eligible_entries(
        network: &BooleanNetwork,
        excluded_nodes: &BTreeSet<usize>,
        history: &[Flip],
    ) -> Vec<(usize, usize)> {
        let entries = network.entries_per_node();
        (0..network.len())
            .filter(|node| !excluded_nodes.contains(node))
            .flat_map(|node| (0..entries).map(move |entry| (node, entry)))
            .filter(|&(node, entry)| {
                !history
                    .iter()
                    .any(|flip| flip.node == node && flip.entry == entry)
            })
            .collect()
    }

    /// Draw `count` distinct entries uniformly among the eligible ones and compute
    /// their new biases. The network is not modified.
    pub fn generate_flips(
        &mut self,
        network: &BooleanNetwork,
        count: usize,
        excluded_nodes: &BTreeSet<usize>,
        history: &[Flip],
    ) -> Result<Vec<Flip>, ConfigError> {
        let eligible = Self::eligible_entries(network, excluded_nodes, history);
        if count > eligible.len() {
            return Err(ConfigError::InsufficientEntries {
                requested: count,
                eligible: eligible.len(),
            });
        }

        let mut flips = Vec::with_capacity(count);
        for (node, entry) in eligible.choose_multiple(&mut self.rng, count).copied() {
            let old_bias = network.nodes()[node].table()[entry].bias();
            let new_bias = self.mutated_bias(old_bias);
            flips.push(Flip {
                node,
                entry,
                old_bias,
                new_bias,
            });
        }
        Ok(flips)
    }

    /// Deterministic entries are inverted; probabilistic ones get Gaussian noise,
    /// clamped into `[0, 1]` and redrawn until the value changes.
    fn mutated_bias(&mut self, bias: f64) -> f64 {
        if bias == 0.0 || bias == 1.0 {
            return 1.0 - bias;
        }
        for _ in 0..MAX_PERTURBATION_DRAWS {
            let noise: f64 = self.rng.sample(StandardNormal);
            let candidate = (bias + self.perturbation * noise).clamp(0.0, 1.0);
            if candidate != bias {
                return candidate;
            }
        }
        if bias >= 0.5 { 0.0 } else { 1.0 }
    }
}

/// The batch that undoes `flips`: reversed order, old and new biases swapped.
pub fn invert(flips: &[Flip]) -> Vec<Flip> {
    flips.iter().rev().map(Flip::inverse).collect()
}
