//! Random Boolean network generation.

use rand::prelude::*;
use rand::seq::index;

use super::{BooleanNetwork, BooleanVariable, NetworkNode, StructuralError};
use crate::schema::{ConfigError, GeneratorConfig};

/// Random network generator (RBN factory).
pub struct NetworkGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl NetworkGenerator {
    /// Create a generator, validating its parameters.
    pub fn new(config: GeneratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.random_seed.unwrap_or_else(rand::random);
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a fresh network.
    ///
    /// Inputs are nodes `0..I`, outputs the following `O` nodes.
    pub fn generate(&mut self) -> Result<BooleanNetwork, StructuralError> {
        let n = self.config.n;
        let nodes = (0..n).map(|id| self.random_node(id)).collect();
        let inputs = 0..self.config.inputs;
        let outputs = self.config.inputs..self.config.inputs + self.config.outputs;
        BooleanNetwork::new(self.config.k, nodes, inputs, outputs)
    }

    fn random_node(&mut self, id: usize) -> NetworkNode {
        let n = self.config.n;
        let k = self.config.k;

        let predecessors = if self.config.self_loops {
            index::sample(&mut self.rng, n, k).into_vec()
        } else {
            // Draw from the n - 1 other nodes and skip over `id`.
            index::sample(&mut self.rng, n - 1, k)
                .into_iter()
                .map(|p| if p >= id { p + 1 } else { p })
                .collect()
        };

        let table = (0..1usize << k).map(|_| self.random_entry()).collect();
        NetworkNode::new(predecessors, table)
    }

    fn random_entry(&mut self) -> BooleanVariable {
        if self.config.q > 0.0 && self.rng.gen_bool(self.config.q) {
            // Open interval keeps the entry probabilistic.
            let bias = self.rng.gen_range(f64::EPSILON..1.0);
            BooleanVariable::Probabilistic(bias)
        } else {
            BooleanVariable::from(self.rng.gen_bool(self.config.p))
        }
    }
}
