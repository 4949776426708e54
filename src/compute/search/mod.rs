//! Variable neighborhood search for Boolean network controllers.
//!
//! # Overview
//!
//! - **Mutation** (`mutation`): random truth table edits and their inverses
//! - **Strategies** (`strategy`): the `Evaluator` and `Scrambler` seams
//! - **Engine** (`engine`): the descent loop with adaptive neighborhood size
//! - **Archive** (`archive`): persistence of improving models
//!
//! # Example
//!
//! ```rust,no_run
//! use bn_controller::compute::search::{AttractorDistance, SearchEngine};
//! use bn_controller::compute::NetworkGenerator;
//! use bn_controller::schema::ExperimentConfig;
//!
//! let config = ExperimentConfig::default();
//! let network = NetworkGenerator::new(config.generator.clone())?.generate()?;
//! let evaluator = AttractorDistance::from_config(&config)?;
//!
//! let mut engine = SearchEngine::new(config.search.clone(), network, evaluator)?;
//! let outcome = engine.run_with_callback(|progress, _| {
//!     println!("Iteration {}: distance = {}", progress.iteration, progress.distance);
//! })?;
//! println!("Stopped: {:?}", outcome.stats.stop_reason);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod archive;
mod engine;
mod mutation;
mod strategy;

pub use archive::{LAST_MODEL_NAME, ModelArchive};
pub use engine::{SearchEngine, SearchOutcome};
pub use mutation::{MutationOperator, invert};
pub use strategy::{AttractorDistance, Evaluator, Scrambler};

use crate::compute::StructuralError;
use crate::schema::{ComparisonError, ConfigError};

/// A search aborted by a failure (not by reaching a terminal state).
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),
    #[error("Comparison error: {0}")]
    Comparison(#[from] ComparisonError),
}
