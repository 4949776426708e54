//! bn-controller - Boolean network controller synthesis.
//!
//! This crate searches for Boolean networks whose attractor structure matches a
//! target. Networks are edited by flipping truth table entries; each candidate is
//! scored by computing its attractors and attractor transition matrix (ATM) and
//! measuring the structural distance to the target.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration types, the persisted network format and search results
//! - `compute`: Network dynamics, attractor analysis, distance metrics and the search engine
//!
//! # Example
//!
//! ```rust,no_run
//! use bn_controller::{
//!     schema::{AnalysisConfig, GeneratorConfig},
//!     compute::{AttractorAnalyzer, NetworkGenerator},
//! };
//!
//! // Generate a random network
//! let mut generator = NetworkGenerator::new(GeneratorConfig {
//!     n: 10,
//!     random_seed: Some(42),
//!     ..Default::default()
//! })?;
//! let network = generator.generate()?;
//!
//! // Compute its attractors
//! let mut analyzer = AttractorAnalyzer::new(AnalysisConfig::default())?;
//! let analysis = analyzer.analyze(&network)?;
//!
//! println!("{} attractors", analysis.attractors.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod schema;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use compute::{AttractorAnalysis, AttractorAnalyzer, BooleanNetwork, State};
pub use schema::{ExperimentConfig, TargetStructure};
