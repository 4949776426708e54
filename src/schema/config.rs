//! Configuration types for network generation, attractor analysis and search budgets.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::TargetStructure;

/// Largest network for which every state can be enumerated as a seed.
pub const MAX_EXHAUSTIVE_NODES: usize = 24;

/// Largest supported in-degree (truth tables hold `2^K` entries).
pub const MAX_IN_DEGREE: usize = 16;

/// Parameters of the random network generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of nodes (N).
    pub n: usize,
    /// In-degree of every node (K).
    pub k: usize,
    /// Probability that a truth table entry is true.
    pub p: f64,
    /// Probability that a truth table entry gets a probabilistic bias instead.
    #[serde(default)]
    pub q: f64,
    /// Number of input nodes, taken as ids `0..inputs`.
    pub inputs: usize,
    /// Number of output nodes, taken as ids `inputs..inputs + outputs`.
    pub outputs: usize,
    /// Allow a node to be its own predecessor.
    #[serde(default)]
    pub self_loops: bool,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            n: 20,
            k: 2,
            p: 0.5,
            q: 0.0,
            inputs: 8,
            outputs: 2,
            self_loops: false,
            random_seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Validate generation parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 {
            return Err(ConfigError::InvalidGenerator(
                "network must have at least one node".into(),
            ));
        }
        if self.k > MAX_IN_DEGREE {
            return Err(ConfigError::InvalidGenerator(format!(
                "in-degree {} exceeds the supported maximum {}",
                self.k, MAX_IN_DEGREE
            )));
        }
        let candidates = if self.self_loops { self.n } else { self.n - 1 };
        if self.k > candidates {
            return Err(ConfigError::InvalidGenerator(format!(
                "in-degree {} needs more than {} distinct predecessors",
                self.k, candidates
            )));
        }
        if self.inputs + self.outputs > self.n {
            return Err(ConfigError::InvalidGenerator(format!(
                "{} inputs and {} outputs do not fit into {} nodes",
                self.inputs, self.outputs, self.n
            )));
        }
        check_probability(self.p, "p")?;
        check_probability(self.q, "q")?;
        Ok(())
    }
}

/// How seed states for attractor exploration are chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SeedPolicy {
    /// Every one of the `2^N` states.
    Exhaustive,
    /// A bounded number of uniformly drawn states.
    Sampled { count: usize },
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self::Exhaustive
    }
}

/// How networks with probabilistic entries are explored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProbabilisticPolicy {
    /// Refuse to analyze networks with probabilistic entries.
    RequireDeterministic,
    /// Collapse every bias to its deterministic projection (`bias >= 0.5`).
    Project,
    /// Sample `runs` trajectories per seed.
    MonteCarlo { runs: usize },
}

impl Default for ProbabilisticPolicy {
    fn default() -> Self {
        Self::Project
    }
}

/// Model used to fill the attractor transition matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionModel {
    /// Each seed re-transitions to an attractor; weight goes from its basin to the target.
    Retransition,
    /// Single-bit perturbations of every attractor state.
    Perturbation,
}

impl Default for TransitionModel {
    fn default() -> Self {
        Self::Retransition
    }
}

/// Attractor analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Seed set policy.
    #[serde(default)]
    pub seeds: SeedPolicy,
    /// Probabilistic network policy.
    #[serde(default)]
    pub probabilistic: ProbabilisticPolicy,
    /// Transition model for the ATM.
    #[serde(default)]
    pub transition: TransitionModel,
    /// Per-seed iteration cap used when seeds do not cover the state space.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_max_steps() -> usize {
    10_000
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seeds: SeedPolicy::default(),
            probabilistic: ProbabilisticPolicy::default(),
            transition: TransitionModel::default(),
            max_steps: default_max_steps(),
            random_seed: None,
        }
    }
}

impl AnalysisConfig {
    /// Validate analyzer parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::InvalidAnalysis(
                "max_steps must be positive".into(),
            ));
        }
        if let SeedPolicy::Sampled { count: 0 } = self.seeds {
            return Err(ConfigError::InvalidAnalysis(
                "sampled seed count must be positive".into(),
            ));
        }
        if let ProbabilisticPolicy::MonteCarlo { runs: 0 } = self.probabilistic {
            return Err(ConfigError::InvalidAnalysis(
                "Monte Carlo run count must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Structural distance metric selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MetricConfig {
    /// Positional L1 distance between transition matrices.
    Matrix,
    /// Threshold ergodic set profile distance.
    Tes { thresholds: Vec<f64> },
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self::Tes {
            thresholds: vec![0.0, 0.1, 0.2, 0.5],
        }
    }
}

/// Variable neighborhood search budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of iterations.
    #[serde(default = "default_max_iters")]
    pub max_iters: usize,
    /// Equal-distance moves tolerated before the neighborhood grows.
    /// `None` never grows the neighborhood; `Some(1)` is a pure adaptive walk.
    #[serde(default = "default_max_stalls")]
    pub max_stalls: Option<usize>,
    /// Distance at or below which the search stops.
    #[serde(default)]
    pub min_target: f64,
    /// Gaussian strength used to perturb probabilistic entries.
    #[serde(default = "default_perturbation")]
    pub perturbation: f64,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_max_iters() -> usize {
    10_000
}
fn default_max_stalls() -> Option<usize> {
    Some(1)
}
fn default_perturbation() -> f64 {
    0.1
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iters: default_max_iters(),
            max_stalls: default_max_stalls(),
            min_target: 0.0,
            perturbation: default_perturbation(),
            random_seed: None,
        }
    }
}

impl SearchConfig {
    /// Validate search budgets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_stalls == Some(0) {
            return Err(ConfigError::InvalidBudget(
                "max_stalls must be at least 1".into(),
            ));
        }
        if !self.min_target.is_finite() || self.min_target < 0.0 {
            return Err(ConfigError::InvalidBudget(format!(
                "min_target {} must be a non-negative number",
                self.min_target
            )));
        }
        if !self.perturbation.is_finite() || self.perturbation <= 0.0 {
            return Err(ConfigError::InvalidBudget(format!(
                "perturbation {} must be positive",
                self.perturbation
            )));
        }
        Ok(())
    }
}

/// Where improving models are written during a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Output directory.
    pub output_dir: PathBuf,
    /// Keep a numbered copy of every model at or below this distance.
    #[serde(default)]
    pub save_threshold: Option<f64>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("models"),
            save_threshold: None,
        }
    }
}

/// Top-level record consumed by the runner binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Parameters for generating the initial network.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Load the initial network from this file instead of generating one.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// Attractor analyzer settings. Defaults to the perturbation model, since
    /// retransition gives every deterministic network an identity ATM.
    #[serde(default = "default_experiment_analysis")]
    pub analysis: AnalysisConfig,
    /// Distance metric.
    #[serde(default)]
    pub metric: MetricConfig,
    /// Search budgets.
    #[serde(default)]
    pub search: SearchConfig,
    /// Target expression structure.
    #[serde(default)]
    pub target: TargetStructure,
    /// Model archive settings.
    #[serde(default)]
    pub archive: Option<ArchiveConfig>,
}

fn default_experiment_analysis() -> AnalysisConfig {
    AnalysisConfig {
        transition: TransitionModel::Perturbation,
        ..Default::default()
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            model_path: None,
            analysis: default_experiment_analysis(),
            metric: MetricConfig::default(),
            search: SearchConfig::default(),
            target: TargetStructure::default(),
            archive: None,
        }
    }
}

impl ExperimentConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model_path.is_none() {
            self.generator.validate()?;
        }
        self.analysis.validate()?;
        self.search.validate()?;
        Ok(())
    }
}

fn check_probability(value: f64, name: &str) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidGenerator(format!(
            "{} = {} is not a probability",
            name, value
        )))
    }
}

/// Invalid construction parameters or requests.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Bias {0} cannot be used as a truth probability")]
    InvalidBias(f64),
    #[error("Requested {requested} flips but only {eligible} entries are eligible")]
    InsufficientEntries { requested: usize, eligible: usize },
    #[error("Invalid generator parameters: {0}")]
    InvalidGenerator(String),
    #[error("Invalid analysis parameters: {0}")]
    InvalidAnalysis(String),
    #[error("Invalid search budget: {0}")]
    InvalidBudget(String),
    #[error("Cannot enumerate all states of {nodes} nodes (limit is {limit})")]
    StateSpaceTooLarge { nodes: usize, limit: usize },
    #[error("Network has probabilistic entries but the analysis requires a deterministic network")]
    ProbabilisticNetwork,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_experiment_analysis_defaults_to_perturbation() {
        assert_eq!(
            ExperimentConfig::default().analysis.transition,
            TransitionModel::Perturbation
        );
        let parsed: ExperimentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.analysis.transition, TransitionModel::Perturbation);

        // The analyzer on its own keeps the retransition model.
        assert_eq!(
            AnalysisConfig::default().transition,
            TransitionModel::Retransition
        );
    }

    #[test]
    fn test_generator_rejects_crowded_io() {
        let config = GeneratorConfig {
            n: 4,
            inputs: 3,
            outputs: 2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGenerator(_))
        ));
    }

    #[test]
    fn test_generator_rejects_in_degree_without_self_loops() {
        let config = GeneratorConfig {
            n: 3,
            k: 3,
            inputs: 0,
            outputs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GeneratorConfig {
            self_loops: true,
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_stalls_rejected() {
        let config = SearchConfig {
            max_stalls: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBudget(_))
        ));
    }

    #[test]
    fn test_serialization() {
        let config = ExperimentConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ExperimentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.search.max_iters, config.search.max_iters);
        assert_eq!(parsed.metric, config.metric);
        assert_eq!(parsed.analysis.seeds, SeedPolicy::Exhaustive);
    }

    #[test]
    fn test_tagged_policies_parse() {
        let json = r#"{
            "seeds": { "type": "Sampled", "count": 64 },
            "probabilistic": { "type": "MonteCarlo", "runs": 8 },
            "transition": "Perturbation"
        }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.seeds, SeedPolicy::Sampled { count: 64 });
        assert_eq!(
            config.probabilistic,
            ProbabilisticPolicy::MonteCarlo { runs: 8 }
        );
        assert_eq!(config.transition, TransitionModel::Perturbation);
        assert_eq!(config.max_steps, 10_000);
    }
}
