//! Deterministic and probabilistic Boolean variables.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::schema::ConfigError;

/// A Boolean variable with a truth bias.
///
/// A bias of exactly `0.0` or `1.0` gives a deterministic variable that always
/// evaluates to the same value. Any other bias gives a probabilistic variable that
/// draws a fresh Bernoulli sample on every evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum BooleanVariable {
    Deterministic(bool),
    Probabilistic(f64),
}

impl BooleanVariable {
    /// Create a variable from a bias in `[0, 1]`.
    pub fn new(bias: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&bias) {
            return Err(ConfigError::InvalidBias(bias));
        }
        Ok(Self::from_valid_bias(bias))
    }

    /// Create a variable, clamping finite biases outside `[0, 1]` into range.
    pub fn coerce(bias: f64) -> Result<Self, ConfigError> {
        if bias.is_nan() {
            return Err(ConfigError::InvalidBias(bias));
        }
        Ok(Self::from_valid_bias(bias.clamp(0.0, 1.0)))
    }

    /// Deterministic variable holding `value`.
    pub fn constant(value: bool) -> Self {
        Self::Deterministic(value)
    }

    fn from_valid_bias(bias: f64) -> Self {
        if bias == 0.0 {
            Self::Deterministic(false)
        } else if bias == 1.0 {
            Self::Deterministic(true)
        } else {
            Self::Probabilistic(bias)
        }
    }

    /// Probability of evaluating to true.
    #[inline]
    pub fn bias(&self) -> f64 {
        match *self {
            Self::Deterministic(value) => {
                if value {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Probabilistic(bias) => bias,
        }
    }

    #[inline]
    pub fn is_deterministic(&self) -> bool {
        matches!(self, Self::Deterministic(_))
    }

    /// Evaluate the variable.
    #[inline]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        match *self {
            Self::Deterministic(value) => value,
            Self::Probabilistic(bias) => rng.gen_bool(bias),
        }
    }

    /// Deterministic projection: the more likely value, ties going to true.
    #[inline]
    pub fn project(&self) -> bool {
        match *self {
            Self::Deterministic(value) => value,
            Self::Probabilistic(bias) => bias >= 0.5,
        }
    }
}

impl PartialEq for BooleanVariable {
    fn eq(&self, other: &Self) -> bool {
        self.bias() == other.bias()
    }
}

impl From<bool> for BooleanVariable {
    fn from(value: bool) -> Self {
        Self::Deterministic(value)
    }
}

impl TryFrom<f64> for BooleanVariable {
    type Error = ConfigError;

    fn try_from(bias: f64) -> Result<Self, Self::Error> {
        Self::new(bias)
    }
}

impl From<BooleanVariable> for f64 {
    fn from(variable: BooleanVariable) -> Self {
        variable.bias()
    }
}
