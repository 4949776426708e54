//! Global network states as packed bit vectors.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// One bit per network node, indexed by node id.
///
/// States are compared, hashed and ordered by value so they can key the
/// visited-state maps used for cycle detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct State {
    len: usize,
    words: Vec<u64>,
}

impl State {
    /// All-false state of `len` bits.
    pub fn zeros(len: usize) -> Self {
        Self {
            len,
            words: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    /// State whose bit `i` is bit `i` of `index`.
    ///
    /// Only meaningful for `len <= 64`; higher bits are left unset.
    pub fn from_index(len: usize, index: u64) -> Self {
        let mut state = Self::zeros(len);
        if let Some(first) = state.words.first_mut() {
            let mask = if len >= WORD_BITS {
                u64::MAX
            } else {
                (1u64 << len) - 1
            };
            *first = index & mask;
        }
        state
    }

    /// Uniformly random state.
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        let mut state = Self::zeros(len);
        for word in state.words.iter_mut() {
            *word = rng.r#gen();
        }
        state.clear_padding();
        state
    }

    fn clear_padding(&mut self) {
        let rem = self.len % WORD_BITS;
        if rem != 0
            && let Some(last) = self.words.last_mut()
        {
            *last &= (1u64 << rem) - 1;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len);
        let mask = 1u64 << (index % WORD_BITS);
        if value {
            self.words[index / WORD_BITS] |= mask;
        } else {
            self.words[index / WORD_BITS] &= !mask;
        }
    }

    /// Invert the bit at `index`.
    #[inline]
    pub fn flip(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / WORD_BITS] ^= 1u64 << (index % WORD_BITS);
    }

    /// Number of true bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Bit values in node order.
    pub fn values(&self) -> Vec<bool> {
        (0..self.len).map(|i| self.get(i)).collect()
    }
}

impl From<&[bool]> for State {
    fn from(values: &[bool]) -> Self {
        let mut state = Self::zeros(values.len());
        for (i, &value) in values.iter().enumerate() {
            state.set(i, value);
        }
        state
    }
}

impl From<Vec<bool>> for State {
    fn from(values: Vec<bool>) -> Self {
        Self::from(values.as_slice())
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Error for state strings containing characters other than `0` and `1`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid state character `{0}`")]
pub struct ParseStateError(char);

impl FromStr for State {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(ParseStateError(other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from(values))
    }
}

impl From<State> for String {
    fn from(state: State) -> Self {
        state.to_string()
    }
}

impl TryFrom<String> for State {
    type Error = ParseStateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_string_roundtrip() {
        let state: State = "10110".parse().unwrap();
        assert_eq!(state.len(), 5);
        assert!(state.get(0));
        assert!(!state.get(1));
        assert_eq!(state.to_string(), "10110");
        assert_eq!(state.count_ones(), 3);
        assert!("10a".parse::<State>().is_err());
    }

    #[test]
    fn test_from_index() {
        // Bit i of the index is node i.
        let state = State::from_index(3, 0b001);
        assert_eq!(state.to_string(), "100");
        assert_eq!(State::from_index(3, 0b1111), State::from_index(3, 0b111));
    }

    #[test]
    fn test_wide_states() {
        let mut state = State::zeros(130);
        state.set(129, true);
        state.flip(64);
        assert!(state.get(129));
        assert!(state.get(64));
        assert!(!state.get(63));
        assert_eq!(state.count_ones(), 2);
    }

    #[test]
    fn test_random_respects_length() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let state = State::random(70, &mut rng);
            assert_eq!(state.values().len(), 70);
            assert_eq!(state, State::from(state.values()));
        }
    }

    #[test]
    fn test_serde_as_string() {
        let state: State = "0101".parse().unwrap();
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"0101\"");
        let parsed: State = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
