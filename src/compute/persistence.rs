//! Reading and writing persisted networks.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use super::{BooleanNetwork, StructuralError};
use crate::schema::NetworkModel;

/// Failure to read or write a persisted network.
#[derive(Debug, thiserror::Error)]
pub enum NetworkIoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed network JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid network: {0}")]
    Structural(#[from] StructuralError),
}

/// Write `value` as pretty JSON.
pub(crate) fn write_json<T: Serialize, P: AsRef<Path>>(
    path: P,
    value: &T,
) -> Result<(), NetworkIoError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Save a network in the persisted JSON format.
pub fn save_network<P: AsRef<Path>>(
    network: &BooleanNetwork,
    path: P,
) -> Result<(), NetworkIoError> {
    write_json(path, &network.to_model())
}

/// Load and validate a network saved with [`save_network`].
///
/// Extra top-level fields (such as archived search statistics) are ignored.
pub fn load_network<P: AsRef<Path>>(path: P) -> Result<BooleanNetwork, NetworkIoError> {
    let json = fs::read_to_string(path)?;
    let model: NetworkModel = serde_json::from_str(&json)?;
    Ok(BooleanNetwork::try_from(model)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::network::tests::two_cycle_network;
    use crate::compute::{BooleanVariable, NetworkGenerator, State};
    use crate::schema::GeneratorConfig;
    use proptest::prelude::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bn.json");

        let bn = two_cycle_network();
        save_network(&bn, &path).unwrap();
        let loaded = load_network(&path).unwrap();
        assert_eq!(loaded, bn);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_network(dir.path().join("missing.json"));
        assert!(matches!(result, Err(NetworkIoError::Io(_))));
    }

    #[test]
    fn test_load_rejects_invalid_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bn.json");
        let json = r#"{
            "n": 1,
            "k": 1,
            "nodes": [{ "id": 0, "predecessors": [4], "table": [0.0, 1.0] }]
        }"#;
        fs::write(&path, json).unwrap();
        assert!(matches!(
            load_network(&path),
            Err(NetworkIoError::Structural(StructuralError::UnknownNode { .. }))
        ));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_network(&path), Err(NetworkIoError::Json(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_roundtrip_preserves_dynamics(seed in any::<u64>(), q in 0.0f64..0.5) {
            let mut generator = NetworkGenerator::new(GeneratorConfig {
                n: 6,
                k: 2,
                q,
                inputs: 2,
                outputs: 1,
                random_seed: Some(seed),
                ..Default::default()
            })
            .unwrap();
            let bn = generator.generate().unwrap();

            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("bn.json");
            save_network(&bn, &path).unwrap();
            let loaded = load_network(&path).unwrap();

            prop_assert_eq!(loaded.inputs(), bn.inputs());
            prop_assert_eq!(loaded.outputs(), bn.outputs());
            for (a, b) in loaded.nodes().iter().zip(bn.nodes()) {
                let biases: Vec<f64> = a.table().iter().map(BooleanVariable::bias).collect();
                let expected: Vec<f64> = b.table().iter().map(BooleanVariable::bias).collect();
                prop_assert_eq!(biases, expected);
            }
            for i in 0..1u64 << 6 {
                let state = State::from_index(6, i);
                prop_assert_eq!(loaded.step_projected(&state), bn.step_projected(&state));
            }
        }
    }
}
