//! Persisted Boolean network format.

use serde::{Deserialize, Serialize};

/// Structural serialization of a Boolean network.
///
/// Holds everything needed to rebuild an identical network: sizes, the input and
/// output node sets and, for every node, its predecessors and full truth table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkModel {
    /// Number of nodes.
    pub n: usize,
    /// In-degree of every node.
    pub k: usize,
    /// Input node ids.
    #[serde(default)]
    pub inputs: Vec<usize>,
    /// Output node ids.
    #[serde(default)]
    pub outputs: Vec<usize>,
    /// Node definitions, ordered by id.
    pub nodes: Vec<NodeModel>,
}

/// A single node of a persisted network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeModel {
    /// Node id; must equal the node's position.
    pub id: usize,
    /// Ordered predecessor ids.
    pub predecessors: Vec<usize>,
    /// Truth bias of every table entry, indexed by predecessor state.
    pub table: Vec<f64>,
}

/// A persisted network with search statistics attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedModel {
    #[serde(flatten)]
    pub model: NetworkModel,
    pub stats: ModelStats,
}

/// Search statistics stored next to an archived model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    /// Distance to the target when the model was saved.
    pub distance: f64,
    /// Search iteration that produced the model.
    pub iteration: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archived_model_flattens() {
        let archived = ArchivedModel {
            model: NetworkModel {
                n: 1,
                k: 1,
                inputs: vec![],
                outputs: vec![0],
                nodes: vec![NodeModel {
                    id: 0,
                    predecessors: vec![0],
                    table: vec![1.0, 0.0],
                }],
            },
            stats: ModelStats {
                distance: 0.5,
                iteration: 3,
            },
        };

        let json = serde_json::to_value(&archived).unwrap();
        assert_eq!(json["n"], 1);
        assert_eq!(json["stats"]["iteration"], 3);

        // An archived model still reads as a plain model.
        let model: NetworkModel = serde_json::from_value(json).unwrap();
        assert_eq!(model, archived.model);
    }
}
