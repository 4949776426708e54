//! Boolean network model: nodes, synchronous update and truth table edits.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{BooleanVariable, State};
use crate::schema::{MAX_IN_DEGREE, NetworkModel, NodeModel};

/// A node of a Boolean network.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkNode {
    predecessors: Vec<usize>,
    table: Vec<BooleanVariable>,
}

impl NetworkNode {
    /// Create a node. The table must hold `2^predecessors.len()` entries;
    /// this is checked when the node is added to a network.
    pub fn new(predecessors: Vec<usize>, table: Vec<BooleanVariable>) -> Self {
        Self {
            predecessors,
            table,
        }
    }

    #[inline]
    pub fn predecessors(&self) -> &[usize] {
        &self.predecessors
    }

    #[inline]
    pub fn table(&self) -> &[BooleanVariable] {
        &self.table
    }

    /// Table entry selected by the predecessor values in `state`.
    ///
    /// The first predecessor is the most significant bit of the entry index.
    #[inline]
    pub fn entry_index(&self, state: &State) -> usize {
        self.predecessors
            .iter()
            .fold(0usize, |acc, &p| (acc << 1) | state.get(p) as usize)
    }
}

/// A single truth table edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flip {
    pub node: usize,
    pub entry: usize,
    pub old_bias: f64,
    pub new_bias: f64,
}

impl Flip {
    /// The edit that undoes this one.
    pub fn inverse(&self) -> Self {
        Self {
            node: self.node,
            entry: self.entry,
            old_bias: self.new_bias,
            new_bias: self.old_bias,
        }
    }

    /// Whether both flips address the same table entry.
    #[inline]
    pub fn same_entry(&self, other: &Flip) -> bool {
        self.node == other.node && self.entry == other.entry
    }
}

/// A synchronous Boolean network with designated input and output nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanNetwork {
    k: usize,
    nodes: Vec<NetworkNode>,
    inputs: BTreeSet<usize>,
    outputs: BTreeSet<usize>,
}

impl BooleanNetwork {
    /// Build a network, validating its structure.
    ///
    /// Every node must have exactly `k` predecessors with valid ids and a
    /// `2^k` entry table of biases in `[0, 1]`; inputs and outputs must be
    /// disjoint sets of node ids. Entries with bias `0` or `1` are stored as
    /// deterministic.
    pub fn new(
        k: usize,
        mut nodes: Vec<NetworkNode>,
        inputs: impl IntoIterator<Item = usize>,
        outputs: impl IntoIterator<Item = usize>,
    ) -> Result<Self, StructuralError> {
        let n = nodes.len();
        if n == 0 {
            return Err(StructuralError::Empty);
        }
        if k > MAX_IN_DEGREE {
            return Err(StructuralError::InDegreeTooLarge {
                k,
                max: MAX_IN_DEGREE,
            });
        }

        for (id, node) in nodes.iter().enumerate() {
            if node.predecessors.len() != k {
                return Err(StructuralError::InDegree {
                    node: id,
                    found: node.predecessors.len(),
                    expected: k,
                });
            }
            if let Some(&p) = node.predecessors.iter().find(|&&p| p >= n) {
                return Err(StructuralError::UnknownNode { node: p, n });
            }
            if node.table.len() != 1 << k {
                return Err(StructuralError::TableSize {
                    node: id,
                    found: node.table.len(),
                    expected: 1 << k,
                });
            }
        }

        for entry in nodes.iter_mut().flat_map(|node| node.table.iter_mut()) {
            let bias = entry.bias();
            *entry = BooleanVariable::new(bias).map_err(|_| StructuralError::InvalidBias(bias))?;
        }

        let inputs: BTreeSet<usize> = inputs.into_iter().collect();
        let outputs: BTreeSet<usize> = outputs.into_iter().collect();
        if let Some(&id) = inputs.iter().chain(outputs.iter()).find(|&&id| id >= n) {
            return Err(StructuralError::UnknownNode { node: id, n });
        }
        if let Some(&id) = inputs.intersection(&outputs).next() {
            return Err(StructuralError::OverlappingIo(id));
        }

        Ok(Self {
            k,
            nodes,
            inputs,
            outputs,
        })
    }

    /// Number of nodes (N).
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Networks always hold at least one node.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// In-degree (K).
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&NetworkNode> {
        self.nodes.get(id)
    }

    pub fn inputs(&self) -> &BTreeSet<usize> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeSet<usize> {
        &self.outputs
    }

    /// Entries per truth table (`2^K`).
    #[inline]
    pub fn entries_per_node(&self) -> usize {
        1 << self.k
    }

    /// Total number of truth table entries.
    pub fn entry_count(&self) -> usize {
        self.len() * self.entries_per_node()
    }

    /// Input nodes are reserved from structural mutation.
    #[inline]
    pub fn is_protected(&self, node: usize) -> bool {
        self.inputs.contains(&node)
    }

    /// Whether every table entry is deterministic.
    pub fn is_deterministic(&self) -> bool {
        self.nodes
            .iter()
            .all(|node| node.table.iter().all(BooleanVariable::is_deterministic))
    }

    /// Bias of one table entry.
    pub fn bias(&self, node: usize, entry: usize) -> Result<f64, StructuralError> {
        self.variable(node, entry).map(BooleanVariable::bias)
    }

    fn variable(&self, node: usize, entry: usize) -> Result<&BooleanVariable, StructuralError> {
        let n = self.len();
        let entries = self.entries_per_node();
        self.nodes
            .get(node)
            .ok_or(StructuralError::UnknownNode { node, n })?
            .table
            .get(entry)
            .ok_or(StructuralError::UnknownEntry {
                node,
                entry,
                entries,
            })
    }

    /// Synchronous update; probabilistic entries are sampled from `rng`.
    pub fn step<R: Rng + ?Sized>(&self, state: &State, rng: &mut R) -> State {
        self.step_by(state, |variable| variable.sample(&mut *rng))
    }

    /// Synchronous update using the deterministic projection of every entry.
    pub fn step_projected(&self, state: &State) -> State {
        self.step_by(state, BooleanVariable::project)
    }

    /// Every node reads the same snapshot `state`; results go into a fresh state.
    fn step_by<F>(&self, state: &State, mut evaluate: F) -> State
    where
        F: FnMut(&BooleanVariable) -> bool,
    {
        debug_assert_eq!(state.len(), self.len());
        let mut next = State::zeros(self.len());
        for (id, node) in self.nodes.iter().enumerate() {
            let variable = &node.table[node.entry_index(state)];
            next.set(id, evaluate(variable));
        }
        next
    }

    /// Overwrite one table entry with `flip.new_bias`, returning the displaced bias.
    pub fn apply(&mut self, flip: &Flip) -> Result<f64, StructuralError> {
        let previous = self.bias(flip.node, flip.entry)?;
        let variable = BooleanVariable::new(flip.new_bias)
            .map_err(|_| StructuralError::InvalidBias(flip.new_bias))?;
        self.nodes[flip.node].table[flip.entry] = variable;
        Ok(previous)
    }

    /// Apply a batch of flips in order.
    pub fn apply_all(&mut self, flips: &[Flip]) -> Result<(), StructuralError> {
        for flip in flips {
            self.apply(flip)?;
        }
        Ok(())
    }

    /// Write external values into the input node bits of `state`, in input id order.
    pub fn force_inputs(&self, state: &mut State, values: &[bool]) -> Result<(), StructuralError> {
        if values.len() != self.inputs.len() {
            return Err(StructuralError::InputWidth {
                found: values.len(),
                expected: self.inputs.len(),
            });
        }
        for (&id, &value) in self.inputs.iter().zip(values) {
            state.set(id, value);
        }
        Ok(())
    }

    /// Output node values of `state`, in output id order.
    pub fn read_outputs(&self, state: &State) -> Vec<bool> {
        self.outputs.iter().map(|&id| state.get(id)).collect()
    }

    /// Persisted form of this network.
    pub fn to_model(&self) -> NetworkModel {
        NetworkModel {
            n: self.len(),
            k: self.k,
            inputs: self.inputs.iter().copied().collect(),
            outputs: self.outputs.iter().copied().collect(),
            nodes: self
                .nodes
                .iter()
                .enumerate()
                .map(|(id, node)| NodeModel {
                    id,
                    predecessors: node.predecessors.clone(),
                    table: node.table.iter().map(BooleanVariable::bias).collect(),
                })
                .collect(),
        }
    }
}

impl TryFrom<NetworkModel> for BooleanNetwork {
    type Error = StructuralError;

    fn try_from(model: NetworkModel) -> Result<Self, Self::Error> {
        if model.nodes.len() != model.n {
            return Err(StructuralError::NodeCount {
                found: model.nodes.len(),
                expected: model.n,
            });
        }

        let mut nodes = Vec::with_capacity(model.n);
        for (position, node) in model.nodes.into_iter().enumerate() {
            if node.id != position {
                return Err(StructuralError::NodeOrder {
                    position,
                    id: node.id,
                });
            }
            let table = node
                .table
                .into_iter()
                .map(|bias| {
                    BooleanVariable::new(bias).map_err(|_| StructuralError::InvalidBias(bias))
                })
                .collect::<Result<Vec<_>, _>>()?;
            nodes.push(NetworkNode::new(node.predecessors, table));
        }

        Self::new(model.k, nodes, model.inputs, model.outputs)
    }
}

/// Malformed Boolean network or out-of-range edit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructuralError {
    #[error("Network must contain at least one node")]
    Empty,
    #[error("Model declares {expected} nodes but defines {found}")]
    NodeCount { found: usize, expected: usize },
    #[error("Node at position {position} is labelled {id}")]
    NodeOrder { position: usize, id: usize },
    #[error("In-degree {k} exceeds the supported maximum {max}")]
    InDegreeTooLarge { k: usize, max: usize },
    #[error("Node {node} has {found} predecessors, expected {expected}")]
    InDegree {
        node: usize,
        found: usize,
        expected: usize,
    },
    #[error("Node {node} has {found} table entries, expected {expected}")]
    TableSize {
        node: usize,
        found: usize,
        expected: usize,
    },
    #[error("Node id {node} is out of range for {n} nodes")]
    UnknownNode { node: usize, n: usize },
    #[error("Entry {entry} of node {node} is out of range ({entries} entries)")]
    UnknownEntry {
        node: usize,
        entry: usize,
        entries: usize,
    },
    #[error("Node {0} is both an input and an output")]
    OverlappingIo(usize),
    #[error("Bias {0} is not a truth probability")]
    InvalidBias(f64),
    #[error("Expected {expected} input values, got {found}")]
    InputWidth { found: usize, expected: usize },
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn det(values: &[u8]) -> Vec<BooleanVariable> {
        values.iter().map(|&v| BooleanVariable::from(v == 1)).collect()
    }

    /// 3 nodes, K = 1: node 0 negates itself, nodes 1 and 2 are constant false.
    /// `000 -> 100 -> 000`.
    pub(crate) fn two_cycle_network() -> BooleanNetwork {
        BooleanNetwork::new(
            1,
            vec![
                NetworkNode::new(vec![0], det(&[1, 0])),
                NetworkNode::new(vec![1], det(&[0, 0])),
                NetworkNode::new(vec![2], det(&[0, 0])),
            ],
            [],
            [],
        )
        .unwrap()
    }

    /// 2 nodes, K = 1: each node copies itself, so every state is a fixed point.
    pub(crate) fn identity_network() -> BooleanNetwork {
        BooleanNetwork::new(
            1,
            vec![
                NetworkNode::new(vec![0], det(&[0, 1])),
                NetworkNode::new(vec![1], det(&[0, 1])),
            ],
            [],
            [],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_out_of_range_entry() {
        let result = BooleanNetwork::new(
            1,
            vec![NetworkNode::new(
                vec![0],
                vec![BooleanVariable::Probabilistic(1.5), BooleanVariable::from(true)],
            )],
            [],
            [],
        );
        assert_eq!(result, Err(StructuralError::InvalidBias(1.5)));

        let result = BooleanNetwork::new(
            1,
            vec![NetworkNode::new(
                vec![0],
                vec![BooleanVariable::Probabilistic(f64::NAN), BooleanVariable::from(true)],
            )],
            [],
            [],
        );
        assert!(matches!(result, Err(StructuralError::InvalidBias(_))));
    }

    #[test]
    fn test_boundary_biases_become_deterministic() {
        let bn = BooleanNetwork::new(
            1,
            vec![NetworkNode::new(
                vec![0],
                vec![
                    BooleanVariable::Probabilistic(0.0),
                    BooleanVariable::Probabilistic(1.0),
                ],
            )],
            [],
            [],
        )
        .unwrap();

        assert!(bn.is_deterministic());
        assert!(bn.nodes()[0].table().iter().all(BooleanVariable::is_deterministic));

        let mut rng = StdRng::seed_from_u64(3);
        let state: State = "0".parse().unwrap();
        assert_eq!(bn.step(&state, &mut rng), state);
    }

    #[test]
    fn test_two_cycle_step() {
        let bn = two_cycle_network();
        let mut rng = StdRng::seed_from_u64(0);
        let s0: State = "000".parse().unwrap();
        let s1 = bn.step(&s0, &mut rng);
        assert_eq!(s1.to_string(), "100");
        assert_eq!(bn.step(&s1, &mut rng), s0);
    }

    #[test]
    fn test_step_is_synchronous() {
        // Swap network: x0' = x1, x1' = x0. A sequential update would copy one value twice.
        let bn = BooleanNetwork::new(
            1,
            vec![
                NetworkNode::new(vec![1], det(&[0, 1])),
                NetworkNode::new(vec![0], det(&[0, 1])),
            ],
            [],
            [],
        )
        .unwrap();
        let state: State = "10".parse().unwrap();
        assert_eq!(bn.step_projected(&state).to_string(), "01");
    }

    #[test]
    fn test_entry_index_msb_first() {
        let node = NetworkNode::new(vec![2, 0], det(&[0, 0, 0, 1]));
        let state: State = "001".parse().unwrap();
        // Predecessor 2 is set, predecessor 0 is not: index 0b10.
        assert_eq!(node.entry_index(&state), 2);
    }

    #[test]
    fn test_construction_rejects_bad_in_degree() {
        let result = BooleanNetwork::new(
            1,
            vec![NetworkNode::new(vec![0, 0], det(&[0, 0, 0, 0]))],
            [],
            [],
        );
        assert!(matches!(result, Err(StructuralError::InDegree { .. })));
    }

    #[test]
    fn test_construction_rejects_unknown_predecessor() {
        let result = BooleanNetwork::new(1, vec![NetworkNode::new(vec![3], det(&[0, 1]))], [], []);
        assert_eq!(result, Err(StructuralError::UnknownNode { node: 3, n: 1 }));
    }

    #[test]
    fn test_construction_rejects_short_table() {
        let result = BooleanNetwork::new(1, vec![NetworkNode::new(vec![0], det(&[0]))], [], []);
        assert!(matches!(result, Err(StructuralError::TableSize { .. })));
    }

    #[test]
    fn test_construction_rejects_overlapping_io() {
        let nodes = two_cycle_network().nodes().to_vec();
        let result = BooleanNetwork::new(1, nodes, [0, 1], [1, 2]);
        assert_eq!(result, Err(StructuralError::OverlappingIo(1)));
    }

    #[test]
    fn test_apply_returns_previous_bias() {
        let mut bn = two_cycle_network();
        let flip = Flip {
            node: 1,
            entry: 0,
            old_bias: 0.0,
            new_bias: 0.7,
        };
        assert_eq!(bn.apply(&flip), Ok(0.0));
        assert_eq!(bn.bias(1, 0), Ok(0.7));
        assert!(!bn.is_deterministic());
        assert_eq!(bn.apply(&flip.inverse()), Ok(0.7));
        assert_eq!(bn, two_cycle_network());
    }

    #[test]
    fn test_apply_out_of_range() {
        let mut bn = two_cycle_network();
        let flip = Flip {
            node: 0,
            entry: 2,
            old_bias: 0.0,
            new_bias: 1.0,
        };
        assert!(matches!(
            bn.apply(&flip),
            Err(StructuralError::UnknownEntry { .. })
        ));
        let flip = Flip { node: 5, ..flip };
        assert!(matches!(
            bn.apply(&flip),
            Err(StructuralError::UnknownNode { .. })
        ));
    }

    #[test]
    fn test_protection_follows_inputs() {
        let nodes = two_cycle_network().nodes().to_vec();
        let bn = BooleanNetwork::new(1, nodes, [0], [2]).unwrap();
        assert!(bn.is_protected(0));
        assert!(!bn.is_protected(2));
    }

    #[test]
    fn test_inputs_and_outputs() {
        let nodes = two_cycle_network().nodes().to_vec();
        let bn = BooleanNetwork::new(1, nodes, [1], [0, 2]).unwrap();
        let mut state = State::zeros(3);
        bn.force_inputs(&mut state, &[true]).unwrap();
        assert_eq!(state.to_string(), "010");
        assert!(bn.force_inputs(&mut state, &[true, false]).is_err());

        let next = bn.step_projected(&state);
        assert_eq!(bn.read_outputs(&next), vec![true, false]);
    }

    #[test]
    fn test_model_roundtrip() {
        let nodes = two_cycle_network().nodes().to_vec();
        let bn = BooleanNetwork::new(1, nodes, [1], [2]).unwrap();
        let model = bn.to_model();
        assert_eq!(model.nodes[0].table, vec![1.0, 0.0]);
        let restored = BooleanNetwork::try_from(model).unwrap();
        assert_eq!(restored, bn);
    }

    #[test]
    fn test_model_rejects_misordered_nodes() {
        let mut model = two_cycle_network().to_model();
        model.nodes.swap(0, 1);
        assert!(matches!(
            BooleanNetwork::try_from(model),
            Err(StructuralError::NodeOrder { .. })
        ));
    }
}
