//! Canonical, serializable view of a growth tree.
//!
//! A [`GrowthTreeSnapshot`] is what read-only consumers (renderers, golden
//! checksums, diagnostics) work from: a stable node list in ID order plus the
//! parent/child edge relation, each node carrying a display label. Snapshots
//! are also the unit of structural validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use structree_core::{ArithmeticFault, Rational};

use crate::error::TreeModelError;
use crate::node::{Node, NodeId, transition_amounts};

/// Current growth tree snapshot schema version.
pub const GROWTH_TREE_SCHEMA_VERSION: u16 = 1;

/// Serializable node record in the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub parent: Option<NodeId>,
    pub depth: u32,
    pub rate: Rational,
    pub weight: Rational,
    pub positive_transition: Rational,
    pub negative_transition: Rational,
    pub label: String,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id(),
            parent: node.parent(),
            depth: node.depth(),
            rate: node.rate(),
            weight: node.weight(),
            positive_transition: node.positive_transition(),
            negative_transition: node.negative_transition(),
            label: node.label(),
        }
    }
}

/// Canonical serialized growth tree shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthTreeSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub root: NodeId,
    pub next_id: NodeId,
    pub rate: Rational,
    pub nodes: Vec<NodeRecord>,
}

fn default_schema_version() -> u16 {
    GROWTH_TREE_SCHEMA_VERSION
}

impl GrowthTreeSnapshot {
    /// Canonicalize node ordering by ID for deterministic serialization.
    pub fn canonicalize(&mut self) {
        self.nodes.sort_by_key(|node| node.id);
    }

    /// Lookup a node record by ID.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// `(parent, child)` pairs in child ID order.
    #[must_use]
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges = self
            .nodes
            .iter()
            .filter_map(|node| node.parent.map(|parent| (parent, node.id)))
            .collect::<Vec<_>>();
        edges.sort_by_key(|&(_, child)| child);
        edges
    }

    /// Children of `id` in ascending ID order.
    #[must_use]
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = self
            .nodes
            .iter()
            .filter(|node| node.parent == Some(id))
            .map(|node| node.id)
            .collect::<Vec<_>>();
        children.sort_unstable();
        children
    }

    /// Exact sum of all node weights.
    pub fn total_weight(&self) -> Result<Rational, ArithmeticFault> {
        Rational::checked_sum(self.nodes.iter().map(|node| node.weight))
    }

    /// Deterministic hash for diagnostics over serialized tree state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        snapshot_state_hash(self)
    }

    /// First structural problem, if any.
    pub fn validate(&self) -> Result<(), TreeModelError> {
        match check_snapshot(self).into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Inspect invariants and emit a structured diagnostics report.
    #[must_use]
    pub fn invariant_report(&self) -> InvariantReport {
        InvariantReport {
            snapshot_hash: self.state_hash(),
            issues: check_snapshot(self)
                .into_iter()
                .map(InvariantIssue::from)
                .collect(),
        }
    }
}

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantCode {
    InvalidNodeId,
    UnsupportedSchemaVersion,
    DuplicateNodeId,
    MissingRoot,
    RootHasParent,
    OrphanNode,
    MissingNode,
    MissingParent,
    DepthMismatch,
    RateMismatch,
    StaleTransition,
    ChildIndexMismatch,
    NextIdNotGreaterThanExisting,
    ArithmeticFault,
}

impl From<&TreeModelError> for InvariantCode {
    fn from(error: &TreeModelError) -> Self {
        match error {
            TreeModelError::ZeroNodeId | TreeModelError::NodeIdOverflow { .. } => {
                Self::InvalidNodeId
            }
            TreeModelError::UnsupportedSchemaVersion { .. } => Self::UnsupportedSchemaVersion,
            TreeModelError::DuplicateNodeId { .. } => Self::DuplicateNodeId,
            TreeModelError::MissingRoot { .. } => Self::MissingRoot,
            TreeModelError::RootHasParent { .. } => Self::RootHasParent,
            TreeModelError::OrphanNode { .. } => Self::OrphanNode,
            TreeModelError::MissingNode { .. } => Self::MissingNode,
            TreeModelError::MissingParent { .. } => Self::MissingParent,
            TreeModelError::DepthMismatch { .. } => Self::DepthMismatch,
            TreeModelError::RateMismatch { .. } => Self::RateMismatch,
            TreeModelError::StaleTransition { .. } => Self::StaleTransition,
            TreeModelError::ChildIndexMismatch { .. } => Self::ChildIndexMismatch,
            TreeModelError::NextIdNotGreaterThanExisting { .. } => {
                Self::NextIdNotGreaterThanExisting
            }
            TreeModelError::Arithmetic { .. } => Self::ArithmeticFault,
        }
    }
}

/// One actionable invariant finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantIssue {
    pub code: InvariantCode,
    pub node_id: Option<NodeId>,
    pub message: String,
}

impl From<TreeModelError> for InvariantIssue {
    fn from(error: TreeModelError) -> Self {
        Self {
            code: InvariantCode::from(&error),
            node_id: error.node_id(),
            message: error.to_string(),
        }
    }
}

/// Structured invariant report over a growth tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantReport {
    pub snapshot_hash: u64,
    pub issues: Vec<InvariantIssue>,
}

impl InvariantReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Codes of all findings, in discovery order.
    #[must_use]
    pub fn codes(&self) -> Vec<InvariantCode> {
        self.issues.iter().map(|issue| issue.code).collect()
    }
}

fn check_snapshot(snapshot: &GrowthTreeSnapshot) -> Vec<TreeModelError> {
    let mut issues = Vec::new();

    if snapshot.schema_version != GROWTH_TREE_SCHEMA_VERSION {
        issues.push(TreeModelError::UnsupportedSchemaVersion {
            version: snapshot.schema_version,
        });
    }

    let mut by_id = BTreeMap::new();
    for node in &snapshot.nodes {
        if by_id.insert(node.id, node).is_some() {
            issues.push(TreeModelError::DuplicateNodeId { node_id: node.id });
        }
    }

    let Some(root) = by_id.get(&snapshot.root) else {
        issues.push(TreeModelError::MissingRoot {
            root: snapshot.root,
        });
        return issues;
    };
    if let Some(parent) = root.parent {
        issues.push(TreeModelError::RootHasParent {
            root: snapshot.root,
            parent,
        });
    }

    if let Some(&max_existing) = by_id.keys().next_back()
        && snapshot.next_id <= max_existing
    {
        issues.push(TreeModelError::NextIdNotGreaterThanExisting {
            next_id: snapshot.next_id,
            max_existing,
        });
    }

    for node in by_id.values() {
        let expected_depth = if node.id == snapshot.root {
            Some(0)
        } else {
            match node.parent {
                None => {
                    issues.push(TreeModelError::OrphanNode { node_id: node.id });
                    None
                }
                Some(parent) => match by_id.get(&parent) {
                    Some(parent) => Some(parent.depth.saturating_add(1)),
                    None => {
                        issues.push(TreeModelError::MissingParent {
                            node_id: node.id,
                            parent,
                        });
                        None
                    }
                },
            }
        };
        if let Some(expected) = expected_depth
            && expected != node.depth
        {
            issues.push(TreeModelError::DepthMismatch {
                node_id: node.id,
                expected,
                actual: node.depth,
            });
        }

        match expected_rate(snapshot.rate, node.depth) {
            Ok(expected) if expected != node.rate => {
                issues.push(TreeModelError::RateMismatch {
                    node_id: node.id,
                    expected,
                    actual: node.rate,
                });
            }
            Ok(_) => {}
            Err(fault) => issues.push(TreeModelError::Arithmetic {
                node_id: node.id,
                fault,
            }),
        }

        match transition_amounts(node.weight, node.rate) {
            Ok((positive, negative))
                if positive != node.positive_transition
                    || negative != node.negative_transition =>
            {
                issues.push(TreeModelError::StaleTransition { node_id: node.id });
            }
            Ok(_) => {}
            Err(fault) => issues.push(TreeModelError::Arithmetic {
                node_id: node.id,
                fault,
            }),
        }
    }

    issues
}

/// `tree_rate ^ depth`, the rate every node at `depth` must carry.
pub(crate) fn expected_rate(
    tree_rate: Rational,
    depth: u32,
) -> Result<Rational, ArithmeticFault> {
    let exponent =
        i32::try_from(depth).map_err(|_| ArithmeticFault::Overflow { operation: "pow" })?;
    tree_rate.pow(exponent)
}

fn snapshot_state_hash(snapshot: &GrowthTreeSnapshot) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0001_0000_01b3;

    fn mix(hash: &mut u64, byte: u8) {
        *hash ^= u64::from(byte);
        *hash = hash.wrapping_mul(PRIME);
    }

    fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
        for byte in bytes {
            mix(hash, *byte);
        }
    }

    fn mix_u64(hash: &mut u64, value: u64) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    fn mix_rational(hash: &mut u64, value: Rational) {
        mix_bytes(hash, &value.numerator().to_le_bytes());
        mix_bytes(hash, &value.denominator().to_le_bytes());
    }

    fn mix_opt_node_id(hash: &mut u64, value: Option<NodeId>) {
        match value {
            Some(value) => {
                mix(hash, 1);
                mix_u64(hash, value.get());
            }
            None => mix(hash, 0),
        }
    }

    let mut nodes = snapshot.nodes.iter().collect::<Vec<_>>();
    nodes.sort_by_key(|node| node.id);

    let mut hash = OFFSET_BASIS;
    mix_bytes(&mut hash, &snapshot.schema_version.to_le_bytes());
    mix_u64(&mut hash, snapshot.root.get());
    mix_u64(&mut hash, snapshot.next_id.get());
    mix_rational(&mut hash, snapshot.rate);
    mix_u64(&mut hash, nodes.len() as u64);
    for node in nodes {
        mix_u64(&mut hash, node.id.get());
        mix_opt_node_id(&mut hash, node.parent);
        mix_bytes(&mut hash, &node.depth.to_le_bytes());
        mix_rational(&mut hash, node.rate);
        mix_rational(&mut hash, node.weight);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(numerator: i64, denominator: i64) -> Rational {
        Rational::new(numerator, denominator).expect("test rational must be valid")
    }

    fn id(raw: u64) -> NodeId {
        NodeId::new(raw).expect("test ID must be non-zero")
    }

    fn record(
        raw: u64,
        parent: Option<u64>,
        depth: u32,
        rate: Rational,
        weight: Rational,
    ) -> NodeRecord {
        let (positive, negative) = transition_amounts(weight, rate).expect("amounts");
        NodeRecord {
            id: id(raw),
            parent: parent.map(id),
            depth,
            rate,
            weight,
            positive_transition: positive,
            negative_transition: negative,
            label: format!("#{raw}: {weight}"),
        }
    }

    fn make_valid_snapshot() -> GrowthTreeSnapshot {
        GrowthTreeSnapshot {
            schema_version: GROWTH_TREE_SCHEMA_VERSION,
            root: id(1),
            next_id: id(4),
            rate: r(1, 2),
            nodes: vec![
                record(3, Some(2), 2, r(1, 4), r(1, 8)),
                record(1, None, 0, r(1, 1), r(3, 2)),
                record(2, Some(1), 1, r(1, 2), r(3, 4)),
            ],
        }
    }

    #[test]
    fn valid_snapshot_passes() {
        let snapshot = make_valid_snapshot();
        assert_eq!(snapshot.validate(), Ok(()));
        assert!(snapshot.invariant_report().is_clean());
    }

    #[test]
    fn edges_and_children_are_in_id_order() {
        let mut snapshot = make_valid_snapshot();
        snapshot.canonicalize();
        let ids = snapshot.nodes.iter().map(|node| node.id.get()).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(snapshot.edges(), vec![(id(1), id(2)), (id(2), id(3))]);
        assert_eq!(snapshot.children_of(id(1)), vec![id(2)]);
        assert!(snapshot.children_of(id(3)).is_empty());
        assert_eq!(snapshot.total_weight(), Ok(r(19, 8)));
    }

    #[test]
    fn hash_ignores_node_order_but_not_weights() {
        let snapshot = make_valid_snapshot();
        let mut reordered = snapshot.clone();
        reordered.canonicalize();
        assert_eq!(snapshot.state_hash(), reordered.state_hash());

        let mut changed = snapshot.clone();
        changed.nodes[0].weight = r(1, 7);
        assert_ne!(snapshot.state_hash(), changed.state_hash());
    }

    #[test]
    fn missing_root_stops_the_check() {
        let mut snapshot = make_valid_snapshot();
        snapshot.root = id(9);
        assert_eq!(
            snapshot.validate(),
            Err(TreeModelError::MissingRoot { root: id(9) })
        );
    }

    #[test]
    fn rate_and_depth_drift_are_reported() {
        let mut snapshot = make_valid_snapshot();
        snapshot.nodes[0] = record(3, Some(2), 3, r(1, 4), r(1, 8));
        snapshot.nodes[2] = record(2, Some(1), 1, r(1, 3), r(3, 4));
        let report = snapshot.invariant_report();
        assert_eq!(
            report.codes(),
            vec![
                InvariantCode::RateMismatch,
                InvariantCode::DepthMismatch,
                InvariantCode::RateMismatch,
            ]
        );
        assert_eq!(report.issues[0].node_id, Some(id(2)));
    }

    #[test]
    fn stale_transition_cache_is_reported() {
        let mut snapshot = make_valid_snapshot();
        snapshot.nodes[1].positive_transition = r(5, 1);
        assert_eq!(
            snapshot.validate(),
            Err(TreeModelError::StaleTransition { node_id: id(1) })
        );
    }

    #[test]
    fn orphans_duplicates_and_stale_next_id_are_reported() {
        let mut snapshot = make_valid_snapshot();
        snapshot.nodes.push(record(5, None, 0, r(1, 1), r(0, 1)));
        snapshot.nodes.push(record(2, Some(1), 1, r(1, 2), r(3, 4)));
        let codes = snapshot.invariant_report().codes();
        assert!(codes.contains(&InvariantCode::DuplicateNodeId));
        assert!(codes.contains(&InvariantCode::OrphanNode));
        assert!(codes.contains(&InvariantCode::NextIdNotGreaterThanExisting));
    }

    #[test]
    fn snapshot_json_round_trip() {
        let snapshot = make_valid_snapshot();
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let back: GrowthTreeSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, snapshot);
    }
}
