use structree_core::{ArithmeticFault, ParseRationalError, Rational};
use thiserror::Error;

use crate::node::NodeId;
use crate::snapshot::GROWTH_TREE_SCHEMA_VERSION;

pub type Result<T> = std::result::Result<T, GrowthError>;

/// Failure of an `evolve` call. The tree is left mid-step and should be
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrowthError {
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticFault),

    #[error("driving rate must be positive, got {rate}")]
    NonPositiveRate { rate: Rational },

    #[error("engine invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("tree model error: {0}")]
    Model(#[from] TreeModelError),
}

/// An internal step-loop assertion failed. This always indicates an engine
/// defect, never bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("node {node_id} moved from {before} to {after}, past boundary {boundary}")]
    BoundaryCrossed {
        node_id: NodeId,
        before: Rational,
        after: Rational,
        boundary: Rational,
    },

    #[error("node {node_id} landed on integer weight {weight} outside the transition set")]
    UnexpectedBoundary { node_id: NodeId, weight: Rational },

    #[error("transition node {node_id} stopped at non-integer weight {weight}")]
    MissedTransition { node_id: NodeId, weight: Rational },

    #[error("step applied {applied} but expected {expected}")]
    MagnitudeMismatch {
        expected: Rational,
        applied: Rational,
    },
}

/// Structural inconsistency found by validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeModelError {
    #[error("node id 0 is invalid")]
    ZeroNodeId,

    #[error("node id overflow after {current}")]
    NodeIdOverflow { current: NodeId },

    #[error(
        "unsupported growth tree schema version {version} (expected {expected})",
        expected = GROWTH_TREE_SCHEMA_VERSION
    )]
    UnsupportedSchemaVersion { version: u16 },

    #[error("duplicate node id {node_id}")]
    DuplicateNodeId { node_id: NodeId },

    #[error("root node {root} not found")]
    MissingRoot { root: NodeId },

    #[error("root node {root} must not have parent {parent}")]
    RootHasParent { root: NodeId, parent: NodeId },

    #[error("non-root node {node_id} has no parent")]
    OrphanNode { node_id: NodeId },

    #[error("node {node_id} not found")]
    MissingNode { node_id: NodeId },

    #[error("node {node_id} references missing parent {parent}")]
    MissingParent { node_id: NodeId, parent: NodeId },

    #[error("node {node_id} has depth {actual}, expected {expected}")]
    DepthMismatch {
        node_id: NodeId,
        expected: u32,
        actual: u32,
    },

    #[error("node {node_id} has rate {actual}, expected {expected}")]
    RateMismatch {
        node_id: NodeId,
        expected: Rational,
        actual: Rational,
    },

    #[error("node {node_id} caches stale transition amounts")]
    StaleTransition { node_id: NodeId },

    #[error("child index of node {node_id} disagrees with parent links")]
    ChildIndexMismatch { node_id: NodeId },

    #[error("next_id {next_id} must be greater than max existing id {max_existing}")]
    NextIdNotGreaterThanExisting {
        next_id: NodeId,
        max_existing: NodeId,
    },

    #[error("arithmetic fault while checking node {node_id}: {fault}")]
    Arithmetic {
        node_id: NodeId,
        fault: ArithmeticFault,
    },
}

impl TreeModelError {
    /// Node the finding is about, when there is one.
    #[must_use]
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::ZeroNodeId | Self::UnsupportedSchemaVersion { .. } => None,
            Self::NodeIdOverflow { current } => Some(*current),
            Self::MissingRoot { root } | Self::RootHasParent { root, .. } => Some(*root),
            Self::NextIdNotGreaterThanExisting { max_existing, .. } => Some(*max_existing),
            Self::DuplicateNodeId { node_id }
            | Self::OrphanNode { node_id }
            | Self::MissingNode { node_id }
            | Self::MissingParent { node_id, .. }
            | Self::DepthMismatch { node_id, .. }
            | Self::RateMismatch { node_id, .. }
            | Self::StaleTransition { node_id }
            | Self::ChildIndexMismatch { node_id }
            | Self::Arithmetic { node_id, .. } => Some(*node_id),
        }
    }
}

/// Failure to parse a `rate:magnitude` structor literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructorParseError {
    #[error("structor {input:?} must have the form <rate>:<magnitude>")]
    MissingSeparator { input: String },

    #[error("invalid {field} in structor {input:?}: {source}")]
    InvalidRational {
        input: String,
        field: &'static str,
        source: ParseRationalError,
    },
}
