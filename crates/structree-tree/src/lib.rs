#![forbid(unsafe_code)]

//! Growth tree engine.
//!
//! # Role in structree
//! A [`GrowthTree`] is a rooted tree whose nodes accumulate exact
//! [`Rational`](structree_core::Rational) weight. It is driven by
//! [`Structor`]s: each one names a driving rate and a signed magnitude, and
//! [`GrowthTree::evolve`] consumes that magnitude, spawning a child wherever a
//! node's weight reaches an integer boundary and pruning childless nodes that
//! return to zero.
//!
//! Node rates are always `rate ^ depth` for the tree's current driving rate,
//! so deeper nodes move more slowly when the rate is below one.
//!
//! # Example
//! ```
//! use structree_core::Rational;
//! use structree_tree::{GrowthTree, Structor};
//!
//! let half = Rational::new(1, 2).unwrap();
//! let mut tree = GrowthTree::new(Rational::ONE).unwrap();
//! tree.apply(&Structor::new(half, Rational::from(6))).unwrap();
//!
//! assert_eq!(tree.node_count(), 5);
//! assert_eq!(tree.total_weight().unwrap(), Rational::from(6));
//! ```
//!
//! # Feature flags
//! - `tracing`: emits a `growth.evolve` span per call plus debug events for
//!   every spawn and prune.

pub mod error;
pub mod node;
pub mod snapshot;
pub mod structor;
pub mod tree;

pub use error::{GrowthError, InvariantViolation, Result, StructorParseError, TreeModelError};
pub use node::{GrowthDirection, Node, NodeId, transition_amounts};
pub use snapshot::{
    GROWTH_TREE_SCHEMA_VERSION, GrowthTreeSnapshot, InvariantCode, InvariantIssue,
    InvariantReport, NodeRecord,
};
pub use structor::Structor;
pub use tree::{EvolutionCounters, GrowthStats, GrowthTree};
