//! Growth tree vertices.
//!
//! A [`Node`] is bookkeeping only: identity, position in the tree, its
//! current rate, its exact accumulated weight, and the cached per-unit
//! amounts that would carry it to the next integer boundary in either
//! direction. The stepping algorithm lives in [`crate::tree`].

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use structree_core::{ArithmeticFault, Rational};

use crate::error::TreeModelError;

/// Stable identifier for growth tree nodes.
///
/// `0` is reserved/invalid so IDs are always non-zero. IDs are handed out in
/// increasing order and never reused within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Lowest valid node ID; always the root.
    pub const MIN: Self = Self(1);

    /// Create a new node ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, TreeModelError> {
        if raw == 0 {
            return Err(TreeModelError::ZeroNodeId);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, TreeModelError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(TreeModelError::NodeIdOverflow { current: self });
        };
        Self::new(next)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of travel for one step of the evolve loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthDirection {
    Grow,
    Shrink,
}

impl GrowthDirection {
    /// Direction implied by a non-zero signed amount.
    #[must_use]
    pub const fn of(amount: Rational) -> Self {
        if amount.is_negative() {
            Self::Shrink
        } else {
            Self::Grow
        }
    }
}

/// Per-unit amounts needed to reach the nearest integer boundary above
/// (`positive`) and below (`negative`) the current weight.
///
/// A weight already on a boundary is a full unit away in either direction.
pub fn transition_amounts(
    weight: Rational,
    rate: Rational,
) -> Result<(Rational, Rational), ArithmeticFault> {
    if weight.is_integer() {
        let unit = rate.reciprocal()?;
        return Ok((unit, -unit));
    }
    let positive = weight.ceil().checked_sub(weight)?.checked_div(rate)?;
    let negative = weight.floor().checked_sub(weight)?.checked_div(rate)?;
    Ok((positive, negative))
}

/// One vertex of the growth tree.
///
/// Equality, ordering, and hashing use the node ID only.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    parent: Option<NodeId>,
    depth: u32,
    rate: Rational,
    weight: Rational,
    positive_transition: Rational,
    negative_transition: Rational,
    children: BTreeSet<NodeId>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        parent: Option<NodeId>,
        depth: u32,
        rate: Rational,
    ) -> Result<Self, ArithmeticFault> {
        let weight = Rational::ZERO;
        let (positive_transition, negative_transition) = transition_amounts(weight, rate)?;
        Ok(Self {
            id,
            parent,
            depth,
            rate,
            weight,
            positive_transition,
            negative_transition,
            children: BTreeSet::new(),
        })
    }

    pub(crate) fn root(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            depth: 0,
            rate: Rational::ONE,
            weight: Rational::ZERO,
            positive_transition: Rational::ONE,
            negative_transition: Rational::MINUS_ONE,
            children: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub const fn rate(&self) -> Rational {
        self.rate
    }

    #[must_use]
    pub const fn weight(&self) -> Rational {
        self.weight
    }

    #[must_use]
    pub const fn positive_transition(&self) -> Rational {
        self.positive_transition
    }

    #[must_use]
    pub const fn negative_transition(&self) -> Rational {
        self.negative_transition
    }

    /// Cached transition amount for the given direction of travel.
    #[must_use]
    pub const fn transition(&self, direction: GrowthDirection) -> Rational {
        match direction {
            GrowthDirection::Grow => self.positive_transition,
            GrowthDirection::Shrink => self.negative_transition,
        }
    }

    /// Child IDs in ascending order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().copied()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// True when the weight sits exactly on an integer boundary.
    #[must_use]
    pub const fn on_boundary(&self) -> bool {
        self.weight.is_integer()
    }

    /// Human-readable label for renderers.
    #[must_use]
    pub fn label(&self) -> String {
        format!("#{}: {}", self.id, self.weight)
    }

    pub(crate) fn set_rate(&mut self, rate: Rational) -> Result<(), ArithmeticFault> {
        self.rate = rate;
        self.refresh_transitions()
    }

    /// Add `rate * per_unit` to the weight and return the increment.
    pub(crate) fn advance(&mut self, per_unit: Rational) -> Result<Rational, ArithmeticFault> {
        let increment = self.rate.checked_mul(per_unit)?;
        self.weight = self.weight.checked_add(increment)?;
        self.refresh_transitions()?;
        Ok(increment)
    }

    pub(crate) fn attach_child(&mut self, child: NodeId) {
        let _ = self.children.insert(child);
    }

    pub(crate) fn detach_child(&mut self, child: NodeId) {
        let _ = self.children.remove(&child);
    }

    fn refresh_transitions(&mut self) -> Result<(), ArithmeticFault> {
        let (positive, negative) = transition_amounts(self.weight, self.rate)?;
        self.positive_transition = positive;
        self.negative_transition = negative;
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
