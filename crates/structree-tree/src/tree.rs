//! The growth tree engine.
//!
//! [`GrowthTree::evolve`] is the only mutating operation. Each call first
//! reconciles node rates with the requested driving rate, then consumes the
//! requested magnitude in exact steps:
//!
//! 1. Find the smallest transition amount in the direction of travel and the
//!    full set of nodes tied at it.
//! 2. If the whole tree cannot reach that transition with what remains, spread
//!    the remainder over all nodes in proportion to their rates and stop.
//! 3. Otherwise advance every node exactly to the transition, then spawn or
//!    prune at the tied nodes and continue with the rest.
//!
//! Every step checks that no weight skipped past an integer boundary, that
//! exactly the tied nodes landed on one, and that the applied magnitude
//! matches the planned amount.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use structree_core::Rational;

use crate::error::{GrowthError, InvariantViolation, Result, TreeModelError};
use crate::node::{GrowthDirection, Node, NodeId};
use crate::snapshot::{
    GROWTH_TREE_SCHEMA_VERSION, GrowthTreeSnapshot, InvariantReport, NodeRecord, expected_rate,
};
use crate::structor::Structor;

/// Cumulative counters over a tree's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvolutionCounters {
    /// Step-loop iterations (full and partial).
    pub steps: u64,
    /// Steps that ended the loop without reaching a transition.
    pub partial_updates: u64,
    /// Rate reconciliations triggered by a changed driving rate.
    pub rate_changes: u64,
    pub spawned: u64,
    pub pruned: u64,
}

/// Point-in-time summary of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: u32,
    pub rate: Rational,
    pub total_weight: Rational,
    pub counters: EvolutionCounters,
}

/// A rooted tree of exactly weighted nodes driven by structors.
#[derive(Debug, Clone)]
pub struct GrowthTree {
    root: NodeId,
    next_id: NodeId,
    rate: Rational,
    nodes: BTreeMap<NodeId, Node>,
    counters: EvolutionCounters,
}

impl GrowthTree {
    /// Build a tree with a single root (depth 0, rate 1, weight 0).
    pub fn new(initial_rate: Rational) -> Result<Self> {
        ensure_positive_rate(initial_rate)?;
        let root = NodeId::MIN;
        let mut nodes = BTreeMap::new();
        let _ = nodes.insert(root, Node::root(root));
        Ok(Self {
            root,
            next_id: root.checked_next()?,
            rate: initial_rate,
            nodes,
            counters: EvolutionCounters::default(),
        })
    }

    /// Root node ID.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Current driving rate.
    #[must_use]
    pub const fn rate(&self) -> Rational {
        self.rate
    }

    /// ID the next spawned node will receive.
    #[must_use]
    pub const fn next_id(&self) -> NodeId {
        self.next_id
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Lookup a node by ID.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Iterate nodes in canonical ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// `(parent, child)` pairs in child ID order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes
            .values()
            .filter_map(|node| node.parent().map(|parent| (parent, node.id())))
    }

    /// Child IDs of `id` in ascending order; empty for unknown IDs.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.get(&id).into_iter().flat_map(Node::children)
    }

    /// Childless nodes in ID order.
    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|node| node.is_leaf())
    }

    #[must_use]
    pub const fn counters(&self) -> EvolutionCounters {
        self.counters
    }

    /// Exact sum of all node weights.
    pub fn total_weight(&self) -> Result<Rational> {
        Ok(Rational::checked_sum(self.nodes.values().map(Node::weight))?)
    }

    /// Exact sum of all node rates.
    pub fn rate_sum(&self) -> Result<Rational> {
        Ok(Rational::checked_sum(self.nodes.values().map(Node::rate))?)
    }

    pub fn stats(&self) -> Result<GrowthStats> {
        Ok(GrowthStats {
            nodes: self.nodes.len(),
            leaves: self.leaves().count(),
            max_depth: self.nodes.values().map(Node::depth).max().unwrap_or(0),
            rate: self.rate,
            total_weight: self.total_weight()?,
            counters: self.counters,
        })
    }

    /// Export to canonical snapshot form.
    #[must_use]
    pub fn to_snapshot(&self) -> GrowthTreeSnapshot {
        GrowthTreeSnapshot {
            schema_version: GROWTH_TREE_SCHEMA_VERSION,
            root: self.root,
            next_id: self.next_id,
            rate: self.rate,
            nodes: self.nodes.values().map(NodeRecord::from).collect(),
        }
    }

    /// Deterministic structural hash of the current tree state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.to_snapshot().state_hash()
    }

    /// Validate internal invariants, including the derived child index.
    pub fn validate(&self) -> std::result::Result<(), TreeModelError> {
        self.to_snapshot().validate()?;
        for node in self.nodes.values() {
            let linked = self
                .nodes
                .values()
                .filter(|candidate| candidate.parent() == Some(node.id()))
                .map(Node::id);
            if !linked.eq(node.children()) {
                return Err(TreeModelError::ChildIndexMismatch { node_id: node.id() });
            }
        }
        Ok(())
    }

    /// Collect every structural finding instead of stopping at the first.
    #[must_use]
    pub fn invariant_report(&self) -> InvariantReport {
        self.to_snapshot().invariant_report()
    }

    /// Evolve at the current driving rate.
    pub fn evolve_by(&mut self, magnitude: Rational) -> Result<&mut Self> {
        self.evolve(self.rate, magnitude)
    }

    /// Evolve by one structor.
    pub fn apply(&mut self, structor: &Structor) -> Result<&mut Self> {
        self.evolve(structor.rate(), structor.magnitude())
    }

    /// Apply structors in order.
    pub fn apply_all<'a, I>(&mut self, structors: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a Structor>,
    {
        for structor in structors {
            self.apply(structor)?;
        }
        Ok(self)
    }

    /// Consume `magnitude` at driving rate `rate`.
    ///
    /// A zero magnitude only reconciles rates. On error the tree may be left
    /// mid-step and should be discarded.
    pub fn evolve(&mut self, rate: Rational, magnitude: Rational) -> Result<&mut Self> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "growth.evolve",
            rate = %rate,
            magnitude = %magnitude,
            nodes = self.nodes.len()
        );
        #[cfg(feature = "tracing")]
        let _guard = _span.enter();

        ensure_positive_rate(rate)?;
        if rate != self.rate {
            self.reconcile_rate(rate)?;
        }

        let mut remaining = magnitude;
        while !remaining.is_zero() {
            remaining = self.step(remaining)?;
        }

        #[cfg(debug_assertions)]
        self.validate()?;

        #[cfg(feature = "tracing")]
        tracing::trace!(nodes = self.nodes.len(), "evolve complete");

        Ok(self)
    }

    /// Rescale every node's rate to `rate ^ depth`. Weights are untouched.
    fn reconcile_rate(&mut self, rate: Rational) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(from = %self.rate, to = %rate, "reconciling node rates");

        for node in self.nodes.values_mut() {
            node.set_rate(expected_rate(rate, node.depth())?)?;
        }
        self.rate = rate;
        self.counters.rate_changes += 1;
        Ok(())
    }

    /// Run one iteration of the step loop and return what is left.
    fn step(&mut self, remaining: Rational) -> Result<Rational> {
        self.counters.steps += 1;
        let direction = GrowthDirection::of(remaining);
        let (threshold, tied) = self.transition_set(direction)?;
        let rate_sum = self.rate_sum()?;
        let needed = rate_sum.checked_mul(threshold)?;

        if needed.abs() > remaining.abs() {
            let per_unit = remaining.checked_div(rate_sum)?;
            let applied = self.advance_all(per_unit, direction, &FxHashSet::default())?;
            check_applied(remaining, applied)?;
            self.counters.partial_updates += 1;

            #[cfg(feature = "tracing")]
            tracing::trace!(%per_unit, %remaining, "partial update");

            return Ok(Rational::ZERO);
        }

        let tied_set = tied.iter().copied().collect::<FxHashSet<_>>();
        let applied = self.advance_all(threshold, direction, &tied_set)?;
        check_applied(needed, applied)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(%threshold, %needed, tied = tied.len(), "transition reached");

        self.transition(&tied, &tied_set)?;
        Ok(remaining.checked_sub(needed)?)
    }

    /// Smallest signed transition amount in `direction` and every node tied
    /// at it, in ascending ID order.
    fn transition_set(&self, direction: GrowthDirection) -> Result<(Rational, Vec<NodeId>)> {
        let mut best: Option<Rational> = None;
        let mut tied = Vec::new();
        for node in self.nodes.values() {
            let amount = node.transition(direction);
            match best {
                Some(current) if amount.abs() > current.abs() => {}
                Some(current) if amount.abs() == current.abs() => tied.push(node.id()),
                _ => {
                    best = Some(amount);
                    tied.clear();
                    tied.push(node.id());
                }
            }
        }
        let threshold = best.ok_or(TreeModelError::MissingRoot { root: self.root })?;
        Ok((threshold, tied))
    }

    /// Advance every node by `rate * per_unit`, checking that only the nodes
    /// in `landing` end on an integer boundary and that nobody skips one.
    /// Returns the total weight added.
    fn advance_all(
        &mut self,
        per_unit: Rational,
        direction: GrowthDirection,
        landing: &FxHashSet<NodeId>,
    ) -> Result<Rational> {
        let mut applied = Rational::ZERO;
        for node in self.nodes.values_mut() {
            let before = node.weight();
            let increment = node.advance(per_unit)?;
            applied = applied.checked_add(increment)?;
            let after = node.weight();

            let boundary = next_boundary(before, direction)?;
            let crossed = match direction {
                GrowthDirection::Grow => after > boundary,
                GrowthDirection::Shrink => after < boundary,
            };
            if crossed {
                return Err(InvariantViolation::BoundaryCrossed {
                    node_id: node.id(),
                    before,
                    after,
                    boundary,
                }
                .into());
            }

            match (after.is_integer(), landing.contains(&node.id())) {
                (true, false) => {
                    return Err(InvariantViolation::UnexpectedBoundary {
                        node_id: node.id(),
                        weight: after,
                    }
                    .into());
                }
                (false, true) => {
                    return Err(InvariantViolation::MissedTransition {
                        node_id: node.id(),
                        weight: after,
                    }
                    .into());
                }
                _ => {}
            }
        }
        Ok(applied)
    }

    /// Apply the structural consequences of landing on a transition.
    ///
    /// Childless non-root tied nodes at weight zero are pruned deepest first,
    /// so a parent whose last child goes in the same step is re-examined as a
    /// leaf. Every other tied node spawns one child, in ID order. A childless
    /// root back at zero is left as is. Finally any other childless node at
    /// zero that was not created in this step is swept away.
    fn transition(&mut self, tied: &[NodeId], tied_set: &FxHashSet<NodeId>) -> Result<()> {
        let mut survivors = Vec::with_capacity(tied.len());
        for &id in tied.iter().rev() {
            let node = self.get(id)?;
            if node.is_leaf() && node.weight().is_zero() {
                if !node.is_root() {
                    self.prune(id)?;
                }
            } else {
                survivors.push(id);
            }
        }

        let mut spawned = FxHashSet::default();
        for &id in survivors.iter().rev() {
            let _ = spawned.insert(self.spawn(id)?);
        }

        let stragglers = self
            .nodes
            .values()
            .rev()
            .filter(|node| {
                !tied_set.contains(&node.id())
                    && !spawned.contains(&node.id())
                    && !node.is_root()
                    && node.is_leaf()
                    && node.weight().is_zero()
            })
            .map(Node::id)
            .collect::<Vec<_>>();
        // Non-tied nodes end a full update off any boundary, so this is empty
        // unless `advance_all` let an unexpected landing through.
        debug_assert!(stragglers.is_empty(), "untied nodes at zero: {stragglers:?}");
        for id in stragglers {
            self.prune(id)?;
        }
        Ok(())
    }

    fn spawn(&mut self, parent: NodeId) -> Result<NodeId> {
        let depth = self.get(parent)?.depth() + 1;
        let id = self.next_id;
        let child = Node::new(id, Some(parent), depth, expected_rate(self.rate, depth)?)?;
        self.next_id = id.checked_next()?;
        let _ = self.nodes.insert(id, child);
        self.get_mut(parent)?.attach_child(id);
        self.counters.spawned += 1;

        #[cfg(feature = "tracing")]
        tracing::debug!(node = %id, parent = %parent, depth, "spawned node");

        Ok(id)
    }

    fn prune(&mut self, id: NodeId) -> Result<()> {
        let Some(node) = self.nodes.remove(&id) else {
            return Err(TreeModelError::MissingNode { node_id: id }.into());
        };
        if let Some(parent) = node.parent() {
            self.get_mut(parent)?.detach_child(id);
        }
        self.counters.pruned += 1;

        #[cfg(feature = "tracing")]
        tracing::debug!(node = %id, "pruned node");

        Ok(())
    }

    fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| TreeModelError::MissingNode { node_id: id }.into())
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| TreeModelError::MissingNode { node_id: id }.into())
    }
}

fn ensure_positive_rate(rate: Rational) -> Result<()> {
    if rate.is_positive() {
        Ok(())
    } else {
        Err(GrowthError::NonPositiveRate { rate })
    }
}

/// Nearest integer strictly beyond `weight` in `direction`.
fn next_boundary(weight: Rational, direction: GrowthDirection) -> Result<Rational> {
    let boundary = match (direction, weight.is_integer()) {
        (GrowthDirection::Grow, true) => weight.checked_add(Rational::ONE)?,
        (GrowthDirection::Grow, false) => weight.ceil(),
        (GrowthDirection::Shrink, true) => weight.checked_sub(Rational::ONE)?,
        (GrowthDirection::Shrink, false) => weight.floor(),
    };
    Ok(boundary)
}

fn check_applied(expected: Rational, applied: Rational) -> Result<()> {
    if expected == applied {
        Ok(())
    } else {
        Err(InvariantViolation::MagnitudeMismatch { expected, applied }.into())
    }
}
