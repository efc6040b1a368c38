//! ReduceNode - One item of a reduction chain.
//!
//! A node combines the carry handed to it by its upstream (the offset or the
//! previous node of its chain) with its item value and the list's extras:
//!
//! ```text
//! upstream combined ──► carry ──► reducer(carry, item, extras) ──► combined
//! ```
//!
//! The node's role is a [`Direction`], not a different node type. Flipping a
//! node across the pivot swaps the reducer for its mirrored form and swaps
//! which internal value each passthrough port exposes. Nothing is rebuilt.
//!
//! # Ports
//!
//! Every node keeps two port sets:
//!
//! - **combined** values: `carry` and `combined`, the raw reduction state.
//! - **passthrough** ports `input` and `output`, stable signals that follow
//!   the node through direction flips.
//!
//! | Direction | output   | input    |
//! |-----------|----------|----------|
//! | Forward   | carry    | combined |
//! | Backward  | combined | carry    |
//!
//! With a sum reducer over item sizes, `output` is the item's leading edge
//! on either side of the pivot.

use spark_signals::{signal, Signal};

use super::arena::NodeId;
use super::publish::Publish;
use crate::types::{Cleanup, Reducer, Scalar, Side};

// =============================================================================
// Direction
// =============================================================================

/// Which way a node accumulates from the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Next-side node: `reducer(carry, item, extras)`.
    Forward,
    /// Prev-side node: `-reducer(-carry, item, extras)`.
    Backward,
}

impl Direction {
    /// Direction used by nodes of the given chain.
    #[inline]
    pub const fn for_side(side: Side) -> Self {
        match side {
            Side::Next => Direction::Forward,
            Side::Prev => Direction::Backward,
        }
    }

    /// Chain a node with this direction belongs to.
    #[inline]
    pub const fn side(self) -> Side {
        match self {
            Direction::Forward => Side::Next,
            Direction::Backward => Side::Prev,
        }
    }

    /// Apply the reducer in this direction.
    pub fn reduce<T: Scalar>(self, reducer: &Reducer<T>, carry: &T, item: &T, extras: &[T]) -> T {
        match self {
            Direction::Forward => reducer(carry, item, extras),
            Direction::Backward => -reducer(&-carry.clone(), item, extras),
        }
    }

    /// Values for the `(input, output)` passthrough ports.
    pub fn ports<T: Clone>(self, carry: &T, combined: &T) -> (T, T) {
        match self {
            Direction::Forward => (combined.clone(), carry.clone()),
            Direction::Backward => (carry.clone(), combined.clone()),
        }
    }
}

// =============================================================================
// Upstream edge
// =============================================================================

/// Where a node takes its carry from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// Innermost node of a chain.
    Offset,
    /// Any other node: the previous node of the same chain.
    Node(NodeId),
    /// Temporarily unlinked while a repivot rewrites the boundary.
    Detached,
}

// =============================================================================
// Port
// =============================================================================

/// Read-only handle to a reactive value owned by a list.
///
/// `get()` goes through the underlying signal, so reading a port inside a
/// `derived` or `effect` tracks it like any other signal.
#[derive(Clone)]
pub struct Port<T: Scalar> {
    signal: Signal<T>,
}

impl<T: Scalar> Port<T> {
    pub(crate) fn new(signal: Signal<T>) -> Self {
        Self { signal }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.signal.get()
    }

    /// The backing signal, for wiring into other reactive code.
    ///
    /// Writing to it is overwritten by the next propagation.
    pub fn signal(&self) -> Signal<T> {
        self.signal.clone()
    }

    pub(crate) fn raw(&self) -> &Signal<T> {
        &self.signal
    }
}

// =============================================================================
// ReduceNode
// =============================================================================

/// One reduction step of a chain. Owned by the list's arena.
pub(crate) struct ReduceNode<T: Scalar> {
    item: Signal<T>,
    item_value: T,
    carry: T,
    combined: T,
    direction: Direction,
    upstream: Upstream,
    input: Port<T>,
    output: Port<T>,
    subscription: Option<Cleanup>,
}

impl<T: Scalar> ReduceNode<T> {
    pub(crate) fn new(item: Signal<T>, item_value: T, direction: Direction) -> Self {
        Self {
            item,
            item_value,
            carry: T::default(),
            combined: T::default(),
            direction,
            upstream: Upstream::Detached,
            input: Port::new(signal(T::default())),
            output: Port::new(signal(T::default())),
            subscription: None,
        }
    }

    pub(crate) fn item_value(&self) -> &T {
        &self.item_value
    }

    /// Cache a new item value. Returns false when nothing changed.
    pub(crate) fn set_item_value(&mut self, value: T) -> bool {
        if self.item_value == value {
            return false;
        }
        self.item_value = value;
        true
    }

    pub(crate) fn combined(&self) -> &T {
        &self.combined
    }

    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    /// Rewire the node for the other side of the pivot.
    ///
    /// Swaps the reducer form and the passthrough mapping. Stored values are
    /// left alone; they are corrected by the next propagation.
    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn upstream(&self) -> Upstream {
        self.upstream
    }

    pub(crate) fn set_upstream(&mut self, upstream: Upstream) {
        self.upstream = upstream;
    }

    pub(crate) fn output(&self) -> &Port<T> {
        &self.output
    }

    pub(crate) fn set_subscription(&mut self, cleanup: Cleanup) {
        self.subscription = Some(cleanup);
    }

    pub(crate) fn take_subscription(&mut self) -> Option<Cleanup> {
        self.subscription.take()
    }

    /// Recompute from a new carry and queue the port writes.
    pub(crate) fn settle(
        &mut self,
        carry: T,
        reducer: &Reducer<T>,
        extras: &[T],
        publish: &mut Publish<T>,
    ) {
        self.combined = self
            .direction
            .reduce(reducer, &carry, &self.item_value, extras);
        self.carry = carry;
        self.publish_ports(publish);
    }

    pub(crate) fn publish_ports(&self, publish: &mut Publish<T>) {
        let (input, output) = self.direction.ports(&self.carry, &self.combined);
        publish.set(self.input.raw(), input);
        publish.set(self.output.raw(), output);
    }

    /// Detach the node for handing back to the caller.
    ///
    /// The item subscription must already have been stopped.
    pub(crate) fn into_removed(self) -> RemovedNode<T> {
        debug_assert!(self.subscription.is_none(), "removed node still subscribed");
        RemovedNode {
            item: self.item,
            item_value: self.item_value,
            carry: self.carry,
            combined: self.combined,
            direction: self.direction,
            input: self.input,
            output: self.output,
        }
    }
}

// =============================================================================
// RemovedNode
// =============================================================================

/// A node returned by `pop` or `shift`.
///
/// Fully unsubscribed: its ports keep their last values and no longer react
/// to the item stream or the offset.
pub struct RemovedNode<T: Scalar> {
    item: Signal<T>,
    item_value: T,
    carry: T,
    combined: T,
    direction: Direction,
    input: Port<T>,
    output: Port<T>,
}

impl<T: Scalar> RemovedNode<T> {
    /// The item stream the node was built from.
    pub fn item(&self) -> &Signal<T> {
        &self.item
    }

    /// Last item value the node saw.
    pub fn item_value(&self) -> &T {
        &self.item_value
    }

    /// Last carry input.
    pub fn carry(&self) -> &T {
        &self.carry
    }

    /// Last combined output.
    pub fn combined(&self) -> &T {
        &self.combined
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn input(&self) -> &Port<T> {
        &self.input
    }

    pub fn output(&self) -> &Port<T> {
        &self.output
    }

    /// Give back the item stream, e.g. to push it onto another list.
    pub fn into_item(self) -> Signal<T> {
        self.item
    }
}

impl<T: Scalar> std::fmt::Debug for RemovedNode<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemovedNode")
            .field("item_value", &self.item_value)
            .field("carry", &self.carry)
            .field("combined", &self.combined)
            .field("direction", &self.direction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sum;

    #[test]
    fn test_forward_reduce() {
        let add = sum::<i64>();
        assert_eq!(Direction::Forward.reduce(&add, &10, &5, &[]), 15);
    }

    #[test]
    fn test_backward_reduce_mirrors_around_zero() {
        let add = sum::<i64>();
        // -(-10 + 5) = 5: accumulating away from the offset on the other side
        assert_eq!(Direction::Backward.reduce(&add, &10, &5, &[]), 5);
        assert_eq!(Direction::Backward.reduce(&add, &0, &2, &[]), -2);
        assert_eq!(Direction::Backward.reduce(&add, &-2, &5, &[]), -7);
    }

    #[test]
    fn test_port_mapping_per_direction() {
        assert_eq!(Direction::Forward.ports(&1, &9), (9, 1));
        assert_eq!(Direction::Backward.ports(&1, &9), (1, 9));
    }

    #[test]
    fn test_direction_side_round_trip() {
        for side in [Side::Next, Side::Prev] {
            assert_eq!(Direction::for_side(side).side(), side);
        }
    }

    #[test]
    fn test_settle_publishes_ports() {
        let add = sum::<i64>();
        let mut node = ReduceNode::new(signal(5i64), 5, Direction::Forward);

        let mut publish = Publish::new();
        node.settle(3, &add, &[], &mut publish);
        publish.apply();

        assert_eq!(*node.combined(), 8);
        assert_eq!(node.output().get(), 3);
        assert_eq!(node.input.get(), 8);
    }

    #[test]
    fn test_flip_swaps_port_roles() {
        let add = sum::<i64>();
        let mut node = ReduceNode::new(signal(5i64), 5, Direction::Forward);

        node.set_direction(Direction::Backward);
        let mut publish = Publish::new();
        node.settle(0, &add, &[], &mut publish);
        publish.apply();

        assert_eq!(*node.combined(), -5);
        assert_eq!(node.output().get(), -5);
        assert_eq!(node.input.get(), 0);
    }

    #[test]
    fn test_into_removed_keeps_last_values() {
        let add = sum::<i64>();
        let mut node = ReduceNode::new(signal(4i64), 4, Direction::Forward);
        let mut publish = Publish::new();
        node.settle(1, &add, &[], &mut publish);
        publish.apply();

        let removed = node.into_removed();
        assert_eq!(*removed.carry(), 1);
        assert_eq!(*removed.combined(), 5);
        assert_eq!(removed.output().get(), 1);
        assert_eq!(removed.into_item().get(), 4);
    }
}
