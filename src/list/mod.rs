//! LinkedList - Bidirectional incremental reduction.
//!
//! Two chains of reduce nodes grow away from one shared offset. The next
//! chain accumulates forward, the prev chain accumulates mirrored, so with a
//! sum reducer over item sizes every node knows its position relative to the
//! pivot item:
//!
//! ```text
//!   unshift ◄──  p1 ◄── p0 ◄── Offset ──► n0 ──► n1  ──► push
//!   tail_output                  pivot_output     head_output
//! ```
//!
//! # Operations
//!
//! | Operation   | Touches                                   |
//! |-------------|-------------------------------------------|
//! | `push`      | new outer next node + `head_output`       |
//! | `unshift`   | new outer prev node + `tail_output`       |
//! | `pop`       | removed next node + `head_output`         |
//! | `shift`     | removed prev node + `tail_output`         |
//! | `set_pivot` | the `k` crossing nodes, then one propagation |
//!
//! # Example
//!
//! ```ignore
//! use spark_reduce_list::{LinkedList, sum};
//!
//! let list = LinkedList::builder().with_reducer(sum::<i64>()).build()?;
//! list.push_value(5);
//! list.push_value(3);
//! assert_eq!(list.head_output().get(), 8);
//! assert_eq!(list.pivot_output().get(), 5);
//!
//! list.unshift_value(2);
//! assert_eq!(list.tail_output().get(), -2);
//!
//! list.set_pivot(1);
//! list.flush();
//! assert_eq!(list.pivot_output().get(), 3);
//! assert_eq!(list.tail_output().get(), -7);
//! ```

mod builder;
mod ops;
mod pivot;
mod propagate;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::engine::{NodeArena, NodeId, Port, Upstream};
use crate::pipeline::{DeferredScheduler, Offset, OffsetSource};
use crate::types::{Cleanup, Reducer, Scalar, Side};

pub use builder::ListBuilder;

// =============================================================================
// Shared State
// =============================================================================

/// Everything the list's effects and scheduled tasks need to reach.
///
/// Lives behind `Rc<RefCell<..>>`; effects hold it weakly.
pub(crate) struct ListInner<T: Scalar> {
    name: Rc<str>,
    reducer: Reducer<T>,
    arena: NodeArena<T>,
    /// Forward chain, innermost (the pivot) first.
    next: VecDeque<NodeId>,
    /// Backward chain, innermost first.
    prev: VecDeque<NodeId>,
    offset: Offset<T>,
    extras: Vec<T>,
    head: Signal<T>,
    tail: Signal<T>,
    pivot: Signal<T>,
}

impl<T: Scalar> ListInner<T> {
    fn chain(&self, side: Side) -> &VecDeque<NodeId> {
        match side {
            Side::Next => &self.next,
            Side::Prev => &self.prev,
        }
    }

    fn chain_mut(&mut self, side: Side) -> &mut VecDeque<NodeId> {
        match side {
            Side::Next => &mut self.next,
            Side::Prev => &mut self.prev,
        }
    }

    fn set_upstream(&mut self, id: NodeId, upstream: Upstream) {
        if let Some(node) = self.arena.get_mut(id) {
            node.set_upstream(upstream);
        }
    }

    /// Carry a node with this upstream receives.
    fn carry_from(&self, upstream: Upstream) -> T {
        match upstream {
            Upstream::Node(id) => match self.arena.get(id) {
                Some(node) => node.combined().clone(),
                None => self.offset.value().clone(),
            },
            Upstream::Offset | Upstream::Detached => self.offset.value().clone(),
        }
    }

    /// Combined value at the outer end of a chain, or the offset if empty.
    fn outer_value(&self, side: Side) -> T {
        self.chain(side)
            .back()
            .and_then(|&id| self.arena.get(id))
            .map(|node| node.combined().clone())
            .unwrap_or_else(|| self.offset.value().clone())
    }

    /// Raw item value of the pivot, or the offset if the next chain is empty.
    fn pivot_value(&self) -> T {
        self.next
            .front()
            .and_then(|&id| self.arena.get(id))
            .map(|node| node.item_value().clone())
            .unwrap_or_else(|| self.offset.value().clone())
    }

    fn output_signal(&self, side: Side) -> &Signal<T> {
        match side {
            Side::Next => &self.head,
            Side::Prev => &self.tail,
        }
    }

    fn position(&self, side: Side, id: NodeId) -> Option<usize> {
        self.chain(side).iter().rposition(|&candidate| candidate == id)
    }

    /// Check every edge against chain order. Used by tests.
    #[cfg(test)]
    pub(crate) fn assert_wired(&self) {
        use crate::engine::Direction;

        for side in [Side::Next, Side::Prev] {
            let chain = self.chain(side);
            for (pos, &id) in chain.iter().enumerate() {
                let node = self.arena.get(id).expect("chain id not in arena");
                let expected = if pos == 0 {
                    Upstream::Offset
                } else {
                    Upstream::Node(chain[pos - 1])
                };
                assert_eq!(node.upstream(), expected, "{side:?}[{pos}] upstream");
                assert_eq!(node.direction(), Direction::for_side(side), "{side:?}[{pos}] direction");
            }
        }
        assert_eq!(self.arena.len(), self.next.len() + self.prev.len());
    }
}

// =============================================================================
// LinkedList
// =============================================================================

/// A bidirectional incremental reduction list.
///
/// Not `Send`: like every spark-signals structure it lives on one thread.
pub struct LinkedList<T: Scalar> {
    inner: Rc<RefCell<ListInner<T>>>,
    scheduler: DeferredScheduler,
    name: Rc<str>,
    head: Port<T>,
    tail: Port<T>,
    pivot: Port<T>,
    /// Offset and extras subscriptions.
    subscriptions: Vec<Cleanup>,
}

impl<T: Scalar> LinkedList<T> {
    /// List with a plain offset of `T::default()` on the shared scheduler.
    pub fn new<F>(reducer: F) -> Self
    where
        F: Fn(&T, &T, &[T]) -> T + 'static,
    {
        Self::from_parts(
            "list".into(),
            Rc::new(reducer),
            OffsetSource::default(),
            Vec::new(),
            DeferredScheduler::shared(),
        )
    }

    pub fn builder() -> ListBuilder<T> {
        ListBuilder::new()
    }

    pub(crate) fn from_parts(
        name: Rc<str>,
        reducer: Reducer<T>,
        source: OffsetSource<T>,
        extras: Vec<Signal<T>>,
        scheduler: DeferredScheduler,
    ) -> Self {
        let offset = Offset::new(source.clone());
        let initial = offset.value().clone();

        let head = signal(initial.clone());
        let tail = signal(initial.clone());
        let pivot = signal(initial);

        let inner = Rc::new(RefCell::new(ListInner {
            name: name.clone(),
            reducer,
            arena: NodeArena::new(),
            next: VecDeque::new(),
            prev: VecDeque::new(),
            offset,
            extras: extras.iter().map(|extra| extra.get()).collect(),
            head: head.clone(),
            tail: tail.clone(),
            pivot: pivot.clone(),
        }));

        let mut subscriptions = Vec::with_capacity(extras.len() + 1);
        if let OffsetSource::Signal(source) = source {
            subscriptions.push(propagate::subscribe_offset(&inner, source));
        }
        for (index, extra) in extras.into_iter().enumerate() {
            subscriptions.push(propagate::subscribe_extra(&inner, &scheduler, index, extra));
        }

        tracing::debug!(list = %name, "list created");

        Self {
            inner,
            scheduler,
            name,
            head: Port::new(head),
            tail: Port::new(tail),
            pivot: Port::new(pivot),
            subscriptions,
        }
    }

    // =========================================================================
    // Derived outputs
    // =========================================================================

    /// Combined output of the outermost next node (the offset if none).
    pub fn head_output(&self) -> &Port<T> {
        &self.head
    }

    /// Combined output of the outermost prev node (the offset if none).
    pub fn tail_output(&self) -> &Port<T> {
        &self.tail
    }

    /// Raw item value of the pivot node (the offset if the next chain is empty).
    pub fn pivot_output(&self) -> &Port<T> {
        &self.pivot
    }

    /// Output ports of one chain, innermost first.
    pub fn ports(&self, side: Side) -> Vec<Port<T>> {
        let inner = self.inner.borrow();
        inner
            .chain(side)
            .iter()
            .filter_map(|&id| inner.arena.get(id))
            .map(|node| node.output().clone())
            .collect()
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn next_len(&self) -> usize {
        self.inner.borrow().next.len()
    }

    pub fn prev_len(&self) -> usize {
        self.inner.borrow().prev.len()
    }

    /// Nodes on both sides.
    pub fn len(&self) -> usize {
        self.inner.borrow().arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The scheduler this list stages offset propagation on.
    pub fn scheduler(&self) -> &DeferredScheduler {
        &self.scheduler
    }

    #[cfg(test)]
    pub(crate) fn assert_wired(&self) {
        self.inner.borrow().assert_wired();
    }
}

impl<T: Scalar> Drop for LinkedList<T> {
    fn drop(&mut self) {
        for stop in self.subscriptions.drain(..) {
            stop();
        }

        // Borrow ends before any effect is stopped
        let nodes = self.inner.borrow_mut().arena.drain();
        for mut node in nodes {
            if let Some(stop) = node.take_subscription() {
                stop();
            }
        }
    }
}
