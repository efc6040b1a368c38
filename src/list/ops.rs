//! push / unshift / pop / shift.
//!
//! Each operation touches only the boundary edge it creates or removes. The
//! rest of the chain keeps its wiring and its values.

use spark_signals::{signal, Signal};
use tracing::debug;

use super::{propagate, LinkedList, ListInner};
use crate::engine::publish::Publish;
use crate::engine::{Direction, NodeId, Port, ReduceNode, RemovedNode, Upstream};
use crate::types::{Scalar, Side};

impl<T: Scalar> ListInner<T> {
    /// Splice a new node onto the outer end of a chain.
    fn attach_outer(&mut self, side: Side, item: Signal<T>, value: T) -> (NodeId, Port<T>, Publish<T>) {
        let upstream = match self.chain(side).back() {
            Some(&outer) => Upstream::Node(outer),
            None => Upstream::Offset,
        };

        let mut node = ReduceNode::new(item, value, Direction::for_side(side));
        node.set_upstream(upstream);

        let mut publish = Publish::new();
        let carry = self.carry_from(upstream);
        node.settle(carry, &self.reducer, &self.extras, &mut publish);

        let port = node.output().clone();
        let id = self.arena.insert(node);
        self.chain_mut(side).push_back(id);

        publish.set(self.output_signal(side), self.outer_value(side));
        if side == Side::Next && self.next.len() == 1 {
            publish.set(&self.pivot, self.pivot_value());
        }

        (id, port, publish)
    }

    /// Unlink the outer node of a chain.
    fn detach_outer(&mut self, side: Side) -> Option<(ReduceNode<T>, Publish<T>)> {
        let id = self.chain_mut(side).pop_back()?;
        let mut node = self.arena.remove(id)?;
        node.set_upstream(Upstream::Detached);

        let mut publish = Publish::new();
        publish.set(self.output_signal(side), self.outer_value(side));
        if side == Side::Next && self.next.is_empty() {
            publish.set(&self.pivot, self.pivot_value());
        }

        Some((node, publish))
    }
}

impl<T: Scalar> LinkedList<T> {
    /// Append an item to the next chain. Returns the new node's output port.
    ///
    /// The first node pushed onto an empty next chain becomes the pivot.
    pub fn push(&self, item: Signal<T>) -> Port<T> {
        self.attach(Side::Next, item)
    }

    /// Prepend an item to the prev chain. Returns the new node's output port.
    pub fn unshift(&self, item: Signal<T>) -> Port<T> {
        self.attach(Side::Prev, item)
    }

    /// `push` a fixed value.
    pub fn push_value(&self, value: T) -> Port<T> {
        self.push(signal(value))
    }

    /// `unshift` a fixed value.
    pub fn unshift_value(&self, value: T) -> Port<T> {
        self.unshift(signal(value))
    }

    /// Remove the outermost next node. `None` if the next chain is empty.
    pub fn pop(&self) -> Option<RemovedNode<T>> {
        self.detach(Side::Next)
    }

    /// Remove the outermost prev node. `None` if the prev chain is empty.
    pub fn shift(&self) -> Option<RemovedNode<T>> {
        self.detach(Side::Prev)
    }

    fn attach(&self, side: Side, item: Signal<T>) -> Port<T> {
        let value = item.get();

        let (id, port, publish) = self
            .inner
            .borrow_mut()
            .attach_outer(side, item.clone(), value);
        publish.apply();

        let stop = propagate::subscribe_item(&self.inner, id, item);
        if let Some(node) = self.inner.borrow_mut().arena.get_mut(id) {
            node.set_subscription(stop);
        }

        debug!(
            list = %self.name,
            ?side,
            next = self.next_len(),
            prev = self.prev_len(),
            "attach"
        );
        port
    }

    fn detach(&self, side: Side) -> Option<RemovedNode<T>> {
        let Some((mut node, publish)) = self.inner.borrow_mut().detach_outer(side) else {
            debug!(list = %self.name, ?side, "detach on empty side");
            return None;
        };

        // Stop before publishing so the removed node can't see the new boundary
        if let Some(stop) = node.take_subscription() {
            stop();
        }
        publish.apply();

        debug!(
            list = %self.name,
            ?side,
            next = self.next_len(),
            prev = self.prev_len(),
            "detach"
        );
        Some(node.into_removed())
    }
}
