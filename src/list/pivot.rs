//! Repivoting.
//!
//! Moving the pivot by `k` reclassifies the `k` nodes nearest the offset on
//! one side as nodes of the other side. Direction is a wiring property, so a
//! crossing node only has its direction flipped and its boundary edges
//! rewritten. Stored values are corrected by the offset propagation that
//! follows, which is the only step that visits the whole list.
//!
//! ```text
//! set_pivot(1):
//!   prev [p0]        next [n0, n1]
//!   prev [n0, p0]    next [n1]        (n0 now Backward, p0 derives from n0)
//! ```

use tracing::debug;

use super::{propagate, LinkedList, ListInner};
use crate::engine::{Direction, Upstream};
use crate::types::{Scalar, Side};

impl<T: Scalar> ListInner<T> {
    /// Clamp a signed move to the nodes available on the requested side.
    fn clamp_pivot(&self, index: isize) -> isize {
        let forward = self.next.len() as isize;
        let backward = self.prev.len() as isize;
        index.clamp(-backward, forward)
    }

    /// Move the innermost node of `from` to the inner end of the other chain.
    fn migrate(&mut self, from: Side) {
        let to = from.opposite();
        let Some(id) = self.chain_mut(from).pop_front() else {
            return;
        };

        // The node behind it derived from it; cut that edge
        if let Some(&behind) = self.chain(from).front() {
            self.set_upstream(behind, Upstream::Detached);
        }
        // The old innermost node of the target chain now derives from it
        if let Some(&ahead) = self.chain(to).front() {
            self.set_upstream(ahead, Upstream::Node(id));
        }

        if let Some(node) = self.arena.get_mut(id) {
            node.set_direction(Direction::for_side(to));
            node.set_upstream(Upstream::Detached);
        }
        self.chain_mut(to).push_front(id);
    }

    /// Rewire for a pivot move. Returns the clamped distance moved.
    fn repivot(&mut self, index: isize) -> isize {
        let index = self.clamp_pivot(index);
        if index == 0 {
            return 0;
        }

        for side in [Side::Next, Side::Prev] {
            if let Some(&front) = self.chain(side).front() {
                self.set_upstream(front, Upstream::Detached);
            }
        }

        let from = if index > 0 { Side::Next } else { Side::Prev };
        for _ in 0..index.unsigned_abs() {
            self.migrate(from);
        }

        for side in [Side::Next, Side::Prev] {
            if let Some(&front) = self.chain(side).front() {
                self.set_upstream(front, Upstream::Offset);
            }
        }

        index
    }
}

impl<T: Scalar> LinkedList<T> {
    /// Move the pivot by a signed number of nodes.
    ///
    /// Positive moves next-side nodes to the prev side (the pivot walks
    /// toward the head); negative moves prev-side nodes to the next side.
    /// The move is clamped to the nodes available, and a zero move does
    /// nothing. Outputs update when the offset propagation completes: on the
    /// next flush for a plain offset, immediately for a signal-backed one.
    pub fn set_pivot(&self, index: isize) {
        if index == 0 {
            return;
        }

        let moved = self.inner.borrow_mut().repivot(index);
        debug!(list = %self.name, requested = index, moved, "set_pivot");
        if moved == 0 {
            return;
        }

        propagate::fire_offset(&self.inner, &self.scheduler);
    }
}
