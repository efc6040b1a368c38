//! Offset propagation and stream subscriptions.
//!
//! A change can enter a list three ways:
//!
//! - **item**: recompute from that node outward, synchronously.
//! - **offset**: every node depends on it. Signal-backed offsets propagate
//!   synchronously; plain offsets are staged on the scheduler (start in
//!   pre-tick, end in dirty).
//! - **extra**: every node depends on it, handled like an offset change.
//!
//! Subscriptions are spark-signals effects holding the list state weakly; the
//! effect's stop closure is the unsubscribe handle.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use spark_signals::{effect, Signal};
use tracing::trace;

use super::{LinkedList, ListInner};
use crate::engine::publish::Publish;
use crate::engine::NodeId;
use crate::pipeline::{DeferredScheduler, OffsetPhase};
use crate::types::{Cleanup, Scalar, Side};

type Shared<T> = Rc<RefCell<ListInner<T>>>;

// =============================================================================
// Recompute
// =============================================================================

impl<T: Scalar> ListInner<T> {
    /// Recompute a chain from `from` to its outer end.
    fn settle_from(&mut self, side: Side, from: usize, publish: &mut Publish<T>) {
        for pos in from..self.chain(side).len() {
            let id = self.chain(side)[pos];
            let Some(upstream) = self.arena.get(id).map(|node| node.upstream()) else {
                continue;
            };
            let carry = self.carry_from(upstream);
            if let Some(node) = self.arena.get_mut(id) {
                node.settle(carry, &self.reducer, &self.extras, publish);
            }
        }
    }

    pub(super) fn publish_outputs(&self, publish: &mut Publish<T>) {
        publish.set(&self.head, self.outer_value(Side::Next));
        publish.set(&self.tail, self.outer_value(Side::Prev));
        publish.set(&self.pivot, self.pivot_value());
    }

    fn on_item_changed(&mut self, id: NodeId, value: T) -> Publish<T> {
        let mut publish = Publish::new();

        let Some(node) = self.arena.get_mut(id) else {
            return publish;
        };
        if !node.set_item_value(value) {
            return publish;
        }
        let side = node.direction().side();
        let Some(pos) = self.position(side, id) else {
            return publish;
        };

        self.settle_from(side, pos, &mut publish);
        publish.set(self.output_signal(side), self.outer_value(side));
        if side == Side::Next && pos == 0 {
            publish.set(&self.pivot, self.pivot_value());
        }
        publish
    }

    /// Cache an extra's value. Returns false when nothing changed.
    fn set_extra(&mut self, index: usize, value: T) -> bool {
        match self.extras.get_mut(index) {
            Some(current) if *current != value => {
                *current = value;
                true
            }
            _ => false,
        }
    }

    /// Start phase: commit the offset and recompute both chains.
    fn begin_propagation(&mut self) -> Publish<T> {
        self.offset.begin();

        let mut publish = Publish::new();
        self.settle_from(Side::Next, 0, &mut publish);
        self.settle_from(Side::Prev, 0, &mut publish);
        trace!(
            list = %self.name,
            offset = ?self.offset.value(),
            ports = publish.len(),
            "propagation start"
        );
        publish
    }

    /// End phase: publish the derived outputs and close the cycle.
    fn end_propagation(&mut self) -> Publish<T> {
        self.offset.end();

        let mut publish = Publish::new();
        self.publish_outputs(&mut publish);
        trace!(
            list = %self.name,
            offset = ?self.offset.value(),
            cycle = self.offset.cycles(),
            "propagation end"
        );
        publish
    }
}

// =============================================================================
// Firing the offset
// =============================================================================

/// Run both phases now, publishing start writes before end writes.
fn propagate_now<T: Scalar>(inner: &Shared<T>) {
    let started = inner.borrow_mut().begin_propagation();
    started.apply();
    let ended = inner.borrow_mut().end_propagation();
    ended.apply();
}

/// Queue start on pre-tick; start queues end on dirty.
fn schedule<T: Scalar>(inner: &Shared<T>, scheduler: &DeferredScheduler) {
    let weak = Rc::downgrade(inner);
    let dirty = scheduler.clone();

    scheduler.push_pre_tick(move || {
        let Some(inner) = weak.upgrade() else { return };
        let started = inner.borrow_mut().begin_propagation();
        started.apply();

        let weak = Rc::downgrade(&inner);
        dirty.push_dirty(move || {
            let Some(inner) = weak.upgrade() else { return };
            let ended = inner.borrow_mut().end_propagation();
            ended.apply();
        });
    });
}

/// Recompute every node from the current offset.
pub(super) fn fire_offset<T: Scalar>(inner: &Shared<T>, scheduler: &DeferredScheduler) {
    let (is_signal, requested) = {
        let mut state = inner.borrow_mut();
        let is_signal = state.offset.is_signal();
        (is_signal, is_signal || state.offset.request())
    };

    if is_signal {
        propagate_now(inner);
    } else if requested {
        schedule(inner, scheduler);
    }
}

// =============================================================================
// Subscriptions
// =============================================================================

pub(super) fn subscribe_item<T: Scalar>(inner: &Shared<T>, id: NodeId, item: Signal<T>) -> Cleanup {
    let weak: Weak<RefCell<ListInner<T>>> = Rc::downgrade(inner);
    let stop = effect(move || {
        let value = item.get();
        let Some(inner) = weak.upgrade() else { return };
        let publish = inner.borrow_mut().on_item_changed(id, value);
        publish.apply();
    });
    Box::new(stop)
}

pub(super) fn subscribe_offset<T: Scalar>(inner: &Shared<T>, source: Signal<T>) -> Cleanup {
    let weak = Rc::downgrade(inner);
    let stop = effect(move || {
        let value = source.get();
        let Some(inner) = weak.upgrade() else { return };
        inner.borrow_mut().offset.stage(value);
        propagate_now(&inner);
    });
    Box::new(stop)
}

pub(super) fn subscribe_extra<T: Scalar>(
    inner: &Shared<T>,
    scheduler: &DeferredScheduler,
    index: usize,
    extra: Signal<T>,
) -> Cleanup {
    let weak = Rc::downgrade(inner);
    let scheduler = scheduler.clone();
    let stop = effect(move || {
        let value = extra.get();
        let Some(inner) = weak.upgrade() else { return };
        let changed = inner.borrow_mut().set_extra(index, value);
        if changed {
            fire_offset(&inner, &scheduler);
        }
    });
    Box::new(stop)
}

// =============================================================================
// Public surface
// =============================================================================

impl<T: Scalar> LinkedList<T> {
    /// Last committed offset value.
    pub fn offset(&self) -> T {
        self.inner.borrow().offset.value().clone()
    }

    /// Move the offset.
    ///
    /// Signal-backed: writes the signal and the change cascades immediately.
    /// Plain: stages the value; it commits on the next [`flush`](Self::flush).
    pub fn set_offset(&self, value: T) {
        let source = self.inner.borrow().offset.signal().cloned();
        match source {
            Some(signal) => {
                signal.set(value);
            }
            None => {
                self.inner.borrow_mut().offset.stage(value);
                self.fire_offset();
            }
        }
    }

    /// Re-run propagation from the current offset through every node.
    pub fn fire_offset(&self) {
        fire_offset(&self.inner, &self.scheduler);
    }

    /// Run the scheduler until no staged work is left.
    pub fn flush(&self) -> usize {
        self.scheduler.flush()
    }

    /// True while a propagation is queued or has started without ending.
    pub fn is_propagating(&self) -> bool {
        self.inner.borrow().offset.is_pending()
    }

    /// Where the offset is in its start/end lifecycle.
    pub fn offset_phase(&self) -> OffsetPhase {
        self.inner.borrow().offset.phase()
    }

    /// Completed propagation cycles since construction.
    pub fn propagation_cycles(&self) -> u64 {
        self.inner.borrow().offset.cycles()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::pipeline::{DeferredScheduler, OffsetPhase};
    use crate::types::sum;
    use crate::Side;
    use crate::LinkedList;
    use spark_signals::{flush_sync, signal};

    #[test]
    fn test_static_offset_is_staged_until_flush() {
        let list = LinkedList::builder()
            .with_reducer(sum::<i64>())
            .scheduler(DeferredScheduler::new())
            .build()
            .unwrap();
        let port = list.push_value(5);

        list.set_offset(10);
        assert!(list.is_propagating());
        assert_eq!(list.offset(), 0);
        assert_eq!(list.head_output().get(), 5);

        assert_eq!(list.propagation_cycles(), 0);

        assert_eq!(list.flush(), 2);
        assert!(!list.is_propagating());
        assert_eq!(list.offset_phase(), OffsetPhase::Idle);
        assert_eq!(list.propagation_cycles(), 1);
        assert_eq!(list.offset(), 10);
        assert_eq!(list.head_output().get(), 15);
        assert_eq!(port.get(), 10);
    }

    #[test]
    fn test_repeated_fires_coalesce() {
        let scheduler = DeferredScheduler::new();
        let list = LinkedList::builder()
            .with_reducer(sum::<i64>())
            .scheduler(scheduler.clone())
            .build()
            .unwrap();

        list.set_offset(1);
        list.set_offset(2);
        list.fire_offset();

        assert_eq!(scheduler.pending(), (1, 0));
        list.flush();
        assert_eq!(list.offset(), 2);
    }

    #[test]
    fn test_ports_start_before_outputs_end() {
        let scheduler = DeferredScheduler::new();
        let list = LinkedList::builder()
            .with_reducer(sum::<i64>())
            .scheduler(scheduler.clone())
            .build()
            .unwrap();
        let port = list.push_value(5);
        list.set_offset(1);

        // Observe the list between the two phases
        let seen = Rc::new(RefCell::new(None));
        let seen_in_task = seen.clone();
        let head = list.head_output().clone();
        let port_in_task = port.clone();
        scheduler.push_pre_tick(move || {
            *seen_in_task.borrow_mut() = Some((port_in_task.get(), head.get()));
        });

        list.flush();

        // Port already moved by the start phase, head still waiting on end
        assert_eq!(*seen.borrow(), Some((1, 5)));
        assert_eq!(list.head_output().get(), 6);
    }

    #[test]
    fn test_signal_offset_cascades_immediately() {
        let scroll = signal(0i64);
        let list = LinkedList::builder()
            .with_reducer(sum::<i64>())
            .offset_signal(scroll.clone())
            .scheduler(DeferredScheduler::new())
            .build()
            .unwrap();
        list.push_value(5);
        list.unshift_value(2);

        scroll.set(100);
        flush_sync();

        assert_eq!(list.offset(), 100);
        assert_eq!(list.head_output().get(), 105);
        assert_eq!(list.tail_output().get(), 98);
        assert!(list.scheduler().is_idle());
    }

    #[test]
    fn test_set_offset_writes_signal_source() {
        let scroll = signal(0i64);
        let list = LinkedList::builder()
            .with_reducer(sum::<i64>())
            .offset_signal(scroll.clone())
            .scheduler(DeferredScheduler::new())
            .build()
            .unwrap();
        list.push_value(5);

        list.set_offset(-4);
        flush_sync();

        assert_eq!(scroll.get(), -4);
        assert_eq!(list.head_output().get(), 1);
    }

    #[test]
    fn test_one_signal_drives_two_lists() {
        let scroll = signal(0i64);
        let build = || {
            LinkedList::builder()
                .with_reducer(sum::<i64>())
                .offset_signal(scroll.clone())
                .scheduler(DeferredScheduler::new())
                .build()
                .unwrap()
        };
        let a = build();
        let b = build();
        a.push_value(1);
        b.push_value(2);

        scroll.set(10);
        flush_sync();

        assert_eq!(a.head_output().get(), 11);
        assert_eq!(b.head_output().get(), 12);
    }

    #[test]
    fn test_extra_change_recomputes_every_node() {
        let gap = signal(1i64);
        let list = LinkedList::builder()
            .with_reducer(sum::<i64>())
            .extra(gap.clone())
            .scheduler(DeferredScheduler::new())
            .build()
            .unwrap();
        list.push_value(5);
        list.push_value(3);
        assert_eq!(list.head_output().get(), 10);

        gap.set(2);
        flush_sync();
        list.flush();

        assert_eq!(list.head_output().get(), 12);
    }

    #[test]
    fn test_pending_propagation_dropped_with_list() {
        let scheduler = DeferredScheduler::new();
        let list = LinkedList::builder()
            .with_reducer(sum::<i64>())
            .scheduler(scheduler.clone())
            .build()
            .unwrap();
        list.set_offset(3);
        drop(list);

        // The queued start finds no list and does nothing
        assert_eq!(scheduler.flush(), 1);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_repivot_between_start_and_end_is_propagated() {
        let scheduler = DeferredScheduler::new();
        let list = Rc::new(
            LinkedList::builder()
                .with_reducer(sum::<i64>())
                .scheduler(scheduler.clone())
                .build()
                .unwrap(),
        );
        list.push_value(5);
        list.push_value(3);
        list.unshift_value(2);
        list.set_offset(1);

        // Runs after the queued start, before its end
        let in_task = list.clone();
        scheduler.push_pre_tick(move || in_task.set_pivot(1));
        list.flush();

        // next: [3], prev: [5, 2], offset 1
        assert_eq!(list.head_output().get(), 4);
        assert_eq!(list.tail_output().get(), -6);
        assert_eq!(list.pivot_output().get(), 3);
        let prev: Vec<i64> = list.ports(Side::Prev).iter().map(|p| p.get()).collect();
        assert_eq!(prev, vec![-4, -6]);
        assert!(!list.is_propagating());
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_set_offset_between_start_and_end_is_committed() {
        let scheduler = DeferredScheduler::new();
        let list = Rc::new(
            LinkedList::builder()
                .with_reducer(sum::<i64>())
                .scheduler(scheduler.clone())
                .build()
                .unwrap(),
        );
        list.push_value(5);
        list.push_value(3);
        list.set_offset(1);

        let in_task = list.clone();
        scheduler.push_pre_tick(move || in_task.set_offset(7));
        list.flush();

        assert_eq!(list.offset(), 7);
        assert_eq!(list.head_output().get(), 15);
        assert!(!list.is_propagating());
        assert_eq!(list.offset_phase(), OffsetPhase::Idle);
        assert_eq!(list.propagation_cycles(), 2);
    }

    #[test]
    fn test_is_propagating_between_start_and_end() {
        let scheduler = DeferredScheduler::new();
        let list = Rc::new(
            LinkedList::builder()
                .with_reducer(sum::<i64>())
                .scheduler(scheduler.clone())
                .build()
                .unwrap(),
        );
        list.set_offset(2);

        let seen = Rc::new(RefCell::new(None));
        let seen_in_task = seen.clone();
        let in_task = list.clone();
        scheduler.push_pre_tick(move || {
            *seen_in_task.borrow_mut() = Some((in_task.is_propagating(), in_task.offset_phase()));
        });
        list.flush();

        assert_eq!(*seen.borrow(), Some((true, OffsetPhase::Started)));
        assert!(!list.is_propagating());
    }
}
