//! Deferred signal writes.
//!
//! List state lives behind a `RefCell`. Writing a signal can synchronously run
//! observer effects, and those observers may call back into the list, so no
//! signal is ever written while the state is borrowed. Mutations collect their
//! writes here and the caller applies them after the borrow ends.

use spark_signals::Signal;

use crate::types::Scalar;

/// A batch of pending `Signal::set` calls, applied in insertion order.
#[must_use = "pending writes do nothing until applied"]
pub(crate) struct Publish<T: Scalar> {
    writes: Vec<(Signal<T>, T)>,
}

impl<T: Scalar> Publish<T> {
    pub(crate) fn new() -> Self {
        Self { writes: Vec::new() }
    }

    pub(crate) fn set(&mut self, target: &Signal<T>, value: T) {
        self.writes.push((target.clone(), value));
    }

    pub(crate) fn len(&self) -> usize {
        self.writes.len()
    }

    /// Write every value. Must be called with no list borrow held.
    pub(crate) fn apply(self) {
        for (target, value) in self.writes {
            target.set(value);
        }
    }
}
