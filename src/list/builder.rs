//! List configuration.

use std::rc::Rc;

use spark_signals::Signal;

use super::LinkedList;
use crate::error::{ListError, ListResult};
use crate::pipeline::{DeferredScheduler, OffsetSource};
use crate::types::{Reducer, Scalar};

/// Configures a [`LinkedList`].
///
/// # Example
///
/// ```ignore
/// use spark_signals::signal;
/// use spark_reduce_list::{LinkedList, sum};
///
/// let scroll = signal(0.0f64);
/// let gap = signal(1.0f64);
///
/// let list = LinkedList::builder()
///     .name("feed")
///     .with_reducer(sum::<f64>())
///     .offset_signal(scroll.clone())
///     .extra(gap)
///     .build()?;
/// ```
pub struct ListBuilder<T: Scalar> {
    name: String,
    reducer: Option<Reducer<T>>,
    offset: OffsetSource<T>,
    extras: Vec<Signal<T>>,
    scheduler: Option<DeferredScheduler>,
}

impl<T: Scalar> Default for ListBuilder<T> {
    fn default() -> Self {
        Self {
            name: "list".to_string(),
            reducer: None,
            offset: OffsetSource::default(),
            extras: Vec::new(),
            scheduler: None,
        }
    }
}

impl<T: Scalar> ListBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name attached to this list's log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Combining function `(carry, item, extras) -> carry`.
    pub fn reducer<F>(mut self, reducer: F) -> Self
    where
        F: Fn(&T, &T, &[T]) -> T + 'static,
    {
        self.reducer = Some(Rc::new(reducer));
        self
    }

    /// Use an already shared reducer.
    pub fn with_reducer(mut self, reducer: Reducer<T>) -> Self {
        self.reducer = Some(reducer);
        self
    }

    /// Plain starting offset. Later changes go through `set_offset`.
    pub fn offset(mut self, value: T) -> Self {
        self.offset = OffsetSource::Static(value);
        self
    }

    /// Externally driven offset.
    pub fn offset_signal(mut self, signal: Signal<T>) -> Self {
        self.offset = OffsetSource::Signal(signal);
        self
    }

    pub fn offset_source(mut self, source: OffsetSource<T>) -> Self {
        self.offset = source;
        self
    }

    /// Auxiliary stream passed to every reducer call, in the order added.
    pub fn extra(mut self, extra: Signal<T>) -> Self {
        self.extras.push(extra);
        self
    }

    pub fn extras(mut self, extras: impl IntoIterator<Item = Signal<T>>) -> Self {
        self.extras.extend(extras);
        self
    }

    /// Stage propagation on this scheduler instead of the thread's shared one.
    pub fn scheduler(mut self, scheduler: DeferredScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> ListResult<LinkedList<T>> {
        let Some(reducer) = self.reducer else {
            return Err(ListError::MissingReducer { name: self.name });
        };

        Ok(LinkedList::from_parts(
            self.name.into(),
            reducer,
            self.offset,
            self.extras,
            self.scheduler.unwrap_or_else(DeferredScheduler::shared),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sum;
    use spark_signals::signal;

    #[test]
    fn test_build_without_reducer_fails() {
        let result = ListBuilder::<i64>::new().name("feed").build();
        assert!(matches!(
            result,
            Err(ListError::MissingReducer { ref name }) if name == "feed"
        ));
    }

    #[test]
    fn test_build_with_closure_reducer() {
        let list = ListBuilder::new()
            .reducer(|carry: &i64, item: &i64, _: &[i64]| carry + item * 2)
            .scheduler(DeferredScheduler::new())
            .build()
            .unwrap();

        list.push_value(3);
        assert_eq!(list.head_output().get(), 6);
    }

    #[test]
    fn test_extras_reach_reducer_in_order() {
        let list = ListBuilder::new()
            .reducer(|carry: &i64, item: &i64, extras: &[i64]| {
                carry + item * extras[0] + extras[1]
            })
            .extras([signal(10i64), signal(1i64)])
            .scheduler(DeferredScheduler::new())
            .build()
            .unwrap();

        list.push_value(2);
        assert_eq!(list.head_output().get(), 21);
    }

    #[test]
    fn test_name_and_offset_are_applied() {
        let list = ListBuilder::new()
            .name("rows")
            .with_reducer(sum::<i64>())
            .offset(-3)
            .scheduler(DeferredScheduler::new())
            .build()
            .unwrap();

        assert_eq!(list.name(), "rows");
        assert_eq!(list.offset(), -3);
        list.push_value(1);
        assert_eq!(list.head_output().get(), -2);
    }
}
