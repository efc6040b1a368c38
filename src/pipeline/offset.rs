//! Offset - The shared root both chains grow from.
//!
//! The offset is either a plain value owned by the list, or a signal driven
//! from outside. Either way the list keeps the last committed value and moves
//! it through an explicit propagation lifecycle:
//!
//! ```text
//! stage(v) ──► begin() ──► (chains recompute) ──► end()
//!               Started                            Idle
//! ```
//!
//! `begin` and `end` are invoked by the owning list only. Nothing registers
//! listeners on the offset, so one signal can drive several lists without
//! them seeing each other's propagation state.

use spark_signals::Signal;

use crate::types::Scalar;

// =============================================================================
// Offset Source
// =============================================================================

/// Where the offset value comes from.
#[derive(Clone)]
pub enum OffsetSource<T: Scalar> {
    /// Plain value. Changes go through `set_offset` and are staged on the
    /// scheduler.
    Static(T),
    /// Externally driven value. Writes to the signal cascade synchronously.
    Signal(Signal<T>),
}

impl<T: Scalar> OffsetSource<T> {
    /// Current value of the source.
    pub fn current(&self) -> T {
        match self {
            OffsetSource::Static(value) => value.clone(),
            OffsetSource::Signal(signal) => signal.get(),
        }
    }

    pub fn is_signal(&self) -> bool {
        matches!(self, OffsetSource::Signal(_))
    }
}

impl<T: Scalar> Default for OffsetSource<T> {
    fn default() -> Self {
        OffsetSource::Static(T::default())
    }
}

// =============================================================================
// Offset Lifecycle
// =============================================================================

/// Propagation state of an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetPhase {
    /// No propagation running.
    Idle,
    /// At least one `begin` has not reached its `end` yet.
    Started,
}

/// Committed offset value plus its propagation bookkeeping.
///
/// A request stays pending only until its start phase runs. A request made
/// after that (between start and end) queues a fresh cycle, so rewrites made
/// mid-cycle are never folded into an end that has already been scheduled.
pub(crate) struct Offset<T: Scalar> {
    source: OffsetSource<T>,
    cached: T,
    staged: Option<T>,
    /// Started cycles whose end has not run.
    open: u32,
    pending: bool,
    cycles: u64,
}

impl<T: Scalar> Offset<T> {
    pub(crate) fn new(source: OffsetSource<T>) -> Self {
        let cached = source.current();
        Self {
            source,
            cached,
            staged: None,
            open: 0,
            pending: false,
            cycles: 0,
        }
    }

    /// Last committed value.
    pub(crate) fn value(&self) -> &T {
        &self.cached
    }

    pub(crate) fn is_signal(&self) -> bool {
        self.source.is_signal()
    }

    pub(crate) fn signal(&self) -> Option<&Signal<T>> {
        match &self.source {
            OffsetSource::Signal(signal) => Some(signal),
            OffsetSource::Static(_) => None,
        }
    }

    /// Value the next `begin` will commit.
    pub(crate) fn stage(&mut self, value: T) {
        self.staged = Some(value);
    }

    /// Mark a start as queued. Returns false if one is queued and not yet run.
    pub(crate) fn request(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    /// A start is queued, or a started cycle has not ended.
    pub(crate) fn is_pending(&self) -> bool {
        self.pending || self.open > 0
    }

    pub(crate) fn phase(&self) -> OffsetPhase {
        if self.open > 0 {
            OffsetPhase::Started
        } else {
            OffsetPhase::Idle
        }
    }

    /// Start phase: commit the staged value (or re-commit the cached one).
    pub(crate) fn begin(&mut self) {
        if let Some(value) = self.staged.take() {
            if let OffsetSource::Static(current) = &mut self.source {
                *current = value.clone();
            }
            self.cached = value;
        }
        self.pending = false;
        self.open += 1;
    }

    /// End phase: close one started cycle.
    pub(crate) fn end(&mut self) {
        self.open = self.open.saturating_sub(1);
        self.cycles += 1;
    }

    /// Completed propagation cycles.
    pub(crate) fn cycles(&self) -> u64 {
        self.cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_signals::signal;

    #[test]
    fn test_static_source_defaults_to_zero() {
        let offset: Offset<i64> = Offset::new(OffsetSource::default());
        assert_eq!(*offset.value(), 0);
        assert!(!offset.is_signal());
        assert!(offset.signal().is_none());
    }

    #[test]
    fn test_signal_source_reads_current_value() {
        let source = signal(12i64);
        let offset = Offset::new(OffsetSource::Signal(source.clone()));
        assert_eq!(*offset.value(), 12);
        assert!(offset.is_signal());
    }

    #[test]
    fn test_staged_value_commits_on_begin() {
        let mut offset = Offset::new(OffsetSource::Static(1i64));
        offset.stage(5);

        // Not visible until the start phase
        assert_eq!(*offset.value(), 1);

        offset.begin();
        assert_eq!(offset.phase(), OffsetPhase::Started);
        assert_eq!(*offset.value(), 5);

        offset.end();
        assert_eq!(offset.phase(), OffsetPhase::Idle);
        assert_eq!(*offset.value(), 5);
        assert_eq!(offset.cycles(), 1);
    }

    #[test]
    fn test_begin_without_stage_recommits_cached() {
        let mut offset = Offset::new(OffsetSource::Static(3i64));
        offset.begin();
        offset.end();
        assert_eq!(*offset.value(), 3);
    }

    #[test]
    fn test_requests_coalesce_until_start() {
        let mut offset = Offset::new(OffsetSource::Static(0i64));

        assert!(offset.request());
        assert!(!offset.request());
        assert!(offset.is_pending());

        offset.begin();
        offset.end();
        assert!(!offset.is_pending());
        assert!(offset.request());
    }

    #[test]
    fn test_request_between_start_and_end_queues_again() {
        let mut offset = Offset::new(OffsetSource::Static(0i64));
        assert!(offset.request());
        offset.begin();

        // Still running, but the queued start has been consumed
        assert!(offset.is_pending());
        assert!(offset.request());

        offset.begin();
        offset.end();
        assert_eq!(offset.phase(), OffsetPhase::Started);
        assert!(offset.is_pending());

        offset.end();
        assert_eq!(offset.phase(), OffsetPhase::Idle);
        assert!(!offset.is_pending());
        assert_eq!(offset.cycles(), 2);
    }
}
