//! Propagation Pipeline
//!
//! This module carries an offset change through a list:
//!
//! ```text
//! Offset change → pre-tick "start" (recompute chains) → dirty "end" (publish outputs)
//! ```
//!
//! ## Key Design Principles
//!
//! - **Two phases**: every start in a flush runs before any end, so nothing
//!   downstream observes a chain halfway through a rewrite.
//! - **Owner-driven lifecycle**: the list calls `begin`/`end` on its offset;
//!   the offset never calls out.

pub mod offset;
pub mod scheduler;

pub use offset::{OffsetPhase, OffsetSource};
pub(crate) use offset::Offset;
pub use scheduler::{DeferredScheduler, Phase, Task};
