//! # spark-reduce-list
//!
//! Bidirectional incremental reduction on top of
//! [spark-signals](https://github.com/RLabs-Inc/spark-signals).
//!
//! A [`LinkedList`] keeps a running reduction (a scroll offset, the position
//! of stacked rows) across two chains that grow away from one shared offset.
//! Appending, prepending, removing at either end and moving the pivot all
//! update only what they touch; nothing re-reduces the whole list.
//!
//! ## Architecture
//!
//! ```text
//! item signals ──► ReduceNode arena ──► port signals
//!                        ▲
//! offset ──► DeferredScheduler (pre-tick start → dirty end) ──► head / tail / pivot
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Value bound, reducer signature, chain sides
//! - [`engine`] - Node arena, reduce nodes, ports
//! - [`pipeline`] - Offset lifecycle and the two-phase scheduler
//! - [`list`] - The list itself: push/unshift/pop/shift/set_pivot
//! - [`error`] - Construction errors

pub mod engine;
pub mod error;
pub mod list;
pub mod pipeline;
pub mod types;

pub use types::*;

pub use engine::{Direction, NodeId, Port, RemovedNode, Upstream};

pub use error::{ListError, ListResult};

pub use list::{LinkedList, ListBuilder};

pub use pipeline::{DeferredScheduler, OffsetPhase, OffsetSource, Phase, Task};
