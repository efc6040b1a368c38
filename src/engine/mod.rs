//! Reduction engine - Node arena and reduce nodes.
//!
//! The engine manages the core data structures:
//! - Arena: Index allocation with generations and a free pool
//! - ReduceNode: One reduction step, its direction and its ports
//! - Publish: Signal writes deferred until list state is released
//!
//! # Architecture
//!
//! Chains are NOT graphs of live subscriptions. They are double-ended
//! sequences of `NodeId`s into one arena, and each node carries an explicit
//! upstream edge:
//!
//! ```text
//! prev: [p0, p1, p2]            next: [n0, n1, n2]
//!   p2 ◄── p1 ◄── p0 ◄── Offset ──► n0 ──► n1 ──► n2
//!   tail                            pivot          head
//! ```
//!
//! Moving the pivot only flips the direction of the nodes that cross it and
//! rewrites the edges at the boundary.

mod arena;
pub(crate) mod publish;
mod reduce_node;

pub use arena::NodeId;
pub(crate) use arena::NodeArena;
pub use reduce_node::{Direction, Port, RemovedNode, Upstream};
pub(crate) use reduce_node::ReduceNode;
