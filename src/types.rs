//! Core types for spark-reduce-list.
//!
//! These types define the foundation the chains are built on: the value
//! bound, the reducer signature, and which side of the pivot a node lives on.

use std::fmt::Debug;
use std::ops::Neg;
use std::rc::Rc;

// =============================================================================
// Values
// =============================================================================

/// A value that can flow through a reduction chain.
///
/// `Neg` is required because the prev side runs the reducer mirrored around
/// the offset. `Default` provides the offset when none is configured.
pub trait Scalar: Clone + PartialEq + Neg<Output = Self> + Default + Debug + 'static {}

impl<T> Scalar for T where T: Clone + PartialEq + Neg<Output = T> + Default + Debug + 'static {}

// =============================================================================
// Reducer
// =============================================================================

/// Combining function: `(carry, item, extras) -> new carry`.
///
/// Rc so every node of a list shares the caller's closure.
pub type Reducer<T> = Rc<dyn Fn(&T, &T, &[T]) -> T>;

/// Wrap a closure as a [`Reducer`].
pub fn reducer<T, F>(f: F) -> Reducer<T>
where
    F: Fn(&T, &T, &[T]) -> T + 'static,
{
    Rc::new(f)
}

/// Reducer that adds the item (and every extra) to the carry.
///
/// This is the stacked-layout case: items are sizes, extras are gaps.
pub fn sum<T>() -> Reducer<T>
where
    T: Scalar + std::ops::Add<Output = T>,
{
    Rc::new(|carry: &T, item: &T, extras: &[T]| {
        extras
            .iter()
            .fold(carry.clone() + item.clone(), |acc, extra| acc + extra.clone())
    })
}

// =============================================================================
// Side
// =============================================================================

/// Which chain a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Forward chain, grows with `push`. Its innermost node is the pivot.
    Next,
    /// Backward chain, grows with `unshift`.
    Prev,
}

impl Side {
    /// The opposite chain.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Next => Side::Prev,
            Side::Prev => Side::Next,
        }
    }
}

// =============================================================================
// Cleanup
// =============================================================================

/// Unsubscribe handle. Calling it stops the underlying effect.
pub type Cleanup = Box<dyn FnOnce()>;
