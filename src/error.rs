//! Construction errors.
//!
//! Runtime edge cases never error: `set_pivot` clamps and `pop`/`shift` on an
//! empty side return `None`. Only a misconfigured list fails, at build time.

use thiserror::Error;

/// Errors raised while configuring a [`LinkedList`](crate::LinkedList).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    /// `build()` was called before a reducer was supplied.
    #[error("list `{name}` has no reducer")]
    MissingReducer {
        /// Diagnostic name of the list being built.
        name: String,
    },
}

/// Result alias for list construction.
pub type ListResult<T> = Result<T, ListError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_reducer_message() {
        let err = ListError::MissingReducer {
            name: "feed".to_string(),
        };
        assert_eq!(err.to_string(), "list `feed` has no reducer");
    }
}
