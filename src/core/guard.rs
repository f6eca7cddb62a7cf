//! Guard predicates for controlling state transitions.
//!
//! Guards are pure boolean functions over the inputs of a decision. They
//! let the transition table be written as data instead of nested branches.

use std::fmt;
use std::sync::Arc;

/// Pure predicate that decides whether a transition rule applies.
///
/// # Example
///
/// ```rust
/// use qcore_state::core::Guard;
///
/// let positive = Guard::new(|n: &i32| *n > 0);
/// assert!(positive.check(&3));
/// assert!(!positive.check(&-1));
/// ```
pub struct Guard<C> {
    predicate: Arc<dyn Fn(&C) -> bool + Send + Sync>,
}

impl<C> Guard<C> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Guard that always passes.
    pub fn always() -> Self
    where
        C: 'static,
    {
        Self::new(|_| true)
    }

    pub fn check(&self, input: &C) -> bool {
        (self.predicate)(input)
    }
}

impl<C> Clone for Guard<C> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<C> fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}
