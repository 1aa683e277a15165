//! Collection configuration.

use std::fmt;

use crate::treap::{KeyCompare, bytewise_compare};

/// Default number of node shells a collection keeps for reuse.
pub const DEFAULT_RECYCLE_CAPACITY: usize = 1024;

/// Settings fixed when a [`Collection`](super::Collection) is created.
///
/// # Examples
///
/// ```rust
/// use kvtreap::CollectionOptions;
/// use std::cmp::Ordering;
///
/// fn reversed(left: &[u8], right: &[u8]) -> Ordering {
///     right.cmp(left)
/// }
///
/// let options = CollectionOptions::default()
///     .with_compare(reversed)
///     .with_recycle_capacity(16);
/// assert_eq!(options.recycle_capacity(), 16);
/// assert_eq!((options.compare())(b"a", b"b"), Ordering::Greater);
/// ```
#[derive(Clone, Copy)]
pub struct CollectionOptions {
    compare: KeyCompare,
    recycle_capacity: usize,
}

impl CollectionOptions {
    /// Replaces the key comparator.
    #[must_use]
    pub const fn with_compare(mut self, compare: KeyCompare) -> Self {
        self.compare = compare;
        self
    }

    /// Replaces the number of node shells kept for reuse. Zero disables
    /// recycling.
    #[must_use]
    pub const fn with_recycle_capacity(mut self, recycle_capacity: usize) -> Self {
        self.recycle_capacity = recycle_capacity;
        self
    }

    /// Returns the key comparator.
    #[must_use]
    pub const fn compare(&self) -> KeyCompare {
        self.compare
    }

    /// Returns the number of node shells kept for reuse.
    #[must_use]
    pub const fn recycle_capacity(&self) -> usize {
        self.recycle_capacity
    }
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            compare: bytewise_compare,
            recycle_capacity: DEFAULT_RECYCLE_CAPACITY,
        }
    }
}

impl fmt::Debug for CollectionOptions {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CollectionOptions")
            .field("recycle_capacity", &self.recycle_capacity)
            .finish_non_exhaustive()
    }
}
