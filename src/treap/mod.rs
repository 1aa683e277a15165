//! Persistent treap core.
//!
//! This module provides the algorithms that keep an ordered, persistent
//! key-value container balanced and cheap to version:
//!
//! - [`TreapOps::union`]: structural merge of two treaps, the second one
//!   winning on key collisions
//! - [`TreapOps::split`]: structural partition around a key
//! - [`TreapOps::join`]: structural concatenation of two key-disjoint treaps
//! - [`TreapOps::walk`]: directed single-path descent from a live root
//! - [`TreapOps::visit_nodes`]: pruned in-order scan starting at a key
//!
//! # Structural Sharing
//!
//! A [`Node`] never changes once it is reachable. Every operation builds new
//! nodes only along the paths it touches and aliases everything else, so a
//! mutation allocates O(log N) nodes and every previously published root
//! stays a consistent snapshot.
//!
//! # Reclamation
//!
//! Because nodes are shared between versions, a node can only be recycled
//! once no version reaches it. The algorithms report the input nodes they
//! subsume through [`Reclaimer::mark_reclaimable`] and hand back the
//! intermediate references they no longer need through
//! [`Reclaimer::release`]. They never free anything themselves.
//!
//! # Examples
//!
//! ```rust
//! use kvtreap::treap::{DiscardReclaimer, Item, MemoryStore, TreapOps, bytewise_compare};
//! use std::sync::Arc;
//!
//! let store = MemoryStore::new();
//! let operations = TreapOps::new(&store, &DiscardReclaimer, bytewise_compare);
//!
//! let left = operations.singleton(Arc::new(Item::with_priority(b"a", b"1", 10)));
//! let right = operations.singleton(Arc::new(Item::with_priority(b"b", b"2", 20)));
//! let root = operations.union(&left, &right).unwrap();
//!
//! let split = operations.split(&root, b"a").unwrap();
//! assert!(split.left.is_empty());
//! assert!(!split.middle.is_empty());
//! assert!(!split.right.is_empty());
//! ```

use std::cmp::Ordering;

mod algorithms;
mod item;
mod node;
mod reclaim;
mod root;
mod store;
mod traversal;

pub use algorithms::Split;
pub use algorithms::TreapOps;
pub use item::Item;
pub use item::ItemValue;
pub use node::Node;
pub use node::NodeLoc;
pub use node::StoredAddress;
pub use reclaim::DiscardReclaimer;
pub use reclaim::NodeRecycler;
pub use reclaim::ReclaimLedger;
pub use reclaim::Reclaimer;
pub use reclaim::RecyclerStats;
pub use root::RootAccessor;
pub use root::RootGuard;
pub use store::MemoryStore;
pub use store::NodeStore;
pub use traversal::VisitChoice;

/// Total order over keys, injected by the container.
///
/// The same comparator must be used for the whole lifetime of a treap.
pub type KeyCompare = fn(&[u8], &[u8]) -> Ordering;

/// Orders keys lexicographically by byte value.
///
/// # Examples
///
/// ```rust
/// use kvtreap::treap::bytewise_compare;
/// use std::cmp::Ordering;
///
/// assert_eq!(bytewise_compare(b"a", b"b"), Ordering::Less);
/// assert_eq!(bytewise_compare(b"ab", b"a"), Ordering::Greater);
/// ```
#[inline]
#[must_use]
pub fn bytewise_compare(left: &[u8], right: &[u8]) -> Ordering {
    left.cmp(right)
}

/// Which child of a [`Node`] a descent continues into.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Side {
    /// The subtree holding smaller keys.
    Left,
    /// The subtree holding greater keys.
    Right,
}

impl Side {
    /// Returns the other side.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kvtreap::treap::Side;
    ///
    /// assert_eq!(Side::Left.opposite(), Side::Right);
    /// assert_eq!(Side::Right.opposite(), Side::Left);
    /// ```
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}
