//! Treap nodes and node references.
//!
//! A [`Node`] is immutable once published. A [`NodeLoc`] is the cheap,
//! cloneable handle through which algorithms reach a node; several handles,
//! possibly belonging to different tree versions, may denote the same node.

use std::fmt;
use std::sync::Arc;
use std::sync::LazyLock;

use super::Side;
use super::item::Item;
use super::store::NodeStore;
use crate::error::Result;

/// Placeholder item held by node shells waiting in a recycler.
static VACANT_ITEM: LazyLock<Arc<Item>> =
    LazyLock::new(|| Arc::new(Item::with_priority(&[], &[], 0)));

// =============================================================================
// StoredAddress
// =============================================================================

/// Location of a record in a backing store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StoredAddress {
    offset: u64,
    length: u32,
}

impl StoredAddress {
    /// Creates an address from a byte offset and a record length.
    #[inline]
    #[must_use]
    pub const fn new(offset: u64, length: u32) -> Self {
        Self { offset, length }
    }

    /// Returns the byte offset of the record.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the record length in bytes.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }
}

impl fmt::Display for StoredAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "offset {} ({} bytes)", self.offset, self.length)
    }
}

// =============================================================================
// Node
// =============================================================================

/// An immutable treap node.
///
/// `count` and `total_bytes` cover the whole subtree rooted at this node and
/// are computed from the children when the node is built.
#[derive(Clone)]
pub struct Node {
    item: Arc<Item>,
    left: NodeLoc,
    right: NodeLoc,
    count: u64,
    total_bytes: u64,
}

impl Node {
    /// Assembles a node from parts whose aggregates the caller has computed.
    pub(crate) const fn from_parts(
        item: Arc<Item>,
        left: NodeLoc,
        right: NodeLoc,
        count: u64,
        total_bytes: u64,
    ) -> Self {
        Self {
            item,
            left,
            right,
            count,
            total_bytes,
        }
    }

    /// Overwrites a vacant shell. Only called on uniquely owned nodes.
    pub(crate) fn refill(
        &mut self,
        item: Arc<Item>,
        left: NodeLoc,
        right: NodeLoc,
        count: u64,
        total_bytes: u64,
    ) {
        self.item = item;
        self.left = left;
        self.right = right;
        self.count = count;
        self.total_bytes = total_bytes;
    }

    /// Drops everything the node points to. Only called on uniquely owned nodes.
    pub(crate) fn vacate(&mut self) {
        self.item = Arc::clone(&VACANT_ITEM);
        self.left = NodeLoc::Empty;
        self.right = NodeLoc::Empty;
        self.count = 0;
        self.total_bytes = 0;
    }

    /// Returns the item held by this node.
    #[inline]
    #[must_use]
    pub const fn item(&self) -> &Arc<Item> {
        &self.item
    }

    /// Returns the key of the held item.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &[u8] {
        self.item.key()
    }

    /// Returns the priority of the held item.
    #[inline]
    #[must_use]
    pub fn priority(&self) -> u32 {
        self.item.priority()
    }

    /// Returns the subtree holding smaller keys.
    #[inline]
    #[must_use]
    pub const fn left(&self) -> &NodeLoc {
        &self.left
    }

    /// Returns the subtree holding greater keys.
    #[inline]
    #[must_use]
    pub const fn right(&self) -> &NodeLoc {
        &self.right
    }

    /// Returns the child on `side`.
    #[inline]
    #[must_use]
    pub const fn child(&self, side: Side) -> &NodeLoc {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Returns the number of items in this subtree.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Returns the summed [`Item::num_bytes`] of this subtree.
    #[inline]
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Node")
            .field("item", &self.item)
            .field("count", &self.count)
            .field("total_bytes", &self.total_bytes)
            .field("left", &self.left)
            .field("right", &self.right)
            .finish()
    }
}

// =============================================================================
// NodeLoc
// =============================================================================

/// A reference to a treap node, or to nothing.
///
/// Cloning a `NodeLoc` aliases the node; it never copies it.
///
/// # Examples
///
/// ```rust
/// use kvtreap::treap::{MemoryStore, NodeLoc};
///
/// let store = MemoryStore::new();
/// let empty = NodeLoc::Empty;
/// assert!(empty.is_empty());
/// assert!(empty.resolve(&store).unwrap().is_none());
/// ```
#[derive(Clone, Default)]
pub enum NodeLoc {
    /// No node.
    #[default]
    Empty,
    /// A node held in memory.
    Resident(Arc<Node>),
    /// A node that has to be read from the backing store.
    Stored(StoredAddress),
}

impl NodeLoc {
    /// Wraps an in-memory node.
    #[inline]
    #[must_use]
    pub const fn resident(node: Arc<Node>) -> Self {
        Self::Resident(node)
    }

    /// Returns `true` if this reference denotes no node.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the node if it is already in memory.
    #[inline]
    #[must_use]
    pub const fn resident_node(&self) -> Option<&Arc<Node>> {
        match self {
            Self::Resident(node) => Some(node),
            Self::Empty | Self::Stored(_) => None,
        }
    }

    /// Resolves this reference to its node, reading from `store` if needed.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a stored node cannot be read.
    pub fn resolve<S>(&self, store: &S) -> Result<Option<Arc<Node>>>
    where
        S: NodeStore + ?Sized,
    {
        match self {
            Self::Empty => Ok(None),
            Self::Resident(node) => Ok(Some(Arc::clone(node))),
            Self::Stored(address) => store.read_node(*address).map(Some),
        }
    }

    /// Returns `true` if both references denote the same node.
    #[must_use]
    pub fn same_node(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Resident(left), Self::Resident(right)) => Arc::ptr_eq(left, right),
            (Self::Stored(left), Self::Stored(right)) => left == right,
            _ => false,
        }
    }
}

impl fmt::Debug for NodeLoc {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(formatter, "Empty"),
            Self::Resident(node) => write!(
                formatter,
                "Resident({:?}, count={})",
                String::from_utf8_lossy(node.key()),
                node.count()
            ),
            Self::Stored(address) => write!(formatter, "Stored({address})"),
        }
    }
}

static_assertions::assert_impl_all!(Node: Send, Sync);
static_assertions::assert_impl_all!(NodeLoc: Send, Sync);
