//! Backing stores that resolve stored node and value references.

use std::num::TryFromIntError;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::node::{Node, NodeLoc, StoredAddress};
use crate::error::{Result, TreapError};

/// Nominal length of one persisted node record.
const NODE_RECORD_LENGTH: u32 = 48;

/// Resolves stored references into in-memory nodes and values.
///
/// Reads may block or fail; every failure aborts the treap operation that
/// triggered it. Retry policy, if any, belongs to the implementation.
pub trait NodeStore {
    /// Reads the node stored at `address`.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`] if no usable node can be read.
    fn read_node(&self, address: StoredAddress) -> Result<Arc<Node>>;

    /// Reads the value bytes stored at `address`.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`] if the value cannot be read.
    fn read_value(&self, address: StoredAddress) -> Result<Arc<[u8]>>;
}

impl<S: NodeStore + ?Sized> NodeStore for Arc<S> {
    fn read_node(&self, address: StoredAddress) -> Result<Arc<Node>> {
        (**self).read_node(address)
    }

    fn read_value(&self, address: StoredAddress) -> Result<Arc<[u8]>> {
        (**self).read_value(address)
    }
}

#[derive(Default)]
struct MemoryRecords {
    nodes: FxHashMap<u64, Arc<Node>>,
    values: FxHashMap<u64, Arc<[u8]>>,
    next_offset: u64,
}

impl MemoryRecords {
    fn reserve(&mut self, length: u32) -> StoredAddress {
        let address = StoredAddress::new(self.next_offset, length);
        self.next_offset += u64::from(length.max(1));
        address
    }
}

fn record_length(length: usize) -> std::result::Result<u32, TryFromIntError> {
    u32::try_from(length)
}

/// An in-memory backing store.
///
/// Nodes and values written with [`MemoryStore::persist_tree`] and
/// [`MemoryStore::persist_value`] get addresses and are afterwards reachable
/// only by resolution, the way records of an on-disk store would be.
/// [`MemoryStore::evict`] drops a record so that resolving it fails.
///
/// # Examples
///
/// ```rust
/// use kvtreap::treap::{DiscardReclaimer, Item, MemoryStore, NodeLoc, TreapOps, bytewise_compare};
/// use std::sync::Arc;
///
/// let store = MemoryStore::new();
/// let operations = TreapOps::new(&store, &DiscardReclaimer, bytewise_compare);
/// let resident = operations.singleton(Arc::new(Item::with_priority(b"k", b"v", 1)));
///
/// let stored = store.persist_tree(&resident);
/// assert!(matches!(stored, NodeLoc::Stored(_)));
/// assert_eq!(stored.resolve(&store).unwrap().unwrap().key(), b"k");
/// ```
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<MemoryRecords>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of node records held.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.records.read().nodes.len()
    }

    /// Stores value bytes and returns their address.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is longer than a [`StoredAddress`] can
    /// record (`u32::MAX` bytes). Nothing is stored in that case.
    pub fn persist_value(&self, bytes: &[u8]) -> std::result::Result<StoredAddress, TryFromIntError> {
        let length = record_length(bytes.len())?;
        let mut records = self.records.write();
        let address = records.reserve(length);
        records.values.insert(address.offset(), Arc::from(bytes));
        Ok(address)
    }

    /// Persists every resident node reachable from `root`, children first.
    ///
    /// The returned reference and every child reference inside the persisted
    /// records are [`NodeLoc::Stored`]. Subtrees that are already stored are
    /// referenced as they are. Items are shared, not copied.
    pub fn persist_tree(&self, root: &NodeLoc) -> NodeLoc {
        match root {
            NodeLoc::Empty => NodeLoc::Empty,
            NodeLoc::Stored(address) => NodeLoc::Stored(*address),
            NodeLoc::Resident(node) => {
                let left = self.persist_tree(node.left());
                let right = self.persist_tree(node.right());
                let persisted = Arc::new(Node::from_parts(
                    Arc::clone(node.item()),
                    left,
                    right,
                    node.count(),
                    node.total_bytes(),
                ));
                let mut records = self.records.write();
                let address = records.reserve(NODE_RECORD_LENGTH);
                records.nodes.insert(address.offset(), persisted);
                NodeLoc::Stored(address)
            }
        }
    }

    /// Drops the record at `address`. Returns `true` if a record was dropped.
    pub fn evict(&self, address: StoredAddress) -> bool {
        let mut records = self.records.write();
        records.nodes.remove(&address.offset()).is_some()
            || records.values.remove(&address.offset()).is_some()
    }
}

impl NodeStore for MemoryStore {
    fn read_node(&self, address: StoredAddress) -> Result<Arc<Node>> {
        self.records
            .read()
            .nodes
            .get(&address.offset())
            .cloned()
            .ok_or(TreapError::NodeUnavailable { address })
    }

    fn read_value(&self, address: StoredAddress) -> Result<Arc<[u8]>> {
        self.records
            .read()
            .values
            .get(&address.offset())
            .cloned()
            .ok_or(TreapError::ValueUnavailable { address })
    }
}

static_assertions::assert_impl_all!(MemoryStore: Send, Sync);
