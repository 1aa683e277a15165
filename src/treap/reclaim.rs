//! Reclamation signalling and node recycling.
//!
//! The treap algorithms never free nodes. They report two kinds of events to
//! a [`Reclaimer`]:
//!
//! - `mark_reclaimable(node)`: an input node has been fully replaced by new
//!   output and can be recycled once no other version reaches it.
//! - `release(location)`: an intermediate reference built during the
//!   operation is no longer needed.
//!
//! [`ReclaimLedger`] records these events for one operation, and
//! [`NodeRecycler`] later turns the marked nodes that are really unreachable
//! into reusable node shells.

use std::cell::{Cell, RefCell};
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::item::Item;
use super::node::{Node, NodeLoc};

/// Receives the reclamation signals emitted by the treap algorithms.
///
/// Implementations also provide the node construction primitive, so an
/// allocator that recycles node shells can hand them back out.
pub trait Reclaimer {
    /// Records that `node` has been subsumed by newly built output.
    fn mark_reclaimable(&self, node: &Arc<Node>);

    /// Takes back an intermediate reference that is no longer needed.
    fn release(&self, location: NodeLoc);

    /// Builds a node from parts whose aggregates are already computed.
    fn allocate(
        &self,
        item: Arc<Item>,
        left: NodeLoc,
        right: NodeLoc,
        count: u64,
        total_bytes: u64,
    ) -> Arc<Node> {
        Arc::new(Node::from_parts(item, left, right, count, total_bytes))
    }
}

impl<R: Reclaimer + ?Sized> Reclaimer for &R {
    fn mark_reclaimable(&self, node: &Arc<Node>) {
        (**self).mark_reclaimable(node);
    }

    fn release(&self, location: NodeLoc) {
        (**self).release(location);
    }

    fn allocate(
        &self,
        item: Arc<Item>,
        left: NodeLoc,
        right: NodeLoc,
        count: u64,
        total_bytes: u64,
    ) -> Arc<Node> {
        (**self).allocate(item, left, right, count, total_bytes)
    }
}

/// A reclaimer that ignores every signal.
///
/// Useful for read-only traversals and for callers that let `Arc` drops do
/// all the freeing.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardReclaimer;

impl Reclaimer for DiscardReclaimer {
    fn mark_reclaimable(&self, _node: &Arc<Node>) {}

    fn release(&self, location: NodeLoc) {
        drop(location);
    }
}

// =============================================================================
// ReclaimLedger
// =============================================================================

/// Records the reclamation signals of a single operation.
///
/// Each node is recorded at most once no matter how many times it is marked.
/// A ledger is not shared between threads; the marked nodes are moved out
/// with [`ReclaimLedger::into_marked`] once the operation is over.
///
/// # Examples
///
/// ```rust
/// use kvtreap::treap::{Item, ReclaimLedger, TreapOps, MemoryStore, bytewise_compare};
/// use std::sync::Arc;
///
/// let store = MemoryStore::new();
/// let ledger = ReclaimLedger::new();
/// let operations = TreapOps::new(&store, &ledger, bytewise_compare);
///
/// let root = operations.singleton(Arc::new(Item::with_priority(b"b", b"2", 5)));
/// let split = operations.split(&root, b"a").unwrap();
///
/// // The root was rebuilt as the right part, so the old root is reclaimable.
/// assert_eq!(ledger.marked_count(), 1);
/// assert!(!split.right.same_node(&root));
/// ```
#[derive(Default)]
pub struct ReclaimLedger {
    marked: RefCell<SmallVec<[Arc<Node>; 8]>>,
    identities: RefCell<FxHashSet<usize>>,
    released: Cell<u64>,
    recycler: Option<Arc<NodeRecycler>>,
}

impl ReclaimLedger {
    /// Creates a ledger that allocates fresh nodes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger that allocates from `recycler`.
    #[must_use]
    pub fn with_recycler(recycler: Arc<NodeRecycler>) -> Self {
        Self {
            recycler: Some(recycler),
            ..Self::default()
        }
    }

    /// Returns the number of distinct nodes marked reclaimable.
    #[must_use]
    pub fn marked_count(&self) -> usize {
        self.marked.borrow().len()
    }

    /// Returns the number of intermediate references released.
    #[must_use]
    pub fn released_count(&self) -> u64 {
        self.released.get()
    }

    /// Returns `true` if `node` has been marked reclaimable.
    #[must_use]
    pub fn is_marked(&self, node: &Arc<Node>) -> bool {
        self.identities.borrow().contains(&identity(node))
    }

    /// Returns handles to the marked nodes, in marking order.
    #[must_use]
    pub fn marked_nodes(&self) -> Vec<Arc<Node>> {
        self.marked.borrow().to_vec()
    }

    /// Consumes the ledger and returns the marked nodes.
    #[must_use]
    pub fn into_marked(self) -> Vec<Arc<Node>> {
        self.marked.into_inner().into_vec()
    }
}

impl Reclaimer for ReclaimLedger {
    fn mark_reclaimable(&self, node: &Arc<Node>) {
        if self.identities.borrow_mut().insert(identity(node)) {
            self.marked.borrow_mut().push(Arc::clone(node));
        }
    }

    fn release(&self, location: NodeLoc) {
        self.released.set(self.released.get() + 1);
        drop(location);
    }

    fn allocate(
        &self,
        item: Arc<Item>,
        left: NodeLoc,
        right: NodeLoc,
        count: u64,
        total_bytes: u64,
    ) -> Arc<Node> {
        match &self.recycler {
            Some(recycler) => recycler.allocate(item, left, right, count, total_bytes),
            None => Arc::new(Node::from_parts(item, left, right, count, total_bytes)),
        }
    }
}

fn identity(node: &Arc<Node>) -> usize {
    Arc::as_ptr(node).addr()
}

// =============================================================================
// NodeRecycler
// =============================================================================

/// Counters describing a [`NodeRecycler`]'s activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecyclerStats {
    /// Marked nodes that turned out to be unreachable and were vacated.
    pub recycled: u64,
    /// Marked nodes still shared with a live version when offered.
    pub still_shared: u64,
    /// Allocations served from a recycled shell.
    pub reused: u64,
    /// Shells currently waiting for reuse.
    pub pooled: usize,
}

/// A bounded free list of node shells.
///
/// [`NodeRecycler::reclaim`] receives nodes that were marked reclaimable. A
/// node is only recycled when the offered handle is the last one in
/// existence, so a node that another snapshot still reaches is never reused
/// no matter what it was marked as.
pub struct NodeRecycler {
    capacity: usize,
    shells: Mutex<Vec<Arc<Node>>>,
    recycled: AtomicU64,
    still_shared: AtomicU64,
    reused: AtomicU64,
}

impl NodeRecycler {
    /// Creates a recycler that pools at most `capacity` shells.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            shells: Mutex::new(Vec::new()),
            recycled: AtomicU64::new(0),
            still_shared: AtomicU64::new(0),
            reused: AtomicU64::new(0),
        }
    }

    /// Returns the maximum number of pooled shells.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of pooled shells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shells.lock().len()
    }

    /// Returns `true` if no shell is pooled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shells.lock().is_empty()
    }

    /// Returns the activity counters.
    #[must_use]
    pub fn stats(&self) -> RecyclerStats {
        RecyclerStats {
            recycled: self.recycled.load(Ordering::Relaxed),
            still_shared: self.still_shared.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            pooled: self.len(),
        }
    }

    /// Recycles the offered nodes that nothing else references.
    ///
    /// Vacating a node drops its child handles, which can make other offered
    /// nodes unique, so candidates are revisited until no more progress is
    /// made. Returns the number of nodes recycled.
    pub fn reclaim<I>(&self, candidates: I) -> usize
    where
        I: IntoIterator<Item = Arc<Node>>,
    {
        let mut pending: Vec<Arc<Node>> = candidates.into_iter().collect();
        let offered = pending.len();
        let mut vacated = Vec::new();

        loop {
            let before = pending.len();
            pending.retain_mut(|candidate| match Arc::get_mut(candidate) {
                Some(node) => {
                    trace!("recycling node for {:?}", String::from_utf8_lossy(node.key()));
                    node.vacate();
                    vacated.push(Arc::clone(candidate));
                    false
                }
                None => true,
            });
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        let recycled = vacated.len();
        let shared = pending.len();
        drop(pending);

        {
            let mut shells = self.shells.lock();
            let room = self.capacity.saturating_sub(shells.len());
            shells.extend(vacated.into_iter().take(room));
        }

        self.recycled.fetch_add(recycled as u64, Ordering::Relaxed);
        self.still_shared.fetch_add(shared as u64, Ordering::Relaxed);
        debug!("recycled {recycled} of {offered} reclaimable nodes, {shared} still shared");
        recycled
    }

    /// Builds a node, reusing a pooled shell when one is available.
    pub fn allocate(
        &self,
        item: Arc<Item>,
        left: NodeLoc,
        right: NodeLoc,
        count: u64,
        total_bytes: u64,
    ) -> Arc<Node> {
        let shell = self.shells.lock().pop();
        if let Some(mut shell) = shell
            && let Some(node) = Arc::get_mut(&mut shell)
        {
            node.refill(item, left, right, count, total_bytes);
            self.reused.fetch_add(1, Ordering::Relaxed);
            return shell;
        }
        Arc::new(Node::from_parts(item, left, right, count, total_bytes))
    }
}

impl Default for NodeRecycler {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl std::fmt::Debug for NodeRecycler {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("NodeRecycler")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

static_assertions::assert_impl_all!(NodeRecycler: Send, Sync);

// =============================================================================
// Scope guards used by the algorithms
// =============================================================================

/// An intermediate reference that is released when dropped.
pub(crate) struct IntermediateLoc<'r, R: Reclaimer + ?Sized> {
    reclaimer: &'r R,
    location: Option<NodeLoc>,
}

impl<'r, R: Reclaimer + ?Sized> IntermediateLoc<'r, R> {
    pub(crate) const fn new(reclaimer: &'r R, location: NodeLoc) -> Self {
        Self {
            reclaimer,
            location: Some(location),
        }
    }
}

impl<R: Reclaimer + ?Sized> Deref for IntermediateLoc<'_, R> {
    type Target = NodeLoc;

    fn deref(&self) -> &NodeLoc {
        const EMPTY: &NodeLoc = &NodeLoc::Empty;
        self.location.as_ref().unwrap_or(EMPTY)
    }
}

impl<R: Reclaimer + ?Sized> Drop for IntermediateLoc<'_, R> {
    fn drop(&mut self) {
        if let Some(location) = self.location.take() {
            self.reclaimer.release(location);
        }
    }
}

/// An input node that is marked reclaimable when dropped.
pub(crate) struct SubsumedNode<'r, R: Reclaimer + ?Sized> {
    reclaimer: &'r R,
    node: Arc<Node>,
}

impl<'r, R: Reclaimer + ?Sized> SubsumedNode<'r, R> {
    pub(crate) fn new(reclaimer: &'r R, node: &Arc<Node>) -> Self {
        Self {
            reclaimer,
            node: Arc::clone(node),
        }
    }
}

impl<R: Reclaimer + ?Sized> Drop for SubsumedNode<'_, R> {
    fn drop(&mut self) {
        self.reclaimer.mark_reclaimable(&self.node);
    }
}
