//! An ordered, versioned key-value collection built on the treap core.
//!
//! A [`Collection`] owns a backing store and a sequence of published root
//! generations:
//!
//! - Writers are serialized. Each write runs one treap algorithm against the
//!   current root with a fresh [`ReclaimLedger`] and publishes the result as
//!   the next generation.
//! - Readers pin the current generation for the length of a read, or for as
//!   long as they hold a [`Snapshot`].
//! - The nodes a write subsumed are recycled once every reader of the
//!   generation they belonged to is gone.
//!
//! # Examples
//!
//! ```rust
//! use kvtreap::{Collection, ReadItems};
//!
//! let collection = Collection::new();
//! collection.set(b"banana", b"yellow").unwrap();
//! collection.set(b"apple", b"red").unwrap();
//! collection.set(b"cherry", b"dark red").unwrap();
//!
//! let mut keys = Vec::new();
//! collection
//!     .visit_items_ascend(b"b", false, |item| {
//!         keys.push(item.key().to_vec());
//!         true
//!     })
//!     .unwrap();
//! assert_eq!(keys, vec![b"banana".to_vec(), b"cherry".to_vec()]);
//!
//! assert!(collection.delete(b"banana").unwrap());
//! assert_eq!(collection.totals().unwrap().0, 2);
//! ```

mod generation;
mod options;
mod read;
mod snapshot;

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::treap::{
    Item, KeyCompare, MemoryStore, NodeLoc, NodeRecycler, NodeStore, ReclaimLedger, Reclaimer,
    RecyclerStats, RootAccessor, RootGuard, Split, TreapOps,
};

use generation::RootGeneration;
pub use generation::RootRef;
pub use options::{CollectionOptions, DEFAULT_RECYCLE_CAPACITY};
pub use read::ReadItems;
pub use snapshot::Snapshot;

/// A concurrent ordered key-value collection with cheap snapshots.
///
/// Reads never block writes for longer than it takes to clone an `Arc`, and
/// a write never changes what an earlier reader or snapshot sees.
pub struct Collection<S: NodeStore = MemoryStore> {
    store: Arc<S>,
    options: CollectionOptions,
    recycler: Arc<NodeRecycler>,
    current: RwLock<Arc<RootGeneration>>,
    writer: Mutex<()>,
}

impl Collection<MemoryStore> {
    /// Creates an empty collection over a fresh in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(CollectionOptions::default())
    }

    /// Creates an empty collection over a fresh in-memory store.
    #[must_use]
    pub fn with_options(options: CollectionOptions) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), options)
    }
}

impl Default for Collection<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: NodeStore> Collection<S> {
    /// Creates an empty collection over `store`.
    #[must_use]
    pub fn with_store(store: Arc<S>, options: CollectionOptions) -> Self {
        let recycler = Arc::new(NodeRecycler::new(options.recycle_capacity()));
        let initial = RootGeneration::new(0, NodeLoc::Empty, Arc::clone(&recycler));
        Self {
            store,
            options,
            recycler,
            current: RwLock::new(Arc::new(initial)),
            writer: Mutex::new(()),
        }
    }

    /// Creates a collection whose initial root is `root`.
    ///
    /// Stored references inside `root` must resolve through `store`.
    #[must_use]
    pub fn from_root(store: Arc<S>, options: CollectionOptions, root: NodeLoc) -> Self {
        let collection = Self::with_store(store, options);
        *collection.current.write() = Arc::new(RootGeneration::new(
            0,
            root,
            Arc::clone(&collection.recycler),
        ));
        collection
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn backing_store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the options the collection was created with.
    #[must_use]
    pub const fn options(&self) -> &CollectionOptions {
        &self.options
    }

    /// Returns the sequence number of the current generation.
    ///
    /// It grows by one with every write that changed the collection.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.current.read().sequence()
    }

    /// Returns the recycler's activity counters.
    #[must_use]
    pub fn recycler_stats(&self) -> RecyclerStats {
        self.recycler.stats()
    }

    /// Returns a clone of the current root reference.
    #[must_use]
    pub fn root(&self) -> NodeLoc {
        self.current.read().root().clone()
    }

    /// Stores `value` under `key` with a random priority, replacing any
    /// previous item for `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`](crate::TreapError) if a node on the update
    /// path cannot be resolved. The collection is left unchanged.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.set_item(Item::new(key, value))
    }

    /// Stores `item`, replacing any previous item with the same key.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`](crate::TreapError) if a node on the update
    /// path cannot be resolved. The collection is left unchanged.
    pub fn set_item(&self, item: Item) -> Result<()> {
        let item = Arc::new(item);
        self.mutate("set", |operations, root| {
            let single = operations.singleton(Arc::clone(&item));
            operations.union(root, &single).map(Some)
        })
        .map(drop)
    }

    /// Removes the item stored under `key`. Returns `true` if there was one.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`](crate::TreapError) if a node on the search
    /// path cannot be resolved. The collection is left unchanged.
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        self.mutate("delete", |operations, root| {
            let Some(removed) = operations.find(root, key)? else {
                return Ok(None);
            };
            let Split {
                left,
                middle,
                right,
            } = operations.split(root, key)?;
            let joined = operations.join(&left, &right)?;
            let reclaimer = operations.reclaimer();
            reclaimer.mark_reclaimable(&removed);
            reclaimer.release(left);
            reclaimer.release(middle);
            reclaimer.release(right);
            Ok(Some(joined))
        })
    }

    /// Merges every item of `other` into this collection. On a key present
    /// in both, the item of `other` wins.
    ///
    /// Stored references of `other` must resolve through this collection's
    /// store.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`](crate::TreapError) if a node of either
    /// collection cannot be resolved. This collection is left unchanged.
    pub fn merge_from(&self, other: &Self) -> Result<()> {
        let incoming = RootGuard::acquire(other);
        self.mutate("merge", |operations, root| {
            operations.union(root, incoming.root()).map(Some)
        })
        .map(drop)
    }

    /// Pins the current generation as a read-only [`Snapshot`].
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<S> {
        Snapshot::new(
            Arc::clone(&self.current.read()),
            Arc::clone(&self.store),
            self.options.compare(),
        )
    }

    /// Runs one write against the current root and publishes its result.
    ///
    /// `mutation` returns `None` when it has nothing to change. Returns
    /// whether a new generation was published.
    fn mutate<F>(&self, operation: &str, mutation: F) -> Result<bool>
    where
        F: FnOnce(&TreapOps<'_, S, ReclaimLedger>, &NodeLoc) -> Result<Option<NodeLoc>>,
    {
        let _writer = self.writer.lock();
        let current = Arc::clone(&self.current.read());
        let ledger = ReclaimLedger::with_recycler(Arc::clone(&self.recycler));

        let outcome = {
            let operations = TreapOps::new(self.store.as_ref(), &ledger, self.options.compare());
            mutation(&operations, current.root())
        };
        let next_root = match outcome {
            Ok(Some(root)) => root,
            Ok(None) => return Ok(false),
            Err(error) => {
                warn!("{operation} aborted, generation {} kept: {error}", current.sequence());
                return Err(error);
            }
        };

        let sequence = current.sequence() + 1;
        let marked = ledger.into_marked();
        debug!(
            "{operation} publishes generation {sequence}, {} nodes reclaimable",
            marked.len()
        );
        current.retire(marked);

        let next = Arc::new(RootGeneration::new(
            sequence,
            next_root,
            Arc::clone(&self.recycler),
        ));
        let previous = std::mem::replace(&mut *self.current.write(), next);
        drop(previous);
        drop(current);
        Ok(true)
    }
}

impl<S: NodeStore> RootAccessor for Collection<S> {
    type Root = RootRef;

    fn add_root_ref(&self) -> RootRef {
        RootRef(Arc::clone(&self.current.read()))
    }

    fn release_root_ref(&self, root: RootRef) {
        drop(root);
    }
}

impl<S: NodeStore> ReadItems for Collection<S> {
    type Store = S;

    fn store(&self) -> &S {
        &self.store
    }

    fn compare(&self) -> KeyCompare {
        self.options.compare()
    }
}

impl<S: NodeStore> fmt::Debug for Collection<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Collection")
            .field("generation", &self.generation())
            .field("options", &self.options)
            .field("recycler", &self.recycler)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Collection<MemoryStore>: Send, Sync);
