//! Read-only views pinned to one root generation.

use std::fmt;
use std::sync::Arc;

use super::generation::{RootGeneration, RootRef};
use super::read::ReadItems;
use crate::treap::{KeyCompare, MemoryStore, NodeStore, RootAccessor};

/// A read-only view of a [`Collection`](super::Collection) as it was when the
/// snapshot was taken.
///
/// Writes to the collection after that point are not visible. The nodes of
/// the pinned version stay alive, and out of the recycler, until the
/// snapshot drops.
///
/// # Examples
///
/// ```rust
/// use kvtreap::{Collection, ReadItems};
///
/// let collection = Collection::new();
/// collection.set(b"a", b"1").unwrap();
/// let snapshot = collection.snapshot();
/// collection.set(b"a", b"2").unwrap();
///
/// let old = snapshot.get(b"a", true).unwrap().unwrap();
/// assert_eq!(old.value(), Some(b"1".as_slice()));
/// ```
pub struct Snapshot<S: NodeStore = MemoryStore> {
    generation: Arc<RootGeneration>,
    store: Arc<S>,
    compare: KeyCompare,
}

impl<S: NodeStore> Snapshot<S> {
    pub(crate) const fn new(
        generation: Arc<RootGeneration>,
        store: Arc<S>,
        compare: KeyCompare,
    ) -> Self {
        Self {
            generation,
            store,
            compare,
        }
    }

    /// Returns the sequence number of the pinned generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.sequence()
    }
}

impl<S: NodeStore> Clone for Snapshot<S> {
    fn clone(&self) -> Self {
        Self {
            generation: Arc::clone(&self.generation),
            store: Arc::clone(&self.store),
            compare: self.compare,
        }
    }
}

impl<S: NodeStore> RootAccessor for Snapshot<S> {
    type Root = RootRef;

    fn add_root_ref(&self) -> RootRef {
        RootRef(Arc::clone(&self.generation))
    }

    fn release_root_ref(&self, root: RootRef) {
        drop(root);
    }
}

impl<S: NodeStore> ReadItems for Snapshot<S> {
    type Store = S;

    fn store(&self) -> &S {
        &self.store
    }

    fn compare(&self) -> KeyCompare {
        self.compare
    }
}

impl<S: NodeStore> fmt::Debug for Snapshot<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Snapshot")
            .field("generation", &self.generation.sequence())
            .field("root", self.generation.root())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Snapshot<MemoryStore>: Send, Sync);
