//! Read operations shared by collections and snapshots.

use std::sync::Arc;

use crate::error::Result;
use crate::treap::{
    DiscardReclaimer, Item, KeyCompare, NodeStore, RootAccessor, RootGuard, Side, TreapOps,
    VisitChoice,
};

/// Point lookups, extremes, ordered scans and totals over a pinned root.
///
/// Every method pins the implementor's root for its own duration only; use a
/// [`Snapshot`](super::Snapshot) to run several reads against one version.
pub trait ReadItems: RootAccessor {
    /// The store stored references resolve through.
    type Store: NodeStore + ?Sized;

    /// Returns the backing store.
    fn store(&self) -> &Self::Store;

    /// Returns the key comparator.
    fn compare(&self) -> KeyCompare;

    /// Looks up the item stored under `key`.
    ///
    /// With `with_value`, a value left in the store is loaded.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`](crate::TreapError) if a node or the value
    /// cannot be resolved.
    fn get(&self, key: &[u8], with_value: bool) -> Result<Option<Arc<Item>>> {
        let guard = RootGuard::acquire(self);
        let operations = TreapOps::new(self.store(), &DiscardReclaimer, self.compare());
        operations
            .find(guard.root(), key)?
            .map(|node| Item::resolve(node.item(), self.store(), with_value))
            .transpose()
    }

    /// Returns the item with the smallest key.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`](crate::TreapError) if a node on the leftmost
    /// path or the value cannot be resolved.
    fn min_item(&self, with_value: bool) -> Result<Option<Arc<Item>>> {
        TreapOps::new(self.store(), &DiscardReclaimer, self.compare()).walk(
            self,
            with_value,
            |_| Some(Side::Left),
        )
    }

    /// Returns the item with the greatest key.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`](crate::TreapError) if a node on the rightmost
    /// path or the value cannot be resolved.
    fn max_item(&self, with_value: bool) -> Result<Option<Arc<Item>>> {
        TreapOps::new(self.store(), &DiscardReclaimer, self.compare()).walk(
            self,
            with_value,
            |_| Some(Side::Right),
        )
    }

    /// Visits the items with keys `>= target` in ascending order until
    /// `visitor` returns `false`.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`](crate::TreapError) if a visited node or value
    /// cannot be resolved.
    fn visit_items_ascend<V>(&self, target: &[u8], with_value: bool, mut visitor: V) -> Result<()>
    where
        V: FnMut(&Arc<Item>) -> bool,
    {
        let guard = RootGuard::acquire(self);
        let operations = TreapOps::new(self.store(), &DiscardReclaimer, self.compare());
        let mut deliver = |item: &Arc<Item>, _depth: u64| visitor(item);
        operations.visit_nodes(
            guard.root(),
            target,
            with_value,
            &mut deliver,
            0,
            &VisitChoice::ascending,
        )?;
        Ok(())
    }

    /// Visits the items with keys `< target` in descending order until
    /// `visitor` returns `false`.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`](crate::TreapError) if a visited node or value
    /// cannot be resolved.
    fn visit_items_descend<V>(&self, target: &[u8], with_value: bool, mut visitor: V) -> Result<()>
    where
        V: FnMut(&Arc<Item>) -> bool,
    {
        let guard = RootGuard::acquire(self);
        let operations = TreapOps::new(self.store(), &DiscardReclaimer, self.compare());
        let mut deliver = |item: &Arc<Item>, _depth: u64| visitor(item);
        operations.visit_nodes(
            guard.root(),
            target,
            with_value,
            &mut deliver,
            0,
            &VisitChoice::descending,
        )?;
        Ok(())
    }

    /// Returns the number of items and their summed byte sizes.
    ///
    /// # Errors
    ///
    /// Returns a [`TreapError`](crate::TreapError) if the root cannot be
    /// resolved.
    fn totals(&self) -> Result<(u64, u64)> {
        let guard = RootGuard::acquire(self);
        TreapOps::new(self.store(), &DiscardReclaimer, self.compare()).aggregates(guard.root())
    }
}
