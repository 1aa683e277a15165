//! Read-only traversals: directed descent and pruned in-order scans.

use std::cmp::Ordering;
use std::sync::Arc;

use super::Side;
use super::algorithms::TreapOps;
use super::item::Item;
use super::node::{Node, NodeLoc};
use super::reclaim::Reclaimer;
use super::root::{RootAccessor, RootGuard};
use super::store::NodeStore;
use crate::error::Result;

/// What [`TreapOps::visit_nodes`] does at one node.
///
/// When `visit_first` is `false` the subtree on the `first` side and the node
/// itself are skipped. The side opposite to `first` is always descended
/// into; its own choices decide how much of it is visited.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VisitChoice {
    /// Whether to visit the `first` subtree and then the node itself.
    pub visit_first: bool,
    /// The side visited before the node.
    pub first: Side,
}

impl VisitChoice {
    /// Ascending order over keys greater than or equal to the target.
    ///
    /// `ordering` compares the target with the node's key.
    #[must_use]
    pub fn ascending(ordering: Ordering, _node: &Node) -> Self {
        Self {
            visit_first: ordering != Ordering::Greater,
            first: Side::Left,
        }
    }

    /// Ascending order over keys strictly greater than the target.
    #[must_use]
    pub fn ascending_exclusive(ordering: Ordering, _node: &Node) -> Self {
        Self {
            visit_first: ordering == Ordering::Less,
            first: Side::Left,
        }
    }

    /// Descending order over keys strictly less than the target.
    #[must_use]
    pub fn descending(ordering: Ordering, _node: &Node) -> Self {
        Self {
            visit_first: ordering == Ordering::Greater,
            first: Side::Right,
        }
    }

    /// Descending order over keys less than or equal to the target.
    #[must_use]
    pub fn descending_inclusive(ordering: Ordering, _node: &Node) -> Self {
        Self {
            visit_first: ordering != Ordering::Less,
            first: Side::Right,
        }
    }
}

impl<S: NodeStore + ?Sized, R: Reclaimer + ?Sized> TreapOps<'_, S, R> {
    /// Descends from the accessor's live root along the sides `choose` picks.
    ///
    /// The root reference is held for the whole descent and given back on
    /// every exit path. `choose` returning `None` stops the descent without a
    /// result. When the chosen child is empty, the current node's item is
    /// returned, with its value loaded if `with_value` is set.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a node or the returned value cannot be
    /// resolved.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kvtreap::treap::{DiscardReclaimer, Item, MemoryStore, Side, TreapOps, bytewise_compare};
    /// use std::sync::Arc;
    ///
    /// let store = MemoryStore::new();
    /// let operations = TreapOps::new(&store, &DiscardReclaimer, bytewise_compare);
    /// let root = ["b", "a", "c"].iter().fold(kvtreap::treap::NodeLoc::Empty, |root, key| {
    ///     let single = operations.singleton(Arc::new(Item::new(key.as_bytes(), b"")));
    ///     operations.union(&root, &single).unwrap()
    /// });
    ///
    /// let smallest = operations.walk(&root, false, |_| Some(Side::Left)).unwrap();
    /// assert_eq!(smallest.unwrap().key(), b"a");
    /// ```
    pub fn walk<A, F>(&self, accessor: &A, with_value: bool, mut choose: F) -> Result<Option<Arc<Item>>>
    where
        A: RootAccessor + ?Sized,
        F: FnMut(&Node) -> Option<Side>,
    {
        let guard = RootGuard::acquire(accessor);
        let Some(mut node) = guard.root().resolve(self.store)? else {
            return Ok(None);
        };

        loop {
            let Some(side) = choose(&node) else {
                return Ok(None);
            };
            let child = node.child(side).resolve(self.store)?;
            match child {
                Some(child) => node = child,
                None => return Item::resolve(node.item(), self.store, with_value).map(Some),
            }
        }
    }

    /// Finds the node holding `key`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a node on the search path cannot be
    /// resolved.
    pub fn find(&self, root: &NodeLoc, key: &[u8]) -> Result<Option<Arc<Node>>> {
        let mut current = root.resolve(self.store)?;
        while let Some(node) = current {
            current = match (self.compare)(key, node.key()) {
                Ordering::Equal => return Ok(Some(node)),
                Ordering::Less => node.left().resolve(self.store)?,
                Ordering::Greater => node.right().resolve(self.store)?,
            };
        }
        Ok(None)
    }

    /// Visits items in order, skipping subtrees `choose` rules out.
    ///
    /// At every node `choose` receives the comparison of `target` with the
    /// node's key. The visitor receives each visited item and its depth
    /// (the root is at `depth`) and returns `false` to stop the scan.
    ///
    /// Returns `Ok(false)` if the visitor stopped the scan.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a visited node or value cannot be
    /// resolved. Nothing is visited after an error.
    ///
    /// # Complexity
    ///
    /// O(log n + k) for k visited items with the stock [`VisitChoice`]
    /// functions.
    pub fn visit_nodes<V, C>(
        &self,
        root: &NodeLoc,
        target: &[u8],
        with_value: bool,
        visitor: &mut V,
        depth: u64,
        choose: &C,
    ) -> Result<bool>
    where
        V: FnMut(&Arc<Item>, u64) -> bool,
        C: Fn(Ordering, &Node) -> VisitChoice,
    {
        let Some(node) = root.resolve(self.store)? else {
            return Ok(true);
        };
        let choice = choose((self.compare)(target, node.key()), &node);

        if choice.visit_first {
            let first = node.child(choice.first);
            if !self.visit_nodes(first, target, with_value, visitor, depth + 1, choose)? {
                return Ok(false);
            }
            let item = Item::resolve(node.item(), self.store, with_value)?;
            if !visitor(&item, depth) {
                return Ok(false);
            }
        }

        let second = node.child(choice.first.opposite());
        self.visit_nodes(second, target, with_value, visitor, depth + 1, choose)
    }
}
