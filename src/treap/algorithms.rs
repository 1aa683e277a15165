//! Structural merge, partition and concatenation.
//!
//! All three algorithms are recursive and non-destructive: they resolve
//! their inputs, build new nodes only along the paths they descend, and alias
//! every untouched subtree.

use std::cmp::Ordering;
use std::sync::Arc;

use super::KeyCompare;
use super::item::Item;
use super::node::{Node, NodeLoc};
use super::reclaim::{IntermediateLoc, Reclaimer, SubsumedNode};
use super::store::NodeStore;
use crate::error::Result;

/// The three parts produced by [`TreapOps::split`].
#[derive(Clone, Debug, Default)]
pub struct Split {
    /// Every key ordered before the split key.
    pub left: NodeLoc,
    /// The untouched node holding the split key, or empty if absent.
    pub middle: NodeLoc,
    /// Every key ordered after the split key.
    pub right: NodeLoc,
}

/// The treap algorithms, bound to a store, a reclaimer and a comparator.
///
/// `TreapOps` is a cheap bundle of borrowed collaborators; build one per
/// operation or keep one around for many.
///
/// # Examples
///
/// ```rust
/// use kvtreap::treap::{DiscardReclaimer, Item, MemoryStore, TreapOps, bytewise_compare};
/// use std::sync::Arc;
///
/// let store = MemoryStore::new();
/// let operations = TreapOps::new(&store, &DiscardReclaimer, bytewise_compare);
///
/// let first = operations.singleton(Arc::new(Item::with_priority(b"a", b"old", 1)));
/// let second = operations.singleton(Arc::new(Item::with_priority(b"a", b"new", 2)));
/// let merged = operations.union(&first, &second).unwrap();
///
/// let found = operations.find(&merged, b"a").unwrap().unwrap();
/// assert_eq!(found.item().value(), Some(b"new".as_slice()));
/// ```
pub struct TreapOps<'a, S: NodeStore + ?Sized, R: Reclaimer + ?Sized> {
    pub(super) store: &'a S,
    pub(super) reclaimer: &'a R,
    pub(super) compare: KeyCompare,
}

impl<'a, S: NodeStore + ?Sized, R: Reclaimer + ?Sized> TreapOps<'a, S, R> {
    /// Bundles the collaborators of the treap algorithms.
    #[must_use]
    pub const fn new(store: &'a S, reclaimer: &'a R, compare: KeyCompare) -> Self {
        Self {
            store,
            reclaimer,
            compare,
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &'a S {
        self.store
    }

    /// Returns the reclaimer receiving this bundle's signals.
    #[must_use]
    pub const fn reclaimer(&self) -> &'a R {
        self.reclaimer
    }

    /// Returns the key comparator.
    #[must_use]
    pub const fn compare(&self) -> KeyCompare {
        self.compare
    }

    /// Builds a one-node treap holding `item`.
    pub fn singleton(&self, item: Arc<Item>) -> NodeLoc {
        let total_bytes = item.num_bytes();
        NodeLoc::resident(
            self.reclaimer
                .allocate(item, NodeLoc::Empty, NodeLoc::Empty, 1, total_bytes),
        )
    }

    /// Returns `(count, total_bytes)` of the subtree at `location`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the subtree root cannot be resolved.
    pub fn aggregates(&self, location: &NodeLoc) -> Result<(u64, u64)> {
        Ok(location
            .resolve(self.store)?
            .map_or((0, 0), |node| (node.count(), node.total_bytes())))
    }

    // =========================================================================
    // union
    // =========================================================================

    /// Merges two treaps. On a key present in both, the item of `that` wins.
    ///
    /// Both sides are resolved first. If either is empty the other is
    /// returned aliased, without building anything. Otherwise the root with the strictly higher
    /// priority keeps the root position; equal priorities go to `that`.
    ///
    /// When `this` keeps the root position but `that` also holds its key,
    /// the two halves below the root are joined and the item from `that` is
    /// merged back in with its own priority. Winning items are never copied.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error met; nothing built so far is
    /// reachable from the inputs.
    ///
    /// # Complexity
    ///
    /// Expected O(m log(n / m)) for treaps of sizes m <= n.
    pub fn union(&self, this: &NodeLoc, that: &NodeLoc) -> Result<NodeLoc> {
        let (this_node, that_node) = match (this.resolve(self.store)?, that.resolve(self.store)?) {
            (None, _) => return Ok(that.clone()),
            (_, None) => return Ok(this.clone()),
            (Some(this_node), Some(that_node)) => (this_node, that_node),
        };

        if this_node.priority() > that_node.priority() {
            let _this_subsumed = self.subsumed(&this_node);
            let Split {
                left,
                middle,
                right,
            } = self.split(that, this_node.key())?;
            let left = self.intermediate(left);
            let middle = self.intermediate(middle);
            let right = self.intermediate(right);
            let middle_node = middle.resolve(self.store)?;
            let _middle_subsumed = middle_node.as_ref().map(|node| self.subsumed(node));

            let new_left = self.intermediate(self.union(this_node.left(), &left)?);
            let new_right = self.intermediate(self.union(this_node.right(), &right)?);
            match middle_node {
                None => self.make_node(Arc::clone(this_node.item()), &new_left, &new_right),
                Some(promoted) => {
                    // The root item is replaced; the winner is placed by its own priority.
                    let rest = self.intermediate(self.join(&new_left, &new_right)?);
                    let single = self.intermediate(self.singleton(Arc::clone(promoted.item())));
                    self.union(&rest, &single)
                }
            }
        } else {
            let _that_subsumed = self.subsumed(&that_node);
            let Split {
                left,
                middle,
                right,
            } = self.split(this, that_node.key())?;
            let left = self.intermediate(left);
            let middle = self.intermediate(middle);
            let right = self.intermediate(right);
            let middle_node = middle.resolve(self.store)?;
            let _middle_subsumed = middle_node.as_ref().map(|node| self.subsumed(node));

            let new_left = self.intermediate(self.union(&left, that_node.left())?);
            let new_right = self.intermediate(self.union(&right, that_node.right())?);
            self.make_node(Arc::clone(that_node.item()), &new_left, &new_right)
        }
    }

    // =========================================================================
    // split
    // =========================================================================

    /// Partitions a treap around `key`.
    ///
    /// `middle` is the node holding `key` exactly as it appears in `root`,
    /// or empty. Only the nodes on the search path above it are rebuilt.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error met on the search path.
    ///
    /// # Complexity
    ///
    /// Expected O(log n).
    pub fn split(&self, root: &NodeLoc, key: &[u8]) -> Result<Split> {
        let Some(node) = root.resolve(self.store)? else {
            return Ok(Split::default());
        };

        match (self.compare)(key, node.key()) {
            Ordering::Equal => Ok(Split {
                left: node.left().clone(),
                middle: root.clone(),
                right: node.right().clone(),
            }),
            Ordering::Less => {
                let _subsumed = self.subsumed(&node);
                let Split {
                    left,
                    middle,
                    right,
                } = self.split(node.left(), key)?;
                let right = self.intermediate(right);
                let new_right = self.make_node(Arc::clone(node.item()), &right, node.right())?;
                Ok(Split {
                    left,
                    middle,
                    right: new_right,
                })
            }
            Ordering::Greater => {
                let _subsumed = self.subsumed(&node);
                let Split {
                    left,
                    middle,
                    right,
                } = self.split(node.right(), key)?;
                let left = self.intermediate(left);
                let new_left = self.make_node(Arc::clone(node.item()), node.left(), &left)?;
                Ok(Split {
                    left: new_left,
                    middle,
                    right,
                })
            }
        }
    }

    // =========================================================================
    // join
    // =========================================================================

    /// Concatenates two treaps whose key ranges do not overlap.
    ///
    /// Every key of `this` must order before every key of `that`. The
    /// precondition is not checked in release builds.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error met along the seam.
    ///
    /// # Complexity
    ///
    /// Expected O(log n + log m).
    pub fn join(&self, this: &NodeLoc, that: &NodeLoc) -> Result<NodeLoc> {
        let (this_node, that_node) = match (this.resolve(self.store)?, that.resolve(self.store)?) {
            (None, _) => return Ok(that.clone()),
            (_, None) => return Ok(this.clone()),
            (Some(this_node), Some(that_node)) => (this_node, that_node),
        };
        debug_assert_eq!(
            (self.compare)(this_node.key(), that_node.key()),
            Ordering::Less,
            "joined treaps must not overlap"
        );

        if this_node.priority() > that_node.priority() {
            let _subsumed = self.subsumed(&this_node);
            let inner = self.intermediate(self.join(this_node.right(), that)?);
            self.make_node(Arc::clone(this_node.item()), this_node.left(), &inner)
        } else {
            let _subsumed = self.subsumed(&that_node);
            let inner = self.intermediate(self.join(this, that_node.left())?);
            self.make_node(Arc::clone(that_node.item()), &inner, that_node.right())
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Builds a node whose aggregates are recomputed from its children.
    fn make_node(&self, item: Arc<Item>, left: &NodeLoc, right: &NodeLoc) -> Result<NodeLoc> {
        let (left_count, left_bytes) = self.aggregates(left)?;
        let (right_count, right_bytes) = self.aggregates(right)?;
        let count = 1 + left_count + right_count;
        let total_bytes = item.num_bytes() + left_bytes + right_bytes;
        Ok(NodeLoc::resident(self.reclaimer.allocate(
            item,
            left.clone(),
            right.clone(),
            count,
            total_bytes,
        )))
    }

    fn intermediate(&self, location: NodeLoc) -> IntermediateLoc<'a, R> {
        IntermediateLoc::new(self.reclaimer, location)
    }

    fn subsumed(&self, node: &Arc<Node>) -> SubsumedNode<'a, R> {
        SubsumedNode::new(self.reclaimer, node)
    }
}

impl<S: NodeStore + ?Sized, R: Reclaimer + ?Sized> Clone for TreapOps<'_, S, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: NodeStore + ?Sized, R: Reclaimer + ?Sized> Copy for TreapOps<'_, S, R> {}
