//! Scoped access to a live root.

use std::borrow::Borrow;

use super::node::NodeLoc;

/// Hands out references to the current root of a container.
///
/// A reference obtained from [`RootAccessor::add_root_ref`] keeps every node
/// reachable from that root alive until it is given back through
/// [`RootAccessor::release_root_ref`], even if a writer installs a new root
/// in the meantime.
pub trait RootAccessor {
    /// A held root reference.
    type Root: Borrow<NodeLoc>;

    /// Takes a reference to the current root.
    fn add_root_ref(&self) -> Self::Root;

    /// Gives back a reference taken with [`RootAccessor::add_root_ref`].
    fn release_root_ref(&self, root: Self::Root);
}

/// A bare root is its own accessor; the held reference is a clone.
impl RootAccessor for NodeLoc {
    type Root = Self;

    fn add_root_ref(&self) -> Self {
        self.clone()
    }

    fn release_root_ref(&self, root: Self) {
        drop(root);
    }
}

/// Holds a root reference for the lifetime of a scope.
///
/// The reference is released when the guard drops, so every exit path,
/// including early returns through `?`, gives it back.
///
/// # Examples
///
/// ```rust
/// use kvtreap::treap::{NodeLoc, RootGuard};
///
/// let root = NodeLoc::Empty;
/// let guard = RootGuard::acquire(&root);
/// assert!(guard.root().is_empty());
/// ```
pub struct RootGuard<'a, A: RootAccessor + ?Sized> {
    accessor: &'a A,
    root: Option<A::Root>,
}

impl<'a, A: RootAccessor + ?Sized> RootGuard<'a, A> {
    /// Takes a reference to the accessor's current root.
    pub fn acquire(accessor: &'a A) -> Self {
        Self {
            root: Some(accessor.add_root_ref()),
            accessor,
        }
    }

    /// Returns the held root.
    #[must_use]
    pub fn root(&self) -> &NodeLoc {
        const EMPTY: &NodeLoc = &NodeLoc::Empty;
        self.root.as_ref().map_or(EMPTY, Borrow::borrow)
    }
}

impl<A: RootAccessor + ?Sized> Drop for RootGuard<'_, A> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            self.accessor.release_root_ref(root);
        }
    }
}
