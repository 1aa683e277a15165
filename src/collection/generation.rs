//! Published root generations.
//!
//! Every successful write publishes a new [`RootGeneration`]. Readers pin a
//! generation by holding its `Arc`; when the last holder of a superseded
//! generation lets go, the nodes its successor's write subsumed are offered
//! to the recycler.

use std::borrow::Borrow;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::treap::{Node, NodeLoc, NodeRecycler};

pub(crate) struct RootGeneration {
    sequence: u64,
    root: NodeLoc,
    reclaim_later: Mutex<Vec<Arc<Node>>>,
    recycler: Arc<NodeRecycler>,
}

impl RootGeneration {
    pub(crate) fn new(sequence: u64, root: NodeLoc, recycler: Arc<NodeRecycler>) -> Self {
        Self {
            sequence,
            root,
            reclaim_later: Mutex::new(Vec::new()),
            recycler,
        }
    }

    pub(crate) const fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) const fn root(&self) -> &NodeLoc {
        &self.root
    }

    /// Hands over the nodes the next generation's write subsumed.
    pub(crate) fn retire(&self, marked: Vec<Arc<Node>>) {
        self.reclaim_later.lock().extend(marked);
    }
}

impl Drop for RootGeneration {
    fn drop(&mut self) {
        // The root goes first so that marked nodes only it reached become unique.
        self.root = NodeLoc::Empty;
        let marked = std::mem::take(self.reclaim_later.get_mut());
        if !marked.is_empty() {
            debug!(
                "draining {} reclaimable nodes of generation {}",
                marked.len(),
                self.sequence
            );
            self.recycler.reclaim(marked);
        }
    }
}

/// A held reference to a published root.
///
/// The nodes reachable from the root stay alive while the reference is held.
#[derive(Clone)]
pub struct RootRef(pub(crate) Arc<RootGeneration>);

impl RootRef {
    /// Returns the sequence number of the pinned generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.0.sequence()
    }
}

impl Borrow<NodeLoc> for RootRef {
    fn borrow(&self) -> &NodeLoc {
        self.0.root()
    }
}

impl std::fmt::Debug for RootRef {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_tuple("RootRef")
            .field(&self.0.sequence())
            .field(self.0.root())
            .finish()
    }
}
