//! # kvtreap
//!
//! The core of an ordered, persistent key-value container: a treap whose
//! mutations never modify existing nodes.
//!
//! ## Overview
//!
//! - **Treap algorithms**: structural `union`, `split` and `join`, plus the
//!   `walk` and `visit_nodes` traversals, in [`treap`]
//! - **Structural sharing**: nodes are `Arc`-shared between versions and
//!   carry subtree counts and byte totals
//! - **Reclamation signals**: every algorithm reports the nodes it subsumed,
//!   and a recycler reuses them once no version reaches them
//! - **Collection**: a concurrent, versioned collection with snapshots, in
//!   [`collection`]
//!
//! ## Example
//!
//! ```rust
//! use kvtreap::prelude::*;
//!
//! let collection = Collection::new();
//! collection.set(b"b", b"2").unwrap();
//! collection.set(b"a", b"1").unwrap();
//!
//! let first = collection.min_item(true).unwrap().unwrap();
//! assert_eq!(first.key(), b"a");
//! assert_eq!(collection.totals().unwrap(), (2, 4));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use kvtreap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::collection::{Collection, CollectionOptions, ReadItems, Snapshot};
    pub use crate::error::{Result, TreapError};
    pub use crate::treap::{Item, NodeLoc, NodeStore, TreapOps};
}

pub mod collection;
mod error;
pub mod treap;

pub use collection::{Collection, CollectionOptions, ReadItems, Snapshot};
pub use error::{Result, TreapError};
