//! Error types for treap operations.
//!
//! Every failure that can originate inside the treap core is a resolution
//! failure: a [`NodeLoc`](crate::treap::NodeLoc) or a stored item value could
//! not be turned into its in-memory form. Comparator and item accessor calls
//! never fail on their own.

use crate::treap::StoredAddress;

/// Represents a failure to resolve a stored reference.
///
/// Any error aborts the whole `union`/`split`/`join`/`walk`/`visit_nodes`
/// call tree it occurs in. The input roots remain valid because nothing is
/// ever mutated in place.
///
/// # Examples
///
/// ```rust
/// use kvtreap::TreapError;
/// use kvtreap::treap::StoredAddress;
///
/// let error = TreapError::NodeUnavailable {
///     address: StoredAddress::new(4096, 48),
/// };
/// assert_eq!(
///     format!("{error}"),
///     "node at offset 4096 (48 bytes) could not be resolved"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreapError {
    /// The backing store has no readable node at the address.
    NodeUnavailable {
        /// Address of the node that was requested.
        address: StoredAddress,
    },
    /// The backing store has no readable value at the address.
    ValueUnavailable {
        /// Address of the value that was requested.
        address: StoredAddress,
    },
    /// The backing store returned something that cannot be used.
    Corrupted {
        /// Address of the offending record.
        address: StoredAddress,
        /// Description of what was wrong with the record.
        reason: String,
    },
}

impl TreapError {
    /// Returns the address whose resolution failed.
    #[must_use]
    pub const fn address(&self) -> StoredAddress {
        match self {
            Self::NodeUnavailable { address }
            | Self::ValueUnavailable { address }
            | Self::Corrupted { address, .. } => *address,
        }
    }
}

impl std::fmt::Display for TreapError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeUnavailable { address } => {
                write!(formatter, "node at {address} could not be resolved")
            }
            Self::ValueUnavailable { address } => {
                write!(formatter, "value at {address} could not be resolved")
            }
            Self::Corrupted { address, reason } => {
                write!(formatter, "record at {address} is corrupted: {reason}")
            }
        }
    }
}

impl std::error::Error for TreapError {}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, TreapError>;
