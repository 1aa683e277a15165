//! Items stored in treap nodes.
//!
//! An [`Item`] carries the key, the randomized priority that drives the
//! treap's heap order, and a value that is either held inline or left in the
//! backing store until a caller asks for it.

use std::fmt;
use std::sync::Arc;

use super::node::StoredAddress;
use super::store::NodeStore;
use crate::error::{Result, TreapError};

/// The value part of an [`Item`].
#[derive(Clone, PartialEq, Eq)]
pub enum ItemValue {
    /// The value bytes are held in memory.
    Inline(Arc<[u8]>),
    /// The value bytes live in the backing store and are read on demand.
    Stored(StoredAddress),
}

impl ItemValue {
    /// Returns the length of the value in bytes, loaded or not.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Inline(bytes) => bytes.len() as u64,
            Self::Stored(address) => u64::from(address.length()),
        }
    }

    /// Returns `true` if the value has no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ItemValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(bytes) => {
                write!(formatter, "Inline({:?})", String::from_utf8_lossy(bytes))
            }
            Self::Stored(address) => write!(formatter, "Stored({address})"),
        }
    }
}

/// A key, its priority and its value.
///
/// Items are shared between every node version that holds them, so they are
/// handled as `Arc<Item>` once placed in a treap.
///
/// # Examples
///
/// ```rust
/// use kvtreap::treap::Item;
///
/// let item = Item::with_priority(b"key", b"value", 7);
/// assert_eq!(item.key(), b"key");
/// assert_eq!(item.priority(), 7);
/// assert_eq!(item.value(), Some(b"value".as_slice()));
/// assert_eq!(item.num_bytes(), 8);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Item {
    key: Arc<[u8]>,
    priority: u32,
    value: ItemValue,
}

impl Item {
    /// Creates an item with an inline value and a random priority.
    #[must_use]
    pub fn new(key: &[u8], value: &[u8]) -> Self {
        Self::with_priority(key, value, rand::random())
    }

    /// Creates an item with an inline value and the given priority.
    #[must_use]
    pub fn with_priority(key: &[u8], value: &[u8], priority: u32) -> Self {
        Self {
            key: Arc::from(key),
            priority,
            value: ItemValue::Inline(Arc::from(value)),
        }
    }

    /// Creates an item whose value stays in the backing store.
    #[must_use]
    pub fn with_stored_value(key: &[u8], address: StoredAddress, priority: u32) -> Self {
        Self {
            key: Arc::from(key),
            priority,
            value: ItemValue::Stored(address),
        }
    }

    /// Returns the key.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Returns the heap priority.
    #[inline]
    #[must_use]
    pub const fn priority(&self) -> u32 {
        self.priority
    }

    /// Returns the value bytes if they are loaded.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        match &self.value {
            ItemValue::Inline(bytes) => Some(bytes.as_ref()),
            ItemValue::Stored(_) => None,
        }
    }

    /// Returns the value representation.
    #[inline]
    #[must_use]
    pub const fn item_value(&self) -> &ItemValue {
        &self.value
    }

    /// Returns the number of bytes this item accounts for in subtree totals.
    #[inline]
    #[must_use]
    pub fn num_bytes(&self) -> u64 {
        self.key.len() as u64 + self.value.len()
    }

    /// Resolves an item for a reader.
    ///
    /// Without `with_value` the shared item is returned as is. With
    /// `with_value`, a stored value is read through `store` and a new item
    /// holding it inline is returned; the item inside the tree is untouched.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the value cannot be read, or
    /// [`TreapError::Corrupted`] if it has the wrong length.
    pub fn resolve<S>(item: &Arc<Self>, store: &S, with_value: bool) -> Result<Arc<Self>>
    where
        S: NodeStore + ?Sized,
    {
        match &item.value {
            ItemValue::Stored(address) if with_value => {
                let bytes = store.read_value(*address)?;
                if bytes.len() as u64 != u64::from(address.length()) {
                    return Err(TreapError::Corrupted {
                        address: *address,
                        reason: format!(
                            "value holds {} bytes, expected {}",
                            bytes.len(),
                            address.length()
                        ),
                    });
                }
                Ok(Arc::new(Self {
                    key: Arc::clone(&item.key),
                    priority: item.priority,
                    value: ItemValue::Inline(bytes),
                }))
            }
            _ => Ok(Arc::clone(item)),
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Item")
            .field("key", &String::from_utf8_lossy(&self.key))
            .field("priority", &self.priority)
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::treap::MemoryStore;
    use rstest::rstest;

    #[rstest]
    fn test_num_bytes_counts_key_and_value() {
        let item = Item::with_priority(b"abc", b"defgh", 1);
        assert_eq!(item.num_bytes(), 8);
    }

    #[rstest]
    fn test_num_bytes_counts_unloaded_value() {
        let item = Item::with_stored_value(b"ab", StoredAddress::new(0, 10), 1);
        assert_eq!(item.num_bytes(), 12);
        assert_eq!(item.value(), None);
    }

    #[rstest]
    fn test_resolve_without_value_returns_same_item() {
        let store = MemoryStore::new();
        let item = Arc::new(Item::with_stored_value(b"k", StoredAddress::new(0, 1), 1));
        let resolved = Item::resolve(&item, &store, false).unwrap();
        assert!(Arc::ptr_eq(&item, &resolved));
    }

    #[rstest]
    fn test_resolve_with_value_loads_stored_bytes() {
        let store = MemoryStore::new();
        let address = store.persist_value(b"payload").unwrap();
        let item = Arc::new(Item::with_stored_value(b"k", address, 5));

        let resolved = Item::resolve(&item, &store, true).unwrap();

        assert_eq!(resolved.value(), Some(b"payload".as_slice()));
        assert_eq!(resolved.priority(), 5);
        assert_eq!(item.value(), None);
    }

    #[rstest]
    fn test_resolve_with_value_reports_missing_value() {
        let store = MemoryStore::new();
        let address = StoredAddress::new(512, 4);
        let item = Arc::new(Item::with_stored_value(b"k", address, 5));

        let error = Item::resolve(&item, &store, true).unwrap_err();

        assert_eq!(error, TreapError::ValueUnavailable { address });
    }

    #[rstest]
    fn test_resolve_with_value_rejects_length_mismatch() {
        let store = MemoryStore::new();
        let stored = store.persist_value(b"four").unwrap();
        let wrong = StoredAddress::new(stored.offset(), 9);
        let item = Arc::new(Item::with_stored_value(b"k", wrong, 5));

        let error = Item::resolve(&item, &store, true).unwrap_err();

        assert!(matches!(error, TreapError::Corrupted { .. }));
    }

    #[rstest]
    fn test_debug_shows_key_as_text() {
        let item = Item::with_priority(b"key", b"v", 2);
        let rendered = format!("{item:?}");
        assert!(rendered.contains("\"key\""));
        assert!(rendered.contains("priority: 2"));
    }
}
