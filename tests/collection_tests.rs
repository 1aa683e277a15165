//! Integration tests for Collection and Snapshot.

use std::cmp::Ordering;
use std::sync::Arc;

use kvtreap::treap::{Item, MemoryStore, NodeLoc, RootAccessor, RootGuard};
use kvtreap::{Collection, CollectionOptions, ReadItems, Snapshot};
use rstest::{fixture, rstest};

// =============================================================================
// Fixtures
// =============================================================================

#[fixture]
fn fruits() -> Collection {
    let collection = Collection::new();
    for (key, value) in [
        ("banana", "yellow"),
        ("apple", "red"),
        ("cherry", "dark red"),
        ("date", "brown"),
        ("elderberry", "purple"),
    ] {
        collection.set(key.as_bytes(), value.as_bytes()).unwrap();
    }
    collection
}

fn ascending_keys<R: ReadItems>(reader: &R, target: &str) -> Vec<String> {
    let mut keys = Vec::new();
    reader
        .visit_items_ascend(target.as_bytes(), false, |item| {
            keys.push(String::from_utf8_lossy(item.key()).into_owned());
            true
        })
        .unwrap();
    keys
}

fn descending_keys<R: ReadItems>(reader: &R, target: &str) -> Vec<String> {
    let mut keys = Vec::new();
    reader
        .visit_items_descend(target.as_bytes(), false, |item| {
            keys.push(String::from_utf8_lossy(item.key()).into_owned());
            true
        })
        .unwrap();
    keys
}

fn value_of<R: ReadItems>(reader: &R, key: &str) -> Option<String> {
    reader
        .get(key.as_bytes(), true)
        .unwrap()
        .map(|item| String::from_utf8_lossy(item.value().unwrap_or_default()).into_owned())
}

// =============================================================================
// Point Operations
// =============================================================================

#[rstest]
fn test_new_collection_is_empty() {
    let collection = Collection::new();
    assert_eq!(collection.totals().unwrap(), (0, 0));
    assert!(collection.min_item(false).unwrap().is_none());
    assert!(collection.max_item(false).unwrap().is_none());
    assert!(collection.get(b"anything", true).unwrap().is_none());
}

#[rstest]
fn test_get_returns_stored_values(fruits: Collection) {
    assert_eq!(value_of(&fruits, "apple").as_deref(), Some("red"));
    assert_eq!(value_of(&fruits, "date").as_deref(), Some("brown"));
    assert_eq!(value_of(&fruits, "fig"), None);
}

#[rstest]
fn test_set_overwrites(fruits: Collection) {
    fruits.set(b"apple", b"green").unwrap();
    assert_eq!(value_of(&fruits, "apple").as_deref(), Some("green"));
    assert_eq!(fruits.totals().unwrap().0, 5);
}

#[rstest]
fn test_set_item_keeps_chosen_priority() {
    let collection = Collection::new();
    collection
        .set_item(Item::with_priority(b"k", b"v", 42))
        .unwrap();

    let item = collection.get(b"k", false).unwrap().unwrap();

    assert_eq!(item.priority(), 42);
}

#[rstest]
#[case("apple")]
#[case("cherry")]
#[case("elderberry")]
fn test_delete_present_key(fruits: Collection, #[case] key: &str) {
    assert!(fruits.delete(key.as_bytes()).unwrap());

    assert_eq!(value_of(&fruits, key), None);
    assert_eq!(fruits.totals().unwrap().0, 4);
    assert!(!ascending_keys(&fruits, "").contains(&key.to_owned()));
}

#[rstest]
fn test_delete_absent_key(fruits: Collection) {
    assert!(!fruits.delete(b"fig").unwrap());
    assert_eq!(fruits.totals().unwrap().0, 5);
}

#[rstest]
fn test_delete_everything() {
    let collection = Collection::new();
    for key in ["x", "y", "z"] {
        collection.set(key.as_bytes(), b"").unwrap();
    }
    for key in ["y", "x", "z"] {
        assert!(collection.delete(key.as_bytes()).unwrap());
    }
    assert_eq!(collection.totals().unwrap(), (0, 0));
    assert!(collection.root().is_empty());
}

// =============================================================================
// Extremes and Scans
// =============================================================================

#[rstest]
fn test_min_and_max(fruits: Collection) {
    let min = fruits.min_item(true).unwrap().unwrap();
    let max = fruits.max_item(false).unwrap().unwrap();

    assert_eq!(min.key(), b"apple");
    assert_eq!(min.value(), Some(b"red".as_slice()));
    assert_eq!(max.key(), b"elderberry");
}

#[rstest]
#[case("", &["apple", "banana", "cherry", "date", "elderberry"])]
#[case("cherry", &["cherry", "date", "elderberry"])]
#[case("coconut", &["date", "elderberry"])]
#[case("zucchini", &[])]
fn test_visit_ascend(fruits: Collection, #[case] target: &str, #[case] expected: &[&str]) {
    assert_eq!(ascending_keys(&fruits, target), expected);
}

#[rstest]
#[case("zucchini", &["elderberry", "date", "cherry", "banana", "apple"])]
#[case("cherry", &["banana", "apple"])]
#[case("apple", &[])]
fn test_visit_descend(fruits: Collection, #[case] target: &str, #[case] expected: &[&str]) {
    assert_eq!(descending_keys(&fruits, target), expected);
}

#[rstest]
fn test_visit_stops_when_visitor_declines(fruits: Collection) {
    let mut keys = Vec::new();
    fruits
        .visit_items_ascend(b"b", false, |item| {
            keys.push(item.key().to_vec());
            keys.len() < 2
        })
        .unwrap();
    assert_eq!(keys, vec![b"banana".to_vec(), b"cherry".to_vec()]);
}

#[rstest]
fn test_totals_track_bytes(fruits: Collection) {
    let expected_bytes: u64 = [
        ("banana", "yellow"),
        ("apple", "red"),
        ("cherry", "dark red"),
        ("date", "brown"),
        ("elderberry", "purple"),
    ]
    .iter()
    .map(|(key, value)| (key.len() + value.len()) as u64)
    .sum();

    assert_eq!(fruits.totals().unwrap(), (5, expected_bytes));
}

// =============================================================================
// Options
// =============================================================================

fn reversed(left: &[u8], right: &[u8]) -> Ordering {
    right.cmp(left)
}

#[rstest]
fn test_custom_comparator_orders_scans() {
    let collection = Collection::with_options(CollectionOptions::default().with_compare(reversed));
    for key in ["a", "b", "c"] {
        collection.set(key.as_bytes(), b"").unwrap();
    }

    assert_eq!(ascending_keys(&collection, ""), Vec::<String>::new());
    assert_eq!(ascending_keys(&collection, "z"), vec!["c", "b", "a"]);
    assert_eq!(collection.min_item(false).unwrap().unwrap().key(), b"c");
    assert!(collection.delete(b"b").unwrap());
    assert_eq!(ascending_keys(&collection, "z"), vec!["c", "a"]);
}

// =============================================================================
// Merge
// =============================================================================

#[rstest]
fn test_merge_from_prefers_other(fruits: Collection) {
    let other = Collection::with_store(Arc::clone(fruits.backing_store()), CollectionOptions::default());
    other.set(b"apple", b"golden").unwrap();
    other.set(b"fig", b"purple").unwrap();

    fruits.merge_from(&other).unwrap();

    assert_eq!(value_of(&fruits, "apple").as_deref(), Some("golden"));
    assert_eq!(value_of(&fruits, "fig").as_deref(), Some("purple"));
    assert_eq!(value_of(&fruits, "banana").as_deref(), Some("yellow"));
    assert_eq!(fruits.totals().unwrap().0, 6);
    assert_eq!(other.totals().unwrap().0, 2);
}

#[rstest]
fn test_merge_from_itself_changes_nothing(fruits: Collection) {
    let before = ascending_keys(&fruits, "");

    fruits.merge_from(&fruits).unwrap();

    assert_eq!(ascending_keys(&fruits, ""), before);
    assert_eq!(value_of(&fruits, "cherry").as_deref(), Some("dark red"));
}

#[rstest]
fn test_merge_from_empty_keeps_root(fruits: Collection) {
    let root = fruits.root();
    let empty = Collection::new();

    fruits.merge_from(&empty).unwrap();

    assert!(fruits.root().same_node(&root));
}

// =============================================================================
// Snapshots
// =============================================================================

#[rstest]
fn test_snapshot_ignores_later_writes(fruits: Collection) {
    let snapshot = fruits.snapshot();

    fruits.set(b"apple", b"green").unwrap();
    fruits.delete(b"banana").unwrap();
    fruits.set(b"fig", b"purple").unwrap();

    assert_eq!(value_of(&snapshot, "apple").as_deref(), Some("red"));
    assert_eq!(value_of(&snapshot, "banana").as_deref(), Some("yellow"));
    assert_eq!(value_of(&snapshot, "fig"), None);
    assert_eq!(snapshot.totals().unwrap().0, 5);
    assert_eq!(fruits.totals().unwrap().0, 5);
    assert!(snapshot.generation() < fruits.generation());
}

#[rstest]
fn test_snapshot_clone_pins_same_generation(fruits: Collection) {
    let snapshot: Snapshot = fruits.snapshot();
    let copy = snapshot.clone();
    drop(snapshot);
    fruits.set(b"apple", b"green").unwrap();

    assert_eq!(value_of(&copy, "apple").as_deref(), Some("red"));
    assert_eq!(descending_keys(&copy, "c"), vec!["banana", "apple"]);
}

#[rstest]
fn test_root_guard_over_collection(fruits: Collection) {
    let guard = RootGuard::acquire(&fruits);
    let pinned: NodeLoc = guard.root().clone();
    fruits.set(b"fig", b"purple").unwrap();

    assert!(!pinned.same_node(&fruits.root()));
    drop(guard);
    let reference = fruits.add_root_ref();
    assert_eq!(reference.generation(), fruits.generation());
    fruits.release_root_ref(reference);
}

// =============================================================================
// Stored Nodes and Values
// =============================================================================

#[rstest]
fn test_collection_over_persisted_tree(#[from(fruits)] source: Collection) {
    let store: Arc<MemoryStore> = Arc::clone(source.backing_store());
    let stored_root = store.persist_tree(&source.root());
    let value_address = store.persist_value(b"lazy").unwrap();

    let collection = Collection::from_root(Arc::clone(&store), CollectionOptions::default(), stored_root);
    collection
        .set_item(Item::with_stored_value(b"fig", value_address, 7))
        .unwrap();

    assert_eq!(value_of(&collection, "banana").as_deref(), Some("yellow"));
    let lazy = collection.get(b"fig", false).unwrap().unwrap();
    assert_eq!(lazy.value(), None);
    assert_eq!(value_of(&collection, "fig").as_deref(), Some("lazy"));
    assert_eq!(collection.totals().unwrap().0, 6);
    assert!(collection.delete(b"cherry").unwrap());
    assert_eq!(
        ascending_keys(&collection, ""),
        vec!["apple", "banana", "date", "elderberry", "fig"]
    );
}
