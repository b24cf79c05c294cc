//! Persistence guarantees: write-then-read equivalence, byte-stable
//! serialization, and non-interference between entries in one results file.

mod helpers;

use std::fs;

use franken_verdict::{FieldPolicy, ResultStore, compare};
use helpers::{record, seed_store, store_path};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn written_entry_reads_back_comparison_equal() {
    let dir = tempdir().expect("tempdir");
    let store = ResultStore::default();
    let path = store_path(dir.path(), "dropper");

    let written = record(json!({
        "c2": ["1.2.3.4:443", "5.6.7.8:443"],
        "mutex": "GLOBAL_1",
        "config": {"interval": 30, "persist": true}
    }));
    store
        .update_test_results(&path, "sample.bin", written.clone(), true)
        .expect("write");

    let entries = store.read("dropper", &path).expect("read back");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].filename, "sample.bin");

    let diffs = compare(&written, &entries[0].fields, &FieldPolicy::default());
    assert!(diffs.is_empty(), "got: {diffs:?}");
}

#[test]
fn rewriting_identical_content_is_byte_stable() {
    let dir = tempdir().expect("tempdir");
    let store = ResultStore::default();
    let path = store_path(dir.path(), "dropper");
    let fields = record(json!({"c2": "1.2.3.4", "mutex": "GLOBAL_1"}));

    store
        .update_test_results(&path, "sample.bin", fields.clone(), true)
        .expect("first write");
    let first = fs::read(&path).expect("read bytes");

    store
        .update_test_results(&path, "sample.bin", fields, true)
        .expect("second write");
    let second = fs::read(&path).expect("read bytes");

    assert_eq!(first, second);
}

#[test]
fn updating_one_entry_leaves_the_others_byte_identical() {
    let dir = tempdir().expect("tempdir");
    let store = ResultStore::default();
    let path = seed_store(
        dir.path(),
        "dropper",
        &json!([
            {"filename": "a.bin", "c2": "1.1.1.1", "mutex": "A"},
            {"filename": "b.bin", "c2": "2.2.2.2", "mutex": "B"},
            {"filename": "c.bin", "c2": "3.3.3.3", "mutex": "C"}
        ]),
    );

    let before = store.read("dropper", &path).expect("read before");
    let render = |entry: &franken_verdict::storage::StoredCase| {
        serde_json::to_string(entry).expect("render entry")
    };
    let a_before = render(&before[0]);
    let c_before = render(&before[2]);

    store
        .update_test_results(
            &path,
            "b.bin",
            record(json!({"c2": "9.9.9.9", "mutex": "B2"})),
            true,
        )
        .expect("update b");

    let after = store.read("dropper", &path).expect("read after");
    assert_eq!(after.len(), 3);

    // Order is preserved and untouched entries re-serialize to the same
    // bytes.
    assert_eq!(after[0].filename, "a.bin");
    assert_eq!(after[1].filename, "b.bin");
    assert_eq!(after[2].filename, "c.bin");
    assert_eq!(render(&after[0]), a_before);
    assert_eq!(render(&after[2]), c_before);
    assert_eq!(after[1].fields.get("c2"), Some(&json!("9.9.9.9")));
}

#[test]
fn deleting_an_absent_filename_changes_nothing() {
    let dir = tempdir().expect("tempdir");
    let store = ResultStore::default();
    let path = seed_store(
        dir.path(),
        "dropper",
        &json!([{"filename": "a.bin", "c2": "1.1.1.1"}]),
    );
    let before = fs::read(&path).expect("read bytes");

    let removed = store
        .remove_test_results(&path, &["ghost.bin".to_owned()])
        .expect("remove");
    assert!(removed.is_empty());
    assert_eq!(fs::read(&path).expect("read bytes"), before);
}

#[test]
fn deleting_from_a_never_created_store_is_harmless() {
    let dir = tempdir().expect("tempdir");
    let store = ResultStore::default();
    let path = store_path(dir.path(), "dropper");

    let removed = store
        .remove_test_results(&path, &["a.bin".to_owned()])
        .expect("remove");
    assert!(removed.is_empty());
    assert!(!path.exists());
}

#[test]
fn removing_the_last_entry_keeps_an_empty_store_file() {
    let dir = tempdir().expect("tempdir");
    let store = ResultStore::default();
    let path = seed_store(
        dir.path(),
        "dropper",
        &json!([{"filename": "a.bin", "c2": "1.1.1.1"}]),
    );

    let removed = store
        .remove_test_results(&path, &["a.bin".to_owned()])
        .expect("remove");
    assert_eq!(removed, vec!["a.bin".to_owned()]);
    assert!(path.exists());

    let entries = store.read("dropper", &path).expect("read");
    assert!(entries.is_empty());
}

#[test]
fn results_file_is_pretty_printed_with_trailing_newline() {
    let dir = tempdir().expect("tempdir");
    let store = ResultStore::default();
    let path = store_path(dir.path(), "dropper");

    store
        .update_test_results(
            &path,
            "sample.bin",
            record(json!({"c2": "1.2.3.4", "alpha": "first"})),
            true,
        )
        .expect("write");

    let text = fs::read_to_string(&path).expect("read text");
    assert!(text.ends_with('\n'));
    assert!(text.contains("\n  {"), "entries should be indented: {text}");
    // The filename key leads each entry; metadata keys follow in sorted
    // order, so diffs track content, not map churn.
    let filename = text.find("\"filename\"").expect("filename key");
    let alpha = text.find("\"alpha\"").expect("alpha key");
    let c2 = text.find("\"c2\"").expect("c2 key");
    assert!(filename < alpha && alpha < c2);
}
