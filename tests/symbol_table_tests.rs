// tests/symbol_table_tests.rs

mod common;

use function_parser::SymbolTable;

fn table_with(keys: &[&str]) -> SymbolTable {
    let mut table = SymbolTable::new();
    for (index, key) in keys.iter().enumerate() {
        assert_eq!(table.insert(key, index as f64).unwrap(), None);
    }
    table
}

#[test]
fn test_insert_builds_search_tree() {
    common::init_tracing();
    let table = table_with(&["b", "a", "c"]);

    let root = table.root().unwrap();
    assert_eq!(root.key(), "b");
    assert_eq!(root.left().map(|entry| entry.key()), Some("a"));
    assert_eq!(root.right().map(|entry| entry.key()), Some("c"));

    assert_eq!(table.lookup("b"), Some(&0.0));
    assert_eq!(table.lookup("a"), Some(&1.0));
    assert_eq!(table.lookup("c"), Some(&2.0));
    assert_eq!(table.depth(), 2);
}

#[test]
fn test_reinsert_keeps_shape() {
    let mut table = table_with(&["m", "f", "t"]);
    assert_eq!(table.insert("f", 9.5).unwrap(), Some(1.0));
    assert_eq!(table.len(), 3);
    assert_eq!(table.depth(), 2);
    assert_eq!(table.lookup("f"), Some(&9.5));
}

#[test]
fn test_missing_keys() {
    let empty = SymbolTable::new();
    assert_eq!(empty.lookup("x"), None);

    let table = table_with(&["x", "y"]);
    assert_eq!(table.lookup("z"), None);
    assert_eq!(table.lookup(""), None);
    assert_eq!(table.lookup("X"), None);
}

#[test]
fn test_iteration_is_sorted() {
    let table = table_with(&["delta", "alpha", "echo", "charlie", "bravo"]);
    let keys: Vec<&str> = table.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["alpha", "bravo", "charlie", "delta", "echo"]);

    let total: f64 = (&table).into_iter().map(|(_, value)| value).sum();
    assert_eq!(total, 10.0);
}

#[test]
fn test_sorted_inserts_degenerate_safely() {
    let count = 2000;
    let mut table = SymbolTable::new();
    for index in 0..count {
        table.insert(&format!("k{index:05}"), index as f64).unwrap();
    }
    assert_eq!(table.depth(), count);
    assert_eq!(table.len(), count);
    assert_eq!(table.lookup("k01999"), Some(&1999.0));
    assert_eq!(table.lookup("k00000"), Some(&0.0));
    drop(table);
}

#[test]
fn test_reverse_sorted_chain_clears() {
    let mut table = SymbolTable::new();
    for index in (0..10_000).rev() {
        table.insert(&format!("v{index:06}"), 0.0).unwrap();
    }
    assert_eq!(table.depth(), 10_000);
    table.clear();
    assert!(table.is_empty());
}
