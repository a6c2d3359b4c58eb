//! Symbol table: identifier to value bindings.
//!
//! An unbalanced binary search tree ordered by byte-wise comparison of the keys. Lookups
//! and inserts walk iteratively, and release uses an explicit stack, so a table that
//! degenerated into a list (keys inserted in sorted order) is as safe to use and drop as
//! a bushy one.

use std::cmp::Ordering;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("out of memory while adding a symbol")]
    OutOfMemory,
}

/// One binding and its subtrees.
#[derive(Debug)]
pub struct Entry {
    key: String,
    value: f64,
    left: Option<Box<Entry>>,
    right: Option<Box<Entry>>,
}

impl Entry {
    fn new(key: &str, value: f64) -> Result<Self, TableError> {
        let mut owned = String::new();
        owned
            .try_reserve_exact(key.len())
            .map_err(|_| TableError::OutOfMemory)?;
        owned.push_str(key);
        Ok(Self {
            key: owned,
            value,
            left: None,
            right: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Entries whose keys sort before this one.
    pub fn left(&self) -> Option<&Entry> {
        self.left.as_deref()
    }

    /// Entries whose keys sort after this one.
    pub fn right(&self) -> Option<&Entry> {
        self.right.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    root: Option<Box<Entry>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Entry> {
        self.root.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The value bound to `key`, if any.
    pub fn lookup(&self, key: &str) -> Option<&f64> {
        let mut current = self.root.as_deref();
        while let Some(entry) = current {
            current = match key.cmp(entry.key.as_str()) {
                Ordering::Less => entry.left.as_deref(),
                Ordering::Greater => entry.right.as_deref(),
                Ordering::Equal => return Some(&entry.value),
            };
        }
        None
    }

    pub fn lookup_mut(&mut self, key: &str) -> Option<&mut f64> {
        let mut current = self.root.as_deref_mut();
        while let Some(entry) = current {
            match key.cmp(entry.key.as_str()) {
                Ordering::Less => current = entry.left.as_deref_mut(),
                Ordering::Greater => current = entry.right.as_deref_mut(),
                Ordering::Equal => return Some(&mut entry.value),
            }
        }
        None
    }

    /// Binds `key` to `value`.
    ///
    /// An existing binding is overwritten in place and its previous value returned; the
    /// shape of the table does not change. A new key becomes a leaf where the search
    /// ended. On failure the table is left exactly as it was.
    pub fn insert(&mut self, key: &str, value: f64) -> Result<Option<f64>, TableError> {
        let mut slot = &mut self.root;
        while let Some(entry) = slot {
            match key.cmp(entry.key.as_str()) {
                Ordering::Less => slot = &mut entry.left,
                Ordering::Greater => slot = &mut entry.right,
                Ordering::Equal => return Ok(Some(std::mem::replace(&mut entry.value, value))),
            }
        }
        *slot = Some(Box::new(Entry::new(key, value)?));
        trace!(key, "bound new symbol");
        Ok(None)
    }

    /// Number of entries, counted by a full traversal.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Number of entries on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending: Vec<(&Entry, usize)> = self.root().map(|root| (root, 1)).into_iter().collect();
        while let Some((entry, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(entry.left().map(|child| (child, depth + 1)));
            pending.extend(entry.right().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// Bindings in key order.
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter { stack: Vec::new() };
        iter.descend(self.root());
        iter
    }

    /// Releases every entry, leaving an empty table.
    pub fn clear(&mut self) {
        release(self.root.take());
    }
}

impl Drop for SymbolTable {
    fn drop(&mut self) {
        release(self.root.take());
    }
}

fn release(root: Option<Box<Entry>>) {
    let mut pending: Vec<Box<Entry>> = root.into_iter().collect();
    while let Some(mut entry) = pending.pop() {
        pending.extend(entry.left.take());
        pending.extend(entry.right.take());
    }
}

/// In-order iterator over `(key, value)` pairs.
pub struct Iter<'a> {
    stack: Vec<&'a Entry>,
}

impl<'a> Iter<'a> {
    fn descend(&mut self, mut entry: Option<&'a Entry>) {
        while let Some(current) = entry {
            self.stack.push(current);
            entry = current.left();
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.stack.pop()?;
        self.descend(entry.right());
        Some((entry.key(), entry.value()))
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = (&'a str, f64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
