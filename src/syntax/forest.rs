//! Multi-statement parse driver.
//!
//! A buffer is parsed line by line into a [`Forest`]. The call is all-or-nothing: the
//! trees are collected in a [`ForestBuilder`] that only hands them out on
//! [`ForestBuilder::commit`], so any failure drops everything parsed so far.

use crate::ast::Ast;
use crate::errors::{Location, ParseError};
use crate::syntax::engine::Grammar;
use crate::syntax::parser::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::str::Utf8Error;
use tracing::{debug, trace};

// ============================================================================
// FOREST
// ============================================================================

/// The trees of one successful multi-statement parse, in input order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest {
    trees: Vec<Ast>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Ast> {
        self.trees.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ast> {
        self.trees.iter()
    }

    pub fn trees(&self) -> &[Ast] {
        &self.trees
    }

    pub fn into_trees(self) -> Vec<Ast> {
        self.trees
    }

    /// Releases every tree, then the forest itself.
    pub fn release(self) {
        drop(self);
    }
}

impl Index<usize> for Forest {
    type Output = Ast;

    fn index(&self, index: usize) -> &Ast {
        &self.trees[index]
    }
}

impl IntoIterator for Forest {
    type Item = Ast;
    type IntoIter = std::vec::IntoIter<Ast>;

    fn into_iter(self) -> Self::IntoIter {
        self.trees.into_iter()
    }
}

impl<'a> IntoIterator for &'a Forest {
    type Item = &'a Ast;
    type IntoIter = std::slice::Iter<'a, Ast>;

    fn into_iter(self) -> Self::IntoIter {
        self.trees.iter()
    }
}

/// One tree per line.
impl fmt::Display for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tree in &self.trees {
            writeln!(f, "{tree}")?;
        }
        Ok(())
    }
}

// ============================================================================
// TRANSACTIONAL BUILDER
// ============================================================================

/// Accumulates trees for a forest under construction.
///
/// Storage grows with fallible allocation. Dropping an uncommitted builder rolls back:
/// every tree it holds is released.
#[derive(Debug, Default)]
pub struct ForestBuilder {
    trees: Vec<Ast>,
}

impl ForestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes room for one more tree.
    pub fn reserve_slot(&mut self) -> Result<(), ParseError> {
        self.trees
            .try_reserve(1)
            .map_err(|_| ParseError::out_of_memory("growing the parse forest"))
    }

    pub fn push(&mut self, tree: Ast) -> Result<(), ParseError> {
        self.reserve_slot()?;
        self.trees.push(tree);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn commit(mut self) -> Forest {
        Forest {
            trees: std::mem::take(&mut self.trees),
        }
    }
}

impl Drop for ForestBuilder {
    fn drop(&mut self) {
        if !self.trees.is_empty() {
            debug!(statements = self.trees.len(), "rolling back partial forest");
        }
    }
}

// ============================================================================
// LINE SPLITTING
// ============================================================================

/// A line of the input buffer, without its terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// 1-based line number.
    pub number: usize,
    /// Byte offset of the line's first character in the buffer.
    pub offset: usize,
    pub text: &'a str,
}

/// Splits `text` on `\n`. A trailing `\r` is dropped from each line, the end of the
/// buffer ends the last line, and a final terminator does not start an extra line.
pub fn source_lines(text: &str) -> impl Iterator<Item = SourceLine<'_>> {
    text.split_inclusive('\n')
        .scan(0usize, |next_offset, raw| {
            let offset = *next_offset;
            *next_offset += raw.len();
            Some((offset, raw))
        })
        .enumerate()
        .map(|(index, (offset, raw))| {
            let body = raw.strip_suffix('\n').unwrap_or(raw);
            let body = body.strip_suffix('\r').unwrap_or(body);
            SourceLine {
                number: index + 1,
                offset,
                text: body,
            }
        })
}

// ============================================================================
// DRIVER
// ============================================================================

impl<G: Grammar> Parser<G> {
    /// Parses every statement line of `text`.
    ///
    /// Either every line parses and the forest holds one tree per statement line, or
    /// nothing is returned and the error describes the first line that failed, in
    /// buffer coordinates.
    pub fn parse_forest(&self, text: &str) -> Result<Forest, ParseError> {
        debug!(bytes = text.len(), "parsing forest");
        let mut builder = ForestBuilder::new();

        for line in source_lines(text) {
            if self.config().skip_blank_lines && line.text.trim().is_empty() {
                continue;
            }
            // Grow first: a growth failure reports out-of-memory whatever the line holds.
            builder.reserve_slot()?;
            trace!(line = line.number, "parsing statement");
            let tree = self
                .parse_statement(line.text)
                .map_err(|error| error.relocate(line.number, line.offset, text))?;
            builder.push(tree)?;
        }

        let forest = builder.commit();
        debug!(statements = forest.len(), "parsed forest");
        Ok(forest)
    }

    /// Host entry point over raw bytes.
    ///
    /// An absent buffer is an invalid argument and never reaches the grammar. Bytes that
    /// are not UTF-8 are reported as an invalid token at the first bad byte.
    pub fn parse_forest_bytes(&self, input: Option<&[u8]>) -> Result<Forest, ParseError> {
        let bytes = input.ok_or_else(|| ParseError::invalid_argument("input buffer is absent"))?;
        match std::str::from_utf8(bytes) {
            Ok(text) => self.parse_forest(text),
            Err(error) => Err(undecodable(bytes, error)),
        }
    }
}

fn undecodable(bytes: &[u8], error: Utf8Error) -> ParseError {
    let valid = error.valid_up_to();
    let bad_len = error.error_len().unwrap_or(bytes.len() - valid);
    let lexeme: String = bytes[valid..valid + bad_len]
        .iter()
        .map(|byte| format!("\\x{byte:02X}"))
        .collect();

    // The prefix before `valid` survives lossy decoding byte for byte, and the bad
    // sequence becomes a single replacement character right after it.
    let lossy = String::from_utf8_lossy(bytes);
    let line_offset = lossy[..valid].rfind('\n').map_or(0, |index| index + 1);
    let line_number = lossy[..valid].matches('\n').count() + 1;
    let line_end = lossy[line_offset..]
        .find('\n')
        .map_or(lossy.len(), |index| line_offset + index);
    let line = &lossy[line_offset..line_end];

    let start = valid - line_offset;
    let location = Location::range(line, start, start + char::REPLACEMENT_CHARACTER.len_utf8());
    ParseError::invalid_token(lexeme, location, line).relocate(line_number, line_offset, &lossy)
}
