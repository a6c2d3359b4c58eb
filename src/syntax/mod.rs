//! Syntax: turning text into statement trees.
//!
//! - [`engine`]: the tokenizer and grammar seam, and the built-in pest grammar
//! - [`parser`]: one line to one tree
//! - [`forest`]: a whole buffer to a forest, all-or-nothing

pub mod engine;
pub mod forest;
pub mod parser;

pub use engine::{EngineFailure, Grammar, GrammarEngine, PestGrammar};
pub use forest::{source_lines, Forest, ForestBuilder, SourceLine};
pub use parser::Parser;

use crate::ast::Ast;
use crate::errors::ParseError;

/// Parses one statement with the built-in grammar and default configuration.
pub fn parse_statement(line: &str) -> Result<Ast, ParseError> {
    Parser::new().parse_statement(line)
}

/// Parses every line of `text` with the built-in grammar and default configuration.
pub fn parse_forest(text: &str) -> Result<Forest, ParseError> {
    Parser::new().parse_forest(text)
}
