//! Parses line-oriented arithmetic and assignment statements into a forest of operator
//! trees.
//!
//! ```rust
//! use function_parser::{parse_forest, Operator};
//!
//! let forest = parse_forest("1 + 2\nx = 3\n").unwrap();
//! assert_eq!(forest.len(), 2);
//! assert_eq!(forest[0].operator(), Some(Operator::Add));
//! assert_eq!(forest[1].to_string(), "(= x 3)");
//! ```

pub use crate::ast::{Ast, AstError, Operator, TreeBuilder};
pub use crate::config::{ConfigError, ParserConfig};
pub use crate::errors::{ErrorKind, ErrorRecord, Location, ParseError};
pub use crate::symbols::{SymbolTable, TableError};
pub use crate::syntax::{parse_forest, parse_statement, Forest, Parser};

pub mod ast;
pub mod config;
pub mod errors;
pub mod symbols;
pub mod syntax;
