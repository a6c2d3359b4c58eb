//! Parser error taxonomy.
//!
//! Every failure a parse can produce is one [`ParseError`] variant, and every variant maps
//! to exactly one [`ErrorKind`]. [`ErrorRecord`] is the flat `(kind, span)` view for hosts
//! that cannot carry a rich error value across their boundary.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Name given to the source attached to single-statement errors.
pub const STATEMENT_SOURCE_NAME: &str = "statement";
/// Name given to the source attached to errors relocated into a whole buffer.
pub const INPUT_SOURCE_NAME: &str = "input";

// ============================================================================
// LOCATIONS
// ============================================================================

/// Where a failure occurred.
///
/// Lines and columns are 1-based and counted in characters. `offset` and `length` are
/// byte positions into the source attached to the error, used for diagnostic labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub first_line: usize,
    pub first_column: usize,
    pub last_line: usize,
    pub last_column: usize,
    pub offset: usize,
    pub length: usize,
}

impl Location {
    /// A zero-width location at byte `offset` of a single line.
    pub fn point(line: &str, offset: usize) -> Self {
        let column = column_at(line, offset);
        Self {
            first_line: 1,
            first_column: column,
            last_line: 1,
            last_column: column,
            offset,
            length: 0,
        }
    }

    /// A location covering bytes `start..end` of a single line.
    ///
    /// The last column is the column of the final character inside the range, so a
    /// one-character range starts and ends on the same column.
    pub fn range(line: &str, start: usize, end: usize) -> Self {
        if end <= start {
            return Self::point(line, start);
        }
        let last_char_start = line
            .get(start..end)
            .and_then(|slice| slice.char_indices().last())
            .map_or(start, |(index, _)| start + index);
        Self {
            first_line: 1,
            first_column: column_at(line, start),
            last_line: 1,
            last_column: column_at(line, last_char_start),
            offset: start,
            length: end - start,
        }
    }

    /// Moves a line-relative location onto line `line_number` of a larger buffer whose
    /// line starts at byte `line_offset`.
    pub fn shifted(self, line_number: usize, line_offset: usize) -> Self {
        let delta = line_number.saturating_sub(1);
        Self {
            first_line: self.first_line + delta,
            last_line: self.last_line + delta,
            offset: self.offset + line_offset,
            ..self
        }
    }

    pub fn source_span(&self) -> SourceSpan {
        SourceSpan::from((self.offset, self.length))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.first_line, self.first_column, self.last_line, self.last_column
        )
    }
}

fn column_at(line: &str, offset: usize) -> usize {
    let clamped = offset.min(line.len());
    // Offsets handed out by the engine always sit on char boundaries; fall back to a
    // byte count if one does not.
    line.get(..clamped)
        .map_or(clamped, |prefix| prefix.chars().count())
        + 1
}

// ============================================================================
// ERROR KINDS AND RECORDS
// ============================================================================

/// The classes of parse outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Cleared state. Never the outcome of a failed call.
    #[default]
    NoError,
    SyntaxError,
    InvalidToken,
    OutOfMemory,
    UnknownError,
    InvalidArgument,
}

impl ErrorKind {
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::NoError => "no-error",
            Self::SyntaxError => "syntax-error",
            Self::InvalidToken => "invalid-token",
            Self::OutOfMemory => "out-of-memory",
            Self::UnknownError => "unknown-error",
            Self::InvalidArgument => "invalid-argument",
        }
    }

    pub const fn is_error(&self) -> bool {
        !matches!(self, Self::NoError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code_suffix())
    }
}

/// Flat error record: a kind and the span of the failure.
///
/// `ErrorRecord::default()` is the cleared state; spans of kinds that carry no location
/// stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub first_line: usize,
    pub first_column: usize,
    pub last_line: usize,
    pub last_column: usize,
}

impl ErrorRecord {
    /// The record describing the outcome of a parse call: cleared for success,
    /// populated for failure.
    pub fn from_result<T>(result: &Result<T, ParseError>) -> Self {
        match result {
            Ok(_) => Self::default(),
            Err(error) => error.record(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_cleared(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::SyntaxError | ErrorKind::InvalidToken => write!(
                f,
                "{} at {}:{}-{}:{}",
                self.kind, self.first_line, self.first_column, self.last_line, self.last_column
            ),
            kind => write!(f, "{kind}"),
        }
    }
}

// ============================================================================
// PARSE ERRORS
// ============================================================================

/// A failed parse.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("syntax error: {message}")]
    #[diagnostic(
        code(function_parser::parse::syntax),
        help("each line must hold exactly one complete expression")
    )]
    Syntax {
        message: String,
        location: Location,
        #[source_code]
        src: NamedSource<String>,
        #[label("parsing stopped here")]
        span: SourceSpan,
    },

    #[error("invalid token '{lexeme}'")]
    #[diagnostic(
        code(function_parser::parse::invalid_token),
        help("expressions are built from numbers, identifiers, parentheses, commas and + - * / ^ =")
    )]
    InvalidToken {
        lexeme: String,
        location: Location,
        #[source_code]
        src: NamedSource<String>,
        #[label("not a token")]
        span: SourceSpan,
    },

    #[error("out of memory while {context}")]
    #[diagnostic(code(function_parser::parse::out_of_memory))]
    OutOfMemory { context: String },

    #[error("parser failure: {message}")]
    #[diagnostic(code(function_parser::parse::unknown))]
    Unknown { message: String },

    #[error("invalid argument: {message}")]
    #[diagnostic(code(function_parser::invalid_argument))]
    InvalidArgument { message: String },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, location: Location, source_text: &str) -> Self {
        Self::Syntax {
            message: message.into(),
            location,
            src: NamedSource::new(STATEMENT_SOURCE_NAME, source_text.to_owned()),
            span: location.source_span(),
        }
    }

    pub fn invalid_token(lexeme: impl Into<String>, location: Location, source_text: &str) -> Self {
        Self::InvalidToken {
            lexeme: lexeme.into(),
            location,
            src: NamedSource::new(STATEMENT_SOURCE_NAME, source_text.to_owned()),
            span: location.source_span(),
        }
    }

    pub fn out_of_memory(context: impl Into<String>) -> Self {
        Self::OutOfMemory {
            context: context.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::SyntaxError,
            Self::InvalidToken { .. } => ErrorKind::InvalidToken,
            Self::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Self::Unknown { .. } => ErrorKind::UnknownError,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// The failure's location, for the kinds that have one.
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::Syntax { location, .. } | Self::InvalidToken { location, .. } => Some(*location),
            _ => None,
        }
    }

    pub fn record(&self) -> ErrorRecord {
        let location = self.location().unwrap_or_default();
        ErrorRecord {
            kind: self.kind(),
            first_line: location.first_line,
            first_column: location.first_column,
            last_line: location.last_line,
            last_column: location.last_column,
        }
    }

    /// Re-expresses a single-statement error in the coordinates of the buffer it came from.
    ///
    /// `line_number` is the 1-based line of the statement and `line_offset` the byte at
    /// which it starts. The attached source becomes the whole buffer.
    pub fn relocate(self, line_number: usize, line_offset: usize, buffer: &str) -> Self {
        match self {
            Self::Syntax {
                message, location, ..
            } => {
                let location = location.shifted(line_number, line_offset);
                Self::Syntax {
                    message,
                    location,
                    src: NamedSource::new(INPUT_SOURCE_NAME, buffer.to_owned()),
                    span: location.source_span(),
                }
            }
            Self::InvalidToken {
                lexeme, location, ..
            } => {
                let location = location.shifted(line_number, line_offset);
                Self::InvalidToken {
                    lexeme,
                    location,
                    src: NamedSource::new(INPUT_SOURCE_NAME, buffer.to_owned()),
                    span: location.source_span(),
                }
            }
            other => other,
        }
    }

    /// Renders the error as a plain-text miette report, source snippet included.
    pub fn render(&self) -> String {
        let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
        let mut out = String::new();
        if handler.render_report(&mut out, self).is_err() {
            return self.to_string();
        }
        out
    }
}
