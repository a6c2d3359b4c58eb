//! Single-statement parser.
//!
//! Runs one engine instance over one line and translates the outcome into a
//! [`ParseError`]. The engine instance lives in an [`EngineScope`] so it is disposed on
//! every exit path, unwinding included.

use crate::ast::Ast;
use crate::config::{ConfigError, ParserConfig};
use crate::errors::ParseError;
use crate::syntax::engine::{EngineFailure, Grammar, GrammarEngine, PestGrammar};
use tracing::warn;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses statements with a grammar and a configuration.
#[derive(Debug, Clone, Default)]
pub struct Parser<G = PestGrammar> {
    grammar: G,
    config: ParserConfig,
}

impl Parser {
    /// A parser using the built-in grammar and default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser using the built-in grammar. `config` is validated first.
    pub fn with_config(config: ParserConfig) -> Result<Self, ConfigError> {
        Self::with_grammar(PestGrammar, config)
    }
}

impl<G: Grammar> Parser<G> {
    /// A parser over any grammar. `config` is validated first.
    pub fn with_grammar(grammar: G, config: ParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { grammar, config })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    /// Parses exactly one statement.
    ///
    /// `line` must already be isolated from its buffer. Locations in the returned error
    /// are relative to `line`, so their line numbers are always 1.
    pub fn parse_statement(&self, line: &str) -> Result<Ast, ParseError> {
        let mut scope = EngineScope::acquire(&self.grammar, line, &self.config)
            .map_err(acquisition_error)?;
        let outcome = scope.next_result();

        match (outcome, scope.dispose()) {
            (Ok(tree), Ok(())) => Ok(tree),
            (Err(failure), Ok(())) => Err(translate(failure, line)),
            (outcome, Err(failure)) => {
                // A tree from an engine that could not be torn down is not handed out.
                drop(outcome);
                Err(ParseError::unknown(format!(
                    "grammar engine failed to release: {failure}"
                )))
            }
        }
    }
}

// ============================================================================
// ENGINE SCOPE
// ============================================================================

/// Owns an engine instance for the duration of one statement.
struct EngineScope<'a> {
    engine: Option<Box<dyn GrammarEngine + 'a>>,
}

impl<'a> EngineScope<'a> {
    fn acquire<G: Grammar + ?Sized>(
        grammar: &G,
        line: &'a str,
        config: &ParserConfig,
    ) -> Result<Self, EngineFailure> {
        Ok(Self {
            engine: Some(grammar.acquire(line, config)?),
        })
    }

    fn next_result(&mut self) -> Result<Ast, EngineFailure> {
        match self.engine.as_mut() {
            Some(engine) => engine.next_result(),
            None => Err(EngineFailure::Other("grammar engine already released".into())),
        }
    }

    /// Disposes the engine and reports whether that worked.
    fn dispose(mut self) -> Result<(), EngineFailure> {
        match self.engine.take() {
            Some(mut engine) => engine.dispose(),
            None => Ok(()),
        }
    }
}

impl Drop for EngineScope<'_> {
    fn drop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            if let Err(failure) = engine.dispose() {
                warn!(%failure, "grammar engine failed to release");
            }
        }
    }
}

// ============================================================================
// OUTCOME TRANSLATION
// ============================================================================

fn acquisition_error(failure: EngineFailure) -> ParseError {
    match failure {
        EngineFailure::OutOfMemory => ParseError::out_of_memory("starting the grammar engine"),
        other => ParseError::unknown(format!("could not start the grammar engine: {other}")),
    }
}

fn translate(failure: EngineFailure, line: &str) -> ParseError {
    match failure {
        EngineFailure::InvalidToken { lexeme, location } => {
            ParseError::invalid_token(lexeme, location, line)
        }
        EngineFailure::Syntax { message, location } => ParseError::syntax(message, location, line),
        EngineFailure::OutOfMemory => ParseError::out_of_memory("parsing a statement"),
        EngineFailure::Other(message) => ParseError::unknown(message),
    }
}
