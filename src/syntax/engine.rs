//! Tokenizer and grammar engine.
//!
//! The statement parser only talks to engines through [`Grammar`] and [`GrammarEngine`].
//! [`PestGrammar`] is the engine shipped with the crate: a lexical pass that finds
//! characters no token can start with, followed by the statement grammar in
//! `grammar.pest`.

use crate::ast::{Ast, AstError, Operator};
use crate::config::ParserConfig;
use crate::errors::Location;
use pest::error::{Error as PestError, ErrorVariant, InputLocation};
use pest::iterators::{Pair, Pairs};
use pest::Parser as _;
use thiserror::Error;
use tracing::trace;

mod grammar {
    use pest_derive::Parser;

    #[derive(Parser)]
    #[grammar = "syntax/grammar.pest"]
    pub struct StatementGrammar;
}

use grammar::{Rule, StatementGrammar};

// ============================================================================
// ENGINE SEAM
// ============================================================================

/// How an engine run can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineFailure {
    #[error("unrecognized lexeme '{lexeme}' at {location}")]
    InvalidToken { lexeme: String, location: Location },
    #[error("{message} at {location}")]
    Syntax { message: String, location: Location },
    #[error("engine ran out of memory")]
    OutOfMemory,
    #[error("{0}")]
    Other(String),
}

impl From<AstError> for EngineFailure {
    fn from(error: AstError) -> Self {
        match error {
            AstError::OutOfMemory => EngineFailure::OutOfMemory,
            AstError::InvalidArgument { message } => EngineFailure::Other(message),
        }
    }
}

/// One engine instance, bound to one line of text.
///
/// Instances are acquired per statement and must be disposed exactly once.
pub trait GrammarEngine {
    /// Runs the engine over its line and returns the statement tree.
    fn next_result(&mut self) -> Result<Ast, EngineFailure>;

    /// Releases the instance's working state.
    fn dispose(&mut self) -> Result<(), EngineFailure>;
}

/// Hands out engine instances.
pub trait Grammar {
    fn acquire<'a>(
        &self,
        line: &'a str,
        config: &ParserConfig,
    ) -> Result<Box<dyn GrammarEngine + 'a>, EngineFailure>;
}

// ============================================================================
// PEST ENGINE
// ============================================================================

/// The default grammar, backed by `grammar.pest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PestGrammar;

impl Grammar for PestGrammar {
    fn acquire<'a>(
        &self,
        line: &'a str,
        config: &ParserConfig,
    ) -> Result<Box<dyn GrammarEngine + 'a>, EngineFailure> {
        Ok(Box::new(PestEngine {
            line,
            max_nesting: config.max_nesting,
            state: EngineState::Ready,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Ready,
    Finished,
    Disposed,
}

#[derive(Debug)]
pub struct PestEngine<'a> {
    line: &'a str,
    max_nesting: usize,
    state: EngineState,
}

impl GrammarEngine for PestEngine<'_> {
    fn next_result(&mut self) -> Result<Ast, EngineFailure> {
        match self.state {
            EngineState::Ready => self.state = EngineState::Finished,
            EngineState::Finished => {
                return Err(EngineFailure::Other(
                    "engine already produced its result".into(),
                ))
            }
            EngineState::Disposed => {
                return Err(EngineFailure::Other("engine used after disposal".into()))
            }
        }
        self.tokenize()?;
        self.reduce()
    }

    fn dispose(&mut self) -> Result<(), EngineFailure> {
        if self.state == EngineState::Disposed {
            return Err(EngineFailure::Other("engine disposed twice".into()));
        }
        self.state = EngineState::Disposed;
        Ok(())
    }
}

impl PestEngine<'_> {
    /// Lexical pass. Also enforces the nesting limit so the grammar pass never
    /// recurses past it.
    fn tokenize(&self) -> Result<(), EngineFailure> {
        let pairs = StatementGrammar::parse(Rule::tokens, self.line)
            .map_err(|error| self.invalid_token(&error))?;

        let mut depth = 0usize;
        let mut count = 0usize;
        for token in pairs.flatten() {
            match token.as_rule() {
                Rule::tokens | Rule::EOI => continue,
                Rule::open_paren => {
                    depth += 1;
                    if depth > self.max_nesting {
                        let span = token.as_span();
                        return Err(EngineFailure::Syntax {
                            message: format!(
                                "parentheses nest deeper than {} levels",
                                self.max_nesting
                            ),
                            location: Location::range(self.line, span.start(), span.end()),
                        });
                    }
                }
                Rule::close_paren => depth = depth.saturating_sub(1),
                _ => {}
            }
            count += 1;
        }
        trace!(tokens = count, "tokenized statement");
        Ok(())
    }

    /// Grammar pass.
    fn reduce(&self) -> Result<Ast, EngineFailure> {
        let mut pairs = StatementGrammar::parse(Rule::statement, self.line)
            .map_err(|error| self.syntax_error(&error))?;
        let statement = next_pair(&mut pairs, "statement")?;
        let mut inner = statement.into_inner();
        build(next_pair(&mut inner, "expression")?)
    }

    fn invalid_token(&self, error: &PestError<Rule>) -> EngineFailure {
        let start = error_start(error);
        match self.line.get(start..).and_then(|rest| rest.chars().next()) {
            Some(ch) => EngineFailure::InvalidToken {
                lexeme: ch.to_string(),
                location: Location::range(self.line, start, start + ch.len_utf8()),
            },
            None => EngineFailure::Other(format!("lexical pass failed at end of line: {error}")),
        }
    }

    fn syntax_error(&self, error: &PestError<Rule>) -> EngineFailure {
        let location = match error.location {
            InputLocation::Pos(pos) => Location::point(self.line, pos),
            InputLocation::Span((start, end)) => Location::range(self.line, start, end),
        };
        let found = self
            .line
            .get(location.offset..)
            .and_then(|rest| rest.chars().next())
            .map_or_else(|| "end of line".to_string(), |ch| format!("'{ch}'"));
        let message = match &error.variant {
            ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
                format!("expected {}, found {found}", describe_expected(positives))
            }
            ErrorVariant::CustomError { message } => message.clone(),
            _ => format!("unexpected {found}"),
        };
        EngineFailure::Syntax { message, location }
    }
}

fn error_start(error: &PestError<Rule>) -> usize {
    match error.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    }
}

fn describe_expected(rules: &[Rule]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for rule in rules {
        let name = describe_rule(*rule);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    match names.split_last() {
        Some((last, [])) => (*last).to_string(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
        None => "input".to_string(),
    }
}

fn describe_rule(rule: Rule) -> &'static str {
    match rule {
        Rule::number => "number",
        Rule::identifier => "identifier",
        Rule::add => "'+'",
        Rule::subtract => "'-'",
        Rule::multiply => "'*'",
        Rule::divide => "'/'",
        Rule::exponent => "'^'",
        Rule::assign => "'='",
        Rule::open_paren => "'('",
        Rule::close_paren => "')'",
        Rule::comma => "','",
        Rule::call => "call",
        Rule::arguments => "arguments",
        Rule::EOI => "end of line",
        _ => "expression",
    }
}

// ============================================================================
// TREE CONSTRUCTION
// ============================================================================

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>, EngineFailure> {
    pairs
        .next()
        .ok_or_else(|| EngineFailure::Other(format!("grammar produced no {what}")))
}

fn build(pair: Pair<'_, Rule>) -> Result<Ast, EngineFailure> {
    match pair.as_rule() {
        Rule::expression => fold_right(pair.into_inner(), Operator::Assign),

        Rule::sum | Rule::product => fold_binary(pair.into_inner()),

        Rule::power => fold_right(pair.into_inner(), Operator::Exponent),

        Rule::call => {
            let mut inner = pair.into_inner();
            let callee = build(next_pair(&mut inner, "callee")?)?;
            let arguments = build(next_pair(&mut inner, "arguments")?)?;
            Ok(Ast::nonterminal(Operator::Call, callee, arguments))
        }

        Rule::arguments => {
            let mut inner = pair.into_inner();
            let mut chain = build(next_pair(&mut inner, "argument")?)?;
            for argument in inner {
                chain = Ast::nonterminal(Operator::Comma, chain, build(argument)?);
            }
            Ok(chain)
        }

        Rule::number => {
            let text = pair.as_str();
            text.parse::<f64>()
                .map(Ast::number)
                .map_err(|_| EngineFailure::Other(format!("'{text}' is not a number")))
        }

        Rule::identifier => Ok(Ast::identifier(pair.as_str())?),

        rule => Err(EngineFailure::Other(format!(
            "unexpected grammar rule {rule:?}"
        ))),
    }
}

/// Left-folds `operand (operator operand)*`.
fn fold_binary(mut pairs: Pairs<'_, Rule>) -> Result<Ast, EngineFailure> {
    let mut tree = build(next_pair(&mut pairs, "operand")?)?;
    while let Some(op) = pairs.next() {
        let operator = match op.as_rule() {
            Rule::add => Operator::Add,
            Rule::subtract => Operator::Subtract,
            Rule::multiply => Operator::Multiply,
            Rule::divide => Operator::Divide,
            rule => {
                return Err(EngineFailure::Other(format!(
                    "unexpected operator rule {rule:?}"
                )))
            }
        };
        let rhs = build(next_pair(&mut pairs, "operand")?)?;
        tree = Ast::nonterminal(operator, tree, rhs);
    }
    Ok(tree)
}

/// Right-folds `operand (operator operand)*` for a single right-associative operator.
fn fold_right(pairs: Pairs<'_, Rule>, operator: Operator) -> Result<Ast, EngineFailure> {
    let mut operands = Vec::new();
    for pair in pairs {
        if !matches!(pair.as_rule(), Rule::assign | Rule::exponent) {
            operands.push(build(pair)?);
        }
    }
    let mut tree = operands
        .pop()
        .ok_or_else(|| EngineFailure::Other(format!("no operand for '{operator}'")))?;
    while let Some(lhs) = operands.pop() {
        tree = Ast::nonterminal(operator, lhs, tree);
    }
    Ok(tree)
}
