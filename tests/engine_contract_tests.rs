// tests/engine_contract_tests.rs
//
// Drives the parser with a scripted grammar to check the engine lifecycle: every
// acquired instance is disposed exactly once, whatever the outcome.

mod common;

use function_parser::errors::Location;
use function_parser::syntax::{EngineFailure, Grammar, GrammarEngine};
use function_parser::{Ast, ErrorKind, Parser, ParserConfig};
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

// ---
// Scripted grammar
// ---

#[derive(Debug, Clone)]
enum Behavior {
    Succeed,
    Fail(EngineFailure),
    FailDispose,
    RefuseAcquire(EngineFailure),
    Panic,
}

#[derive(Debug, Default)]
struct Counters {
    acquired: Cell<usize>,
    disposed: Cell<usize>,
    runs: Cell<usize>,
}

impl Counters {
    fn balanced(&self) -> bool {
        self.acquired.get() == self.disposed.get()
    }
}

struct ScriptedGrammar {
    script: Box<dyn Fn(&str) -> Behavior>,
    counters: Rc<Counters>,
}

impl ScriptedGrammar {
    fn new(script: impl Fn(&str) -> Behavior + 'static) -> (Self, Rc<Counters>) {
        let counters = Rc::new(Counters::default());
        let grammar = Self {
            script: Box::new(script),
            counters: Rc::clone(&counters),
        };
        (grammar, counters)
    }

    fn always(behavior: Behavior) -> (Self, Rc<Counters>) {
        Self::new(move |_| behavior.clone())
    }
}

impl Grammar for ScriptedGrammar {
    fn acquire<'a>(
        &self,
        line: &'a str,
        _config: &ParserConfig,
    ) -> Result<Box<dyn GrammarEngine + 'a>, EngineFailure> {
        let behavior = (self.script)(line);
        if let Behavior::RefuseAcquire(failure) = behavior {
            return Err(failure);
        }
        self.counters.acquired.set(self.counters.acquired.get() + 1);
        Ok(Box::new(ScriptedEngine {
            line,
            behavior,
            counters: Rc::clone(&self.counters),
        }))
    }
}

struct ScriptedEngine<'a> {
    line: &'a str,
    behavior: Behavior,
    counters: Rc<Counters>,
}

impl GrammarEngine for ScriptedEngine<'_> {
    fn next_result(&mut self) -> Result<Ast, EngineFailure> {
        self.counters.runs.set(self.counters.runs.get() + 1);
        match &self.behavior {
            Behavior::Fail(failure) => Err(failure.clone()),
            Behavior::Panic => panic!("scripted engine panic"),
            _ => Ok(Ast::number(self.line.len() as f64)),
        }
    }

    fn dispose(&mut self) -> Result<(), EngineFailure> {
        self.counters.disposed.set(self.counters.disposed.get() + 1);
        match self.behavior {
            Behavior::FailDispose => Err(EngineFailure::Other("scripted dispose failure".into())),
            _ => Ok(()),
        }
    }
}

fn parser(grammar: ScriptedGrammar) -> Parser<ScriptedGrammar> {
    Parser::with_grammar(grammar, ParserConfig::default()).unwrap()
}

// ---
// Single statements
// ---

#[test]
fn test_success_disposes_once() {
    common::init_tracing();
    let (grammar, counters) = ScriptedGrammar::always(Behavior::Succeed);
    let tree = parser(grammar).parse_statement("abc").unwrap();
    assert_eq!(tree.as_number(), Some(3.0));
    assert_eq!(counters.acquired.get(), 1);
    assert_eq!(counters.runs.get(), 1);
    assert_eq!(counters.disposed.get(), 1);
}

#[test]
fn test_engine_syntax_failure_is_translated() {
    let (grammar, counters) = ScriptedGrammar::new(|line| {
        Behavior::Fail(EngineFailure::Syntax {
            message: "scripted".into(),
            location: Location::point(line, 2),
        })
    });
    let err = parser(grammar).parse_statement("a b c").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(err.record().first_column, 3);
    assert!(counters.balanced());
}

#[test]
fn test_dispose_failure_overrides_success() {
    let (grammar, counters) = ScriptedGrammar::always(Behavior::FailDispose);
    let err = parser(grammar).parse_statement("x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownError);
    assert_eq!(counters.disposed.get(), 1);
}

#[test]
fn test_engine_out_of_memory() {
    let (grammar, counters) = ScriptedGrammar::always(Behavior::Fail(EngineFailure::OutOfMemory));
    let err = parser(grammar).parse_statement("x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    assert!(counters.balanced());
}

#[test]
fn test_engine_other_failure_is_unknown() {
    let (grammar, counters) =
        ScriptedGrammar::always(Behavior::Fail(EngineFailure::Other("boom".into())));
    let err = parser(grammar).parse_statement("x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownError);
    assert!(err.to_string().contains("boom"));
    assert!(counters.balanced());
}

#[test]
fn test_acquire_failures() {
    let (grammar, counters) =
        ScriptedGrammar::always(Behavior::RefuseAcquire(EngineFailure::OutOfMemory));
    let err = parser(grammar).parse_statement("x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    assert_eq!(counters.acquired.get(), 0);
    assert_eq!(counters.disposed.get(), 0);

    let (grammar, counters) =
        ScriptedGrammar::always(Behavior::RefuseAcquire(EngineFailure::Other("busy".into())));
    let err = parser(grammar).parse_statement("x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownError);
    assert_eq!(counters.runs.get(), 0);
    assert_eq!(counters.disposed.get(), 0);
}

#[test]
fn test_panic_still_disposes() {
    let (grammar, counters) = ScriptedGrammar::always(Behavior::Panic);
    let parser = parser(grammar);
    let outcome = catch_unwind(AssertUnwindSafe(|| parser.parse_statement("x")));
    assert!(outcome.is_err());
    assert_eq!(counters.acquired.get(), 1);
    assert_eq!(counters.disposed.get(), 1);
}

// ---
// Forests
// ---

#[test]
fn test_forest_failure_disposes_every_engine() {
    let (grammar, counters) = ScriptedGrammar::new(|line| {
        if line == "bad" {
            Behavior::Fail(EngineFailure::Syntax {
                message: "scripted".into(),
                location: Location::point(line, 0),
            })
        } else {
            Behavior::Succeed
        }
    });
    let err = parser(grammar).parse_forest("a\nb\nbad\nd\n").unwrap_err();
    let record = err.record();
    assert_eq!(record.kind, ErrorKind::SyntaxError);
    assert_eq!(record.first_line, 3);
    assert_eq!(record.first_column, 1);
    assert_eq!(counters.acquired.get(), 3);
    assert!(counters.balanced());
}

#[test]
fn test_forest_dispose_failure_aborts() {
    let (grammar, counters) = ScriptedGrammar::new(|line| {
        if line == "leaky" {
            Behavior::FailDispose
        } else {
            Behavior::Succeed
        }
    });
    let err = parser(grammar).parse_forest("one\nleaky\nthree").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownError);
    assert_eq!(counters.acquired.get(), 2);
    assert!(counters.balanced());
}

#[test]
fn test_absent_buffer_never_acquires() {
    let (grammar, counters) = ScriptedGrammar::always(Behavior::Succeed);
    let err = parser(grammar).parse_forest_bytes(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(counters.acquired.get(), 0);
}

#[test]
fn test_blank_lines_never_reach_the_engine() {
    let (grammar, counters) = ScriptedGrammar::always(Behavior::Succeed);
    let forest = parser(grammar).parse_forest("a\n\n  \nbb\n").unwrap();
    assert_eq!(forest.len(), 2);
    assert_eq!(counters.acquired.get(), 2);
    assert!(counters.balanced());
}
