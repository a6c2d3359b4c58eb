//! AST module
//!
//! The operator tree produced for one statement. A tree is either a nonterminal (an
//! operator with exactly two owned children) or a terminal (a number or an identifier).
//! Ownership is exclusive: dropping a root drops the whole tree exactly once, and shared
//! subtrees cannot be expressed.
//!
//! Left-folded chains such as `1 + 1 + ... + 1` make trees as deep as the line is long,
//! so nothing here recurses over a tree: release, comparison, cloning, printing and
//! [`Ast::build`] all walk with an explicit stack.

// ============================================================================
// IMPORTS
// ============================================================================

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use thiserror::Error;

pub mod bridge;

pub use bridge::{forest_to_json, BridgeError, JsonTreeBuilder, TreeBuilder};

// ============================================================================
// OPERATORS
// ============================================================================

/// Host-facing code of the "no operator" sentinel. Never the tag of a nonterminal.
pub const NONE_CODE: i32 = 0;
/// Host-facing code of the call operator.
pub const CALL_CODE: i32 = 1;

/// Terminal kind code for numeric literals.
pub const NUMBER_KIND: i32 = 1;
/// Terminal kind code for identifiers.
pub const ID_KIND: i32 = 2;

/// Binary operators a nonterminal can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Exponent,
    Assign,
    /// Joins call arguments: `f(a, b)` carries `(, a b)` as its right child.
    Comma,
    /// Left child is the callee, right child the argument (or comma chain of arguments).
    Call,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
        Operator::Exponent,
        Operator::Assign,
        Operator::Comma,
        Operator::Call,
    ];

    /// The host bridge numbering: the operator's character for symbolic operators,
    /// [`CALL_CODE`] for calls.
    pub const fn code(self) -> i32 {
        match self {
            Operator::Add => '+' as i32,
            Operator::Subtract => '-' as i32,
            Operator::Multiply => '*' as i32,
            Operator::Divide => '/' as i32,
            Operator::Exponent => '^' as i32,
            Operator::Assign => '=' as i32,
            Operator::Comma => ',' as i32,
            Operator::Call => CALL_CODE,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, AstError> {
        if code == NONE_CODE {
            return Err(AstError::InvalidArgument {
                message: "the no-operator sentinel cannot tag a nonterminal".into(),
            });
        }
        Self::ALL
            .into_iter()
            .find(|op| op.code() == code)
            .ok_or_else(|| AstError::InvalidArgument {
                message: format!("unknown operator code {code}"),
            })
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Exponent => "^",
            Operator::Assign => "=",
            Operator::Comma => ",",
            Operator::Call => "call",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AstError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("out of memory while copying an identifier")]
    OutOfMemory,
}

/// A nonterminal construction that was refused. The children are handed back untouched
/// so the caller still owns them.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Rejected {
    pub error: AstError,
    pub left: Ast,
    pub right: Ast,
}

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// One node of a statement tree.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ast {
    Nonterminal {
        op: Operator,
        left: Box<Ast>,
        right: Box<Ast>,
    },
    Number {
        value: f64,
    },
    Identifier {
        name: String,
    },
}

impl Ast {
    pub fn nonterminal(op: Operator, left: Ast, right: Ast) -> Self {
        Ast::Nonterminal {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Builds a nonterminal from a host operator code.
    ///
    /// The sentinel [`NONE_CODE`] and unknown codes are refused with
    /// [`AstError::InvalidArgument`]; the children come back inside the [`Rejected`].
    pub fn nonterminal_from_code(code: i32, left: Ast, right: Ast) -> Result<Self, Box<Rejected>> {
        match Operator::from_code(code) {
            Ok(op) => Ok(Self::nonterminal(op, left, right)),
            Err(error) => Err(Box::new(Rejected { error, left, right })),
        }
    }

    pub fn number(value: f64) -> Self {
        Ast::Number { value }
    }

    /// Builds an identifier terminal holding its own copy of `name`.
    pub fn identifier(name: &str) -> Result<Self, AstError> {
        let mut owned = String::new();
        owned
            .try_reserve_exact(name.len())
            .map_err(|_| AstError::OutOfMemory)?;
        owned.push_str(name);
        Ok(Ast::Identifier { name: owned })
    }

    /// Builds a terminal from a host kind code. `value` is read for [`NUMBER_KIND`],
    /// `id` for [`ID_KIND`].
    pub fn terminal_from_code(kind: i32, value: f64, id: Option<&str>) -> Result<Self, AstError> {
        match kind {
            NUMBER_KIND => Ok(Self::number(value)),
            ID_KIND => {
                let name = id.ok_or_else(|| AstError::InvalidArgument {
                    message: "identifier terminal needs a name".into(),
                })?;
                Self::identifier(name)
            }
            other => Err(AstError::InvalidArgument {
                message: format!("unknown terminal kind {other}"),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Ast::Nonterminal { .. })
    }

    pub fn operator(&self) -> Option<Operator> {
        match self {
            Ast::Nonterminal { op, .. } => Some(*op),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<(&Ast, &Ast)> {
        match self {
            Ast::Nonterminal { left, right, .. } => Some((left, right)),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Ast::Number { value } => Some(*value),
            _ => None,
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Ast::Identifier { name } => Some(name),
            _ => None,
        }
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            if let Some((left, right)) = node.children() {
                pending.push(left);
                pending.push(right);
            }
        }
        count
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            if let Some((left, right)) = node.children() {
                pending.push((left, depth + 1));
                pending.push((right, depth + 1));
            }
        }
        deepest
    }

    /// Converts the tree bottom-up with `builder`, children before their parent.
    ///
    /// If any constructor fails the traversal stops; nodes already built for the
    /// unfinished subtree are dropped before the error is returned.
    pub fn build<B: TreeBuilder + ?Sized>(&self, builder: &mut B) -> Result<B::Node, B::Error> {
        enum Step<'a> {
            Visit(&'a Ast),
            Combine(Operator),
        }

        let mut steps = vec![Step::Visit(self)];
        let mut built: Vec<B::Node> = Vec::new();
        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(Ast::Nonterminal { op, left, right }) => {
                    steps.push(Step::Combine(*op));
                    steps.push(Step::Visit(right.as_ref()));
                    steps.push(Step::Visit(left.as_ref()));
                }
                Step::Visit(Ast::Number { value }) => built.push(builder.number(*value)?),
                Step::Visit(Ast::Identifier { name }) => built.push(builder.identifier(name)?),
                Step::Combine(op) => {
                    let (Some(right), Some(left)) = (built.pop(), built.pop()) else {
                        unreachable!("both operands are built before their operator");
                    };
                    built.push(builder.nonterminal(op, left, right)?);
                }
            }
        }
        match built.pop() {
            Some(root) => Ok(root),
            None => unreachable!("the root is always built"),
        }
    }
}

/// Moves a child out of its box, leaving a terminal behind. The box stays with its
/// parent and is freed along with it.
fn take_child(slot: &mut Ast) -> Ast {
    std::mem::replace(slot, Ast::Number { value: 0.0 })
}

impl Drop for Ast {
    fn drop(&mut self) {
        let Ast::Nonterminal { left, right, .. } = self else {
            return;
        };
        if left.is_terminal() && right.is_terminal() {
            return;
        }
        // Each popped node loses its nonterminal children to the stack before it is
        // dropped, so its own drop only ever finds terminals below it.
        let mut pending = vec![take_child(left), take_child(right)];
        while let Some(mut node) = pending.pop() {
            if let Ast::Nonterminal { left, right, .. } = &mut node {
                if !left.is_terminal() {
                    pending.push(take_child(left));
                }
                if !right.is_terminal() {
                    pending.push(take_child(right));
                }
            }
        }
    }
}

/// Copies a tree node by node through [`Ast::build`].
struct Copier;

impl TreeBuilder for Copier {
    type Node = Ast;
    type Error = Infallible;

    fn nonterminal(&mut self, op: Operator, left: Ast, right: Ast) -> Result<Ast, Infallible> {
        Ok(Ast::nonterminal(op, left, right))
    }

    fn number(&mut self, value: f64) -> Result<Ast, Infallible> {
        Ok(Ast::number(value))
    }

    fn identifier(&mut self, name: &str) -> Result<Ast, Infallible> {
        Ok(Ast::Identifier {
            name: name.to_owned(),
        })
    }
}

impl Clone for Ast {
    fn clone(&self) -> Self {
        match self.build(&mut Copier) {
            Ok(copy) => copy,
            Err(never) => match never {},
        }
    }
}

impl PartialEq for Ast {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some(pair) = pending.pop() {
            match pair {
                (
                    Ast::Nonterminal { op, left, right },
                    Ast::Nonterminal {
                        op: other_op,
                        left: other_left,
                        right: other_right,
                    },
                ) => {
                    if op != other_op {
                        return false;
                    }
                    pending.push((left.as_ref(), other_left.as_ref()));
                    pending.push((right.as_ref(), other_right.as_ref()));
                }
                (Ast::Number { value }, Ast::Number { value: other_value }) => {
                    if value != other_value {
                        return false;
                    }
                }
                (Ast::Identifier { name }, Ast::Identifier { name: other_name }) => {
                    if name != other_name {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

/// Prints the tree in prefix form: `(+ 1 2)`, `(call f (, a b))`.
impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Piece<'a> {
            Tree(&'a Ast),
            Text(&'static str),
        }

        let mut pending = vec![Piece::Tree(self)];
        while let Some(piece) = pending.pop() {
            match piece {
                Piece::Text(text) => f.write_str(text)?,
                Piece::Tree(Ast::Nonterminal { op, left, right }) => {
                    write!(f, "({op} ")?;
                    pending.push(Piece::Text(")"));
                    pending.push(Piece::Tree(right.as_ref()));
                    pending.push(Piece::Text(" "));
                    pending.push(Piece::Tree(left.as_ref()));
                }
                Piece::Tree(Ast::Number { value }) => write!(f, "{value}")?,
                Piece::Tree(Ast::Identifier { name }) => f.write_str(name)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ast({self})")
    }
}

/// Releases a tree. Releasing nothing is a no-op.
pub fn release(tree: Option<Ast>) {
    drop(tree);
}
