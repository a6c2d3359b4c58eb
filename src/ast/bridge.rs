//! # Tree Bridge
//!
//! Hosts that keep their own object model convert trees through [`TreeBuilder`], which
//! has exactly one constructor per node shape. [`Ast::build`] drives it post-order, so a
//! host constructor always receives finished children.
//!
//! [`JsonTreeBuilder`] is the reference builder. Its output is the shape hosts see over
//! a JSON boundary:
//!
//! ```text
//! {"operator": 43, "left": {"number": 1.0}, "right": {"id": "x"}}
//! ```

use super::{Ast, Operator};
use serde_json::{json, Map, Number, Value};
use thiserror::Error;

/// Host-side constructors for the three node shapes.
pub trait TreeBuilder {
    type Node;
    type Error;

    fn nonterminal(
        &mut self,
        op: Operator,
        left: Self::Node,
        right: Self::Node,
    ) -> Result<Self::Node, Self::Error>;

    fn number(&mut self, value: f64) -> Result<Self::Node, Self::Error>;

    fn identifier(&mut self, name: &str) -> Result<Self::Node, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("number {0} has no JSON representation")]
    NonFiniteNumber(f64),
}

/// Builds `serde_json::Value` trees keyed by the host operator codes.
#[derive(Debug, Default)]
pub struct JsonTreeBuilder {
    built: usize,
}

impl JsonTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many nodes this builder has produced so far.
    pub fn built(&self) -> usize {
        self.built
    }
}

impl TreeBuilder for JsonTreeBuilder {
    type Node = Value;
    type Error = BridgeError;

    fn nonterminal(&mut self, op: Operator, left: Value, right: Value) -> Result<Value, BridgeError> {
        self.built += 1;
        let mut node = Map::new();
        node.insert("operator".into(), json!(op.code()));
        node.insert("left".into(), left);
        node.insert("right".into(), right);
        Ok(Value::Object(node))
    }

    fn number(&mut self, value: f64) -> Result<Value, BridgeError> {
        let number = Number::from_f64(value).ok_or(BridgeError::NonFiniteNumber(value))?;
        self.built += 1;
        Ok(json!({ "number": number }))
    }

    fn identifier(&mut self, name: &str) -> Result<Value, BridgeError> {
        self.built += 1;
        Ok(json!({ "id": name }))
    }
}

/// Converts every tree of a forest, in order. Nothing is returned unless every tree
/// converts.
pub fn forest_to_json<'a, I>(trees: I) -> Result<Value, BridgeError>
where
    I: IntoIterator<Item = &'a Ast>,
{
    let mut builder = JsonTreeBuilder::new();
    let converted = trees
        .into_iter()
        .map(|tree| tree.build(&mut builder))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(converted))
}
