//! Query syntax tree node types.
//!
//! A deliberately small, immutable tagged union standing in for the host
//! query builder's tree. The transformer only specialises on three shapes
//! (insert value lists, update assignments, binary comparisons); every other
//! node kind exists so that structural recursion with an identity default has
//! something to pass through.

use serde::{Deserialize, Serialize};

/// A scalar literal: the value space of both query literals and result-row
/// cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// SQL NULL.
    Null,
    /// Text value. The only scalar kind that is ever encrypted.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
}

impl Scalar {
    /// The text payload, if this is a non-empty text scalar.
    pub(crate) fn non_empty_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// Binary comparison operator.
///
/// The transformer never inspects the operator: every `column OP literal`
/// comparison gets its literal rewritten, which is what makes both equality
/// and inequality filters on encrypted columns line up with stored
/// ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// `=`
    Eq,
    /// `!=` / `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `LIKE`
    Like,
}

/// INSERT statement: positional column list plus one or more value rows.
///
/// Column names pair with row values by position. Rows may be ragged relative
/// to the column list; the transformer leaves stray positions untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertNode {
    /// Target table name.
    pub table: String,
    /// Target column names, in value order.
    pub columns: Vec<String>,
    /// Value rows; each element is a [`QueryNode::Value`] or
    /// [`QueryNode::Parameter`].
    pub rows: Vec<Vec<QueryNode>>,
}

/// UPDATE statement: assignments plus an optional filter subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNode {
    /// Target table name.
    pub table: String,
    /// `SET column = value` assignments.
    pub assignments: Vec<ColumnUpdateNode>,
    /// WHERE subtree, if any.
    pub filter: Option<Box<QueryNode>>,
}

/// SELECT statement: projection plus an optional filter subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectNode {
    /// Source table name.
    pub table: String,
    /// Projected column names; empty means `*`.
    pub projection: Vec<String>,
    /// WHERE subtree, if any.
    pub filter: Option<Box<QueryNode>>,
}

/// DELETE statement with an optional filter subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteNode {
    /// Target table name.
    pub table: String,
    /// WHERE subtree, if any.
    pub filter: Option<Box<QueryNode>>,
}

/// A single `column = value` update assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnUpdateNode {
    /// Target column name.
    pub column: String,
    /// New value node.
    pub value: Box<QueryNode>,
}

/// A binary comparison between two operand subtrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOperationNode {
    /// Left operand.
    pub left: Box<QueryNode>,
    /// Comparison operator.
    pub op: BinaryOperator,
    /// Right operand.
    pub right: Box<QueryNode>,
}

/// One node of the query syntax tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryNode {
    /// INSERT statement.
    Insert(InsertNode),
    /// UPDATE statement.
    Update(UpdateNode),
    /// SELECT statement.
    Select(SelectNode),
    /// DELETE statement.
    Delete(DeleteNode),
    /// Binary comparison.
    BinaryOperation(BinaryOperationNode),
    /// Conjunction of subtrees.
    And(Vec<QueryNode>),
    /// Disjunction of subtrees.
    Or(Vec<QueryNode>),
    /// Column reference.
    Column(String),
    /// Literal value.
    Value(Scalar),
    /// Positional bind-parameter placeholder. Never rewritten.
    Parameter(u32),
    /// Function invocation over argument subtrees.
    FunctionCall {
        /// Function name.
        name: String,
        /// Argument subtrees.
        args: Vec<QueryNode>,
    },
    /// Opaque SQL fragment. Never inspected.
    Raw(String),
}

impl QueryNode {
    /// Convenience constructor for a text literal node.
    pub fn text(value: impl Into<String>) -> Self {
        QueryNode::Value(Scalar::Text(value.into()))
    }

    /// Convenience constructor for a `column OP literal` comparison.
    pub fn comparison(column: impl Into<String>, op: BinaryOperator, value: Scalar) -> Self {
        QueryNode::BinaryOperation(BinaryOperationNode {
            left: Box::new(QueryNode::Column(column.into())),
            op,
            right: Box::new(QueryNode::Value(value)),
        })
    }
}
