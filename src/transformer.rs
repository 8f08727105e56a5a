//! Bottom-up query tree rewrite that encrypts configured column literals.
//!
//! The traversal is a structural recursion: children are transformed first
//! (so comparisons nested under an UPDATE's WHERE clause are reached), then a
//! shape-specific rewrite applies to the value-bearing shapes: insert value
//! lists, update assignments, and `column OP literal` comparisons.
//! Every other node kind passes through as identity. The input tree is never
//! mutated; a new tree is produced, or the whole call fails with the engine's
//! error.

use std::collections::HashSet;

use tracing::trace;

use crate::ast::{
    BinaryOperationNode, ColumnUpdateNode, DeleteNode, InsertNode, QueryNode, Scalar, SelectNode,
    UpdateNode,
};
use crate::crypto::engine::{process, Direction};
use crate::error::CryptoError;
use crate::params::CipherParameters;

/// Rewrites literals of configured columns to ciphertext.
///
/// Borrows its configuration for one transformation pass; holds no mutable
/// state, so concurrent passes over independent trees need no coordination.
pub struct CryptoTransformer<'a> {
    fields_to_encrypt: &'a HashSet<String>,
    cipher_parameters: &'a CipherParameters,
}

impl<'a> CryptoTransformer<'a> {
    /// Create a transformer over the given field set and cipher parameters.
    pub fn new(
        fields_to_encrypt: &'a HashSet<String>,
        cipher_parameters: &'a CipherParameters,
    ) -> Self {
        Self {
            fields_to_encrypt,
            cipher_parameters,
        }
    }

    /// Transform `node` into a new tree with configured column literals
    /// encrypted.
    ///
    /// # Errors
    ///
    /// Propagates any [`CryptoError`] raised by the cipher engine; no
    /// partially rewritten tree is returned.
    pub fn transform_node(&self, node: &QueryNode) -> Result<QueryNode, CryptoError> {
        let transformed = match node {
            QueryNode::Insert(insert) => QueryNode::Insert(self.transform_insert(insert)?),
            QueryNode::Update(update) => QueryNode::Update(UpdateNode {
                table: update.table.clone(),
                assignments: update
                    .assignments
                    .iter()
                    .map(|assignment| self.transform_column_update(assignment))
                    .collect::<Result<_, _>>()?,
                filter: self.transform_filter(&update.filter)?,
            }),
            QueryNode::Select(select) => QueryNode::Select(SelectNode {
                table: select.table.clone(),
                projection: select.projection.clone(),
                filter: self.transform_filter(&select.filter)?,
            }),
            QueryNode::Delete(delete) => QueryNode::Delete(DeleteNode {
                table: delete.table.clone(),
                filter: self.transform_filter(&delete.filter)?,
            }),
            QueryNode::BinaryOperation(operation) => {
                QueryNode::BinaryOperation(self.transform_binary_operation(operation)?)
            }
            QueryNode::And(operands) => QueryNode::And(self.transform_all(operands)?),
            QueryNode::Or(operands) => QueryNode::Or(self.transform_all(operands)?),
            QueryNode::FunctionCall { name, args } => QueryNode::FunctionCall {
                name: name.clone(),
                args: self.transform_all(args)?,
            },
            // Leaves and unrecognised shapes: identity.
            other => other.clone(),
        };
        Ok(transformed)
    }

    fn transform_all(&self, nodes: &[QueryNode]) -> Result<Vec<QueryNode>, CryptoError> {
        nodes.iter().map(|node| self.transform_node(node)).collect()
    }

    fn transform_filter(
        &self,
        filter: &Option<Box<QueryNode>>,
    ) -> Result<Option<Box<QueryNode>>, CryptoError> {
        filter
            .as_deref()
            .map(|node| self.transform_node(node).map(Box::new))
            .transpose()
    }

    /// Insert rewrite: pair each row value with its column by position and
    /// encrypt configured non-empty text literals. Positions past the end of
    /// the column list (ragged rows) pass through untouched.
    fn transform_insert(&self, insert: &InsertNode) -> Result<InsertNode, CryptoError> {
        let rows = insert
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(idx, value)| {
                        let value = self.transform_node(value)?;
                        match insert.columns.get(idx) {
                            Some(column) => self.encrypt_value_node(column, value),
                            None => Ok(value),
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InsertNode {
            table: insert.table.clone(),
            columns: insert.columns.clone(),
            rows,
        })
    }

    /// Assignment rewrite: encrypt when the column is configured, the value
    /// is a non-empty text literal, and the ciphertext differs from the
    /// current raw value.
    fn transform_column_update(
        &self,
        assignment: &ColumnUpdateNode,
    ) -> Result<ColumnUpdateNode, CryptoError> {
        let value = self.transform_node(&assignment.value)?;
        let value = self.encrypt_if_changed(&assignment.column, value)?;
        Ok(ColumnUpdateNode {
            column: assignment.column.clone(),
            value: Box::new(value),
        })
    }

    /// Comparison rewrite: only the `Column(..) OP Value(..)` shape is
    /// touched. Comparisons against sub-queries, expressions, or parameters
    /// are left alone; encrypting those is undefined.
    fn transform_binary_operation(
        &self,
        operation: &BinaryOperationNode,
    ) -> Result<BinaryOperationNode, CryptoError> {
        let left = self.transform_node(&operation.left)?;
        let right = self.transform_node(&operation.right)?;

        let right = match &left {
            QueryNode::Column(column) => self.encrypt_if_changed(column, right)?,
            _ => right,
        };

        Ok(BinaryOperationNode {
            left: Box::new(left),
            op: operation.op,
            right: Box::new(right),
        })
    }

    /// Replace a literal value node with its ciphertext when the column is
    /// configured for encryption. Non-literals, non-text scalars and empty
    /// values pass through.
    fn encrypt_value_node(&self, column: &str, node: QueryNode) -> Result<QueryNode, CryptoError> {
        match self.maybe_encrypt(column, &node)? {
            Some(ciphertext) => Ok(QueryNode::Value(Scalar::Text(ciphertext))),
            None => Ok(node),
        }
    }

    /// Like [`encrypt_value_node`](Self::encrypt_value_node), but only
    /// replaces when the ciphertext differs from the current raw value.
    fn encrypt_if_changed(&self, column: &str, node: QueryNode) -> Result<QueryNode, CryptoError> {
        match self.maybe_encrypt(column, &node)? {
            Some(ciphertext) if !current_value_is(&node, &ciphertext) => {
                Ok(QueryNode::Value(Scalar::Text(ciphertext)))
            }
            _ => Ok(node),
        }
    }

    /// Encrypt the node's text payload when the column is configured and the
    /// payload is non-empty. `Ok(None)` means "leave the node alone".
    fn maybe_encrypt(&self, column: &str, node: &QueryNode) -> Result<Option<String>, CryptoError> {
        if !self.fields_to_encrypt.contains(column) {
            return Ok(None);
        }
        let QueryNode::Value(scalar) = node else {
            return Ok(None);
        };
        let Some(plaintext) = scalar.non_empty_text() else {
            return Ok(None);
        };
        trace!(column, "encrypting literal");
        process(plaintext, Direction::Encrypt, self.cipher_parameters).map(Some)
    }
}

fn current_value_is(node: &QueryNode, expected: &str) -> bool {
    matches!(node, QueryNode::Value(Scalar::Text(current)) if current == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOperator;
    use crate::params::CipherAlgorithm;

    const KEY: &str = "996bf1b118a02007ea2c7001d92e0f91";
    const IV: &str = "df77b550164054c9e671ebbf2f9976b0";
    const JACK_CIPHERTEXT: &str = "Q0eMtQg9BFlPEGhHjeHrEA==";

    fn params() -> CipherParameters {
        CipherParameters::new(CipherAlgorithm::Aes, KEY).with_iv_hex(IV)
    }

    fn fields(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn transform(node: &QueryNode, encrypt: &[&str]) -> Result<QueryNode, CryptoError> {
        let fields = fields(encrypt);
        let params = params();
        CryptoTransformer::new(&fields, &params).transform_node(node)
    }

    fn insert_people() -> QueryNode {
        QueryNode::Insert(InsertNode {
            table: "person".into(),
            columns: vec!["first_name".into(), "last_name".into()],
            rows: vec![
                vec![QueryNode::text("Max"), QueryNode::text("Jack")],
                vec![QueryNode::text("George"), QueryNode::text("Rossi")],
            ],
        })
    }

    #[test]
    fn insert_encrypts_only_configured_columns() {
        let transformed = transform(&insert_people(), &["last_name"]).unwrap();
        let QueryNode::Insert(insert) = transformed else {
            panic!("insert expected");
        };
        assert_eq!(insert.rows[0][0], QueryNode::text("Max"));
        assert_eq!(insert.rows[0][1], QueryNode::text(JACK_CIPHERTEXT));
        assert_eq!(insert.rows[1][0], QueryNode::text("George"));
        assert_ne!(insert.rows[1][1], QueryNode::text("Rossi"));
    }

    #[test]
    fn empty_field_set_is_identity() {
        let tree = insert_people();
        assert_eq!(transform(&tree, &[]).unwrap(), tree);
    }

    #[test]
    fn ragged_row_passes_through_without_error() {
        let tree = QueryNode::Insert(InsertNode {
            table: "person".into(),
            columns: vec!["first_name".into()],
            rows: vec![vec![QueryNode::text("Max"), QueryNode::text("stray")]],
        });
        let QueryNode::Insert(insert) = transform(&tree, &["last_name"]).unwrap() else {
            panic!("insert expected");
        };
        // Second position has no column name; it stays untouched.
        assert_eq!(insert.rows[0][1], QueryNode::text("stray"));
    }

    #[test]
    fn empty_and_null_insert_values_are_skipped() {
        let tree = QueryNode::Insert(InsertNode {
            table: "person".into(),
            columns: vec!["last_name".into(), "last_name".into()],
            rows: vec![vec![QueryNode::text(""), QueryNode::Value(Scalar::Null)]],
        });
        let QueryNode::Insert(insert) = transform(&tree, &["last_name"]).unwrap() else {
            panic!("insert expected");
        };
        assert_eq!(insert.rows[0][0], QueryNode::text(""));
        assert_eq!(insert.rows[0][1], QueryNode::Value(Scalar::Null));
    }

    #[test]
    fn non_text_insert_values_are_skipped() {
        let tree = QueryNode::Insert(InsertNode {
            table: "person".into(),
            columns: vec!["last_name".into()],
            rows: vec![vec![QueryNode::Value(Scalar::Integer(42))]],
        });
        let QueryNode::Insert(insert) = transform(&tree, &["last_name"]).unwrap() else {
            panic!("insert expected");
        };
        assert_eq!(insert.rows[0][0], QueryNode::Value(Scalar::Integer(42)));
    }

    #[test]
    fn parameter_placeholders_are_never_rewritten() {
        let tree = QueryNode::Insert(InsertNode {
            table: "person".into(),
            columns: vec!["last_name".into()],
            rows: vec![vec![QueryNode::Parameter(1)]],
        });
        let QueryNode::Insert(insert) = transform(&tree, &["last_name"]).unwrap() else {
            panic!("insert expected");
        };
        assert_eq!(insert.rows[0][0], QueryNode::Parameter(1));
    }

    #[test]
    fn update_assignment_is_encrypted() {
        let tree = QueryNode::Update(UpdateNode {
            table: "person".into(),
            assignments: vec![
                ColumnUpdateNode {
                    column: "last_name".into(),
                    value: Box::new(QueryNode::text("Jack")),
                },
                ColumnUpdateNode {
                    column: "first_name".into(),
                    value: Box::new(QueryNode::text("Max")),
                },
            ],
            filter: None,
        });
        let QueryNode::Update(update) = transform(&tree, &["last_name"]).unwrap() else {
            panic!("update expected");
        };
        assert_eq!(*update.assignments[0].value, QueryNode::text(JACK_CIPHERTEXT));
        assert_eq!(*update.assignments[1].value, QueryNode::text("Max"));
    }

    #[test]
    fn comparison_literal_is_encrypted_for_configured_column() {
        let tree = QueryNode::comparison("last_name", BinaryOperator::Eq, Scalar::Text("Jack".into()));
        let QueryNode::BinaryOperation(op) = transform(&tree, &["last_name"]).unwrap() else {
            panic!("comparison expected");
        };
        assert_eq!(*op.right, QueryNode::text(JACK_CIPHERTEXT));
    }

    #[test]
    fn comparison_nested_under_update_filter_is_reached() {
        let tree = QueryNode::Update(UpdateNode {
            table: "person".into(),
            assignments: vec![ColumnUpdateNode {
                column: "last_name".into(),
                value: Box::new(QueryNode::text("JackNEW")),
            }],
            filter: Some(Box::new(QueryNode::And(vec![
                QueryNode::comparison("last_name", BinaryOperator::Eq, Scalar::Text("Jack".into())),
                QueryNode::comparison("gender", BinaryOperator::Eq, Scalar::Text("man".into())),
            ]))),
        });
        let QueryNode::Update(update) = transform(&tree, &["last_name"]).unwrap() else {
            panic!("update expected");
        };
        let QueryNode::And(operands) = *update.filter.unwrap() else {
            panic!("conjunction expected");
        };
        let QueryNode::BinaryOperation(first) = &operands[0] else {
            panic!("comparison expected");
        };
        assert_eq!(*first.right, QueryNode::text(JACK_CIPHERTEXT));
        // The unconfigured column's literal is untouched.
        let QueryNode::BinaryOperation(second) = &operands[1] else {
            panic!("comparison expected");
        };
        assert_eq!(*second.right, QueryNode::text("man"));
    }

    #[test]
    fn comparison_with_non_column_left_operand_is_untouched() {
        let tree = QueryNode::BinaryOperation(BinaryOperationNode {
            left: Box::new(QueryNode::FunctionCall {
                name: "lower".into(),
                args: vec![QueryNode::Column("last_name".into())],
            }),
            op: BinaryOperator::Eq,
            right: Box::new(QueryNode::text("jack")),
        });
        assert_eq!(transform(&tree, &["last_name"]).unwrap(), tree);
    }

    #[test]
    fn comparison_with_non_literal_right_operand_is_untouched() {
        let tree = QueryNode::BinaryOperation(BinaryOperationNode {
            left: Box::new(QueryNode::Column("last_name".into())),
            op: BinaryOperator::Eq,
            right: Box::new(QueryNode::Parameter(1)),
        });
        assert_eq!(transform(&tree, &["last_name"]).unwrap(), tree);
    }

    #[test]
    fn unhandled_shapes_pass_through_as_identity() {
        let tree = QueryNode::Raw("PRAGMA journal_mode = WAL".into());
        assert_eq!(transform(&tree, &["last_name"]).unwrap(), tree);
        let tree = QueryNode::Select(SelectNode {
            table: "person".into(),
            projection: vec!["id".into()],
            filter: None,
        });
        assert_eq!(transform(&tree, &["last_name"]).unwrap(), tree);
    }

    #[test]
    fn engine_error_aborts_the_whole_transform() {
        let fields = fields(&["last_name"]);
        // CBC without an IV: invalid, but only exercised when a field matches.
        let params = CipherParameters::new(CipherAlgorithm::Aes, KEY);
        let transformer = CryptoTransformer::new(&fields, &params);

        let untouched = QueryNode::comparison("other", BinaryOperator::Eq, Scalar::Text("x".into()));
        assert!(transformer.transform_node(&untouched).is_ok());

        let touched = QueryNode::comparison("last_name", BinaryOperator::Eq, Scalar::Text("x".into()));
        assert_eq!(
            transformer.transform_node(&touched),
            Err(CryptoError::MissingIv {
                algorithm: CipherAlgorithm::Aes,
                mode: crate::params::CipherMode::Cbc,
            })
        );
    }

    #[test]
    fn deterministic_rewrite_matches_insert_and_filter() {
        // The filter literal must encrypt to the same ciphertext the insert
        // stored, otherwise equality filters on encrypted columns break.
        let inserted = transform(&insert_people(), &["last_name"]).unwrap();
        let QueryNode::Insert(insert) = inserted else {
            panic!("insert expected");
        };
        let filter =
            QueryNode::comparison("last_name", BinaryOperator::Eq, Scalar::Text("Jack".into()));
        let QueryNode::BinaryOperation(op) = transform(&filter, &["last_name"]).unwrap() else {
            panic!("comparison expected");
        };
        assert_eq!(*op.right, insert.rows[0][1]);
    }
}
