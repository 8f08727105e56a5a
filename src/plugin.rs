//! Plugin surface: the two narrow hooks the query-execution framework calls.
//!
//! One [`FieldCryptoPlugin`] instance carries the full configuration for a
//! logical connection or a single query. Both hooks are synchronous, hold no
//! mutable state, and may run concurrently from independent callers.
//!
//! Parameters are validated lazily, at the first actual encrypt/decrypt
//! attempt: a plugin whose field sets never match anything never triggers
//! validation, so a syntactically-present but unexercised configuration is
//! not an error.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::QueryNode;
use crate::error::CryptoError;
use crate::params::CipherParameters;
use crate::rows::{decrypt_rows, QueryResult};
use crate::transformer::CryptoTransformer;

/// Caller-supplied configuration for one plugin instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoPluginOptions {
    /// Columns whose literals are encrypted in outgoing queries. Use the
    /// result alias if one is applied.
    #[serde(default)]
    pub fields_to_encrypt: HashSet<String>,

    /// Columns whose values are decrypted in result rows. Use the result
    /// alias if one is applied.
    #[serde(default)]
    pub fields_to_decrypt: HashSet<String>,

    /// Cipher configuration shared by both directions.
    pub cipher_parameters: CipherParameters,
}

/// Transparent field-level encryption for a query pipeline.
///
/// Encrypted-and-filterable columns rely on deterministic ciphertext, so the
/// cipher parameters must carry an explicit fixed IV (or use ECB / a
/// keystream cipher); the validator enforces this by rejecting chaining
/// modes without an IV.
///
/// ```
/// use querycrypt::{
///     BinaryOperator, CipherAlgorithm, CipherParameters, CryptoPluginOptions,
///     FieldCryptoPlugin, QueryNode, Scalar,
/// };
///
/// let plugin = FieldCryptoPlugin::new(CryptoPluginOptions {
///     fields_to_encrypt: ["last_name".to_string()].into(),
///     fields_to_decrypt: ["last_name".to_string()].into(),
///     cipher_parameters: CipherParameters::new(
///         CipherAlgorithm::Aes,
///         "996bf1b118a02007ea2c7001d92e0f91",
///     )
///     .with_iv_hex("df77b550164054c9e671ebbf2f9976b0"),
/// });
///
/// let filter = QueryNode::comparison("last_name", BinaryOperator::Eq, Scalar::Text("Jack".into()));
/// let transformed = plugin.transform_query(&filter)?;
/// assert_ne!(transformed, filter);
/// # Ok::<(), querycrypt::CryptoError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FieldCryptoPlugin {
    options: CryptoPluginOptions,
}

impl FieldCryptoPlugin {
    /// Create a plugin over the given options.
    pub fn new(options: CryptoPluginOptions) -> Self {
        Self { options }
    }

    /// The configuration this plugin was built with.
    pub fn options(&self) -> &CryptoPluginOptions {
        &self.options
    }

    /// Query transform hook: returns a new tree with configured column
    /// literals encrypted. Invoked once per outgoing query.
    ///
    /// # Errors
    ///
    /// Propagates any [`CryptoError`] from parameter validation or the
    /// cipher engine.
    pub fn transform_query(&self, node: &QueryNode) -> Result<QueryNode, CryptoError> {
        debug!(
            fields = self.options.fields_to_encrypt.len(),
            "transforming outgoing query"
        );
        CryptoTransformer::new(
            &self.options.fields_to_encrypt,
            &self.options.cipher_parameters,
        )
        .transform_node(node)
    }

    /// Result transform hook: returns a new result set with configured
    /// columns decrypted and all metadata preserved. Invoked once per
    /// completed query.
    ///
    /// # Errors
    ///
    /// Propagates any [`CryptoError`] from parameter validation or the
    /// cipher engine.
    pub fn transform_result(&self, result: &QueryResult) -> Result<QueryResult, CryptoError> {
        debug!(
            rows = result.rows.len(),
            fields = self.options.fields_to_decrypt.len(),
            "transforming result rows"
        );
        Ok(QueryResult {
            rows: decrypt_rows(
                &result.rows,
                &self.options.fields_to_decrypt,
                &self.options.cipher_parameters,
            )?,
            ..result.clone()
        })
    }
}
