//! Transparent field-level encryption for structured query pipelines.
//!
//! Plaintext literals heading for INSERT value lists, UPDATE assignments and
//! `column OP value` comparisons are encrypted before the query leaves the
//! caller; values coming back in result rows are decrypted before the caller
//! sees them. Which columns get which treatment is entirely caller-supplied
//! configuration; this crate decides nothing about what is sensitive.
//!
//! Pipeline:
//!
//! 1. [`FieldCryptoPlugin::transform_query`] rewrites the outgoing query tree
//!    (via [`transformer::CryptoTransformer`] and [`crypto::engine`]).
//! 2. The host framework executes the query, entirely outside this crate.
//! 3. [`FieldCryptoPlugin::transform_result`] decrypts the configured columns
//!    of the returned rows (via [`rows::decrypt_rows`]).
//!
//! Ciphertext is deterministic for a fixed key/IV/mode, which is what makes
//! equality filters on encrypted columns match stored values. The flip side:
//! a chaining mode without an explicit IV is a validation error, never a
//! silent random IV.
//!
//! Key material lives only in memory, is supplied per instantiation, and is
//! never logged. Key lifecycle, rotation, and searchable encryption schemes
//! are out of scope.

pub mod ast;
pub mod crypto;
pub mod error;
pub mod params;
pub mod plugin;
pub mod rows;
pub mod transformer;

pub use ast::{
    BinaryOperationNode, BinaryOperator, ColumnUpdateNode, DeleteNode, InsertNode, QueryNode,
    Scalar, SelectNode, UpdateNode,
};
pub use crypto::{process, Direction};
pub use error::CryptoError;
pub use params::{CipherAlgorithm, CipherMode, CipherParameters, PaddingScheme};
pub use plugin::{CryptoPluginOptions, FieldCryptoPlugin};
pub use rows::{decrypt_rows, QueryResult, ResultRow};
pub use transformer::CryptoTransformer;
