//! Result row decryption.
//!
//! Rows come back from execution as ordered column-name → scalar mappings.
//! Only columns named in the decrypt set and holding a non-empty text value
//! are touched; nulls, empty strings, non-text scalars and unlisted columns
//! pass through unchanged, as does all execution metadata.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::Scalar;
use crate::crypto::engine::{process, Direction};
use crate::error::CryptoError;
use crate::params::CipherParameters;

/// One result row: an insertion-ordered mapping of column name to value.
pub type ResultRow = IndexMap<String, Scalar>;

/// A completed query's result set plus execution metadata.
///
/// The metadata fields are carried through [`decrypt_rows`]-based transforms
/// untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Returned rows, in execution order.
    pub rows: Vec<ResultRow>,
    /// Rows affected by an INSERT/UPDATE/DELETE, if reported.
    #[serde(default)]
    pub num_affected_rows: Option<u64>,
    /// Last inserted row id, if reported.
    #[serde(default)]
    pub last_insert_id: Option<u64>,
}

/// Produce a new row set with the named columns' text values decrypted.
///
/// Row order and per-row column order are preserved.
///
/// # Errors
///
/// Propagates any [`CryptoError`] from the cipher engine; no partially
/// decrypted row set is returned.
pub fn decrypt_rows(
    rows: &[ResultRow],
    fields_to_decrypt: &HashSet<String>,
    cipher_parameters: &CipherParameters,
) -> Result<Vec<ResultRow>, CryptoError> {
    rows.iter()
        .map(|row| decrypt_row(row, fields_to_decrypt, cipher_parameters))
        .collect()
}

fn decrypt_row(
    row: &ResultRow,
    fields_to_decrypt: &HashSet<String>,
    cipher_parameters: &CipherParameters,
) -> Result<ResultRow, CryptoError> {
    row.iter()
        .map(|(column, value)| {
            let value = match value.non_empty_text() {
                Some(ciphertext) if fields_to_decrypt.contains(column) => {
                    Scalar::Text(process(ciphertext, Direction::Decrypt, cipher_parameters)?)
                }
                _ => value.clone(),
            };
            Ok((column.clone(), value))
        })
        .collect()
}
