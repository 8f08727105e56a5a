//! Error types raised by the cipher layer and the query/result transforms.

use thiserror::Error;

use crate::params::{CipherAlgorithm, CipherMode};

/// Errors produced while validating cipher parameters or running the cipher
/// engine.
///
/// Validation failures are the dominant user-visible error surface: they are
/// raised at the first encrypt/decrypt attempt, not when the configuration is
/// constructed, and are never recovered internally; they propagate out of
/// [`transform_query`](crate::plugin::FieldCryptoPlugin::transform_query) /
/// [`transform_result`](crate::plugin::FieldCryptoPlugin::transform_result)
/// as query failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The secret key is absent (empty string).
    #[error("cipher algorithm and secret key are required")]
    MissingRequiredParameter,

    /// The secret key or IV is not a well-formed even-length hex string.
    /// The payload names the offending parameter (`"secret key"` or `"iv"`).
    #[error("{0} must be a valid hexadecimal string with an even number of characters")]
    MalformedHex(&'static str),

    /// The key byte length falls outside the algorithm's allowed range.
    #[error("invalid key length for {algorithm}: got {actual} bytes, expected {min}..={max} bytes")]
    InvalidKeyLength {
        /// Algorithm the key was checked against.
        algorithm: CipherAlgorithm,
        /// Actual key length in bytes.
        actual: usize,
        /// Minimum allowed key length in bytes.
        min: usize,
        /// Maximum allowed key length in bytes.
        max: usize,
    },

    /// A chaining mode over a block cipher requires an IV and none was given.
    #[error("IV required for {algorithm} in {mode} mode")]
    MissingIv {
        /// Algorithm the IV rule was checked against.
        algorithm: CipherAlgorithm,
        /// Chaining mode that requires the IV.
        mode: CipherMode,
    },

    /// An IV was supplied where none is allowed (ECB mode or a keystream-only
    /// cipher).
    #[error("IV not allowed for {algorithm} in {mode} mode")]
    UnexpectedIv {
        /// Algorithm the IV rule was checked against.
        algorithm: CipherAlgorithm,
        /// Effective mode in force when the IV was rejected.
        mode: CipherMode,
    },

    /// The IV byte length does not equal the algorithm's block size.
    #[error("IV must be {expected} bytes for {algorithm}, got {actual}")]
    InvalidIvLength {
        /// Algorithm the IV was checked against.
        algorithm: CipherAlgorithm,
        /// Required IV length in bytes (the algorithm's block size).
        expected: usize,
        /// Actual IV length in bytes.
        actual: usize,
    },

    /// `NoPadding` was selected and the plaintext is not a whole number of
    /// blocks, so the block cipher cannot be applied.
    #[error("plaintext length {length} is not a multiple of the {block_size}-byte block size")]
    InvalidPlaintextLength {
        /// Plaintext length in bytes.
        length: usize,
        /// Block size of the selected algorithm.
        block_size: usize,
    },

    /// The ciphertext could not be decoded back to plaintext: invalid base64,
    /// a failed padding check (wrong key or IV, corrupted input), or output
    /// that is not valid UTF-8.
    #[error("decryption failed: ciphertext does not decode under the given parameters")]
    DecryptionFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_parameter() {
        assert!(CryptoError::MalformedHex("secret key")
            .to_string()
            .contains("secret key"));
        assert!(CryptoError::MalformedHex("iv").to_string().contains("iv"));
    }

    #[test]
    fn display_includes_key_length_context() {
        let e = CryptoError::InvalidKeyLength {
            algorithm: CipherAlgorithm::Aes,
            actual: 7,
            min: 16,
            max: 32,
        };
        let msg = e.to_string();
        assert!(msg.contains("AES"), "{msg}");
        assert!(msg.contains('7'), "{msg}");
        assert!(msg.contains("16..=32"), "{msg}");
    }

    #[test]
    fn display_includes_iv_context() {
        let e = CryptoError::MissingIv {
            algorithm: CipherAlgorithm::Des,
            mode: CipherMode::Cbc,
        };
        let msg = e.to_string();
        assert!(msg.contains("DES"), "{msg}");
        assert!(msg.contains("CBC"), "{msg}");
    }
}
