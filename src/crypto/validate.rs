//! Cipher parameter validation.
//!
//! Every encrypt/decrypt call runs through [`validate`] before any
//! cryptographic operation. The rules are evaluated in a fixed order and the
//! first failure wins, so callers see a stable, predictable error for a given
//! misconfiguration.
//!
//! A chaining mode over a block cipher with no IV is rejected outright rather
//! than silently falling back to a random IV: a random IV would make the
//! ciphertext non-deterministic, which breaks both decrypt-on-read (the IV is
//! not stored with the ciphertext) and equality filters on encrypted columns.

use crate::error::CryptoError;
use crate::params::{CipherMode, CipherParameters};

/// Validate `params` against the per-algorithm constraints.
///
/// Rule order (first failure wins):
///
/// 1. The secret key must be present (non-empty).
/// 2. The secret key must be well-formed even-length hex.
/// 3. The key byte length must fall within the algorithm's allowed range.
/// 4. IV presence/length must satisfy the mode × algorithm rule: ECB and
///    keystream-only ciphers forbid an IV; every other mode over a cipher
///    with a nonzero block size requires an IV of exactly the block size.
///
/// # Errors
///
/// See [`CryptoError`] for the failure taxonomy; this function raises every
/// variant except [`CryptoError::DecryptionFailed`] and
/// [`CryptoError::InvalidPlaintextLength`].
pub fn validate(params: &CipherParameters) -> Result<(), CryptoError> {
    if params.secret_key_hex.is_empty() {
        return Err(CryptoError::MissingRequiredParameter);
    }
    check_hex(&params.secret_key_hex, "secret key")?;

    let algorithm = params.algorithm;
    let key_len = params.secret_key_hex.len() / 2;
    let range = algorithm.key_length_range();
    if !range.contains(&key_len) {
        return Err(CryptoError::InvalidKeyLength {
            algorithm,
            actual: key_len,
            min: *range.start(),
            max: *range.end(),
        });
    }

    let mode = params.effective_mode();
    let block_size = algorithm.block_size();

    if mode == CipherMode::Ecb || block_size == 0 {
        // No chaining state to seed: an IV is meaningless here.
        if params.iv_hex.is_some() {
            return Err(CryptoError::UnexpectedIv { algorithm, mode });
        }
        return Ok(());
    }

    let iv_hex = params
        .iv_hex
        .as_deref()
        .ok_or(CryptoError::MissingIv { algorithm, mode })?;
    check_hex(iv_hex, "iv")?;
    let iv_len = iv_hex.len() / 2;
    if iv_len != block_size {
        return Err(CryptoError::InvalidIvLength {
            algorithm,
            expected: block_size,
            actual: iv_len,
        });
    }

    Ok(())
}

/// Check that `input` is a non-empty, even-length string of hex digits.
fn check_hex(input: &str, name: &'static str) -> Result<(), CryptoError> {
    hex::decode(input)
        .map(|_| ())
        .map_err(|_| CryptoError::MalformedHex(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CipherAlgorithm, PaddingScheme};

    const AES_KEY: &str = "996bf1b118a02007ea2c7001d92e0f91";
    const AES_IV: &str = "df77b550164054c9e671ebbf2f9976b0";

    fn aes_cbc() -> CipherParameters {
        CipherParameters::new(CipherAlgorithm::Aes, AES_KEY).with_iv_hex(AES_IV)
    }

    #[test]
    fn valid_aes_cbc_passes() {
        assert_eq!(validate(&aes_cbc()), Ok(()));
    }

    #[test]
    fn empty_key_is_missing_parameter() {
        let params = CipherParameters::new(CipherAlgorithm::Aes, "");
        assert_eq!(validate(&params), Err(CryptoError::MissingRequiredParameter));
    }

    #[test]
    fn odd_length_key_is_malformed_hex() {
        // One hex character short of a full byte.
        let params = CipherParameters::new(CipherAlgorithm::Aes, &AES_KEY[..31]).with_iv_hex(AES_IV);
        assert_eq!(validate(&params), Err(CryptoError::MalformedHex("secret key")));
    }

    #[test]
    fn non_hex_key_is_malformed_hex() {
        let params = CipherParameters::new(CipherAlgorithm::Aes, "zz".repeat(16)).with_iv_hex(AES_IV);
        assert_eq!(validate(&params), Err(CryptoError::MalformedHex("secret key")));
    }

    #[test]
    fn key_outside_range_is_rejected() {
        let params = CipherParameters::new(CipherAlgorithm::Des, "00".repeat(16));
        assert_eq!(
            validate(&params),
            Err(CryptoError::InvalidKeyLength {
                algorithm: CipherAlgorithm::Des,
                actual: 16,
                min: 8,
                max: 8,
            })
        );
    }

    #[test]
    fn ecb_with_iv_is_unexpected_iv() {
        let params = CipherParameters::new(CipherAlgorithm::Aes, AES_KEY)
            .with_mode(CipherMode::Ecb)
            .with_iv_hex(AES_IV);
        assert_eq!(
            validate(&params),
            Err(CryptoError::UnexpectedIv {
                algorithm: CipherAlgorithm::Aes,
                mode: CipherMode::Ecb,
            })
        );
    }

    #[test]
    fn ecb_without_iv_passes() {
        let params = CipherParameters::new(CipherAlgorithm::Aes, AES_KEY)
            .with_mode(CipherMode::Ecb)
            .with_padding(PaddingScheme::Iso97971);
        assert_eq!(validate(&params), Ok(()));
    }

    #[test]
    fn chaining_mode_without_iv_is_missing_iv() {
        let params = CipherParameters::new(CipherAlgorithm::Aes, AES_KEY);
        assert_eq!(
            validate(&params),
            Err(CryptoError::MissingIv {
                algorithm: CipherAlgorithm::Aes,
                mode: CipherMode::Cbc,
            })
        );
    }

    #[test]
    fn stream_cipher_with_iv_is_unexpected_iv() {
        let params = CipherParameters::new(CipherAlgorithm::Rc4, AES_KEY).with_iv_hex(AES_IV);
        assert_eq!(
            validate(&params),
            Err(CryptoError::UnexpectedIv {
                algorithm: CipherAlgorithm::Rc4,
                mode: CipherMode::Cbc,
            })
        );
    }

    #[test]
    fn stream_cipher_without_iv_passes_under_default_mode() {
        let params = CipherParameters::new(CipherAlgorithm::Rc4, AES_KEY);
        assert_eq!(validate(&params), Ok(()));
    }

    #[test]
    fn malformed_iv_is_reported_as_iv() {
        let params = CipherParameters::new(CipherAlgorithm::Aes, AES_KEY).with_iv_hex("not-hex!");
        assert_eq!(validate(&params), Err(CryptoError::MalformedHex("iv")));
    }

    #[test]
    fn wrong_iv_length_is_rejected() {
        let params = CipherParameters::new(CipherAlgorithm::Aes, AES_KEY).with_iv_hex("00".repeat(8));
        assert_eq!(
            validate(&params),
            Err(CryptoError::InvalidIvLength {
                algorithm: CipherAlgorithm::Aes,
                expected: 16,
                actual: 8,
            })
        );
    }

    #[test]
    fn rabbit_requires_an_eight_byte_iv() {
        let params = CipherParameters::new(CipherAlgorithm::Rabbit, "00".repeat(16));
        assert_eq!(
            validate(&params),
            Err(CryptoError::MissingIv {
                algorithm: CipherAlgorithm::Rabbit,
                mode: CipherMode::Cbc,
            })
        );
        let params = params.with_iv_hex("00".repeat(8));
        assert_eq!(validate(&params), Ok(()));
    }

    #[test]
    fn rabbit_legacy_forbids_an_iv() {
        let params =
            CipherParameters::new(CipherAlgorithm::RabbitLegacy, "00".repeat(16)).with_iv_hex("00".repeat(8));
        assert_eq!(
            validate(&params),
            Err(CryptoError::UnexpectedIv {
                algorithm: CipherAlgorithm::RabbitLegacy,
                mode: CipherMode::Cbc,
            })
        );
    }

    #[test]
    fn key_length_boundaries_are_inclusive() {
        for (key_bytes, ok) in [(4usize, true), (56, true), (3, false), (57, false)] {
            let params = CipherParameters::new(CipherAlgorithm::Blowfish, "ab".repeat(key_bytes))
                .with_iv_hex("00".repeat(8));
            assert_eq!(validate(&params).is_ok(), ok, "blowfish key of {key_bytes} bytes");
        }
    }
}
