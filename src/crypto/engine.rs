//! Symmetric encrypt/decrypt of a single text value.
//!
//! [`process`] is the one place where all cryptographic algorithm branching
//! happens: a dispatch over [`CipherAlgorithm`] selects the concrete
//! RustCrypto cipher, the mode wrapper, and the padding. Ciphertext is
//! serialised as standard base64 of the raw cipher output, so a value is
//! round-trippable by the same engine with the same parameters and nothing
//! else; the IV is supplied by configuration, never stored alongside the
//! ciphertext.
//!
//! There is no random-IV fallback anywhere: the validator rejects a chaining
//! mode without an explicit IV, so the engine is fully deterministic. The
//! same plaintext under the same key, IV and mode always yields the same
//! ciphertext, which is what makes equality filters on encrypted columns
//! work.

use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use blowfish::Blowfish;
use cipher::block_padding::{AnsiX923, Iso10126, Iso7816, NoPadding, Pkcs7, ZeroPadding};
use cipher::{AsyncStreamCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit, StreamCipher};
use des::{Des, TdesEde3};
use rabbit::{Rabbit, RabbitKeyOnly};
use rc4::Rc4;

use crate::crypto::validate::validate;
use crate::error::CryptoError;
use crate::params::{CipherAlgorithm, CipherMode, CipherParameters, PaddingScheme};

/// Number of keystream bytes RC4Drop discards before producing output
/// (192 drop words of 4 bytes each).
const RC4_DROP_BYTES: usize = 768;

/// Whether [`process`] encrypts or decrypts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// UTF-8 plaintext in, base64 ciphertext out.
    Encrypt,
    /// Base64 ciphertext in, UTF-8 plaintext out.
    Decrypt,
}

/// Encrypt or decrypt `text` under `params`.
///
/// Validation runs first on every call; its error is propagated unchanged.
///
/// # Errors
///
/// Any [`CryptoError`] from [`validate`], [`CryptoError::InvalidPlaintextLength`]
/// when `NoPadding` meets a plaintext that is not a whole number of blocks,
/// and [`CryptoError::DecryptionFailed`] when the ciphertext is not valid
/// base64, fails the padding check, or decodes to invalid UTF-8.
pub fn process(
    text: &str,
    direction: Direction,
    params: &CipherParameters,
) -> Result<String, CryptoError> {
    validate(params)?;

    // Infallible after validation.
    let key = hex::decode(&params.secret_key_hex).map_err(|_| CryptoError::MalformedHex("secret key"))?;
    let iv = match params.iv_hex.as_deref() {
        Some(hex_iv) => Some(hex::decode(hex_iv).map_err(|_| CryptoError::MalformedHex("iv"))?),
        None => None,
    };
    let mode = params.effective_mode();
    let padding = params.effective_padding();

    match direction {
        Direction::Encrypt => {
            let ciphertext = run(
                direction,
                text.as_bytes(),
                params.algorithm,
                &key,
                iv.as_deref(),
                mode,
                padding,
            )?;
            Ok(STANDARD.encode(ciphertext))
        }
        Direction::Decrypt => {
            let raw = STANDARD
                .decode(text)
                .map_err(|_| CryptoError::DecryptionFailed)?;
            let plaintext = run(
                direction,
                &raw,
                params.algorithm,
                &key,
                iv.as_deref(),
                mode,
                padding,
            )?;
            String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
        }
    }
}

/// One block-mode operation over already-parsed key/IV bytes.
struct BlockOp<'a> {
    direction: Direction,
    data: &'a [u8],
    algorithm: CipherAlgorithm,
    key: &'a [u8],
    iv: Option<&'a [u8]>,
    mode: CipherMode,
    padding: PaddingScheme,
}

impl BlockOp<'_> {
    /// The validator guarantees an IV for every path that reaches this, but
    /// the dispatch stays total rather than unwrapping.
    fn require_iv(&self) -> Result<&[u8], CryptoError> {
        self.iv.ok_or(CryptoError::MissingIv {
            algorithm: self.algorithm,
            mode: self.mode,
        })
    }

    fn key_error(&self) -> CryptoError {
        key_error(self.algorithm, self.key.len())
    }
}

fn key_error(algorithm: CipherAlgorithm, actual: usize) -> CryptoError {
    let range = algorithm.key_length_range();
    CryptoError::InvalidKeyLength {
        algorithm,
        actual,
        min: *range.start(),
        max: *range.end(),
    }
}

/// Expand `$body` once per padding scheme, with `$p` bound to the concrete
/// `block_padding` type.
macro_rules! with_padding {
    ($padding:expr, $p:ident => $body:expr) => {
        match $padding {
            PaddingScheme::Pkcs7 => {
                type $p = Pkcs7;
                $body
            }
            PaddingScheme::AnsiX923 => {
                type $p = AnsiX923;
                $body
            }
            PaddingScheme::Iso10126 => {
                type $p = Iso10126;
                $body
            }
            PaddingScheme::Iso97971 => {
                type $p = Iso7816;
                $body
            }
            PaddingScheme::ZeroPadding => {
                type $p = ZeroPadding;
                $body
            }
            PaddingScheme::NoPadding => {
                type $p = NoPadding;
                $body
            }
        }
    };
}

/// Run a block cipher `$cipher` (with CTR flavour `$ctr`) over one [`BlockOp`].
///
/// Expanded per concrete cipher type so every mode wrapper resolves against a
/// concrete block size instead of a pile of generic bounds.
macro_rules! block_cipher {
    ($cipher:ty, $ctr:ty, $op:expr) => {{
        let op: BlockOp<'_> = $op;
        match op.mode {
            CipherMode::Cbc => {
                let iv = op.require_iv()?;
                match op.direction {
                    Direction::Encrypt => with_padding!(op.padding, P => {
                        let enc = cbc::Encryptor::<$cipher>::new_from_slices(op.key, iv)
                            .map_err(|_| op.key_error())?;
                        Ok(enc.encrypt_padded_vec_mut::<P>(op.data))
                    }),
                    Direction::Decrypt => with_padding!(op.padding, P => {
                        let dec = cbc::Decryptor::<$cipher>::new_from_slices(op.key, iv)
                            .map_err(|_| op.key_error())?;
                        dec.decrypt_padded_vec_mut::<P>(op.data)
                            .map_err(|_| CryptoError::DecryptionFailed)
                    }),
                }
            }
            CipherMode::Ecb => match op.direction {
                Direction::Encrypt => with_padding!(op.padding, P => {
                    let enc = ecb::Encryptor::<$cipher>::new_from_slice(op.key)
                        .map_err(|_| op.key_error())?;
                    Ok(enc.encrypt_padded_vec_mut::<P>(op.data))
                }),
                Direction::Decrypt => with_padding!(op.padding, P => {
                    let dec = ecb::Decryptor::<$cipher>::new_from_slice(op.key)
                        .map_err(|_| op.key_error())?;
                    dec.decrypt_padded_vec_mut::<P>(op.data)
                        .map_err(|_| CryptoError::DecryptionFailed)
                }),
            },
            CipherMode::Cfb => {
                let iv = op.require_iv()?;
                let mut buf = op.data.to_vec();
                match op.direction {
                    Direction::Encrypt => cfb_mode::Encryptor::<$cipher>::new_from_slices(op.key, iv)
                        .map_err(|_| op.key_error())?
                        .encrypt(&mut buf),
                    Direction::Decrypt => cfb_mode::Decryptor::<$cipher>::new_from_slices(op.key, iv)
                        .map_err(|_| op.key_error())?
                        .decrypt(&mut buf),
                }
                Ok(buf)
            }
            CipherMode::Ofb => {
                // OFB keystream is direction-agnostic.
                let iv = op.require_iv()?;
                let mut buf = op.data.to_vec();
                ofb::Ofb::<$cipher>::new_from_slices(op.key, iv)
                    .map_err(|_| op.key_error())?
                    .apply_keystream(&mut buf);
                Ok(buf)
            }
            CipherMode::Ctr => {
                let iv = op.require_iv()?;
                let mut buf = op.data.to_vec();
                <$ctr>::new_from_slices(op.key, iv)
                    .map_err(|_| op.key_error())?
                    .apply_keystream(&mut buf);
                Ok(buf)
            }
        }
    }};
}

/// Algorithm dispatch over raw bytes. `data` is plaintext bytes on encrypt
/// and raw (base64-decoded) ciphertext bytes on decrypt.
fn run(
    direction: Direction,
    data: &[u8],
    algorithm: CipherAlgorithm,
    key: &[u8],
    iv: Option<&[u8]>,
    mode: CipherMode,
    padding: PaddingScheme,
) -> Result<Vec<u8>, CryptoError> {
    // NoPadding cannot extend the plaintext to the block boundary; reject
    // unaligned input before the mode wrapper panics on it.
    if direction == Direction::Encrypt
        && algorithm.is_block_cipher()
        && matches!(mode, CipherMode::Cbc | CipherMode::Ecb)
        && padding == PaddingScheme::NoPadding
        && data.len() % algorithm.block_size() != 0
    {
        return Err(CryptoError::InvalidPlaintextLength {
            length: data.len(),
            block_size: algorithm.block_size(),
        });
    }

    let op = BlockOp {
        direction,
        data,
        algorithm,
        key,
        iv,
        mode,
        padding,
    };

    match algorithm {
        CipherAlgorithm::Aes => match key.len() {
            16 => block_cipher!(Aes128, ctr::Ctr128BE<Aes128>, op),
            24 => block_cipher!(Aes192, ctr::Ctr128BE<Aes192>, op),
            32 => block_cipher!(Aes256, ctr::Ctr128BE<Aes256>, op),
            other => Err(key_error(algorithm, other)),
        },
        CipherAlgorithm::Des => block_cipher!(Des, ctr::Ctr64BE<Des>, op),
        CipherAlgorithm::TripleDes => block_cipher!(TdesEde3, ctr::Ctr64BE<TdesEde3>, op),
        CipherAlgorithm::Blowfish => block_cipher!(Blowfish, ctr::Ctr64BE<Blowfish>, op),
        CipherAlgorithm::Rabbit | CipherAlgorithm::RabbitLegacy => {
            rabbit_keystream(algorithm, key, iv, data)
        }
        CipherAlgorithm::Rc4 => rc4_keystream(algorithm, key, data, 0),
        CipherAlgorithm::Rc4Drop => rc4_keystream(algorithm, key, data, RC4_DROP_BYTES),
    }
}

/// Rabbit keystream application. With an IV this is the full Rabbit IV setup;
/// without one (RabbitLegacy, or Rabbit under ECB) the key-only variant runs.
fn rabbit_keystream(
    algorithm: CipherAlgorithm,
    key: &[u8],
    iv: Option<&[u8]>,
    data: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut buf = data.to_vec();
    match iv {
        Some(iv) => Rabbit::new_from_slices(key, iv)
            .map_err(|_| key_error(algorithm, key.len()))?
            .apply_keystream(&mut buf),
        None => RabbitKeyOnly::new_from_slice(key)
            .map_err(|_| key_error(algorithm, key.len()))?
            .apply_keystream(&mut buf),
    }
    Ok(buf)
}

/// RC4 keystream application with an optional keystream prefix discard.
///
/// The `rc4` crate sizes keys at the type level, so the supported 1..=32 byte
/// key lengths are expanded arm by arm.
fn rc4_keystream(
    algorithm: CipherAlgorithm,
    key: &[u8],
    data: &[u8],
    drop_bytes: usize,
) -> Result<Vec<u8>, CryptoError> {
    use rc4::consts::*;

    macro_rules! keyed {
        ($($len:literal => $sz:ident),+ $(,)?) => {
            match key.len() {
                $(
                    $len => {
                        let mut cipher = Rc4::<$sz>::new_from_slice(key)
                            .map_err(|_| key_error(algorithm, key.len()))?;
                        if drop_bytes > 0 {
                            let mut skip = vec![0u8; drop_bytes];
                            cipher.apply_keystream(&mut skip);
                        }
                        let mut buf = data.to_vec();
                        cipher.apply_keystream(&mut buf);
                        Ok(buf)
                    }
                )+
                other => Err(key_error(algorithm, other)),
            }
        };
    }

    keyed!(
        1 => U1, 2 => U2, 3 => U3, 4 => U4, 5 => U5, 6 => U6, 7 => U7, 8 => U8,
        9 => U9, 10 => U10, 11 => U11, 12 => U12, 13 => U13, 14 => U14, 15 => U15, 16 => U16,
        17 => U17, 18 => U18, 19 => U19, 20 => U20, 21 => U21, 22 => U22, 23 => U23, 24 => U24,
        25 => U25, 26 => U26, 27 => U27, 28 => U28, 29 => U29, 30 => U30, 31 => U31, 32 => U32,
    )
}
