//! Cipher selection and parameter types.
//!
//! [`CipherParameters`] is the caller-supplied configuration bundle consumed
//! by the validator and the engine. It is immutable, never persisted, and
//! carries all key material in memory; nothing here reads the environment or
//! the filesystem.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

/// Supported symmetric cipher algorithms.
///
/// Each algorithm has two static properties consulted by the validator:
/// [`block_size`](CipherAlgorithm::block_size) and
/// [`key_length_range`](CipherAlgorithm::key_length_range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherAlgorithm {
    /// AES with a 128/192/256-bit key selected by key length.
    Aes,
    /// Single DES (64-bit key). Legacy; supported for interoperability only.
    Des,
    /// Triple DES in EDE3 keying (three independent 64-bit keys).
    TripleDes,
    /// Blowfish with a variable 32..448-bit key.
    Blowfish,
    /// Rabbit keystream cipher with an 8-byte IV setup.
    Rabbit,
    /// Rabbit keystream cipher without IV setup (key-only).
    RabbitLegacy,
    /// RC4 keystream cipher.
    Rc4,
    /// RC4 with the first 768 keystream bytes discarded.
    Rc4Drop,
}

impl CipherAlgorithm {
    /// All supported algorithms, in declaration order.
    pub const ALL: [CipherAlgorithm; 8] = [
        CipherAlgorithm::Aes,
        CipherAlgorithm::Des,
        CipherAlgorithm::TripleDes,
        CipherAlgorithm::Blowfish,
        CipherAlgorithm::Rabbit,
        CipherAlgorithm::RabbitLegacy,
        CipherAlgorithm::Rc4,
        CipherAlgorithm::Rc4Drop,
    ];

    /// Cipher block size in bytes; `0` marks a keystream cipher that takes no
    /// IV at all.
    ///
    /// [`Rabbit`](CipherAlgorithm::Rabbit) reports `8` even though it is a
    /// stream cipher: its IV setup consumes an 8-byte IV, so it follows the
    /// block-cipher IV rules.
    pub fn block_size(self) -> usize {
        match self {
            CipherAlgorithm::Aes => 16,
            CipherAlgorithm::Des
            | CipherAlgorithm::TripleDes
            | CipherAlgorithm::Blowfish
            | CipherAlgorithm::Rabbit => 8,
            CipherAlgorithm::RabbitLegacy | CipherAlgorithm::Rc4 | CipherAlgorithm::Rc4Drop => 0,
        }
    }

    /// Allowed secret key length in bytes (inclusive range).
    pub fn key_length_range(self) -> RangeInclusive<usize> {
        match self {
            CipherAlgorithm::Aes => 16..=32,
            CipherAlgorithm::Des => 8..=8,
            CipherAlgorithm::TripleDes => 24..=24,
            CipherAlgorithm::Blowfish => 4..=56,
            CipherAlgorithm::Rabbit | CipherAlgorithm::RabbitLegacy => 16..=16,
            CipherAlgorithm::Rc4 | CipherAlgorithm::Rc4Drop => 1..=32,
        }
    }

    /// Whether the algorithm runs through the block-mode machinery.
    pub(crate) fn is_block_cipher(self) -> bool {
        matches!(
            self,
            CipherAlgorithm::Aes
                | CipherAlgorithm::Des
                | CipherAlgorithm::TripleDes
                | CipherAlgorithm::Blowfish
        )
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CipherAlgorithm::Aes => "AES",
            CipherAlgorithm::Des => "DES",
            CipherAlgorithm::TripleDes => "TripleDES",
            CipherAlgorithm::Blowfish => "Blowfish",
            CipherAlgorithm::Rabbit => "Rabbit",
            CipherAlgorithm::RabbitLegacy => "RabbitLegacy",
            CipherAlgorithm::Rc4 => "RC4",
            CipherAlgorithm::Rc4Drop => "RC4Drop",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Block-cipher operating mode.
///
/// ECB is the only mode that forbids an IV; every other mode over a cipher
/// with a nonzero block size requires one. CFB, OFB and CTR are streaming
/// modes: the padding scheme is accepted but ignored for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CipherMode {
    /// Cipher block chaining. The default.
    #[default]
    Cbc,
    /// Cipher feedback (full-block).
    Cfb,
    /// Counter mode (big-endian counter seeded from the IV).
    Ctr,
    /// Output feedback.
    Ofb,
    /// Electronic codebook: no chaining, no IV.
    Ecb,
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CipherMode::Cbc => "CBC",
            CipherMode::Cfb => "CFB",
            CipherMode::Ctr => "CTR",
            CipherMode::Ofb => "OFB",
            CipherMode::Ecb => "ECB",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Padding
// ---------------------------------------------------------------------------

/// Block padding scheme. Irrelevant for stream ciphers and streaming modes,
/// but still accepted (and ignored) for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaddingScheme {
    /// PKCS#7 byte padding. The default.
    #[default]
    Pkcs7,
    /// ANSI X9.23: zero fill with a trailing length byte.
    AnsiX923,
    /// ISO 10126 byte padding.
    Iso10126,
    /// ISO/IEC 9797-1 padding method 2 (`0x80` marker then zero fill).
    Iso97971,
    /// Zero fill to the block boundary.
    ZeroPadding,
    /// No padding: the plaintext must already be a whole number of blocks.
    NoPadding,
}

// ---------------------------------------------------------------------------
// Parameter bundle
// ---------------------------------------------------------------------------

/// Full cipher configuration for one plugin instantiation.
///
/// Key material and IV are hex-encoded strings supplied by the caller.
/// Deterministic ciphertext (same plaintext, key, IV and mode give the same
/// output) is what makes equality filters on encrypted columns work, so
/// columns that are both encrypted and filtered must always use an explicit,
/// fixed IV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherParameters {
    /// Cipher algorithm. Required.
    pub algorithm: CipherAlgorithm,

    /// Hex-encoded secret key. Required; an empty string fails validation.
    pub secret_key_hex: String,

    /// Hex-encoded IV. Presence rules depend on the algorithm and mode; see
    /// [`crate::crypto::validate`].
    #[serde(default)]
    pub iv_hex: Option<String>,

    /// Operating mode. Defaults to [`CipherMode::Cbc`].
    #[serde(default)]
    pub mode: Option<CipherMode>,

    /// Padding scheme. Defaults to [`PaddingScheme::Pkcs7`].
    #[serde(default)]
    pub padding: Option<PaddingScheme>,
}

impl CipherParameters {
    /// Create parameters for `algorithm` with the given hex key and defaults
    /// for everything else (CBC mode, PKCS#7 padding, no IV).
    pub fn new(algorithm: CipherAlgorithm, secret_key_hex: impl Into<String>) -> Self {
        Self {
            algorithm,
            secret_key_hex: secret_key_hex.into(),
            iv_hex: None,
            mode: None,
            padding: None,
        }
    }

    /// Set the hex-encoded IV.
    pub fn with_iv_hex(mut self, iv_hex: impl Into<String>) -> Self {
        self.iv_hex = Some(iv_hex.into());
        self
    }

    /// Set the operating mode.
    pub fn with_mode(mut self, mode: CipherMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the padding scheme.
    pub fn with_padding(mut self, padding: PaddingScheme) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Mode in force after applying the default.
    pub fn effective_mode(&self) -> CipherMode {
        self.mode.unwrap_or_default()
    }

    /// Padding in force after applying the default.
    pub fn effective_padding(&self) -> PaddingScheme {
        self.padding.unwrap_or_default()
    }
}
