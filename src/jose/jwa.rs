//! # JSON Web Algorithms (JWA)
//!
//! JWA ([RFC7518]) defines the cryptographic algorithms used with JWS
//! ([RFC7515]) and JWE ([RFC7516]): one registry for digital signatures and
//! MACs, one for key management, and one for content encryption.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use std::fmt::{self, Display};
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Digital signature and MAC algorithms ([RFC7518] section 3).
///
/// [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub enum SigningAlgorithm {
    /// No digital signature or MAC. The token is unsigned and the signature
    /// segment of the compact form is empty.
    #[default]
    #[serde(rename = "none")]
    None,

    /// HMAC using SHA-256.
    #[serde(rename = "HS256")]
    Hs256,

    /// HMAC using SHA-384.
    #[serde(rename = "HS384")]
    Hs384,

    /// HMAC using SHA-512.
    #[serde(rename = "HS512")]
    Hs512,

    /// RSASSA-PKCS1-v1_5 using SHA-256.
    #[serde(rename = "RS256")]
    Rs256,

    /// RSASSA-PKCS1-v1_5 using SHA-384.
    #[serde(rename = "RS384")]
    Rs384,

    /// RSASSA-PKCS1-v1_5 using SHA-512.
    #[serde(rename = "RS512")]
    Rs512,

    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256.
    #[serde(rename = "PS256")]
    Ps256,

    /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384.
    #[serde(rename = "PS384")]
    Ps384,

    /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512.
    #[serde(rename = "PS512")]
    Ps512,

    /// ECDSA using P-256 and SHA-256.
    #[serde(rename = "ES256")]
    Es256,

    /// ECDSA using P-384 and SHA-384.
    #[serde(rename = "ES384")]
    Es384,

    /// ECDSA using P-521 and SHA-512.
    #[serde(rename = "ES512")]
    Es512,
}

impl SigningAlgorithm {
    /// The registered algorithm name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
        }
    }

    /// Returns `true` for the "none" algorithm, i.e. an unsigned token.
    #[must_use]
    pub const fn is_unsigned(self) -> bool {
        matches!(self, Self::None)
    }
}

impl Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            "RS256" => Ok(Self::Rs256),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            "PS256" => Ok(Self::Ps256),
            "PS384" => Ok(Self::Ps384),
            "PS512" => Ok(Self::Ps512),
            "ES256" => Ok(Self::Es256),
            "ES384" => Ok(Self::Es384),
            "ES512" => Ok(Self::Es512),
            _ => Err(anyhow!("unsupported signing algorithm: {s}")),
        }
    }
}

/// Key management algorithms ([RFC7518] section 4): how the Content
/// Encryption Key of a JWE is determined or wrapped.
///
/// [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub enum KeyManagementAlgorithm {
    /// RSAES OAEP using SHA-1 and MGF1 with SHA-1.
    #[default]
    #[serde(rename = "RSA-OAEP")]
    RsaOaep,

    /// RSAES OAEP using SHA-256 and MGF1 with SHA-256.
    #[serde(rename = "RSA-OAEP-256")]
    RsaOaep256,

    /// RSAES-PKCS1-v1_5. Legacy; retained for interoperability.
    #[serde(rename = "RSA1_5")]
    Rsa1_5,

    /// Key wrapping with AES GCM using a 128-bit key.
    #[serde(rename = "A128GCMKW")]
    A128GcmKw,

    /// Key wrapping with AES GCM using a 192-bit key.
    #[serde(rename = "A192GCMKW")]
    A192GcmKw,

    /// Key wrapping with AES GCM using a 256-bit key.
    #[serde(rename = "A256GCMKW")]
    A256GcmKw,

    /// Direct use of a shared symmetric key as the CEK. The encrypted-key
    /// segment of the compact form is empty.
    #[serde(rename = "dir")]
    Direct,
}

impl KeyManagementAlgorithm {
    /// The registered algorithm name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RsaOaep => "RSA-OAEP",
            Self::RsaOaep256 => "RSA-OAEP-256",
            Self::Rsa1_5 => "RSA1_5",
            Self::A128GcmKw => "A128GCMKW",
            Self::A192GcmKw => "A192GCMKW",
            Self::A256GcmKw => "A256GCMKW",
            Self::Direct => "dir",
        }
    }

    /// Exact wrapping-key length in bytes for the AES GCM key-wrap variants.
    #[must_use]
    pub const fn wrap_key_len(self) -> Option<usize> {
        match self {
            Self::A128GcmKw => Some(16),
            Self::A192GcmKw => Some(24),
            Self::A256GcmKw => Some(32),
            _ => None,
        }
    }

    /// Returns `true` for the asymmetric (RSA) key-management family.
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(self, Self::RsaOaep | Self::RsaOaep256 | Self::Rsa1_5)
    }
}

impl Display for KeyManagementAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyManagementAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RSA-OAEP" => Ok(Self::RsaOaep),
            "RSA-OAEP-256" => Ok(Self::RsaOaep256),
            "RSA1_5" => Ok(Self::Rsa1_5),
            "A128GCMKW" => Ok(Self::A128GcmKw),
            "A192GCMKW" => Ok(Self::A192GcmKw),
            "A256GCMKW" => Ok(Self::A256GcmKw),
            "dir" => Ok(Self::Direct),
            _ => Err(anyhow!("unsupported key management algorithm: {s}")),
        }
    }
}

/// Content encryption algorithms ([RFC7518] section 5). MUST be AEAD
/// algorithms: each produces a ciphertext and an authentication tag.
///
/// [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub enum ContentEncryptionAlgorithm {
    /// AES-128-CBC with HMAC-SHA-256, a composite AEAD.
    #[default]
    #[serde(rename = "A128CBC-HS256")]
    A128CbcHs256,

    /// AES-192-CBC with HMAC-SHA-384.
    #[serde(rename = "A192CBC-HS384")]
    A192CbcHs384,

    /// AES-256-CBC with HMAC-SHA-512.
    #[serde(rename = "A256CBC-HS512")]
    A256CbcHs512,

    /// AES GCM using a 128-bit key.
    #[serde(rename = "A128GCM")]
    A128Gcm,

    /// AES GCM using a 192-bit key.
    #[serde(rename = "A192GCM")]
    A192Gcm,

    /// AES GCM using a 256-bit key.
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

impl ContentEncryptionAlgorithm {
    /// The registered algorithm name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A128CbcHs256 => "A128CBC-HS256",
            Self::A192CbcHs384 => "A192CBC-HS384",
            Self::A256CbcHs512 => "A256CBC-HS512",
            Self::A128Gcm => "A128GCM",
            Self::A192Gcm => "A192GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    /// Required Content Encryption Key length in bytes. The CBC-HMAC
    /// composites use a double-length key: one half for the MAC, one half
    /// for AES.
    #[must_use]
    pub const fn cek_len(self) -> usize {
        match self {
            Self::A128Gcm => 16,
            Self::A192Gcm => 24,
            Self::A128CbcHs256 | Self::A256Gcm => 32,
            Self::A192CbcHs384 => 48,
            Self::A256CbcHs512 => 64,
        }
    }

    /// Initialization vector length in bytes: 96 bits for GCM, one AES
    /// block for CBC.
    #[must_use]
    pub const fn iv_len(self) -> usize {
        match self {
            Self::A128Gcm | Self::A192Gcm | Self::A256Gcm => 12,
            Self::A128CbcHs256 | Self::A192CbcHs384 | Self::A256CbcHs512 => 16,
        }
    }
}

impl Display for ContentEncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentEncryptionAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A128CBC-HS256" => Ok(Self::A128CbcHs256),
            "A192CBC-HS384" => Ok(Self::A192CbcHs384),
            "A256CBC-HS512" => Ok(Self::A256CbcHs512),
            "A128GCM" => Ok(Self::A128Gcm),
            "A192GCM" => Ok(Self::A192Gcm),
            "A256GCM" => Ok(Self::A256Gcm),
            _ => Err(anyhow!("unsupported content encryption algorithm: {s}")),
        }
    }
}
