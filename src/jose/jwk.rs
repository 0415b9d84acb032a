//! # JSON Web Key (JWK)
//!
//! A JWK ([RFC7517]) is a JSON representation of a cryptographic key, and a
//! JWK Set (JWKS) represents a set of JWKs, typically the published keys of
//! an issuer.
//!
//! The `kty` member is the discriminator selecting the key kind. Exactly
//! three case-sensitive values are accepted: `"RSA"`, `"EC"`, and `"oct"`;
//! any other value, or a missing `kty`, is a decode error. All byte-valued
//! members are base64url encoded without padding.
//!
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517

use anyhow::{anyhow, Context as _};
use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

/// A JSON Web Key: a typed representation of RSA, elliptic-curve, or
/// symmetric key material.
///
/// Whether a key holds public or private material is derived from the
/// fields present, never stored: [`Jwk::has_private_key`] is `true` iff the
/// variant's private-only field(s) are present and non-empty, using the
/// same checks [`Jwk::sanitize`] applies.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(tag = "kty")]
pub enum Jwk {
    /// RSA key pair.
    #[serde(rename = "RSA")]
    Rsa(RsaKey),

    /// Elliptic-curve key pair on a NIST curve.
    #[serde(rename = "EC")]
    Ec(EcKey),

    /// Octet sequence (symmetric key).
    #[serde(rename = "oct")]
    Oct(OctKey),
}

impl Jwk {
    /// Key identifier, if set.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        match self {
            Self::Rsa(key) => key.kid.as_deref(),
            Self::Ec(key) => key.kid.as_deref(),
            Self::Oct(key) => key.kid.as_deref(),
        }
    }

    /// Declared usage of the key, if set.
    #[must_use]
    pub const fn key_use(&self) -> Option<&KeyUse> {
        match self {
            Self::Rsa(key) => key.use_.as_ref(),
            Self::Ec(key) => key.use_.as_ref(),
            Self::Oct(key) => key.use_.as_ref(),
        }
    }

    /// Declared algorithm name, if set.
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        match self {
            Self::Rsa(key) => key.alg.as_deref(),
            Self::Ec(key) => key.alg.as_deref(),
            Self::Oct(key) => key.alg.as_deref(),
        }
    }

    /// Returns `true` if the key carries public material. Symmetric keys
    /// have none.
    #[must_use]
    pub fn has_public_key(&self) -> bool {
        match self {
            Self::Rsa(key) => !key.n.is_empty() && !key.e.is_empty(),
            Self::Ec(key) => !key.x.is_empty() && !key.y.is_empty(),
            Self::Oct(_) => false,
        }
    }

    /// Returns `true` if the key carries private material.
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        match self {
            Self::Rsa(key) => key.d.as_ref().is_some_and(|d| !d.is_empty()),
            Self::Ec(key) => key.d.as_ref().is_some_and(|d| !d.is_empty()),
            Self::Oct(key) => !key.k.is_empty(),
        }
    }

    /// Projects the key for disclosure: when `include_private` is `false`,
    /// returns a same-variant key with all private fields cleared; when
    /// `true`, returns the key unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `include_private` is `true` but the key has no private
    /// material: asking to disclose what does not exist is a programming
    /// error, not a recoverable condition.
    #[must_use]
    pub fn sanitize(&self, include_private: bool) -> Self {
        if include_private {
            assert!(
                self.has_private_key(),
                "key {:?} has no private material to include",
                self.kid()
            );
            return self.clone();
        }

        match self {
            Self::Rsa(key) => Self::Rsa(RsaKey {
                d: None,
                p: None,
                q: None,
                dp: None,
                dq: None,
                qi: None,
                ..key.clone()
            }),
            Self::Ec(key) => Self::Ec(EcKey { d: None, ..key.clone() }),
            Self::Oct(key) => Self::Oct(OctKey { k: String::new(), ..key.clone() }),
        }
    }
}

/// RSA key parameters ([RFC7517] appendix A, [RFC7518] section 6.3).
///
/// [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
/// [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub struct RsaKey {
    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Use of the key.
    #[serde(rename = "use")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_: Option<KeyUse>,

    /// Algorithm intended for use with the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Modulus.
    pub n: String,

    /// Public exponent.
    pub e: String,

    /// Private exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// First prime factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,

    /// Second prime factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    /// First factor CRT exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,

    /// Second factor CRT exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,

    /// First CRT coefficient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,

    /// X.509 certificate chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,

    /// X.509 certificate SHA-1 thumbprint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
}

impl RsaKey {
    /// Builds the public key from the modulus and exponent.
    pub(crate) fn public_key(&self) -> anyhow::Result<RsaPublicKey> {
        let n = BigUint::from_bytes_be(&decode_field(&self.n, "n")?);
        let e = BigUint::from_bytes_be(&decode_field(&self.e, "e")?);
        RsaPublicKey::new(n, e).map_err(|e| anyhow!("invalid RSA public key: {e}"))
    }

    /// Builds the private key. The prime factors are used when present;
    /// otherwise they are recovered from the private exponent.
    pub(crate) fn private_key(&self) -> anyhow::Result<RsaPrivateKey> {
        let d = self
            .d
            .as_ref()
            .filter(|d| !d.is_empty())
            .context("RSA key has no private exponent")?;

        let n = BigUint::from_bytes_be(&decode_field(&self.n, "n")?);
        let e = BigUint::from_bytes_be(&decode_field(&self.e, "e")?);
        let d = BigUint::from_bytes_be(&decode_field(d, "d")?);

        let primes = match (&self.p, &self.q) {
            (Some(p), Some(q)) if !p.is_empty() && !q.is_empty() => vec![
                BigUint::from_bytes_be(&decode_field(p, "p")?),
                BigUint::from_bytes_be(&decode_field(q, "q")?),
            ],
            _ => vec![],
        };

        RsaPrivateKey::from_components(n, e, d, primes)
            .map_err(|e| anyhow!("invalid RSA private key: {e}"))
    }
}

/// Elliptic-curve key parameters ([RFC7518] section 6.2).
///
/// [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub struct EcKey {
    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Use of the key.
    #[serde(rename = "use")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_: Option<KeyUse>,

    /// Algorithm intended for use with the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Cryptographic curve.
    pub crv: Curve,

    /// X coordinate.
    pub x: String,

    /// Y coordinate.
    pub y: String,

    /// Private scalar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl EcKey {
    /// The public point in SEC1 uncompressed form: `0x04 || x || y`.
    pub(crate) fn sec1_uncompressed(&self) -> anyhow::Result<Vec<u8>> {
        let mut sec1 = vec![0x04];
        sec1.append(&mut decode_field(&self.x, "x")?);
        sec1.append(&mut decode_field(&self.y, "y")?);
        Ok(sec1)
    }

    /// The private scalar bytes.
    pub(crate) fn secret_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let d = self
            .d
            .as_ref()
            .filter(|d| !d.is_empty())
            .context("EC key has no private scalar")?;
        decode_field(d, "d")
    }
}

/// Symmetric key parameters ([RFC7518] section 6.4).
///
/// [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub struct OctKey {
    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Use of the key.
    #[serde(rename = "use")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_: Option<KeyUse>,

    /// Algorithm intended for use with the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key value.
    pub k: String,
}

impl OctKey {
    /// The raw key bytes.
    pub(crate) fn key_bytes(&self) -> anyhow::Result<Vec<u8>> {
        if self.k.is_empty() {
            return Err(anyhow!("symmetric key has no material"));
        }
        decode_field(&self.k, "k")
    }
}

/// Cryptographic curve type.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub enum Curve {
    /// NIST P-256 curve.
    #[default]
    #[serde(rename = "P-256")]
    P256,

    /// NIST P-384 curve.
    #[serde(rename = "P-384")]
    P384,

    /// NIST P-521 curve.
    #[serde(rename = "P-521")]
    P521,
}

/// The intended usage of the key.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum KeyUse {
    /// Key is to be used for signing or signature verification.
    #[default]
    #[serde(rename = "sig")]
    Signature,

    /// Key is to be used for encryption.
    #[serde(rename = "enc")]
    Encryption,
}

/// A set of JWKs, as published in a JWKS document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwks {
    /// The set of keys.
    pub keys: Vec<Jwk>,
}

fn decode_field(value: &str, field: &str) -> anyhow::Result<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(value).map_err(|e| anyhow!("issue decoding `{field}`: {e}"))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn rsa_private_jwk() -> Jwk {
        Jwk::Rsa(RsaKey {
            kid: Some("rsa-1".into()),
            n: "qLOyhK-OtQs4cDSoYPFGxJGfMYdjzWxVmMiuSBGh4KvEx".into(),
            e: "AQAB".into(),
            d: Some("dGVzdA".into()),
            p: Some("cA".into()),
            q: Some("cQ".into()),
            ..RsaKey::default()
        })
    }

    #[test]
    fn kty_discriminates() {
        let jwk: Jwk = serde_json::from_value(json!({
            "kty": "oct", "kid": "sym-1", "k": "AAEC"
        }))
        .expect("should deserialize");
        assert!(matches!(jwk, Jwk::Oct(_)));
        assert!(!jwk.has_public_key());
        assert!(jwk.has_private_key());
    }

    #[test]
    fn unknown_kty_is_rejected() {
        assert!(serde_json::from_value::<Jwk>(json!({"kty": "rsa", "n": "AA", "e": "AQAB"}))
            .is_err());
        assert!(serde_json::from_value::<Jwk>(json!({"n": "AA", "e": "AQAB"})).is_err());
    }

    #[test]
    fn wire_field_names() {
        let jwk: Jwk = serde_json::from_value(json!({
            "kty": "EC", "crv": "P-256", "use": "sig", "x": "AA", "y": "AQ"
        }))
        .expect("should deserialize");
        assert_eq!(jwk.key_use(), Some(&KeyUse::Signature));

        let ser = serde_json::to_value(&jwk).expect("should serialize");
        assert_eq!(ser["kty"], "EC");
        assert_eq!(ser["use"], "sig");
        assert!(ser.get("d").is_none());
    }

    #[test]
    fn sanitize_strips_private_fields() {
        let jwk = rsa_private_jwk();
        assert!(jwk.has_private_key());

        let public = jwk.sanitize(false);
        let Jwk::Rsa(key) = &public else {
            panic!("should remain an RSA key");
        };
        assert!(key.d.is_none() && key.p.is_none() && key.q.is_none());
        assert!(public.has_public_key());
        assert!(!public.has_private_key());
    }

    #[test]
    fn sanitize_preserves_private_fields() {
        let jwk = rsa_private_jwk();
        assert_eq!(jwk.sanitize(true), jwk);
    }

    #[test]
    #[should_panic(expected = "no private material")]
    fn sanitize_panics_without_private_material() {
        let public = rsa_private_jwk().sanitize(false);
        let _ = public.sanitize(true);
    }

    #[test]
    fn jwks_roundtrip() {
        let jwks: Jwks = serde_json::from_value(json!({
            "keys": [
                {"kty": "oct", "k": "AAEC"},
                {"kty": "EC", "crv": "P-384", "x": "AA", "y": "AQ"},
            ]
        }))
        .expect("should deserialize");
        assert_eq!(jwks.keys.len(), 2);
    }
}
