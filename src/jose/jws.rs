//! # JSON Web Signature (JWS)
//!
//! JWS ([RFC7515]) represents content secured with digital signatures or
//! MACs using JSON-based data structures. The algorithm family is implied
//! by the key variant: RSA keys sign with RSASSA-PKCS1-v1_5 or RSASSA-PSS,
//! elliptic-curve keys with ECDSA, and symmetric keys with HMAC. The
//! signature is computed over `base64url(header) || "." ||
//! base64url(payload)` and the output is the 3-segment compact form.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515

use anyhow::{anyhow, bail, Context as _};
use base64ct::{Base64UrlUnpadded, Encoding};
use ecdsa::signature::{Signer as _, Verifier as _};
use hmac::{Hmac, Mac as _};
use rand_core::OsRng;
use rsa::{Pkcs1v15Sign, Pss};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha384, Sha512};

use crate::jose::jwa::SigningAlgorithm;
use crate::jose::jwk::{Curve, EcKey, Jwk, OctKey, RsaKey};
use crate::jose::jwt::Header;

/// The JWS protected header, as carried in the first compact segment.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct JwsHeader {
    /// Digital signature or MAC algorithm.
    pub alg: SigningAlgorithm,

    /// Media type of the secured content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Identifier of the key used to secure the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Content type of the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
}

impl From<&JwsHeader> for Header {
    fn from(header: &JwsHeader) -> Self {
        Self {
            alg: Some(header.alg),
            typ: header.typ.clone(),
            kid: header.kid.clone(),
            cty: header.cty.clone(),
        }
    }
}

/// A parsed compact JWS: decoded segments plus the exact signing input.
#[derive(Clone, Debug)]
pub struct ParsedJws {
    /// The decoded protected header.
    pub header: JwsHeader,

    /// The decoded payload bytes.
    pub payload: Vec<u8>,

    /// The decoded signature. Empty for unsigned tokens.
    pub signature: Vec<u8>,

    /// The signature base: the first two segments as received.
    pub signing_input: String,
}

/// Encode the header and payload and sign, returning the compact form.
///
/// With no key the algorithm field is the literal `"none"` and the
/// signature segment is empty. Otherwise the algorithm is taken from the
/// header override when set, else from the key's declared algorithm, and
/// must agree with the key variant.
///
/// # Errors
///
/// Returns an error if no algorithm can be determined, the algorithm does
/// not match the key variant, or the key material is unusable.
pub fn sign(header: &Header, payload: &[u8], key: Option<&Jwk>) -> anyhow::Result<String> {
    tracing::trace!("jws::sign");

    let alg = match key {
        None => SigningAlgorithm::None,
        Some(key) => resolve_algorithm(header, key)?,
    };

    let protected = JwsHeader {
        alg,
        typ: header.typ.clone(),
        kid: header
            .kid
            .clone()
            .or_else(|| key.and_then(|k| k.kid().map(ToOwned::to_owned))),
        cty: header.cty.clone(),
    };

    let header_enc = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&protected)?);
    let payload_enc = Base64UrlUnpadded::encode_string(payload);
    let signing_input = format!("{header_enc}.{payload_enc}");

    let Some(key) = key else {
        return Ok(format!("{signing_input}."));
    };
    let sig = sign_bytes(alg, key, signing_input.as_bytes())?;

    Ok(format!("{signing_input}.{}", Base64UrlUnpadded::encode_string(&sig)))
}

/// Parse a 3-segment compact JWS without verifying it.
///
/// # Errors
///
/// Returns an error if the segment count is not exactly three or a segment
/// fails to decode.
pub fn parse(compact: &str) -> anyhow::Result<ParsedJws> {
    let parts: Vec<&str> = compact.split('.').collect();
    if parts.len() != 3 {
        bail!("invalid compact JWS format");
    }

    let decoded = Base64UrlUnpadded::decode_vec(parts[0])
        .map_err(|e| anyhow!("issue decoding header: {e}"))?;
    let header: JwsHeader =
        serde_json::from_slice(&decoded).map_err(|e| anyhow!("issue deserializing header: {e}"))?;
    let payload = Base64UrlUnpadded::decode_vec(parts[1])
        .map_err(|e| anyhow!("issue decoding payload: {e}"))?;
    let signature = if parts[2].is_empty() {
        Vec::new()
    } else {
        Base64UrlUnpadded::decode_vec(parts[2])
            .map_err(|e| anyhow!("issue decoding signature: {e}"))?
    };

    Ok(ParsedJws {
        header,
        payload,
        signature,
        signing_input: format!("{}.{}", parts[0], parts[1]),
    })
}

/// Verify a signature against a single candidate key.
///
/// The caller owns candidate iteration: keys are tried strictly in resolver
/// order and the first success wins, so a failure here means only that this
/// candidate did not match.
///
/// # Errors
///
/// Returns an error if the algorithm does not fit the key variant or the
/// signature check fails.
pub fn verify_signature(
    key: &Jwk, alg: SigningAlgorithm, msg: &[u8], sig: &[u8],
) -> anyhow::Result<()> {
    use SigningAlgorithm as Alg;

    match (alg, key) {
        (Alg::None, _) => {
            if sig.is_empty() {
                Ok(())
            } else {
                Err(anyhow!("unsigned token carries a signature"))
            }
        }
        (
            Alg::Rs256 | Alg::Rs384 | Alg::Rs512 | Alg::Ps256 | Alg::Ps384 | Alg::Ps512,
            Jwk::Rsa(rsa),
        ) => verify_rsa(alg, rsa, msg, sig),
        (Alg::Es256 | Alg::Es384 | Alg::Es512, Jwk::Ec(ec)) => verify_ecdsa(alg, ec, msg, sig),
        (Alg::Hs256 | Alg::Hs384 | Alg::Hs512, Jwk::Oct(oct)) => verify_hmac(alg, oct, msg, sig),
        _ => Err(anyhow!("algorithm {alg} cannot be used with the provided key type")),
    }
}

// Determine the effective algorithm for a keyed signature and check it
// against the key variant.
fn resolve_algorithm(header: &Header, key: &Jwk) -> anyhow::Result<SigningAlgorithm> {
    use SigningAlgorithm as Alg;

    let alg = match header.alg {
        Some(alg) if !alg.is_unsigned() => alg,
        Some(_) => bail!("a signing key was provided for an unsigned token"),
        None => key
            .algorithm()
            .context("signing key declares no algorithm")?
            .parse()?,
    };

    let fits = match alg {
        Alg::Rs256 | Alg::Rs384 | Alg::Rs512 | Alg::Ps256 | Alg::Ps384 | Alg::Ps512 => {
            matches!(key, Jwk::Rsa(_))
        }
        Alg::Es256 | Alg::Es384 | Alg::Es512 => matches!(key, Jwk::Ec(_)),
        Alg::Hs256 | Alg::Hs384 | Alg::Hs512 => matches!(key, Jwk::Oct(_)),
        Alg::None => false,
    };
    if !fits {
        bail!("algorithm {alg} cannot be used with the provided key type");
    }

    Ok(alg)
}

fn sign_bytes(alg: SigningAlgorithm, key: &Jwk, msg: &[u8]) -> anyhow::Result<Vec<u8>> {
    use SigningAlgorithm as Alg;

    match (alg, key) {
        (
            Alg::Rs256 | Alg::Rs384 | Alg::Rs512 | Alg::Ps256 | Alg::Ps384 | Alg::Ps512,
            Jwk::Rsa(rsa),
        ) => sign_rsa(alg, rsa, msg),
        (Alg::Es256 | Alg::Es384 | Alg::Es512, Jwk::Ec(ec)) => sign_ecdsa(alg, ec, msg),
        (Alg::Hs256 | Alg::Hs384 | Alg::Hs512, Jwk::Oct(oct)) => sign_hmac(alg, oct, msg),
        _ => Err(anyhow!("algorithm {alg} cannot be used with the provided key type")),
    }
}

fn sign_rsa(alg: SigningAlgorithm, jwk: &RsaKey, msg: &[u8]) -> anyhow::Result<Vec<u8>> {
    use SigningAlgorithm as Alg;

    let key = jwk.private_key()?;
    let sig = match alg {
        Alg::Rs256 => key.sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(msg))?,
        Alg::Rs384 => key.sign(Pkcs1v15Sign::new::<Sha384>(), &Sha384::digest(msg))?,
        Alg::Rs512 => key.sign(Pkcs1v15Sign::new::<Sha512>(), &Sha512::digest(msg))?,
        Alg::Ps256 => {
            key.sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), &Sha256::digest(msg))?
        }
        Alg::Ps384 => {
            key.sign_with_rng(&mut OsRng, Pss::new::<Sha384>(), &Sha384::digest(msg))?
        }
        Alg::Ps512 => {
            key.sign_with_rng(&mut OsRng, Pss::new::<Sha512>(), &Sha512::digest(msg))?
        }
        _ => bail!("{alg} is not an RSA signing algorithm"),
    };
    Ok(sig)
}

fn verify_rsa(alg: SigningAlgorithm, jwk: &RsaKey, msg: &[u8], sig: &[u8]) -> anyhow::Result<()> {
    use SigningAlgorithm as Alg;

    let key = jwk.public_key()?;
    match alg {
        Alg::Rs256 => key.verify(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(msg), sig)?,
        Alg::Rs384 => key.verify(Pkcs1v15Sign::new::<Sha384>(), &Sha384::digest(msg), sig)?,
        Alg::Rs512 => key.verify(Pkcs1v15Sign::new::<Sha512>(), &Sha512::digest(msg), sig)?,
        Alg::Ps256 => key.verify(Pss::new::<Sha256>(), &Sha256::digest(msg), sig)?,
        Alg::Ps384 => key.verify(Pss::new::<Sha384>(), &Sha384::digest(msg), sig)?,
        Alg::Ps512 => key.verify(Pss::new::<Sha512>(), &Sha512::digest(msg), sig)?,
        _ => bail!("{alg} is not an RSA signing algorithm"),
    }
    Ok(())
}

// ECDSA signatures use the fixed-width `r || s` encoding required by JOSE,
// not ASN.1 DER.
fn sign_ecdsa(alg: SigningAlgorithm, jwk: &EcKey, msg: &[u8]) -> anyhow::Result<Vec<u8>> {
    use SigningAlgorithm as Alg;

    let secret = jwk.secret_bytes()?;
    match (alg, jwk.crv) {
        (Alg::Es256, Curve::P256) => {
            let key = p256::ecdsa::SigningKey::from_slice(&secret)?;
            let sig: p256::ecdsa::Signature = key.sign(msg);
            Ok(sig.to_vec())
        }
        (Alg::Es384, Curve::P384) => {
            let key = p384::ecdsa::SigningKey::from_slice(&secret)?;
            let sig: p384::ecdsa::Signature = key.sign(msg);
            Ok(sig.to_vec())
        }
        (Alg::Es512, Curve::P521) => {
            let key = p521::ecdsa::SigningKey::from_slice(&secret)?;
            let sig: p521::ecdsa::Signature = key.sign(msg);
            Ok(sig.to_vec())
        }
        (_, crv) => Err(anyhow!("algorithm {alg} does not match curve {crv:?}")),
    }
}

fn verify_ecdsa(alg: SigningAlgorithm, jwk: &EcKey, msg: &[u8], sig: &[u8]) -> anyhow::Result<()> {
    use SigningAlgorithm as Alg;

    let sec1 = jwk.sec1_uncompressed()?;
    match (alg, jwk.crv) {
        (Alg::Es256, Curve::P256) => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)?;
            let sig = p256::ecdsa::Signature::from_slice(sig)?;
            Ok(key.verify(msg, &sig)?)
        }
        (Alg::Es384, Curve::P384) => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)?;
            let sig = p384::ecdsa::Signature::from_slice(sig)?;
            Ok(key.verify(msg, &sig)?)
        }
        (Alg::Es512, Curve::P521) => {
            let key = p521::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)?;
            let sig = p521::ecdsa::Signature::from_slice(sig)?;
            Ok(key.verify(msg, &sig)?)
        }
        (_, crv) => Err(anyhow!("algorithm {alg} does not match curve {crv:?}")),
    }
}

fn sign_hmac(alg: SigningAlgorithm, jwk: &OctKey, msg: &[u8]) -> anyhow::Result<Vec<u8>> {
    use SigningAlgorithm as Alg;

    let key = jwk.key_bytes()?;
    let sig = match alg {
        Alg::Hs256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(&key)
                .map_err(|e| anyhow!("invalid HMAC key: {e}"))?;
            mac.update(msg);
            mac.finalize().into_bytes().to_vec()
        }
        Alg::Hs384 => {
            let mut mac = Hmac::<Sha384>::new_from_slice(&key)
                .map_err(|e| anyhow!("invalid HMAC key: {e}"))?;
            mac.update(msg);
            mac.finalize().into_bytes().to_vec()
        }
        Alg::Hs512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(&key)
                .map_err(|e| anyhow!("invalid HMAC key: {e}"))?;
            mac.update(msg);
            mac.finalize().into_bytes().to_vec()
        }
        _ => bail!("{alg} is not an HMAC algorithm"),
    };
    Ok(sig)
}

fn verify_hmac(alg: SigningAlgorithm, jwk: &OctKey, msg: &[u8], sig: &[u8]) -> anyhow::Result<()> {
    use SigningAlgorithm as Alg;

    let key = jwk.key_bytes()?;
    match alg {
        Alg::Hs256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(&key)
                .map_err(|e| anyhow!("invalid HMAC key: {e}"))?;
            mac.update(msg);
            mac.verify_slice(sig).map_err(|e| anyhow!("signature mismatch: {e}"))
        }
        Alg::Hs384 => {
            let mut mac = Hmac::<Sha384>::new_from_slice(&key)
                .map_err(|e| anyhow!("invalid HMAC key: {e}"))?;
            mac.update(msg);
            mac.verify_slice(sig).map_err(|e| anyhow!("signature mismatch: {e}"))
        }
        Alg::Hs512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(&key)
                .map_err(|e| anyhow!("invalid HMAC key: {e}"))?;
            mac.update(msg);
            mac.verify_slice(sig).map_err(|e| anyhow!("signature mismatch: {e}"))
        }
        _ => bail!("{alg} is not an HMAC algorithm"),
    }
}

#[cfg(test)]
mod test {
    use base64ct::{Base64UrlUnpadded, Encoding};

    use super::*;
    use crate::jose::jwt::Payload;

    fn oct_jwk(bytes: &[u8], alg: &str) -> Jwk {
        Jwk::Oct(OctKey {
            kid: Some("sym-1".into()),
            alg: Some(alg.into()),
            k: Base64UrlUnpadded::encode_string(bytes),
            ..OctKey::default()
        })
    }

    #[test]
    fn unsigned_token_has_empty_signature_segment() {
        let header = Header { typ: Some("JWT".into()), ..Header::default() };
        let compact = sign(&header, b"{}", None).expect("should sign");

        let parts: Vec<&str> = compact.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[2].is_empty());

        let jws = parse(&compact).expect("should parse");
        assert_eq!(jws.header.alg, SigningAlgorithm::None);
        assert!(jws.signature.is_empty());
    }

    #[test]
    fn hmac_sign_and_verify() {
        let key = oct_jwk(&[7u8; 32], "HS256");
        let mut payload = Payload::new();
        payload.set_subject(Some("alice"));
        let bytes = serde_json::to_vec(&payload).unwrap();

        let header = Header { typ: Some("JWT".into()), ..Header::default() };
        let compact = sign(&header, &bytes, Some(&key)).expect("should sign");

        let jws = parse(&compact).expect("should parse");
        assert_eq!(jws.header.alg, SigningAlgorithm::Hs256);
        assert_eq!(jws.header.kid.as_deref(), Some("sym-1"));
        verify_signature(&key, jws.header.alg, jws.signing_input.as_bytes(), &jws.signature)
            .expect("should verify");
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let key = oct_jwk(&[7u8; 32], "HS256");
        let header = Header::default();
        let compact = sign(&header, b"{\"sub\":\"alice\"}", Some(&key)).expect("should sign");

        let parts: Vec<&str> = compact.split('.').collect();
        let forged_payload = Base64UrlUnpadded::encode_string(b"{\"sub\":\"mallory\"}");
        let forged_input = format!("{}.{forged_payload}", parts[0]);
        let sig = Base64UrlUnpadded::decode_vec(parts[2]).unwrap();

        assert!(verify_signature(&key, SigningAlgorithm::Hs256, forged_input.as_bytes(), &sig)
            .is_err());
    }

    #[test]
    fn header_override_wins_over_declared_algorithm() {
        let key = oct_jwk(&[7u8; 32], "HS256");
        let header = Header { alg: Some(SigningAlgorithm::Hs512), ..Header::default() };
        let compact = sign(&header, b"{}", Some(&key)).expect("should sign");

        let jws = parse(&compact).expect("should parse");
        assert_eq!(jws.header.alg, SigningAlgorithm::Hs512);
    }

    #[test]
    fn algorithm_must_fit_key_variant() {
        let key = oct_jwk(&[7u8; 32], "RS256");
        let header = Header::default();
        assert!(sign(&header, b"{}", Some(&key)).is_err());
    }

    #[test]
    fn unsigned_with_trailing_signature_is_rejected() {
        let key = oct_jwk(&[7u8; 32], "HS256");
        assert!(verify_signature(&key, SigningAlgorithm::None, b"x.y", b"sig").is_err());
    }

    #[test]
    fn segment_count_is_enforced() {
        assert!(parse("a.b").is_err());
        assert!(parse("a.b.c.d").is_err());
    }
}
