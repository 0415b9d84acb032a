//! # Token Creation
//!
//! Minting a compact token is a fixed pipeline: encode the claim set, sign
//! it (or emit the unsigned `"none"` form), and optionally encrypt the
//! signed token as the plaintext of a JWE (the nested-JWT composition).
//! The engine always signs before encrypting, never the reverse.

use anyhow::bail;
use tracing::instrument;

use crate::jose::jwa::{ContentEncryptionAlgorithm, KeyManagementAlgorithm};
use crate::jose::jwk::Jwk;
use crate::jose::jwt::JsonWebToken;
use crate::jose::{jwe, jws};

/// Issue a compact token.
///
/// With no signing key the token is unsigned: the header algorithm is the
/// literal `"none"` and the signature segment is empty. With an encrypting
/// key the signed token is wrapped in a JWE, producing the 5-segment
/// compact form; the key-management and content-encryption algorithms
/// default from the encrypting key's declared algorithm, then from its
/// variant (RSA-OAEP for RSA keys, `"dir"` for symmetric keys) with
/// A128CBC-HS256 content encryption.
///
/// # Errors
///
/// Returns an error if the signing key does not fit its algorithm, or the
/// encrypting key's type or length does not fit the selected key-management
/// algorithm.
#[instrument(level = "debug", skip_all)]
pub fn issue(
    token: &JsonWebToken, signing_key: Option<&Jwk>, encrypting_key: Option<&Jwk>,
    key_mgmt: Option<KeyManagementAlgorithm>, content_enc: Option<ContentEncryptionAlgorithm>,
) -> anyhow::Result<String> {
    tracing::debug!("token::issue");

    // encode the claim set and sign
    let payload = serde_json::to_vec(&token.payload)?;
    let signed = jws::sign(&token.header, &payload, signing_key)?;

    // unencrypted tokens are returned in the 3-segment JWS form unchanged
    let Some(key) = encrypting_key else {
        return Ok(signed);
    };

    let alg = match key_mgmt {
        Some(alg) => alg,
        None => default_key_management(key)?,
    };
    let enc = content_enc.unwrap_or(ContentEncryptionAlgorithm::A128CbcHs256);

    // the signed token becomes the JWE plaintext (nested JWT)
    jwe::encrypt(signed.as_bytes(), key, alg, enc, Some("JWT".into()))
}

// The encrypting key's declared algorithm wins; otherwise fall back by key
// variant.
fn default_key_management(key: &Jwk) -> anyhow::Result<KeyManagementAlgorithm> {
    if let Some(declared) = key.algorithm() {
        if let Ok(alg) = declared.parse() {
            return Ok(alg);
        }
    }
    match key {
        Jwk::Rsa(_) => Ok(KeyManagementAlgorithm::RsaOaep),
        Jwk::Oct(_) => Ok(KeyManagementAlgorithm::Direct),
        Jwk::Ec(_) => bail!("no key management algorithm is available for EC keys"),
    }
}
