//! # Token Validation
//!
//! A strict, failure-closed state machine:
//!
//! ```text
//! Parsed → (Decrypted) → Verified → ClaimsChecked → Success | Failure
//! ```
//!
//! The compact string is split on `.`: exactly 3 segments selects the JWS
//! path, exactly 5 the JWE path, anything else fails. A decrypted JWE
//! yields an inner compact string that re-enters the machine on the JWS
//! path (nested-JWT unwrap). Every expected failure folds into the single
//! [`Error::InvalidToken`] kind; the finer causes are logged only.

use chrono::{DateTime, Duration, Utc};
use futures::StreamExt as _;
use tracing::instrument;

use crate::error::Error;
use crate::jose::jwa::SigningAlgorithm;
use crate::jose::jwk::{Jwk, KeyUse};
use crate::jose::jwt::{Header, JsonWebToken, Payload};
use crate::jose::{jwe, jws};
use crate::{Result, TokenProvider};

/// Which validation checks to run. Defaults to all checks enabled; clearing
/// a flag is an explicit caller decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Check the issuer claim against the provider.
    pub validate_issuer: bool,

    /// Check the audience claims against the provider.
    pub validate_audience: bool,

    /// Reject tokens whose algorithm is `"none"`.
    pub require_signed_tokens: bool,

    /// Check the matched signing key's declared use and algorithm against
    /// the token.
    pub validate_issuer_signing_key: bool,

    /// Check `exp`, `nbf`, and `iat` against the clock.
    pub validate_lifetime: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            validate_issuer: true,
            validate_audience: true,
            require_signed_tokens: true,
            validate_issuer_signing_key: true,
            validate_lifetime: true,
        }
    }
}

/// Parameters for a validation call: the option set plus the clock-skew
/// tolerance absorbed by the lifetime checks. The skew defaults to zero;
/// tolerance is opt-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationParameters {
    /// Which checks to run.
    pub options: ValidationOptions,

    /// Tolerance applied to the lifetime boundaries.
    pub clock_skew: Duration,
}

impl Default for ValidationParameters {
    fn default() -> Self {
        Self { options: ValidationOptions::default(), clock_skew: Duration::zero() }
    }
}

/// Validate a compact token.
///
/// Keys are pulled lazily from the provider's resolution streams, strictly
/// in order, stopping at the first key that decrypts or verifies, so
/// callers ordering trusted keys first reduce work. All expected failures are
/// reported as [`Error::InvalidToken`]; no partial-success information is
/// surfaced.
///
/// # Errors
///
/// Returns [`Error::InvalidToken`] with a diagnostic description on any
/// validation failure.
#[instrument(level = "debug", skip_all)]
pub async fn validate(
    compact: &str, provider: &impl TokenProvider, params: &ValidationParameters,
) -> Result<JsonWebToken> {
    tracing::debug!("token::validate");

    match compact.split('.').count() {
        3 => validate_signed(compact, provider, params).await,
        5 => {
            let inner = decrypt_token(compact, provider).await?;
            if inner.split('.').count() != 3 {
                tracing::debug!("decrypted plaintext is not a compact JWS");
                return Err(invalid("malformed token"));
            }
            validate_signed(&inner, provider, params).await
        }
        _ => Err(invalid("malformed token")),
    }
}

// JWE path: open the envelope with the provider's decryption keys, yielding
// the inner compact JWS. The issuer hint is empty: the issuer claim is not
// knowable before decryption.
async fn decrypt_token(compact: &str, provider: &impl TokenProvider) -> Result<String> {
    let jwe = jwe::parse(compact).map_err(|e| {
        tracing::debug!("malformed JWE: {e}");
        invalid("malformed token")
    })?;

    let mut keys = provider.decryption_keys("");
    let mut attempted = false;
    while let Some(key) = keys.next().await {
        if !jwe::key_matches(&jwe.header, &key) {
            continue;
        }
        attempted = true;
        match jwe::decrypt_with(&jwe, &key) {
            Ok(plaintext) => {
                return String::from_utf8(plaintext).map_err(|_| {
                    tracing::debug!("decrypted plaintext is not valid UTF-8");
                    invalid("malformed token")
                });
            }
            Err(e) => tracing::debug!("decryption attempt failed: {e}"),
        }
    }

    if attempted {
        Err(invalid("failed to decrypt token"))
    } else {
        Err(invalid("no decryption keys found"))
    }
}

// JWS path: verify the signature, then run the claim checks.
async fn validate_signed(
    compact: &str, provider: &impl TokenProvider, params: &ValidationParameters,
) -> Result<JsonWebToken> {
    let jws = jws::parse(compact).map_err(|e| {
        tracing::debug!("malformed JWS: {e}");
        invalid("malformed token")
    })?;
    let payload: Payload = serde_json::from_slice(&jws.payload).map_err(|e| {
        tracing::debug!("issue deserializing claims: {e}");
        invalid("malformed token")
    })?;

    let matched_key = verify_signature(&jws, &payload, provider, params).await?;
    check_claims(&payload, jws.header.alg, matched_key.as_ref(), provider, params).await?;

    Ok(JsonWebToken { header: Header::from(&jws.header), payload })
}

// Resolve the issuer's signing keys and try them strictly in order. An
// unsigned token passes only when policy permits it and yields no key.
async fn verify_signature(
    jws: &jws::ParsedJws, payload: &Payload, provider: &impl TokenProvider,
    params: &ValidationParameters,
) -> Result<Option<Jwk>> {
    if jws.header.alg.is_unsigned() {
        if !jws.signature.is_empty() {
            tracing::debug!("unsigned token carries a signature");
            return Err(invalid("malformed token"));
        }
        if params.options.require_signed_tokens {
            tracing::debug!("unsigned token rejected by policy");
            return Err(invalid("unsigned tokens are not accepted"));
        }
        return Ok(None);
    }

    let issuer = payload.issuer().unwrap_or_default().to_string();
    let mut keys = provider.signing_keys(&issuer);
    let mut any = false;
    while let Some(key) = keys.next().await {
        any = true;
        if jws::verify_signature(&key, jws.header.alg, jws.signing_input.as_bytes(), &jws.signature)
            .is_ok()
        {
            return Ok(Some(key));
        }
    }

    if any {
        tracing::debug!("signature validation failed against all candidate keys");
    } else {
        tracing::debug!("no signing keys resolved for issuer {issuer:?}");
    }
    Err(invalid("signature validation failed"))
}

async fn check_claims(
    payload: &Payload, alg: SigningAlgorithm, matched_key: Option<&Jwk>,
    provider: &impl TokenProvider, params: &ValidationParameters,
) -> Result<()> {
    let options = &params.options;

    if options.validate_issuer {
        let Some(issuer) = payload.issuer() else {
            return Err(invalid("the token has no issuer"));
        };
        if !provider.validate_issuer(issuer).await {
            tracing::debug!("issuer {issuer:?} rejected");
            return Err(invalid("invalid issuer"));
        }
    }

    if options.validate_audience {
        let audiences = payload.audiences();
        if audiences.is_empty() {
            return Err(invalid("the token has no audience"));
        }
        if !provider.validate_audience(&audiences).await {
            tracing::debug!("audiences {audiences:?} rejected");
            return Err(invalid("invalid audience"));
        }
    }

    if options.validate_issuer_signing_key {
        if let Some(key) = matched_key {
            check_signing_key(key, alg)?;
        }
    }

    if options.validate_lifetime {
        check_lifetime(payload, provider.now(), params.clock_skew)?;
    }

    Ok(())
}

// The matched key must be declared consistent with how it was just used: a
// declared `use` of "enc" or a declared algorithm other than the token's
// disqualifies it.
fn check_signing_key(key: &Jwk, alg: SigningAlgorithm) -> Result<()> {
    if key.key_use() == Some(&KeyUse::Encryption) {
        tracing::debug!("matched key {:?} is declared for encryption use", key.kid());
        return Err(invalid("the signing key is not valid for signature use"));
    }
    if let Some(declared) = key.algorithm() {
        if let Ok(declared) = declared.parse::<SigningAlgorithm>() {
            if declared != alg {
                tracing::debug!(
                    "matched key {:?} declares {declared}, token uses {alg}",
                    key.kid()
                );
                return Err(invalid("the signing key does not match the token algorithm"));
            }
        }
    }
    Ok(())
}

fn check_lifetime(payload: &Payload, now: DateTime<Utc>, skew: Duration) -> Result<()> {
    let Some(expires) = payload.expires_at() else {
        return Err(invalid("Lifetime validation failed. The token has no expiration time."));
    };
    if now - skew > expires {
        tracing::debug!("token expired at {expires}");
        return Err(invalid("Lifetime validation failed. The token is expired (exp)."));
    }
    if let Some(not_before) = payload.not_before() {
        if now + skew < not_before {
            tracing::debug!("token not valid before {not_before}");
            return Err(invalid("Lifetime validation failed. The token is not yet valid (nbf)."));
        }
    }
    if let Some(issued) = payload.issued_at() {
        if issued > now + skew {
            tracing::debug!("token issued in the future at {issued}");
            return Err(invalid(
                "Lifetime validation failed. The token was issued in the future (iat).",
            ));
        }
    }
    Ok(())
}

fn invalid(description: &str) -> Error {
    Error::InvalidToken(description.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lifetime_boundaries_respect_skew() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut payload = Payload::new();

        // expired 30 seconds ago: passes with 30s of skew, fails without
        payload.set_expires_at(Some(now - Duration::seconds(30)));
        assert!(check_lifetime(&payload, now, Duration::seconds(30)).is_ok());
        assert!(check_lifetime(&payload, now, Duration::zero()).is_err());
    }

    #[test]
    fn missing_expiry_fails_closed() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let payload = Payload::new();
        let err = check_lifetime(&payload, now, Duration::zero()).unwrap_err();
        assert!(err.description().contains("no expiration time"));
    }

    #[test]
    fn not_yet_valid_token_is_rejected() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut payload = Payload::new();
        payload.set_expires_at(Some(now + Duration::seconds(600)));
        payload.set_not_before(Some(now + Duration::seconds(60)));

        let err = check_lifetime(&payload, now, Duration::zero()).unwrap_err();
        assert!(err.description().contains("(nbf)"));
        assert!(check_lifetime(&payload, now, Duration::seconds(60)).is_ok());
    }

    #[test]
    fn future_issued_at_is_rejected() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut payload = Payload::new();
        payload.set_expires_at(Some(now + Duration::seconds(600)));
        payload.set_issued_at(Some(now + Duration::seconds(120)));

        let err = check_lifetime(&payload, now, Duration::zero()).unwrap_err();
        assert!(err.description().contains("(iat)"));
    }

    #[test]
    fn options_default_to_all_checks() {
        let options = ValidationOptions::default();
        assert!(
            options.validate_issuer
                && options.validate_audience
                && options.require_signed_tokens
                && options.validate_issuer_signing_key
                && options.validate_lifetime
        );
    }
}
