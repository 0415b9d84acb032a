//! # Veridian JOSE
//!
//! Security-token issuance and validation for the Veridian identity
//! provider, implementing the JSON Object Signing and Encryption (JOSE)
//! family of standards: JWS ([RFC7515]), JWE ([RFC7516]), JWK ([RFC7517]),
//! and JWT ([RFC7519]).
//!
//! The crate is organised leaf-first. The typed key model ([`jose::jwk`]),
//! the claim codec ([`jose::jwt`]), the signing engine ([`jose::jws`]), and
//! the encryption engine ([`jose::jwe`]) do not depend on their callers; the
//! [`token`] module orchestrates them to mint compact tokens
//! ([`token::issue`]) and to validate presented ones ([`token::validate`]).
//!
//! The engine is stateless and safe for concurrent use: every call is a pure
//! function of its inputs and the provider's clock. The only suspension
//! points are the caller-supplied key-resolution sequences, which the
//! validator consumes strictly in order, stopping at the first match.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
//! [RFC7519]: https://www.rfc-editor.org/rfc/rfc7519

pub mod error;
pub mod jose;
pub mod token;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

pub use crate::error::Error;
pub use crate::jose::jwa::{ContentEncryptionAlgorithm, KeyManagementAlgorithm, SigningAlgorithm};
pub use crate::jose::jwk::{Curve, EcKey, Jwk, Jwks, KeyUse, OctKey, RsaKey};
pub use crate::jose::jwt::{Header, JsonWebToken, Payload};
pub use crate::token::{issue, validate, ValidationOptions, ValidationParameters};

/// Result type for token validation.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// The `TokenProvider` trait is used by implementers to supply the validator
/// with trusted key material and issuer/audience policy.
///
/// Key resolution is lazy: the validator pulls keys from the returned stream
/// one at a time and stops at the first key that verifies or decrypts, so
/// implementers should yield the most likely keys first. Resolution may
/// perform I/O (for example fetching a JWKS document); the engine has no
/// opinion on how that I/O is scheduled and applies no timeout or retry of
/// its own.
#[allow(async_fn_in_trait)]
pub trait TokenProvider: Send + Sync {
    /// Keys trusted to verify token signatures for the given issuer, in
    /// trial order.
    fn signing_keys(&self, issuer: &str) -> BoxStream<'static, Jwk>;

    /// Keys available to decrypt tokens, in trial order.
    ///
    /// The issuer argument is advisory only: an encrypted token's issuer
    /// claim is not knowable before the token is opened, so the validator
    /// passes an empty hint. Implementations should not rely on it.
    fn decryption_keys(&self, issuer: &str) -> BoxStream<'static, Jwk>;

    /// Returns `true` if the issuer is trusted.
    async fn validate_issuer(&self, issuer: &str) -> bool;

    /// Returns `true` if any of the token's audiences is acceptable.
    async fn validate_audience(&self, audiences: &[String]) -> bool;

    /// Current wall-clock time. Override to pin the clock in tests.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
