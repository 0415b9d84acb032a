//! # JSON Object Signing and Encryption (JOSE)
//!
//! The JOSE working group's standards describe how to sign and encrypt
//! content using JSON-based data structures. This module implements the
//! pieces the token engine needs: algorithm identifiers (JWA, [RFC7518]),
//! keys (JWK, [RFC7517]), claims (JWT, [RFC7519]), signatures (JWS,
//! [RFC7515]), and encryption (JWE, [RFC7516]).
//!
//! See the [IANA] registries for the full set of registered identifiers.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518
//! [RFC7519]: https://www.rfc-editor.org/rfc/rfc7519
//! [IANA]: https://www.iana.org/assignments/jose/jose.xhtml

pub mod jwa;
pub mod jwe;
pub mod jwk;
pub mod jws;
pub mod jwt;
