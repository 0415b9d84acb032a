//! # JSON Web Token (JWT)
//!
//! JWT ([RFC7519]) represents claims as a JSON object that is signed (JWS)
//! and optionally encrypted (JWE). This module holds the token value object
//! and the claim codec: the canonical rules for how typed claim values map
//! onto the underlying JSON claim set.
//!
//! [RFC7519]: https://www.rfc-editor.org/rfc/rfc7519

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::jose::jwa::SigningAlgorithm;

/// A security token: a header and an ordered claim set. Immutable once
/// issued; claim mutation is the caller's responsibility before signing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonWebToken {
    /// The token header.
    pub header: Header,

    /// The token claim set.
    pub payload: Payload,
}

impl JsonWebToken {
    /// Creates an empty token with the `typ` header set to `"JWT"`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: Header { typ: Some("JWT".into()), ..Header::default() },
            payload: Payload::default(),
        }
    }
}

/// The token header: algorithm identifiers and an optional key id.
///
/// When `alg` is unset the creator takes the algorithm from the signing
/// key's declared algorithm, or the literal `"none"` when no signing key is
/// supplied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// Signature algorithm override.
    pub alg: Option<SigningAlgorithm>,

    /// Media type of the token, typically `"JWT"`.
    pub typ: Option<String>,

    /// Identifier of the key used to secure the token.
    pub kid: Option<String>,

    /// Content type of the payload. `"JWT"` marks a nested token.
    pub cty: Option<String>,
}

/// The claim set: an ordered mapping from claim name to JSON value.
///
/// Typed accessors are layered over the generic mapping: mutating a typed
/// accessor mutates the same underlying entry the generic accessor sees.
/// The encoding rules are:
///
/// - assigning a JSON `null` removes the entry entirely;
/// - an empty list assigned to an array-or-string claim removes the entry;
/// - a single-element list assigned to an array-or-string claim is stored
///   as a bare scalar; decoding accepts either shape;
/// - the space-separated family (`scope`) is stored as one joined string;
///   an empty list yields an empty string, not a removed entry;
/// - numeric dates are stored as integer seconds since the Unix epoch, and
///   fractional input is truncated on decode;
/// - a floating-point value with zero fractional part is stored as a JSON
///   integer;
/// - string-array decoding silently skips `null` elements.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Payload {
    claims: Map<String, Value>,
}

impl Payload {
    /// Creates an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw claim value, if present.
    #[must_use]
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.claims.get(claim)
    }

    /// Sets a claim to the given JSON value. Assigning `Value::Null`
    /// removes the entry; a float with a zero fractional part is stored as
    /// an integer.
    pub fn set(&mut self, claim: &str, value: impl Into<Value>) {
        match normalize(value.into()) {
            Value::Null => {
                self.claims.shift_remove(claim);
            }
            value => {
                self.claims.insert(claim.to_string(), value);
            }
        }
    }

    /// Removes a claim, returning its previous value.
    pub fn remove(&mut self, claim: &str) -> Option<Value> {
        self.claims.shift_remove(claim)
    }

    /// A read-only view of the underlying mapping.
    #[must_use]
    pub const fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    // --- generic typed access -------------------------------------------

    /// A string claim.
    #[must_use]
    pub fn string(&self, claim: &str) -> Option<&str> {
        self.claims.get(claim).and_then(Value::as_str)
    }

    /// Sets or removes a string claim.
    pub fn set_string(&mut self, claim: &str, value: Option<&str>) {
        match value {
            Some(value) => self.set(claim, value),
            None => {
                self.claims.shift_remove(claim);
            }
        }
    }

    /// An array-or-string claim, decoded to a list. Accepts a bare scalar
    /// or an array; `null` elements are skipped.
    #[must_use]
    pub fn strings(&self, claim: &str) -> Vec<String> {
        match self.claims.get(claim) {
            Some(Value::String(value)) => vec![value.clone()],
            Some(Value::Array(values)) => {
                values.iter().filter_map(Value::as_str).map(ToOwned::to_owned).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Sets an array-or-string claim: an empty list removes the entry and a
    /// single-element list collapses to a bare scalar.
    pub fn set_strings(&mut self, claim: &str, values: &[String]) {
        match values {
            [] => {
                self.claims.shift_remove(claim);
            }
            [value] => {
                self.claims.insert(claim.to_string(), Value::from(value.clone()));
            }
            values => {
                self.claims.insert(claim.to_string(), Value::from(values.to_vec()));
            }
        }
    }

    /// A numeric-date claim. Fractional input is truncated.
    #[must_use]
    pub fn date_time(&self, claim: &str) -> Option<DateTime<Utc>> {
        let value = self.claims.get(claim)?;
        #[allow(clippy::cast_possible_truncation)]
        let seconds = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))?;
        DateTime::from_timestamp(seconds, 0)
    }

    /// Sets or removes a numeric-date claim, stored as integer seconds
    /// since the Unix epoch.
    pub fn set_date_time(&mut self, claim: &str, value: Option<DateTime<Utc>>) {
        match value {
            Some(value) => {
                self.claims.insert(claim.to_string(), Value::from(value.timestamp()));
            }
            None => {
                self.claims.shift_remove(claim);
            }
        }
    }

    // --- registered claims ----------------------------------------------

    /// Issuer (`iss`).
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.string("iss")
    }

    /// Sets the issuer (`iss`).
    pub fn set_issuer(&mut self, value: Option<&str>) {
        self.set_string("iss", value);
    }

    /// Subject (`sub`).
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.string("sub")
    }

    /// Sets the subject (`sub`).
    pub fn set_subject(&mut self, value: Option<&str>) {
        self.set_string("sub", value);
    }

    /// Audiences (`aud`), an array-or-string claim.
    #[must_use]
    pub fn audiences(&self) -> Vec<String> {
        self.strings("aud")
    }

    /// Sets the audiences (`aud`).
    pub fn set_audiences(&mut self, values: &[String]) {
        self.set_strings("aud", values);
    }

    /// Expiration time (`exp`).
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.date_time("exp")
    }

    /// Sets the expiration time (`exp`).
    pub fn set_expires_at(&mut self, value: Option<DateTime<Utc>>) {
        self.set_date_time("exp", value);
    }

    /// Not-before time (`nbf`).
    #[must_use]
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.date_time("nbf")
    }

    /// Sets the not-before time (`nbf`).
    pub fn set_not_before(&mut self, value: Option<DateTime<Utc>>) {
        self.set_date_time("nbf", value);
    }

    /// Issued-at time (`iat`).
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.date_time("iat")
    }

    /// Sets the issued-at time (`iat`).
    pub fn set_issued_at(&mut self, value: Option<DateTime<Utc>>) {
        self.set_date_time("iat", value);
    }

    /// Token identifier (`jti`).
    #[must_use]
    pub fn jwt_id(&self) -> Option<&str> {
        self.string("jti")
    }

    /// Sets the token identifier (`jti`).
    pub fn set_jwt_id(&mut self, value: Option<&str>) {
        self.set_string("jti", value);
    }

    /// Scopes (`scope`), a space-separated claim.
    #[must_use]
    pub fn scope(&self) -> Vec<String> {
        self.string("scope")
            .map(|s| s.split_whitespace().map(ToOwned::to_owned).collect())
            .unwrap_or_default()
    }

    /// Sets the scopes (`scope`), joined by single spaces. An empty list
    /// stores an empty string: the entry is retained.
    pub fn set_scope(&mut self, values: &[String]) {
        self.claims.insert("scope".to_string(), Value::from(values.join(" ")));
    }

    /// Client identifier (`client_id`).
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.string("client_id")
    }

    /// Sets the client identifier (`client_id`).
    pub fn set_client_id(&mut self, value: Option<&str>) {
        self.set_string("client_id", value);
    }

    /// Session identifier (`sid`).
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.string("sid")
    }

    /// Sets the session identifier (`sid`).
    pub fn set_session_id(&mut self, value: Option<&str>) {
        self.set_string("sid", value);
    }

    /// Nonce (`nonce`).
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.string("nonce")
    }

    /// Sets the nonce (`nonce`).
    pub fn set_nonce(&mut self, value: Option<&str>) {
        self.set_string("nonce", value);
    }

    /// Authentication time (`auth_time`).
    #[must_use]
    pub fn auth_time(&self) -> Option<DateTime<Utc>> {
        self.date_time("auth_time")
    }

    /// Sets the authentication time (`auth_time`).
    pub fn set_auth_time(&mut self, value: Option<DateTime<Utc>>) {
        self.set_date_time("auth_time", value);
    }

    /// Authentication method references (`amr`), an array-or-string claim.
    #[must_use]
    pub fn auth_method_refs(&self) -> Vec<String> {
        self.strings("amr")
    }

    /// Sets the authentication method references (`amr`).
    pub fn set_auth_method_refs(&mut self, values: &[String]) {
        self.set_strings("amr", values);
    }

    /// Authentication context class reference (`acr`).
    #[must_use]
    pub fn auth_context_class(&self) -> Option<&str> {
        self.string("acr")
    }

    /// Sets the authentication context class reference (`acr`).
    pub fn set_auth_context_class(&mut self, value: Option<&str>) {
        self.set_string("acr", value);
    }

    /// Identity provider (`idp`).
    #[must_use]
    pub fn identity_provider(&self) -> Option<&str> {
        self.string("idp")
    }

    /// Sets the identity provider (`idp`).
    pub fn set_identity_provider(&mut self, value: Option<&str>) {
        self.set_string("idp", value);
    }

    /// Email address (`email`).
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.string("email")
    }

    /// Sets the email address (`email`).
    pub fn set_email(&mut self, value: Option<&str>) {
        self.set_string("email", value);
    }

    /// Email verification state (`email_verified`).
    #[must_use]
    pub fn email_verified(&self) -> Option<bool> {
        self.claims.get("email_verified").and_then(Value::as_bool)
    }

    /// Sets the email verification state (`email_verified`).
    pub fn set_email_verified(&mut self, value: Option<bool>) {
        match value {
            Some(value) => self.set("email_verified", value),
            None => {
                self.claims.shift_remove("email_verified");
            }
        }
    }
}

// A float with a zero fractional part encodes as a JSON integer.
fn normalize(value: Value) -> Value {
    let Value::Number(number) = &value else {
        return value;
    };
    if number.is_f64() {
        if let Some(f) = number.as_f64() {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                return Value::from(f as i64);
            }
        }
    }
    value
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn null_assignment_removes_entry() {
        let mut payload = Payload::new();
        payload.set("custom", "value");
        payload.set("custom", Value::Null);
        assert!(payload.get("custom").is_none());

        payload.set_issuer(Some("https://example.com"));
        payload.set_issuer(None);
        assert!(payload.issuer().is_none());
    }

    #[test]
    fn single_audience_collapses_to_scalar() {
        let mut payload = Payload::new();
        payload.set_audiences(&["one".into()]);
        assert_eq!(payload.get("aud"), Some(&json!("one")));
        assert_eq!(payload.audiences(), vec!["one".to_string()]);

        payload.set_audiences(&["one".into(), "two".into()]);
        assert_eq!(payload.get("aud"), Some(&json!(["one", "two"])));

        payload.set_audiences(&[]);
        assert!(payload.get("aud").is_none());
    }

    #[test]
    fn audience_decoding_skips_nulls() {
        let mut payload = Payload::new();
        payload.set("aud", json!(["one", null, "two"]));
        assert_eq!(payload.audiences(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn scope_is_space_separated() {
        let mut payload = Payload::new();
        payload.set_scope(&["openid".into(), "profile".into()]);
        assert_eq!(payload.get("scope"), Some(&json!("openid profile")));
        assert_eq!(payload.scope(), vec!["openid".to_string(), "profile".to_string()]);

        // an empty scope list keeps the entry, unlike the audience family
        payload.set_scope(&[]);
        assert_eq!(payload.get("scope"), Some(&json!("")));
        assert!(payload.scope().is_empty());
    }

    #[test]
    fn numeric_dates_are_integer_seconds() {
        let mut payload = Payload::new();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        payload.set_expires_at(Some(at));
        assert_eq!(payload.get("exp"), Some(&json!(1_700_000_000)));

        // fractional input is truncated on decode
        payload.set("nbf", json!(1_700_000_000.9));
        assert_eq!(payload.not_before(), DateTime::from_timestamp(1_700_000_000, 0));
    }

    #[test]
    fn whole_floats_collapse_to_integers() {
        let mut payload = Payload::new();
        payload.set("count", 3.0);
        assert_eq!(payload.get("count"), Some(&json!(3)));

        payload.set("ratio", 3.5);
        assert_eq!(payload.get("ratio"), Some(&json!(3.5)));
    }

    #[test]
    fn typed_and_generic_views_share_entries() {
        let mut payload = Payload::new();
        payload.set("sub", "alice");
        assert_eq!(payload.subject(), Some("alice"));

        payload.set_subject(Some("bob"));
        assert_eq!(payload.get("sub"), Some(&json!("bob")));
    }

    #[test]
    fn claim_order_is_preserved() {
        let mut payload = Payload::new();
        payload.set_issuer(Some("https://example.com"));
        payload.set_subject(Some("alice"));
        payload.set("name", "Alice");

        let names: Vec<&String> = payload.claims().keys().collect();
        assert_eq!(names, ["iss", "sub", "name"]);
    }
}
