//! End-to-end issue → validate tests across the signing and encryption
//! algorithm families.


use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use keystore::{
    ec_jwk, oct_jwk, rsa_jwk, rsa_jwk_alt, sample_token, TestProvider, AUDIENCE, ISSUER,
};
use rstest::rstest;
use veridian_jose::{
    issue, validate, ContentEncryptionAlgorithm as Enc, Curve, Jwk,
    KeyManagementAlgorithm as Km, SigningAlgorithm as Alg, ValidationParameters,
};

// a whole-second clock: numeric-date claims carry integer seconds
fn whole_second_now() -> DateTime<Utc> {
    DateTime::from_timestamp(Utc::now().timestamp(), 0).expect("should convert")
}

fn decode_header(compact: &str) -> serde_json::Value {
    let first = compact.split('.').next().expect("should have a header segment");
    let decoded = Base64UrlUnpadded::decode_vec(first).expect("should decode");
    serde_json::from_slice(&decoded).expect("should deserialize")
}

fn signing_key(alg: Alg) -> Jwk {
    match alg {
        Alg::Rs256 | Alg::Rs384 | Alg::Rs512 | Alg::Ps256 | Alg::Ps384 | Alg::Ps512 => {
            rsa_jwk("rsa-sign", alg.as_str())
        }
        Alg::Es256 => ec_jwk(Curve::P256, "ec-sign", alg.as_str()),
        Alg::Es384 => ec_jwk(Curve::P384, "ec-sign", alg.as_str()),
        Alg::Es512 => ec_jwk(Curve::P521, "ec-sign", alg.as_str()),
        Alg::Hs256 | Alg::Hs384 | Alg::Hs512 | Alg::None => {
            oct_jwk(64, "hmac-sign", alg.as_str())
        }
    }
}

fn encryption_key(alg: Km, enc: Enc) -> Jwk {
    match alg {
        Km::RsaOaep | Km::RsaOaep256 | Km::Rsa1_5 => rsa_jwk("rsa-enc", alg.as_str()),
        Km::A128GcmKw => oct_jwk(16, "kw-enc", alg.as_str()),
        Km::A192GcmKw => oct_jwk(24, "kw-enc", alg.as_str()),
        Km::A256GcmKw => oct_jwk(32, "kw-enc", alg.as_str()),
        Km::Direct => oct_jwk(enc.cek_len(), "dir-enc", alg.as_str()),
    }
}

#[rstest]
#[case::rs256(Alg::Rs256)]
#[case::rs384(Alg::Rs384)]
#[case::rs512(Alg::Rs512)]
#[case::ps256(Alg::Ps256)]
#[case::ps384(Alg::Ps384)]
#[case::ps512(Alg::Ps512)]
#[case::es256(Alg::Es256)]
#[case::es384(Alg::Es384)]
#[case::es512(Alg::Es512)]
#[case::hs256(Alg::Hs256)]
#[case::hs384(Alg::Hs384)]
#[case::hs512(Alg::Hs512)]
#[tokio::test]
async fn signing_algorithms_round_trip(#[case] alg: Alg) {
    keystore::init_tracer();
    let now = whole_second_now();
    let key = signing_key(alg);

    let mut token = sample_token(now);
    token.payload.set("name", "John Doe");

    let compact = issue(&token, Some(&key), None, None, None).expect("should issue");
    assert_eq!(compact.split('.').count(), 3);
    assert_eq!(decode_header(&compact)["alg"], alg.as_str());

    let mut provider = TestProvider::new(vec![key], vec![]);
    provider.now = Some(now);

    let validated = validate(&compact, &provider, &ValidationParameters::default())
        .await
        .expect("should validate");
    assert_eq!(validated.header.alg, Some(alg));
    assert_eq!(validated.payload.string("name"), Some("John Doe"));
}

#[rstest]
#[tokio::test]
async fn encryption_algorithms_round_trip(
    #[values(
        Km::RsaOaep,
        Km::RsaOaep256,
        Km::Rsa1_5,
        Km::A128GcmKw,
        Km::A192GcmKw,
        Km::A256GcmKw,
        Km::Direct
    )]
    alg: Km,
    #[values(
        Enc::A128CbcHs256,
        Enc::A192CbcHs384,
        Enc::A256CbcHs512,
        Enc::A128Gcm,
        Enc::A192Gcm,
        Enc::A256Gcm
    )]
    enc: Enc,
) {
    let now = whole_second_now();
    let sign_key = oct_jwk(32, "hmac-sign", "HS256");
    let enc_key = encryption_key(alg, enc);

    let token = sample_token(now);
    let compact = issue(&token, Some(&sign_key), Some(&enc_key), Some(alg), Some(enc))
        .expect("should issue");
    assert_eq!(compact.split('.').count(), 5);

    let header = decode_header(&compact);
    assert_eq!(header["alg"], alg.as_str());
    assert_eq!(header["enc"], enc.as_str());

    let mut provider = TestProvider::new(vec![sign_key], vec![enc_key]);
    provider.now = Some(now);

    let validated = validate(&compact, &provider, &ValidationParameters::default())
        .await
        .expect("should validate");
    assert_eq!(validated.payload.issuer(), Some(ISSUER));
}

#[tokio::test]
async fn unsigned_token_policy() {
    let now = whole_second_now();
    let token = sample_token(now);

    let compact = issue(&token, None, None, None, None).expect("should issue");
    let parts: Vec<&str> = compact.split('.').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(decode_header(&compact)["alg"], "none");
    assert!(parts[2].is_empty());

    let mut provider = TestProvider::new(vec![], vec![]);
    provider.now = Some(now);

    // rejected under the default policy
    let strict = ValidationParameters::default();
    assert!(validate(&compact, &provider, &strict).await.is_err());

    // accepted once the caller clears the requirement
    let mut relaxed = ValidationParameters::default();
    relaxed.options.require_signed_tokens = false;
    let validated = validate(&compact, &provider, &relaxed).await.expect("should validate");
    assert_eq!(validated.payload.issuer(), Some(ISSUER));
}

#[test]
fn direct_key_size_is_exact() {
    let now = whole_second_now();
    let token = sample_token(now);

    // A256GCM needs a 32-byte CEK; a 16-byte key must be refused
    let short = oct_jwk(16, "dir-enc", "dir");
    assert!(
        issue(&token, None, Some(&short), Some(Km::Direct), Some(Enc::A256Gcm)).is_err()
    );

    let exact = oct_jwk(32, "dir-enc", "dir");
    let compact = issue(&token, None, Some(&exact), Some(Km::Direct), Some(Enc::A256Gcm))
        .expect("should issue");
    let parts: Vec<&str> = compact.split('.').collect();
    assert!(parts[1].is_empty(), "dir produces an empty encrypted-key segment");
}

#[tokio::test]
async fn gcm_key_wrap_enforces_size_and_freshness() {
    let now = whole_second_now();
    let token = sample_token(now);

    // a 256-bit key declared for the 128-bit wrap algorithm must be refused
    let oversized = oct_jwk(32, "kw-enc", "A128GCMKW");
    assert!(
        issue(&token, None, Some(&oversized), Some(Km::A128GcmKw), Some(Enc::A128Gcm)).is_err()
    );

    // identical plaintext never encrypts to identical ciphertext
    let key = oct_jwk(32, "kw-enc", "A256GCMKW");
    let first = issue(&token, None, Some(&key), Some(Km::A256GcmKw), Some(Enc::A128Gcm))
        .expect("should issue");
    let second = issue(&token, None, Some(&key), Some(Km::A256GcmKw), Some(Enc::A128Gcm))
        .expect("should issue");
    assert_ne!(first, second);

    let mut provider = TestProvider::new(vec![], vec![key]);
    provider.now = Some(now);
    let mut params = ValidationParameters::default();
    params.options.require_signed_tokens = false;

    assert!(validate(&first, &provider, &params).await.is_ok());
    assert!(validate(&second, &provider, &params).await.is_ok());
}

#[tokio::test]
async fn later_key_in_resolution_order_matches() {
    let now = whole_second_now();
    let right = rsa_jwk("right", "RS256");
    let wrong = rsa_jwk_alt("wrong", "RS256");

    let token = sample_token(now);
    let compact = issue(&token, Some(&right), None, None, None).expect("should issue");

    let mut provider = TestProvider::new(vec![wrong, right], vec![]);
    provider.now = Some(now);

    validate(&compact, &provider, &ValidationParameters::default())
        .await
        .expect("should validate via the second candidate");
}

#[tokio::test]
async fn expired_token_within_clock_skew() {
    let now = whole_second_now();
    let key = oct_jwk(32, "hmac-sign", "HS256");

    let mut token = sample_token(now);
    token.payload.set_expires_at(Some(now - Duration::seconds(30)));
    let compact = issue(&token, Some(&key), None, None, None).expect("should issue");

    let mut provider = TestProvider::new(vec![key], vec![]);
    provider.now = Some(now);

    let mut tolerant = ValidationParameters::default();
    tolerant.clock_skew = Duration::seconds(30);
    assert!(validate(&compact, &provider, &tolerant).await.is_ok());

    let strict = ValidationParameters::default();
    let err = validate(&compact, &provider, &strict).await.unwrap_err();
    assert!(err.description().contains("expired"));
}

#[tokio::test]
async fn round_trip_preserves_claims() {
    let now = whole_second_now();
    let key = oct_jwk(32, "hmac-sign", "HS256");

    let mut token = sample_token(now);
    token.payload.set_subject(Some("user-42"));
    token.payload.set_scope(&["openid".into(), "email".into()]);
    token.payload.set_auth_method_refs(&["pwd".into(), "otp".into()]);
    token.payload.set_email(Some("user@example.com"));
    token.payload.set_email_verified(Some(true));
    token.payload.set("roles", serde_json::json!(["admin", "auditor"]));

    let compact = issue(&token, Some(&key), None, None, None).expect("should issue");

    let mut provider = TestProvider::new(vec![key], vec![]);
    provider.now = Some(now);

    let validated = validate(&compact, &provider, &ValidationParameters::default())
        .await
        .expect("should validate");
    assert_eq!(validated.payload, token.payload);
}

#[tokio::test]
async fn issues_and_validates_nested_token() {
    keystore::init_tracer();
    let now = whole_second_now();
    let sign_key = rsa_jwk("sig-1", "RS256");
    let enc_key = rsa_jwk_alt("enc-1", "RSA-OAEP-256");

    let mut token = sample_token(now);
    token.payload.set("name", "John Doe");

    let compact = issue(
        &token,
        Some(&sign_key),
        Some(&enc_key),
        Some(Km::RsaOaep256),
        Some(Enc::A256Gcm),
    )
    .expect("should issue");
    assert_eq!(compact.split('.').count(), 5);

    let mut provider = TestProvider::new(vec![sign_key], vec![enc_key]);
    provider.now = Some(now);

    let validated = validate(&compact, &provider, &ValidationParameters::default())
        .await
        .expect("should validate");
    assert_eq!(validated.payload.string("name"), Some("John Doe"));
    assert_eq!(validated.payload.issuer(), Some(ISSUER));
    assert_eq!(validated.payload.audiences(), vec![AUDIENCE.to_string()]);
}

#[tokio::test]
async fn decryption_failures_are_described() {
    let now = whole_second_now();
    let enc_key = oct_jwk(32, "dir-enc", "dir");

    let token = sample_token(now);
    let compact = issue(&token, None, Some(&enc_key), Some(Km::Direct), Some(Enc::A256Gcm))
        .expect("should issue");

    let mut provider = TestProvider::new(vec![], vec![]);
    provider.now = Some(now);
    let mut params = ValidationParameters::default();
    params.options.require_signed_tokens = false;

    // no candidates at all
    let err = validate(&compact, &provider, &params).await.unwrap_err();
    assert_eq!(err.description(), "no decryption keys found");

    // a matching candidate with the wrong key bytes
    provider.decryption = vec![oct_jwk(32, "dir-enc", "dir")];
    let err = validate(&compact, &provider, &params).await.unwrap_err();
    assert_eq!(err.description(), "failed to decrypt token");
}

#[tokio::test]
async fn foreign_audience_is_rejected() {
    let now = whole_second_now();
    let key = oct_jwk(32, "hmac-sign", "HS256");

    let mut token = sample_token(now);
    token.payload.set_audiences(&["someone-else".to_string()]);
    let compact = issue(&token, Some(&key), None, None, None).expect("should issue");

    let mut provider = TestProvider::new(vec![key], vec![]);
    provider.now = Some(now);

    let err = validate(&compact, &provider, &ValidationParameters::default())
        .await
        .unwrap_err();
    assert_eq!(err.description(), "invalid audience");
}

#[tokio::test]
async fn malformed_compact_form_is_rejected() {
    let provider = TestProvider::new(vec![], vec![]);
    let params = ValidationParameters::default();

    for garbage in ["", "a.b", "a.b.c.d", "a.b.c.d.e.f", "not a token"] {
        let err = validate(garbage, &provider, &params).await.unwrap_err();
        assert_eq!(err.description(), "malformed token");
    }
}
