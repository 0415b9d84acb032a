//! # JSON Web Encryption (JWE)
//!
//! JWE ([RFC7516]) specifies how encrypted content is represented using
//! JSON. See JWA ([RFC7518]) for the cryptographic algorithms and
//! identifiers used.
//!
//! Two algorithm families cross here: key management (how the Content
//! Encryption Key is determined: RSA wrap, AES GCM key wrap, or direct use
//! of a shared key) and content encryption (how the plaintext is encrypted
//! under the CEK: AES-CBC with HMAC, or AES-GCM). The compact serialization
//! is always five segments:
//!
//! ```text
//! base64(protected header) . base64(encrypted key) . base64(iv)
//!     . base64(ciphertext) . base64(authentication tag)
//! ```
//!
//! Any segment may be empty; under `"dir"` key management the encrypted-key
//! segment always is.
//!
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut as _, BlockEncryptMut as _, KeyIvInit as _};
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::{U12, U16};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use anyhow::{anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac as _};
use rand_core::{OsRng, RngCore};
use rsa::{Oaep, Pkcs1v15Encrypt};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::jose::jwa::{ContentEncryptionAlgorithm, KeyManagementAlgorithm};
use crate::jose::jwk::{Jwk, OctKey};

type Aes192Gcm = AesGcm<Aes192, U12>;

/// The JWE protected header, as carried in the first compact segment.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct JweHeader {
    /// Algorithm used to determine or wrap the Content Encryption Key.
    pub alg: KeyManagementAlgorithm,

    /// Algorithm used to encrypt the plaintext. MUST be an AEAD algorithm.
    pub enc: ContentEncryptionAlgorithm,

    /// Media type of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Content type of the plaintext. `"JWT"` marks a nested token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,

    /// Identifier of the key used to wrap the CEK.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Initialization vector of the AES GCM key wrap, base64url encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,

    /// Authentication tag of the AES GCM key wrap, base64url encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// A parsed compact JWE: decoded segments plus the protected header exactly
/// as received, which doubles as the AAD.
#[derive(Clone, Debug)]
pub struct ParsedJwe {
    /// The decoded protected header.
    pub header: JweHeader,

    /// The protected header segment as received, base64url encoded.
    pub protected: String,

    /// The encrypted CEK. Empty under `"dir"`.
    pub encrypted_key: Vec<u8>,

    /// The content-encryption initialization vector.
    pub iv: Vec<u8>,

    /// The ciphertext.
    pub ciphertext: Vec<u8>,

    /// The content authentication tag.
    pub tag: Vec<u8>,
}

/// Encrypt the plaintext and return the 5-segment compact form.
///
/// The CEK is the shared key itself under `"dir"`, and freshly random
/// otherwise. A fresh random IV sized for the content algorithm is
/// generated on every call, so repeated encryption of identical plaintext
/// never produces identical ciphertext.
///
/// # Errors
///
/// Returns an error if the key does not fit the key-management algorithm or
/// its length does not match the algorithm's exact requirement. A
/// mismatched key is a configuration error, not a soft failure.
pub fn encrypt(
    plaintext: &[u8], key: &Jwk, alg: KeyManagementAlgorithm, enc: ContentEncryptionAlgorithm,
    cty: Option<String>,
) -> anyhow::Result<String> {
    tracing::trace!("jwe::encrypt");

    // 1. Determine the Key Management Mode and the CEK: the shared key's
    //    bytes under "dir", a fresh random key otherwise.
    // 2-4. Wrap the CEK per the key-management algorithm. The AES GCM wrap
    //    variants place their own IV and tag in the protected header.
    let (cek, wrapped) = match alg {
        KeyManagementAlgorithm::Direct => {
            let Jwk::Oct(oct) = key else {
                bail!("dir requires a symmetric key");
            };
            let bytes = oct.key_bytes()?;
            if bytes.len() != enc.cek_len() {
                bail!("dir requires a {}-byte key for {enc}", enc.cek_len());
            }
            (bytes, WrappedKey::default())
        }
        _ => {
            let mut cek = vec![0u8; enc.cek_len()];
            OsRng.fill_bytes(&mut cek);
            let wrapped = wrap_cek(alg, key, &cek)?;
            (cek, wrapped)
        }
    };

    // 5. Create the JSON protected header.
    let header = JweHeader {
        alg,
        enc,
        typ: Some("JWT".into()),
        cty,
        kid: key.kid().map(ToOwned::to_owned),
        iv: wrapped.iv,
        tag: wrapped.tag,
    };
    let protected = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header)?);

    // 6. Set the Additional Authenticated Data to ASCII(Encoded Protected
    //    Header).
    // 7. Encrypt the plaintext with the CEK, a fresh IV, and the AAD,
    //    producing the ciphertext and the authentication tag.
    let (iv, ciphertext, tag) = encrypt_content(enc, &cek, plaintext, protected.as_bytes())?;

    // 8. Return the Compact Serialization.
    Ok(format!(
        "{protected}.{}.{}.{}.{}",
        Base64UrlUnpadded::encode_string(&wrapped.encrypted_key),
        Base64UrlUnpadded::encode_string(&iv),
        Base64UrlUnpadded::encode_string(&ciphertext),
        Base64UrlUnpadded::encode_string(&tag),
    ))
}

/// Parse a 5-segment compact JWE without decrypting it.
///
/// # Errors
///
/// Returns an error if the segment count is not exactly five or a segment
/// fails to decode.
pub fn parse(compact: &str) -> anyhow::Result<ParsedJwe> {
    let parts: Vec<&str> = compact.split('.').collect();
    if parts.len() != 5 {
        bail!("invalid compact JWE format");
    }

    let decoded = Base64UrlUnpadded::decode_vec(parts[0])
        .map_err(|e| anyhow!("issue decoding header: {e}"))?;
    let header: JweHeader =
        serde_json::from_slice(&decoded).map_err(|e| anyhow!("issue deserializing header: {e}"))?;

    Ok(ParsedJwe {
        header,
        protected: parts[0].to_string(),
        encrypted_key: decode_segment(parts[1], "encrypted_key")?,
        iv: decode_segment(parts[2], "iv")?,
        ciphertext: decode_segment(parts[3], "ciphertext")?,
        tag: decode_segment(parts[4], "tag")?,
    })
}

/// Decrypt a compact JWE, trying the candidate keys strictly in order and
/// returning the first success.
///
/// # Errors
///
/// Returns an error if no candidate matches the header's key id and
/// algorithm family ("no decryption keys found") or every matching
/// candidate fails to unwrap or decrypt ("failed to decrypt token"); the
/// two cases differ only in description.
pub fn decrypt(compact: &str, keys: &[Jwk]) -> anyhow::Result<Vec<u8>> {
    let jwe = parse(compact)?;

    let mut attempted = false;
    for key in keys.iter().filter(|key| key_matches(&jwe.header, key)) {
        attempted = true;
        match decrypt_with(&jwe, key) {
            Ok(plaintext) => return Ok(plaintext),
            Err(e) => tracing::debug!("decryption attempt failed: {e}"),
        }
    }

    if attempted {
        bail!("failed to decrypt token");
    }
    bail!("no decryption keys found");
}

/// Attempt to open a parsed JWE with a single candidate key.
///
/// An authenticated-encryption failure (bad tag) or a key-size mismatch is
/// an error for this candidate only; the caller moves on to the next.
///
/// # Errors
///
/// Returns an error if the CEK cannot be unwrapped, its size does not match
/// the content algorithm, or the ciphertext fails authentication.
pub fn decrypt_with(jwe: &ParsedJwe, key: &Jwk) -> anyhow::Result<Vec<u8>> {
    let cek = unwrap_cek(jwe, key)?;
    decrypt_content(
        jwe.header.enc,
        &cek,
        &jwe.iv,
        &jwe.ciphertext,
        &jwe.tag,
        jwe.protected.as_bytes(),
    )
}

/// Returns `true` if the key is a candidate for the header: its variant
/// fits the key-management family and, when both declare a key id, the ids
/// agree.
#[must_use]
pub fn key_matches(header: &JweHeader, key: &Jwk) -> bool {
    use KeyManagementAlgorithm as Alg;

    let family_fits = match header.alg {
        Alg::RsaOaep | Alg::RsaOaep256 | Alg::Rsa1_5 => matches!(key, Jwk::Rsa(_)),
        Alg::A128GcmKw | Alg::A192GcmKw | Alg::A256GcmKw | Alg::Direct => {
            matches!(key, Jwk::Oct(_))
        }
    };
    let kid_fits = match (&header.kid, key.kid()) {
        (Some(header_kid), Some(key_kid)) => header_kid == key_kid,
        _ => true,
    };
    family_fits && kid_fits
}

#[derive(Default)]
struct WrappedKey {
    encrypted_key: Vec<u8>,
    iv: Option<String>,
    tag: Option<String>,
}

fn wrap_cek(alg: KeyManagementAlgorithm, key: &Jwk, cek: &[u8]) -> anyhow::Result<WrappedKey> {
    use KeyManagementAlgorithm as Alg;

    match (alg, key) {
        (Alg::RsaOaep, Jwk::Rsa(rsa)) => {
            let encrypted = rsa
                .public_key()?
                .encrypt(&mut OsRng, Oaep::new::<Sha1>(), cek)
                .map_err(|e| anyhow!("issue wrapping key: {e}"))?;
            Ok(WrappedKey { encrypted_key: encrypted, ..WrappedKey::default() })
        }
        (Alg::RsaOaep256, Jwk::Rsa(rsa)) => {
            let encrypted = rsa
                .public_key()?
                .encrypt(&mut OsRng, Oaep::new::<Sha256>(), cek)
                .map_err(|e| anyhow!("issue wrapping key: {e}"))?;
            Ok(WrappedKey { encrypted_key: encrypted, ..WrappedKey::default() })
        }
        (Alg::Rsa1_5, Jwk::Rsa(rsa)) => {
            let encrypted = rsa
                .public_key()?
                .encrypt(&mut OsRng, Pkcs1v15Encrypt, cek)
                .map_err(|e| anyhow!("issue wrapping key: {e}"))?;
            Ok(WrappedKey { encrypted_key: encrypted, ..WrappedKey::default() })
        }
        (Alg::A128GcmKw | Alg::A192GcmKw | Alg::A256GcmKw, Jwk::Oct(oct)) => {
            gcm_wrap(alg, oct, cek)
        }
        (Alg::Direct, _) => bail!("dir does not wrap a key"),
        _ => bail!("algorithm {alg} cannot be used with the provided key type"),
    }
}

// AES GCM key wrap: a fresh random 96-bit IV per wrap operation, with the
// IV and tag carried in the protected header.
fn gcm_wrap(
    alg: KeyManagementAlgorithm, oct: &OctKey, cek: &[u8],
) -> anyhow::Result<WrappedKey> {
    use KeyManagementAlgorithm as Alg;

    let key = oct.key_bytes()?;
    let Some(expected) = alg.wrap_key_len() else {
        bail!("{alg} is not an AES GCM key wrap algorithm");
    };
    if key.len() != expected {
        bail!("{alg} requires a {}-bit wrapping key", expected * 8);
    }

    let mut iv = vec![0u8; 12];
    OsRng.fill_bytes(&mut iv);

    let mut buffer = cek.to_vec();
    let tag = match alg {
        Alg::A128GcmKw => gcm_seal::<Aes128Gcm>(&key, &iv, &[], &mut buffer)?,
        Alg::A192GcmKw => gcm_seal::<Aes192Gcm>(&key, &iv, &[], &mut buffer)?,
        Alg::A256GcmKw => gcm_seal::<Aes256Gcm>(&key, &iv, &[], &mut buffer)?,
        _ => bail!("{alg} is not an AES GCM key wrap algorithm"),
    };

    Ok(WrappedKey {
        encrypted_key: buffer,
        iv: Some(Base64UrlUnpadded::encode_string(&iv)),
        tag: Some(Base64UrlUnpadded::encode_string(&tag)),
    })
}

fn unwrap_cek(jwe: &ParsedJwe, key: &Jwk) -> anyhow::Result<Vec<u8>> {
    use KeyManagementAlgorithm as Alg;

    match (jwe.header.alg, key) {
        (Alg::Direct, Jwk::Oct(oct)) => {
            if !jwe.encrypted_key.is_empty() {
                bail!("dir requires an empty encrypted key segment");
            }
            oct.key_bytes()
        }
        (Alg::RsaOaep, Jwk::Rsa(rsa)) => rsa
            .private_key()?
            .decrypt(Oaep::new::<Sha1>(), &jwe.encrypted_key)
            .map_err(|e| anyhow!("issue unwrapping key: {e}")),
        (Alg::RsaOaep256, Jwk::Rsa(rsa)) => rsa
            .private_key()?
            .decrypt(Oaep::new::<Sha256>(), &jwe.encrypted_key)
            .map_err(|e| anyhow!("issue unwrapping key: {e}")),
        (Alg::Rsa1_5, Jwk::Rsa(rsa)) => rsa
            .private_key()?
            .decrypt(Pkcs1v15Encrypt, &jwe.encrypted_key)
            .map_err(|e| anyhow!("issue unwrapping key: {e}")),
        (Alg::A128GcmKw | Alg::A192GcmKw | Alg::A256GcmKw, Jwk::Oct(oct)) => {
            gcm_unwrap(jwe, oct)
        }
        _ => bail!(
            "algorithm {} cannot be used with the provided key type",
            jwe.header.alg
        ),
    }
}

fn gcm_unwrap(jwe: &ParsedJwe, oct: &OctKey) -> anyhow::Result<Vec<u8>> {
    use KeyManagementAlgorithm as Alg;

    let alg = jwe.header.alg;
    let key = oct.key_bytes()?;
    let Some(expected) = alg.wrap_key_len() else {
        bail!("{alg} is not an AES GCM key wrap algorithm");
    };
    if key.len() != expected {
        bail!("{alg} requires a {}-bit wrapping key", expected * 8);
    }

    let iv = jwe
        .header
        .iv
        .as_ref()
        .ok_or_else(|| anyhow!("missing `iv` header for key unwrap"))
        .and_then(|iv| decode_segment(iv, "iv"))?;
    let tag = jwe
        .header
        .tag
        .as_ref()
        .ok_or_else(|| anyhow!("missing `tag` header for key unwrap"))
        .and_then(|tag| decode_segment(tag, "tag"))?;
    if iv.len() != 12 || tag.len() != 16 {
        bail!("invalid key wrap parameters");
    }

    let mut buffer = jwe.encrypted_key.clone();
    match alg {
        Alg::A128GcmKw => gcm_open::<Aes128Gcm>(&key, &iv, &[], &mut buffer, &tag)?,
        Alg::A192GcmKw => gcm_open::<Aes192Gcm>(&key, &iv, &[], &mut buffer, &tag)?,
        Alg::A256GcmKw => gcm_open::<Aes256Gcm>(&key, &iv, &[], &mut buffer, &tag)?,
        _ => bail!("{alg} is not an AES GCM key wrap algorithm"),
    }
    Ok(buffer)
}

fn encrypt_content(
    enc: ContentEncryptionAlgorithm, cek: &[u8], plaintext: &[u8], aad: &[u8],
) -> anyhow::Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    use ContentEncryptionAlgorithm as Enc;

    if cek.len() != enc.cek_len() {
        bail!("content encryption key must be {} bytes for {enc}", enc.cek_len());
    }
    match enc {
        Enc::A128Gcm => gcm_encrypt_content::<Aes128Gcm>(cek, plaintext, aad),
        Enc::A192Gcm => gcm_encrypt_content::<Aes192Gcm>(cek, plaintext, aad),
        Enc::A256Gcm => gcm_encrypt_content::<Aes256Gcm>(cek, plaintext, aad),
        Enc::A128CbcHs256 | Enc::A192CbcHs384 | Enc::A256CbcHs512 => {
            cbc_hmac_encrypt(enc, cek, plaintext, aad)
        }
    }
}

fn decrypt_content(
    enc: ContentEncryptionAlgorithm, cek: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8],
    aad: &[u8],
) -> anyhow::Result<Vec<u8>> {
    use ContentEncryptionAlgorithm as Enc;

    if cek.len() != enc.cek_len() {
        bail!("content encryption key size mismatch");
    }
    if iv.len() != enc.iv_len() {
        bail!("invalid initialization vector length");
    }
    match enc {
        Enc::A128Gcm | Enc::A192Gcm | Enc::A256Gcm => {
            if tag.len() != 16 {
                bail!("invalid authentication tag length");
            }
            let mut buffer = ciphertext.to_vec();
            match enc {
                Enc::A128Gcm => gcm_open::<Aes128Gcm>(cek, iv, aad, &mut buffer, tag)?,
                Enc::A192Gcm => gcm_open::<Aes192Gcm>(cek, iv, aad, &mut buffer, tag)?,
                _ => gcm_open::<Aes256Gcm>(cek, iv, aad, &mut buffer, tag)?,
            }
            Ok(buffer)
        }
        Enc::A128CbcHs256 | Enc::A192CbcHs384 | Enc::A256CbcHs512 => {
            cbc_hmac_decrypt(enc, cek, iv, ciphertext, tag, aad)
        }
    }
}

fn gcm_encrypt_content<C>(
    cek: &[u8], plaintext: &[u8], aad: &[u8],
) -> anyhow::Result<(Vec<u8>, Vec<u8>, Vec<u8>)>
where
    C: KeyInit + AeadInPlace,
    C: AeadCore<NonceSize = U12, TagSize = U16>,
{
    let mut iv = vec![0u8; 12];
    OsRng.fill_bytes(&mut iv);
    let mut buffer = plaintext.to_vec();
    let tag = gcm_seal::<C>(cek, &iv, aad, &mut buffer)?;
    Ok((iv, buffer, tag))
}

fn gcm_seal<C>(key: &[u8], iv: &[u8], aad: &[u8], buffer: &mut Vec<u8>) -> anyhow::Result<Vec<u8>>
where
    C: KeyInit + AeadInPlace,
    C: AeadCore<NonceSize = U12, TagSize = U16>,
{
    if iv.len() != 12 {
        bail!("invalid initialization vector length");
    }
    let cipher = C::new_from_slice(key).map_err(|e| anyhow!("invalid key length: {e}"))?;
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), aad, buffer)
        .map_err(|e| anyhow!("issue encrypting: {e}"))?;
    Ok(tag.to_vec())
}

fn gcm_open<C>(
    key: &[u8], iv: &[u8], aad: &[u8], buffer: &mut Vec<u8>, tag: &[u8],
) -> anyhow::Result<()>
where
    C: KeyInit + AeadInPlace,
    C: AeadCore<NonceSize = U12, TagSize = U16>,
{
    if iv.len() != 12 || tag.len() != 16 {
        bail!("invalid encryption parameters");
    }
    let cipher = C::new_from_slice(key).map_err(|e| anyhow!("invalid key length: {e}"))?;
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(iv),
            aad,
            buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|e| anyhow!("issue decrypting: {e}"))
}

// AES-CBC with HMAC ([RFC7518] section 5.2): the CEK splits into a MAC half
// and an AES half; the tag is the left half of HMAC(AAD || IV || ciphertext
// || AL), where AL is the AAD bit length as a 64-bit big-endian integer.
fn cbc_hmac_encrypt(
    enc: ContentEncryptionAlgorithm, cek: &[u8], plaintext: &[u8], aad: &[u8],
) -> anyhow::Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    use ContentEncryptionAlgorithm as Enc;

    let (mac_key, enc_key) = cek.split_at(cek.len() / 2);
    let mut iv = vec![0u8; 16];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = match enc {
        Enc::A128CbcHs256 => cbc::Encryptor::<Aes128>::new_from_slices(enc_key, &iv)
            .map_err(|e| anyhow!("invalid key length: {e}"))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        Enc::A192CbcHs384 => cbc::Encryptor::<Aes192>::new_from_slices(enc_key, &iv)
            .map_err(|e| anyhow!("invalid key length: {e}"))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        Enc::A256CbcHs512 => cbc::Encryptor::<Aes256>::new_from_slices(enc_key, &iv)
            .map_err(|e| anyhow!("invalid key length: {e}"))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        _ => bail!("{enc} is not a CBC-HMAC algorithm"),
    };

    let tag = cbc_hmac_tag(enc, mac_key, aad, &iv, &ciphertext)?;
    Ok((iv, ciphertext, tag))
}

fn cbc_hmac_decrypt(
    enc: ContentEncryptionAlgorithm, cek: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8],
    aad: &[u8],
) -> anyhow::Result<Vec<u8>> {
    use ContentEncryptionAlgorithm as Enc;

    let (mac_key, enc_key) = cek.split_at(cek.len() / 2);
    if tag.len() != cek.len() / 2 {
        bail!("invalid authentication tag length");
    }

    // authenticate before decrypting
    verify_tag(enc, mac_key, aad, iv, ciphertext, tag)?;

    let plaintext = match enc {
        Enc::A128CbcHs256 => cbc::Decryptor::<Aes128>::new_from_slices(enc_key, iv)
            .map_err(|e| anyhow!("invalid key length: {e}"))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| anyhow!("issue decrypting: {e}"))?,
        Enc::A192CbcHs384 => cbc::Decryptor::<Aes192>::new_from_slices(enc_key, iv)
            .map_err(|e| anyhow!("invalid key length: {e}"))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| anyhow!("issue decrypting: {e}"))?,
        Enc::A256CbcHs512 => cbc::Decryptor::<Aes256>::new_from_slices(enc_key, iv)
            .map_err(|e| anyhow!("invalid key length: {e}"))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| anyhow!("issue decrypting: {e}"))?,
        _ => bail!("{enc} is not a CBC-HMAC algorithm"),
    };
    Ok(plaintext)
}

fn cbc_hmac_tag(
    enc: ContentEncryptionAlgorithm, mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8],
) -> anyhow::Result<Vec<u8>> {
    use ContentEncryptionAlgorithm as Enc;

    let al = ((aad.len() as u64) * 8).to_be_bytes();
    match enc {
        Enc::A128CbcHs256 => {
            let mut mac = <Hmac::<Sha256> as hmac::Mac>::new_from_slice(mac_key)
                .map_err(|e| anyhow!("invalid MAC key: {e}"))?;
            mac.update(aad);
            mac.update(iv);
            mac.update(ciphertext);
            mac.update(&al);
            Ok(mac.finalize().into_bytes()[..16].to_vec())
        }
        Enc::A192CbcHs384 => {
            let mut mac = <Hmac::<Sha384> as hmac::Mac>::new_from_slice(mac_key)
                .map_err(|e| anyhow!("invalid MAC key: {e}"))?;
            mac.update(aad);
            mac.update(iv);
            mac.update(ciphertext);
            mac.update(&al);
            Ok(mac.finalize().into_bytes()[..24].to_vec())
        }
        Enc::A256CbcHs512 => {
            let mut mac = <Hmac::<Sha512> as hmac::Mac>::new_from_slice(mac_key)
                .map_err(|e| anyhow!("invalid MAC key: {e}"))?;
            mac.update(aad);
            mac.update(iv);
            mac.update(ciphertext);
            mac.update(&al);
            Ok(mac.finalize().into_bytes()[..32].to_vec())
        }
        _ => bail!("{enc} is not a CBC-HMAC algorithm"),
    }
}

// Constant-time truncated comparison via the Mac trait.
fn verify_tag(
    enc: ContentEncryptionAlgorithm, mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8],
    tag: &[u8],
) -> anyhow::Result<()> {
    use ContentEncryptionAlgorithm as Enc;

    let al = ((aad.len() as u64) * 8).to_be_bytes();
    match enc {
        Enc::A128CbcHs256 => {
            let mut mac = <Hmac::<Sha256> as hmac::Mac>::new_from_slice(mac_key)
                .map_err(|e| anyhow!("invalid MAC key: {e}"))?;
            mac.update(aad);
            mac.update(iv);
            mac.update(ciphertext);
            mac.update(&al);
            mac.verify_truncated_left(tag)
                .map_err(|e| anyhow!("authentication tag mismatch: {e}"))
        }
        Enc::A192CbcHs384 => {
            let mut mac = <Hmac::<Sha384> as hmac::Mac>::new_from_slice(mac_key)
                .map_err(|e| anyhow!("invalid MAC key: {e}"))?;
            mac.update(aad);
            mac.update(iv);
            mac.update(ciphertext);
            mac.update(&al);
            mac.verify_truncated_left(tag)
                .map_err(|e| anyhow!("authentication tag mismatch: {e}"))
        }
        Enc::A256CbcHs512 => {
            let mut mac = <Hmac::<Sha512> as hmac::Mac>::new_from_slice(mac_key)
                .map_err(|e| anyhow!("invalid MAC key: {e}"))?;
            mac.update(aad);
            mac.update(iv);
            mac.update(ciphertext);
            mac.update(&al);
            mac.verify_truncated_left(tag)
                .map_err(|e| anyhow!("authentication tag mismatch: {e}"))
        }
        _ => bail!("{enc} is not a CBC-HMAC algorithm"),
    }
}

fn decode_segment(value: &str, segment: &str) -> anyhow::Result<Vec<u8>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    Base64UrlUnpadded::decode_vec(value).map_err(|e| anyhow!("issue decoding `{segment}`: {e}"))
}
