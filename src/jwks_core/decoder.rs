//! Conversion of wire-format JWKs into typed RSA public keys.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::BigUint;

use super::error::{DecodeError, DecodeErrorKind, Result};
use super::types::{Jwk, JwksDocument, KeyId, KeyMap, PublicKey};

/// Width in bytes of the integer an exponent is decoded into.
pub const EXPONENT_WIDTH: usize = std::mem::size_of::<u64>();

fn decode_field(field: &'static str, value: &str) -> std::result::Result<Vec<u8>, DecodeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|err| DecodeError::new(field, DecodeErrorKind::Base64(err.to_string())))?;
    if bytes.is_empty() {
        return Err(DecodeError::new(field, DecodeErrorKind::Empty));
    }
    Ok(bytes)
}

/// Decodes the base64url `n` member into an unsigned big integer.
pub fn decode_modulus(n: &str) -> std::result::Result<BigUint, DecodeError> {
    let bytes = decode_field("n", n)?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Decodes the base64url `e` member into a `u64`.
///
/// The decoded bytes are right-aligned in an 8 byte big-endian buffer.
/// Anything wider than that is rejected instead of being truncated.
pub fn decode_exponent(e: &str) -> std::result::Result<u64, DecodeError> {
    let bytes = decode_field("e", e)?;
    if bytes.len() > EXPONENT_WIDTH {
        return Err(DecodeError::new(
            "e",
            DecodeErrorKind::Oversized { len: bytes.len(), max: EXPONENT_WIDTH },
        ));
    }
    let mut buf = [0u8; EXPONENT_WIDTH];
    buf[EXPONENT_WIDTH - bytes.len()..].copy_from_slice(&bytes);
    Ok(u64::from_be_bytes(buf))
}

/// Decodes one JWK. The `kid` is taken verbatim.
pub fn decode_jwk(jwk: &Jwk) -> std::result::Result<PublicKey, DecodeError> {
    Ok(PublicKey {
        kid: KeyId::new(jwk.kid.clone()),
        modulus: decode_modulus(&jwk.n)?,
        exponent: decode_exponent(&jwk.e)?,
    })
}

/// Decodes a whole key set, stopping at the first bad record.
///
/// A later record with an already seen `kid` replaces the earlier one.
pub fn decode_key_set(jwks: &[Jwk]) -> std::result::Result<KeyMap, DecodeError> {
    let mut keys = KeyMap::with_capacity(jwks.len());
    for jwk in jwks {
        let key = decode_jwk(jwk)?;
        keys.insert(key.kid.clone(), key);
    }
    Ok(keys)
}

/// Parses a JWKS response body and decodes every key in it.
pub fn parse_key_set(body: &[u8]) -> Result<KeyMap> {
    let document: JwksDocument = serde_json::from_slice(body)?;
    Ok(decode_key_set(&document.jwks)?)
}
