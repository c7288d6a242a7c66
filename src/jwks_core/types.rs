//! Key set primitives: key ids, RSA public keys and the wire form of a JWK.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use jsonwebtoken::DecodingKey;
use rsa::BigUint;
use serde::{Deserialize, Serialize};

/// Identifier of a public key, copied from the JWK `kid` member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyId(String);

impl KeyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for KeyId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for KeyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An RSA public key able to verify a signature made by its private half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub kid: KeyId,
    pub modulus: BigUint,
    pub exponent: u64,
}

impl PublicKey {
    /// Big-endian modulus bytes without leading zeros.
    pub fn modulus_bytes(&self) -> Vec<u8> {
        self.modulus.to_bytes_be()
    }

    /// Big-endian exponent bytes without leading zeros.
    pub fn exponent_bytes(&self) -> Vec<u8> {
        let bytes = self.exponent.to_be_bytes();
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
        bytes[first..].to_vec()
    }

    /// Builds a `jsonwebtoken` verification key for RS256/RS384/RS512 and PS* tokens.
    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_rsa_raw_components(&self.modulus_bytes(), &self.exponent_bytes())
    }
}

/// Every key of one fetched key set, indexed by id.
pub type KeyMap = HashMap<KeyId, PublicKey>;

/// A JWK as represented in a JWKS document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Jwk {
    #[serde(default)]
    pub kty: String,
    #[serde(default)]
    pub kid: String,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(default)]
    pub n: String,
    #[serde(default)]
    pub e: String,
    /// Certificate chain. Carried for callers, never used to build the key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x5c: Vec<String>,
}

/// The JWKS response envelope. RFC 7517 names the member `keys`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JwksDocument {
    #[serde(alias = "keys")]
    pub jwks: Vec<Jwk>,
}
