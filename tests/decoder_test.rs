// Integration tests for turning JWKS documents into RSA public keys

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey};
use serde_json::{Value, json};
use starberry_jwks::{DecodeErrorKind, Jwk, JwksError, decode_jwk, parse_key_set};

fn modulus_2048() -> Vec<u8> {
    // Deterministic 256 byte pattern with the top bit set, like a real modulus.
    (0..256u32)
        .map(|i| ((i * 151 + 0x80) % 251) as u8 | if i == 0 { 0x80 } else { 0 })
        .collect()
}

fn jwk_for(key: &RsaPrivateKey, kid: &str) -> Jwk {
    Jwk {
        kty: "RSA".into(),
        kid: kid.into(),
        use_: Some("sig".into()),
        n: URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
        e: URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
        x5c: Vec::new(),
    }
}

#[test]
fn test_known_modulus_and_exponent_round_trip() {
    let raw = modulus_2048();
    let jwk = Jwk {
        kty: "RSA".into(),
        kid: "2024-signing".into(),
        use_: Some("sig".into()),
        n: URL_SAFE_NO_PAD.encode(&raw),
        e: "AQAB".into(),
        x5c: vec!["MIIC+DCCAeCgAwIBAgIJ".into()],
    };

    let key = decode_jwk(&jwk).unwrap();
    assert_eq!(key.kid.as_str(), "2024-signing");
    assert_eq!(key.modulus, BigUint::from_bytes_be(&raw));
    assert_eq!(key.modulus_bytes(), raw);
    assert_eq!(key.exponent, 65537);
    assert_eq!(key.exponent_bytes(), vec![0x01, 0x00, 0x01]);
}

#[test]
fn test_leading_zero_modulus_bytes_are_insignificant() {
    let jwk = Jwk {
        n: URL_SAFE_NO_PAD.encode([0x00, 0x00, 0xab, 0xcd]),
        e: "Aw".into(),
        ..Default::default()
    };
    let key = decode_jwk(&jwk).unwrap();
    assert_eq!(key.modulus, BigUint::from(0xabcdu32));
    assert_eq!(key.modulus_bytes(), vec![0xab, 0xcd]);
    assert_eq!(key.exponent_bytes(), vec![0x03]);
}

#[test]
fn test_malformed_fields_produce_no_key() {
    let bad_n = Jwk { n: "a+b/".into(), e: "AQAB".into(), ..Default::default() };
    let err = decode_jwk(&bad_n).unwrap_err();
    assert_eq!(err.field, "n");
    assert!(matches!(err.kind, DecodeErrorKind::Base64(_)));

    let bad_e = Jwk { n: "AQAB".into(), e: "A".into(), ..Default::default() };
    assert_eq!(decode_jwk(&bad_e).unwrap_err().field, "e");

    let wide_e =
        Jwk { n: "AQAB".into(), e: URL_SAFE_NO_PAD.encode([0xff; 12]), ..Default::default() };
    assert_eq!(
        decode_jwk(&wide_e).unwrap_err().kind,
        DecodeErrorKind::Oversized { len: 12, max: 8 }
    );
}

#[test]
fn test_document_with_one_bad_record_is_rejected() {
    let body = serde_json::to_vec(&json!({
        "jwks": [
            { "kty": "RSA", "kid": "a", "use": "sig", "n": "AQID", "e": "AQAB" },
            { "kty": "RSA", "kid": "b", "use": "sig", "n": "AQID", "e": "" },
            { "kty": "RSA", "kid": "c", "use": "sig", "n": "AQID", "e": "AQAB" }
        ]
    }))
    .unwrap();

    match parse_key_set(&body) {
        Err(JwksError::Decode(err)) => {
            assert_eq!(err.field, "e");
            assert_eq!(err.kind, DecodeErrorKind::Empty);
        }
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[test]
fn test_document_without_optional_members() {
    let body = br#"{"jwks":[{"kty":"RSA","kid":"bare","n":"AQID","e":"AQAB"}]}"#;
    let keys = parse_key_set(body).unwrap();
    assert_eq!(keys["bare"].exponent, 65537);
}

#[test]
fn test_decoding_key_verifies_rs256_token() {
    let signer = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
    let pem = signer.to_pkcs1_pem(LineEnding::LF).unwrap();
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("rs256-key".into());
    let claims = json!({ "sub": "user-1", "exp": 4_102_444_800u64 });
    let token = jsonwebtoken::encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
    )
    .unwrap();

    let key = decode_jwk(&jwk_for(&signer, "rs256-key")).unwrap();
    let validation = Validation::new(Algorithm::RS256);
    let verified = jsonwebtoken::decode::<Value>(&token, &key.decoding_key(), &validation).unwrap();
    assert_eq!(verified.claims["sub"], "user-1");
    assert_eq!(verified.header.kid.as_deref(), Some(key.kid.as_str()));

    // Another key pair must not verify the same token.
    let stranger = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
    let wrong = decode_jwk(&jwk_for(&stranger, "rs256-key")).unwrap();
    assert!(jsonwebtoken::decode::<Value>(&token, &wrong.decoding_key(), &validation).is_err());
}
