pub mod jwks_core;

pub use jwks_core::config::RotatorConfig;
pub use jwks_core::decoder::{decode_jwk, decode_key_set, parse_key_set};
pub use jwks_core::error::{DecodeError, DecodeErrorKind, FetchError, JwksError, Result};
#[cfg(feature = "reqwest")]
pub use jwks_core::http_client::ReqwestHttpClient;
pub use jwks_core::http_client::{
    BodyLimitExceeded, HttpClientError, HttpRequest, HttpResponse, InMemoryHttpClient,
    JwksHttpClient,
};
pub use jwks_core::rotator::KeyRotator;
pub use jwks_core::stats::RotationStatsSnapshot;
pub use jwks_core::types::{Jwk, JwksDocument, KeyId, KeyMap, PublicKey};

pub use tokio_util::sync::CancellationToken;
