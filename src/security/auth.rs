//! Bearer-token verification for the admission pipeline.
//!
//! Tokens are HS256 JWTs signed with the shared secret from the
//! config. [`TokenVerifier::verify`] accepts a token only when the
//! signature checks out against the pinned algorithm and the payload
//! carries a numeric `exp` strictly in the future; no other algorithm
//! is negotiated and no clock leeway is granted. The cryptographic
//! primitive itself is delegated to `jsonwebtoken`.

use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

#[derive(Deserialize)]
struct Claims {
    #[allow(dead_code)]
    exp: u64,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The default 60s leeway would admit freshly-expired tokens
        validation.leeway = 0;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    #[must_use]
    pub fn verify(&self, token: &str) -> bool {
        match jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "token verification failed");
                false
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
