//! Authentication middleware
//!
//! Bearer-token verification and caller extraction. Token issuance lives in
//! the external auth service; this side only validates the HS256 signature
//! and lifts the caller's identity (user id + linked ledger address) out of
//! the claims.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::identity::Address;

/// JWT claims shared with the external auth service
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Canonical ledger address linked to the user
    pub addr: String,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Verifies bearer tokens against the shared secret.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }
}

/// Authenticated caller extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub address: Address,
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct AuthError {
    error: AuthErrorDetails,
}

#[derive(Debug, Serialize)]
struct AuthErrorDetails {
    code: String,
    message: String,
}

impl AuthError {
    fn new(code: &str, message: &str) -> Self {
        Self {
            error: AuthErrorDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<JwtVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AuthError::new(
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                    .into_response()
                })?;

        let verifier = Arc::<JwtVerifier>::from_ref(state);

        let claims = verifier.verify(bearer.token()).map_err(|e| {
            let (code, message) = match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ("TOKEN_EXPIRED", "Token has expired")
                }
                _ => ("INVALID_TOKEN", "Token is invalid"),
            };
            AuthError::new(code, message).into_response()
        })?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            AuthError::new("INVALID_TOKEN", "Token subject is not a user id").into_response()
        })?;

        // Normalize at the boundary: every address comparison downstream
        // uses the canonical form.
        let address = Address::parse(&claims.addr).map_err(|_| {
            AuthError::new("INVALID_TOKEN", "Token carries no valid ledger address")
                .into_response()
        })?;

        Ok(AuthenticatedUser { user_id, address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn make_token(secret: &str, claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_round_trip() {
        let verifier = JwtVerifier::new("test-secret");
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            addr: "0xABCDEF0123456789abcdef0123456789abcdef01".to_string(),
            exp: chrono::Utc::now().timestamp() + 600,
        };

        let token = make_token("test-secret", &claims);
        let verified = verifier.verify(&token).unwrap();
        assert_eq!(verified.sub, claims.sub);
        assert_eq!(verified.addr, claims.addr);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let verifier = JwtVerifier::new("right-secret");
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            addr: "0xabcdef0123456789abcdef0123456789abcdef01".to_string(),
            exp: chrono::Utc::now().timestamp() + 600,
        };

        let token = make_token("wrong-secret", &claims);
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let verifier = JwtVerifier::new("test-secret");
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            addr: "0xabcdef0123456789abcdef0123456789abcdef01".to_string(),
            exp: chrono::Utc::now().timestamp() - 600,
        };

        let token = make_token("test-secret", &claims);
        assert!(verifier.verify(&token).is_err());
    }
}
