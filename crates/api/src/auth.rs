//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs carrying the account id, email and role. A request
//! without a usable `Authorization: Bearer` header is answered with `401`;
//! a token that fails verification (bad signature, expired) with `403`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domain::Actor;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use store::{Account, AccountId, Role};

use crate::error::ApiError;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies access tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    validation: Arc<Validation>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret)),
            decoding: Arc::new(DecodingKey::from_secret(secret)),
            validation: Arc::new(Validation::new(Algorithm::HS256)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs a token for the account, valid for the configured lifetime.
    pub fn issue(&self, account: &Account) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: account.id.as_i64(),
            email: account.email.clone(),
            role: account.role,
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token could not be signed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                ApiError::Forbidden("Invalid or expired token".to_string())
            })
    }
}

/// The caller identified by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: AccountId,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.account_id, self.role)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<S> for AuthUser
where
    TokenIssuer: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            metrics::counter!("auth_rejected_total", "reason" => "missing_token").increment(1);
            return Err(ApiError::Unauthorized("Access token required".to_string()));
        };
        let claims = TokenIssuer::from_ref(state).verify(token).inspect_err(|_| {
            metrics::counter!("auth_rejected_total", "reason" => "invalid_token").increment(1);
        })?;

        Ok(AuthUser {
            account_id: AccountId::new(claims.sub),
            email: claims.email,
            role: claims.role,
        })
    }
}

/// An authenticated caller holding the administrator role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    TokenIssuer: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role.is_admin() {
            Ok(AdminUser(user))
        } else {
            Err(ApiError::Forbidden(
                "Administrator role required".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn account(role: Role) -> Account {
        Account {
            id: AccountId::new(5),
            name: "Ana".to_string(),
            surname: None,
            email: "ana@example.com".to_string(),
            phone: None,
            address: None,
            role,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn issued_tokens_verify_with_the_same_secret() {
        let issuer = TokenIssuer::new(b"secret", Duration::from_secs(3600));
        let token = issuer.issue(&account(Role::Admin)).unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, 5);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.email, "ana@example.com");
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new(b"secret", Duration::from_secs(3600));
        let other = TokenIssuer::new(b"other", Duration::from_secs(3600));
        let token = other.issue(&account(Role::Customer)).unwrap();
        assert!(matches!(issuer.verify(&token), Err(ApiError::Forbidden(_))));

        let now = Utc::now().timestamp();
        let expired = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: 5,
                email: "ana@example.com".to_string(),
                role: Role::Customer,
                iat: now - 7200,
                exp: now - 3600,
            },
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(issuer.verify(&expired), Err(ApiError::Forbidden(_))));
        assert!(matches!(issuer.verify("garbage"), Err(ApiError::Forbidden(_))));
    }
}
