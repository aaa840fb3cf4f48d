//! Verification of access tokens issued by the hosted auth provider.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::profile::Profile;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
    pub aud: String,
}

#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        JwtVerifier {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.key, &self.validation).map(|data| data.claims)
    }
}

/// The caller, as identified by a valid bearer token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::unauthorized("Please sign in to continue"))?;

        let claims = state.jwt.verify(token).map_err(|err| {
            tracing::debug!(error = %err, "rejected access token");
            AppError::unauthorized("Your session has expired, please sign in again")
        })?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

/// The caller's profile, or 404 when they have not become a member yet.
pub async fn require_profile(pool: &PgPool, user: &AuthUser) -> AppResult<Profile> {
    db::profiles::get_profile(pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Complete your member signup first"))
}

pub async fn require_admin(pool: &PgPool, user: &AuthUser) -> AppResult<Profile> {
    let profile = db::profiles::get_profile(pool, user.id).await?;
    match profile {
        Some(profile) if profile.is_admin() => Ok(profile),
        _ => {
            tracing::warn!(user_id = %user.id, "non-admin attempted admin action");
            Err(AppError::forbidden("Admins only"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, aud: &str, exp_offset: i64) -> (Uuid, String) {
        let sub = Uuid::new_v4();
        let exp = (chrono::Utc::now().timestamp() + exp_offset) as usize;
        let claims = Claims {
            sub,
            email: Some("ana@example.org".into()),
            exp,
            aud: aud.into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        (sub, token)
    }

    #[test]
    fn verifies_valid_token() {
        let verifier = JwtVerifier::new("s3cret", "authenticated");
        let (sub, token) = token("s3cret", "authenticated", 3600);
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.email.as_deref(), Some("ana@example.org"));
    }

    #[test]
    fn rejects_wrong_secret_audience_and_expired() {
        let verifier = JwtVerifier::new("s3cret", "authenticated");
        assert!(verifier.verify(&token("other", "authenticated", 3600).1).is_err());
        assert!(verifier.verify(&token("s3cret", "anon", 3600).1).is_err());
        assert!(verifier.verify(&token("s3cret", "authenticated", -3600).1).is_err());
    }
}
