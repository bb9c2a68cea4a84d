//! Bearer-token authentication for Supabase-issued access tokens.
//!
//! Tokens are HS256 JWTs signed with the project's JWT secret; `sub` is the
//! user id. Handlers take an `AuthUser` argument to require a signed-in caller.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// Audience Supabase stamps on tokens for signed-in users.
pub const SUPABASE_AUDIENCE: &str = "authenticated";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub aud: String,
    pub exp: usize,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

pub fn decode_access_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[SUPABASE_AUDIENCE]);

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("invalid access token: {e}")))
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed Authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("expected a Bearer token".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = decode_access_token(token, &state.config.supabase_jwt_secret)?;
        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

    fn token_for(sub: Uuid, aud: &str, exp_offset_secs: i64) -> String {
        let claims = Claims {
            sub,
            aud: aud.to_string(),
            exp: (chrono::Utc::now().timestamp() + exp_offset_secs) as usize,
            email: Some("user@example.com".to_string()),
            role: Some("authenticated".to_string()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/designs/save");
        if let Some(v) = value {
            builder = builder.header(AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_valid_token_decodes() {
        let user = Uuid::new_v4();
        let claims = decode_access_token(&token_for(user, SUPABASE_AUDIENCE, 3600), SECRET).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = token_for(Uuid::new_v4(), SUPABASE_AUDIENCE, -3600);
        assert!(matches!(
            decode_access_token(&token, SECRET),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = token_for(Uuid::new_v4(), SUPABASE_AUDIENCE, 3600);
        assert!(decode_access_token(&token, "a-different-secret-of-sufficient-length").is_err());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let token = token_for(Uuid::new_v4(), "anon", 3600);
        assert!(decode_access_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_bearer_token_extraction() {
        let parts = parts_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let parts = parts_with_auth(None);
        assert!(matches!(bearer_token(&parts), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_non_bearer_scheme_is_unauthorized() {
        let parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert!(bearer_token(&parts).is_err());
    }
}
