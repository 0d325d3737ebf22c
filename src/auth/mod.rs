//! Password hashing, JWT issuance, and the request-scoped identity
//! extractor. Credentials travel with each request; there is no ambient
//! session state.

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{Role, User};

/// Authentication configuration.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

/// Claim structure for JWT tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub name: String,
    pub role: String,
    /// Unique id for this token
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates tokens, and owns password hashing.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| ServiceError::InternalError(format!("stored hash unreadable: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Issues an HS256 access token carrying the user's id, name, and role.
    pub fn generate_token(&self, user: &User) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            role: user.role.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + self.config.token_ttl.as_secs() as i64,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("token creation failed: {}", e)))
    }

    /// Validates a token and extracts its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::AuthError("Token expired".to_string())
            }
            _ => ServiceError::AuthError("Invalid token".to_string()),
        })
    }
}

/// Authenticated identity extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    /// Rejects with `Forbidden` unless the caller holds the given role.
    pub fn require_role(&self, role: Role) -> Result<(), ServiceError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "This action requires the {} role",
                role
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::AuthError("Missing Authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::AuthError("Expected a Bearer token".to_string()))?;

        let claims = auth.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::AuthError("Invalid token subject".to_string()))?;
        let role: Role = claims
            .role
            .parse()
            .map_err(|_| ServiceError::AuthError("Invalid token role".to_string()))?;

        Ok(AuthUser {
            user_id,
            name: claims.name,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service(ttl_secs: u64) -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "test_secret_key_for_testing_purposes_only_minimum_length_64_chars!!"
                .to_string(),
            token_ttl: Duration::from_secs(ttl_secs),
        })
    }

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let svc = service(3600);
        let hash = svc.hash_password("s3cret-pass").unwrap();
        assert_ne!(hash, "s3cret-pass");
        assert!(svc.verify_password("s3cret-pass", &hash).unwrap());
        assert!(!svc.verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let svc = service(3600);
        let u = user(Role::Farmer);
        let token = svc.generate_token(&u).unwrap();
        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, u.id.to_string());
        assert_eq!(claims.role, "farmer");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service(3600);
        let other = AuthService::new(AuthConfig {
            jwt_secret: "another_secret_key_that_is_also_at_least_64_characters_long_xxxxx!"
                .to_string(),
            token_ttl: Duration::from_secs(3600),
        });
        let token = other.generate_token(&user(Role::Buyer)).unwrap();
        assert_matches!(svc.validate_token(&token), Err(ServiceError::AuthError(_)));
    }

    #[test]
    fn role_gate_rejects_other_roles() {
        let auth_user = AuthUser {
            user_id: Uuid::new_v4(),
            name: "Asha".to_string(),
            role: Role::Buyer,
        };
        assert!(auth_user.require_role(Role::Buyer).is_ok());
        assert_matches!(
            auth_user.require_role(Role::Admin),
            Err(ServiceError::Forbidden(_))
        );
    }
}
