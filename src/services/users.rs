use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthService,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{Role, User},
};

/// Request/response types for account management.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub role: Role,
    pub name: String,
}

/// In-memory account directory keyed by email.
#[derive(Clone)]
pub struct UserService {
    users: Arc<DashMap<String, User>>,
    auth: Arc<AuthService>,
    event_sender: EventSender,
}

impl UserService {
    pub fn new(auth: Arc<AuthService>, event_sender: EventSender) -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            auth,
            event_sender,
        }
    }

    /// Registers a new account; the email must be unused.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<User, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let key = request.email.trim().to_ascii_lowercase();
        let user = User {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email: key.clone(),
            password_hash: self.auth.hash_password(&request.password)?,
            role: request.role,
            created_at: Utc::now(),
        };

        match self.users.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(ServiceError::Conflict("Email already exists".to_string()));
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(user.clone());
            }
        }

        info!(user_id = %user.id, role = %user.role, "User registered");
        if let Err(e) = self
            .event_sender
            .send(Event::UserRegistered {
                user_id: user.id,
                role: user.role.to_string(),
            })
            .await
        {
            warn!(error = %e, "Failed to send user registered event");
        }
        Ok(user)
    }

    /// Verifies credentials and issues an access token.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let key = request.email.trim().to_ascii_lowercase();
        let user = self
            .users
            .get(&key)
            .map(|u| u.clone())
            .ok_or_else(|| ServiceError::AuthError("Invalid email or password".to_string()))?;

        if !self.auth.verify_password(&request.password, &user.password_hash)? {
            return Err(ServiceError::AuthError(
                "Invalid email or password".to_string(),
            ));
        }

        let access_token = self.auth.generate_token(&user)?;
        info!(user_id = %user.id, "Login succeeded");
        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            role: user.role,
            name: user.name,
        })
    }

    /// Number of registered accounts holding a role.
    pub fn count_role(&self, role: Role) -> usize {
        self.users.iter().filter(|u| u.role == role).count()
    }
}
