//! Authentication Service
//! Mission: Registration, login and identity lookup on top of the user store

use crate::auth::{
    jwt::JwtHandler,
    models::{AuthResponse, LoginRequest, RegisterRequest, User, UserResponse, UserRole},
    user_store::UserStore,
};
use crate::db::is_constraint_violation;
use crate::error::{AppError, AppResult};
use crate::notify::Notifier;
use crate::validation::{has_min_chars, is_valid_email, Violations};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Same message for unknown email and wrong password
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const EMAIL_TAKEN: &str = "Email already registered";
pub const USER_NOT_FOUND: &str = "User not found";

/// bcrypt cost used for stored passwords
pub const DEFAULT_HASH_COST: u32 = 10;

#[derive(Clone)]
pub struct AuthService {
    users: UserStore,
    jwt: Arc<JwtHandler>,
    notifier: Notifier,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(users: UserStore, jwt: Arc<JwtHandler>, notifier: Notifier) -> Self {
        Self {
            users,
            jwt,
            notifier,
            hash_cost: DEFAULT_HASH_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Validate, hash, store, issue tokens, then queue the welcome email
    pub async fn register(&self, req: RegisterRequest) -> AppResult<AuthResponse> {
        validate_register(&req)?;

        if self.users.get_user_by_email(&req.email).await?.is_some() {
            warn!("Registration rejected, email already in use");
            return Err(AppError::bad_request(EMAIL_TAKEN));
        }

        let password_hash = hash_password(req.password, self.hash_cost).await?;

        let user = match self
            .users
            .create_user(&req.email, password_hash, &req.name, UserRole::User)
            .await
        {
            Ok(user) => user,
            // Lost a race with a concurrent registration for the same email
            Err(e) if is_constraint_violation(&e) => {
                return Err(AppError::bad_request(EMAIL_TAKEN))
            }
            Err(e) => return Err(e.into()),
        };

        let token = self.jwt.issue(user.id)?;
        self.notifier.welcome(&user.email, &user.name);

        info!(user_id = %user.id, "✅ User registered");

        Ok(AuthResponse {
            user: UserResponse::from_user(&user),
            token,
        })
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<AuthResponse> {
        validate_login(&req)?;

        let Some(user) = self.users.get_user_by_email(&req.email).await? else {
            warn!("❌ Failed login attempt (unknown email)");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !verify_password(req.password, &user).await? {
            warn!(user_id = %user.id, "❌ Failed login attempt (bad password)");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        let token = self.jwt.issue(user.id)?;
        info!(user_id = %user.id, "🔐 Login successful");

        Ok(AuthResponse {
            user: UserResponse::from_user(&user),
            token,
        })
    }

    /// Sanitized record for the authenticated caller
    pub async fn get_profile(&self, user_id: &Uuid) -> AppResult<UserResponse> {
        let user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;
        Ok(UserResponse::from_user(&user))
    }
}

fn validate_register(req: &RegisterRequest) -> AppResult<()> {
    let mut violations = Violations::new();
    violations.check(is_valid_email(&req.email), "Invalid email address");
    violations.check(
        has_min_chars(&req.password, 8),
        "Password must be at least 8 characters",
    );
    violations.check(
        has_min_chars(&req.name, 2),
        "Name must be at least 2 characters",
    );
    violations.finish()
}

fn validate_login(req: &LoginRequest) -> AppResult<()> {
    let mut violations = Violations::new();
    violations.check(is_valid_email(&req.email), "Invalid email address");
    violations.check(!req.password.is_empty(), "Password is required");
    violations.finish()
}

/// bcrypt is CPU-bound; keep it off the async workers
async fn hash_password(password: String, cost: u32) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("Password hashing task failed")?
        .context("Failed to hash password")
}

async fn verify_password(password: String, user: &User) -> anyhow::Result<bool> {
    let hash = user.password_hash.clone();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("Password verification task failed")?
        .context("Failed to verify password")
}
