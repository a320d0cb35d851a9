//! Authentication service for signup, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::{RoleProfile, User, UserRole};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use super::user::UserRow;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for creating a new account
#[derive(Debug, Deserialize, Validate)]
pub struct SignupInput {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub phone: Option<String>,
    pub role: UserRole,
    /// Role-specific profile fields
    pub profile: Option<serde_json::Value>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub username: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Tokens plus the authenticated user
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

impl AuthSession {
    fn new(tokens: AuthTokens, user: User) -> Self {
        Self {
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
            user,
        }
    }
}

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Sign an access token for a user
pub fn encode_access_token(
    user_id: Uuid,
    username: &str,
    role: UserRole,
    secret: &str,
    expiry_secs: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role: role.as_str().to_string(),
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register a new account
    pub async fn signup(&self, input: SignupInput) -> AppResult<AuthSession> {
        input.validate()?;

        let username = input.username.trim().to_lowercase();
        shared::validate_username(&username)
            .map_err(|msg| AppError::validation("username", msg))?;
        if let Some(phone) = input.phone.as_deref() {
            shared::validate_phone(phone).map_err(|msg| AppError::validation("phone", msg))?;
        }

        let profile = match input.profile {
            Some(value) => RoleProfile::from_value(input.role, value)
                .map_err(|e| AppError::validation("profile", e.to_string()))?,
            None => RoleProfile::empty(input.role),
        };

        let email = input.email.trim().to_lowercase();

        // Check for existing email or username
        let taken = sqlx::query_as::<_, (bool, bool)>(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM users WHERE email = $1),
                EXISTS(SELECT 1 FROM users WHERE username = $2)
            "#,
        )
        .bind(&email)
        .bind(&username)
        .fetch_one(&self.db)
        .await?;

        if taken.0 {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }
        if taken.1 {
            return Err(AppError::DuplicateEntry("username".to_string()));
        }

        // Hash password
        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, username, email, phone, password_hash, role, profile)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, username, email, phone, password_hash, role, profile,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(&username)
        .bind(&email)
        .bind(&input.phone)
        .bind(&password_hash)
        .bind(input.role.as_str())
        .bind(profile.to_value())
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "user", "Email or username already registered"))?;

        let user = row.into_user()?;
        tracing::info!(user_id = %user.id, role = %user.role, "User registered");

        let tokens = self.issue_tokens(&user).await?;
        Ok(AuthSession::new(tokens, user))
    }

    /// Authenticate with email or username and password
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<AuthSession> {
        let identifier = identifier.trim().to_lowercase();

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, username, email, phone, password_hash, role, profile,
                   is_active, created_at, updated_at
            FROM users
            WHERE email = $1 OR username = $1
            "#,
        )
        .bind(&identifier)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !row.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let valid = verify(password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(row.id)
            .execute(&self.db)
            .await?;

        let user = row.into_user()?;
        let tokens = self.issue_tokens(&user).await?;
        Ok(AuthSession::new(tokens, user))
    }

    /// Refresh access token using refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthSession> {
        let token_hash = Self::hash_token(refresh_token);

        // Revoke and look up in one step so a token can only be used once
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE token_hash = $1
              AND expires_at > NOW()
              AND revoked_at IS NULL
            RETURNING user_id
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, username, email, phone, password_hash, role, profile,
                   is_active, created_at, updated_at
            FROM users
            WHERE id = $1 AND is_active = true
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account is disabled".to_string()))?;

        let user = row.into_user()?;
        let tokens = self.issue_tokens(&user).await?;
        Ok(AuthSession::new(tokens, user))
    }

    async fn issue_tokens(&self, user: &User) -> AppResult<AuthTokens> {
        let tokens = self.generate_tokens(user)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;
        Ok(tokens)
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user: &User) -> AppResult<AuthTokens> {
        let access_token = encode_access_token(
            user.id,
            &user.username,
            user.role,
            &self.jwt_secret,
            self.access_token_expiry,
        )?;

        // Refresh token (simple random token)
        let refresh_token = Uuid::new_v4().to_string();

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let token_hash = Self::hash_token(token);
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Hash a token for storage
    fn hash_token(token: &str) -> String {
        format!("{:x}", Sha256::digest(token.as_bytes()))
    }
}
