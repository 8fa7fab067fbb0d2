//! Authentication service for sign-up, login and password reset

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::external::Mailer;
use shared::models::{format_otp, normalize_email, User, OTP_TTL_MINUTES, RESET_WINDOW_MINUTES};
use shared::validation::{validate_email, validate_password};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    mailer: Arc<dyn Mailer>,
    jwt_secret: String,
    token_expiry_days: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token and profile returned by sign-up and login
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    created_at: chrono::DateTime<Utc>,
}

impl CredentialRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

impl AuthService {
    pub fn new(db: PgPool, config: &Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            mailer,
            jwt_secret: config.jwt.secret.clone(),
            token_expiry_days: config.jwt.expiry_days,
        }
    }

    /// Register a new account; emails are unique case-insensitively
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> AppResult<AuthSession> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Missing fields".to_string()));
        }
        validate_email(email).map_err(|m| AppError::Validation(m.to_string()))?;
        validate_password(password).map_err(|m| AppError::Validation(m.to_string()))?;

        let email = normalize_email(email);
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = $1)",
        )
        .bind(&email)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }

        let password_hash = hash_password(password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, created_at
            "#,
        )
        .bind(name)
        .bind(&email)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, "Account created");

        let token = encode_token(&user, &self.jwt_secret, self.token_expiry_days)?;
        Ok(AuthSession { token, user })
    }

    /// Authenticate user with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let row = self
            .find_credentials(email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        let valid = verify(password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let user = row.into_user();
        let token = encode_token(&user, &self.jwt_secret, self.token_expiry_days)?;
        Ok(AuthSession { token, user })
    }

    /// Issue a one-time reset code and email it in the background.
    ///
    /// Returns the code so the caller can surface it in development builds.
    pub async fn forgot_password(&self, email: &str) -> AppResult<String> {
        let user = self
            .find_credentials(email)
            .await?
            .ok_or_else(|| AppError::NotFound("Email".to_string()))?;

        let otp = format_otp(rand::thread_rng().gen_range(100_000..1_000_000));
        let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);

        sqlx::query("INSERT INTO otp_tokens (user_id, otp, expires_at) VALUES ($1, $2, $3)")
            .bind(user.id)
            .bind(&otp)
            .bind(expires_at)
            .execute(&self.db)
            .await?;

        tracing::info!(user_id = %user.id, otp = %otp, "Password reset code issued");

        // Delivery never blocks or fails the request
        let mailer = self.mailer.clone();
        let (to, name, code) = (user.email.clone(), user.name.clone(), otp.clone());
        tokio::spawn(async move {
            if let Err(e) = mailer.send_otp(&to, &name, &code).await {
                tracing::warn!(error = %e, to = %to, "OTP email failed");
            }
        });

        Ok(otp)
    }

    /// Mark the newest matching unused code as used
    pub async fn verify_otp(&self, email: &str, otp: &str) -> AppResult<()> {
        let user = self
            .find_credentials(email)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid OTP".to_string()))?;

        let token = sqlx::query_as::<_, (Uuid, chrono::DateTime<Utc>)>(
            r#"
            SELECT id, expires_at FROM otp_tokens
            WHERE user_id = $1 AND otp = $2 AND used_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user.id)
        .bind(otp.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid OTP".to_string()))?;

        let (token_id, expires_at) = token;
        if expires_at < Utc::now() {
            return Err(AppError::Validation("OTP expired".to_string()));
        }

        sqlx::query("UPDATE otp_tokens SET used_at = NOW() WHERE id = $1")
            .bind(token_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Set a new password; requires a code verified within the reset window
    pub async fn reset_password(&self, email: &str, new_password: &str) -> AppResult<()> {
        validate_password(new_password).map_err(|m| AppError::Validation(m.to_string()))?;

        let user = self
            .find_credentials(email)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid request".to_string()))?;

        let window_start = Utc::now() - Duration::minutes(RESET_WINDOW_MINUTES);
        let verified = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM otp_tokens
                WHERE user_id = $1 AND used_at IS NOT NULL AND used_at >= $2
            )
            "#,
        )
        .bind(user.id)
        .bind(window_start)
        .fetch_one(&self.db)
        .await?;

        if !verified {
            return Err(AppError::Validation("OTP verification required".to_string()));
        }

        let password_hash = hash_password(new_password)?;

        let mut tx = self.db.begin().await?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user.id)
            .bind(&password_hash)
            .execute(&mut *tx)
            .await?;
        // A verified code resets the password once
        sqlx::query("DELETE FROM otp_tokens WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<CredentialRow>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE lower(email) = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Sign a session token for `user`
pub fn encode_token(user: &User, secret: &str, expiry_days: i64) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        exp: (now + Duration::days(expiry_days)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Decode and validate a session token
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Asha".to_string(),
            email: "asha@shop.in".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let user = user();
        let token = encode_token(&user, "secret", 7).unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "asha@shop.in");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let token = encode_token(&user(), "secret", 7).unwrap();
        assert!(decode_token(&token, "other").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = encode_token(&user(), "secret", -1).unwrap();
        assert!(decode_token(&token, "secret").is_err());
    }
}
