//! Account settings: profile, password and statistics layout

use bcrypt::verify;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::hash_password;
use shared::models::{card_order_or_default, parse_card_order, User};
use shared::validation::validate_password;

#[derive(Clone)]
pub struct SettingsService {
    db: PgPool,
}

/// Stored statistics card order for `owner_id`, or the default order
pub async fn card_order(db: &PgPool, owner_id: Uuid) -> AppResult<Vec<String>> {
    let stored = sqlx::query_scalar::<_, Vec<String>>(
        "SELECT card_order FROM layouts WHERE owner_id = $1",
    )
    .bind(owner_id)
    .fetch_optional(db)
    .await?;

    Ok(card_order_or_default(stored.as_deref()))
}

impl SettingsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn me(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT id, name, email, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    pub async fn update_profile(&self, user_id: Uuid, name: &str) -> AppResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// Change the password. When `current_password` is given it must match.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: Option<&str>,
        new_password: &str,
    ) -> AppResult<()> {
        validate_password(new_password).map_err(|m| AppError::Validation(m.to_string()))?;

        if let Some(current) = current_password.filter(|p| !p.is_empty()) {
            let stored = sqlx::query_scalar::<_, String>(
                "SELECT password_hash FROM users WHERE id = $1",
            )
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

            let valid = verify(current, &stored)
                .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
            if !valid {
                return Err(AppError::Validation("Current password is incorrect".to_string()));
            }
        }

        let password_hash = hash_password(new_password)?;
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(&password_hash)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    pub async fn layout(&self, owner_id: Uuid) -> AppResult<Vec<String>> {
        card_order(&self.db, owner_id).await
    }

    /// Save a card order; it must name `revenue`, `sold` and `instock` once each
    pub async fn update_layout(&self, owner_id: Uuid, order: &[String]) -> AppResult<Vec<String>> {
        let keys = parse_card_order(order).map_err(|e| AppError::Validation(e.to_string()))?;
        let normalized: Vec<String> = keys.iter().map(|k| k.as_str().to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO layouts (owner_id, card_order)
            VALUES ($1, $2)
            ON CONFLICT (owner_id) DO UPDATE SET card_order = EXCLUDED.card_order
            "#,
        )
        .bind(owner_id)
        .bind(&normalized)
        .execute(&self.db)
        .await?;

        Ok(normalized)
    }
}
