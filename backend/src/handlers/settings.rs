//! Account settings handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::SettingsService;
use crate::AppState;
use shared::models::User;

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Serialize)]
pub struct PasswordResponse {
    pub ok: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutBody {
    pub card_order: Vec<String>,
}

pub async fn get_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<UserResponse>> {
    let user = SettingsService::new(state.db).me(current_user.0.user_id).await?;
    Ok(Json(UserResponse { user }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = SettingsService::new(state.db)
        .update_profile(current_user.0.user_id, &body.name)
        .await?;
    Ok(Json(UserResponse { user }))
}

/// Without `currentPassword` this acts as a reset from an already signed-in session
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<Json<PasswordResponse>> {
    if body.new_password.is_empty() {
        return Err(AppError::Validation("Missing newPassword".to_string()));
    }
    SettingsService::new(state.db)
        .change_password(
            current_user.0.user_id,
            body.current_password.as_deref(),
            &body.new_password,
        )
        .await?;
    Ok(Json(PasswordResponse { ok: true }))
}

pub async fn get_layout(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<LayoutBody>> {
    let card_order = SettingsService::new(state.db)
        .layout(current_user.0.user_id)
        .await?;
    Ok(Json(LayoutBody { card_order }))
}

pub async fn update_layout(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<LayoutBody>,
) -> AppResult<Json<LayoutBody>> {
    let card_order = SettingsService::new(state.db)
        .update_layout(current_user.0.user_id, &body.card_order)
        .await?;
    Ok(Json(LayoutBody { card_order }))
}
