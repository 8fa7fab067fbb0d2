//! Authentication handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::auth::AuthSession;
use crate::services::AuthService;
use crate::AppState;

#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing fields"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing fields"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing fields"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing fields"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing fields"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email required"))]
    pub email: String,
}

#[derive(Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing fields"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing fields"))]
    pub otp: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing fields"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing fields"))]
    pub new_password: String,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ForgotPasswordResponse {
    pub ok: bool,
    pub otp: String,
}

/// Reject a body with missing fields, using the first field's message
fn check<T: Validate>(body: &T) -> AppResult<()> {
    body.validate().map_err(|errors| {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Missing fields".to_string());
        AppError::Validation(message)
    })
}

fn service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone(), &state.config, state.mailer.clone())
}

/// Sign-up endpoint handler
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<Json<AuthSession>> {
    check(&body)?;
    let session = service(&state)
        .signup(&body.name, &body.email, &body.password)
        .await?;
    Ok(Json(session))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthSession>> {
    check(&body)?;
    let session = service(&state).login(&body.email, &body.password).await?;
    Ok(Json(session))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ForgotPasswordResponse>> {
    check(&body)?;
    let otp = service(&state).forgot_password(&body.email).await?;
    Ok(Json(ForgotPasswordResponse { ok: true, otp }))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> AppResult<Json<OkResponse>> {
    check(&body)?;
    service(&state).verify_otp(&body.email, &body.otp).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> AppResult<Json<OkResponse>> {
    check(&body)?;
    service(&state)
        .reset_password(&body.email, &body.new_password)
        .await?;
    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_uses_field_message() {
        let body = ForgotPasswordRequest {
            email: String::new(),
        };
        match check(&body) {
            Err(AppError::Validation(message)) => assert_eq!(message, "Email required"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_check_passes_complete_body() {
        let body = LoginRequest {
            email: "a@b.in".to_string(),
            password: "secret1".to_string(),
        };
        assert!(check(&body).is_ok());
    }
}
