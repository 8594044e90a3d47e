use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::password::PasswordService;
use crate::auth::tokens::{issue_token, redeem_token};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::services::email_service::{password_reset_html, verification_html};
use crate::services::spawn_email;
use crate::state::AppState;
use infra::models::{Gender, TokenPurpose, UserRole, UserRow};
use infra::repos::CreateUser;
use infra::{Store, StoreError};

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<UserRole>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub profile_pic_url: Option<String>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserRow,
}

pub(crate) fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    Ok(email)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /auth/register
pub async fn register<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    let email = normalize_email(&body.email)?;
    PasswordService::validate(&body.password)?;

    let role = body.role.unwrap_or(UserRole::Player);
    if role == UserRole::Admin {
        return Err(AppError::BadRequest(
            "Role must be player or owner".to_string(),
        ));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let password_hash =
        PasswordService::hash(body.password, state.auth_config().bcrypt_cost).await?;

    let user = match state
        .store
        .create_user(CreateUser {
            name,
            email,
            password_hash,
            role,
        })
        .await
    {
        Ok(user) => user,
        Err(StoreError::UniqueViolation(_)) => {
            return Err(AppError::Conflict("Email is already registered".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let ttl = Duration::hours(state.auth_config().verification_token_expiration_hours as i64);
    let raw_token = issue_token(&state.store, user.id, TokenPurpose::EmailVerification, ttl).await?;
    let link = format!(
        "{}/auth/verify/{}",
        state.auth_config().public_base_url.trim_end_matches('/'),
        raw_token
    );
    spawn_email(
        state.email_service().cloned(),
        user.email.clone(),
        "Verify your email".to_string(),
        verification_html(&user.name, &link),
    );

    info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful, please check your email to verify your account",
            "user": user,
        })),
    ))
}

/// GET /auth/verify/{token}
pub async fn verify_email<S: Store>(
    State(state): State<AppState<S>>,
    Path(token): Path<String>,
) -> Result<Redirect, AppError> {
    let frontend = state.auth_config().frontend_base_url.trim_end_matches('/');
    let failed = Redirect::to(&format!("{frontend}/verify-email?status=failed"));

    let Some(user_id) = redeem_token(&state.store, &token, TokenPurpose::EmailVerification).await?
    else {
        warn!("Rejected invalid or expired verification token");
        return Ok(failed);
    };

    let Some(mut user) = state.store.find_user_by_id(user_id).await? else {
        return Ok(failed);
    };
    user.is_verified = true;
    state.store.save_user(&user).await?;

    info!(user_id = %user.id, "Email verified");
    Ok(Redirect::to(&format!("{frontend}/login?verified=true")))
}

/// POST /auth/login
pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let email = body.email.trim().to_lowercase();
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !PasswordService::verify(body.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    let token = state.jwt_service().token_for(&user)?;
    info!(user_id = %user.id, "User logged in");
    Ok(Json(AuthResponse { token, user }))
}

/// POST /auth/forgot-password
pub async fn forgot_password<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let email = body.email.trim().to_lowercase();

    if let Some(user) = state.store.find_user_by_email(&email).await? {
        let minutes = state.auth_config().reset_token_expiration_minutes;
        let raw_token = issue_token(
            &state.store,
            user.id,
            TokenPurpose::PasswordReset,
            Duration::minutes(minutes as i64),
        )
        .await?;
        let link = format!(
            "{}/reset-password/{}",
            state.auth_config().frontend_base_url.trim_end_matches('/'),
            raw_token
        );
        spawn_email(
            state.email_service().cloned(),
            user.email.clone(),
            "Reset your password".to_string(),
            password_reset_html(&user.name, &link, minutes),
        );
        info!(user_id = %user.id, "Password reset requested");
    }

    Ok(Json(json!({ "message": FORGOT_PASSWORD_MESSAGE })))
}

/// POST /auth/reset-password/{token}
pub async fn reset_password<S: Store>(
    State(state): State<AppState<S>>,
    Path(token): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    PasswordService::validate(&body.password)?;

    let user_id = redeem_token(&state.store, &token, TokenPurpose::PasswordReset)
        .await?
        .ok_or_else(|| AppError::BadRequest("Reset link is invalid or has expired".to_string()))?;

    let mut user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Reset link is invalid or has expired".to_string()))?;

    user.password_hash =
        PasswordService::hash(body.password, state.auth_config().bcrypt_cost).await?;
    state.store.save_user(&user).await?;
    state
        .store
        .invalidate_user_tokens(user.id, TokenPurpose::PasswordReset)
        .await?;

    info!(user_id = %user.id, "Password reset");
    Ok(Json(json!({ "message": "Password has been reset" })))
}

async fn current_user<S: Store>(state: &AppState<S>, auth: &AuthUser) -> Result<UserRow, AppError> {
    state
        .store
        .find_user_by_id(auth.0.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// GET /auth/me
pub async fn me<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
) -> Result<Json<UserRow>, AppError> {
    Ok(Json(current_user(&state, &auth).await?))
}

/// PUT /auth/me
pub async fn update_profile<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserRow>, AppError> {
    let mut user = current_user(&state, &auth).await?;

    if let Some(name) = non_blank(body.name) {
        user.name = name;
    }
    if let Some(email) = non_blank(body.email) {
        let email = normalize_email(&email)?;
        if email != user.email {
            if state.store.find_user_by_email(&email).await?.is_some() {
                return Err(AppError::Conflict("Email is already in use".to_string()));
            }
            user.email = email;
        }
    }
    if let Some(phone) = non_blank(body.phone) {
        user.phone = Some(phone);
    }
    if let Some(address) = non_blank(body.address) {
        user.address = Some(address);
    }
    if body.dob.is_some() {
        user.dob = body.dob;
    }
    if body.gender.is_some() {
        user.gender = body.gender;
    }
    if let Some(url) = non_blank(body.profile_pic_url) {
        user.profile_pic_url = Some(url);
    }
    user.is_profile_complete = true;

    let saved = match state.store.save_user(&user).await {
        Ok(saved) => saved,
        Err(StoreError::UniqueViolation(_)) => {
            return Err(AppError::Conflict("Email is already in use".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(saved))
}
