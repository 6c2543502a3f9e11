use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{password, AuthenticatedUser},
    error::{AppError, AppResult},
    models::{NewUser, User},
    schema::users::{self, dsl},
    state::AppState,
};

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() {
        return Err(AppError::bad_request("email must not be empty"));
    }
    if payload.password.is_empty() {
        return Err(AppError::bad_request("password must not be empty"));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let mut conn = state.db()?;

    let new_user = NewUser {
        id: Uuid::new_v4(),
        email,
        password_hash,
    };

    match diesel::insert_into(users::table)
        .values(&new_user)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::conflict("email already registered"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    tracing::info!(user_id = %new_user.id, "user registered");
    Ok(Json(MessageResponse {
        message: "registered".to_string(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = normalize_email(&payload.email);
    let mut conn = state.db()?;

    let user: User = dsl::users
        .filter(dsl::email.eq(&email))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| {
            tracing::warn!("login attempt for unknown email");
            AppError::invalid_credentials()
        })?;

    let valid = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| AppError::invalid_credentials())?;

    if !valid {
        tracing::warn!(user_id = %user.id, "login attempt with wrong password");
        return Err(AppError::invalid_credentials());
    }

    let access_token = state
        .jwt
        .generate_token(user.id, &user.email)
        .map_err(AppError::from)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.jwt.expires_in_seconds(),
    }))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}

/// Surrounding whitespace is dropped; case is kept, so addresses match exactly.
fn normalize_email(raw: &str) -> String {
    raw.trim().to_string()
}
